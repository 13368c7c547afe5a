use sqlx::PgPool;

use crate::extract::ExtractorClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub extractor: ExtractorClient,
}
