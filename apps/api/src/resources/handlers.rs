use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::errors::{ApiResponse, AppError};
use crate::query::{
    FetchContext, FilterValue, ListController, PageResult, SortDirection, SqlPageFetcher,
};
use crate::records;
use crate::state::AppState;

use super::fields::{ColumnConfig, FieldConfig};
use super::registry::{self, ResourceConfig};

fn resource(name: &str) -> Result<&'static ResourceConfig, AppError> {
    registry::lookup(name)
        .ok_or_else(|| AppError::NotFound(format!("Unknown resource '{name}'")))
}

fn object_payload(value: &Value) -> Result<&Map<String, Value>, AppError> {
    value
        .as_object()
        .ok_or_else(|| AppError::Validation("payload must be a JSON object".to_string()))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<SortDirection>,
    pub search: Option<String>,
    /// JSON-encoded filter object, e.g.
    /// `{"name":{"operator":"ilike","value":"john"},"job_status":"active"}`.
    pub filters: Option<String>,
    pub company_id: Option<Uuid>,
    pub profile_id: Option<Uuid>,
}

/// GET /api/v1/:resource
pub async fn handle_list(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<PageResult<Value>>>, AppError> {
    let config = resource(&name)?;

    let mut params = config.base_params();
    if let Some(page) = query.page {
        params.page = page.max(1);
    }
    if let Some(page_size) = query.page_size {
        params.page_size = page_size.clamp(1, 100);
    }
    if let Some(sort_by) = query.sort_by {
        params.sort.column = sort_by;
    }
    if let Some(sort_dir) = query.sort_dir {
        params.sort.direction = sort_dir;
    }
    if let Some(search) = query.search {
        params.search_term = search;
    }
    if let Some(raw) = query.filters {
        params.filters = serde_json::from_str::<BTreeMap<String, FilterValue>>(&raw)
            .map_err(|e| AppError::Validation(format!("malformed filters: {e}")))?;
    }

    let ctx = FetchContext {
        company_id: query.company_id,
        profile_id: query.profile_id,
    };

    // One-shot controller: the scope merge, compile, and sequencing all run
    // through the same path the stateful list consumers use.
    let fetcher = Arc::new(SqlPageFetcher::new(state.db.clone()));
    let list = ListController::with_params(fetcher, ctx, params);
    list.refetch().await?;
    let page = list
        .snapshot()
        .last_result
        .ok_or_else(|| anyhow::anyhow!("fetch finished without a result"))?;
    Ok(Json(ApiResponse::ok(page)))
}

/// GET /api/v1/:resource/:id
pub async fn handle_get_by_id(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, Uuid)>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let config = resource(&name)?;
    match records::get_by_id(&state.db, config.name, id).await? {
        Some(record) => Ok(Json(ApiResponse::ok(record))),
        None => Ok(Json(ApiResponse::empty())),
    }
}

/// POST /api/v1/:resource
pub async fn handle_create(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(payload): Json<Value>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let config = resource(&name)?;
    let record = records::create(&state.db, config.name, object_payload(&payload)?).await?;
    Ok(Json(ApiResponse::ok(record)))
}

/// POST /api/v1/:resource/bulk
pub async fn handle_create_bulk(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(payloads): Json<Vec<Value>>,
) -> Result<Json<ApiResponse<Vec<Value>>>, AppError> {
    let config = resource(&name)?;
    let objects = payloads
        .iter()
        .map(|p| object_payload(p).map(|m| m.clone()))
        .collect::<Result<Vec<_>, _>>()?;
    let records = records::create_bulk(&state.db, config.name, &objects).await?;
    Ok(Json(ApiResponse::ok(records)))
}

/// PATCH /api/v1/:resource/:id
pub async fn handle_update(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, Uuid)>,
    Json(payload): Json<Value>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let config = resource(&name)?;
    let updated = records::update(&state.db, config.name, id, object_payload(&payload)?).await?;
    match updated {
        Some(record) => Ok(Json(ApiResponse::ok(record))),
        None => Err(AppError::NotFound(format!(
            "{name} record {id} not found"
        ))),
    }
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub candidate_ids: Vec<Uuid>,
    pub job_posting_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct AssignResponse {
    pub updated: u64,
}

/// POST /api/v1/candidates/assign
/// Re-associates the listed candidates to one job posting.
pub async fn handle_assign_candidates(
    State(state): State<AppState>,
    Json(req): Json<AssignRequest>,
) -> Result<Json<ApiResponse<AssignResponse>>, AppError> {
    let updated = records::update_by_foreign_key_set(
        &state.db,
        "candidates",
        "job_id",
        &req.candidate_ids,
        req.job_posting_id,
    )
    .await?;
    Ok(Json(ApiResponse::ok(AssignResponse { updated })))
}

#[derive(Debug, Serialize)]
pub struct ResourceConfigResponse {
    pub resource: &'static str,
    pub search_columns: &'static [&'static str],
    pub form_fields: Vec<FieldConfig>,
    pub filter_fields: Vec<FieldConfig>,
    pub columns: Vec<ColumnConfig>,
}

/// GET /api/v1/:resource/config
pub async fn handle_resource_config(
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<ResourceConfigResponse>>, AppError> {
    let config = resource(&name)?;
    Ok(Json(ApiResponse::ok(ResourceConfigResponse {
        resource: config.name,
        search_columns: config.search_columns,
        form_fields: config.form_fields(),
        filter_fields: config.filter_fields(),
        columns: config.columns(),
    })))
}
