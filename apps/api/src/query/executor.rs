//! Paginated Fetch Service — executes a [`CompiledQuery`] and normalizes the
//! response into a [`PageResult`]. Single attempt, no retry; a data-API
//! failure surfaces as `QueryError::Execution` and no partial result is
//! returned.

use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::postgres::PgArguments;
use sqlx::PgPool;
use tracing::debug;

use super::compiler::CompiledQuery;
use super::params::Scalar;
use super::QueryError;

/// One fetch's rows plus pagination metadata. Created fresh per fetch and
/// never mutated; the controller swaps whole results atomically.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult<T> {
    pub rows: Vec<T>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl<T> PageResult<T> {
    pub fn new(rows: Vec<T>, total_count: u64, page: u32, page_size: u32) -> Self {
        PageResult {
            rows,
            total_count,
            page,
            page_size,
            total_pages: total_pages(total_count, page_size),
        }
    }
}

/// `ceil(total_count / page_size)`; zero matching rows means zero pages.
pub fn total_pages(total_count: u64, page_size: u32) -> u32 {
    if total_count == 0 {
        0
    } else {
        total_count.div_ceil(page_size.max(1) as u64) as u32
    }
}

type PageQuery<'q> =
    sqlx::query::QueryAs<'q, sqlx::Postgres, (i64, serde_json::Value), PgArguments>;

fn bind_scalar<'q>(query: PageQuery<'q>, value: &Scalar) -> PageQuery<'q> {
    match value {
        Scalar::Null => query.bind(Option::<String>::None),
        Scalar::Bool(b) => query.bind(*b),
        Scalar::Int(n) => query.bind(*n),
        Scalar::Float(f) => query.bind(*f),
        Scalar::Uuid(u) => query.bind(*u),
        Scalar::Text(s) => query.bind(s.clone()),
        Scalar::TextArray(items) => query.bind(items.clone()),
    }
}

/// Runs the compiled statement and decodes `(total_count, rows)` into a
/// typed page.
pub async fn execute_page<T: DeserializeOwned>(
    pool: &PgPool,
    compiled: &CompiledQuery,
) -> Result<PageResult<T>, QueryError> {
    for skip in &compiled.diagnostics {
        debug!(column = %skip.column, reason = %skip.reason, "filter entry skipped");
    }

    let mut query = sqlx::query_as::<_, (i64, serde_json::Value)>(&compiled.sql);
    for value in &compiled.binds {
        query = bind_scalar(query, value);
    }

    let (total_count, rows_json) = query
        .fetch_one(pool)
        .await
        .map_err(|e| QueryError::Execution(e.to_string()))?;

    let rows: Vec<T> = serde_json::from_value(rows_json)?;
    Ok(PageResult::new(
        rows,
        total_count.max(0) as u64,
        compiled.page,
        compiled.page_size,
    ))
}
