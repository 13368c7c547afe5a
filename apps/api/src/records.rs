//! Single-Record Accessors — get-by-id, create, update, and bulk
//! re-association, the simpler siblings of the paginated engine.
//!
//! Payloads are JSON objects; columns come from the payload keys (validated
//! identifiers, sorted) and values are typed by Postgres through
//! `jsonb_populate_record`, so one JSON bind crosses the wire regardless of
//! the table. Rows come back as `row_to_json`.
//!
//! "No matching row" is `Ok(None)` — success with an empty payload — and is
//! distinct from a real query failure.

use serde_json::{Map, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::query::compiler::checked_ident;
use crate::query::QueryError;

fn exec_err(e: sqlx::Error) -> QueryError {
    QueryError::Execution(e.to_string())
}

/// Sorted, deduplicated, validated column list from a payload object.
fn payload_columns(payload: &Map<String, Value>) -> Result<Vec<String>, QueryError> {
    if payload.is_empty() {
        return Err(QueryError::Precondition(
            "payload has no fields".to_string(),
        ));
    }
    let mut columns: Vec<String> = payload.keys().cloned().collect();
    columns.sort();
    columns.dedup();
    for column in &columns {
        checked_ident(column)?;
    }
    Ok(columns)
}

fn union_columns(payloads: &[Map<String, Value>]) -> Result<Vec<String>, QueryError> {
    let mut columns: Vec<String> = payloads
        .iter()
        .flat_map(|p| p.keys().cloned())
        .collect();
    columns.sort();
    columns.dedup();
    if columns.is_empty() {
        return Err(QueryError::Precondition(
            "payload has no fields".to_string(),
        ));
    }
    for column in &columns {
        checked_ident(column)?;
    }
    Ok(columns)
}

pub fn build_select_by_id_sql(table: &str) -> Result<String, QueryError> {
    let table = checked_ident(table)?;
    // created_at ordering is defensive; ids are normally unique.
    Ok(format!(
        "SELECT row_to_json(sub) FROM (SELECT * FROM \"{table}\" WHERE \"id\" = $1 \
         ORDER BY \"created_at\" ASC LIMIT 1) AS sub"
    ))
}

pub fn build_insert_sql(table: &str, columns: &[String]) -> Result<String, QueryError> {
    let table = checked_ident(table)?;
    let targets = columns
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ");
    let sources = columns
        .iter()
        .map(|c| format!("r.\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!(
        "INSERT INTO \"{table}\" ({targets}) SELECT {sources} \
         FROM jsonb_populate_record(NULL::\"{table}\", $1) AS r \
         RETURNING row_to_json(\"{table}\".*)"
    ))
}

pub fn build_bulk_insert_sql(table: &str, columns: &[String]) -> Result<String, QueryError> {
    let table = checked_ident(table)?;
    let targets = columns
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ");
    let sources = columns
        .iter()
        .map(|c| format!("r.\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!(
        "INSERT INTO \"{table}\" ({targets}) SELECT {sources} \
         FROM jsonb_populate_recordset(NULL::\"{table}\", $1) AS r \
         RETURNING row_to_json(\"{table}\".*)"
    ))
}

pub fn build_update_sql(table: &str, columns: &[String]) -> Result<String, QueryError> {
    let table = checked_ident(table)?;
    let assignments = columns
        .iter()
        .map(|c| format!("\"{c}\" = r.\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!(
        "UPDATE \"{table}\" SET {assignments} \
         FROM jsonb_populate_record(NULL::\"{table}\", $1) AS r \
         WHERE \"{table}\".\"id\" = $2 RETURNING row_to_json(\"{table}\".*)"
    ))
}

pub fn build_reassign_sql(table: &str, fk_column: &str) -> Result<String, QueryError> {
    let table = checked_ident(table)?;
    let fk_column = checked_ident(fk_column)?;
    Ok(format!(
        "UPDATE \"{table}\" SET \"{fk_column}\" = $1 WHERE \"id\" = ANY($2)"
    ))
}

/// Fetches one record by id. `Ok(None)` when no row matches.
pub async fn get_by_id(pool: &PgPool, table: &str, id: Uuid) -> Result<Option<Value>, QueryError> {
    let sql = build_select_by_id_sql(table)?;
    sqlx::query_scalar::<_, Value>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(exec_err)
}

/// Inserts one record and returns the full stored row, generated fields
/// included.
pub async fn create(
    pool: &PgPool,
    table: &str,
    payload: &Map<String, Value>,
) -> Result<Value, QueryError> {
    let columns = payload_columns(payload)?;
    let sql = build_insert_sql(table, &columns)?;
    sqlx::query_scalar::<_, Value>(&sql)
        .bind(Value::Object(payload.clone()))
        .fetch_one(pool)
        .await
        .map_err(exec_err)
}

/// Batched insert in a single statement: the whole batch lands or none of it
/// does. An empty batch is a no-op.
pub async fn create_bulk(
    pool: &PgPool,
    table: &str,
    payloads: &[Map<String, Value>],
) -> Result<Vec<Value>, QueryError> {
    if payloads.is_empty() {
        return Ok(Vec::new());
    }
    let columns = union_columns(payloads)?;
    let sql = build_bulk_insert_sql(table, &columns)?;
    let rows = Value::Array(payloads.iter().cloned().map(Value::Object).collect());
    sqlx::query_scalar::<_, Value>(&sql)
        .bind(rows)
        .fetch_all(pool)
        .await
        .map_err(exec_err)
}

/// Updates only the provided fields and returns the full updated row.
/// `Ok(None)` when the id matches nothing.
pub async fn update(
    pool: &PgPool,
    table: &str,
    id: Uuid,
    partial: &Map<String, Value>,
) -> Result<Option<Value>, QueryError> {
    let columns = payload_columns(partial)?;
    let sql = build_update_sql(table, &columns)?;
    sqlx::query_scalar::<_, Value>(&sql)
        .bind(Value::Object(partial.clone()))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(exec_err)
}

/// Bulk re-association: points `fk_column` of every listed row at
/// `new_value` in one constrained update. An empty id list fails fast before
/// any query is issued — never a match-everything update.
pub async fn update_by_foreign_key_set(
    pool: &PgPool,
    table: &str,
    fk_column: &str,
    ids: &[Uuid],
    new_value: Uuid,
) -> Result<u64, QueryError> {
    if ids.is_empty() {
        return Err(QueryError::Precondition("no ids provided".to_string()));
    }
    let sql = build_reassign_sql(table, fk_column)?;
    let result = sqlx::query(&sql)
        .bind(new_value)
        .bind(ids.to_vec())
        .execute(pool)
        .await
        .map_err(exec_err)?;
    Ok(result.rows_affected())
}
