// Generic paginated-query engine: parameter model, compiler, fetch service,
// and the list-state controller that keeps a view synchronized with them.

pub mod compiler;
pub mod executor;
pub mod list;
pub mod params;

use thiserror::Error;

pub use compiler::{compile, CompiledQuery, SkipReason, ValidationSkip};
pub use executor::{execute_page, total_pages, PageResult};
pub use list::{ListController, ListOptions, ListPhase, ListSnapshot, PageFetcher, SqlPageFetcher};
pub use params::{
    FetchContext, FilterOperator, FilterValue, QueryParams, Scalar, Sort, SortDirection,
};

/// Failures of the query engine. "No matching row" is never an error here;
/// single-record accessors express it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("query execution failed: {0}")]
    Execution(String),

    #[error("row decoding failed: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("precondition failed: {0}")]
    Precondition(String),
}
