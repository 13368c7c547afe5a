//! List State Controller — owns the state behind one paginated list view and
//! keeps it synchronized with the data source.
//!
//! Mutators re-fetch only when the new value actually differs (deep value
//! equality), criteria changes snap back to page 1, and responses apply
//! last-request-wins: every fetch takes a monotonically increasing sequence
//! number and a response is accepted only while its number is still the
//! newest issued. Superseded responses are dropped, never applied; the
//! underlying request is not cancelled.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use super::compiler::compile;
use super::executor::{execute_page, PageResult};
use super::params::{FetchContext, FilterValue, QueryParams, Sort};
use super::QueryError;

/// The fetch seam. Production uses [`SqlPageFetcher`]; tests inject fetchers
/// with controlled latency and failures.
#[async_trait]
pub trait PageFetcher<T>: Send + Sync {
    async fn fetch_page(&self, params: &QueryParams) -> Result<PageResult<T>, QueryError>;
}

/// Compiles and executes against Postgres.
pub struct SqlPageFetcher {
    pool: PgPool,
}

impl SqlPageFetcher {
    pub fn new(pool: PgPool) -> Self {
        SqlPageFetcher { pool }
    }
}

#[async_trait]
impl PageFetcher<serde_json::Value> for SqlPageFetcher {
    async fn fetch_page(
        &self,
        params: &QueryParams,
    ) -> Result<PageResult<serde_json::Value>, QueryError> {
        let compiled = compile(params)?;
        execute_page(&self.pool, &compiled).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListPhase {
    Idle,
    Loading,
    Loaded,
    Errored,
}

/// Static configuration for one list view, mirroring what a dashboard table
/// declares up front.
#[derive(Debug, Clone)]
pub struct ListOptions {
    pub resource: String,
    pub sort: Sort,
    pub search_columns: Vec<String>,
    pub foreign_keys: BTreeMap<String, Vec<String>>,
    pub initial_page_size: u32,
}

impl ListOptions {
    pub fn new(resource: &str) -> Self {
        ListOptions {
            resource: resource.to_string(),
            sort: Sort::default(),
            search_columns: Vec::new(),
            foreign_keys: BTreeMap::new(),
            initial_page_size: 10,
        }
    }
}

/// Point-in-time copy of the controller's state for consumers to render.
#[derive(Debug, Clone)]
pub struct ListSnapshot<T> {
    pub current_page: u32,
    pub page_size: u32,
    pub filters: BTreeMap<String, FilterValue>,
    pub search_term: String,
    pub phase: ListPhase,
    pub loading: bool,
    pub last_result: Option<PageResult<T>>,
    pub error: Option<String>,
}

struct Inner<T> {
    params: QueryParams,
    phase: ListPhase,
    last_result: Option<PageResult<T>>,
    error: Option<String>,
    /// Sequence number of the newest issued fetch.
    issued: u64,
}

/// Owns one list view's state. Instances are independent; two tables on one
/// page get two controllers and share nothing.
pub struct ListController<T> {
    fetcher: std::sync::Arc<dyn PageFetcher<T>>,
    ctx: FetchContext,
    inner: Mutex<Inner<T>>,
}

impl<T: Clone + Send + 'static> ListController<T> {
    pub fn new(
        fetcher: std::sync::Arc<dyn PageFetcher<T>>,
        ctx: FetchContext,
        options: ListOptions,
    ) -> Self {
        let mut params = QueryParams::new(&options.resource);
        params.page_size = options.initial_page_size.max(1);
        params.sort = options.sort;
        params.search_columns = options.search_columns;
        params.foreign_keys = options.foreign_keys;
        Self::with_params(fetcher, ctx, params)
    }

    /// Builds a controller whose first fetch uses `params` as-is. The list
    /// endpoint serves one-shot fetches through this plus [`Self::refetch`],
    /// so the HTTP path and stateful consumers share one sequencing path.
    pub fn with_params(
        fetcher: std::sync::Arc<dyn PageFetcher<T>>,
        ctx: FetchContext,
        params: QueryParams,
    ) -> Self {
        ListController {
            fetcher,
            ctx,
            inner: Mutex::new(Inner {
                params,
                phase: ListPhase::Idle,
                last_result: None,
                error: None,
                issued: 0,
            }),
        }
    }

    pub fn snapshot(&self) -> ListSnapshot<T> {
        let inner = self.inner.lock().expect("list state poisoned");
        ListSnapshot {
            current_page: inner.params.page,
            page_size: inner.params.page_size,
            filters: inner.params.filters.clone(),
            search_term: inner.params.search_term.clone(),
            phase: inner.phase,
            loading: inner.phase == ListPhase::Loading,
            last_result: inner.last_result.clone(),
            error: inner.error.clone(),
        }
    }

    /// Jumps to `page`. No-op when the page is unchanged.
    pub async fn set_current_page(&self, page: u32) {
        let page = page.max(1);
        let issued = {
            let mut inner = self.inner.lock().expect("list state poisoned");
            if inner.params.page == page {
                return;
            }
            inner.params.page = page;
            Self::begin_fetch(&mut inner, &self.ctx)
        };
        self.run_fetch(issued).await.ok();
    }

    /// Changes the page size. The current page is kept; only criteria
    /// changes snap back to page 1.
    pub async fn set_page_size(&self, page_size: u32) {
        let page_size = page_size.max(1);
        let issued = {
            let mut inner = self.inner.lock().expect("list state poisoned");
            if inner.params.page_size == page_size {
                return;
            }
            inner.params.page_size = page_size;
            Self::begin_fetch(&mut inner, &self.ctx)
        };
        self.run_fetch(issued).await.ok();
    }

    /// Replaces the entire filter map (no merge) and resets to page 1.
    /// Structurally identical filters trigger no fetch.
    pub async fn set_filters(&self, filters: BTreeMap<String, FilterValue>) {
        let issued = {
            let mut inner = self.inner.lock().expect("list state poisoned");
            if inner.params.filters == filters {
                return;
            }
            inner.params.filters = filters;
            inner.params.page = 1;
            Self::begin_fetch(&mut inner, &self.ctx)
        };
        self.run_fetch(issued).await.ok();
    }

    /// Updates the live-search term and resets to page 1.
    pub async fn set_search_term(&self, term: &str) {
        let issued = {
            let mut inner = self.inner.lock().expect("list state poisoned");
            if inner.params.search_term == term {
                return;
            }
            inner.params.search_term = term.to_string();
            inner.params.page = 1;
            Self::begin_fetch(&mut inner, &self.ctx)
        };
        self.run_fetch(issued).await.ok();
    }

    /// Fetches with the current parameters unconditionally and reports that
    /// fetch's outcome. Also the mount fetch: call once after construction.
    pub async fn refetch(&self) -> Result<(), QueryError> {
        let issued = {
            let mut inner = self.inner.lock().expect("list state poisoned");
            Self::begin_fetch(&mut inner, &self.ctx)
        };
        self.run_fetch(issued).await
    }

    fn begin_fetch(inner: &mut Inner<T>, ctx: &FetchContext) -> (u64, QueryParams) {
        inner.issued += 1;
        inner.phase = ListPhase::Loading;
        (inner.issued, ctx.apply(&inner.params))
    }

    async fn run_fetch(&self, (seq, params): (u64, QueryParams)) -> Result<(), QueryError> {
        let outcome = self.fetcher.fetch_page(&params).await;

        let mut inner = self.inner.lock().expect("list state poisoned");
        if seq != inner.issued {
            debug!(seq, newest = inner.issued, "stale list response dropped");
            return Ok(());
        }
        match outcome {
            Ok(result) => {
                inner.phase = ListPhase::Loaded;
                inner.last_result = Some(result);
                inner.error = None;
                Ok(())
            }
            Err(e) => {
                // Stale-while-error: keep showing the previous result.
                inner.phase = ListPhase::Errored;
                inner.error = Some(e.to_string());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::params::Scalar;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Records every fetch it serves; rows carry the "who" filter so tests
    /// can tell responses apart. Per-tag latency drives the race tests.
    struct RecordingFetcher {
        calls: AtomicU64,
        seen: Mutex<Vec<QueryParams>>,
        fail_after: Option<u64>,
    }

    impl RecordingFetcher {
        fn new() -> Self {
            RecordingFetcher {
                calls: AtomicU64::new(0),
                seen: Mutex::new(Vec::new()),
                fail_after: None,
            }
        }

        fn failing_after(n: u64) -> Self {
            RecordingFetcher {
                fail_after: Some(n),
                ..Self::new()
            }
        }

        fn calls(&self) -> u64 {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_params(&self) -> Option<QueryParams> {
            self.seen.lock().unwrap().last().cloned()
        }
    }

    fn tag_of(params: &QueryParams) -> String {
        match params.filters.get("who") {
            Some(FilterValue::Literal(Scalar::Text(s))) => s.clone(),
            _ => "none".to_string(),
        }
    }

    #[async_trait]
    impl PageFetcher<Value> for RecordingFetcher {
        async fn fetch_page(&self, params: &QueryParams) -> Result<PageResult<Value>, QueryError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(params.clone());

            let tag = tag_of(params);
            // "A" is the slow request in the race tests.
            let delay = if tag == "A" { 50 } else { 5 };
            tokio::time::sleep(Duration::from_millis(delay)).await;

            if let Some(n) = self.fail_after {
                if call >= n {
                    return Err(QueryError::Execution("connection reset".to_string()));
                }
            }
            Ok(PageResult::new(
                vec![json!({ "tag": tag })],
                1,
                params.page,
                params.page_size,
            ))
        }
    }

    fn controller(fetcher: Arc<RecordingFetcher>) -> ListController<Value> {
        ListController::new(fetcher, FetchContext::default(), ListOptions::new("clients"))
    }

    fn who(tag: &str) -> BTreeMap<String, FilterValue> {
        let mut filters = BTreeMap::new();
        filters.insert("who".to_string(), FilterValue::literal(tag));
        filters
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_state_is_idle_until_first_fetch() {
        let fetcher = Arc::new(RecordingFetcher::new());
        let list = controller(fetcher.clone());

        assert_eq!(list.snapshot().phase, ListPhase::Idle);
        assert!(list.snapshot().last_result.is_none());

        list.refetch().await.unwrap();
        assert_eq!(list.snapshot().phase, ListPhase::Loaded);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_identical_filters_fetch_exactly_once() {
        let fetcher = Arc::new(RecordingFetcher::new());
        let list = controller(fetcher.clone());

        list.set_filters(who("A")).await;
        list.set_filters(who("A")).await;

        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_page_and_term_do_not_fetch() {
        let fetcher = Arc::new(RecordingFetcher::new());
        let list = controller(fetcher.clone());
        list.refetch().await.unwrap();

        list.set_current_page(1).await; // already page 1
        list.set_page_size(10).await; // already 10
        list.set_search_term("").await; // already empty

        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_filter_change_resets_to_page_one() {
        let fetcher = Arc::new(RecordingFetcher::new());
        let list = controller(fetcher.clone());

        list.set_current_page(3).await;
        assert_eq!(list.snapshot().current_page, 3);

        list.set_filters(who("B")).await;

        assert_eq!(list.snapshot().current_page, 1);
        let fetched = fetcher.last_params().unwrap();
        assert_eq!(fetched.page, 1, "fetch sees the reset page");
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_term_change_resets_to_page_one() {
        let fetcher = Arc::new(RecordingFetcher::new());
        let list = controller(fetcher.clone());

        list.set_current_page(4).await;
        list.set_search_term("eng").await;

        assert_eq!(list.snapshot().current_page, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_size_change_keeps_current_page() {
        let fetcher = Arc::new(RecordingFetcher::new());
        let list = controller(fetcher.clone());

        list.set_current_page(2).await;
        list.set_page_size(25).await;

        assert_eq!(list.snapshot().current_page, 2);
        assert_eq!(list.snapshot().page_size, 25);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_superseded_response_is_dropped() {
        let fetcher = Arc::new(RecordingFetcher::new());
        let list = Arc::new(controller(fetcher.clone()));

        // Issue the slow fetch A, then fetch B before A resolves. B (5ms)
        // completes before A (50ms); A's late response must not clobber B's.
        let list_a = list.clone();
        let a = tokio::spawn(async move { list_a.set_filters(who("A")).await });
        tokio::time::sleep(Duration::from_millis(1)).await;

        let list_b = list.clone();
        let b = tokio::spawn(async move { list_b.set_filters(who("B")).await });

        a.await.unwrap();
        b.await.unwrap();

        let snapshot = list.snapshot();
        assert_eq!(snapshot.phase, ListPhase::Loaded);
        let rows = snapshot.last_result.unwrap().rows;
        assert_eq!(rows, vec![json!({ "tag": "B" })]);
        assert_eq!(fetcher.calls(), 2, "stale request ran but was discarded");
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_preserves_previous_result() {
        let fetcher = Arc::new(RecordingFetcher::failing_after(1));
        let list = controller(fetcher.clone());

        list.set_filters(who("B")).await;
        let loaded = list.snapshot();
        assert_eq!(loaded.phase, ListPhase::Loaded);
        assert!(loaded.last_result.is_some());

        let err = list.refetch().await.unwrap_err();
        assert!(matches!(err, QueryError::Execution(_)));
        let errored = list.snapshot();
        assert_eq!(errored.phase, ListPhase::Errored);
        assert!(errored.error.as_deref().unwrap().contains("connection reset"));
        assert_eq!(
            errored.last_result.unwrap().rows,
            vec![json!({ "tag": "B" })],
            "stale result kept while errored"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_params_serves_one_shot_fetch() {
        let fetcher = Arc::new(RecordingFetcher::new());
        let mut params = QueryParams::new("clients");
        params.page = 2;
        params.filters = who("B");
        let list =
            ListController::with_params(fetcher.clone(), FetchContext::default(), params);

        list.refetch().await.unwrap();

        let snapshot = list.snapshot();
        assert_eq!(snapshot.phase, ListPhase::Loaded);
        assert_eq!(snapshot.current_page, 2);
        assert_eq!(
            snapshot.last_result.unwrap().rows,
            vec![json!({ "tag": "B" })]
        );
        assert_eq!(fetcher.last_params().unwrap().page, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_context_scopes_every_fetch() {
        let company = uuid::Uuid::new_v4();
        let fetcher = Arc::new(RecordingFetcher::new());
        let list = ListController::new(
            fetcher.clone(),
            FetchContext::for_company(company),
            ListOptions::new("candidates"),
        );

        list.refetch().await.unwrap();

        let fetched = fetcher.last_params().unwrap();
        assert_eq!(
            fetched.filters.get("company_id"),
            Some(&FilterValue::literal(company))
        );
        // The scope filter is fetch-side only; visible filter state is clean.
        assert!(list.snapshot().filters.is_empty());
    }
}
