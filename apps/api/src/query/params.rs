//! Query Parameter Model — the normalized description of one fetch intent.
//!
//! Everything here is plain data with value equality. The List State
//! Controller relies on `PartialEq` to detect real parameter changes, and the
//! compiler relies on `BTreeMap` iteration order to stay deterministic.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A filter/bind value. Deserializes untagged, so the JSON shapes the
/// dashboard sends (`"x"`, `5`, `true`, `["a","b"]`, `null`) all parse.
///
/// `Uuid` sits before `Text` so uuid-shaped strings keep their type and bind
/// with the uuid OID; binding them as text makes Postgres reject the
/// comparison against uuid columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Uuid(Uuid),
    Text(String),
    TextArray(Vec<String>),
}

impl Scalar {
    /// Empty values make a filter entry a no-op, never "filter for empty".
    pub fn is_empty(&self) -> bool {
        matches!(self, Scalar::Null) || matches!(self, Scalar::Text(s) if s.is_empty())
    }

    /// Text rendering used to build `%value%` substring patterns.
    pub fn pattern_text(&self) -> Option<String> {
        match self {
            Scalar::Text(s) => Some(s.clone()),
            Scalar::Int(n) => Some(n.to_string()),
            Scalar::Float(f) => Some(f.to_string()),
            Scalar::Bool(b) => Some(b.to_string()),
            Scalar::Uuid(u) => Some(u.to_string()),
            Scalar::Null | Scalar::TextArray(_) => None,
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<Uuid> for Scalar {
    fn from(id: Uuid) -> Self {
        Scalar::Uuid(id)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Int(n)
    }
}

/// Filter operators understood by the compiler.
///
/// `Unknown` keeps a typo'd operator representable instead of failing
/// deserialization; the compiler skips it and reports a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    Ne,
    ILike,
    Contains,
    Unknown,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::Ne => "ne",
            FilterOperator::ILike => "ilike",
            FilterOperator::Contains => "contains",
            FilterOperator::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "eq" => FilterOperator::Eq,
            "gt" => FilterOperator::Gt,
            "gte" => FilterOperator::Gte,
            "lt" => FilterOperator::Lt,
            "lte" => FilterOperator::Lte,
            "ne" => FilterOperator::Ne,
            "ilike" => FilterOperator::ILike,
            "contains" => FilterOperator::Contains,
            _ => FilterOperator::Unknown,
        })
    }
}

impl Serialize for FilterOperator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FilterOperator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// One filter entry: either a bare literal (equality) or an explicit
/// `{operator, value}` condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Condition {
        operator: FilterOperator,
        value: Scalar,
    },
    Literal(Scalar),
}

impl FilterValue {
    pub fn condition(operator: FilterOperator, value: impl Into<Scalar>) -> Self {
        FilterValue::Condition {
            operator,
            value: value.into(),
        }
    }

    pub fn literal(value: impl Into<Scalar>) -> Self {
        FilterValue::Literal(value.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Sort specification. Ties between equal sort keys are unordered; add an
/// explicit tiebreaker column if a stable order matters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    pub column: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn new(column: &str, direction: SortDirection) -> Self {
        Sort {
            column: column.to_string(),
            direction,
        }
    }
}

impl Default for Sort {
    fn default() -> Self {
        Sort::new("created_at", SortDirection::Asc)
    }
}

/// Describes one paginated fetch: which collection, which page, how filtered,
/// how sorted, and which related resources to expand inline.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParams {
    pub resource: String,
    /// 1-based.
    pub page: u32,
    pub page_size: u32,
    pub sort: Sort,
    pub filters: BTreeMap<String, FilterValue>,
    pub search_term: String,
    pub search_columns: Vec<String>,
    /// relation name -> fields to project inline (`rel:rel(f1,f2)`).
    pub foreign_keys: BTreeMap<String, Vec<String>>,
}

impl QueryParams {
    pub fn new(resource: &str) -> Self {
        QueryParams {
            resource: resource.to_string(),
            page: 1,
            page_size: 10,
            sort: Sort::default(),
            filters: BTreeMap::new(),
            search_term: String::new(),
            search_columns: Vec::new(),
            foreign_keys: BTreeMap::new(),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page.max(1) as i64 - 1) * self.page_size as i64
    }
}

/// Explicit request scope, replacing the ambient "current user" store: the
/// company (and optionally profile) every fetch is constrained to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchContext {
    pub company_id: Option<Uuid>,
    pub profile_id: Option<Uuid>,
}

impl FetchContext {
    pub fn for_company(company_id: Uuid) -> Self {
        FetchContext {
            company_id: Some(company_id),
            profile_id: None,
        }
    }

    /// Returns `params` with the scope filters merged in. Scope wins over
    /// caller-supplied filters for the same columns.
    pub fn apply(&self, params: &QueryParams) -> QueryParams {
        let mut effective = params.clone();
        if let Some(company_id) = self.company_id {
            effective
                .filters
                .insert("company_id".to_string(), FilterValue::literal(company_id));
        }
        if let Some(profile_id) = self.profile_id {
            effective
                .filters
                .insert("profile_id".to_string(), FilterValue::literal(profile_id));
        }
        effective
    }
}
