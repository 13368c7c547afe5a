//! Query Compiler — turns a [`QueryParams`] into one executable SQL statement.
//!
//! Pure and deterministic: no I/O, and filter/foreign-key maps are BTreeMaps
//! so the same params always compile to the same SQL text and bind order.
//!
//! The statement returns a single `(total_count, rows)` row: a scalar
//! `count(*)` subquery over the WHERE clause and a `json_agg(row_to_json(..))`
//! subquery with sort and range applied. Placeholders are shared between the
//! two subqueries, so rows and the exact pre-pagination count come back in
//! one round trip.

use std::fmt;

use super::params::{FilterOperator, FilterValue, QueryParams, Scalar};
use super::QueryError;

/// Why a filter entry was dropped during compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EmptyValue,
    UnknownOperator,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::EmptyValue => f.write_str("empty value"),
            SkipReason::UnknownOperator => f.write_str("unrecognized operator"),
        }
    }
}

/// A dropped filter entry. Dropping is a no-op by design; the diagnostic
/// exists so callers can detect typos in filter configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationSkip {
    pub column: String,
    pub reason: SkipReason,
}

/// The compiled form of one fetch: SQL text plus ordered bind values.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub binds: Vec<Scalar>,
    pub page: u32,
    pub page_size: u32,
    pub offset: i64,
    pub limit: i64,
    pub diagnostics: Vec<ValidationSkip>,
}

pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub(crate) fn checked_ident(s: &str) -> Result<&str, QueryError> {
    if is_identifier(s) {
        Ok(s)
    } else {
        Err(QueryError::InvalidIdentifier(s.to_string()))
    }
}

fn comparator(op: FilterOperator) -> Option<&'static str> {
    match op {
        FilterOperator::Eq => Some("="),
        FilterOperator::Gt => Some(">"),
        FilterOperator::Gte => Some(">="),
        FilterOperator::Lt => Some("<"),
        FilterOperator::Lte => Some("<="),
        FilterOperator::Ne => Some("<>"),
        _ => None,
    }
}

/// Compiles `params` into a single executable statement.
pub fn compile(params: &QueryParams) -> Result<CompiledQuery, QueryError> {
    let table = checked_ident(&params.resource)?;
    let sort_column = checked_ident(&params.sort.column)?;

    let page = params.page.max(1);
    let page_size = params.page_size.max(1);
    let offset = (page as i64 - 1) * page_size as i64;
    let limit = page_size as i64;

    // Field selection: every direct column plus one inline JSON projection
    // per foreign-key expansion (`rel:rel(f1,f2)` in the dashboard's terms).
    let mut select_list = vec!["t.*".to_string()];
    for (relation, fields) in &params.foreign_keys {
        let relation = checked_ident(relation)?;
        let pairs = fields
            .iter()
            .map(|f| checked_ident(f).map(|f| format!("'{f}', r.\"{f}\"")))
            .collect::<Result<Vec<_>, _>>()?
            .join(", ");
        select_list.push(format!(
            "(SELECT json_build_object({pairs}) FROM \"{relation}\" AS r \
             WHERE r.\"id\" = t.\"{relation}_id\") AS \"{relation}\""
        ));
    }

    let mut conditions: Vec<String> = Vec::new();
    let mut binds: Vec<Scalar> = Vec::new();
    let mut diagnostics: Vec<ValidationSkip> = Vec::new();

    let next_placeholder = |binds: &mut Vec<Scalar>, value: Scalar| {
        binds.push(value);
        format!("${}", binds.len())
    };

    for (column, filter) in &params.filters {
        let column = checked_ident(column)?;
        match filter {
            FilterValue::Literal(value) if value.is_empty() => {
                diagnostics.push(ValidationSkip {
                    column: column.to_string(),
                    reason: SkipReason::EmptyValue,
                });
            }
            FilterValue::Literal(value) => {
                let p = next_placeholder(&mut binds, value.clone());
                conditions.push(format!("t.\"{column}\" = {p}"));
            }
            FilterValue::Condition { value, .. } if value.is_empty() => {
                diagnostics.push(ValidationSkip {
                    column: column.to_string(),
                    reason: SkipReason::EmptyValue,
                });
            }
            FilterValue::Condition { operator, value } => {
                if let Some(cmp) = comparator(*operator) {
                    let p = next_placeholder(&mut binds, value.clone());
                    conditions.push(format!("t.\"{column}\" {cmp} {p}"));
                } else if *operator == FilterOperator::ILike {
                    match value.pattern_text() {
                        Some(text) => {
                            let p =
                                next_placeholder(&mut binds, Scalar::Text(format!("%{text}%")));
                            conditions.push(format!("t.\"{column}\" ILIKE {p}"));
                        }
                        None => diagnostics.push(ValidationSkip {
                            column: column.to_string(),
                            reason: SkipReason::EmptyValue,
                        }),
                    }
                } else if *operator == FilterOperator::Contains {
                    // Containment works on array columns; a bare text value is
                    // promoted to a one-element array.
                    let array = match value {
                        Scalar::TextArray(items) => Scalar::TextArray(items.clone()),
                        other => match other.pattern_text() {
                            Some(text) => Scalar::TextArray(vec![text]),
                            None => {
                                diagnostics.push(ValidationSkip {
                                    column: column.to_string(),
                                    reason: SkipReason::EmptyValue,
                                });
                                continue;
                            }
                        },
                    };
                    let p = next_placeholder(&mut binds, array);
                    conditions.push(format!("t.\"{column}\" @> {p}"));
                } else {
                    diagnostics.push(ValidationSkip {
                        column: column.to_string(),
                        reason: SkipReason::UnknownOperator,
                    });
                }
            }
        }
    }

    // OR-combined substring search across the listed columns; one bind shared
    // by every branch. Columns that are not valid identifiers are dropped.
    if !params.search_term.is_empty() {
        let columns: Vec<&str> = params
            .search_columns
            .iter()
            .map(String::as_str)
            .filter(|c| is_identifier(c))
            .collect();
        if !columns.is_empty() {
            let p = next_placeholder(
                &mut binds,
                Scalar::Text(format!("%{}%", params.search_term)),
            );
            let branches: Vec<String> = columns
                .iter()
                .map(|c| format!("t.\"{c}\" ILIKE {p}"))
                .collect();
            conditions.push(format!("({})", branches.join(" OR ")));
        }
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let sql = format!(
        "SELECT (SELECT count(*) FROM \"{table}\" AS t{where_clause}) AS total_count, \
         (SELECT coalesce(json_agg(row_to_json(sub)), '[]'::json) FROM \
         (SELECT {select} FROM \"{table}\" AS t{where_clause} \
         ORDER BY t.\"{sort_column}\" {direction} LIMIT {limit} OFFSET {offset}) AS sub) AS rows",
        select = select_list.join(", "),
        direction = params.sort.direction.as_sql(),
    );

    Ok(CompiledQuery {
        sql,
        binds,
        page,
        page_size,
        offset,
        limit,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::params::{Sort, SortDirection};

    fn base(resource: &str) -> QueryParams {
        QueryParams::new(resource)
    }

    #[test]
    fn test_page_two_compiles_to_range_ten_nineteen() {
        let mut params = base("clients");
        params.page = 2;
        params.page_size = 10;
        params.sort = Sort::new("name", SortDirection::Asc);

        let compiled = compile(&params).unwrap();
        assert_eq!(compiled.offset, 10);
        assert_eq!(compiled.limit, 10);
        assert!(compiled.sql.contains("LIMIT 10 OFFSET 10"));
        assert!(compiled.sql.contains("ORDER BY t.\"name\" ASC"));
        assert!(!compiled.sql.contains("WHERE"));
        assert!(compiled.binds.is_empty());
        assert!(compiled.diagnostics.is_empty());
    }

    #[test]
    fn test_offset_is_page_minus_one_times_size() {
        for (page, size, expected) in [(1, 10, 0), (3, 7, 14), (5, 25, 100)] {
            let mut params = base("clients");
            params.page = page;
            params.page_size = size;
            let compiled = compile(&params).unwrap();
            assert_eq!(compiled.offset, expected);
            assert_eq!(compiled.limit, size as i64);
        }
    }

    #[test]
    fn test_ilike_filter_binds_wrapped_pattern() {
        let mut params = base("candidates");
        params.filters.insert(
            "name".to_string(),
            FilterValue::condition(FilterOperator::ILike, "john"),
        );

        let compiled = compile(&params).unwrap();
        assert!(compiled.sql.contains("t.\"name\" ILIKE $1"));
        assert_eq!(compiled.binds, vec![Scalar::Text("%john%".to_string())]);
    }

    #[test]
    fn test_empty_ilike_value_compiles_to_no_constraint() {
        let mut params = base("candidates");
        params.filters.insert(
            "name".to_string(),
            FilterValue::condition(FilterOperator::ILike, ""),
        );

        let compiled = compile(&params).unwrap();
        assert!(!compiled.sql.contains("ILIKE"));
        assert!(compiled.binds.is_empty());
        assert_eq!(
            compiled.diagnostics,
            vec![ValidationSkip {
                column: "name".to_string(),
                reason: SkipReason::EmptyValue,
            }]
        );
    }

    #[test]
    fn test_empty_and_null_literals_are_omitted() {
        let mut params = base("candidates");
        params
            .filters
            .insert("a".to_string(), FilterValue::literal(""));
        params
            .filters
            .insert("b".to_string(), FilterValue::Literal(Scalar::Null));
        params
            .filters
            .insert("c".to_string(), FilterValue::literal("kept"));

        let compiled = compile(&params).unwrap();
        assert!(!compiled.sql.contains("\"a\""));
        assert!(!compiled.sql.contains("\"b\""));
        assert!(compiled.sql.contains("t.\"c\" = $1"));
        assert_eq!(compiled.binds, vec![Scalar::Text("kept".to_string())]);
        assert_eq!(compiled.diagnostics.len(), 2);
    }

    #[test]
    fn test_search_compiles_to_or_group_with_shared_bind() {
        let mut params = base("candidates");
        params.search_term = "eng".to_string();
        params.search_columns = vec!["role".to_string(), "email".to_string()];

        let compiled = compile(&params).unwrap();
        assert!(compiled
            .sql
            .contains("(t.\"role\" ILIKE $1 OR t.\"email\" ILIKE $1)"));
        assert_eq!(compiled.binds, vec![Scalar::Text("%eng%".to_string())]);
    }

    #[test]
    fn test_search_without_columns_adds_nothing() {
        let mut params = base("candidates");
        params.search_term = "eng".to_string();
        params.search_columns = vec!["not a column!".to_string()];

        let compiled = compile(&params).unwrap();
        assert!(!compiled.sql.contains("ILIKE"));
        assert!(compiled.binds.is_empty());
    }

    #[test]
    fn test_unknown_operator_is_skipped_with_diagnostic() {
        let mut params = base("clients");
        params.filters.insert(
            "name".to_string(),
            FilterValue::condition(FilterOperator::Unknown, "x"),
        );

        let compiled = compile(&params).unwrap();
        assert!(!compiled.sql.contains("\"name\""));
        assert_eq!(
            compiled.diagnostics,
            vec![ValidationSkip {
                column: "name".to_string(),
                reason: SkipReason::UnknownOperator,
            }]
        );
    }

    #[test]
    fn test_comparison_operators_map_to_sql() {
        let cases = [
            (FilterOperator::Eq, "="),
            (FilterOperator::Gt, ">"),
            (FilterOperator::Gte, ">="),
            (FilterOperator::Lt, "<"),
            (FilterOperator::Lte, "<="),
            (FilterOperator::Ne, "<>"),
        ];
        for (op, sql_op) in cases {
            let mut params = base("clients");
            params
                .filters
                .insert("age".to_string(), FilterValue::condition(op, 30i64));
            let compiled = compile(&params).unwrap();
            assert!(
                compiled.sql.contains(&format!("t.\"age\" {sql_op} $1")),
                "operator {op} missing from {}",
                compiled.sql
            );
            assert_eq!(compiled.binds, vec![Scalar::Int(30)]);
        }
    }

    #[test]
    fn test_contains_promotes_text_to_array() {
        let mut params = base("job_postings");
        params.filters.insert(
            "skills_required".to_string(),
            FilterValue::condition(FilterOperator::Contains, "rust"),
        );

        let compiled = compile(&params).unwrap();
        assert!(compiled.sql.contains("t.\"skills_required\" @> $1"));
        assert_eq!(
            compiled.binds,
            vec![Scalar::TextArray(vec!["rust".to_string()])]
        );
    }

    #[test]
    fn test_foreign_key_expansion_projects_json_object() {
        let mut params = base("clients");
        params.foreign_keys.insert(
            "company".to_string(),
            vec!["id".to_string(), "name".to_string()],
        );

        let compiled = compile(&params).unwrap();
        assert!(compiled.sql.contains(
            "(SELECT json_build_object('id', r.\"id\", 'name', r.\"name\") \
             FROM \"company\" AS r WHERE r.\"id\" = t.\"company_id\") AS \"company\""
        ));
    }

    #[test]
    fn test_invalid_identifiers_are_rejected() {
        let params = base("clients; DROP TABLE clients");
        assert!(matches!(
            compile(&params),
            Err(QueryError::InvalidIdentifier(_))
        ));

        let mut params = base("clients");
        params.sort = Sort::new("name\" --", SortDirection::Asc);
        assert!(matches!(
            compile(&params),
            Err(QueryError::InvalidIdentifier(_))
        ));

        let mut params = base("clients");
        params
            .filters
            .insert("bad col".to_string(), FilterValue::literal("x"));
        assert!(matches!(
            compile(&params),
            Err(QueryError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_compile_is_deterministic() {
        let mut params = base("candidates");
        params.filters.insert(
            "status".to_string(),
            FilterValue::condition(FilterOperator::Eq, "active"),
        );
        params.filters.insert(
            "name".to_string(),
            FilterValue::condition(FilterOperator::ILike, "ann"),
        );
        params.search_term = "eng".to_string();
        params.search_columns = vec!["role".to_string()];

        let a = compile(&params).unwrap();
        let b = compile(&params).unwrap();
        assert_eq!(a, b);
        // BTreeMap ordering: "name" before "status".
        assert!(
            a.sql.find("t.\"name\" ILIKE").unwrap()
                < a.sql.find("t.\"status\" = ").unwrap()
        );
    }

    #[test]
    fn test_count_and_rows_share_where_clause() {
        let mut params = base("clients");
        params
            .filters
            .insert("company_id".to_string(), FilterValue::literal("abc"));

        let compiled = compile(&params).unwrap();
        let occurrences = compiled
            .sql
            .match_indices("t.\"company_id\" = $1")
            .count();
        assert_eq!(occurrences, 2, "count and rows subqueries reuse $1");
        assert_eq!(compiled.binds.len(), 1);
    }

    #[test]
    fn test_company_scope_binds_uuid_not_text() {
        let company = uuid::Uuid::new_v4();
        let ctx = crate::query::FetchContext::for_company(company);
        let params = ctx.apply(&base("candidates"));

        let compiled = compile(&params).unwrap();
        assert!(compiled.sql.contains("t.\"company_id\" = $1"));
        assert_eq!(
            compiled.binds,
            vec![Scalar::Uuid(company)],
            "uuid columns need a uuid-typed bind, not its text rendering"
        );
    }
}
