//! SQL query construction for filtered, paginated listings.
//!
//! Builds statements from a clause list plus a bind-value accumulator so
//! that every caller-supplied value is a `$n` parameter, placeholder
//! numbering stays contiguous regardless of which optional filters are
//! present, and the companion count statement shares the exact predicate
//! set of the list statement.

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use sqlx::postgres::PgArguments;

use crate::error::Error;

/// Bind values for `sqlx` queries.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Int(i64),
    Text(String),
    Bool(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    Decimal(Decimal),
    Json(serde_json::Value),
}

/// 1-based page request with a clamped limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    page: i64,
    limit: i64,
}

impl Page {
    pub const DEFAULT_LIMIT: i64 = 10;
    pub const MESSAGE_LIMIT: i64 = 20;
    const MAX_LIMIT: i64 = 100;

    pub fn new(page: Option<i64>, limit: Option<i64>, default_limit: i64) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(default_limit).clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn current_page(&self) -> i64 {
        self.page
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

/// A page of rows together with the exact unpaginated total.
#[derive(Debug, Clone)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Escape LIKE wildcards in a user-supplied search term, then wrap it for
/// substring matching. The result is always bound, never interpolated.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!("%{escaped}%")
}

#[derive(Debug)]
pub struct QueryBuilder {
    select_sql: String,
    count_sql: String,
    clauses: Vec<String>,
    binds: Vec<BindValue>,
    order_by: Option<String>,
    page: Option<Page>,
}

impl QueryBuilder {
    /// `select_sql` and `count_sql` are the statement heads (projection and
    /// FROM/JOIN section) without any WHERE clause.
    pub fn new(select_sql: impl Into<String>, count_sql: impl Into<String>) -> Self {
        Self {
            select_sql: select_sql.into(),
            count_sql: count_sql.into(),
            clauses: Vec::new(),
            binds: Vec::new(),
            order_by: None,
            page: None,
        }
    }

    fn push_bind(&mut self, value: BindValue) -> usize {
        self.binds.push(value);
        self.binds.len()
    }

    /// Append a predicate with one bound value. Every `$?` in the template
    /// is replaced with the placeholder assigned to `value`, so a single
    /// bind may be referenced from several positions.
    pub fn filter_with(&mut self, template: &str, value: BindValue) {
        let idx = self.push_bind(value);
        self.clauses
            .push(template.replace("$?", &format!("${idx}")));
    }

    pub fn filter_eq(&mut self, column: &str, value: BindValue) {
        self.filter_with(&format!("{column} = $?"), value);
    }

    pub fn filter_ge(&mut self, column: &str, value: BindValue) {
        self.filter_with(&format!("{column} >= $?"), value);
    }

    pub fn filter_le(&mut self, column: &str, value: BindValue) {
        self.filter_with(&format!("{column} <= $?"), value);
    }

    /// Constant predicate with no caller-supplied value (e.g. the
    /// active-user visibility gate).
    pub fn filter_literal(&mut self, clause: &str) {
        self.clauses.push(clause.to_string());
    }

    /// Case-insensitive substring match across several columns, all
    /// referencing one escaped, bound pattern.
    pub fn filter_search(&mut self, columns: &[&str], term: &str) {
        let idx = self.push_bind(BindValue::Text(like_pattern(term)));
        let parts: Vec<String> = columns
            .iter()
            .map(|column| format!("{column} ILIKE ${idx}"))
            .collect();
        self.clauses.push(format!("({})", parts.join(" OR ")));
    }

    pub fn order_by(&mut self, order: &str) {
        self.order_by = Some(order.to_string());
    }

    pub fn paginate(&mut self, page: Page) {
        self.page = Some(page);
    }

    fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    /// The list statement. LIMIT and OFFSET are always the final two
    /// parameters.
    pub fn build(&self) -> (String, Vec<BindValue>) {
        let mut sql = format!("{}{}", self.select_sql, self.where_sql());
        let mut binds = self.binds.clone();

        if let Some(order) = &self.order_by {
            sql.push_str(&format!(" ORDER BY {order}"));
        }

        if let Some(page) = self.page {
            binds.push(BindValue::Int(page.limit()));
            let limit_idx = binds.len();
            binds.push(BindValue::Int(page.offset()));
            let offset_idx = binds.len();
            sql.push_str(&format!(" LIMIT ${limit_idx} OFFSET ${offset_idx}"));
        }

        (sql, binds)
    }

    /// The companion count statement: identical predicate set, no ordering
    /// or pagination.
    pub fn build_count(&self) -> (String, Vec<BindValue>) {
        let sql = format!("{}{}", self.count_sql, self.where_sql());
        (sql, self.binds.clone())
    }
}

/// Dynamic UPDATE statement from an explicit allow-list of `set` calls.
/// A patch that sets nothing is rejected before reaching the store.
#[derive(Debug)]
pub struct UpdateBuilder {
    table: &'static str,
    sets: Vec<String>,
    binds: Vec<BindValue>,
}

impl UpdateBuilder {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            sets: Vec::new(),
            binds: Vec::new(),
        }
    }

    pub fn set(&mut self, column: &str, value: BindValue) -> &mut Self {
        self.binds.push(value);
        self.sets.push(format!("{column} = ${}", self.binds.len()));
        self
    }

    pub fn set_text(&mut self, column: &str, value: Option<String>) -> &mut Self {
        if let Some(value) = value {
            self.set(column, BindValue::Text(value));
        }
        self
    }

    pub fn set_int(&mut self, column: &str, value: Option<i64>) -> &mut Self {
        if let Some(value) = value {
            self.set(column, BindValue::Int(value));
        }
        self
    }

    pub fn set_bool(&mut self, column: &str, value: Option<bool>) -> &mut Self {
        if let Some(value) = value {
            self.set(column, BindValue::Bool(value));
        }
        self
    }

    pub fn set_date(&mut self, column: &str, value: Option<NaiveDate>) -> &mut Self {
        if let Some(value) = value {
            self.set(column, BindValue::Date(value));
        }
        self
    }

    pub fn set_time(&mut self, column: &str, value: Option<NaiveTime>) -> &mut Self {
        if let Some(value) = value {
            self.set(column, BindValue::Time(value));
        }
        self
    }

    pub fn set_decimal(&mut self, column: &str, value: Option<Decimal>) -> &mut Self {
        if let Some(value) = value {
            self.set(column, BindValue::Decimal(value));
        }
        self
    }

    pub fn set_json(&mut self, column: &str, value: Option<serde_json::Value>) -> &mut Self {
        if let Some(value) = value {
            self.set(column, BindValue::Json(value));
        }
        self
    }

    /// Assignment through a Postgres cast, for enum-typed columns whose
    /// values arrive as bound text (e.g. `status = $3::appointment_status`).
    pub fn set_cast(&mut self, column: &str, cast: &str, value: BindValue) -> &mut Self {
        self.binds.push(value);
        self.sets
            .push(format!("{column} = ${}::{cast}", self.binds.len()));
        self
    }

    pub fn set_cast_text(
        &mut self,
        column: &str,
        cast: &str,
        value: Option<&'static str>,
    ) -> &mut Self {
        if let Some(value) = value {
            self.set_cast(column, cast, BindValue::Text(value.to_string()));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn build(mut self, id: i64) -> Result<(String, Vec<BindValue>), Error> {
        if self.sets.is_empty() {
            return Err(Error::InvalidUpdate);
        }

        self.sets.push("updated_at = NOW()".to_string());
        self.binds.push(BindValue::Int(id));
        let id_idx = self.binds.len();

        let sql = format!(
            "UPDATE {} SET {} WHERE id = ${} RETURNING *",
            self.table,
            self.sets.join(", "),
            id_idx
        );
        Ok((sql, self.binds))
    }
}

/// Bind accumulated values onto a typed query in order.
pub fn bind_query_as<'q, O>(
    mut query: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    values: Vec<BindValue>,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments> {
    for value in values {
        query = match value {
            BindValue::Int(v) => query.bind(v),
            BindValue::Text(v) => query.bind(v),
            BindValue::Bool(v) => query.bind(v),
            BindValue::Date(v) => query.bind(v),
            BindValue::Time(v) => query.bind(v),
            BindValue::Decimal(v) => query.bind(v),
            BindValue::Json(v) => query.bind(v),
        };
    }
    query
}

/// Bind accumulated values onto a scalar query (the count statements).
pub fn bind_query_scalar<'q, O>(
    mut query: sqlx::query::QueryScalar<'q, sqlx::Postgres, O, PgArguments>,
    values: Vec<BindValue>,
) -> sqlx::query::QueryScalar<'q, sqlx::Postgres, O, PgArguments> {
    for value in values {
        query = match value {
            BindValue::Int(v) => query.bind(v),
            BindValue::Text(v) => query.bind(v),
            BindValue::Bool(v) => query.bind(v),
            BindValue::Date(v) => query.bind(v),
            BindValue::Time(v) => query.bind(v),
            BindValue::Decimal(v) => query.bind(v),
            BindValue::Json(v) => query.bind(v),
        };
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Highest `$n` placeholder appearing in the statement.
    fn max_placeholder(sql: &str) -> usize {
        let mut max = 0;
        let bytes = sql.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'$' {
                let mut j = i + 1;
                while j < bytes.len() && bytes[j].is_ascii_digit() {
                    j += 1;
                }
                if j > i + 1 {
                    let n: usize = sql[i + 1..j].parse().unwrap();
                    max = max.max(n);
                }
                i = j;
            } else {
                i += 1;
            }
        }
        max
    }

    fn sample_builder() -> QueryBuilder {
        QueryBuilder::new(
            "SELECT * FROM appointments",
            "SELECT COUNT(*) FROM appointments",
        )
    }

    #[test]
    fn no_filters_means_no_where_clause() {
        let (sql, binds) = sample_builder().build();
        assert_eq!(sql, "SELECT * FROM appointments");
        assert!(binds.is_empty());
    }

    #[test]
    fn placeholders_are_contiguous_for_every_filter_combination() {
        // Each optional filter independently present or absent; numbering
        // must stay dense and equal to the bind count in every combination.
        for mask in 0..8u8 {
            let mut builder = sample_builder();
            if mask & 1 != 0 {
                builder.filter_eq("status", BindValue::Text("scheduled".into()));
            }
            if mask & 2 != 0 {
                builder.filter_ge(
                    "appointment_date",
                    BindValue::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
                );
            }
            if mask & 4 != 0 {
                builder.filter_le(
                    "appointment_date",
                    BindValue::Date(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()),
                );
            }
            let (sql, binds) = builder.build();
            assert_eq!(
                max_placeholder(&sql),
                binds.len(),
                "combination {mask:#05b}: {sql}"
            );
        }
    }

    #[test]
    fn limit_and_offset_are_always_the_final_two_parameters() {
        let mut builder = sample_builder();
        builder.filter_eq("doctor_id", BindValue::Int(4));
        builder.filter_eq("status", BindValue::Text("confirmed".into()));
        builder.order_by("appointment_date DESC, appointment_time DESC, id DESC");
        builder.paginate(Page::new(Some(3), Some(10), Page::DEFAULT_LIMIT));

        let (sql, binds) = builder.build();
        assert!(sql.ends_with("LIMIT $3 OFFSET $4"), "{sql}");
        assert_eq!(binds[2], BindValue::Int(10));
        assert_eq!(binds[3], BindValue::Int(20));
    }

    #[test]
    fn count_statement_shares_the_exact_predicate_set() {
        let mut builder = sample_builder();
        builder.filter_eq("patient_id", BindValue::Int(11));
        builder.filter_eq("status", BindValue::Text("scheduled".into()));
        builder.filter_ge(
            "appointment_date",
            BindValue::Date(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()),
        );
        builder.order_by("appointment_date DESC, id DESC");
        builder.paginate(Page::new(None, None, Page::DEFAULT_LIMIT));

        let (list_sql, list_binds) = builder.build();
        let (count_sql, count_binds) = builder.build_count();

        let list_where = list_sql
            .split_once(" WHERE ")
            .map(|(_, rest)| rest.split(" ORDER BY ").next().unwrap())
            .unwrap();
        let count_where = count_sql.split_once(" WHERE ").map(|(_, rest)| rest).unwrap();
        assert_eq!(list_where, count_where);

        // Count binds are the list binds minus the trailing limit/offset.
        assert_eq!(count_binds.len() + 2, list_binds.len());
        assert_eq!(count_binds[..], list_binds[..count_binds.len()]);
        assert!(!count_sql.contains("LIMIT"));
        assert!(!count_sql.contains("OFFSET"));
    }

    #[test]
    fn search_reuses_one_bound_pattern_across_columns() {
        let mut builder = QueryBuilder::new(
            "SELECT p.* FROM patients p JOIN users u ON p.user_id = u.id",
            "SELECT COUNT(*) FROM patients p JOIN users u ON p.user_id = u.id",
        );
        builder.filter_literal("u.is_active = TRUE");
        builder.filter_search(&["u.first_name", "u.last_name", "u.email"], "smith");

        let (sql, binds) = builder.build();
        assert!(sql.contains(
            "(u.first_name ILIKE $1 OR u.last_name ILIKE $1 OR u.email ILIKE $1)"
        ));
        assert_eq!(binds, vec![BindValue::Text("%smith%".into())]);
    }

    #[test]
    fn search_term_wildcards_are_escaped_and_bound() {
        let mut builder = sample_builder();
        builder.filter_search(&["reason"], "100%_legit'; DROP TABLE--");

        let (sql, binds) = builder.build();
        // The raw term never appears in the statement text.
        assert!(!sql.contains("DROP TABLE"));
        assert_eq!(
            binds,
            vec![BindValue::Text("%100\\%\\_legit'; DROP TABLE--%".into())]
        );
    }

    #[test]
    fn like_pattern_escapes_backslash_percent_underscore() {
        assert_eq!(like_pattern("a%b"), "%a\\%b%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
        assert_eq!(like_pattern("plain"), "%plain%");
    }

    #[test]
    fn filter_with_substitutes_every_reference() {
        let mut builder = sample_builder();
        builder.filter_with(
            "EXISTS (SELECT 1 FROM medical_records mr WHERE mr.id = l.medical_record_id AND mr.doctor_id = $?)",
            BindValue::Int(9),
        );
        let (sql, binds) = builder.build();
        assert!(sql.contains("mr.doctor_id = $1"));
        assert_eq!(binds, vec![BindValue::Int(9)]);
    }

    #[test]
    fn page_defaults_and_clamps() {
        let page = Page::new(None, None, Page::DEFAULT_LIMIT);
        assert_eq!(page.current_page(), 1);
        assert_eq!(page.limit(), 10);
        assert_eq!(page.offset(), 0);

        let page = Page::new(Some(0), Some(0), Page::DEFAULT_LIMIT);
        assert_eq!(page.current_page(), 1);
        assert_eq!(page.limit(), 1);

        let page = Page::new(Some(2), Some(500), Page::MESSAGE_LIMIT);
        assert_eq!(page.limit(), 100);
        assert_eq!(page.offset(), 100);

        let page = Page::new(Some(4), None, Page::MESSAGE_LIMIT);
        assert_eq!(page.limit(), 20);
        assert_eq!(page.offset(), 60);
    }

    #[test]
    fn update_builder_numbers_sets_then_id() {
        let mut builder = UpdateBuilder::new("appointments");
        builder
            .set_text("status", Some("cancelled".into()))
            .set_text("notes", Some("patient request".into()));
        let (sql, binds) = builder.build(17).unwrap();
        assert_eq!(
            sql,
            "UPDATE appointments SET status = $1, notes = $2, updated_at = NOW() \
             WHERE id = $3 RETURNING *"
        );
        assert_eq!(binds[2], BindValue::Int(17));
    }

    #[test]
    fn update_builder_skips_absent_fields() {
        let mut builder = UpdateBuilder::new("patients");
        builder
            .set_text("phone", None)
            .set_text("address", Some("12 Elm St".into()))
            .set_date("date_of_birth", None);
        let (sql, binds) = builder.build(5).unwrap();
        assert!(sql.contains("address = $1"));
        assert!(!sql.contains("phone"));
        assert_eq!(binds.len(), 2);
    }

    #[test]
    fn update_builder_casts_enum_assignments() {
        let mut builder = UpdateBuilder::new("appointments");
        builder.set_cast_text("status", "appointment_status", Some("confirmed"));
        let (sql, binds) = builder.build(2).unwrap();
        assert!(sql.contains("status = $1::appointment_status"), "{sql}");
        assert_eq!(binds[0], BindValue::Text("confirmed".into()));
    }

    #[test]
    fn update_builder_rejects_empty_patch_before_store() {
        let builder = UpdateBuilder::new("patients");
        assert!(builder.is_empty());
        match builder.build(1) {
            Err(Error::InvalidUpdate) => {}
            other => panic!("expected InvalidUpdate, got {other:?}"),
        }
    }
}
