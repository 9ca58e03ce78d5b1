//! Compound range queries for the search backend.
//!
//! Each [`DateRangeQuery`] becomes one `must` clause of the top-level bool
//! query. Its term filters are placed in a nested bool next to its own range,
//! so a filter never leaks into another clause.

use super::QueryError;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Date pattern handed to the backend for range comparisons on tag fields.
pub const DATE_FORMAT: &str = "YYYY/MM/dd HH:mm:ss";

/// Exact-match constraint on `<term>.keyword`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermFilter {
    pub term: String,
    pub value: String,
}

impl TermFilter {
    pub fn new(term: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            value: value.into(),
        }
    }

    /// One filter per map entry, in key order.
    pub fn from_map(filters: &BTreeMap<String, String>) -> Vec<TermFilter> {
        filters
            .iter()
            .map(|(term, value)| TermFilter::new(term, value))
            .collect()
    }

    fn to_clause(&self) -> Value {
        json!({ "term": { format!("{}.keyword", self.term): self.value } })
    }
}

/// A range constraint on one field plus the filters scoped to it.
///
/// Bounds are passed through untouched, typically relative expressions like
/// `now-30d` that the backend resolves at query time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateRangeQuery {
    pub field: String,
    pub format: Option<String>,
    pub gt: Option<String>,
    pub gte: Option<String>,
    pub lt: Option<String>,
    pub lte: Option<String>,
    pub term_filters: Vec<TermFilter>,
}

impl DateRangeQuery {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ..Default::default()
        }
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn gt(mut self, bound: impl Into<String>) -> Self {
        self.gt = Some(bound.into());
        self
    }

    pub fn gte(mut self, bound: impl Into<String>) -> Self {
        self.gte = Some(bound.into());
        self
    }

    pub fn lt(mut self, bound: impl Into<String>) -> Self {
        self.lt = Some(bound.into());
        self
    }

    pub fn lte(mut self, bound: impl Into<String>) -> Self {
        self.lte = Some(bound.into());
        self
    }

    pub fn filter(mut self, filter: TermFilter) -> Self {
        self.term_filters.push(filter);
        self
    }

    pub fn filters(mut self, filters: impl IntoIterator<Item = TermFilter>) -> Self {
        self.term_filters.extend(filters);
        self
    }

    /// Value of the `term` filter on `term`, if this clause has one.
    pub fn filter_value(&self, term: &str) -> Option<&str> {
        self.term_filters
            .iter()
            .find(|filter| filter.term == term)
            .map(|filter| filter.value.as_str())
    }

    fn range_clause(&self) -> Result<Value, QueryError> {
        let mut bounds = Map::new();
        let pairs = [
            ("gt", &self.gt),
            ("gte", &self.gte),
            ("lt", &self.lt),
            ("lte", &self.lte),
        ];
        for (key, bound) in pairs {
            if let Some(bound) = bound {
                bounds.insert(key.to_string(), Value::String(bound.clone()));
            }
        }
        if bounds.is_empty() {
            return Err(QueryError::Unbounded(self.field.clone()));
        }
        if let Some(format) = &self.format {
            bounds.insert("format".to_string(), Value::String(format.clone()));
        }

        let mut range = Map::new();
        range.insert(self.field.clone(), Value::Object(bounds));
        Ok(json!({ "range": range }))
    }

    fn to_clause(&self) -> Result<Value, QueryError> {
        let range = self.range_clause()?;
        if self.term_filters.is_empty() {
            return Ok(json!({ "bool": { "must": [range] } }));
        }

        let filters: Vec<Value> = self.term_filters.iter().map(TermFilter::to_clause).collect();
        Ok(json!({ "bool": { "must": [range], "filter": filters } }))
    }
}

/// AND together every range clause, each with its own filters.
pub fn build_bool_query(queries: &[DateRangeQuery]) -> Result<Value, QueryError> {
    if queries.is_empty() {
        return Err(QueryError::Empty);
    }

    let clauses = queries
        .iter()
        .map(DateRangeQuery::to_clause)
        .collect::<Result<Vec<_>, _>>()?;

    let query = json!({ "bool": { "must": clauses } });
    debug!("Raw bool query: {}", query);
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_clause_keeps_range_and_filters_together() {
        let query = DateRangeQuery::new("yale:renewed_at")
            .format(DATE_FORMAT)
            .lte("now-30d")
            .filter(TermFilter::new("status", "created"));

        let built = build_bool_query(&[query]).unwrap();

        assert_eq!(
            built,
            json!({
                "bool": {
                    "must": [{
                        "bool": {
                            "must": [{
                                "range": {
                                    "yale:renewed_at": {
                                        "lte": "now-30d",
                                        "format": "YYYY/MM/dd HH:mm:ss"
                                    }
                                }
                            }],
                            "filter": [{ "term": { "status.keyword": "created" } }]
                        }
                    }]
                }
            })
        );
    }

    #[test]
    fn filters_stay_scoped_to_their_clause() {
        let renewed = DateRangeQuery::new("yale:renewed_at")
            .lte("now-30d")
            .filter(TermFilter::new("status", "created"));
        let notified = DateRangeQuery::new("yale:notified_at")
            .gte("now-1d")
            .filter(TermFilter::new("status", "decom"));

        let built = build_bool_query(&[renewed, notified]).unwrap();
        let clauses = built["bool"]["must"].as_array().unwrap();

        assert_eq!(clauses.len(), 2);
        assert!(built["bool"].get("filter").is_none());
        assert_eq!(
            clauses[0]["bool"]["must"][0]["range"]["yale:renewed_at"]["lte"],
            "now-30d"
        );
        assert_eq!(
            clauses[0]["bool"]["filter"],
            json!([{ "term": { "status.keyword": "created" } }])
        );
        assert_eq!(
            clauses[1]["bool"]["must"][0]["range"]["yale:notified_at"]["gte"],
            "now-1d"
        );
        assert_eq!(
            clauses[1]["bool"]["filter"],
            json!([{ "term": { "status.keyword": "decom" } }])
        );
    }

    #[test]
    fn clause_without_filters_has_no_filter_key() {
        let built = build_bool_query(&[DateRangeQuery::new("f").gt("now-1h").lt("now")]).unwrap();
        let clause = &built["bool"]["must"][0]["bool"];
        assert!(clause.get("filter").is_none());
        assert_eq!(clause["must"][0]["range"]["f"], json!({ "gt": "now-1h", "lt": "now" }));
    }

    #[test]
    fn map_filters_are_ordered_by_key() {
        let mut map = BTreeMap::new();
        map.insert("yale:subsidized".to_string(), "true".to_string());
        map.insert("provider".to_string(), "aws".to_string());

        let filters = TermFilter::from_map(&map);
        assert_eq!(
            filters,
            vec![
                TermFilter::new("provider", "aws"),
                TermFilter::new("yale:subsidized", "true"),
            ]
        );
    }

    #[test]
    fn rejects_empty_and_unbounded_queries() {
        assert!(matches!(build_bool_query(&[]), Err(QueryError::Empty)));
        assert!(matches!(
            build_bool_query(&[DateRangeQuery::new("yale:renewed_at").format(DATE_FORMAT)]),
            Err(QueryError::Unbounded(field)) if field == "yale:renewed_at"
        ));
    }

    #[test]
    fn filter_value_finds_scoped_term() {
        let query = DateRangeQuery::new("f")
            .lte("now")
            .filter(TermFilter::new("status", "decom"));
        assert_eq!(query.filter_value("status"), Some("decom"));
        assert_eq!(query.filter_value("org"), None);
    }
}
