//! The record store trait the processing core is written against.

use async_trait::async_trait;

use crate::error::RecordResult;

/// A single record, as an opaque JSON object.
pub type Row = serde_json::Value;

/// Column-equality filter for select/update/delete.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<(String, String)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `column = value` clause.
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.clauses.push((column.into(), value.into()));
        self
    }

    /// Render as PostgREST query pairs (`col=eq.value`).
    pub fn to_query(&self) -> Vec<(String, String)> {
        self.clauses
            .iter()
            .map(|(col, val)| (col.clone(), format!("eq.{}", val)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// Typed CRUD against named collections.
///
/// No transactional guarantees beyond per-call atomicity; callers that
/// need read-then-write semantics accept the race.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a row, returning the stored representation.
    async fn insert(&self, collection: &str, row: Row) -> RecordResult<Row>;

    /// Update all rows matching the filter with the given fields.
    async fn update(&self, collection: &str, filter: &Filter, fields: Row) -> RecordResult<()>;

    /// Select all rows matching the filter.
    async fn select(&self, collection: &str, filter: &Filter) -> RecordResult<Vec<Row>>;

    /// Delete all rows matching the filter.
    async fn delete(&self, collection: &str, filter: &Filter) -> RecordResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_query_encoding() {
        let filter = Filter::new().eq("id", "v1").eq("user_id", "u1");
        assert_eq!(
            filter.to_query(),
            vec![
                ("id".to_string(), "eq.v1".to_string()),
                ("user_id".to_string(), "eq.u1".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_filter() {
        assert!(Filter::new().is_empty());
        assert!(!Filter::new().eq("id", "v1").is_empty());
    }
}
