//! Equality filters over field-maps.

use serde_json::Value;

use super::FieldMap;

/// A conjunction of field equality clauses.
///
/// Clauses are kept in insertion order. Setting a field that already has a
/// clause replaces the earlier value (last write wins), so merging a
/// secondary-identifier predicate into a caller-supplied filter makes the
/// secondary-identifier value authoritative for its own key without touching
/// any other clause.
///
/// ## Example
///
/// ```
/// use documap::Filter;
///
/// let filter = Filter::new().eq("owner", "user-1").eq("archived", false);
/// assert_eq!(filter.len(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, Value)>,
}

impl Filter {
    /// Create an empty filter. An empty filter matches every document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality clause, replacing any existing clause for the field.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// In-place variant of [`eq`](Self::eq).
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        let value = value.into();
        if let Some(clause) = self.clauses.iter_mut().find(|(f, _)| *f == field) {
            clause.1 = value;
        } else {
            self.clauses.push((field, value));
        }
    }

    /// The clauses in insertion order.
    pub fn clauses(&self) -> &[(String, Value)] {
        &self.clauses
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Whether every clause holds for the given field-map.
    pub fn matches(&self, fields: &FieldMap) -> bool {
        self.clauses
            .iter()
            .all(|(field, value)| fields.get(field) == Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> FieldMap {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = Filter::new();
        assert!(filter.matches(&fields(json!({"a": 1}))));
        assert!(filter.matches(&FieldMap::new()));
    }

    #[test]
    fn clauses_are_conjunctive() {
        let filter = Filter::new().eq("name", "a").eq("age", 5);
        assert!(filter.matches(&fields(json!({"name": "a", "age": 5, "extra": true}))));
        assert!(!filter.matches(&fields(json!({"name": "a", "age": 6}))));
        assert!(!filter.matches(&fields(json!({"age": 5}))));
    }

    #[test]
    fn set_replaces_existing_clause() {
        let mut filter = Filter::new().eq("slug", "old").eq("owner", "user-1");
        filter.set("slug", "new");

        assert_eq!(filter.len(), 2);
        assert!(filter.matches(&fields(json!({"slug": "new", "owner": "user-1"}))));
        assert!(!filter.matches(&fields(json!({"slug": "old", "owner": "user-1"}))));
    }
}
