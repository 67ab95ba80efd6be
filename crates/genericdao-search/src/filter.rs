//! Search filters and their evaluation against records.

use std::cmp::Ordering;

use genericdao_core::{Record, Value};
use serde::{Deserialize, Serialize};

use crate::like::like_matches;

/// A single search criterion.
///
/// Property names refer to record fields. A dotted name (`address.city`) reaches
/// into a JSON field. Inside a collection quantifier (`Any`, `All`, `NoneOf`) the
/// empty property `""` means the collection element itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Filter {
    Equal { property: String, value: Value },
    NotEqual { property: String, value: Value },
    LessThan { property: String, value: Value },
    GreaterThan { property: String, value: Value },
    LessOrEqual { property: String, value: Value },
    GreaterOrEqual { property: String, value: Value },
    /// Case-sensitive LIKE.
    Like { property: String, pattern: String },
    /// Case-insensitive LIKE.
    #[serde(rename = "ilike")]
    ILike { property: String, pattern: String },
    In { property: String, values: Vec<Value> },
    NotIn { property: String, values: Vec<Value> },
    Null { property: String },
    NotNull { property: String },
    /// Null, empty text, empty bytes or empty collection.
    Empty { property: String },
    NotEmpty { property: String },
    And { filters: Vec<Filter> },
    Or { filters: Vec<Filter> },
    Not { filter: Box<Filter> },
    /// Some element of the collection matches `filter`.
    Any { property: String, filter: Box<Filter> },
    /// Every element of the collection matches `filter`.
    All { property: String, filter: Box<Filter> },
    /// No element of the collection matches `filter`.
    NoneOf { property: String, filter: Box<Filter> },
}

impl Filter {
    pub fn equal(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Equal {
            property: property.into(),
            value: value.into(),
        }
    }

    pub fn not_equal(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::NotEqual {
            property: property.into(),
            value: value.into(),
        }
    }

    pub fn less_than(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::LessThan {
            property: property.into(),
            value: value.into(),
        }
    }

    pub fn greater_than(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::GreaterThan {
            property: property.into(),
            value: value.into(),
        }
    }

    pub fn less_or_equal(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::LessOrEqual {
            property: property.into(),
            value: value.into(),
        }
    }

    pub fn greater_or_equal(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::GreaterOrEqual {
            property: property.into(),
            value: value.into(),
        }
    }

    pub fn like(property: impl Into<String>, pattern: impl Into<String>) -> Self {
        Filter::Like {
            property: property.into(),
            pattern: pattern.into(),
        }
    }

    pub fn ilike(property: impl Into<String>, pattern: impl Into<String>) -> Self {
        Filter::ILike {
            property: property.into(),
            pattern: pattern.into(),
        }
    }

    pub fn is_in<V: Into<Value>>(
        property: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Filter::In {
            property: property.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn not_in<V: Into<Value>>(
        property: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Filter::NotIn {
            property: property.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn null(property: impl Into<String>) -> Self {
        Filter::Null {
            property: property.into(),
        }
    }

    pub fn not_null(property: impl Into<String>) -> Self {
        Filter::NotNull {
            property: property.into(),
        }
    }

    pub fn empty(property: impl Into<String>) -> Self {
        Filter::Empty {
            property: property.into(),
        }
    }

    pub fn not_empty(property: impl Into<String>) -> Self {
        Filter::NotEmpty {
            property: property.into(),
        }
    }

    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::And {
            filters: filters.into_iter().collect(),
        }
    }

    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::Or {
            filters: filters.into_iter().collect(),
        }
    }

    pub fn not(filter: Filter) -> Self {
        Filter::Not {
            filter: Box::new(filter),
        }
    }

    pub fn any(property: impl Into<String>, filter: Filter) -> Self {
        Filter::Any {
            property: property.into(),
            filter: Box::new(filter),
        }
    }

    pub fn all(property: impl Into<String>, filter: Filter) -> Self {
        Filter::All {
            property: property.into(),
            filter: Box::new(filter),
        }
    }

    pub fn none_of(property: impl Into<String>, filter: Filter) -> Self {
        Filter::NoneOf {
            property: property.into(),
            filter: Box::new(filter),
        }
    }

    /// The property this filter tests, if it tests one directly.
    pub fn property(&self) -> Option<&str> {
        match self {
            Filter::Equal { property, .. }
            | Filter::NotEqual { property, .. }
            | Filter::LessThan { property, .. }
            | Filter::GreaterThan { property, .. }
            | Filter::LessOrEqual { property, .. }
            | Filter::GreaterOrEqual { property, .. }
            | Filter::Like { property, .. }
            | Filter::ILike { property, .. }
            | Filter::In { property, .. }
            | Filter::NotIn { property, .. }
            | Filter::Null { property }
            | Filter::NotNull { property }
            | Filter::Empty { property }
            | Filter::NotEmpty { property }
            | Filter::Any { property, .. }
            | Filter::All { property, .. }
            | Filter::NoneOf { property, .. } => Some(property),
            Filter::And { .. } | Filter::Or { .. } | Filter::Not { .. } => None,
        }
    }

    /// Drop the parts of this filter that carry no constraint.
    ///
    /// Single-value comparisons against null, `In`/`NotIn` with no values, and
    /// junctions left with no children are ignored. Returns `None` when nothing
    /// remains.
    pub fn clean(self) -> Option<Filter> {
        match self {
            Filter::Equal { ref value, .. }
            | Filter::NotEqual { ref value, .. }
            | Filter::LessThan { ref value, .. }
            | Filter::GreaterThan { ref value, .. }
            | Filter::LessOrEqual { ref value, .. }
            | Filter::GreaterOrEqual { ref value, .. }
                if value.is_null() =>
            {
                tracing::debug!(filter = ?self, "Ignoring filter with null value");
                None
            }
            Filter::In { ref values, .. } | Filter::NotIn { ref values, .. }
                if values.is_empty() =>
            {
                tracing::debug!(filter = ?self, "Ignoring filter with empty value list");
                None
            }
            Filter::And { filters } => {
                let filters: Vec<Filter> = filters.into_iter().filter_map(Filter::clean).collect();
                (!filters.is_empty()).then_some(Filter::And { filters })
            }
            Filter::Or { filters } => {
                let filters: Vec<Filter> = filters.into_iter().filter_map(Filter::clean).collect();
                (!filters.is_empty()).then_some(Filter::Or { filters })
            }
            Filter::Not { filter } => filter.clean().map(Filter::not),
            Filter::Any { property, filter } => {
                filter.clean().map(|f| Filter::any(property, f))
            }
            Filter::All { property, filter } => {
                filter.clean().map(|f| Filter::all(property, f))
            }
            Filter::NoneOf { property, filter } => {
                filter.clean().map(|f| Filter::none_of(property, f))
            }
            other => Some(other),
        }
    }

    /// Evaluate this filter against a record.
    pub fn matches(&self, record: &Record) -> bool {
        self.eval(&Subject::Record(record))
    }

    fn eval(&self, subject: &Subject<'_>) -> bool {
        match self {
            Filter::Equal { property, value } => {
                compare_with(subject, property, |v| v.loosely_eq(value))
            }
            Filter::NotEqual { property, value } => {
                compare_with(subject, property, |v| !v.loosely_eq(value))
            }
            Filter::LessThan { property, value } => compare_with(subject, property, |v| {
                v.compare(value) == Some(Ordering::Less)
            }),
            Filter::GreaterThan { property, value } => compare_with(subject, property, |v| {
                v.compare(value) == Some(Ordering::Greater)
            }),
            Filter::LessOrEqual { property, value } => compare_with(subject, property, |v| {
                matches!(v.compare(value), Some(Ordering::Less | Ordering::Equal))
            }),
            Filter::GreaterOrEqual { property, value } => compare_with(subject, property, |v| {
                matches!(v.compare(value), Some(Ordering::Greater | Ordering::Equal))
            }),
            Filter::Like { property, pattern } => compare_with(subject, property, |v| {
                v.as_str().is_some_and(|s| like_matches(s, pattern, false))
            }),
            Filter::ILike { property, pattern } => compare_with(subject, property, |v| {
                v.as_str().is_some_and(|s| like_matches(s, pattern, true))
            }),
            Filter::In { property, values } => compare_with(subject, property, |v| {
                values.iter().any(|candidate| v.loosely_eq(candidate))
            }),
            Filter::NotIn { property, values } => compare_with(subject, property, |v| {
                !values.iter().any(|candidate| v.loosely_eq(candidate))
            }),
            Filter::Null { property } => subject.lookup(property).is_null(),
            Filter::NotNull { property } => !subject.lookup(property).is_null(),
            Filter::Empty { property } => is_empty(&subject.lookup(property)),
            Filter::NotEmpty { property } => !is_empty(&subject.lookup(property)),
            Filter::And { filters } => filters.iter().all(|f| f.eval(subject)),
            Filter::Or { filters } => filters.iter().any(|f| f.eval(subject)),
            Filter::Not { filter } => !filter.eval(subject),
            Filter::Any { property, filter } => elements(&subject.lookup(property))
                .iter()
                .any(|e| filter.eval(&Subject::Element(e))),
            Filter::All { property, filter } => elements(&subject.lookup(property))
                .iter()
                .all(|e| filter.eval(&Subject::Element(e))),
            Filter::NoneOf { property, filter } => !elements(&subject.lookup(property))
                .iter()
                .any(|e| filter.eval(&Subject::Element(e))),
        }
    }
}

/// What a filter is evaluated against: a whole record, or one collection element.
enum Subject<'a> {
    Record(&'a Record),
    Element(&'a Value),
}

impl Subject<'_> {
    fn lookup(&self, property: &str) -> Value {
        match self {
            Subject::Record(record) => property_value(record, property),
            Subject::Element(element) if property.is_empty() => (*element).clone(),
            Subject::Element(Value::Json(json)) => json_path(json, property),
            Subject::Element(_) => Value::Null,
        }
    }
}

/// Null property values never satisfy a comparison.
fn compare_with(subject: &Subject<'_>, property: &str, test: impl Fn(&Value) -> bool) -> bool {
    let value = subject.lookup(property);
    !value.is_null() && test(&value)
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Json(serde_json::Value::Array(a)) => a.is_empty(),
        Value::Json(serde_json::Value::String(s)) => s.is_empty(),
        Value::Json(serde_json::Value::Null) => true,
        other => other.is_empty(),
    }
}

fn elements(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::Json(serde_json::Value::Array(items)) => items.iter().map(json_to_value).collect(),
        _ => Vec::new(),
    }
}

/// Resolve a (possibly dotted) property against a record.
pub(crate) fn property_value(record: &Record, property: &str) -> Value {
    if let Some(value) = record.get(property) {
        return value.clone();
    }
    let Some((head, rest)) = property.split_once('.') else {
        return Value::Null;
    };
    match record.get(head) {
        Some(Value::Json(json)) => json_path(json, rest),
        _ => Value::Null,
    }
}

fn json_path(json: &serde_json::Value, path: &str) -> Value {
    let mut current = json;
    for segment in path.split('.') {
        match current.get(segment) {
            Some(next) => current = next,
            None => return Value::Null,
        }
    }
    json_to_value(current)
}

fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(Value::BigInt)
            .or_else(|| n.as_f64().map(Value::Double))
            .unwrap_or(Value::Null),
        serde_json::Value::String(s) => Value::Text(s.clone()),
        other => Value::Json(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hero() -> Record {
        Record::new()
            .with("id", 1_i64)
            .with("name", "Spider-Boy")
            .with("age", 18_i32)
            .with("team", Value::Null)
            .with("powers", vec!["climb".to_string(), "sense".to_string()])
            .with(
                "address",
                serde_json::json!({"city": "Queens", "zip": 11375, "tags": ["a", "b"]}),
            )
    }

    #[test]
    fn test_comparisons_widen_numbers() {
        let r = hero();
        assert!(Filter::equal("age", 18_i64).matches(&r));
        assert!(Filter::greater_than("age", 17).matches(&r));
        assert!(Filter::less_or_equal("age", 18.0).matches(&r));
        assert!(!Filter::less_than("age", 18).matches(&r));
        assert!(Filter::not_equal("name", "Deadpond").matches(&r));
    }

    #[test]
    fn test_null_property_never_compares() {
        let r = hero();
        assert!(!Filter::equal("team", "Avengers").matches(&r));
        assert!(!Filter::not_equal("team", "Avengers").matches(&r));
        assert!(!Filter::not_in("team", ["Avengers"]).matches(&r));
        assert!(!Filter::equal("missing", 1).matches(&r));
        assert!(Filter::null("team").matches(&r));
        assert!(Filter::null("missing").matches(&r));
        assert!(Filter::not_null("name").matches(&r));
    }

    #[test]
    fn test_like_and_ilike() {
        let r = hero();
        assert!(Filter::like("name", "Spider%").matches(&r));
        assert!(!Filter::like("name", "spider%").matches(&r));
        assert!(Filter::ilike("name", "spider%").matches(&r));
        assert!(!Filter::like("age", "1%").matches(&r));
    }

    #[test]
    fn test_in_and_not_in() {
        let r = hero();
        assert!(Filter::is_in("age", [16_i64, 18]).matches(&r));
        assert!(Filter::not_in("name", ["Deadpond", "Rusty-Man"]).matches(&r));
    }

    #[test]
    fn test_empty() {
        let r = hero();
        assert!(Filter::empty("team").matches(&r));
        assert!(Filter::not_empty("powers").matches(&r));
        let blank = Record::new().with("name", "").with("powers", Vec::<String>::new());
        assert!(Filter::empty("name").matches(&blank));
        assert!(Filter::empty("powers").matches(&blank));
    }

    #[test]
    fn test_junctions() {
        let r = hero();
        let f = Filter::or([Filter::equal("name", "Deadpond"), Filter::equal("age", 18)]);
        assert!(f.matches(&r));
        let f = Filter::and([Filter::equal("name", "Deadpond"), Filter::equal("age", 18)]);
        assert!(!f.matches(&r));
        assert!(Filter::not(Filter::equal("name", "Deadpond")).matches(&r));
    }

    #[test]
    fn test_collection_quantifiers() {
        let r = hero();
        assert!(Filter::any("powers", Filter::equal("", "sense")).matches(&r));
        assert!(!Filter::all("powers", Filter::equal("", "sense")).matches(&r));
        assert!(Filter::all("powers", Filter::like("", "%")).matches(&r));
        assert!(Filter::none_of("powers", Filter::equal("", "fly")).matches(&r));
        assert!(Filter::any("address.tags", Filter::equal("", "b")).matches(&r));
        // Vacuous truth over a missing collection
        assert!(Filter::all("team", Filter::equal("", "x")).matches(&r));
        assert!(!Filter::any("team", Filter::equal("", "x")).matches(&r));
    }

    #[test]
    fn test_dotted_json_property() {
        let r = hero();
        assert!(Filter::equal("address.city", "Queens").matches(&r));
        assert!(Filter::greater_than("address.zip", 10000).matches(&r));
        assert!(Filter::null("address.country").matches(&r));
    }

    #[test]
    fn test_clean_drops_unconstrained_filters() {
        assert_eq!(Filter::equal("name", Value::Null).clean(), None);
        assert_eq!(Filter::is_in("id", Vec::<i64>::new()).clean(), None);
        assert_eq!(Filter::and([]).clean(), None);
        assert_eq!(
            Filter::or([Filter::equal("a", Value::Null), Filter::null("b")]).clean(),
            Some(Filter::or([Filter::null("b")]))
        );
        assert_eq!(Filter::not(Filter::and([])).clean(), None);
        assert_eq!(
            Filter::null("name").clean(),
            Some(Filter::null("name"))
        );
    }

    #[test]
    fn test_serde_tagged_representation() {
        let f = Filter::and([Filter::ilike("name", "s%"), Filter::not_null("age")]);
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["op"], "and");
        assert_eq!(json["filters"][0]["op"], "ilike");
        let back: Filter = serde_json::from_value(json).unwrap();
        assert_eq!(back, f);
    }
}
