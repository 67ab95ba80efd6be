//! The search object.

use genericdao_core::{Entity, Value};
use serde::{Deserialize, Serialize};

use crate::field::Field;
use crate::filter::Filter;
use crate::sort::Sort;

/// Criteria for selecting records of one entity.
///
/// # Example
///
/// ```
/// use genericdao_search::{Search, Sort};
///
/// let search = Search::for_entity("hero")
///     .filter_equal("team", "Preventers")
///     .sort(Sort::desc("age"))
///     .max_results(20)
///     .page(2);
///
/// assert_eq!(search.resolved_first_result(), 40);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Search {
    search_class: Option<String>,
    filters: Vec<Filter>,
    disjunction: bool,
    sorts: Vec<Sort>,
    fields: Vec<Field>,
    distinct: bool,
    first_result: Option<usize>,
    max_results: Option<usize>,
    page: Option<usize>,
}

impl Search {
    /// An empty search with no entity bound yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// A search over the entity named `entity`.
    pub fn for_entity(entity: impl Into<String>) -> Self {
        Self {
            search_class: Some(entity.into()),
            ..Self::default()
        }
    }

    /// A search over entity type `E`.
    pub fn of<E: Entity>() -> Self {
        Self::for_entity(E::ENTITY_NAME)
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn search_class(mut self, entity: impl Into<String>) -> Self {
        self.search_class = Some(entity.into());
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn filter_equal(self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::equal(property, value))
    }

    pub fn filter_not_equal(self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::not_equal(property, value))
    }

    pub fn filter_like(self, property: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.filter(Filter::like(property, pattern))
    }

    pub fn filter_ilike(self, property: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.filter(Filter::ilike(property, pattern))
    }

    pub fn filter_in<V: Into<Value>>(
        self,
        property: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.filter(Filter::is_in(property, values))
    }

    pub fn filter_null(self, property: impl Into<String>) -> Self {
        self.filter(Filter::null(property))
    }

    pub fn filter_not_null(self, property: impl Into<String>) -> Self {
        self.filter(Filter::not_null(property))
    }

    /// OR the top-level filters together instead of AND-ing them.
    pub fn disjunction(mut self, enabled: bool) -> Self {
        self.disjunction = enabled;
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sorts.push(sort);
        self
    }

    pub fn sort_asc(self, property: impl Into<String>) -> Self {
        self.sort(Sort::asc(property))
    }

    pub fn sort_desc(self, property: impl Into<String>) -> Self {
        self.sort(Sort::desc(property))
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn distinct(mut self, enabled: bool) -> Self {
        self.distinct = enabled;
        self
    }

    pub fn first_result(mut self, first: usize) -> Self {
        self.first_result = Some(first);
        self
    }

    /// Limit the number of rows returned; `0` means no limit.
    pub fn max_results(mut self, max: usize) -> Self {
        self.max_results = Some(max);
        self
    }

    /// Zero-based page, sized by `max_results`.
    pub fn page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    /// Drop paging so the search selects every matching row.
    pub fn without_paging(mut self) -> Self {
        self.first_result = None;
        self.max_results = None;
        self.page = None;
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn get_search_class(&self) -> Option<&str> {
        self.search_class.as_deref()
    }

    pub fn get_filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn is_disjunction(&self) -> bool {
        self.disjunction
    }

    pub fn get_sorts(&self) -> &[Sort] {
        &self.sorts
    }

    pub fn get_fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn get_max_results(&self) -> Option<usize> {
        self.max_results.filter(|m| *m > 0)
    }

    pub fn get_page(&self) -> Option<usize> {
        self.page
    }

    /// Whether any projected field is an aggregate.
    pub fn has_aggregates(&self) -> bool {
        self.fields.iter().any(|f| f.op.is_aggregate())
    }

    /// Index of the first row to return.
    ///
    /// An explicit first result wins; otherwise `page * max_results`; otherwise 0.
    pub fn resolved_first_result(&self) -> usize {
        self.first_result_for(self.get_max_results())
    }

    /// Like [`resolved_first_result`](Self::resolved_first_result), with pages sized
    /// by `max_results` (which may be a processor default).
    pub fn first_result_for(&self, max_results: Option<usize>) -> usize {
        if let Some(first) = self.first_result {
            return first;
        }
        match (self.page, max_results.filter(|m| *m > 0)) {
            (Some(page), Some(max)) => page.saturating_mul(max),
            _ => 0,
        }
    }

    /// The effective filter: top-level filters cleaned and joined by AND (or OR
    /// for a disjunction). `None` selects every row.
    pub fn combined_filter(&self) -> Option<Filter> {
        let filters = self.filters.clone();
        let junction = if self.disjunction {
            Filter::or(filters)
        } else {
            Filter::and(filters)
        };
        junction.clean()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_result_resolution() {
        assert_eq!(Search::new().resolved_first_result(), 0);
        assert_eq!(Search::new().page(3).resolved_first_result(), 0);
        assert_eq!(Search::new().max_results(10).page(3).resolved_first_result(), 30);
        assert_eq!(
            Search::new().max_results(10).page(3).first_result(5).resolved_first_result(),
            5
        );
        assert_eq!(Search::new().max_results(0).page(3).resolved_first_result(), 0);
    }

    #[test]
    fn test_combined_filter() {
        assert_eq!(Search::new().combined_filter(), None);
        assert_eq!(
            Search::new().filter_equal("name", Value::Null).combined_filter(),
            None
        );
        let s = Search::new()
            .filter_null("team")
            .filter_equal("age", 3)
            .disjunction(true);
        assert_eq!(
            s.combined_filter(),
            Some(Filter::or([Filter::null("team"), Filter::equal("age", 3)]))
        );
    }

    #[test]
    fn test_without_paging_keeps_criteria() {
        let s = Search::for_entity("hero")
            .filter_null("team")
            .max_results(5)
            .page(1)
            .without_paging();
        assert_eq!(s.get_max_results(), None);
        assert_eq!(s.get_filters().len(), 1);
        assert_eq!(s.get_search_class(), Some("hero"));
    }

    #[test]
    fn test_deserialize_partial_json() {
        let s: Search = serde_json::from_str(
            r#"{
                "search_class": "hero",
                "filters": [{"op": "like", "property": "name", "pattern": "S%"}],
                "sorts": [{"property": "age", "desc": true}],
                "max_results": 10
            }"#,
        )
        .unwrap();
        assert_eq!(s.get_search_class(), Some("hero"));
        assert_eq!(s.get_filters(), &[Filter::like("name", "S%")]);
        assert_eq!(s.get_sorts(), &[Sort::desc("age")]);
        assert_eq!(s.get_max_results(), Some(10));
        assert!(!s.is_distinct());
    }
}
