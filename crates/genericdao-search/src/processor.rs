//! Evaluating a [`Search`] against records.

use std::collections::HashSet;

use genericdao_core::{Error, IdKey, Record, Result};
use serde::Deserialize;

use crate::example::{ExampleOptions, filter_from_example};
use crate::filter::Filter;
use crate::result::SearchResult;
use crate::search::Search;
use crate::sort::compare_all;

/// Search processor configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Page size applied when a search sets no `max_results`.
    pub default_max_results: Option<usize>,
}

impl SearchConfig {
    pub fn default_max_results(mut self, max: usize) -> Self {
        self.default_max_results = Some(max);
        self
    }
}

/// Runs searches over the records of one entity.
///
/// Processing order: filter, sort, project (or aggregate), distinct, page.
#[derive(Debug, Clone, Default)]
pub struct SearchProcessor {
    config: SearchConfig,
}

impl SearchProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SearchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    fn max_results(&self, search: &Search) -> Option<usize> {
        search
            .get_max_results()
            .or(self.config.default_max_results.filter(|m| *m > 0))
    }

    /// Filter, sort, project and de-duplicate, without paging.
    fn select(&self, records: Vec<Record>, search: &Search) -> Result<Vec<Record>> {
        let fields = search.get_fields();
        if search.has_aggregates() {
            if let Some(plain) = fields.iter().find(|f| !f.op.is_aggregate()) {
                return Err(Error::invalid_argument(format!(
                    "field `{}` is not aggregated but the search has aggregate fields",
                    plain.property
                )));
            }
        }

        let filter = search.combined_filter();
        let mut rows: Vec<Record> = match &filter {
            Some(filter) => records.into_iter().filter(|r| filter.matches(r)).collect(),
            None => records,
        };

        if search.has_aggregates() {
            let row: Record = fields
                .iter()
                .map(|f| (f.result_key(), f.aggregate(&rows)))
                .collect();
            return Ok(vec![row]);
        }

        let sorts = search.get_sorts();
        if !sorts.is_empty() {
            rows.sort_by(|a, b| compare_all(sorts, a, b));
        }

        if !fields.is_empty() {
            rows = rows
                .iter()
                .map(|r| fields.iter().map(|f| (f.result_key(), f.project(r))).collect())
                .collect();
        }

        if search.is_distinct() {
            rows = distinct(rows);
        }

        Ok(rows)
    }

    /// Records matching `search`, paged.
    #[tracing::instrument(level = "debug", skip_all, fields(entity = search.get_search_class()))]
    pub fn search(&self, records: Vec<Record>, search: &Search) -> Result<Vec<Record>> {
        let rows = self.select(records, search)?;
        Ok(self.page(rows, search))
    }

    /// Number of records matching `search`, ignoring paging.
    #[tracing::instrument(level = "debug", skip_all, fields(entity = search.get_search_class()))]
    pub fn count(&self, records: Vec<Record>, search: &Search) -> Result<u64> {
        Ok(self.select(records, search)?.len() as u64)
    }

    /// One page of results plus the unpaged total.
    #[tracing::instrument(level = "debug", skip_all, fields(entity = search.get_search_class()))]
    pub fn search_and_count(
        &self,
        records: Vec<Record>,
        search: &Search,
    ) -> Result<SearchResult<Record>> {
        let rows = self.select(records, search)?;
        let total = rows.len() as u64;
        let page = self.page(rows, search);
        tracing::debug!(rows = page.len(), total, "Search completed");
        Ok(SearchResult::new(page, total))
    }

    /// The single record matching `search`, if any.
    ///
    /// Fails with `Error::NonUniqueResult` when more than one record matches.
    pub fn search_unique(&self, records: Vec<Record>, search: &Search) -> Result<Option<Record>> {
        let mut rows = self.search(records, search)?;
        if rows.len() > 1 {
            tracing::warn!(count = rows.len(), "Unique search matched several rows");
            return Err(Error::NonUniqueResult { count: rows.len() });
        }
        Ok(rows.pop())
    }

    /// Build a filter from an example record; `None` uses the default options.
    pub fn filter_from_example(
        &self,
        example: &Record,
        id_field: &str,
        options: Option<&ExampleOptions>,
    ) -> Filter {
        match options {
            Some(options) => filter_from_example(example, id_field, options),
            None => filter_from_example(example, id_field, &ExampleOptions::default()),
        }
    }

    fn page(&self, rows: Vec<Record>, search: &Search) -> Vec<Record> {
        let max = self.max_results(search);
        let first = search.first_result_for(max);
        let iter = rows.into_iter().skip(first);
        match max {
            Some(max) => iter.take(max).collect(),
            None => iter.collect(),
        }
    }
}

/// Drop rows equal to an earlier row, field by field.
fn distinct(rows: Vec<Record>) -> Vec<Record> {
    let mut seen: HashSet<Vec<(String, IdKey)>> = HashSet::with_capacity(rows.len());
    rows.into_iter()
        .filter(|row| {
            let key = row
                .iter()
                .map(|(name, value)| (name.to_string(), IdKey::new(value.clone())))
                .collect();
            seen.insert(key)
        })
        .collect()
}
