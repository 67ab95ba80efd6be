//! Query-by-example: turn a sample record into a filter.

use genericdao_core::{Record, Value};
use serde::Deserialize;

use crate::filter::Filter;

/// How text properties of an example are matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeMode {
    /// Whole value (plain equality unless case is ignored).
    #[default]
    Exact,
    /// Value is a prefix.
    Start,
    /// Value is a suffix.
    End,
    /// Value appears anywhere.
    Anywhere,
}

impl LikeMode {
    fn pattern(self, text: &str) -> String {
        match self {
            LikeMode::Exact => text.to_string(),
            LikeMode::Start => format!("{text}%"),
            LikeMode::End => format!("%{text}"),
            LikeMode::Anywhere => format!("%{text}%"),
        }
    }
}

/// Controls which example properties become filters and how text is compared.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExampleOptions {
    /// Skip null properties (otherwise they become `Null` filters).
    pub exclude_nulls: bool,
    /// Skip numeric properties equal to zero.
    pub exclude_zeros: bool,
    /// Properties never turned into filters.
    pub excluded_properties: Vec<String>,
    pub like_mode: LikeMode,
    pub ignore_case: bool,
}

impl Default for ExampleOptions {
    fn default() -> Self {
        Self {
            exclude_nulls: true,
            exclude_zeros: false,
            excluded_properties: Vec::new(),
            like_mode: LikeMode::Exact,
            ignore_case: false,
        }
    }
}

impl ExampleOptions {
    pub fn exclude_nulls(mut self, enabled: bool) -> Self {
        self.exclude_nulls = enabled;
        self
    }

    pub fn exclude_zeros(mut self, enabled: bool) -> Self {
        self.exclude_zeros = enabled;
        self
    }

    pub fn exclude_property(mut self, property: impl Into<String>) -> Self {
        self.excluded_properties.push(property.into());
        self
    }

    pub fn like_mode(mut self, mode: LikeMode) -> Self {
        self.like_mode = mode;
        self
    }

    pub fn ignore_case(mut self, enabled: bool) -> Self {
        self.ignore_case = enabled;
        self
    }

    fn is_excluded(&self, property: &str) -> bool {
        self.excluded_properties.iter().any(|p| p == property)
    }
}

/// Build a filter matching records that agree with `example`.
///
/// Produces one filter per property except `id_field` and the excluded ones, all
/// joined with AND. An example with nothing to compare yields an empty `And`,
/// which matches every record.
pub fn filter_from_example(example: &Record, id_field: &str, options: &ExampleOptions) -> Filter {
    let mut filters = Vec::with_capacity(example.len());

    for (property, value) in example.iter() {
        if property == id_field || options.is_excluded(property) {
            continue;
        }
        match value {
            Value::Null => {
                if !options.exclude_nulls {
                    filters.push(Filter::null(property));
                }
            }
            v if options.exclude_zeros && v.is_zero() => {}
            Value::Text(text) if options.ignore_case => {
                filters.push(Filter::ilike(property, options.like_mode.pattern(text)));
            }
            Value::Text(text) if options.like_mode != LikeMode::Exact => {
                filters.push(Filter::like(property, options.like_mode.pattern(text)));
            }
            other => filters.push(Filter::equal(property, other.clone())),
        }
    }

    tracing::debug!(filters = filters.len(), "Built filter from example");
    Filter::and(filters)
}
