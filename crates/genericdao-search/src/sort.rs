//! Result ordering.

use std::cmp::Ordering;

use genericdao_core::{Record, Value};
use serde::{Deserialize, Serialize};

use crate::filter::property_value;

/// Sort by one property. Nulls come first in ascending order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub property: String,
    #[serde(default)]
    pub desc: bool,
    #[serde(default)]
    pub ignore_case: bool,
}

impl Sort {
    /// Ascending sort on `property`.
    pub fn asc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            desc: false,
            ignore_case: false,
        }
    }

    /// Descending sort on `property`.
    pub fn desc(property: impl Into<String>) -> Self {
        Self {
            desc: true,
            ..Self::asc(property)
        }
    }

    /// Compare text values case-insensitively.
    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    /// Order two records by this sort.
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        let (left, right) = (
            property_value(a, &self.property),
            property_value(b, &self.property),
        );
        let ordering = if self.ignore_case {
            fold_case(&left).sort_cmp(&fold_case(&right))
        } else {
            left.sort_cmp(&right)
        };
        if self.desc { ordering.reverse() } else { ordering }
    }
}

fn fold_case(value: &Value) -> Value {
    match value {
        Value::Text(s) => Value::Text(s.to_lowercase()),
        other => other.clone(),
    }
}

/// Order two records by a list of sorts, first sort wins.
pub(crate) fn compare_all(sorts: &[Sort], a: &Record, b: &Record) -> Ordering {
    sorts
        .iter()
        .map(|s| s.compare(a, b))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}
