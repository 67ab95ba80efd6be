//! Field projections and aggregates.

use std::collections::HashSet;

use genericdao_core::{IdKey, Record, Value};
use serde::{Deserialize, Serialize};

use crate::filter::property_value;

/// What a projected field computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldOp {
    /// The plain property value.
    #[default]
    Property,
    /// Number of non-null values (of rows, for the empty property).
    Count,
    CountDistinct,
    Max,
    Min,
    Sum,
    Avg,
}

impl FieldOp {
    /// Whether this operator collapses all rows into one.
    pub const fn is_aggregate(self) -> bool {
        !matches!(self, FieldOp::Property)
    }

    const fn name(self) -> &'static str {
        match self {
            FieldOp::Property => "property",
            FieldOp::Count => "count",
            FieldOp::CountDistinct => "count_distinct",
            FieldOp::Max => "max",
            FieldOp::Min => "min",
            FieldOp::Sum => "sum",
            FieldOp::Avg => "avg",
        }
    }
}

/// One column of a projected result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub property: String,
    #[serde(default)]
    pub op: FieldOp,
    /// Key of the value in result records.
    #[serde(default)]
    pub key: Option<String>,
}

impl Field {
    pub fn new(property: impl Into<String>, op: FieldOp) -> Self {
        Self {
            property: property.into(),
            op,
            key: None,
        }
    }

    pub fn property(property: impl Into<String>) -> Self {
        Self::new(property, FieldOp::Property)
    }

    /// Row count; pass `""` to count every row.
    pub fn count(property: impl Into<String>) -> Self {
        Self::new(property, FieldOp::Count)
    }

    pub fn count_distinct(property: impl Into<String>) -> Self {
        Self::new(property, FieldOp::CountDistinct)
    }

    pub fn max(property: impl Into<String>) -> Self {
        Self::new(property, FieldOp::Max)
    }

    pub fn min(property: impl Into<String>) -> Self {
        Self::new(property, FieldOp::Min)
    }

    pub fn sum(property: impl Into<String>) -> Self {
        Self::new(property, FieldOp::Sum)
    }

    pub fn avg(property: impl Into<String>) -> Self {
        Self::new(property, FieldOp::Avg)
    }

    /// Store the result under `key` instead of the derived name.
    pub fn alias(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// The key this field's value is stored under.
    ///
    /// Defaults to the property for plain fields and `op(property)` for aggregates.
    pub fn result_key(&self) -> String {
        match (&self.key, self.op) {
            (Some(key), _) => key.clone(),
            (None, FieldOp::Property) => self.property.clone(),
            (None, op) => format!("{}({})", op.name(), self.property),
        }
    }

    pub(crate) fn project(&self, record: &Record) -> Value {
        property_value(record, &self.property)
    }

    /// Fold this field over every row.
    pub(crate) fn aggregate(&self, rows: &[Record]) -> Value {
        if self.op == FieldOp::Count && self.property.is_empty() {
            return Value::BigInt(rows.len() as i64);
        }
        let values: Vec<Value> = rows
            .iter()
            .map(|r| self.project(r))
            .filter(|v| !v.is_null())
            .collect();

        match self.op {
            FieldOp::Property => values.into_iter().next().unwrap_or(Value::Null),
            FieldOp::Count => Value::BigInt(values.len() as i64),
            FieldOp::CountDistinct => {
                let distinct: HashSet<IdKey> = values.into_iter().map(IdKey::new).collect();
                Value::BigInt(distinct.len() as i64)
            }
            FieldOp::Max => values
                .into_iter()
                .max_by(Value::sort_cmp)
                .unwrap_or(Value::Null),
            FieldOp::Min => values
                .into_iter()
                .min_by(Value::sort_cmp)
                .unwrap_or(Value::Null),
            FieldOp::Sum => sum(&values),
            FieldOp::Avg => {
                if values.is_empty() {
                    return Value::Null;
                }
                let total: f64 = values.iter().filter_map(Value::as_f64).sum();
                Value::Double(total / values.len() as f64)
            }
        }
    }
}

/// Integer sum when every value is an integer and the total fits in `i64`,
/// floating point otherwise.
fn sum(values: &[Value]) -> Value {
    if values.is_empty() {
        return Value::Null;
    }
    let total = values.iter().try_fold(0_i64, |acc, v| {
        let i = v.is_numeric().then(|| v.as_i64()).flatten()?;
        acc.checked_add(i)
    });
    total.map_or_else(
        || Value::Double(values.iter().filter_map(Value::as_f64).sum()),
        Value::BigInt,
    )
}
