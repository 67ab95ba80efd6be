//! Dynamically typed field values.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single field value as seen by the session, the datastore and searches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Absent value.
    Null,
    /// Boolean.
    Bool(bool),
    /// 8-bit signed integer.
    TinyInt(i8),
    /// 16-bit signed integer.
    SmallInt(i16),
    /// 32-bit signed integer.
    Int(i32),
    /// 64-bit signed integer.
    BigInt(i64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// Arbitrary precision decimal kept in its textual form.
    Decimal(String),
    /// Text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Days since the Unix epoch.
    Date(i32),
    /// Microseconds since the Unix epoch.
    Timestamp(i64),
    /// UUID bytes.
    Uuid([u8; 16]),
    /// JSON document.
    Json(serde_json::Value),
    /// Collection of values.
    Array(Vec<Value>),
}

impl Value {
    /// Whether this is `Value::Null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the variant, used in conversion errors.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::TinyInt(_) => "tinyint",
            Value::SmallInt(_) => "smallint",
            Value::Int(_) => "int",
            Value::BigInt(_) => "bigint",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::Timestamp(_) => "timestamp",
            Value::Uuid(_) => "uuid",
            Value::Json(_) => "json",
            Value::Array(_) => "array",
        }
    }

    /// Integer view of any integer-like variant.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::TinyInt(i) => Some(i64::from(*i)),
            Value::SmallInt(i) => Some(i64::from(*i)),
            Value::Int(i) => Some(i64::from(*i)),
            Value::BigInt(i) => Some(*i),
            Value::Date(d) => Some(i64::from(*d)),
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Floating point view of any numeric variant.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(f64::from(*f)),
            Value::Double(f) => Some(*f),
            Value::Decimal(s) => s.parse().ok(),
            other => other.as_i64().map(|i| i as f64),
        }
    }

    /// String view of text-like variants.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Decimal(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this is a number type.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::TinyInt(_)
                | Value::SmallInt(_)
                | Value::Int(_)
                | Value::BigInt(_)
                | Value::Float(_)
                | Value::Double(_)
                | Value::Decimal(_)
        )
    }

    /// Whether an identifier with this value marks a never-saved entity.
    ///
    /// Null and integer zero both count as unsaved.
    #[must_use]
    pub fn is_unsaved_id(&self) -> bool {
        match self {
            Value::Null => true,
            Value::TinyInt(_) | Value::SmallInt(_) | Value::Int(_) | Value::BigInt(_) => {
                self.as_i64() == Some(0)
            }
            _ => false,
        }
    }

    /// Whether this value is "empty": null, empty text, empty bytes or empty array.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.is_empty(),
            Value::Bytes(b) => b.is_empty(),
            Value::Array(a) => a.is_empty(),
            _ => false,
        }
    }

    /// Whether this value is a numeric zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.is_numeric() && self.as_f64() == Some(0.0)
    }

    /// Compare two values, widening numbers so `Int(1)` and `BigInt(1)` agree.
    ///
    /// Returns `None` for values that have no meaningful order (mismatched kinds,
    /// nulls, NaN).
    #[must_use]
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (a, b) if a.is_numeric() && b.is_numeric() => match (a.as_i64(), b.as_i64()) {
                (Some(x), Some(y)) => Some(x.cmp(&y)),
                _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
            },
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            (Value::Uuid(a), Value::Uuid(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Equality that widens numeric types; falls back to structural equality.
    #[must_use]
    pub fn loosely_eq(&self, other: &Value) -> bool {
        if self.is_numeric() && other.is_numeric() {
            return self.compare(other) == Some(Ordering::Equal);
        }
        self == other
    }

    /// Total order used for sorting and `min`/`max`.
    ///
    /// Values are grouped by kind (null first, then bool, numbers, text, bytes,
    /// dates, timestamps, uuids, JSON, arrays). All numeric variants share one
    /// group and are ordered by value with `f64::total_cmp`, so NaN sorts after
    /// every other number.
    #[must_use]
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        self.sort_rank()
            .cmp(&other.sort_rank())
            .then_with(|| match (self, other) {
                (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
                (a, b) if a.is_numeric() => numeric_sort_cmp(a, b),
                (Value::Text(a), Value::Text(b)) => a.cmp(b),
                (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
                (Value::Date(a), Value::Date(b)) => a.cmp(b),
                (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
                (Value::Uuid(a), Value::Uuid(b)) => a.cmp(b),
                (Value::Json(a), Value::Json(b)) => a.to_string().cmp(&b.to_string()),
                (Value::Array(a), Value::Array(b)) => a
                    .iter()
                    .zip(b)
                    .map(|(x, y)| x.sort_cmp(y))
                    .find(|o| o.is_ne())
                    .unwrap_or_else(|| a.len().cmp(&b.len())),
                _ => Ordering::Equal,
            })
    }

    const fn sort_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::TinyInt(_)
            | Value::SmallInt(_)
            | Value::Int(_)
            | Value::BigInt(_)
            | Value::Float(_)
            | Value::Double(_)
            | Value::Decimal(_) => 2,
            Value::Text(_) => 3,
            Value::Bytes(_) => 4,
            Value::Date(_) => 5,
            Value::Timestamp(_) => 6,
            Value::Uuid(_) => 7,
            Value::Json(_) => 8,
            Value::Array(_) => 9,
        }
    }
}

/// Order two numeric values by the key `(as f64, kind, exact integer, decimal text)`.
///
/// The float comes first so mixed widths interleave by value; the remaining
/// parts break ties between values that round to the same float. Unparseable
/// decimals map to NaN.
fn numeric_sort_cmp(a: &Value, b: &Value) -> Ordering {
    let class = |v: &Value| match v {
        Value::Float(_) | Value::Double(_) => 0_u8,
        Value::Decimal(_) => 2,
        _ => 1,
    };
    let float = |v: &Value| v.as_f64().unwrap_or(f64::NAN);
    float(a)
        .total_cmp(&float(b))
        .then_with(|| class(a).cmp(&class(b)))
        .then_with(|| a.as_i64().cmp(&b.as_i64()))
        .then_with(|| a.as_str().cmp(&b.as_str()))
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::TinyInt(i) => write!(f, "{i}"),
            Value::SmallInt(i) => write!(f, "{i}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::BigInt(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Decimal(s) | Value::Text(s) => write!(f, "{s}"),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Date(d) => write!(f, "date({d})"),
            Value::Timestamp(ts) => write!(f, "timestamp({ts})"),
            Value::Uuid(u) => {
                for byte in u {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            Value::Json(j) => write!(f, "{j}"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

// ============================================================================
// Identifier keys
// ============================================================================

/// Hashable identifier wrapper.
///
/// Integer variants are normalized so `Int(7)` and `BigInt(7)` address the same
/// row; floats compare by bit pattern.
#[derive(Debug, Clone)]
pub struct IdKey(Value);

impl IdKey {
    /// Wrap an identifier value.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// The wrapped identifier.
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Unwrap into the identifier value.
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for IdKey {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl PartialEq for IdKey {
    fn eq(&self, other: &Self) -> bool {
        if integer_like(&self.0) && integer_like(&other.0) {
            return self.0.as_i64() == other.0.as_i64();
        }
        bitwise_eq(&self.0, &other.0)
    }
}

impl Eq for IdKey {}

impl Hash for IdKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_value(&self.0, state);
    }
}

/// Integer ids share one hash/equality class regardless of width.
fn integer_like(v: &Value) -> bool {
    matches!(
        v,
        Value::TinyInt(_) | Value::SmallInt(_) | Value::Int(_) | Value::BigInt(_)
    )
}

fn bitwise_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Float(x), Value::Float(y)) => x.to_bits() == y.to_bits(),
        (Value::Double(x), Value::Double(y)) => x.to_bits() == y.to_bits(),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| bitwise_eq(l, r))
        }
        _ => a == b,
    }
}

/// Hash a single value into the hasher.
fn hash_value(v: &Value, hasher: &mut impl Hasher) {
    match v {
        Value::Null => 0u8.hash(hasher),
        Value::Bool(b) => {
            1u8.hash(hasher);
            b.hash(hasher);
        }
        Value::TinyInt(_) | Value::SmallInt(_) | Value::Int(_) | Value::BigInt(_) => {
            5u8.hash(hasher);
            v.as_i64().hash(hasher);
        }
        Value::Float(f) => {
            6u8.hash(hasher);
            f.to_bits().hash(hasher);
        }
        Value::Double(f) => {
            7u8.hash(hasher);
            f.to_bits().hash(hasher);
        }
        Value::Decimal(s) => {
            8u8.hash(hasher);
            s.hash(hasher);
        }
        Value::Text(s) => {
            9u8.hash(hasher);
            s.hash(hasher);
        }
        Value::Bytes(b) => {
            10u8.hash(hasher);
            b.hash(hasher);
        }
        Value::Date(d) => {
            11u8.hash(hasher);
            d.hash(hasher);
        }
        Value::Timestamp(ts) => {
            13u8.hash(hasher);
            ts.hash(hasher);
        }
        Value::Uuid(u) => {
            15u8.hash(hasher);
            u.hash(hasher);
        }
        Value::Json(j) => {
            16u8.hash(hasher);
            j.to_string().hash(hasher);
        }
        Value::Array(arr) => {
            17u8.hash(hasher);
            arr.len().hash(hasher);
            for item in arr {
                hash_value(item, hasher);
            }
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i8 => TinyInt,
    i16 => SmallInt,
    i32 => Int,
    i64 => BigInt,
    f32 => Float,
    f64 => Double,
    String => Text,
    Vec<u8> => Bytes,
    serde_json::Value => Json,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

macro_rules! value_from_vec {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<Vec<$ty>> for Value {
                fn from(v: Vec<$ty>) -> Self {
                    Value::Array(v.into_iter().map(Into::into).collect())
                }
            }

            impl FromValue for Vec<$ty> {
                fn from_value(value: &Value) -> Result<Self> {
                    match value {
                        Value::Array(items) => items.iter().map(<$ty>::from_value).collect(),
                        other => mismatch("array", other),
                    }
                }
            }
        )*
    };
}

value_from_vec!(bool, i16, i32, i64, f64, String, Value);

/// Conversion from a `Value` back into a Rust field type.
pub trait FromValue: Sized {
    /// Convert, failing with `Error::Conversion` on a kind mismatch.
    fn from_value(value: &Value) -> Result<Self>;
}

fn mismatch<T>(expected: &'static str, value: &Value) -> Result<T> {
    Err(Error::Conversion {
        expected,
        found: value.type_name(),
    })
}

macro_rules! from_value_int {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value) -> Result<Self> {
                    match value.as_i64() {
                        Some(i) => <$ty>::try_from(i).or_else(|_| mismatch($name, value)),
                        None => mismatch($name, value),
                    }
                }
            }
        )*
    };
}

from_value_int! {
    i8 => "i8",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        match value.as_f64() {
            Some(f) => Ok(f),
            None => mismatch("f64", value),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Float(f) => Ok(*f),
            other => match other.as_f64() {
                Some(f) => Ok(f as f32),
                None => mismatch("f32", value),
            },
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => match other.as_i64() {
                Some(i) => Ok(i != 0),
                None => mismatch("bool", value),
            },
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        match value.as_str() {
            Some(s) => Ok(s.to_string()),
            None => mismatch("String", value),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Bytes(b) => Ok(b.clone()),
            other => mismatch("Vec<u8>", other),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Json(j) => Ok(j.clone()),
            Value::Text(s) => serde_json::from_str(s).or_else(|_| mismatch("json", value)),
            other => mismatch("json", other),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}
