// Scalar cell values and the coercion rules shared by filtering and aggregation

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single cell of a dataset row.
///
/// Serializes as a plain JSON scalar (`null` when missing). Non-finite
/// numbers have no JSON form and are written as `{"number": "NaN"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ValueRepr", into = "ValueRepr")]
pub enum Value {
    Number(f64),
    Text(String),
    /// Empty cell, or a column the row does not carry
    Missing,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ValueRepr {
    Number(f64),
    Text(String),
    NonFinite { number: String },
    Missing,
}

impl From<Value> for ValueRepr {
    fn from(value: Value) -> Self {
        match value {
            Value::Number(n) if n.is_finite() => ValueRepr::Number(n),
            Value::Number(n) => ValueRepr::NonFinite { number: n.to_string() },
            Value::Text(s) => ValueRepr::Text(s),
            Value::Missing => ValueRepr::Missing,
        }
    }
}

impl TryFrom<ValueRepr> for Value {
    type Error = String;

    fn try_from(repr: ValueRepr) -> Result<Self, Self::Error> {
        match repr {
            ValueRepr::Number(n) => Ok(Value::Number(n)),
            ValueRepr::Text(s) => Ok(Value::Text(s)),
            ValueRepr::NonFinite { number } => number
                .parse::<f64>()
                .map(Value::Number)
                .map_err(|_| format!("invalid non-finite number '{}'", number)),
            ValueRepr::Missing => Ok(Value::Missing),
        }
    }
}

/// Hashable identity of a value, used to group rows by their exact raw value.
///
/// `Number(5.0)` and `Text("5")` are different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Number(u64),
    Text(String),
    Missing,
}

impl Value {
    /// Infer a typed value from a raw CSV field.
    ///
    /// Empty fields become `Missing`, fields that look like a plain decimal
    /// number become `Number`, everything else is kept as `Text`.
    pub fn infer(raw: &str) -> Value {
        if raw.is_empty() {
            return Value::Missing;
        }
        if looks_numeric(raw) {
            if let Ok(n) = raw.trim().parse::<f64>() {
                if n.is_finite() {
                    return Value::Number(n);
                }
            }
        }
        Value::Text(raw.to_string())
    }

    /// Explicit numeric coercion. `None` means "not a number".
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) if n.is_nan() => None,
            Value::Number(n) => Some(*n),
            Value::Text(s) => text_to_number(s),
            Value::Missing => None,
        }
    }

    /// Loose equality against a raw filter string.
    ///
    /// Numeric cells match when the string coerces to the same number, text
    /// cells match on exact string equality, missing cells never match.
    pub fn loose_eq(&self, raw: &str) -> bool {
        match self {
            Value::Number(n) => text_to_number(raw) == Some(*n),
            Value::Text(s) => s == raw,
            Value::Missing => false,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Missing cells and blank strings carry no data.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Missing => true,
            Value::Text(s) => s.trim().is_empty(),
            Value::Number(_) => false,
        }
    }

    pub fn group_key(&self) -> GroupKey {
        match self {
            // -0.0 and 0.0 group together, every NaN groups together
            Value::Number(n) if *n == 0.0 => GroupKey::Number(0f64.to_bits()),
            Value::Number(n) if n.is_nan() => GroupKey::Number(f64::NAN.to_bits()),
            Value::Number(n) => GroupKey::Number(n.to_bits()),
            Value::Text(s) => GroupKey::Text(s.clone()),
            Value::Missing => GroupKey::Missing,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
            Value::Missing => Ok(()),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

/// Coerce a raw string to a finite number. Blank strings are not numbers.
pub fn text_to_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Matches `-?(\d+\.?|\.\d+|\d+\.\d+)([eE][-+]?\d+)?` with surrounding whitespace.
fn looks_numeric(raw: &str) -> bool {
    let bytes = raw.trim().as_bytes();
    let mut i = 0;

    if bytes.first() == Some(&b'-') {
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = i - int_start;

    let mut frac_digits = 0;
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        frac_digits = i - frac_start;
    }

    if int_digits == 0 && frac_digits == 0 {
        return false;
    }

    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }

    i == bytes.len()
}
