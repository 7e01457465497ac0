use std::fmt;

use indexmap::IndexMap;

use crate::error::{EvalError, Result};

/// Ordered string-keyed map used for `Value::Map`.
pub type Map = IndexMap<String, Value>;

/// A value bound in a rule namespace.
///
/// This mirrors the JSON data model with a distinction between integers and
/// reals. Maps keep their insertion order, so an assertion document and the
/// produced claim mapping round-trip in the order they were written.
///
/// # Examples
///
/// ```
/// use idp_mapping::{Value, ValueType};
///
/// let groups = Value::Array(vec![Value::from("eng"), Value::from("admin")]);
/// assert_eq!(groups.classify(), ValueType::Array);
/// assert_eq!(groups.to_string(), r#"["eng", "admin"]"#);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// UTF-8 string
    String(String),

    /// Ordered list of values
    Array(Vec<Value>),

    /// Insertion-ordered map with string keys
    Map(Map),

    /// 64-bit signed integer
    Integer(i64),

    /// Double precision floating point number
    Real(f64),

    /// JSON boolean
    Boolean(bool),

    /// JSON null
    Null,
}

/// The kind of a [`Value`], used for verb operand checks and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    String,
    Array,
    Map,
    Integer,
    Boolean,
    Null,
    Real,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::String => "STRING",
            ValueType::Array => "ARRAY",
            ValueType::Map => "MAP",
            ValueType::Integer => "INTEGER",
            ValueType::Boolean => "BOOLEAN",
            ValueType::Null => "NULL",
            ValueType::Real => "REAL",
        };
        f.write_str(name)
    }
}

impl Value {
    /// Returns the kind of this value.
    pub fn classify(&self) -> ValueType {
        match self {
            Value::String(_) => ValueType::String,
            Value::Array(_) => ValueType::Array,
            Value::Map(_) => ValueType::Map,
            Value::Integer(_) => ValueType::Integer,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Null => ValueType::Null,
            Value::Real(_) => ValueType::Real,
        }
    }

    /// Converts a parsed JSON document into a `Value`.
    ///
    /// Integral numbers that do not fit in an `i64` have no representation
    /// and are rejected as an invalid rule.
    pub fn from_json(json: serde_json::Value) -> Result<Value> {
        Ok(match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Integer(i)
                } else if n.is_u64() {
                    return Err(EvalError::InvalidRule(format!(
                        "integer {} does not fit in a signed 64-bit value",
                        n
                    )));
                } else {
                    match n.as_f64() {
                        Some(f) => Value::Real(f),
                        None => {
                            return Err(EvalError::InvalidRule(format!(
                                "unsupported number {}",
                                n
                            )));
                        }
                    }
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => Value::Array(
                arr.into_iter()
                    .map(Value::from_json)
                    .collect::<Result<Vec<_>>>()?,
            ),
            serde_json::Value::Object(obj) => {
                let mut map = Map::with_capacity(obj.len());
                for (k, v) in obj {
                    map.insert(k, Value::from_json(v)?);
                }
                Value::Map(map)
            }
        })
    }

    /// Converts this value back into JSON. Non-finite reals become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::Number((*i).into()),
            Value::Real(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(arr) => serde_json::Value::Array(arr.iter().map(Value::to_json).collect()),
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Text used when splicing a value into a string: strings verbatim,
    /// everything else in its natural string form.
    pub fn to_text(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Natural string form: strings are double quoted, collections are bracketed
/// with `", "` separators, reals always carry a fractional part or exponent.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "\"{}\"", s.replace('"', "\\\"")),
            Value::Array(arr) => {
                f.write_str("[")?;
                for (i, item) in arr.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Map(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "\"{}\": {}", key.replace('"', "\\\""), value)?;
                }
                f.write_str("}")
            }
            Value::Integer(n) => write!(f, "{}", n),
            Value::Real(n) => f.write_str(&format_real(*n)),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Null => f.write_str("null"),
        }
    }
}

fn format_real(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let abs = n.abs();
    if abs == 0.0 || (1e-3..1e7).contains(&abs) {
        let s = n.to_string();
        if s.contains('.') { s } else { format!("{}.0", s) }
    } else {
        let s = format!("{:e}", n);
        match s.split_once('e') {
            Some((mantissa, exp)) if mantissa.contains('.') => format!("{}E{}", mantissa, exp),
            Some((mantissa, exp)) => format!("{}.0E{}", mantissa, exp),
            None => s,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Real(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(arr: Vec<Value>) -> Self {
        Value::Array(arr)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(map)
    }
}
