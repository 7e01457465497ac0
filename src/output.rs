//! JSON output for mapped claims and logged documents.
//!
//! Compact and pretty-printed forms are provided. Unlike the natural string
//! form used for interpolation, this is strict JSON: map keys keep their
//! insertion order, reals always print with a fractional part, and non-finite
//! reals become `null`.
//!
//! # Examples
//!
//! ```
//! use idp_mapping::Value;
//! use idp_mapping::output::{to_json, to_json_pretty};
//!
//! let value = Value::Integer(42);
//!
//! assert_eq!(to_json(&value), "42");
//! assert_eq!(to_json_pretty(&value), "42");
//! ```

use crate::value::Value;

/// Compact JSON with no extra whitespace.
///
/// ```
/// use idp_mapping::{Value, value::Map};
/// use idp_mapping::output::to_json;
///
/// let mut claim = Map::new();
/// claim.insert("user".to_string(), Value::from("alice"));
/// claim.insert("roles".to_string(), Value::Array(vec![Value::from("admin")]));
///
/// assert_eq!(to_json(&Value::Map(claim)), r#"{"user":"alice","roles":["admin"]}"#);
/// ```
pub fn to_json(value: &Value) -> String {
    value.to_json().to_string()
}

/// JSON with 2-space indentation, one element or entry per line.
///
/// ```
/// use idp_mapping::Value;
/// use idp_mapping::output::to_json_pretty;
///
/// let groups = Value::Array(vec![Value::from("eng"), Value::Real(1.0)]);
/// assert_eq!(to_json_pretty(&groups), "[\n  \"eng\",\n  1.0\n]");
/// ```
pub fn to_json_pretty(value: &Value) -> String {
    format!("{:#}", value.to_json())
}
