//! Variable interpolation into text.

use crate::error::Result;
use crate::namespace::Namespace;
use crate::token::find_variables;

/// Replaces every variable reference in `template` with its value from `ns`.
///
/// String values are spliced verbatim; all other values use their natural
/// string form (see [`crate::Value`]'s `Display`). Text around the references,
/// including escaped `\$`, is copied unchanged.
///
/// # Examples
///
/// ```
/// use idp_mapping::{Namespace, Value, substitute};
///
/// let mut ns = Namespace::new();
/// ns.insert("user", Value::from("alice"));
/// ns.insert("groups", Value::Array(vec![Value::from("eng")]));
///
/// let text = substitute("${user} in $groups", &ns).unwrap();
/// assert_eq!(text, r#"alice in ["eng"]"#);
/// ```
pub fn substitute(template: &str, ns: &Namespace) -> Result<String> {
    let mut result = String::with_capacity(template.len());
    let mut last = 0;

    for found in find_variables(template) {
        let value = found.token.resolve(ns)?;
        result.push_str(&template[last..found.start]);
        result.push_str(&value.to_text());
        last = found.end;
    }

    result.push_str(&template[last..]);
    Ok(result)
}
