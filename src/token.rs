//! Operand tokens: constants and variable references.
//!
//! A statement operand that is a string consisting of nothing but a variable
//! reference (optionally padded with whitespace) becomes a
//! [`Token::Variable`]; every other operand is a [`Token::Constant`].
//!
//! Supported variable syntax:
//!
//! ```text
//! $name
//! ${name}
//! $name[index]
//! ${name[index]}
//! ```
//!
//! Names start with an ASCII letter followed by letters, digits, or
//! underscores. Indexes are letters, digits, or underscores.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{EvalError, Result};
use crate::namespace::Namespace;
use crate::value::Value;

const VARIABLE_PAT: &str = r"\$\{?([a-zA-Z][a-zA-Z0-9_]*)(\[([a-zA-Z0-9_]+)\])?\}?";

/// Finds variable references embedded in text. Group 1 is the name, group 3
/// the optional index. An escaped `\$` is rejected by [`find_variables`], not
/// by the pattern itself.
pub static VARIABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(VARIABLE_PAT).expect("variable pattern compiles"));

/// Matches a string that is only a variable reference.
pub static VARIABLE_ONLY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^\s*{}\s*$", VARIABLE_PAT)).expect("variable pattern compiles")
});

/// A statement operand or mapping expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A literal value, used as-is
    Constant(Value),

    /// A reference into the namespace, optionally indexed
    ///
    /// # Examples
    /// ```text
    /// $user              -> name "user", no index
    /// ${assertion[mail]} -> name "assertion", index "mail"
    /// $groups[0]         -> name "groups", index "0"
    /// ```
    Variable { name: String, index: Option<String> },
}

/// A variable reference located inside a larger string.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableMatch {
    pub start: usize,
    pub end: usize,
    pub token: Token,
}

/// Yields every unescaped variable reference in `text`, left to right.
pub fn find_variables(text: &str) -> impl Iterator<Item = VariableMatch> + '_ {
    VARIABLE_RE.captures_iter(text).filter_map(move |caps| {
        let whole = caps.get(0)?;
        if text[..whole.start()].ends_with('\\') {
            return None;
        }
        Some(VariableMatch {
            start: whole.start(),
            end: whole.end(),
            token: Token::Variable {
                name: caps[1].to_string(),
                index: caps.get(3).map(|m| m.as_str().to_string()),
            },
        })
    })
}

impl Token {
    /// Builds a token from a raw operand value.
    pub fn new(value: Value) -> Token {
        if let Value::String(s) = &value
            && let Some(token) = Token::parse_variable(s)
        {
            return token;
        }
        Token::Constant(value)
    }

    /// Parses `text` as a variable reference, if that is all it contains.
    pub fn parse_variable(text: &str) -> Option<Token> {
        let caps = VARIABLE_ONLY_RE.captures(text)?;
        Some(Token::Variable {
            name: caps[1].to_string(),
            index: caps.get(3).map(|m| m.as_str().to_string()),
        })
    }

    pub fn variable(name: impl Into<String>) -> Token {
        Token::Variable {
            name: name.into(),
            index: None,
        }
    }

    pub fn indexed(name: impl Into<String>, index: impl Into<String>) -> Token {
        Token::Variable {
            name: name.into(),
            index: Some(index.into()),
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Token::Variable { .. })
    }

    /// Looks up the token's value in `ns`.
    pub fn resolve<'a>(&'a self, ns: &'a Namespace) -> Result<&'a Value> {
        let (name, index) = match self {
            Token::Constant(value) => return Ok(value),
            Token::Variable { name, index } => (name, index),
        };

        let base = ns
            .get(name)
            .ok_or_else(|| EvalError::UndefinedValue(format!("variable '{}' not defined", name)))?;

        let Some(index) = index else {
            return Ok(base);
        };

        match base {
            Value::Array(arr) => {
                let idx = array_index(name, index, arr.len())?;
                Ok(&arr[idx])
            }
            Value::Map(map) => map.get(index.as_str()).ok_or_else(|| {
                EvalError::UndefinedValue(format!(
                    "variable '{}' is a map indexed by '{}', however the index does not exist",
                    name, index
                ))
            }),
            other => Err(not_indexable(name, index, other)),
        }
    }

    /// Mutable access to the addressed value, for verbs that modify in place.
    pub fn resolve_mut<'a>(&self, ns: &'a mut Namespace) -> Result<&'a mut Value> {
        let (name, index) = match self {
            Token::Constant(_) => {
                return Err(EvalError::InvalidType("cannot assign to a constant".to_string()));
            }
            Token::Variable { name, index } => (name, index),
        };

        let base = ns
            .get_mut(name)
            .ok_or_else(|| EvalError::UndefinedValue(format!("variable '{}' not defined", name)))?;

        let Some(index) = index else {
            return Ok(base);
        };

        match base {
            Value::Array(arr) => {
                let idx = array_index(name, index, arr.len())?;
                Ok(&mut arr[idx])
            }
            Value::Map(map) => map.get_mut(index.as_str()).ok_or_else(|| {
                EvalError::UndefinedValue(format!(
                    "variable '{}' is a map indexed by '{}', however the index does not exist",
                    name, index
                ))
            }),
            other => Err(not_indexable(name, index, other)),
        }
    }

    /// Stores `value` at the token's address.
    ///
    /// Unindexed variables are created or replaced. Indexed targets must
    /// already exist: the array slot must be in range and the map key present.
    pub fn assign(&self, value: Value, ns: &mut Namespace) -> Result<()> {
        match self {
            Token::Constant(_) => {
                Err(EvalError::InvalidType("cannot assign to a constant".to_string()))
            }
            Token::Variable { name, index: None } => {
                ns.insert(name.clone(), value);
                Ok(())
            }
            Token::Variable { .. } => {
                *self.resolve_mut(ns)? = value;
                Ok(())
            }
        }
    }
}

fn array_index(name: &str, index: &str, len: usize) -> Result<usize> {
    let idx: i64 = index.parse().map_err(|_| {
        EvalError::InvalidType(format!(
            "variable '{}' is an array indexed by '{}', however the index cannot be converted to an integer",
            name, index
        ))
    })?;
    usize::try_from(idx)
        .ok()
        .filter(|i| *i < len)
        .ok_or_else(|| {
            EvalError::UndefinedValue(format!(
                "variable '{}' is an array of size {} indexed by '{}', however the index is out of bounds",
                name, len, idx
            ))
        })
}

fn not_indexable(name: &str, index: &str, base: &Value) -> EvalError {
    EvalError::InvalidType(format!(
        "variable '{}' is indexed by '{}', variable must be an array or map, not {}",
        name,
        index,
        base.classify()
    ))
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Constant(value) => f.write_str(&value.to_text()),
            Token::Variable { name, index: None } => write!(f, "${}", name),
            Token::Variable {
                name,
                index: Some(index),
            } => write!(f, "${}[{}]", name, index),
        }
    }
}
