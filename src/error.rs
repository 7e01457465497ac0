//! Error taxonomy for rule evaluation.
//!
//! Every failure aborts the whole `process()` call. The first four variants
//! are the root causes; the remaining ones add context (which statement,
//! which mapping entry) around a boxed cause.

use std::io;

/// Errors that can occur while loading or evaluating rules.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// Structurally malformed rule: unknown verb, bad operator, bad mapping reference
    #[error("invalid rule: {0}")]
    InvalidRule(String),

    /// A value's type does not fit what the verb or index expression needs
    #[error("invalid type: {0}")]
    InvalidType(String),

    /// A well-formed operand failed at runtime (bad regex, non-string element)
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// Unbound variable, missing map key, or array index out of range
    #[error("undefined value: {0}")]
    UndefinedValue(String),

    /// An operand could not be turned into a token
    #[error("parameter {index}, {source}")]
    StatementError {
        index: usize,
        #[source]
        source: Box<EvalError>,
    },

    /// Failure raised while executing one statement
    #[error("{id} statement={statement} {source}")]
    Statement {
        id: String,
        statement: String,
        #[source]
        source: Box<EvalError>,
    },

    /// Failure raised while resolving one entry of a rule's mapping
    #[error("{rule_id} unable to get value for mapping {key}={expr}, {source}")]
    Mapping {
        rule_id: String,
        key: String,
        expr: String,
        #[source]
        source: Box<EvalError>,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Root cause of an [`EvalError`], with context wrappers stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRule,
    InvalidType,
    InvalidValue,
    UndefinedValue,
    StatementError,
    Json,
    Io,
}

impl EvalError {
    /// Classifies the error, looking through `Statement` and `Mapping` context.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EvalError::InvalidRule(_) => ErrorKind::InvalidRule,
            EvalError::InvalidType(_) => ErrorKind::InvalidType,
            EvalError::InvalidValue(_) => ErrorKind::InvalidValue,
            EvalError::UndefinedValue(_) => ErrorKind::UndefinedValue,
            EvalError::StatementError { .. } => ErrorKind::StatementError,
            EvalError::Statement { source, .. } | EvalError::Mapping { source, .. } => {
                source.kind()
            }
            EvalError::Json(_) => ErrorKind::Json,
            EvalError::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn in_statement(self, id: String, statement: String) -> Self {
        EvalError::Statement {
            id,
            statement,
            source: Box::new(self),
        }
    }
}

pub type Result<T, E = EvalError> = std::result::Result<T, E>;
