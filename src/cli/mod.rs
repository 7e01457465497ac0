//! CLI support for idp-mapping
//!
//! Provides programmatic access to the `idpmap` commands so they can be
//! embedded in other tools and tested without spawning a process.

mod check;
mod docs;
mod map;

pub use check::{CheckOptions, CheckReport, execute_check};
pub use docs::{DocTopic, get_doc_topic, get_docs_overview};
pub use map::{MapOptions, execute_map};

use std::io;

/// Errors that can occur during CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Evaluation error: {0}")]
    Eval(#[from] crate::EvalError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("No assertion provided. Use --assertion or pipe JSON to stdin.")]
    NoInput,

    #[error("Unknown topic: '{0}'\nRun 'idpmap docs' to see available topics.")]
    UnknownTopic(String),
}
