//! Run a rule file against one assertion document

use std::path::PathBuf;

use super::CliError;
use crate::{MappingTable, RuleProcessor, RuleSet, Value};

/// Options for the map command
#[derive(Debug, Clone, Default)]
pub struct MapOptions {
    /// Path to the JSON rule file
    pub rules: PathBuf,
    /// Optional path to a JSON table of named mappings
    pub mappings: Option<PathBuf>,
    /// Assertion document as JSON text
    pub assertion: Option<String>,
}

/// Evaluates the assertion and returns the mapped claim, if any rule matched.
pub fn execute_map(options: &MapOptions) -> Result<Option<Value>, CliError> {
    let assertion = options.assertion.as_deref().ok_or(CliError::NoInput)?;

    let rules = RuleSet::from_path(&options.rules)?;
    let mappings = match &options.mappings {
        Some(path) => MappingTable::from_path(path)?,
        None => MappingTable::new(),
    };

    let processor = RuleProcessor::new(rules).with_mappings(mappings);
    let mapped = processor.process_json(assertion)?;
    Ok(mapped.map(Value::Map))
}
