//! Validate a rule file without evaluating it

use std::path::PathBuf;

use super::CliError;
use crate::rules::RuleSet;
use crate::verbs::verb_of;

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Path to the JSON rule file
    pub rules: PathBuf,
}

/// Summary of a successful check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub rules: usize,
    pub blocks: usize,
    pub statements: usize,
}

/// Loads the rule file and checks every statement names a known verb.
///
/// Operand types depend on the assertion and are only checked at run time.
pub fn execute_check(options: &CheckOptions) -> Result<CheckReport, CliError> {
    let rules = RuleSet::from_path(&options.rules)?;
    let mut report = CheckReport {
        rules: rules.len(),
        blocks: 0,
        statements: 0,
    };

    for rule in rules.rules() {
        let Some(blocks) = &rule.statement_blocks else {
            continue;
        };
        report.blocks += blocks.len();
        for block in blocks {
            for statement in &block.statements {
                verb_of(statement)?;
                report.statements += 1;
            }
        }
    }

    Ok(report)
}
