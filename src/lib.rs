pub mod error;
pub mod namespace;
pub mod output;
pub mod processor;
pub mod rules;
pub mod substitute;
pub mod token;
pub mod value;
pub mod verbs;

#[cfg(feature = "cli")]
pub mod cli;

pub use error::{ErrorKind, EvalError};
pub use namespace::Namespace;
pub use output::{to_json, to_json_pretty};
pub use processor::{EvalContext, Outcome, ProcessorConfig, RuleProcessor};
pub use rules::{Block, Mapping, MappingTable, Rule, RuleSet, Statement};
pub use substitute::substitute;
pub use token::Token;
pub use value::{Value, ValueType};
pub use verbs::{Criteria, Verb};
