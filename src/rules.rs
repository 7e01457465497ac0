//! Rule programs and named mapping tables, loaded from JSON.
//!
//! A rule file is a JSON array of rule objects:
//!
//! ```json
//! [
//!   {
//!     "name": "admins",
//!     "statement_blocks": [
//!       [
//!         ["in", "admin", "$assertion[groups]"],
//!         ["exit", "rule_succeeds", "if_success"]
//!       ]
//!     ],
//!     "mapping": {"role": "admin", "user": "$assertion[user]"}
//!   }
//! ]
//! ```
//!
//! Shape problems are reported while loading. A rule without
//! `statement_blocks` or without any mapping loads fine and only fails once
//! evaluation reaches it.

use std::fmt;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::error::{EvalError, Result};
use crate::token::Token;
use crate::value::Value;

/// Output keys bound to the tokens that produce their values.
pub type Mapping = IndexMap<String, Token>;

/// One verb invocation: the verb followed by its raw operands.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    items: Vec<Value>,
}

impl Statement {
    pub fn new(items: Vec<Value>) -> Self {
        Statement { items }
    }

    /// Element 0, the verb, if present.
    pub fn verb(&self) -> Option<&Value> {
        self.items.first()
    }

    /// Raw item at `index` (0 is the verb).
    pub fn item(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn from_json(json: serde_json::Value) -> Result<Statement> {
        let serde_json::Value::Array(items) = json else {
            return Err(EvalError::InvalidRule(format!(
                "statement must be an array, not {}",
                json
            )));
        };
        let items = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                Value::from_json(item).map_err(|e| EvalError::StatementError {
                    index,
                    source: Box::new(e),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Statement { items })
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", item)?;
        }
        f.write_str("]")
    }
}

/// An ordered group of statements; `continue` skips to the next block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub statements: Vec<Statement>,
}

impl Block {
    pub fn new(statements: Vec<Statement>) -> Self {
        Block { statements }
    }
}

/// A single candidate rule program.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rule {
    /// Optional display name, seeded into `rule_name`
    pub name: Option<String>,
    pub statement_blocks: Option<Vec<Block>>,
    /// Inline mapping; takes precedence over `mapping_name`
    pub mapping: Option<Mapping>,
    pub mapping_name: Option<String>,
}

impl Rule {
    pub fn new(blocks: Vec<Block>) -> Self {
        Rule {
            statement_blocks: Some(blocks),
            ..Rule::default()
        }
    }

    pub fn with_mapping(mut self, mapping: Mapping) -> Self {
        self.mapping = Some(mapping);
        self
    }

    pub fn with_mapping_name(mut self, name: impl Into<String>) -> Self {
        self.mapping_name = Some(name.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn from_json(json: serde_json::Value) -> Result<Rule> {
        let serde_json::Value::Object(mut obj) = json else {
            return Err(EvalError::InvalidRule(format!(
                "rule must be an object, not {}",
                json
            )));
        };

        let name = match obj.remove("name") {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(s),
            Some(other) => {
                return Err(EvalError::InvalidRule(format!(
                    "rule defines 'name' but it is not a string: {}",
                    other
                )));
            }
        };

        let statement_blocks = match obj.remove("statement_blocks") {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::Array(blocks)) => Some(
                blocks
                    .into_iter()
                    .map(block_from_json)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Some(other) => {
                return Err(EvalError::InvalidRule(format!(
                    "rule defines 'statement_blocks' but it is not an array: {}",
                    other
                )));
            }
        };

        let mapping = match obj.remove("mapping") {
            None | Some(serde_json::Value::Null) => None,
            Some(json @ serde_json::Value::Object(_)) => Some(mapping_from_json(json)?),
            Some(other) => {
                return Err(EvalError::InvalidRule(format!(
                    "rule defines 'mapping' but it is not a Map: {}",
                    other
                )));
            }
        };

        let mapping_name = match obj.remove("mapping_name") {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(s),
            Some(other) => {
                return Err(EvalError::InvalidRule(format!(
                    "rule defines 'mapping_name' but it is not a string: {}",
                    other
                )));
            }
        };

        Ok(Rule {
            name,
            statement_blocks,
            mapping,
            mapping_name,
        })
    }
}

fn block_from_json(json: serde_json::Value) -> Result<Block> {
    match json {
        serde_json::Value::Array(statements) => Ok(Block {
            statements: statements
                .into_iter()
                .map(Statement::from_json)
                .collect::<Result<Vec<_>>>()?,
        }),
        other => Err(EvalError::InvalidRule(format!(
            "statement block must be an array, not {}",
            other
        ))),
    }
}

/// Parses a JSON object of `key: tokenExpr` pairs.
pub fn mapping_from_json(json: serde_json::Value) -> Result<Mapping> {
    let serde_json::Value::Object(obj) = json else {
        return Err(EvalError::InvalidRule(format!(
            "mapping must be an object, not {}",
            json
        )));
    };
    obj.into_iter()
        .map(|(key, expr)| -> Result<(String, Token)> {
            Ok((key, Token::new(Value::from_json(expr)?)))
        })
        .collect()
}

/// An ordered list of rules, tried first to last.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        RuleSet { rules }
    }

    pub fn from_json(json: serde_json::Value) -> Result<RuleSet> {
        let serde_json::Value::Array(rules) = json else {
            return Err(EvalError::InvalidRule(
                "rules must be a JSON array of rule objects".to_string(),
            ));
        };
        Ok(RuleSet {
            rules: rules
                .into_iter()
                .map(Rule::from_json)
                .collect::<Result<Vec<_>>>()?,
        })
    }

    pub fn from_json_str(text: &str) -> Result<RuleSet> {
        RuleSet::from_json(serde_json::from_str(text)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<RuleSet> {
        RuleSet::from_json(serde_json::from_reader(reader)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<RuleSet> {
        RuleSet::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FromStr for RuleSet {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        RuleSet::from_json_str(s)
    }
}

/// Reusable mappings referenced by a rule's `mapping_name`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingTable {
    mappings: IndexMap<String, Mapping>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, mapping: Mapping) {
        self.mappings.insert(name.into(), mapping);
    }

    pub fn get(&self, name: &str) -> Option<&Mapping> {
        self.mappings.get(name)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Loads a JSON object whose values are mapping objects.
    pub fn from_json(json: serde_json::Value) -> Result<MappingTable> {
        let serde_json::Value::Object(obj) = json else {
            return Err(EvalError::InvalidRule(
                "mapping table must be a JSON object of mappings".to_string(),
            ));
        };
        let mut table = MappingTable::new();
        for (name, mapping) in obj {
            table.insert(name, mapping_from_json(mapping)?);
        }
        Ok(table)
    }

    pub fn from_json_str(text: &str) -> Result<MappingTable> {
        MappingTable::from_json(serde_json::from_str(text)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<MappingTable> {
        MappingTable::from_json_str(&fs::read_to_string(path)?)
    }
}
