use indexmap::IndexMap;

use crate::value::Value;

pub const ASSERTION: &str = "assertion";
pub const RULE_NUMBER: &str = "rule_number";
pub const RULE_NAME: &str = "rule_name";
pub const BLOCK_NUMBER: &str = "block_number";
pub const BLOCK_NAME: &str = "block_name";
pub const STATEMENT_NUMBER: &str = "statement_number";
pub const REGEXP_ARRAY: &str = "regexp_array";
pub const REGEXP_MAP: &str = "regexp_map";

/// Variable bindings for one rule attempt.
///
/// A namespace is created per rule and seeded with the reserved bookkeeping
/// variables plus a private copy of the assertion document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Namespace {
    bindings: IndexMap<String, Value>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh namespace for a rule attempt. The assertion is cloned so that
    /// in-place mutation never leaks into the caller's document or other rules.
    pub fn for_rule(rule_number: usize, rule_name: &str, assertion: &Value) -> Self {
        let mut ns = Namespace::new();
        ns.insert(RULE_NUMBER, Value::Integer(rule_number as i64));
        ns.insert(RULE_NAME, Value::String(rule_name.to_string()));
        ns.insert(ASSERTION, assertion.clone());
        ns
    }

    pub fn enter_block(&mut self, block_number: usize) {
        self.insert(BLOCK_NUMBER, Value::Integer(block_number as i64));
        self.insert(BLOCK_NAME, Value::String(String::new()));
    }

    pub fn enter_statement(&mut self, statement_number: usize) {
        self.insert(STATEMENT_NUMBER, Value::Integer(statement_number as i64));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.bindings.get_mut(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.bindings.insert(name.into(), value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.bindings.iter()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Namespace {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Namespace {
            bindings: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
