use tracing::{Level, debug, info};

use crate::error::{EvalError, Result};
use crate::namespace::Namespace;
use crate::output::to_json;
use crate::rules::{Block, Mapping, MappingTable, Rule, RuleSet};
use crate::substitute::substitute;
use crate::value::{Map, Value};
use crate::verbs;

pub const DEFAULT_RULE_ID_FORMAT: &str = "<rule [${rule_number}:\"${rule_name}\"]>";
pub const DEFAULT_STATEMENT_ID_FORMAT: &str = "<rule [${rule_number}:\"${rule_name}\"] block [${block_number}:\"${block_name}\"] statement ${statement_number}>";

/// What happens after a statement, block, or rule finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Fall through to the next statement
    StatementContinue,
    /// Skip the rest of the block
    BlockContinue,
    RuleSuccess,
    RuleFail,
}

/// Mutable state threaded through every verb of one evaluation.
#[derive(Debug, Clone)]
pub struct EvalContext {
    pub namespace: Namespace,
    /// Result of the most recent test verb (`compare`, `in`, `not_in`, `regexp`)
    pub last_test: bool,
}

impl EvalContext {
    pub fn new(namespace: Namespace) -> Self {
        EvalContext {
            namespace,
            last_test: true,
        }
    }
}

/// Format strings for the diagnostic ids attached to errors and log events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorConfig {
    pub rule_id_format: String,
    pub statement_id_format: String,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        ProcessorConfig {
            rule_id_format: DEFAULT_RULE_ID_FORMAT.to_string(),
            statement_id_format: DEFAULT_STATEMENT_ID_FORMAT.to_string(),
        }
    }
}

/// Runs a rule set against assertion documents.
///
/// The processor only holds read-only inputs; each call to [`process`]
/// owns its own namespaces and success flag, so one processor can serve
/// concurrent evaluations.
///
/// # Examples
///
/// ```
/// use idp_mapping::{RuleProcessor, RuleSet, Value};
///
/// let rules = RuleSet::from_json_str(r#"[{
///     "statement_blocks": [[
///         ["in", "admin", "$assertion[groups]"],
///         ["exit", "rule_succeeds", "if_success"]
///     ]],
///     "mapping": {"role": "admin"}
/// }]"#).unwrap();
///
/// let processor = RuleProcessor::new(rules);
/// let mapped = processor
///     .process_json(r#"{"user": "alice", "groups": ["eng", "admin"]}"#)
///     .unwrap()
///     .unwrap();
/// assert_eq!(mapped["role"], Value::from("admin"));
/// ```
///
/// [`process`]: RuleProcessor::process
#[derive(Debug, Clone, Default)]
pub struct RuleProcessor {
    rules: RuleSet,
    mappings: MappingTable,
    config: ProcessorConfig,
}

impl RuleProcessor {
    pub fn new(rules: RuleSet) -> Self {
        RuleProcessor {
            rules,
            ..RuleProcessor::default()
        }
    }

    pub fn with_mappings(mut self, mappings: MappingTable) -> Self {
        self.mappings = mappings;
        self
    }

    pub fn with_config(mut self, config: ProcessorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_rule_id_format(mut self, format: impl Into<String>) -> Self {
        self.config.rule_id_format = format.into();
        self
    }

    pub fn with_statement_id_format(mut self, format: impl Into<String>) -> Self {
        self.config.statement_id_format = format.into();
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn mappings(&self) -> &MappingTable {
        &self.mappings
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn rule_id(&self, ns: &Namespace) -> Result<String> {
        substitute(&self.config.rule_id_format, ns)
    }

    pub fn statement_id(&self, ns: &Namespace) -> Result<String> {
        substitute(&self.config.statement_id_format, ns)
    }

    /// Parses `assertion` as JSON and evaluates it.
    pub fn process_json(&self, assertion: &str) -> Result<Option<Map>> {
        let json: serde_json::Value = serde_json::from_str(assertion)?;
        self.process(&Value::from_json(json)?)
    }

    /// Evaluates the rules in order against `assertion`.
    ///
    /// Returns the mapping of the first rule that succeeds, or `None` when
    /// every rule fails. Any error aborts the whole evaluation, and an
    /// assertion that is not a map is rejected as an invalid rule.
    pub fn process(&self, assertion: &Value) -> Result<Option<Map>> {
        if !matches!(assertion, Value::Map(_)) {
            return Err(EvalError::InvalidRule(format!(
                "assertion must be a JSON object, not {}",
                assertion.classify()
            )));
        }
        let document = to_json(assertion);
        info!(assertion = %document, "processing assertion");

        let mut last_test = true;
        for (rule_number, rule) in self.rules.rules().iter().enumerate() {
            let namespace =
                Namespace::for_rule(rule_number, rule.name.as_deref().unwrap_or(""), assertion);
            let mut ctx = EvalContext {
                namespace,
                last_test,
            };

            let outcome = self.run_rule(rule, &mut ctx)?;
            last_test = ctx.last_test;
            debug!(rule = rule_number, ?outcome, "rule finished");

            if outcome == Outcome::RuleSuccess {
                let mapped = self.extract_mapping(rule, &ctx.namespace)?;
                let claim = to_json(&Value::Map(mapped.clone()));
                info!(rule = rule_number, mapping = %claim, "rule matched");
                return Ok(Some(mapped));
            }
        }

        info!("no rule matched");
        Ok(None)
    }

    fn run_rule(&self, rule: &Rule, ctx: &mut EvalContext) -> Result<Outcome> {
        let blocks = rule
            .statement_blocks
            .as_ref()
            .ok_or_else(|| EvalError::InvalidRule("rule missing 'statement_blocks'".to_string()))?;

        for (block_number, block) in blocks.iter().enumerate() {
            ctx.namespace.enter_block(block_number);
            match self.run_block(block, ctx)? {
                Outcome::RuleSuccess => return Ok(Outcome::RuleSuccess),
                Outcome::RuleFail => return Ok(Outcome::RuleFail),
                Outcome::BlockContinue | Outcome::StatementContinue => continue,
            }
        }

        Ok(Outcome::RuleSuccess)
    }

    fn run_block(&self, block: &Block, ctx: &mut EvalContext) -> Result<Outcome> {
        for (statement_number, statement) in block.statements.iter().enumerate() {
            ctx.namespace.enter_statement(statement_number);

            let outcome = verbs::execute(statement, ctx).map_err(|e| {
                e.in_statement(self.describe_statement(&ctx.namespace), statement.to_string())
            })?;

            if tracing::enabled!(Level::DEBUG) {
                let verb = statement.verb().map(Value::to_text).unwrap_or_default();
                debug!(
                    statement = %self.describe_statement(&ctx.namespace),
                    verb = %verb,
                    success = ctx.last_test,
                    ?outcome,
                    "statement executed"
                );
            }

            if outcome != Outcome::StatementContinue {
                return Ok(outcome);
            }
        }

        Ok(Outcome::BlockContinue)
    }

    fn describe_statement(&self, ns: &Namespace) -> String {
        self.statement_id(ns)
            .unwrap_or_else(|e| format!("<statement id unavailable: {}>", e))
    }

    fn mapping_for<'a>(&'a self, rule: &'a Rule, ns: &Namespace) -> Result<&'a Mapping> {
        if let Some(mapping) = &rule.mapping {
            return Ok(mapping);
        }

        let rule_id = self.rule_id(ns)?;
        let Some(name) = &rule.mapping_name else {
            return Err(EvalError::InvalidRule(format!(
                "{} rule does not define mapping nor mapping_name unable to load mapping",
                rule_id
            )));
        };

        let mapping = self.mappings.get(name).ok_or_else(|| {
            EvalError::InvalidRule(format!(
                "{} rule specifies mapping_name '{}' but a mapping by that name does not exist, unable to load mapping",
                rule_id, name
            ))
        })?;
        debug!(mapping_name = %name, rule = %rule_id, "using named mapping");
        Ok(mapping)
    }

    fn extract_mapping(&self, rule: &Rule, ns: &Namespace) -> Result<Map> {
        let mapping = self.mapping_for(rule, ns)?;
        let mut mapped = Map::with_capacity(mapping.len());
        for (key, token) in mapping {
            let value = token.resolve(ns).map_err(|e| EvalError::Mapping {
                rule_id: self
                    .rule_id(ns)
                    .unwrap_or_else(|_| "<rule>".to_string()),
                key: key.clone(),
                expr: token.to_string(),
                source: Box::new(e),
            })?;
            mapped.insert(key.clone(), value.clone());
        }
        Ok(mapped)
    }
}
