//! Verb dispatch and the handler for each verb.
//!
//! Every handler validates its operands before touching the namespace and
//! reports an [`Outcome`]. Mutation-only verbs set the success flag to
//! `true`; `compare`, `in`, `not_in` and `regexp` set it to their test
//! result; `exit` and `continue` only read it.

use regex::Regex;

use crate::error::{EvalError, Result};
use crate::namespace::{REGEXP_ARRAY, REGEXP_MAP};
use crate::processor::{EvalContext, Outcome};
use crate::rules::Statement;
use crate::substitute::substitute;
use crate::token::Token;
use crate::value::{Map, Value, ValueType};

/// The verbs a statement may start with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Set,
    Length,
    Interpolate,
    Append,
    Unique,
    Split,
    Join,
    Lower,
    Upper,
    In,
    NotIn,
    Compare,
    Regexp,
    RegexpReplace,
    Exit,
    Continue,
}

impl Verb {
    pub const ALL: [Verb; 16] = [
        Verb::Set,
        Verb::Length,
        Verb::Interpolate,
        Verb::Append,
        Verb::Unique,
        Verb::Split,
        Verb::Join,
        Verb::Lower,
        Verb::Upper,
        Verb::In,
        Verb::NotIn,
        Verb::Compare,
        Verb::Regexp,
        Verb::RegexpReplace,
        Verb::Exit,
        Verb::Continue,
    ];

    /// Looks up a verb by name, ignoring case.
    pub fn from_name(name: &str) -> Option<Verb> {
        let name = name.to_lowercase();
        Verb::ALL.into_iter().find(|v| v.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Verb::Set => "set",
            Verb::Length => "length",
            Verb::Interpolate => "interpolate",
            Verb::Append => "append",
            Verb::Unique => "unique",
            Verb::Split => "split",
            Verb::Join => "join",
            Verb::Lower => "lower",
            Verb::Upper => "upper",
            Verb::In => "in",
            Verb::NotIn => "not_in",
            Verb::Compare => "compare",
            Verb::Regexp => "regexp",
            Verb::RegexpReplace => "regexp_replace",
            Verb::Exit => "exit",
            Verb::Continue => "continue",
        }
    }
}

/// When an `exit` or `continue` fires, relative to the success flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criteria {
    IfSuccess,
    IfNotSuccess,
    Always,
    Never,
}

impl Criteria {
    pub fn from_name(name: &str) -> Option<Criteria> {
        match name.to_lowercase().as_str() {
            "if_success" => Some(Criteria::IfSuccess),
            "if_not_success" => Some(Criteria::IfNotSuccess),
            "always" => Some(Criteria::Always),
            "never" => Some(Criteria::Never),
            _ => None,
        }
    }

    pub fn holds(self, last_test: bool) -> bool {
        match self {
            Criteria::IfSuccess => last_test,
            Criteria::IfNotSuccess => !last_test,
            Criteria::Always => true,
            Criteria::Never => false,
        }
    }
}

/// Reads the verb name from element 0 of `statement`.
pub fn verb_of(statement: &Statement) -> Result<Verb> {
    let name = match statement.verb() {
        None => return Err(EvalError::InvalidRule("statement has no verb".to_string())),
        Some(Value::String(name)) => name,
        Some(other) => {
            return Err(EvalError::InvalidRule(format!(
                "statement first member (i.e. verb) must be a string, not {}",
                other.classify()
            )));
        }
    };
    Verb::from_name(name)
        .ok_or_else(|| EvalError::InvalidRule(format!("unknown verb '{}'", name.to_lowercase())))
}

/// Executes one statement against `ctx`.
pub fn execute(statement: &Statement, ctx: &mut EvalContext) -> Result<Outcome> {
    let verb = verb_of(statement)?;
    let ops = Operands { verb, statement };

    match verb {
        Verb::Set => verb_set(&ops, ctx),
        Verb::Length => verb_length(&ops, ctx),
        Verb::Interpolate => verb_interpolate(&ops, ctx),
        Verb::Append => verb_append(&ops, ctx),
        Verb::Unique => verb_unique(&ops, ctx),
        Verb::Split => verb_split(&ops, ctx),
        Verb::Join => verb_join(&ops, ctx),
        Verb::Lower => verb_fold_case(&ops, ctx, str::to_lowercase),
        Verb::Upper => verb_fold_case(&ops, ctx, str::to_uppercase),
        Verb::In => verb_in(&ops, ctx, false),
        Verb::NotIn => verb_in(&ops, ctx, true),
        Verb::Compare => verb_compare(&ops, ctx),
        Verb::Regexp => verb_regexp(&ops, ctx),
        Verb::RegexpReplace => verb_regexp_replace(&ops, ctx),
        Verb::Exit => verb_exit(&ops, ctx),
        Verb::Continue => verb_continue(&ops, ctx),
    }
}

/// Operand accessors for one statement, producing uniform diagnostics.
struct Operands<'a> {
    verb: Verb,
    statement: &'a Statement,
}

impl Operands<'_> {
    fn item(&self, index: usize) -> Result<&Value> {
        self.statement.item(index).ok_or_else(|| {
            EvalError::InvalidRule(format!(
                "verb '{}' requires at least {} items but only {} are available.",
                self.verb.name(),
                index + 1,
                self.statement.len()
            ))
        })
    }

    /// Operand that must be a variable reference (an assignment target).
    fn variable(&self, index: usize) -> Result<Token> {
        let token = Token::new(self.item(index)?.clone());
        if !token.is_variable() {
            return Err(EvalError::InvalidType(format!(
                "verb '{}' requires parameter #{} to be a variable not CONSTANT. statement={}",
                self.verb.name(),
                index,
                self.statement
            )));
        }
        Ok(token)
    }

    /// Operand resolved against the namespace, any type.
    fn value(&self, index: usize, ctx: &EvalContext) -> Result<Value> {
        let token = Token::new(self.item(index)?.clone());
        token.resolve(&ctx.namespace).cloned()
    }

    /// Operand resolved against the namespace, restricted to `types`.
    fn typed(&self, index: usize, ctx: &EvalContext, types: &[ValueType]) -> Result<Value> {
        let value = self.value(index, ctx)?;
        self.check_type(index, &value, types)?;
        Ok(value)
    }

    /// String operand taken literally, without variable resolution.
    fn raw_string(&self, index: usize) -> Result<&str> {
        match self.item(index)? {
            Value::String(s) => Ok(s),
            other => Err(self.type_error(index, other, &[ValueType::String])),
        }
    }

    fn string(&self, index: usize, ctx: &EvalContext) -> Result<String> {
        match self.value(index, ctx)? {
            Value::String(s) => Ok(s),
            other => Err(self.type_error(index, &other, &[ValueType::String])),
        }
    }

    fn array(&self, index: usize, ctx: &EvalContext) -> Result<Vec<Value>> {
        match self.value(index, ctx)? {
            Value::Array(items) => Ok(items),
            other => Err(self.type_error(index, &other, &[ValueType::Array])),
        }
    }

    fn check_type(&self, index: usize, value: &Value, types: &[ValueType]) -> Result<()> {
        if types.contains(&value.classify()) {
            return Ok(());
        }
        Err(self.type_error(index, value, types))
    }

    fn type_error(&self, index: usize, value: &Value, types: &[ValueType]) -> EvalError {
        let expected: Vec<String> = types.iter().map(ValueType::to_string).collect();
        EvalError::InvalidType(format!(
            "verb '{}' requires parameter #{} to have types [{}], not {}. statement={}",
            self.verb.name(),
            index,
            expected.join(", "),
            value.classify(),
            self.statement
        ))
    }
}

const COLLECTION_TYPES: &[ValueType] = &[ValueType::Array, ValueType::Map, ValueType::String];

fn compile(verb: Verb, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| {
        EvalError::InvalidValue(format!(
            "verb '{}' failed, bad regular expression pattern '{}', {}",
            verb.name(),
            pattern,
            e
        ))
    })
}

fn store(ctx: &mut EvalContext, target: &Token, value: Value) -> Result<Outcome> {
    target.assign(value, &mut ctx.namespace)?;
    ctx.last_test = true;
    Ok(Outcome::StatementContinue)
}

fn verb_set(ops: &Operands, ctx: &mut EvalContext) -> Result<Outcome> {
    let variable = ops.variable(1)?;
    let value = ops.value(2, ctx)?;
    store(ctx, &variable, value)
}

fn verb_length(ops: &Operands, ctx: &mut EvalContext) -> Result<Outcome> {
    let variable = ops.variable(1)?;
    let length = match ops.value(2, ctx)? {
        Value::Array(arr) => arr.len(),
        Value::Map(map) => map.len(),
        Value::String(s) => s.chars().count(),
        other => return Err(ops.type_error(2, &other, COLLECTION_TYPES)),
    };
    store(ctx, &variable, Value::Integer(length as i64))
}

fn verb_interpolate(ops: &Operands, ctx: &mut EvalContext) -> Result<Outcome> {
    let variable = ops.variable(1)?;
    let template = ops.raw_string(2)?;
    let text = substitute(template, &ctx.namespace)?;
    store(ctx, &variable, Value::String(text))
}

fn verb_append(ops: &Operands, ctx: &mut EvalContext) -> Result<Outcome> {
    let variable = ops.variable(1)?;
    ops.typed(1, ctx, &[ValueType::Array])?;
    let item = ops.value(2, ctx)?;
    match variable.resolve_mut(&mut ctx.namespace)? {
        Value::Array(arr) => arr.push(item),
        other => {
            return Err(EvalError::InvalidType(format!(
                "verb 'append' requires an array target, not {}",
                other.classify()
            )));
        }
    }
    ctx.last_test = true;
    Ok(Outcome::StatementContinue)
}

fn verb_unique(ops: &Operands, ctx: &mut EvalContext) -> Result<Outcome> {
    let variable = ops.variable(1)?;
    let items = ops.array(2, ctx)?;
    let mut unique: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    store(ctx, &variable, Value::Array(unique))
}

fn verb_split(ops: &Operands, ctx: &mut EvalContext) -> Result<Outcome> {
    let variable = ops.variable(1)?;
    let text = ops.string(2, ctx)?;
    let pattern = ops.string(3, ctx)?;
    let re = compile(ops.verb, &pattern)?;
    let parts = split(&re, &text)
        .into_iter()
        .map(Value::String)
        .collect();
    store(ctx, &variable, Value::Array(parts))
}

/// Regex split that drops trailing empty pieces, and a leading empty piece
/// produced by a zero-width match at the start. Text without any match is
/// returned whole.
fn split(re: &Regex, text: &str) -> Vec<String> {
    if text.is_empty() {
        return vec![String::new()];
    }
    let Some(first) = re.find(text) else {
        return vec![text.to_string()];
    };
    let mut parts: Vec<String> = re.split(text).map(str::to_string).collect();
    if first.start() == 0 && first.is_empty() && parts.first().is_some_and(String::is_empty) {
        parts.remove(0);
    }
    while parts.last().is_some_and(String::is_empty) {
        parts.pop();
    }
    parts
}

fn verb_join(ops: &Operands, ctx: &mut EvalContext) -> Result<Outcome> {
    let variable = ops.variable(1)?;
    let items = ops.array(2, ctx)?;
    let conjunction = ops.string(3, ctx)?;
    let joined = items
        .iter()
        .map(Value::to_text)
        .collect::<Vec<_>>()
        .join(&conjunction);
    store(ctx, &variable, Value::String(joined))
}

fn verb_fold_case(
    ops: &Operands,
    ctx: &mut EvalContext,
    fold: fn(&str) -> String,
) -> Result<Outcome> {
    let variable = ops.variable(1)?;
    let folded = match ops.value(2, ctx)? {
        Value::String(s) => Value::String(fold(&s)),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in &items {
                match item {
                    Value::String(s) => out.push(Value::String(fold(s))),
                    other => {
                        return Err(EvalError::InvalidValue(format!(
                            "verb '{}' failed, array item ({}) is not a string, array={}",
                            ops.verb.name(),
                            other,
                            Value::Array(items.clone())
                        )));
                    }
                }
            }
            Value::Array(out)
        }
        Value::Map(map) => Value::Map(
            map.into_iter()
                .map(|(key, value)| (fold(&key), value))
                .collect::<Map>(),
        ),
        other => return Err(ops.type_error(2, &other, COLLECTION_TYPES)),
    };
    store(ctx, &variable, folded)
}

fn verb_in(ops: &Operands, ctx: &mut EvalContext, negate: bool) -> Result<Outcome> {
    let member = ops.value(1, ctx)?;
    let collection = ops.typed(2, ctx, COLLECTION_TYPES)?;
    let found = match (&collection, &member) {
        (Value::Array(items), _) => items.contains(&member),
        (Value::Map(map), Value::String(key)) => map.contains_key(key.as_str()),
        (Value::String(text), Value::String(sub)) => text.contains(sub.as_str()),
        (other, _) => {
            return Err(EvalError::InvalidType(format!(
                "verb '{}' requires parameter #1 to be a STRING when parameter #2 is a {}",
                ops.verb.name(),
                other.classify()
            )));
        }
    };
    ctx.last_test = found != negate;
    Ok(Outcome::StatementContinue)
}

fn verb_compare(ops: &Operands, ctx: &mut EvalContext) -> Result<Outcome> {
    let left = ops.value(1, ctx)?;
    let op = ops.string(2, ctx)?;
    let right = ops.value(3, ctx)?;

    let kind = left.classify();
    if kind != right.classify() {
        return Err(EvalError::InvalidType(format!(
            "verb 'compare' both items must have the same type left is {} and right is {}",
            kind,
            right.classify()
        )));
    }

    let result = match op.as_str() {
        "==" => left == right,
        "!=" => left != right,
        "<" | ">" | "<=" | ">=" => {
            let ordering = match (&left, &right) {
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
                (Value::Real(a), Value::Real(b)) => a.partial_cmp(b),
                _ => {
                    return Err(EvalError::InvalidRule(format!(
                        "operator {} not supported for type {}",
                        op, kind
                    )));
                }
            };
            match ordering {
                Some(ordering) => match op.as_str() {
                    "<" => ordering.is_lt(),
                    ">" => ordering.is_gt(),
                    "<=" => ordering.is_le(),
                    _ => ordering.is_ge(),
                },
                None => false,
            }
        }
        _ => {
            return Err(EvalError::InvalidRule(format!(
                "verb 'compare' has unknown comparison operator '{}'",
                op
            )));
        }
    };

    ctx.last_test = result;
    Ok(Outcome::StatementContinue)
}

fn verb_regexp(ops: &Operands, ctx: &mut EvalContext) -> Result<Outcome> {
    let text = ops.string(1, ctx)?;
    let pattern = ops.string(2, ctx)?;
    let re = compile(ops.verb, &pattern)?;

    let (matched, groups, named) = match re.captures(&text) {
        Some(caps) => {
            let groups: Vec<Value> = caps
                .iter()
                .map(|m| m.map_or(Value::Null, |m| Value::from(m.as_str())))
                .collect();
            let named = re
                .capture_names()
                .flatten()
                .map(|name| {
                    let value = caps
                        .name(name)
                        .map_or(Value::Null, |m| Value::from(m.as_str()));
                    (name.to_string(), value)
                })
                .collect::<Map>();
            (true, groups, named)
        }
        None => (false, Vec::new(), Map::new()),
    };

    tracing::trace!(matched, groups = groups.len(), named = named.len(), "regexp");
    ctx.namespace.insert(REGEXP_ARRAY, Value::Array(groups));
    ctx.namespace.insert(REGEXP_MAP, Value::Map(named));
    ctx.last_test = matched;
    Ok(Outcome::StatementContinue)
}

fn verb_regexp_replace(ops: &Operands, ctx: &mut EvalContext) -> Result<Outcome> {
    let text = ops.string(2, ctx)?;
    let pattern = ops.string(3, ctx)?;
    let replacement = ops.string(4, ctx)?;
    let re = compile(ops.verb, &pattern)?;
    let replaced = re.replace_all(&text, replacement.as_str()).into_owned();
    let variable = ops.variable(1)?;
    store(ctx, &variable, Value::String(replaced))
}

fn criteria(ops: &Operands, index: usize, ctx: &EvalContext) -> Result<Criteria> {
    let name = ops.string(index, ctx)?;
    Criteria::from_name(&name).ok_or_else(|| {
        EvalError::InvalidRule(format!(
            "verb='{}' unknown {} criteria '{}'",
            ops.verb.name(),
            ops.verb.name(),
            name.to_lowercase()
        ))
    })
}

fn verb_exit(ops: &Operands, ctx: &mut EvalContext) -> Result<Outcome> {
    let status = ops.string(1, ctx)?.to_lowercase();
    let outcome = match status.as_str() {
        "rule_succeeds" => Outcome::RuleSuccess,
        "rule_fails" => Outcome::RuleFail,
        _ => {
            return Err(EvalError::InvalidRule(format!(
                "verb='exit' unknown exit status '{}'",
                status
            )));
        }
    };
    if criteria(ops, 2, ctx)?.holds(ctx.last_test) {
        Ok(outcome)
    } else {
        Ok(Outcome::StatementContinue)
    }
}

fn verb_continue(ops: &Operands, ctx: &mut EvalContext) -> Result<Outcome> {
    if criteria(ops, 1, ctx)?.holds(ctx.last_test) {
        Ok(Outcome::BlockContinue)
    } else {
        Ok(Outcome::StatementContinue)
    }
}
