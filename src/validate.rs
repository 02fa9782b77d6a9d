//! Validation engine: evaluates rule books against the wizard state.
//!
//! Rules of a step only take part in error tracking once the step has been
//! activated, which happens on the first attempt to move forward from it.
//! Field validation never fails with an `Err`; it reports messages as data.

use crate::enums::Step;
use crate::paths::{self, is_empty_value};
use crate::rules::{RuleBook, RuleContext, RuleKind, Requirement, ValidationRule, check};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

pub const MSG_REQUIRED: &str = "This field cannot be empty.";
pub const MSG_NOT_STRING: &str = "This value is not a valid string.";
pub const MSG_TOO_LONG: &str = "This value is too long.";
pub const MSG_TOO_SHORT: &str = "This value is too short.";
pub const MSG_PATTERN: &str = "This value does not match pattern.";
pub const MSG_NOT_INTEGER: &str = "This value is not a valid integer.";
pub const MSG_NOT_BOOLEAN: &str = "This value is not a valid boolean.";
pub const MSG_NOT_OBJECT: &str = "An object is expected.";
pub const MSG_NOT_ARRAY: &str = "An array is expected.";

// ─── ConditionEvaluator ──────────────────────────────────────────────────────

/// Extension point for expression-based required-ness.
///
/// See [`DefaultConditionEvaluator`] (requires `cel-eval` feature).
pub trait ConditionEvaluator: Send + Sync {
    /// Evaluates `expression` with each top-level state key bound as a variable.
    fn evaluate(&self, expression: &str, state: &Value) -> Result<bool, String>;
}

/// Default evaluator backed by the `cel` crate.
///
/// Missing keys and undeclared references evaluate to `false`.
#[cfg(feature = "cel-eval")]
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultConditionEvaluator;

#[cfg(feature = "cel-eval")]
impl ConditionEvaluator for DefaultConditionEvaluator {
    fn evaluate(&self, expression: &str, state: &Value) -> Result<bool, String> {
        let program =
            cel::Program::compile(expression).map_err(|e| format!("CEL compile error: {}", e))?;

        let mut ctx = cel::Context::default();
        if let Value::Object(map) = state {
            for (key, value) in map {
                ctx.add_variable_from_value(key.as_str(), json_to_cel(value));
            }
        }

        match program.execute(&ctx) {
            Ok(cel::Value::Bool(b)) => Ok(b),
            Ok(other) => Err(format!("expression did not produce a boolean: {:?}", other)),
            Err(cel::ExecutionError::NoSuchKey(_)) => Ok(false),
            Err(cel::ExecutionError::UndeclaredReference(_)) => Ok(false),
            Err(e) => Err(format!("CEL execution error: {}", e)),
        }
    }
}

#[cfg(feature = "cel-eval")]
fn json_to_cel(value: &Value) -> cel::Value {
    use std::collections::HashMap;
    use std::sync::Arc;

    match value {
        Value::Null => cel::Value::Null,
        Value::Bool(b) => cel::Value::Bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                cel::Value::Int(i)
            } else if let Some(u) = n.as_u64() {
                cel::Value::UInt(u)
            } else if let Some(f) = n.as_f64() {
                cel::Value::Float(f)
            } else {
                cel::Value::Null
            }
        }
        Value::String(s) => cel::Value::String(Arc::new(s.clone())),
        Value::Array(arr) => cel::Value::List(Arc::new(arr.iter().map(json_to_cel).collect())),
        Value::Object(map) => {
            let entries: HashMap<String, cel::Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), json_to_cel(v)))
                .collect();
            entries.into()
        }
    }
}

// ─── ValidationEngine ────────────────────────────────────────────────────────

/// Tracks path-keyed error messages for the rules of activated steps.
pub struct ValidationEngine {
    book: RuleBook,
    active: BTreeSet<Step>,
    errors: BTreeMap<String, String>,
    evaluator: Option<Box<dyn ConditionEvaluator>>,
}

impl std::fmt::Debug for ValidationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationEngine")
            .field("active", &self.active)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

impl ValidationEngine {
    /// Creates an engine with the default expression evaluator, if compiled in.
    pub fn new(book: RuleBook) -> Self {
        #[cfg(feature = "cel-eval")]
        let evaluator: Option<Box<dyn ConditionEvaluator>> = Some(Box::new(DefaultConditionEvaluator));
        #[cfg(not(feature = "cel-eval"))]
        let evaluator: Option<Box<dyn ConditionEvaluator>> = None;

        ValidationEngine {
            book,
            active: BTreeSet::new(),
            errors: BTreeMap::new(),
            evaluator,
        }
    }

    pub fn with_evaluator(mut self, evaluator: Box<dyn ConditionEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn rules(&self) -> &RuleBook {
        &self.book
    }

    pub fn rules_mut(&mut self) -> &mut RuleBook {
        &mut self.book
    }

    /// Marks the rules of `step` as active. Idempotent.
    pub fn activate_step(&mut self, step: Step) {
        if self.active.insert(step) {
            debug!(%step, "validation activated");
        }
    }

    /// Deactivates the rules of `step` and clears their errors.
    pub fn deactivate_step(&mut self, step: Step) {
        if !self.active.remove(&step) {
            return;
        }
        let paths: Vec<String> = self
            .book
            .rules_for(step)
            .iter()
            .map(|(path, _)| path.clone())
            .chain(self.book.checks_for(step).iter().map(|c| c.path.clone()))
            .collect();
        for path in paths {
            self.clear_prefix(&path);
        }
        debug!(%step, "validation deactivated");
    }

    pub fn is_active(&self, step: Step) -> bool {
        self.active.contains(&step)
    }

    /// Validates a single field and returns its first failing message.
    ///
    /// The rule is looked up across every step. The outcome is recorded in the
    /// error map only when the owning step is active. A path nested below a
    /// declared rule also re-records the declared rule and the rows between.
    pub fn validate_field(&mut self, path: &str, state: &Value) -> Option<String> {
        let resolved = self.book.resolve(path)?;
        let step = resolved.step;
        let declared = resolved.declared_path.to_string();

        let mut outcomes = Vec::new();
        let error = self.evaluate(resolved.rule, path, state, &mut outcomes);

        if self.active.contains(&step) {
            for (nested_path, nested_error) in outcomes {
                self.record(nested_path, nested_error);
            }
            self.record(path.to_string(), error.clone());
            if declared != path {
                self.revalidate_declared(&declared, state);
            }
        }
        error
    }

    fn revalidate_declared(&mut self, declared: &str, state: &Value) {
        let Some(resolved) = self.book.resolve(declared) else {
            return;
        };
        let mut outcomes = Vec::new();
        let error = self.evaluate(resolved.rule, declared, state, &mut outcomes);
        for (nested_path, nested_error) in outcomes {
            self.record(nested_path, nested_error);
        }
        self.record(declared.to_string(), error);
    }

    /// Validates every path declared for `step` plus its composite checks.
    ///
    /// Returns `true` when nothing failed.
    pub fn validate_step(&mut self, step: Step, state: &Value) -> bool {
        let paths: Vec<String> = self
            .book
            .rules_for(step)
            .iter()
            .map(|(path, _)| path.clone())
            .collect();

        let mut valid = true;
        for path in &paths {
            if self.validate_field(path, state).is_some() {
                valid = false;
            }
        }

        if !self.run_checks(step, state) {
            valid = false;
        }
        valid
    }

    /// Runs the composite checks of `step` only. Returns `true` when all pass.
    pub fn run_checks(&mut self, step: Step, state: &Value) -> bool {
        let outcomes: Vec<(String, Option<String>)> = self
            .book
            .checks_for(step)
            .iter()
            .map(|c| {
                let passed = c.predicate.test(&RuleContext {
                    state,
                    path: &c.path,
                });
                (c.path.clone(), (!passed).then(|| c.message.clone()))
            })
            .collect();

        let valid = outcomes.iter().all(|(_, error)| error.is_none());
        if self.active.contains(&step) {
            for (path, error) in outcomes {
                self.record(path, error);
            }
        }
        valid
    }

    /// Whether any active rule of `step` has an error, including alias errors.
    pub fn has_errors(&self, step: Step) -> bool {
        if !self.active.contains(&step) {
            return false;
        }
        let rule_errors = self.book.rules_for(step).iter().any(|(path, rule)| {
            self.errors.contains_key(path)
                || rule
                    .base_path
                    .as_ref()
                    .is_some_and(|base| self.errors.contains_key(base))
        });
        rule_errors
            || self
                .book
                .checks_for(step)
                .iter()
                .any(|c| self.errors.contains_key(&c.path))
    }

    /// Whether the rule behind `path` currently requires a value.
    pub fn field_required(&self, path: &str, state: &Value) -> bool {
        self.book
            .resolve(path)
            .is_some_and(|resolved| self.is_required(resolved.rule, path, state))
    }

    pub fn error(&self, path: &str) -> Option<&str> {
        self.errors.get(path).map(String::as_str)
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    /// Records errors reported by the server, keyed by dotted path.
    pub fn set_external_errors(&mut self, errors: BTreeMap<String, String>) {
        self.errors.extend(errors);
    }

    pub fn clear_error(&mut self, path: &str) {
        self.errors.remove(path);
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }

    fn record(&mut self, path: String, error: Option<String>) {
        match error {
            Some(message) => {
                self.errors.insert(path, message);
            }
            None => {
                self.errors.remove(&path);
            }
        }
    }

    /// Clears the error at `path` and every error nested below it.
    pub fn clear_prefix(&mut self, path: &str) {
        let nested = format!("{}.", path);
        self.errors
            .retain(|p, _| p != path && !p.starts_with(&nested));
    }

    fn is_required(&self, rule: &ValidationRule, path: &str, state: &Value) -> bool {
        match &rule.required {
            Requirement::Never => false,
            Requirement::Always => true,
            Requirement::When(predicate) => predicate.test(&RuleContext { state, path }),
            Requirement::Expression(expr) => match &self.evaluator {
                Some(evaluator) => evaluator.evaluate(expr, state).unwrap_or_else(|e| {
                    warn!(path, expression = %expr, error = %e, "required expression failed");
                    true
                }),
                None => true,
            },
        }
    }

    /// Evaluates `rule` at `path`. Results of nested rules are pushed to
    /// `outcomes`; the first failure anywhere is returned.
    fn evaluate(
        &self,
        rule: &ValidationRule,
        path: &str,
        state: &Value,
        outcomes: &mut Vec<(String, Option<String>)>,
    ) -> Option<String> {
        // Not rendered yet: nothing to check.
        let value = paths::resolve(state, path)?;

        if is_empty_value(value) {
            return self
                .is_required(rule, path, state)
                .then(|| rule.message_for(check::REQUIRED, MSG_REQUIRED));
        }

        match rule.kind {
            RuleKind::Any => None,
            RuleKind::String => check_string(rule, value),
            RuleKind::Integer => check_integer(rule, value),
            RuleKind::Boolean => match value {
                Value::Bool(_) => None,
                Value::String(s) if s == "0" || s == "1" => None,
                Value::Number(n) if n.as_i64().is_some_and(|n| n == 0 || n == 1) => None,
                _ => Some(rule.message_for(check::TYPE, MSG_NOT_BOOLEAN)),
            },
            RuleKind::Object => {
                if !value.is_object() {
                    return Some(rule.message_for(check::TYPE, MSG_NOT_OBJECT));
                }
                let mut first = None;
                for (name, field) in &rule.fields {
                    let field_path = paths::join_path(path, name);
                    let error = self.evaluate(field, &field_path, state, outcomes);
                    outcomes.push((field_path, error.clone()));
                    if first.is_none() {
                        first = error;
                    }
                }
                first
            }
            RuleKind::Array => {
                let Value::Array(items) = value else {
                    return Some(rule.message_for(check::TYPE, MSG_NOT_ARRAY));
                };
                if let Some(min) = rule.min_length
                    && items.len() < min
                {
                    return Some(rule.message_for(check::LENGTH, MSG_TOO_SHORT));
                }
                if let Some(max) = rule.max_length
                    && items.len() > max
                {
                    return Some(rule.message_for(check::LENGTH, MSG_TOO_LONG));
                }
                let item_rule = rule.items.as_deref()?;
                let mut first = None;
                for i in 0..items.len() {
                    let item_path = paths::join_path(path, &i.to_string());
                    let error = self.evaluate(item_rule, &item_path, state, outcomes);
                    outcomes.push((item_path, error.clone()));
                    if first.is_none() {
                        first = error;
                    }
                }
                first
            }
        }
    }
}

fn check_string(rule: &ValidationRule, value: &Value) -> Option<String> {
    let Value::String(s) = value else {
        return Some(rule.message_for(check::TYPE, MSG_NOT_STRING));
    };
    let len = s.chars().count();
    if let Some(min) = rule.min_length
        && len < min
    {
        return Some(rule.message_for(check::LENGTH, MSG_TOO_SHORT));
    }
    if let Some(max) = rule.max_length
        && len > max
    {
        return Some(rule.message_for(check::LENGTH, MSG_TOO_LONG));
    }
    if let Some(pattern) = &rule.regex
        && !pattern.is_match(s)
    {
        return Some(rule.message_for(check::REGEX, MSG_PATTERN));
    }
    None
}

fn check_integer(rule: &ValidationRule, value: &Value) -> Option<String> {
    let n = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    let Some(n) = n else {
        return Some(rule.message_for(check::TYPE, MSG_NOT_INTEGER));
    };
    if let Some(min) = rule.min
        && n < min
    {
        return Some(rule.message_for(
            check::MIN,
            &format!("This value must be no less than \"{}\".", min),
        ));
    }
    if let Some(max) = rule.max
        && n > max
    {
        return Some(rule.message_for(
            check::MAX,
            &format!("This value must be no greater than \"{}\".", max),
        ));
    }
    None
}
