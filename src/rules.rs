//! Declarative validation rules and per-step rule books.
//!
//! Rules are keyed by dotted state path and grouped by the step that owns
//! them. They can be declared in code with the builder methods on
//! [`ValidationRule`] or loaded from YAML with [`parse_rule_book`]:
//!
//! ```text
//! create_host:
//!   host:
//!     type: string
//!     required: true
//!     max_length: 128
//!     regex: "/^[0-9a-zA-Z_. -]+$/"
//!   groups:
//!     type: array
//!     required: "hostid == ''"
//! ```

use crate::enums::Step;
use crate::error::{RuleError, RuleErrorKind};
use crate::paths::{self, Segment};
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

// ─── Patterns ────────────────────────────────────────────────────────────────

/// A compiled regular expression, keeping its source for display.
///
/// Accepts either a bare pattern or the delimited `/pattern/flags` form used by
/// the console; supported flags are `i`, `m`, `s`, `u` and `x`.
#[derive(Clone, Debug)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(source: &str) -> Result<Pattern, RuleError> {
        let (body, flags) = split_delimited(source);
        let mut builder = RegexBuilder::new(body);
        for flag in flags.chars() {
            match flag {
                'i' => builder.case_insensitive(true),
                'm' => builder.multi_line(true),
                's' => builder.dot_matches_new_line(true),
                'u' => builder.unicode(true),
                'x' => builder.ignore_whitespace(true),
                other => {
                    return Err(RuleError {
                        kind: RuleErrorKind::InvalidRegex,
                        message: format!("unsupported regex flag '{}' in {}", other, source),
                        path: None,
                    });
                }
            };
        }
        let regex = builder.build().map_err(|e| RuleError {
            kind: RuleErrorKind::InvalidRegex,
            message: format!("invalid regular expression {}: {}", source, e),
            path: None,
        })?;
        Ok(Pattern {
            source: source.to_string(),
            regex,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

fn split_delimited(source: &str) -> (&str, &str) {
    if source.len() >= 2
        && source.starts_with('/')
        && let Some(end) = source.rfind('/')
        && end > 0
    {
        return (&source[1..end], &source[end + 1..]);
    }
    (source, "")
}

// ─── Requirement ─────────────────────────────────────────────────────────────

/// Context handed to required-ness predicates.
pub struct RuleContext<'a> {
    /// The whole wizard state.
    pub state: &'a Value,
    /// Concrete dotted path of the field being checked.
    pub path: &'a str,
}

impl RuleContext<'_> {
    /// Value of a sibling field, e.g. `useip` next to `interfaces.0.ip`.
    pub fn sibling(&self, name: &str) -> Option<&Value> {
        let parent = match self.path.rfind('.') {
            Some(pos) => &self.path[..pos],
            None => "",
        };
        paths::resolve(self.state, &paths::join_path(parent, name))
    }

    /// Value at an absolute dotted path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        paths::resolve(self.state, path)
    }
}

/// Predicate over the state, used for conditional required-ness and step checks.
#[derive(Clone)]
pub struct Predicate(Arc<dyn Fn(&RuleContext<'_>) -> bool + Send + Sync>);

impl Predicate {
    pub fn new(f: impl Fn(&RuleContext<'_>) -> bool + Send + Sync + 'static) -> Self {
        Predicate(Arc::new(f))
    }

    pub fn test(&self, ctx: &RuleContext<'_>) -> bool {
        (self.0)(ctx)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

/// Whether a field must be non-empty.
#[derive(Clone, Debug, Default)]
pub enum Requirement {
    #[default]
    Never,
    Always,
    /// Required while the predicate holds.
    When(Predicate),
    /// Required while the expression evaluates to `true` against the state.
    Expression(String),
}

// ─── ValidationRule ──────────────────────────────────────────────────────────

/// Value type a rule expects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RuleKind {
    #[default]
    Any,
    String,
    Integer,
    Boolean,
    Object,
    Array,
}

impl RuleKind {
    fn parse(s: &str) -> Option<RuleKind> {
        match s {
            "any" => Some(RuleKind::Any),
            "string" => Some(RuleKind::String),
            "integer" => Some(RuleKind::Integer),
            "boolean" => Some(RuleKind::Boolean),
            "object" => Some(RuleKind::Object),
            "array" => Some(RuleKind::Array),
            _ => None,
        }
    }
}

/// Check names that accept a custom message via [`ValidationRule::message`].
pub mod check {
    pub const REQUIRED: &str = "required";
    pub const TYPE: &str = "type";
    pub const LENGTH: &str = "length";
    pub const REGEX: &str = "regex";
    pub const MIN: &str = "min";
    pub const MAX: &str = "max";
}

/// A declarative validation rule for one path.
#[derive(Clone, Debug, Default)]
pub struct ValidationRule {
    pub kind: RuleKind,
    pub required: Requirement,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub regex: Option<Pattern>,
    /// Nested rules of an object rule, in declaration order.
    pub fields: Vec<(String, ValidationRule)>,
    /// Rule applied to each element of an array rule.
    pub items: Option<Box<ValidationRule>>,
    /// The error state of this path mirrors the field at `base_path`.
    pub base_path: Option<String>,
    pub messages: BTreeMap<String, String>,
}

impl ValidationRule {
    pub fn of(kind: RuleKind) -> Self {
        ValidationRule {
            kind,
            ..Default::default()
        }
    }

    pub fn any() -> Self {
        Self::of(RuleKind::Any)
    }

    pub fn string() -> Self {
        Self::of(RuleKind::String)
    }

    pub fn integer() -> Self {
        Self::of(RuleKind::Integer)
    }

    pub fn boolean() -> Self {
        Self::of(RuleKind::Boolean)
    }

    pub fn object(fields: Vec<(&str, ValidationRule)>) -> Self {
        ValidationRule {
            kind: RuleKind::Object,
            fields: fields
                .into_iter()
                .map(|(name, rule)| (name.to_string(), rule))
                .collect(),
            ..Default::default()
        }
    }

    pub fn array(items: ValidationRule) -> Self {
        ValidationRule {
            kind: RuleKind::Array,
            items: Some(Box::new(items)),
            ..Default::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = Requirement::Always;
        self
    }

    pub fn required_when(mut self, f: impl Fn(&RuleContext<'_>) -> bool + Send + Sync + 'static) -> Self {
        self.required = Requirement::When(Predicate::new(f));
        self
    }

    pub fn required_if(mut self, expression: impl Into<String>) -> Self {
        self.required = Requirement::Expression(expression.into());
        self
    }

    pub fn min_length(mut self, n: usize) -> Self {
        self.min_length = Some(n);
        self
    }

    pub fn max_length(mut self, n: usize) -> Self {
        self.max_length = Some(n);
        self
    }

    pub fn min(mut self, n: i64) -> Self {
        self.min = Some(n);
        self
    }

    pub fn max(mut self, n: i64) -> Self {
        self.max = Some(n);
        self
    }

    pub fn pattern(mut self, pattern: Pattern) -> Self {
        self.regex = Some(pattern);
        self
    }

    pub fn alias_of(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    pub fn message(mut self, check: &str, text: impl Into<String>) -> Self {
        self.messages.insert(check.to_string(), text.into());
        self
    }

    /// Custom message for `check`, or `default`.
    pub fn message_for(&self, check: &str, default: &str) -> String {
        self.messages
            .get(check)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    /// Descends into nested rules following the remaining path segments.
    fn descend(&self, segments: &[Segment]) -> Option<&ValidationRule> {
        let Some((first, rest)) = segments.split_first() else {
            return Some(self);
        };
        match (self.kind, first) {
            (RuleKind::Array, Segment::Index(_)) => self.items.as_deref()?.descend(rest),
            (RuleKind::Object, Segment::Key(key)) => self
                .fields
                .iter()
                .find(|(name, _)| name == key)
                .and_then(|(_, rule)| rule.descend(rest)),
            _ => None,
        }
    }
}

// ─── Step checks ─────────────────────────────────────────────────────────────

/// A composite check run by `validate_step` in addition to per-path rules.
///
/// Fails, recording `message` at `path`, when the predicate returns `false`.
#[derive(Clone, Debug)]
pub struct StepCheck {
    pub path: String,
    pub message: String,
    pub predicate: Predicate,
}

impl StepCheck {
    pub fn new(
        path: impl Into<String>,
        message: impl Into<String>,
        f: impl Fn(&RuleContext<'_>) -> bool + Send + Sync + 'static,
    ) -> Self {
        StepCheck {
            path: path.into(),
            message: message.into(),
            predicate: Predicate::new(f),
        }
    }
}

// ─── RuleBook ────────────────────────────────────────────────────────────────

/// A rule found for a concrete path.
#[derive(Clone, Copy, Debug)]
pub struct ResolvedRule<'a> {
    pub step: Step,
    /// The path the rule was declared under.
    pub declared_path: &'a str,
    pub rule: &'a ValidationRule,
}

/// Validation rules of every step.
#[derive(Clone, Debug, Default)]
pub struct RuleBook {
    rules: BTreeMap<Step, Vec<(String, ValidationRule)>>,
    checks: BTreeMap<Step, Vec<StepCheck>>,
}

impl RuleBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares (or replaces) the rule for `path` in `step`.
    pub fn add(&mut self, step: Step, path: impl Into<String>, rule: ValidationRule) -> &mut Self {
        let path = path.into();
        let rules = self.rules.entry(step).or_default();
        match rules.iter_mut().find(|(p, _)| *p == path) {
            Some(slot) => slot.1 = rule,
            None => rules.push((path, rule)),
        }
        self
    }

    pub fn add_check(&mut self, step: Step, check: StepCheck) -> &mut Self {
        self.checks.entry(step).or_default().push(check);
        self
    }

    /// Removes the rules of `step` whose path is `prefix` or lies below it.
    pub fn remove_prefix(&mut self, step: Step, prefix: &str) -> Vec<String> {
        let Some(rules) = self.rules.get_mut(&step) else {
            return vec![];
        };
        let nested = format!("{}.", prefix);
        let mut removed = Vec::new();
        rules.retain(|(path, _)| {
            let hit = path == prefix || path.starts_with(&nested);
            if hit {
                removed.push(path.clone());
            }
            !hit
        });
        removed
    }

    pub fn rules_for(&self, step: Step) -> &[(String, ValidationRule)] {
        self.rules.get(&step).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn checks_for(&self, step: Step) -> &[StepCheck] {
        self.checks.get(&step).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn steps(&self) -> impl Iterator<Item = Step> + '_ {
        self.rules.keys().chain(self.checks.keys()).copied()
    }

    /// Merges `other` into this book; rules of `other` win on conflicts.
    pub fn extend(&mut self, other: RuleBook) {
        for (step, rules) in other.rules {
            for (path, rule) in rules {
                self.add(step, path, rule);
            }
        }
        for (step, checks) in other.checks {
            self.checks.entry(step).or_default().extend(checks);
        }
    }

    /// Finds the rule for a concrete path across all steps.
    ///
    /// An exact declaration wins; otherwise the longest declared prefix is
    /// followed through nested object and array rules.
    pub fn resolve(&self, path: &str) -> Option<ResolvedRule<'_>> {
        let mut best: Option<(usize, ResolvedRule<'_>)> = None;

        for (step, rules) in &self.rules {
            for (declared, rule) in rules {
                if declared == path {
                    return Some(ResolvedRule {
                        step: *step,
                        declared_path: declared,
                        rule,
                    });
                }
                let Some(rest) = path
                    .strip_prefix(declared.as_str())
                    .and_then(|r| r.strip_prefix('.'))
                else {
                    continue;
                };
                if best.as_ref().is_some_and(|(len, _)| *len >= declared.len()) {
                    continue;
                }
                if let Some(nested) = rule.descend(&paths::split_path(rest)) {
                    best = Some((
                        declared.len(),
                        ResolvedRule {
                            step: *step,
                            declared_path: declared,
                            rule: nested,
                        },
                    ));
                }
            }
        }

        best.map(|(_, resolved)| resolved)
    }
}

// ─── YAML loading ────────────────────────────────────────────────────────────

/// Parses a YAML rule book: a mapping of step id → mapping of path → rule.
pub fn parse_rule_book(input: &str) -> Result<RuleBook, RuleError> {
    if input.trim().is_empty() {
        return Ok(RuleBook::new());
    }

    let value: Value = serde_saphyr::from_str(input).map_err(|e| RuleError {
        kind: RuleErrorKind::Syntax,
        message: e.to_string(),
        path: None,
    })?;

    let Value::Object(steps) = value else {
        return Err(type_error("", "rule book root must be a mapping"));
    };

    let mut book = RuleBook::new();
    for (step_name, rules) in steps {
        let step = Step::parse(&step_name).ok_or_else(|| RuleError {
            kind: RuleErrorKind::UnknownStep,
            message: format!("unknown step: {}", step_name),
            path: Some(step_name.clone()),
        })?;
        let Value::Object(rules) = rules else {
            return Err(type_error(&step_name, "step rules must be a mapping"));
        };
        for (path, spec) in rules {
            let location = format!("{}.{}", step_name, path);
            let rule = rule_from_value(&spec, &location)?;
            book.add(step, path, rule);
        }
    }
    Ok(book)
}

fn type_error(path: &str, message: &str) -> RuleError {
    RuleError {
        kind: RuleErrorKind::TypeMismatch,
        message: message.to_string(),
        path: (!path.is_empty()).then(|| path.to_string()),
    }
}

fn rule_from_value(spec: &Value, location: &str) -> Result<ValidationRule, RuleError> {
    let Value::Object(obj) = spec else {
        return Err(type_error(location, "rule must be a mapping"));
    };

    let mut rule = ValidationRule::default();

    for (key, value) in obj {
        let at = format!("{}.{}", location, key);
        match key.as_str() {
            "type" => {
                rule.kind = value
                    .as_str()
                    .and_then(RuleKind::parse)
                    .ok_or_else(|| type_error(&at, "unknown rule type"))?;
            }
            "required" => {
                rule.required = match value {
                    Value::Bool(true) => Requirement::Always,
                    Value::Bool(false) | Value::Null => Requirement::Never,
                    Value::String(expr) => Requirement::Expression(expr.clone()),
                    _ => return Err(type_error(&at, "required must be a boolean or an expression")),
                };
            }
            "min_length" => rule.min_length = Some(as_usize(value, &at)?),
            "max_length" => rule.max_length = Some(as_usize(value, &at)?),
            "min" => rule.min = Some(as_i64(value, &at)?),
            "max" => rule.max = Some(as_i64(value, &at)?),
            "regex" => {
                let source = value
                    .as_str()
                    .ok_or_else(|| type_error(&at, "regex must be a string"))?;
                rule.regex = Some(Pattern::new(source).map_err(|mut e| {
                    e.path = Some(at.clone());
                    e
                })?);
            }
            "base_path" => {
                rule.base_path = Some(
                    value
                        .as_str()
                        .ok_or_else(|| type_error(&at, "base_path must be a string"))?
                        .to_string(),
                );
            }
            "fields" => {
                let Value::Object(fields) = value else {
                    return Err(type_error(&at, "fields must be a mapping"));
                };
                for (name, field) in fields {
                    let field_rule = rule_from_value(field, &format!("{}.{}", at, name))?;
                    rule.fields.push((name.clone(), field_rule));
                }
            }
            "items" => rule.items = Some(Box::new(rule_from_value(value, &at)?)),
            "messages" => {
                let Value::Object(messages) = value else {
                    return Err(type_error(&at, "messages must be a mapping"));
                };
                for (check, text) in messages {
                    let text = text
                        .as_str()
                        .ok_or_else(|| type_error(&at, "message must be a string"))?;
                    rule.messages.insert(check.clone(), text.to_string());
                }
            }
            other => {
                return Err(type_error(&at, &format!("unknown rule field: {}", other)));
            }
        }
    }

    match rule.kind {
        RuleKind::Object if rule.items.is_some() => {
            Err(type_error(location, "object rules take fields, not items"))
        }
        RuleKind::Array if !rule.fields.is_empty() => {
            Err(type_error(location, "array rules take items, not fields"))
        }
        _ => Ok(rule),
    }
}

fn as_usize(value: &Value, at: &str) -> Result<usize, RuleError> {
    value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| type_error(at, "expected a non-negative integer"))
}

fn as_i64(value: &Value, at: &str) -> Result<i64, RuleError> {
    value
        .as_i64()
        .ok_or_else(|| type_error(at, "expected an integer"))
}
