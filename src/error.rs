use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Error kind for rule-book parse failures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleErrorKind {
    Syntax,
    TypeMismatch,
    UnknownStep,
    InvalidRegex,
}

/// Produced by `parse_rule_book` when a rule declaration is malformed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleError {
    pub kind: RuleErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {}", path, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for RuleError {}

/// Business error reported by the server as `{error: {title, messages}}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub messages: Vec<String>,
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.title {
            Some(title) if self.messages.is_empty() => write!(f, "{}", title),
            Some(title) => write!(f, "{}: {}", title, self.messages.join(" ")),
            None => write!(f, "{}", self.messages.join(" ")),
        }
    }
}

impl std::error::Error for ServerError {}

/// Errors surfaced by wizard side effects.
///
/// Field validation never produces one of these; it is reported as data
/// through the validation engine instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WizardError {
    /// The request never produced a usable response.
    Transport(String),
    /// The server answered with `{error}`.
    Server(ServerError),
    /// The server answered with per-field `{form_errors}`, keyed by dotted path.
    FormErrors(BTreeMap<String, String>),
    /// The response body did not have the expected shape.
    Decode(String),
    /// Local failure unrelated to the server, e.g. no entropy for a PSK.
    Internal(String),
    /// A rule book could not be loaded.
    Rules(RuleError),
    /// Another advance is already in flight.
    Busy,
    /// The wizard was closed.
    Closed,
}

impl WizardError {
    /// Title and message lines as shown in the dismissible message box.
    pub fn message_box(&self) -> (String, Vec<String>) {
        match self {
            WizardError::Server(e) => (
                e.title.clone().unwrap_or_else(|| "Unexpected server error.".to_string()),
                e.messages.clone(),
            ),
            WizardError::FormErrors(errors) => (
                "Cannot save host.".to_string(),
                errors.values().cloned().collect(),
            ),
            WizardError::Transport(message)
            | WizardError::Decode(message)
            | WizardError::Internal(message) => {
                ("Unexpected server error.".to_string(), vec![message.clone()])
            }
            WizardError::Rules(e) => ("Invalid validation rules.".to_string(), vec![e.to_string()]),
            WizardError::Busy => (
                "Request in progress.".to_string(),
                vec!["Please wait for the current request to finish.".to_string()],
            ),
            WizardError::Closed => ("Wizard closed.".to_string(), vec![]),
        }
    }
}

impl fmt::Display for WizardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WizardError::Transport(e) => write!(f, "Transport error: {}", e),
            WizardError::Server(e) => write!(f, "Server error: {}", e),
            WizardError::FormErrors(errors) => {
                write!(f, "Form errors:")?;
                for (path, message) in errors {
                    write!(f, " {}: {}", path, message)?;
                }
                Ok(())
            }
            WizardError::Decode(e) => write!(f, "Decode error: {}", e),
            WizardError::Internal(e) => write!(f, "Internal error: {}", e),
            WizardError::Rules(e) => write!(f, "Rule error: {}", e),
            WizardError::Busy => write!(f, "another request is in flight"),
            WizardError::Closed => write!(f, "wizard is closed"),
        }
    }
}

impl std::error::Error for WizardError {}

impl From<ServerError> for WizardError {
    fn from(e: ServerError) -> Self {
        WizardError::Server(e)
    }
}

impl From<RuleError> for WizardError {
    fn from(e: RuleError) -> Self {
        WizardError::Rules(e)
    }
}

impl From<serde_json::Error> for WizardError {
    fn from(e: serde_json::Error) -> Self {
        WizardError::Decode(e.to_string())
    }
}
