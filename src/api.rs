//! Server action endpoints and their response envelope.
//!
//! Every console action answers with JSON shaped as `{error}`,
//! `{form_errors}`, `{success}` or a payload. [`parse_response`] turns a body
//! into either the expected payload or a [`WizardError`].

use crate::error::{ServerError, WizardError};
use crate::paths;
use crate::types::{ConfigRequest, ConfigResponse, SavePayload, SaveResponse};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;

pub const ACTION_GET: &str = "host.wizard.get";
pub const ACTION_CREATE: &str = "host.wizard.create";
pub const ACTION_UPDATE: &str = "host.wizard.update";

/// Which save action the final step performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveAction {
    Create,
    Update,
}

impl SaveAction {
    pub fn action(self) -> &'static str {
        match self {
            SaveAction::Create => ACTION_CREATE,
            SaveAction::Update => ACTION_UPDATE,
        }
    }
}

impl ConfigRequest {
    /// Query parameters of the `GET` request, `action` first.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("action", ACTION_GET.to_string()),
            ("templateid", self.templateid.clone()),
        ];
        if let Some(hostid) = &self.hostid {
            query.push(("hostid", hostid.clone()));
        }
        query
    }
}

/// Transport to the console server.
///
/// Implementations perform the HTTP exchange and hand the outcome back;
/// [`parse_response`] is available for decoding raw bodies.
#[async_trait]
pub trait WizardBackend: Send + Sync {
    /// `GET ?action=host.wizard.get&templateid=..[&hostid=..]`.
    async fn fetch_config(&self, request: &ConfigRequest) -> Result<ConfigResponse, WizardError>;

    /// `POST ?action=host.wizard.create|host.wizard.update` with a JSON body.
    async fn save(&self, action: SaveAction, payload: &SavePayload) -> Result<SaveResponse, WizardError>;
}

/// Generic outcome of a popup action.
#[derive(Clone, Debug, PartialEq)]
pub enum ActionResponse {
    Success {
        title: Option<String>,
        messages: Vec<String>,
    },
    Error(ServerError),
    FormErrors(BTreeMap<String, String>),
    /// Any other payload.
    Data(Value),
}

/// Classifies a popup action response body.
pub fn parse_action_response(body: &str) -> Result<ActionResponse, WizardError> {
    let value: Value = serde_json::from_str(body)?;
    let Value::Object(obj) = &value else {
        return Err(WizardError::Decode("response must be a JSON object".to_string()));
    };

    if let Some(error) = obj.get("error") {
        return Ok(ActionResponse::Error(server_error(error)));
    }
    if let Some(form_errors) = obj.get("form_errors") {
        return Ok(ActionResponse::FormErrors(form_errors_map(form_errors)));
    }
    if let Some(success) = obj.get("success") {
        let success: ServerError = serde_json::from_value(success.clone()).unwrap_or(ServerError {
            title: success.as_str().map(str::to_string),
            messages: vec![],
        });
        return Ok(ActionResponse::Success {
            title: success.title,
            messages: success.messages,
        });
    }
    Ok(ActionResponse::Data(value))
}

/// Decodes a wizard response body into `T`, mapping error envelopes.
pub fn parse_response<T: DeserializeOwned>(body: &str) -> Result<T, WizardError> {
    match parse_action_response(body)? {
        ActionResponse::Error(e) => Err(WizardError::Server(e)),
        ActionResponse::FormErrors(errors) => Err(WizardError::FormErrors(errors)),
        ActionResponse::Success { .. } => Err(WizardError::Decode(
            "expected a payload, got a success message".to_string(),
        )),
        ActionResponse::Data(value) => Ok(serde_json::from_value(value)?),
    }
}

fn server_error(value: &Value) -> ServerError {
    match value {
        Value::String(message) => ServerError {
            title: None,
            messages: vec![message.clone()],
        },
        other => serde_json::from_value(other.clone()).unwrap_or_else(|_| ServerError {
            title: None,
            messages: vec![other.to_string()],
        }),
    }
}

/// Form errors keyed by dotted path.
///
/// Keys may be absolute slash paths (`/macros/0/value`) or input names
/// (`macros[0][value]`); messages may be strings, `{message}` objects or
/// lists of either (the first one wins).
fn form_errors_map(value: &Value) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    let Value::Object(obj) = value else {
        return out;
    };
    for (key, message) in obj {
        let path = if key.starts_with('/') {
            key.split('/').filter(|s| !s.is_empty()).collect::<Vec<_>>().join(".")
        } else {
            paths::input_name_to_path(key)
        };
        if let Some(message) = first_message(message) {
            out.insert(path, message);
        }
    }
    out
}

fn first_message(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => obj.get("message").and_then(Value::as_str).map(str::to_string),
        Value::Array(items) => items.iter().find_map(first_message),
        _ => None,
    }
}
