use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::enums::*;

/// Accepts `true`/`false`, `0`/`1` and `"0"`/`"1"`.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Bool(b) => Ok(*b),
        Value::Null => Ok(false),
        Value::Number(n) => Ok(n.as_i64().is_some_and(|n| n != 0)),
        Value::String(s) => Ok(!s.is_empty() && s != "0"),
        other => Err(serde::de::Error::custom(format!(
            "expected a boolean flag, got {}",
            other
        ))),
    }
}

/// Accepts integer ids as numbers or strings.
fn id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected an id, got {}",
            other
        ))),
    }
}

// ─── Templates ───────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub tag: String,
    #[serde(default)]
    pub value: String,
}

/// Template as listed on the template selection step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSummary {
    #[serde(deserialize_with = "id")]
    pub templateid: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub data_collection: DataCollection,
}

/// Option of a list or checkbox macro field.
///
/// List options carry `value`/`text`; the single checkbox option carries
/// `checked`/`unchecked`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroOption {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unchecked: Option<String>,
}

/// Wizard presentation of a template macro.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroConfig {
    #[serde(rename = "type", default)]
    pub field_type: MacroFieldType,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub section_name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "flag")]
    pub required: bool,
    #[serde(default)]
    pub regex: String,
    #[serde(default)]
    pub options: Vec<MacroOption>,
}

impl MacroConfig {
    /// Values a list field accepts, in display order.
    pub fn list_values(&self) -> Vec<&str> {
        self.options
            .iter()
            .filter_map(|o| o.value.as_deref())
            .collect()
    }

    /// `(checked, unchecked)` values of a checkbox field.
    pub fn checkbox_values(&self) -> Option<(&str, &str)> {
        let option = self.options.first()?;
        Some((option.checked.as_deref()?, option.unchecked.as_deref().unwrap_or("")))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateMacro {
    #[serde(rename = "macro")]
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub macro_type: MacroType,
    #[serde(default)]
    pub config: MacroConfig,
}

/// Template as returned by `host.wizard.get`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    #[serde(deserialize_with = "id")]
    pub templateid: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub readme: String,
    #[serde(default)]
    pub data_collection: DataCollection,
    #[serde(default)]
    pub macros: Vec<TemplateMacro>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

// ─── Hosts ───────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostGroup {
    #[serde(deserialize_with = "id")]
    pub groupid: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnmpDetails {
    #[serde(default)]
    pub version: SnmpVersion,
    #[serde(default)]
    pub community: String,
    #[serde(default)]
    pub securityname: String,
    #[serde(default = "default_true", deserialize_with = "flag")]
    pub bulk: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInterface {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interfaceid: Option<String>,
    #[serde(rename = "type")]
    pub interface_type: InterfaceType,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub dns: String,
    #[serde(default, deserialize_with = "flag")]
    pub useip: bool,
    #[serde(default)]
    pub port: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<SnmpDetails>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostMacro {
    #[serde(rename = "macro")]
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(rename = "type", default)]
    pub macro_type: MacroType,
    #[serde(default)]
    pub description: String,
}

/// Existing host as returned by `host.wizard.get`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    #[serde(deserialize_with = "id")]
    pub hostid: String,
    #[serde(rename = "host")]
    pub name: String,
    #[serde(default)]
    pub groups: Vec<HostGroup>,
    #[serde(default)]
    pub interfaces: Vec<HostInterface>,
    #[serde(default)]
    pub macros: Vec<HostMacro>,
    /// Host already has PSK encryption configured towards the agent.
    #[serde(default, deserialize_with = "flag")]
    pub tls_psk_configured: bool,
}

// ─── host.wizard.get ─────────────────────────────────────────────────────────

/// Query of the step-advance fetch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigRequest {
    pub templateid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostid: Option<String>,
}

/// Template and host configuration loaded while advancing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub template: Template,
    #[serde(default)]
    pub host: Option<Host>,
    #[serde(default, deserialize_with = "flag")]
    pub agent_interface_required: bool,
    #[serde(default, deserialize_with = "flag")]
    pub ipmi_interface_required: bool,
    #[serde(default, deserialize_with = "flag")]
    pub jmx_interface_required: bool,
    #[serde(default, deserialize_with = "flag")]
    pub snmp_interface_required: bool,
    #[serde(default, deserialize_with = "flag")]
    pub install_agent_required: bool,
}

impl ConfigResponse {
    pub fn interface_required(&self, interface_type: InterfaceType) -> bool {
        match interface_type {
            InterfaceType::Agent => self.agent_interface_required,
            InterfaceType::Snmp => self.snmp_interface_required,
            InterfaceType::Ipmi => self.ipmi_interface_required,
            InterfaceType::Jmx => self.jmx_interface_required,
        }
    }

    /// Whether PSK material must be generated for the agent.
    pub fn tls_required(&self) -> bool {
        self.install_agent_required
            && !self.host.as_ref().is_some_and(|h| h.tls_psk_configured)
    }
}

// ─── host.wizard.create / host.wizard.update ─────────────────────────────────

/// Group of the saved host: an existing group or a new one to create.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupInput {
    Existing { groupid: String },
    New { new: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroInput {
    #[serde(rename = "macro")]
    pub name: String,
    pub value: String,
    #[serde(rename = "type")]
    pub macro_type: MacroType,
}

/// Body of the final save request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    pub groups: Vec<GroupInput>,
    pub templateid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_psk_identity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_psk: Option<String>,
    pub interfaces: Vec<HostInterface>,
    pub macros: Vec<MacroInput>,
    #[serde(rename = "_csrf_token")]
    pub csrf_token: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveResponse {
    #[serde(deserialize_with = "id")]
    pub hostid: String,
}
