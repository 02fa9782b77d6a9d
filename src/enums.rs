//! Closed enumerations used throughout the wizard.
//!
//! Integer-coded enums mirror the console's numeric constants on the wire and
//! are converted through `TryFrom<i64>` so unknown codes fail deserialization.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wizard step identifier.
///
/// Variants are declared in display order; the active subset is computed by
/// [`crate::sequencer::compute_queue`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Welcome,
    SelectTemplate,
    CreateHost,
    InstallAgent,
    #[serde(rename = "add_host_interface")]
    AddInterface,
    Readme,
    ConfigureHost,
    #[serde(rename = "configuration_finish")]
    Finish,
    Complete,
}

impl Step {
    pub const ALL: [Step; 9] = [
        Step::Welcome,
        Step::SelectTemplate,
        Step::CreateHost,
        Step::InstallAgent,
        Step::AddInterface,
        Step::Readme,
        Step::ConfigureHost,
        Step::Finish,
        Step::Complete,
    ];

    /// Stable snake_case identifier, as used in rule books.
    pub fn as_str(self) -> &'static str {
        match self {
            Step::Welcome => "welcome",
            Step::SelectTemplate => "select_template",
            Step::CreateHost => "create_host",
            Step::InstallAgent => "install_agent",
            Step::AddInterface => "add_host_interface",
            Step::Readme => "readme",
            Step::ConfigureHost => "configure_host",
            Step::Finish => "configuration_finish",
            Step::Complete => "complete",
        }
    }

    pub fn parse(s: &str) -> Option<Step> {
        Step::ALL.into_iter().find(|step| step.as_str() == s)
    }

    pub fn title(self) -> &'static str {
        match self {
            Step::Welcome => "Welcome to the Host Wizard",
            Step::SelectTemplate => "Select a template",
            Step::CreateHost => "Create or select a host",
            Step::InstallAgent => "Install Zabbix agent",
            Step::AddInterface => "Add host interface",
            Step::Readme => "Template readme",
            Step::ConfigureHost => "Configure host",
            Step::Finish => "Configuration finished",
            Step::Complete => "Host created",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host interface type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum InterfaceType {
    Agent,
    Snmp,
    Ipmi,
    Jmx,
}

impl InterfaceType {
    pub const ALL: [InterfaceType; 4] = [
        InterfaceType::Agent,
        InterfaceType::Snmp,
        InterfaceType::Ipmi,
        InterfaceType::Jmx,
    ];

    pub fn code(self) -> i64 {
        match self {
            InterfaceType::Agent => 1,
            InterfaceType::Snmp => 2,
            InterfaceType::Ipmi => 3,
            InterfaceType::Jmx => 4,
        }
    }

    pub fn default_port(self) -> &'static str {
        match self {
            InterfaceType::Agent => "10050",
            InterfaceType::Snmp => "161",
            InterfaceType::Ipmi => "623",
            InterfaceType::Jmx => "12345",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            InterfaceType::Agent => "Agent",
            InterfaceType::Snmp => "SNMP",
            InterfaceType::Ipmi => "IPMI",
            InterfaceType::Jmx => "JMX",
        }
    }
}

impl TryFrom<i64> for InterfaceType {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        InterfaceType::ALL
            .into_iter()
            .find(|t| t.code() == code)
            .ok_or_else(|| format!("unknown interface type: {}", code))
    }
}

impl From<InterfaceType> for i64 {
    fn from(t: InterfaceType) -> i64 {
        t.code()
    }
}

/// How a template collects data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum DataCollection {
    #[default]
    AgentBased,
    Agentless,
}

impl TryFrom<i64> for DataCollection {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(DataCollection::AgentBased),
            1 => Ok(DataCollection::Agentless),
            other => Err(format!("unknown data collection mode: {}", other)),
        }
    }
}

impl From<DataCollection> for i64 {
    fn from(d: DataCollection) -> i64 {
        match d {
            DataCollection::AgentBased => 0,
            DataCollection::Agentless => 1,
        }
    }
}

/// User macro value type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum MacroType {
    #[default]
    Text,
    Secret,
    Vault,
}

impl TryFrom<i64> for MacroType {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(MacroType::Text),
            1 => Ok(MacroType::Secret),
            2 => Ok(MacroType::Vault),
            other => Err(format!("unknown macro type: {}", other)),
        }
    }
}

impl From<MacroType> for i64 {
    fn from(t: MacroType) -> i64 {
        match t {
            MacroType::Text => 0,
            MacroType::Secret => 1,
            MacroType::Vault => 2,
        }
    }
}

/// Wizard field type declared in a template macro's `config`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum MacroFieldType {
    /// Not shown in the wizard.
    #[default]
    NoConf,
    Text,
    List,
    Checkbox,
}

impl TryFrom<i64> for MacroFieldType {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(MacroFieldType::NoConf),
            1 => Ok(MacroFieldType::Text),
            2 => Ok(MacroFieldType::List),
            3 => Ok(MacroFieldType::Checkbox),
            other => Err(format!("unknown wizard field type: {}", other)),
        }
    }
}

impl From<MacroFieldType> for i64 {
    fn from(t: MacroFieldType) -> i64 {
        match t {
            MacroFieldType::NoConf => 0,
            MacroFieldType::Text => 1,
            MacroFieldType::List => 2,
            MacroFieldType::Checkbox => 3,
        }
    }
}

/// SNMP protocol version of an SNMP interface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum SnmpVersion {
    V1,
    #[default]
    V2c,
    V3,
}

impl TryFrom<i64> for SnmpVersion {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(SnmpVersion::V1),
            2 => Ok(SnmpVersion::V2c),
            3 => Ok(SnmpVersion::V3),
            other => Err(format!("unknown SNMP version: {}", other)),
        }
    }
}

impl From<SnmpVersion> for i64 {
    fn from(v: SnmpVersion) -> i64 {
        match v {
            SnmpVersion::V1 => 1,
            SnmpVersion::V2c => 2,
            SnmpVersion::V3 => 3,
        }
    }
}

/// Operating system the agent install command is generated for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitoringOs {
    #[default]
    Linux,
    Windows,
    Other,
}

impl MonitoringOs {
    pub const ALL: [MonitoringOs; 3] = [MonitoringOs::Linux, MonitoringOs::Windows, MonitoringOs::Other];

    pub fn as_str(self) -> &'static str {
        match self {
            MonitoringOs::Linux => "linux",
            MonitoringOs::Windows => "windows",
            MonitoringOs::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<MonitoringOs> {
        MonitoringOs::ALL.into_iter().find(|os| os.as_str() == s)
    }
}

/// Kind of form control a field is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    Text,
    Number,
    Password,
    Textarea,
    Select,
    Radio,
    Checkbox,
    Hidden,
}

impl ControlKind {
    /// Controls whose value is trimmed when focus leaves them.
    pub fn trims_on_blur(self) -> bool {
        matches!(self, ControlKind::Text | ControlKind::Number | ControlKind::Password)
    }
}
