//! Construction payload and engine options.

use crate::error::WizardError;
use crate::types::{HostGroup, TemplateSummary};
use serde::{Deserialize, Serialize};

/// Initial data supplied once when the wizard dialog opens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialData {
    #[serde(default)]
    pub templates: Vec<TemplateSummary>,
    /// Ids of templates already linked to the host the wizard was opened for.
    #[serde(default)]
    pub linked_templates: Vec<String>,
    #[serde(default)]
    pub agent_script_server_host: String,
    #[serde(default)]
    pub csrf_token: String,
    #[serde(default = "default_true")]
    pub show_welcome: bool,
    /// Set when the wizard is opened for an existing host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostid: Option<String>,
    /// Host groups preselected for a new host.
    #[serde(default)]
    pub groups: Vec<HostGroup>,
}

fn default_true() -> bool {
    true
}

impl InitialData {
    pub fn from_json(input: &str) -> Result<InitialData, WizardError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn template(&self, templateid: &str) -> Option<&TemplateSummary> {
        self.templates.iter().find(|t| t.templateid == templateid)
    }

    pub fn is_linked(&self, templateid: &str) -> bool {
        self.linked_templates.iter().any(|id| id == templateid)
    }
}

/// Tunables of the wizard engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardOptions {
    /// Maximum length of a generated PSK identity.
    pub psk_identity_max_length: usize,
    /// Number of random bytes in a generated PSK.
    pub psk_bytes: usize,
    pub host_name_max_length: usize,
    /// Agent install script names offered on the install step.
    pub linux_install_script: String,
    pub windows_install_script: String,
}

impl Default for WizardOptions {
    fn default() -> Self {
        WizardOptions {
            psk_identity_max_length: 128,
            psk_bytes: 32,
            host_name_max_length: 128,
            linux_install_script: "install-zabbix-agent2.sh".to_string(),
            windows_install_script: "install-zabbix-agent2.ps1".to_string(),
        }
    }
}
