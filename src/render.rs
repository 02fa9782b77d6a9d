//! Step renderer: turns the current step and state into a node tree.
//!
//! Rendering is pure. Every call produces the full content of one step
//! together with the [`FormSchema`] the binder needs to map its controls back
//! to state paths. Front ends draw the nodes however they like.

use crate::binder::{FieldSpec, FormSchema, SelectOption};
use crate::config::{InitialData, WizardOptions};
use crate::enums::{ControlKind, InterfaceType, MacroFieldType, MacroType, MonitoringOs, SnmpVersion, Step};
use crate::macros::{MacroReset, configurable_macros};
use crate::paths::{self, value_to_text};
use crate::types::{ConfigResponse, TemplateSummary};
use crate::validate::ValidationEngine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Severity of a [`MessageBox`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Error,
    Warning,
    Success,
}

/// Dismissible message shown above the step content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBox {
    pub kind: MessageKind,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<String>,
}

impl MessageBox {
    pub fn error(title: impl Into<String>, messages: Vec<String>) -> Self {
        MessageBox {
            kind: MessageKind::Error,
            title: title.into(),
            messages,
        }
    }
}

/// A rendered form control.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldView {
    pub label: String,
    pub name: String,
    pub control: ControlKind,
    /// Current text; empty for checkboxes.
    pub value: String,
    pub checked: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    pub required: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Heading { text: String },
    Paragraph { text: String },
    Field(FieldView),
    Warning { text: String },
    /// Copyable block, e.g. an install command.
    Code { label: String, text: String },
    List { items: Vec<String> },
    Section { title: String, children: Vec<Node> },
}

impl Node {
    pub fn heading(text: impl Into<String>) -> Node {
        Node::Heading { text: text.into() }
    }

    pub fn paragraph(text: impl Into<String>) -> Node {
        Node::Paragraph { text: text.into() }
    }

    pub fn warning(text: impl Into<String>) -> Node {
        Node::Warning { text: text.into() }
    }

    /// This node followed by its nested nodes, depth first.
    pub fn walk(&self) -> Vec<&Node> {
        let mut out = vec![self];
        if let Node::Section { children, .. } = self {
            for child in children {
                out.extend(child.walk());
            }
        }
        out
    }
}

/// Complete output for one step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedStep {
    pub step: Step,
    pub title: String,
    pub nodes: Vec<Node>,
    #[serde(skip)]
    pub schema: FormSchema,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<MessageBox>,
    pub back_enabled: bool,
    pub next_enabled: bool,
    pub next_label: String,
    /// The cancel confirmation replaces the step content.
    pub cancel_confirmation: bool,
}

impl RenderedStep {
    /// All field views, including those nested in sections.
    pub fn fields(&self) -> Vec<&FieldView> {
        self.nodes
            .iter()
            .flat_map(Node::walk)
            .filter_map(|node| match node {
                Node::Field(view) => Some(view),
                _ => None,
            })
            .collect()
    }

    pub fn field(&self, name: &str) -> Option<&FieldView> {
        self.fields().into_iter().find(|f| f.name == name)
    }

    pub fn warnings(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .flat_map(Node::walk)
            .filter_map(|node| match node {
                Node::Warning { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Everything the renderer reads.
#[derive(Clone, Copy, Debug)]
pub struct RenderContext<'a> {
    pub step: Step,
    pub state: &'a Value,
    pub initial: &'a InitialData,
    pub options: &'a WizardOptions,
    pub loaded: Option<&'a ConfigResponse>,
    pub engine: &'a ValidationEngine,
    pub macro_resets: &'a [MacroReset],
    pub message: Option<&'a MessageBox>,
    pub can_go_back: bool,
    pub cancel_pending: bool,
    pub busy: bool,
}

pub fn render(ctx: &RenderContext<'_>) -> RenderedStep {
    if ctx.cancel_pending {
        return RenderedStep {
            step: ctx.step,
            title: "Cancel host wizard".to_string(),
            nodes: vec![
                Node::heading("Cancel host wizard?"),
                Node::paragraph("All entered data will be lost."),
            ],
            schema: FormSchema::new(),
            message: None,
            back_enabled: true,
            next_enabled: true,
            next_label: "Cancel wizard".to_string(),
            cancel_confirmation: true,
        };
    }

    let mut page = Page::new(ctx);
    match ctx.step {
        Step::Welcome => welcome(&mut page),
        Step::SelectTemplate => select_template(&mut page),
        Step::CreateHost => create_host(&mut page),
        Step::InstallAgent => install_agent(&mut page),
        Step::AddInterface => add_interface(&mut page),
        Step::Readme => readme(&mut page),
        Step::ConfigureHost => configure_host(&mut page),
        Step::Finish => finish(&mut page),
        Step::Complete => complete(&mut page),
    }

    let next_enabled = !ctx.busy && !ctx.engine.has_errors(ctx.step);
    RenderedStep {
        step: ctx.step,
        title: ctx.step.title().to_string(),
        nodes: page.nodes,
        schema: page.schema,
        message: ctx.message.cloned(),
        back_enabled: ctx.can_go_back && !ctx.busy && ctx.step != Step::Complete,
        next_enabled,
        next_label: next_label(ctx).to_string(),
        cancel_confirmation: false,
    }
}

fn next_label(ctx: &RenderContext<'_>) -> &'static str {
    match ctx.step {
        Step::Finish if has_hostid(ctx.state) => "Update",
        Step::Finish => "Create",
        Step::Complete => "Close",
        _ => "Next",
    }
}

fn has_hostid(state: &Value) -> bool {
    paths::resolve(state, "hostid").is_some_and(|v| !paths::is_empty_value(v))
}

fn text_at(state: &Value, path: &str) -> String {
    paths::resolve(state, path).map(value_to_text).unwrap_or_default()
}

// ─── Page builder ────────────────────────────────────────────────────────────

struct Page<'c, 'a> {
    ctx: &'c RenderContext<'a>,
    nodes: Vec<Node>,
    schema: FormSchema,
}

impl<'c, 'a> Page<'c, 'a> {
    fn new(ctx: &'c RenderContext<'a>) -> Self {
        Page {
            ctx,
            nodes: Vec::new(),
            schema: FormSchema::new(),
        }
    }

    fn push(&mut self, node: Node) {
        self.nodes.push(node);
    }

    /// Registers `spec` with the schema and returns its view.
    fn field(&mut self, label: &str, spec: FieldSpec, hint: Option<String>) -> Node {
        let state = self.ctx.state;
        let current = paths::resolve(state, &spec.path);
        let (value, checked) = match spec.control {
            ControlKind::Checkbox => (
                String::new(),
                current.is_some_and(|v| value_to_text(v) == spec.checked_value),
            ),
            _ => (current.map(value_to_text).unwrap_or_default(), false),
        };
        let view = FieldView {
            label: label.to_string(),
            name: spec.name.clone(),
            control: spec.control,
            value,
            checked,
            options: spec.options.clone(),
            error: self.ctx.engine.error(&spec.path).map(str::to_string),
            hint,
            required: self.ctx.engine.field_required(&spec.path, state),
        };
        self.schema.push(spec);
        Node::Field(view)
    }

    fn add_field(&mut self, label: &str, spec: FieldSpec, hint: Option<String>) {
        let node = self.field(label, spec, hint);
        self.push(node);
    }
}

// ─── Steps ───────────────────────────────────────────────────────────────────

fn welcome(page: &mut Page<'_, '_>) {
    page.push(Node::heading("Welcome to the Host Wizard"));
    page.push(Node::paragraph(
        "The wizard guides you through adding a new host or configuring an existing one for monitoring.",
    ));
    page.push(Node::paragraph(
        "Select a template, enter the host details, install the agent if needed and configure the template macros.",
    ));
    page.add_field(
        "Do not show welcome screen",
        FieldSpec::checkbox("do_not_show_welcome", "1", "0"),
        None,
    );
}

fn template_matches(template: &TemplateSummary, search: &str) -> bool {
    if search.is_empty() {
        return true;
    }
    let needle = search.to_lowercase();
    template.name.to_lowercase().contains(&needle)
        || template.description.to_lowercase().contains(&needle)
        || template.tags.iter().any(|t| {
            t.tag.to_lowercase().contains(&needle) || t.value.to_lowercase().contains(&needle)
        })
}

fn select_template(page: &mut Page<'_, '_>) {
    let ctx = page.ctx;
    let search = text_at(ctx.state, "template_search");

    page.push(Node::paragraph("Select a template to monitor the host with."));
    page.add_field(
        "Search",
        FieldSpec::new("template_search", ControlKind::Text),
        Some("Filter by name, description or tag.".to_string()),
    );

    let options: Vec<SelectOption> = ctx
        .initial
        .templates
        .iter()
        .filter(|t| template_matches(t, &search))
        .map(|t| SelectOption {
            value: t.templateid.clone(),
            label: t.name.clone(),
            disabled: ctx.initial.is_linked(&t.templateid),
        })
        .collect();

    if options.is_empty() {
        page.push(Node::paragraph("No templates found."));
    }

    let selected = text_at(ctx.state, "template_selected");
    let hint = ctx.initial.template(&selected).and_then(|t| {
        let mut parts = Vec::new();
        if !t.description.is_empty() {
            parts.push(t.description.clone());
        }
        if ctx.initial.is_linked(&t.templateid) {
            parts.push("Template is already linked to the host.".to_string());
        }
        (!parts.is_empty()).then(|| parts.join(" "))
    });
    page.add_field(
        "Template",
        FieldSpec::new("template_selected", ControlKind::Radio).with_options(options),
        hint,
    );
}

fn create_host(page: &mut Page<'_, '_>) {
    let ctx = page.ctx;

    if ctx.initial.hostid.is_some() {
        let name = text_at(ctx.state, "host");
        page.push(Node::paragraph(format!("Host: {}", name)));
    } else {
        page.add_field(
            "Host name",
            FieldSpec::new("host", ControlKind::Text),
            Some("Enter a new host name or select an existing host.".to_string()),
        );
        page.add_field("Existing host", FieldSpec::new("hostid", ControlKind::Hidden), None);
    }

    if has_hostid(ctx.state) {
        page.push(Node::paragraph(
            "The template will be linked to the existing host. Its groups are kept.",
        ));
        return;
    }

    page.add_field(
        "Host groups",
        FieldSpec::new("groups_ms", ControlKind::Text),
        Some("Type to search or create a new group.".to_string()),
    );

    let rows = match paths::resolve(ctx.state, "groups") {
        Some(Value::Array(rows)) => rows.as_slice(),
        _ => &[],
    };
    let mut items = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        let name = row
            .get("name")
            .or_else(|| row.get("new"))
            .map(value_to_text)
            .unwrap_or_default();
        if row.get("new").is_some() {
            items.push(format!("{} (new)", name));
            page.schema.push(FieldSpec::new(format!("groups.{}.new", i), ControlKind::Hidden));
        } else {
            items.push(name);
            page.schema.push(FieldSpec::new(format!("groups.{}.groupid", i), ControlKind::Hidden));
        }
    }
    if !items.is_empty() {
        page.push(Node::List { items });
    }
}

/// Agent install command for the selected OS, `None` for manual setups.
pub fn install_command(state: &Value, options: &WizardOptions, tls: bool) -> Option<String> {
    let os = MonitoringOs::parse(&text_at(state, "monitoring_os")).unwrap_or_default();
    let server = text_at(state, "agent_script_server_host");
    let host = text_at(state, "host");
    let identity = text_at(state, "tls_psk_identity");
    let psk = text_at(state, "tls_psk");

    match os {
        MonitoringOs::Linux => {
            let mut cmd = format!(
                "ZBX_SERVER_HOST={} ZBX_HOSTNAME={}",
                sh_quote(&server),
                sh_quote(&host)
            );
            if tls {
                cmd.push_str(&format!(
                    " ZBX_TLSPSKIDENTITY={} ZBX_TLSPSK={}",
                    sh_quote(&identity),
                    sh_quote(&psk)
                ));
            }
            cmd.push_str(&format!(" bash {}", options.linux_install_script));
            Some(cmd)
        }
        MonitoringOs::Windows => {
            let mut cmd = format!(
                "powershell -ExecutionPolicy Bypass -File {} -ServerHost {} -Hostname {}",
                options.windows_install_script,
                ps_quote(&server),
                ps_quote(&host)
            );
            if tls {
                cmd.push_str(&format!(
                    " -PskIdentity {} -Psk {}",
                    ps_quote(&identity),
                    ps_quote(&psk)
                ));
            }
            Some(cmd)
        }
        MonitoringOs::Other => None,
    }
}

/// POSIX shell single-quoted literal.
fn sh_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// PowerShell single-quoted literal. PowerShell also closes the string on
/// typographic quotes, so those are doubled like `'`.
fn ps_quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if matches!(c, '\'' | '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}') {
            out.push(c);
        }
        out.push(c);
    }
    out.push('\'');
    out
}

fn install_agent(page: &mut Page<'_, '_>) {
    let ctx = page.ctx;
    let tls = ctx.loaded.is_some_and(ConfigResponse::tls_required);

    page.push(Node::paragraph(
        "The selected template requires Zabbix agent on the host.",
    ));

    let os_options = MonitoringOs::ALL
        .into_iter()
        .map(|os| {
            let label = match os {
                MonitoringOs::Linux => "Linux",
                MonitoringOs::Windows => "Windows",
                MonitoringOs::Other => "Other",
            };
            SelectOption::new(os.as_str(), label)
        })
        .collect();
    page.add_field(
        "Host OS",
        FieldSpec::new("monitoring_os", ControlKind::Radio).with_options(os_options),
        None,
    );
    page.add_field(
        "Zabbix server or proxy address",
        FieldSpec::new("agent_script_server_host", ControlKind::Text),
        Some("The agent connects to this address.".to_string()),
    );

    if tls {
        page.add_field(
            "Pre-shared key identity",
            FieldSpec::new("tls_psk_identity", ControlKind::Text),
            None,
        );
        page.add_field(
            "Pre-shared key",
            FieldSpec::new("tls_psk", ControlKind::Text),
            Some("At least 32 hexadecimal digits.".to_string()),
        );
    } else if ctx.loaded.is_some_and(|c| c.install_agent_required) {
        page.push(Node::paragraph("Encryption is already configured for this host."));
    }

    match install_command(ctx.state, ctx.options, tls) {
        Some(text) => page.push(Node::Code {
            label: "Run the following command on the host".to_string(),
            text,
        }),
        None => page.push(Node::paragraph(
            "Install the agent manually and set Server, Hostname and the TLS parameters in its configuration file.",
        )),
    }
}

fn add_interface(page: &mut Page<'_, '_>) {
    let ctx = page.ctx;
    let rows = match paths::resolve(ctx.state, "interfaces") {
        Some(Value::Array(rows)) => rows.as_slice(),
        _ => &[],
    };

    page.push(Node::paragraph(
        "The template collects data through the interfaces below.",
    ));

    for (i, row) in rows.iter().enumerate() {
        let Some(kind) = row
            .get("type")
            .and_then(|t| value_to_text(t).parse::<i64>().ok())
            .and_then(|code| InterfaceType::try_from(code).ok())
        else {
            continue;
        };
        let base = format!("interfaces.{}", i);
        let mut children = vec![
            page.field("IP address", FieldSpec::new(format!("{}.ip", base), ControlKind::Text), None),
            page.field("DNS name", FieldSpec::new(format!("{}.dns", base), ControlKind::Text), None),
            page.field(
                "Connect to",
                FieldSpec::new(format!("{}.useip", base), ControlKind::Radio).with_options(vec![
                    SelectOption::new("1", "IP"),
                    SelectOption::new("0", "DNS"),
                ]),
                None,
            ),
            page.field("Port", FieldSpec::new(format!("{}.port", base), ControlKind::Text), None),
        ];

        if kind == InterfaceType::Snmp {
            let version = row
                .get("details")
                .and_then(|d| d.get("version"))
                .and_then(|v| value_to_text(v).parse::<i64>().ok())
                .and_then(|code| SnmpVersion::try_from(code).ok())
                .unwrap_or_default();
            children.push(page.field(
                "SNMP version",
                FieldSpec::new(format!("{}.details.version", base), ControlKind::Select).with_options(vec![
                    SelectOption::new("1", "SNMPv1"),
                    SelectOption::new("2", "SNMPv2"),
                    SelectOption::new("3", "SNMPv3"),
                ]),
                None,
            ));
            if version == SnmpVersion::V3 {
                children.push(page.field(
                    "Security name",
                    FieldSpec::new(format!("{}.details.securityname", base), ControlKind::Text),
                    None,
                ));
            } else {
                children.push(page.field(
                    "SNMP community",
                    FieldSpec::new(format!("{}.details.community", base), ControlKind::Text),
                    None,
                ));
            }
            children.push(page.field(
                "Use combined requests",
                FieldSpec::checkbox(format!("{}.details.bulk", base), "1", "0"),
                None,
            ));
        }

        page.push(Node::Section {
            title: format!("{} interface", kind.label()),
            children,
        });
    }
}

fn readme(page: &mut Page<'_, '_>) {
    let text = page
        .ctx
        .loaded
        .map(|c| c.template.readme.as_str())
        .unwrap_or_default();
    for block in text.split("\n\n").map(str::trim).filter(|b| !b.is_empty()) {
        page.push(Node::paragraph(block));
    }
}

fn configure_host(page: &mut Page<'_, '_>) {
    let ctx = page.ctx;
    let Some(config) = ctx.loaded else {
        return;
    };

    for reset in ctx.macro_resets {
        page.push(Node::warning(reset.warning()));
    }

    // Macros without a section come first, then one section per name.
    let mut loose = Vec::new();
    let mut sections: Vec<(String, Vec<Node>)> = Vec::new();

    for (i, template_macro) in configurable_macros(&config.template).into_iter().enumerate() {
        let macro_config = &template_macro.config;
        let path = format!("macros.{}.value", i);
        let label = if macro_config.label.is_empty() {
            template_macro.name.as_str()
        } else {
            macro_config.label.as_str()
        };
        let hint = (!macro_config.description.is_empty()).then(|| macro_config.description.clone());

        let spec = match macro_config.field_type {
            MacroFieldType::List => {
                let options = macro_config
                    .options
                    .iter()
                    .filter_map(|o| {
                        let value = o.value.clone()?;
                        let text = o.text.clone().unwrap_or_else(|| value.clone());
                        Some(SelectOption::new(value, text))
                    })
                    .collect();
                FieldSpec::new(&path, ControlKind::Select).with_options(options)
            }
            MacroFieldType::Checkbox => match macro_config.checkbox_values() {
                Some((checked, unchecked)) => FieldSpec::checkbox(&path, checked, unchecked),
                None => FieldSpec::checkbox(&path, "1", "0"),
            },
            MacroFieldType::Text | MacroFieldType::NoConf => {
                let macro_type = paths::resolve(ctx.state, &format!("macros.{}.type", i))
                    .and_then(Value::as_i64)
                    .and_then(|code| MacroType::try_from(code).ok())
                    .unwrap_or(template_macro.macro_type);
                let control = if macro_type == MacroType::Secret {
                    ControlKind::Password
                } else {
                    ControlKind::Text
                };
                FieldSpec::new(&path, control)
            }
        };

        let node = page.field(label, spec, hint);
        if macro_config.section_name.is_empty() {
            loose.push(node);
        } else {
            match sections.iter_mut().find(|(name, _)| *name == macro_config.section_name) {
                Some((_, children)) => children.push(node),
                None => sections.push((macro_config.section_name.clone(), vec![node])),
            }
        }
    }

    page.nodes.extend(loose);
    for (title, children) in sections {
        page.push(Node::Section { title, children });
    }
}

fn finish(page: &mut Page<'_, '_>) {
    let ctx = page.ctx;
    let mut items = Vec::new();

    if let Some(config) = ctx.loaded {
        items.push(format!("Template: {}", config.template.name));
    }
    items.push(format!("Host: {}", text_at(ctx.state, "host")));

    if let Some(Value::Array(groups)) = paths::resolve(ctx.state, "groups")
        && !groups.is_empty()
    {
        let names: Vec<String> = groups
            .iter()
            .map(|g| g.get("name").or_else(|| g.get("new")).map(value_to_text).unwrap_or_default())
            .collect();
        items.push(format!("Host groups: {}", names.join(", ")));
    }

    if let Some(Value::Array(interfaces)) = paths::resolve(ctx.state, "interfaces") {
        for row in interfaces {
            let kind = row
                .get("type")
                .and_then(|t| value_to_text(t).parse::<i64>().ok())
                .and_then(|code| InterfaceType::try_from(code).ok());
            let useip = row.get("useip").is_some_and(|v| value_to_text(v) == "1");
            let address = row
                .get(if useip { "ip" } else { "dns" })
                .map(value_to_text)
                .unwrap_or_default();
            let port = row.get("port").map(value_to_text).unwrap_or_default();
            if let Some(kind) = kind {
                items.push(format!("{} interface: {}:{}", kind.label(), address, port));
            }
        }
    }

    if let Some(Value::Array(macros)) = paths::resolve(ctx.state, "macros")
        && !macros.is_empty()
    {
        items.push(format!("Configured macros: {}", macros.len()));
    }

    page.push(Node::paragraph("Review the configuration before saving the host."));
    page.push(Node::List { items });
}

fn complete(page: &mut Page<'_, '_>) {
    let state = page.ctx.state;
    let verb = if has_hostid(state) { "updated" } else { "created" };
    page.push(Node::paragraph(format!(
        "Host \"{}\" has been {}.",
        text_at(state, "host"),
        verb
    )));
    page.push(Node::paragraph(
        "Data collection starts shortly. Latest data and problems can be checked from the host list.",
    ));
}
