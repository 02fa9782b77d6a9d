//! The wizard state machine.
//!
//! [`Wizard`] owns the store, the validation engine and the step cursor, and
//! drives the Next / Back / Cancel transitions. Side effects go through a
//! [`WizardBackend`]; only one advance can be in flight because `next` takes
//! `&mut self`. A [`CloseHandle`] lets another owner close the wizard while a
//! request is pending, in which case the response is dropped.

use crate::api::{SaveAction, WizardBackend};
use crate::binder::{BlurOutcome, ControlUpdate, FormBinder, FormView, InputEvent};
use crate::config::{InitialData, WizardOptions};
use crate::enums::{InterfaceType, SnmpVersion, Step};
use crate::error::WizardError;
use crate::macros::{MacroReset, macro_inputs, macro_rules, merge_macros};
use crate::paths::{self, value_to_text};
use crate::psk::{generate_psk, psk_identity};
use crate::render::{MessageBox, RenderContext, RenderedStep, render};
use crate::rules::{Pattern, RuleBook, RuleContext, StepCheck, ValidationRule, check};
use crate::sequencer::{StepSequencer, compute_queue};
use crate::store::ReactiveStore;
use crate::types::{
    ConfigRequest, ConfigResponse, GroupInput, HostGroup, HostInterface, SavePayload, SnmpDetails,
};
use crate::validate::ValidationEngine;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

const HOST_NAME_PATTERN: &str = r"^[0-9a-zA-Z_. \-]+$";
const PSK_PATTERN: &str = r"^[0-9a-fA-F]+$";
const PORT_PATTERN: &str = r"^(\d{1,5}|\{\$[A-Z0-9_.]+\})$";
const DEFAULT_SNMP_COMMUNITY: &str = "{$SNMP_COMMUNITY}";
const DEFAULT_INTERFACE_IP: &str = "127.0.0.1";

/// Shared flag closing a wizard from outside its owner.
#[derive(Clone, Debug, Default)]
pub struct CloseHandle(Arc<AtomicBool>);

impl CloseHandle {
    pub fn close(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of a successful `next` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Moved to this step.
    Advanced(Step),
    /// Validation failed; the wizard stays on the current step.
    Invalid,
    /// The wizard was closed while the request was in flight.
    Discarded,
    /// Next on the terminal step or on the cancel confirmation.
    Closed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelOutcome {
    Closed,
    ConfirmationRequired,
}

enum Effect {
    None,
    Load(ConfigRequest),
    Save(SaveAction, Box<SavePayload>),
}

enum Outcome {
    None,
    Loaded(ConfigRequest, Box<ConfigResponse>),
    Saved(String),
}

/// Sets the busy flag for its lifetime.
struct BusyGuard<'a>(&'a mut bool);

impl<'a> BusyGuard<'a> {
    fn hold(flag: &'a mut bool) -> Self {
        *flag = true;
        BusyGuard(flag)
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

/// Rules of the fixed steps. Macro rules are added when a template loads.
pub fn default_rule_book(options: &WizardOptions) -> Result<RuleBook, WizardError> {
    let pattern = |source: &str| Pattern::new(source).map_err(WizardError::from);
    let no_hostid = |ctx: &RuleContext<'_>| {
        ctx.get("hostid").is_none_or(paths::is_empty_value)
    };

    let mut book = RuleBook::new();

    book.add_check(
        Step::SelectTemplate,
        StepCheck::new("template_selected", "Select a template.", |ctx| {
            ctx.get("template_selected").is_some_and(|v| !paths::is_empty_value(v))
        }),
    );

    book.add(
        Step::CreateHost,
        "host",
        ValidationRule::string()
            .required_when(no_hostid)
            .max_length(options.host_name_max_length)
            .pattern(pattern(HOST_NAME_PATTERN)?)
            .message(
                check::REGEX,
                "Only letters, digits, spaces, dots, dashes and underscores are allowed.",
            ),
    )
    .add(
        Step::CreateHost,
        "groups",
        ValidationRule::array(ValidationRule::object(vec![]))
            .required_when(no_hostid),
    )
    .add(Step::CreateHost, "groups_ms", ValidationRule::any().alias_of("groups"));

    let tls_required =
        |ctx: &RuleContext<'_>| ctx.get("tls_required").is_some_and(|v| value_to_text(v) == "1");
    book.add(
        Step::InstallAgent,
        "monitoring_os",
        ValidationRule::string().required(),
    )
    .add(
        Step::InstallAgent,
        "agent_script_server_host",
        ValidationRule::string().required().max_length(255),
    )
    .add(
        Step::InstallAgent,
        "tls_psk_identity",
        ValidationRule::string()
            .required_when(tls_required)
            .max_length(options.psk_identity_max_length),
    )
    .add(
        Step::InstallAgent,
        "tls_psk",
        ValidationRule::string()
            .required_when(tls_required)
            .min_length(32)
            .max_length(512)
            .pattern(pattern(PSK_PATTERN)?)
            .message(
                check::REGEX,
                "The PSK must contain only hexadecimal digits.",
            ),
    );

    let interface = ValidationRule::object(vec![
        (
            "ip",
            ValidationRule::string()
                .required_when(|ctx| ctx.sibling("useip").is_some_and(|v| value_to_text(v) == "1"))
                .max_length(64),
        ),
        (
            "dns",
            ValidationRule::string()
                .required_when(|ctx| ctx.sibling("useip").is_some_and(|v| value_to_text(v) != "1"))
                .max_length(255),
        ),
        (
            "port",
            ValidationRule::string().required().pattern(pattern(PORT_PATTERN)?),
        ),
        (
            "details",
            ValidationRule::object(vec![
                ("community", ValidationRule::string().max_length(64)),
                ("securityname", ValidationRule::string().max_length(64)),
            ]),
        ),
    ]);
    book.add(Step::AddInterface, "interfaces", ValidationRule::array(interface));

    Ok(book)
}

/// Default state row for an interface of `interface_type`.
fn interface_row(interface_type: InterfaceType) -> Value {
    let mut row = json!({
        "type": interface_type.code(),
        "ip": DEFAULT_INTERFACE_IP,
        "dns": "",
        "useip": "1",
        "port": interface_type.default_port(),
    });
    if interface_type == InterfaceType::Snmp {
        row["details"] = json!({
            "version": i64::from(SnmpVersion::default()).to_string(),
            "community": DEFAULT_SNMP_COMMUNITY,
            "securityname": "",
            "bulk": "1",
        });
    }
    row
}

fn host_interface_row(interface: &HostInterface) -> Value {
    let mut row = json!({
        "type": interface.interface_type.code(),
        "ip": interface.ip,
        "dns": interface.dns,
        "useip": if interface.useip { "1" } else { "0" },
        "port": interface.port,
    });
    if let Some(id) = &interface.interfaceid {
        row["interfaceid"] = json!(id);
    }
    if let Some(details) = &interface.details {
        row["details"] = json!({
            "version": i64::from(details.version).to_string(),
            "community": details.community,
            "securityname": details.securityname,
            "bulk": if details.bulk { "1" } else { "0" },
        });
    }
    row
}

/// Interface rows for every interface type the template needs, taken from
/// the host when it already has one of that type.
fn interface_rows(config: &ConfigResponse) -> Vec<Value> {
    InterfaceType::ALL
        .into_iter()
        .filter(|t| config.interface_required(*t))
        .map(|t| {
            config
                .host
                .as_ref()
                .and_then(|h| h.interfaces.iter().find(|i| i.interface_type == t))
                .map(host_interface_row)
                .unwrap_or_else(|| interface_row(t))
        })
        .collect()
}

fn group_row(group: &HostGroup) -> Value {
    json!({"groupid": group.groupid, "name": group.name})
}

fn parse_interface(row: &Value) -> Option<HostInterface> {
    let text = |key: &str| row.get(key).map(value_to_text).unwrap_or_default();
    let interface_type = InterfaceType::try_from(text("type").parse::<i64>().ok()?).ok()?;
    let details = (interface_type == InterfaceType::Snmp).then(|| {
        let details = row.get("details").cloned().unwrap_or(Value::Null);
        let field = |key: &str| details.get(key).map(value_to_text).unwrap_or_default();
        SnmpDetails {
            version: field("version")
                .parse::<i64>()
                .ok()
                .and_then(|code| SnmpVersion::try_from(code).ok())
                .unwrap_or_default(),
            community: field("community"),
            securityname: field("securityname"),
            bulk: field("bulk") != "0",
        }
    });
    Some(HostInterface {
        interfaceid: Some(text("interfaceid")).filter(|id| !id.is_empty()),
        interface_type,
        ip: text("ip"),
        dns: text("dns"),
        useip: text("useip") == "1",
        port: text("port"),
        details,
    })
}

fn parse_group(row: &Value) -> Option<GroupInput> {
    if let Some(groupid) = row.get("groupid").map(value_to_text).filter(|id| !id.is_empty()) {
        return Some(GroupInput::Existing { groupid });
    }
    row.get("new")
        .map(value_to_text)
        .filter(|name| !name.is_empty())
        .map(|new| GroupInput::New { new })
}

/// Host onboarding wizard.
pub struct Wizard<B: WizardBackend> {
    initial: InitialData,
    options: WizardOptions,
    backend: B,
    store: ReactiveStore,
    engine: ValidationEngine,
    sequencer: StepSequencer,
    binder: FormBinder,
    loaded: Option<ConfigResponse>,
    loaded_for: Option<ConfigRequest>,
    macro_resets: Vec<MacroReset>,
    message: Option<MessageBox>,
    cancel_pending: bool,
    busy: bool,
    closed: CloseHandle,
    saved_hostid: Option<String>,
}

impl<B: WizardBackend> std::fmt::Debug for Wizard<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wizard")
            .field("step", &self.sequencer.current())
            .field("queue", &self.sequencer.queue())
            .field("busy", &self.busy)
            .field("closed", &self.closed.is_closed())
            .finish_non_exhaustive()
    }
}

impl<B: WizardBackend> Wizard<B> {
    /// Opens a wizard on its initial step.
    pub fn open(initial: InitialData, options: WizardOptions, backend: B) -> Result<Self, WizardError> {
        let book = default_rule_book(&options)?;
        Ok(Self::with_rules(initial, options, backend, book))
    }

    /// Opens a wizard validating with `book` instead of the built-in rules.
    pub fn with_rules(initial: InitialData, options: WizardOptions, backend: B, book: RuleBook) -> Self {
        let mut store = ReactiveStore::new(Self::initial_state(&initial));
        Self::track_psk_identity(&mut store, options.psk_identity_max_length);

        let queue = compute_queue(store.data(), None, initial.show_welcome);
        let sequencer = StepSequencer::new(queue);
        info!(step = %sequencer.current(), hostid = ?initial.hostid, "host wizard opened");

        let mut wizard = Wizard {
            initial,
            options,
            backend,
            store,
            engine: ValidationEngine::new(book),
            sequencer,
            binder: FormBinder::default(),
            loaded: None,
            loaded_for: None,
            macro_resets: Vec::new(),
            message: None,
            cancel_pending: false,
            busy: false,
            closed: CloseHandle::default(),
            saved_hostid: None,
        };
        wizard.rebind();
        wizard
    }

    fn initial_state(initial: &InitialData) -> Value {
        json!({
            "do_not_show_welcome": if initial.show_welcome { "0" } else { "1" },
            "template_search": "",
            "template_selected": "",
            "hostid": initial.hostid.clone().unwrap_or_default(),
            "host": "",
            "groups": initial.groups.iter().map(group_row).collect::<Vec<_>>(),
            "groups_ms": "",
            "monitoring_os": "linux",
            "agent_script_server_host": initial.agent_script_server_host,
            "tls_required": "0",
            "tls_psk_identity": "",
            "tls_psk": "",
            "interfaces": [],
            "macros": [],
        })
    }

    /// Keeps the PSK identity derived from the host name until the user
    /// edits it to something else.
    fn track_psk_identity(store: &mut ReactiveStore, max_length: usize) {
        let mut host = String::new();
        let mut derived = true;
        store.subscribe(move |change, followups| {
            let text = change.new.as_ref().map(value_to_text).unwrap_or_default();
            match change.path.as_str() {
                "host" => {
                    host = text;
                    if derived {
                        followups.set("tls_psk_identity", json!(psk_identity(&host, max_length)));
                    }
                }
                "tls_psk_identity" => {
                    derived = text.is_empty() || text == psk_identity(&host, max_length);
                }
                _ => {}
            }
        });
    }

    // ─── Accessors ───────────────────────────────────────────────────────────

    pub fn step(&self) -> Step {
        self.sequencer.current()
    }

    pub fn queue(&self) -> &[Step] {
        self.sequencer.queue()
    }

    pub fn state(&self) -> &Value {
        self.store.data()
    }

    pub fn store(&self) -> &ReactiveStore {
        &self.store
    }

    pub fn engine(&self) -> &ValidationEngine {
        &self.engine
    }

    pub fn loaded(&self) -> Option<&ConfigResponse> {
        self.loaded.as_ref()
    }

    pub fn macro_resets(&self) -> &[MacroReset] {
        &self.macro_resets
    }

    pub fn message(&self) -> Option<&MessageBox> {
        self.message.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_closed()
    }

    pub fn close_handle(&self) -> CloseHandle {
        self.closed.clone()
    }

    /// Id of the host written by the last successful save.
    pub fn saved_hostid(&self) -> Option<&str> {
        self.saved_hostid.as_deref()
    }

    pub fn is_cancel_pending(&self) -> bool {
        self.cancel_pending
    }

    /// Next is enabled when nothing is in flight and the current step shows
    /// no errors.
    pub fn next_enabled(&self) -> bool {
        !self.busy && !self.engine.has_errors(self.step())
    }

    // ─── Rendering and binding ───────────────────────────────────────────────

    pub fn render(&self) -> RenderedStep {
        render(&RenderContext {
            step: self.step(),
            state: self.store.data(),
            initial: &self.initial,
            options: &self.options,
            loaded: self.loaded.as_ref(),
            engine: &self.engine,
            macro_resets: &self.macro_resets,
            message: self.message.as_ref(),
            can_go_back: self.sequencer.can_go_back(),
            cancel_pending: self.cancel_pending,
            busy: self.busy,
        })
    }

    /// Re-renders the current step and hands its schema to the binder.
    fn rebind(&mut self) -> RenderedStep {
        let rendered = self.render();
        self.binder.set_schema(rendered.schema.clone());
        rendered
    }

    /// Pushes the whole state into `view`.
    pub fn sync_view(&self, view: &mut impl FormView) {
        self.binder.sync_to_view(self.store.data(), view);
    }

    /// Applies a control change. Returns the updated path.
    pub fn input(&mut self, event: &InputEvent) -> Result<String, WizardError> {
        self.ensure_open()?;
        let path = self.binder.handle_input(event, &mut self.store);
        let step = self.step();
        if self.engine.is_active(step) {
            self.engine.run_checks(step, self.store.data());
        }
        // The control set of some steps depends on the values just entered.
        self.rebind();
        Ok(path)
    }

    /// Focus left the control `name` showing `view_text`.
    pub fn blur(&mut self, name: &str, view_text: &str) -> Result<BlurOutcome, WizardError> {
        self.ensure_open()?;
        let outcome = self
            .binder
            .handle_blur(name, view_text, &mut self.store, &mut self.engine);
        Ok(outcome)
    }

    /// Control updates for the current state, for front ends without a
    /// [`FormView`].
    pub fn outbound(&self) -> Vec<ControlUpdate> {
        self.binder.outbound(self.store.data())
    }

    // ─── Rows ────────────────────────────────────────────────────────────────

    /// Removes row `index` of the array at `array_path`; later rows shift.
    pub fn remove_row(&mut self, array_path: &str, index: usize) -> Result<Option<Value>, WizardError> {
        self.ensure_open()?;
        let removed = self.store.remove(&format!("{}.{}", array_path, index));
        if removed.is_some() {
            self.engine.clear_prefix(array_path);
            self.engine.validate_field(array_path, self.store.data());
            self.rebind();
        }
        Ok(removed)
    }

    /// Appends a default row for an interface of `interface_type`.
    pub fn add_interface(&mut self, interface_type: InterfaceType) -> Result<usize, WizardError> {
        self.ensure_open()?;
        let index = match self.store.get("interfaces") {
            Some(Value::Array(rows)) => rows.len(),
            _ => 0,
        };
        self.store
            .set(&format!("interfaces.{}", index), interface_row(interface_type));
        self.rebind();
        Ok(index)
    }

    /// Adds an existing group, ignoring duplicates.
    pub fn add_group(&mut self, group: &HostGroup) -> Result<(), WizardError> {
        self.ensure_open()?;
        let present = match self.store.get("groups") {
            Some(Value::Array(rows)) => rows
                .iter()
                .any(|row| row.get("groupid").is_some_and(|id| value_to_text(id) == group.groupid)),
            _ => false,
        };
        if !present {
            self.push_group(group_row(group));
        }
        Ok(())
    }

    /// Adds a group to be created on save.
    pub fn add_new_group(&mut self, name: &str) -> Result<(), WizardError> {
        self.ensure_open()?;
        let name = name.trim();
        if !name.is_empty() {
            self.push_group(json!({"new": name}));
        }
        Ok(())
    }

    fn push_group(&mut self, row: Value) {
        let index = match self.store.get("groups") {
            Some(Value::Array(rows)) => rows.len(),
            _ => 0,
        };
        self.store.set(&format!("groups.{}", index), row);
        self.store.set("groups_ms", json!(""));
        self.engine.validate_field("groups", self.store.data());
        self.rebind();
    }

    // ─── Navigation ──────────────────────────────────────────────────────────

    /// Validates the current step, runs its side effect and advances.
    pub async fn next(&mut self) -> Result<Transition, WizardError> {
        self.ensure_open()?;
        if self.busy {
            return Err(WizardError::Busy);
        }
        if self.cancel_pending {
            self.confirm_cancel();
            return Ok(Transition::Closed);
        }

        let step = self.step();
        if step == Step::Complete {
            self.close();
            return Ok(Transition::Closed);
        }

        self.engine.activate_step(step);
        if !self.engine.validate_step(step, self.store.data()) {
            debug!(%step, errors = self.engine.errors().len(), "step is invalid");
            self.rebind();
            return Ok(Transition::Invalid);
        }

        self.message = None;
        let effect = self.effect_for(step);
        let outcome = {
            // Dropping the future mid-request releases the flag as well.
            let _busy = BusyGuard::hold(&mut self.busy);
            match effect {
                Effect::None => Ok(Outcome::None),
                Effect::Load(request) => {
                    debug!(templateid = %request.templateid, hostid = ?request.hostid, "loading host wizard config");
                    let result = self.backend.fetch_config(&request).await;
                    result.map(|config| Outcome::Loaded(request, Box::new(config)))
                }
                Effect::Save(action, payload) => {
                    info!(action = action.action(), "saving host");
                    let result = self.backend.save(action, &payload).await;
                    result.map(|response| Outcome::Saved(response.hostid))
                }
            }
        };

        if self.closed.is_closed() {
            debug!(%step, "response arrived after close, ignored");
            return Ok(Transition::Discarded);
        }

        let applied = match outcome {
            Ok(Outcome::None) => Ok(()),
            Ok(Outcome::Loaded(request, config)) => self.apply_config(request, *config),
            Ok(Outcome::Saved(hostid)) => {
                info!(%hostid, "host saved");
                self.saved_hostid = Some(hostid);
                Ok(())
            }
            Err(e) => Err(e),
        };
        if let Err(e) = applied {
            warn!(%step, error = %e, "step side effect failed");
            if let WizardError::FormErrors(errors) = &e {
                self.engine.set_external_errors(errors.clone());
            }
            let (title, messages) = e.message_box();
            self.message = Some(MessageBox::error(title, messages));
            self.rebind();
            return Err(e);
        }

        self.refresh_queue();
        let next = self.sequencer.advance();
        debug!(from = %step, to = %next, "advanced");
        self.rebind();
        Ok(Transition::Advanced(next))
    }

    /// Moves back one step without validation or side effects.
    pub fn back(&mut self) -> Result<Option<Step>, WizardError> {
        self.ensure_open()?;
        if self.busy {
            return Err(WizardError::Busy);
        }
        if self.cancel_pending {
            self.abort_cancel();
            return Ok(None);
        }
        let step = self.sequencer.back();
        if let Some(step) = step {
            debug!(to = %step, "went back");
            self.rebind();
        }
        Ok(step)
    }

    /// Requests cancellation. Closes at once while no template is selected.
    pub fn cancel(&mut self) -> CancelOutcome {
        if self.closed.is_closed() || self.store.get_str("template_selected").is_empty() {
            self.close();
            return CancelOutcome::Closed;
        }
        self.cancel_pending = true;
        self.rebind();
        CancelOutcome::ConfirmationRequired
    }

    /// Closes the wizard and discards all entered data.
    pub fn confirm_cancel(&mut self) {
        self.cancel_pending = false;
        self.store.replace(Value::Object(serde_json::Map::new()));
        self.engine.clear();
        self.close();
    }

    pub fn abort_cancel(&mut self) {
        if self.cancel_pending {
            self.cancel_pending = false;
            self.rebind();
        }
    }

    pub fn dismiss_message(&mut self) {
        self.message = None;
    }

    pub fn close(&mut self) {
        if !self.closed.is_closed() {
            info!("host wizard closed");
        }
        self.closed.close();
    }

    fn ensure_open(&self) -> Result<(), WizardError> {
        if self.closed.is_closed() {
            return Err(WizardError::Closed);
        }
        Ok(())
    }

    fn config_request(&self) -> ConfigRequest {
        let hostid = self.store.get_str("hostid");
        ConfigRequest {
            templateid: self.store.get_str("template_selected").to_string(),
            hostid: (!hostid.is_empty()).then(|| hostid.to_string()),
        }
    }

    fn effect_for(&self, step: Step) -> Effect {
        match step {
            Step::SelectTemplate | Step::CreateHost => {
                let request = self.config_request();
                if self.loaded_for.as_ref() == Some(&request) {
                    Effect::None
                } else {
                    Effect::Load(request)
                }
            }
            Step::Finish => {
                let (action, payload) = self.build_save_payload();
                Effect::Save(action, Box::new(payload))
            }
            _ => Effect::None,
        }
    }

    /// Recomputes the queue and deactivates the rules of dropped steps.
    fn refresh_queue(&mut self) {
        let queue = compute_queue(self.store.data(), self.loaded.as_ref(), self.initial.show_welcome);
        for step in self.sequencer.set_queue(queue) {
            debug!(%step, "step left the queue");
            self.engine.deactivate_step(step);
        }
    }

    /// Applies a loaded template configuration to the state.
    fn apply_config(&mut self, request: ConfigRequest, config: ConfigResponse) -> Result<(), WizardError> {
        let tls = config.tls_required();
        let psk = if tls && self.store.get_str("tls_psk").is_empty() {
            Some(generate_psk(self.options.psk_bytes)?)
        } else {
            None
        };

        if let Some(host) = &config.host {
            self.store.set("host", json!(host.name));
            self.store.set(
                "groups",
                Value::Array(host.groups.iter().map(group_row).collect()),
            );
        }

        self.store.set("interfaces", Value::Array(interface_rows(&config)));

        let (rows, resets) = merge_macros(&config.template, config.host.as_ref());
        self.store.set("macros", Value::Array(rows));
        self.macro_resets = resets;
        let book = self.engine.rules_mut();
        book.remove_prefix(Step::ConfigureHost, "macros");
        for (path, rule) in macro_rules(&config.template) {
            book.add(Step::ConfigureHost, path, rule);
        }

        self.store.set("tls_required", json!(if tls { "1" } else { "0" }));
        if let Some(psk) = psk {
            self.store.set("tls_psk", json!(psk));
        }
        if tls && self.store.get_str("tls_psk_identity").is_empty() {
            let identity = psk_identity(self.store.get_str("host"), self.options.psk_identity_max_length);
            self.store.set("tls_psk_identity", json!(identity));
        }

        info!(
            templateid = %request.templateid,
            template = %config.template.name,
            macros = config.template.macros.len(),
            resets = self.macro_resets.len(),
            "host wizard config loaded"
        );
        self.loaded = Some(config);
        self.loaded_for = Some(request);
        Ok(())
    }

    /// The save request for the current state.
    pub fn build_save_payload(&self) -> (SaveAction, SavePayload) {
        let state = self.store.data();
        let hostid = Some(self.store.get_str("hostid").to_string()).filter(|id| !id.is_empty());
        let action = if hostid.is_some() { SaveAction::Update } else { SaveAction::Create };

        let groups = if hostid.is_some() {
            Vec::new()
        } else {
            match paths::resolve(state, "groups") {
                Some(Value::Array(rows)) => rows.iter().filter_map(parse_group).collect(),
                _ => Vec::new(),
            }
        };
        let interfaces = match paths::resolve(state, "interfaces") {
            Some(Value::Array(rows)) => rows.iter().filter_map(parse_interface).collect(),
            _ => Vec::new(),
        };
        let tls = self.loaded.as_ref().is_some_and(ConfigResponse::tls_required);

        let payload = SavePayload {
            host: hostid.is_none().then(|| self.store.get_str("host").to_string()),
            hostid,
            groups,
            templateid: self.store.get_str("template_selected").to_string(),
            tls_psk_identity: tls.then(|| self.store.get_str("tls_psk_identity").to_string()),
            tls_psk: tls.then(|| self.store.get_str("tls_psk").to_string()),
            interfaces,
            macros: macro_inputs(paths::resolve(state, "macros")),
            csrf_token: self.initial.csrf_token.clone(),
        };
        (action, payload)
    }
}
