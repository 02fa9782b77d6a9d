//! Two-way binding between state paths and form controls.
//!
//! Each rendered step comes with a [`FormSchema`] listing its controls. The
//! binder pushes state into a [`FormView`] and turns control events back into
//! store writes.

use crate::enums::ControlKind;
use crate::paths::{self, value_to_text};
use crate::store::ReactiveStore;
use crate::validate::ValidationEngine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_CHECKED: &str = "1";
pub const DEFAULT_UNCHECKED: &str = "0";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    #[serde(default)]
    pub disabled: bool,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        SelectOption {
            value: value.into(),
            label: label.into(),
            disabled: false,
        }
    }
}

/// One control of a rendered step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Input name, e.g. `macros[0][value]`.
    pub name: String,
    /// Dotted state path, e.g. `macros.0.value`.
    pub path: String,
    pub control: ControlKind,
    /// Value stored when a checkbox is checked.
    pub checked_value: String,
    /// Value stored when a checkbox is unchecked.
    pub unchecked_value: String,
    #[serde(default)]
    pub options: Vec<SelectOption>,
}

impl FieldSpec {
    pub fn new(path: impl Into<String>, control: ControlKind) -> Self {
        let path = path.into();
        FieldSpec {
            name: paths::path_to_input_name(&path),
            path,
            control,
            checked_value: DEFAULT_CHECKED.to_string(),
            unchecked_value: DEFAULT_UNCHECKED.to_string(),
            options: Vec::new(),
        }
    }

    pub fn checkbox(path: impl Into<String>, checked: &str, unchecked: &str) -> Self {
        let mut spec = FieldSpec::new(path, ControlKind::Checkbox);
        spec.checked_value = checked.to_string();
        spec.unchecked_value = unchecked.to_string();
        spec
    }

    pub fn with_options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = options;
        self
    }
}

/// Ordered list of the controls of one rendered step.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSchema {
    fields: Vec<FieldSpec>,
}

impl FormSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: FieldSpec) {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }

    pub fn by_name(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn by_path(&self, path: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.path == path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// ─── View seam ───────────────────────────────────────────────────────────────

/// State a control should display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlState {
    Value(String),
    Checked(bool),
    /// Radio group: the option with this value is checked.
    Selected(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlUpdate {
    pub name: String,
    pub state: ControlState,
}

/// A front end holding rendered controls.
pub trait FormView {
    fn apply(&mut self, update: &ControlUpdate);
}

/// In-memory [`FormView`] keeping the last state of every control.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormModel {
    pub controls: std::collections::BTreeMap<String, ControlState>,
}

impl FormView for FormModel {
    fn apply(&mut self, update: &ControlUpdate) {
        self.controls.insert(update.name.clone(), update.state.clone());
    }
}

/// A value change reported by a control.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputEvent {
    pub name: String,
    pub value: String,
    /// Checked state, for checkboxes and radios.
    pub checked: bool,
}

impl InputEvent {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        InputEvent {
            name: name.into(),
            value: value.into(),
            checked: false,
        }
    }

    pub fn checkbox(name: impl Into<String>, checked: bool) -> Self {
        InputEvent {
            name: name.into(),
            value: String::new(),
            checked,
        }
    }
}

/// Result of a focus-out event.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlurOutcome {
    /// Trimmed text to push back into the control, when trimming changed it.
    pub update: Option<ControlUpdate>,
    pub error: Option<String>,
}

// ─── FormBinder ──────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default)]
pub struct FormBinder {
    schema: FormSchema,
}

impl FormBinder {
    pub fn new(schema: FormSchema) -> Self {
        FormBinder { schema }
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn set_schema(&mut self, schema: FormSchema) {
        self.schema = schema;
    }

    /// Control updates reflecting `state`, in state order.
    pub fn outbound(&self, state: &Value) -> Vec<ControlUpdate> {
        paths::flatten(state)
            .into_iter()
            .filter_map(|(name, value)| {
                let field = self.schema.by_name(&name)?;
                let shown = match field.control {
                    ControlKind::Checkbox => {
                        ControlState::Checked(value_to_text(&value) == field.checked_value)
                    }
                    ControlKind::Radio => ControlState::Selected(value_to_text(&value)),
                    // Containers are rendered per leaf.
                    _ if value.is_object() || value.is_array() => return None,
                    _ => ControlState::Value(value_to_text(&value)),
                };
                Some(ControlUpdate { name, state: shown })
            })
            .collect()
    }

    pub fn sync_to_view(&self, state: &Value, view: &mut impl FormView) {
        for update in self.outbound(state) {
            view.apply(&update);
        }
    }

    /// Path and control kind behind an input name.
    pub fn resolve_name(&self, name: &str) -> (String, ControlKind) {
        match self.schema.by_name(name) {
            Some(field) => (field.path.clone(), field.control),
            None => (paths::input_name_to_path(name), ControlKind::Text),
        }
    }

    /// Writes a control change into the store. Returns the affected path.
    pub fn handle_input(&self, event: &InputEvent, store: &mut ReactiveStore) -> String {
        let (path, control) = self.resolve_name(&event.name);
        let value = match (control, self.schema.by_name(&event.name)) {
            (ControlKind::Checkbox, Some(field)) => {
                if event.checked {
                    field.checked_value.clone()
                } else {
                    field.unchecked_value.clone()
                }
            }
            (ControlKind::Checkbox, None) => {
                if event.checked { DEFAULT_CHECKED } else { DEFAULT_UNCHECKED }.to_string()
            }
            _ => event.value.clone(),
        };
        store.set(&path, Value::String(value));
        path
    }

    /// Trims the control text if its kind asks for it and validates the
    /// single field behind it.
    pub fn handle_blur(
        &self,
        name: &str,
        view_text: &str,
        store: &mut ReactiveStore,
        engine: &mut ValidationEngine,
    ) -> BlurOutcome {
        let (path, control) = self.resolve_name(name);
        let mut outcome = BlurOutcome::default();

        if control.trims_on_blur() {
            let trimmed = view_text.trim();
            if trimmed != view_text {
                outcome.update = Some(ControlUpdate {
                    name: name.to_string(),
                    state: ControlState::Value(trimmed.to_string()),
                });
            }
            store.set(&path, Value::String(trimmed.to_string()));
        }

        outcome.error = engine.validate_field(&path, store.data());
        outcome
    }
}
