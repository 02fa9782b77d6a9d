//! Template macros shown on the configure step.
//!
//! Only macros whose wizard config is not `NoConf` are configurable. Their
//! value comes from the host when it already defines the macro, otherwise from
//! the template default.

use crate::enums::{MacroFieldType, MacroType};
use crate::rules::{Pattern, ValidationRule};
use crate::types::{Host, MacroInput, Template, TemplateMacro};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::warn;

/// A macro value replaced because it was not an allowed option.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroReset {
    #[serde(rename = "macro")]
    pub name: String,
    pub label: String,
    pub previous: String,
    pub value: String,
}

impl MacroReset {
    pub fn warning(&self) -> String {
        format!(
            "{}: value \"{}\" is no longer available and was reset to \"{}\".",
            display_label(&self.label, &self.name),
            self.previous,
            self.value
        )
    }
}

fn display_label<'a>(label: &'a str, name: &'a str) -> &'a str {
    if label.is_empty() { name } else { label }
}

/// Configurable macros of `template`, ordered by priority then name.
pub fn configurable_macros(template: &Template) -> Vec<&TemplateMacro> {
    let mut macros: Vec<&TemplateMacro> = template
        .macros
        .iter()
        .filter(|m| m.config.field_type != MacroFieldType::NoConf)
        .collect();
    macros.sort_by(|a, b| {
        a.config
            .priority
            .cmp(&b.config.priority)
            .then_with(|| a.name.cmp(&b.name))
    });
    macros
}

pub fn has_configurable_macros(template: &Template) -> bool {
    template
        .macros
        .iter()
        .any(|m| m.config.field_type != MacroFieldType::NoConf)
}

/// Builds the `macros` state rows and the list of reset values.
///
/// A list value that is not among the allowed options falls back to the
/// first option; a checkbox value that is neither state falls back to
/// unchecked.
pub fn merge_macros(template: &Template, host: Option<&Host>) -> (Vec<Value>, Vec<MacroReset>) {
    let mut rows = Vec::new();
    let mut resets = Vec::new();

    for template_macro in configurable_macros(template) {
        let config = &template_macro.config;
        let host_macro = host.and_then(|h| h.macros.iter().find(|m| m.name == template_macro.name));
        let mut value = host_macro
            .map(|m| m.value.clone())
            .unwrap_or_else(|| template_macro.value.clone());
        let macro_type = host_macro
            .map(|m| m.macro_type)
            .unwrap_or(template_macro.macro_type);

        let fallback = match config.field_type {
            MacroFieldType::List => {
                let allowed = config.list_values();
                (!allowed.contains(&value.as_str()))
                    .then(|| allowed.first().map(|v| v.to_string()))
                    .flatten()
            }
            MacroFieldType::Checkbox => config.checkbox_values().and_then(|(checked, unchecked)| {
                (value != checked && value != unchecked).then(|| unchecked.to_string())
            }),
            MacroFieldType::Text | MacroFieldType::NoConf => None,
        };

        if let Some(new_value) = fallback {
            warn!(
                macro_name = %template_macro.name,
                previous = %value,
                value = %new_value,
                "macro value reset"
            );
            resets.push(MacroReset {
                name: template_macro.name.clone(),
                label: config.label.clone(),
                previous: std::mem::replace(&mut value, new_value.clone()),
                value: new_value,
            });
        }

        rows.push(json!({
            "macro": template_macro.name,
            "value": value,
            "type": i64::from(macro_type),
            "description": template_macro.description,
        }));
    }

    (rows, resets)
}

/// Validation rules for the value of each configurable macro row.
pub fn macro_rules(template: &Template) -> Vec<(String, ValidationRule)> {
    let mut out = Vec::new();
    for (i, template_macro) in configurable_macros(template).into_iter().enumerate() {
        let config = &template_macro.config;
        let mut rule = ValidationRule::string().max_length(2048);
        if config.required {
            rule = rule.required();
        }
        if config.field_type == MacroFieldType::Text && !config.regex.is_empty() {
            match Pattern::new(&config.regex) {
                Ok(pattern) => rule = rule.pattern(pattern),
                Err(e) => warn!(macro_name = %template_macro.name, error = %e, "ignoring macro regex"),
            }
        }
        out.push((format!("macros.{}.value", i), rule));
    }
    out
}

/// Macro rows from the state in save form.
pub fn macro_inputs(rows: Option<&Value>) -> Vec<MacroInput> {
    let Some(Value::Array(rows)) = rows else {
        return vec![];
    };
    rows.iter()
        .filter_map(|row| {
            let name = row.get("macro")?.as_str()?.to_string();
            let value = row
                .get("value")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            let macro_type = row
                .get("type")
                .and_then(Value::as_i64)
                .and_then(|code| MacroType::try_from(code).ok())
                .unwrap_or_default();
            Some(MacroInput {
                name,
                value,
                macro_type,
            })
        })
        .collect()
}
