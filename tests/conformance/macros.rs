use host_wizard::enums::MacroType;
use host_wizard::macros::*;
use host_wizard::rules::RuleKind;
use host_wizard::types::{Host, Template};
use serde_json::json;

fn template() -> Template {
    serde_json::from_value(json!({
        "templateid": "10001",
        "name": "Linux CPU",
        "macros": [
            {
                "macro": "{$MODE}",
                "value": "fast",
                "config": {
                    "type": 2,
                    "priority": 2,
                    "label": "Mode",
                    "options": [{"value": "slow", "text": "Slow"}, {"value": "normal", "text": "Normal"}]
                }
            },
            {
                "macro": "{$ENABLED}",
                "value": "yes",
                "config": {"type": 3, "priority": 2, "options": [{"checked": "true", "unchecked": "false"}]}
            },
            {
                "macro": "{$LIMIT}",
                "value": "10",
                "config": {"type": 1, "priority": 1, "label": "Limit", "required": "1", "regex": "/^\\d+$/"}
            },
            {"macro": "{$PASSWORD}", "value": "", "type": 1, "config": {"type": 1, "priority": 3}},
            {"macro": "{$HIDDEN}", "value": "1", "config": {"type": 0}}
        ]
    }))
    .unwrap()
}

#[test]
fn configurable_macros_order_by_priority_then_name() {
    let template = template();
    let names: Vec<&str> = configurable_macros(&template)
        .into_iter()
        .map(|m| m.name.as_str())
        .collect();
    assert_eq!(names, vec!["{$LIMIT}", "{$ENABLED}", "{$MODE}", "{$PASSWORD}"]);
    assert!(has_configurable_macros(&template));

    let mut hidden_only = template.clone();
    hidden_only.macros.retain(|m| m.name == "{$HIDDEN}");
    assert!(!has_configurable_macros(&hidden_only));
}

#[test]
fn invalid_list_and_checkbox_values_are_reset() {
    let (rows, resets) = merge_macros(&template(), None);

    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0]["macro"], "{$LIMIT}");
    assert_eq!(rows[0]["value"], "10");
    assert_eq!(rows[1]["value"], "false");
    assert_eq!(rows[2]["value"], "slow");
    assert_eq!(rows[3]["type"], i64::from(MacroType::Secret));

    assert_eq!(resets.len(), 2);
    assert_eq!(resets[0].name, "{$ENABLED}");
    assert_eq!(resets[0].previous, "yes");
    assert_eq!(
        resets[1].warning(),
        "Mode: value \"fast\" is no longer available and was reset to \"slow\"."
    );
    assert!(resets[0].warning().starts_with("{$ENABLED}: "));
}

#[test]
fn host_values_override_template_defaults() {
    let host: Host = serde_json::from_value(json!({
        "hostid": "10084",
        "host": "web01",
        "macros": [
            {"macro": "{$LIMIT}", "value": "25"},
            {"macro": "{$MODE}", "value": "normal"}
        ]
    }))
    .unwrap();

    let (rows, resets) = merge_macros(&template(), Some(&host));
    assert_eq!(rows[0]["value"], "25");
    assert_eq!(rows[2]["value"], "normal");
    assert_eq!(resets.len(), 1);
}

#[test]
fn value_rules_follow_macro_config() {
    let rules = macro_rules(&template());
    let paths: Vec<&str> = rules.iter().map(|(p, _)| p.as_str()).collect();
    assert_eq!(paths, vec!["macros.0.value", "macros.1.value", "macros.2.value", "macros.3.value"]);

    let (_, limit) = &rules[0];
    assert_eq!(limit.kind, RuleKind::String);
    assert!(limit.regex.as_ref().is_some_and(|p| p.is_match("42") && !p.is_match("4x")));
    assert!(matches!(limit.required, host_wizard::rules::Requirement::Always));

    // List values are constrained by their options, not a pattern.
    assert!(rules[2].1.regex.is_none());
}

#[test]
fn save_form_of_macro_rows() {
    let rows = json!([
        {"macro": "{$LIMIT}", "value": "10", "type": 0},
        {"macro": "{$PASSWORD}", "value": "s3cret", "type": 1},
        {"value": "orphan"}
    ]);
    let inputs = macro_inputs(Some(&rows));
    assert_eq!(inputs.len(), 2);
    assert_eq!(inputs[1].name, "{$PASSWORD}");
    assert_eq!(inputs[1].macro_type, MacroType::Secret);
    assert!(macro_inputs(None).is_empty());
}
