use host_wizard::paths::*;
use serde_json::{Value, json};

// ─── Name / path conversion ──────────────────────────────────────────────────

#[test]
fn input_names_become_dotted_paths() {
    let cases = [
        ("host", "host"),
        ("macros[0][value]", "macros.0.value"),
        ("interfaces[1][details][community]", "interfaces.1.details.community"),
        ("groups[]", "groups"),
        ("broken[0", "broken.0"),
    ];
    for (name, expected) in cases {
        assert_eq!(input_name_to_path(name), expected, "name: {}", name);
    }
}

#[test]
fn dotted_paths_become_input_names() {
    assert_eq!(path_to_input_name("macros.0.value"), "macros[0][value]");
    assert_eq!(path_to_input_name("host"), "host");
    assert_eq!(path_to_input_name(""), "");
}

#[test]
fn index_segments_have_no_leading_zero() {
    assert_eq!(split_path("a.0.10"), vec![
        Segment::Key("a".into()),
        Segment::Index(0),
        Segment::Index(10)
    ]);
    assert_eq!(split_path("a.01"), vec![Segment::Key("a".into()), Segment::Key("01".into())]);
}

// ─── Tree access ─────────────────────────────────────────────────────────────

#[test]
fn resolve_missing_intermediate_is_none() {
    let state = json!({"macros": [{"value": "1"}]});
    assert_eq!(resolve(&state, "macros.0.value"), Some(&json!("1")));
    assert_eq!(resolve(&state, "macros.3.value"), None);
    assert_eq!(resolve(&state, "host.name"), None);
    assert_eq!(resolve(&state, "macros.value"), None);
    assert_eq!(resolve(&state, ""), Some(&state));
}

#[test]
fn assign_creates_containers_and_pads_arrays() {
    let mut state = json!({});
    assert_eq!(assign(&mut state, "interfaces.2.ip", json!("10.0.0.1")), None);
    assert_eq!(
        state,
        json!({"interfaces": [null, null, {"ip": "10.0.0.1"}]})
    );

    let old = assign(&mut state, "interfaces.2.ip", json!("10.0.0.2"));
    assert_eq!(old, Some(json!("10.0.0.1")));
}

#[test]
fn named_key_under_array_keeps_rows() {
    let mut state = json!({"interfaces": [{"ip": "10.0.0.1"}, {"ip": "10.0.0.2"}]});
    let before = state.clone();

    assert!(!is_assignable(&state, "interfaces.foo"));
    assert_eq!(assign(&mut state, "interfaces.foo", json!("x")), None);
    assert_eq!(assign(&mut state, "interfaces.foo.bar", json!("x")), None);
    assert_eq!(state, before);

    assert!(is_assignable(&state, "interfaces.1.port"));
    assert_eq!(assign(&mut state, "interfaces.1.port", json!("10050")), None);
    assert_eq!(resolve(&state, "interfaces.1.port"), Some(&json!("10050")));
}

#[test]
fn remove_shifts_array_rows() {
    let mut state = json!({"macros": [{"m": "A"}, {"m": "B"}, {"m": "C"}]});
    assert_eq!(remove(&mut state, "macros.1"), Some(json!({"m": "B"})));
    assert_eq!(resolve(&state, "macros.1.m"), Some(&json!("C")));
    assert_eq!(remove(&mut state, "macros.5"), None);
}

#[test]
fn remove_object_key_keeps_order() {
    let mut state = json!({"a": 1, "b": 2, "c": 3});
    remove(&mut state, "b");
    let keys: Vec<&String> = state.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["a", "c"]);
}

#[test]
fn flatten_emits_input_names() {
    let state = json!({
        "host": "web01",
        "macros": [{"macro": "{$A}", "value": "1"}],
        "groups": []
    });
    let flat = flatten(&state);
    assert_eq!(
        flat,
        vec![
            ("host".to_string(), json!("web01")),
            ("macros[0][macro]".to_string(), json!("{$A}")),
            ("macros[0][value]".to_string(), json!("1")),
            ("groups".to_string(), json!([])),
        ]
    );
    for (name, value) in &flat {
        assert_eq!(resolve(&state, &input_name_to_path(name)), Some(value));
    }
}

#[test]
fn empty_values() {
    assert!(is_empty_value(&Value::Null));
    assert!(is_empty_value(&json!("")));
    assert!(is_empty_value(&json!([])));
    assert!(!is_empty_value(&json!(0)));
    assert!(!is_empty_value(&json!({})));
    assert_eq!(value_to_text(&json!(true)), "1");
    assert_eq!(value_to_text(&json!(161)), "161");
}
