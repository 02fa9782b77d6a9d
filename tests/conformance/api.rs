use host_wizard::api::*;
use host_wizard::error::{ServerError, WizardError};
use host_wizard::types::{ConfigRequest, ConfigResponse, SaveResponse};
use serde_json::json;

#[test]
fn error_envelope() {
    let response = parse_action_response(
        r#"{"error": {"title": "Cannot create host", "messages": ["Host \"web01\" already exists."]}}"#,
    )
    .unwrap();
    assert_eq!(
        response,
        ActionResponse::Error(ServerError {
            title: Some("Cannot create host".to_string()),
            messages: vec!["Host \"web01\" already exists.".to_string()],
        })
    );

    let response = parse_action_response(r#"{"error": "Session expired."}"#).unwrap();
    assert_eq!(
        response,
        ActionResponse::Error(ServerError {
            title: None,
            messages: vec!["Session expired.".to_string()],
        })
    );
}

#[test]
fn form_errors_accept_slash_paths_and_input_names() {
    let response = parse_action_response(
        r#"{"form_errors": {
            "/macros/0/value": {"message": "Incorrect value."},
            "interfaces[1][ip]": ["Invalid IP address.", "Second message."],
            "host": "Host name is taken.",
            "ignored": 5
        }}"#,
    )
    .unwrap();
    let ActionResponse::FormErrors(errors) = response else {
        panic!("expected form errors, got {:?}", response);
    };
    assert_eq!(errors.len(), 3);
    assert_eq!(errors["macros.0.value"], "Incorrect value.");
    assert_eq!(errors["interfaces.1.ip"], "Invalid IP address.");
    assert_eq!(errors["host"], "Host name is taken.");
}

#[test]
fn success_and_data() {
    let response = parse_action_response(r#"{"success": {"title": "Host created"}}"#).unwrap();
    assert_eq!(
        response,
        ActionResponse::Success {
            title: Some("Host created".to_string()),
            messages: vec![],
        }
    );

    let response = parse_action_response(r#"{"success": "Done"}"#).unwrap();
    assert!(matches!(response, ActionResponse::Success { title: Some(t), .. } if t == "Done"));

    let response = parse_action_response(r#"{"hostid": "10500"}"#).unwrap();
    assert_eq!(response, ActionResponse::Data(json!({"hostid": "10500"})));
}

#[test]
fn malformed_bodies_are_decode_errors() {
    assert!(matches!(parse_action_response("not json"), Err(WizardError::Decode(_))));
    assert!(matches!(parse_action_response("[1, 2]"), Err(WizardError::Decode(_))));
}

#[test]
fn typed_response_decoding() {
    let saved: SaveResponse = parse_response(r#"{"hostid": 10500}"#).unwrap();
    assert_eq!(saved.hostid, "10500");

    let config: ConfigResponse = parse_response(
        r#"{"template": {"templateid": "10001", "name": "Linux CPU"}, "install_agent_required": 1}"#,
    )
    .unwrap();
    assert_eq!(config.template.name, "Linux CPU");
    assert!(config.install_agent_required);
    assert!(config.host.is_none());

    let err = parse_response::<SaveResponse>(r#"{"error": {"messages": ["No permissions."]}}"#).unwrap_err();
    assert!(matches!(err, WizardError::Server(ref e) if e.messages == ["No permissions."]));

    let err = parse_response::<SaveResponse>(r#"{"form_errors": {"host": "Taken."}}"#).unwrap_err();
    assert!(matches!(err, WizardError::FormErrors(ref map) if map["host"] == "Taken."));

    let err = parse_response::<SaveResponse>(r#"{"success": {}}"#).unwrap_err();
    assert!(matches!(err, WizardError::Decode(_)));
}

#[test]
fn config_request_query() {
    let request = ConfigRequest {
        templateid: "10001".to_string(),
        hostid: None,
    };
    assert_eq!(
        request.query(),
        vec![("action", ACTION_GET.to_string()), ("templateid", "10001".to_string())]
    );

    let request = ConfigRequest {
        templateid: "10001".to_string(),
        hostid: Some("10084".to_string()),
    };
    assert_eq!(request.query().last(), Some(&("hostid", "10084".to_string())));
    assert_eq!(SaveAction::Update.action(), "host.wizard.update");
    assert_eq!(SaveAction::Create.action(), ACTION_CREATE);
}
