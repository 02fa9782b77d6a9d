use super::common::{linux_cpu_config, snmp_config};
use host_wizard::enums::Step;
use host_wizard::sequencer::*;
use host_wizard::types::ConfigResponse;
use serde_json::json;

fn config(value: serde_json::Value) -> ConfigResponse {
    serde_json::from_value(value).unwrap()
}

// ─── compute_queue ───────────────────────────────────────────────────────────

#[test]
fn fixed_steps_without_config() {
    let queue = compute_queue(&json!({}), None, true);
    assert_eq!(
        queue,
        vec![Step::Welcome, Step::SelectTemplate, Step::CreateHost, Step::Finish, Step::Complete]
    );

    let queue = compute_queue(&json!({"do_not_show_welcome": "1"}), None, true);
    assert_eq!(queue[0], Step::SelectTemplate);
    let queue = compute_queue(&json!({}), None, false);
    assert_eq!(queue[0], Step::SelectTemplate);
}

#[test]
fn agent_template_with_install() {
    let queue = compute_queue(&json!({}), Some(&linux_cpu_config()), false);
    assert_eq!(
        queue,
        vec![
            Step::SelectTemplate,
            Step::CreateHost,
            Step::InstallAgent,
            Step::Readme,
            Step::ConfigureHost,
            Step::Finish,
            Step::Complete
        ]
    );
}

#[test]
fn interface_step_conditions() {
    let queue = compute_queue(&json!({}), Some(&snmp_config()), false);
    assert!(queue.contains(&Step::AddInterface));
    assert!(!queue.contains(&Step::InstallAgent));

    // Agent interface without the install step needs its own interface row.
    let agent_only = config(json!({
        "template": {"templateid": "1", "name": "Agent"},
        "agent_interface_required": 1
    }));
    let queue = compute_queue(&json!({}), Some(&agent_only), false);
    assert!(queue.contains(&Step::AddInterface));

    let bare = config(json!({
        "template": {"templateid": "1", "name": "HTTP", "readme": "  \n "}
    }));
    let queue = compute_queue(&json!({}), Some(&bare), false);
    assert_eq!(
        queue,
        vec![Step::SelectTemplate, Step::CreateHost, Step::Finish, Step::Complete]
    );
}

// ─── StepSequencer ───────────────────────────────────────────────────────────

#[test]
fn advance_and_back() {
    let mut seq = StepSequencer::new(vec![Step::Welcome, Step::SelectTemplate, Step::CreateHost, Step::Finish, Step::Complete]);
    assert_eq!(seq.current(), Step::Welcome);
    assert!(!seq.can_go_back());
    assert_eq!(seq.back(), None);

    assert_eq!(seq.advance(), Step::SelectTemplate);
    assert_eq!(seq.advance(), Step::CreateHost);
    assert_eq!(seq.index(), Some(2));
    assert!(seq.can_go_back());
    assert_eq!(seq.back(), Some(Step::SelectTemplate));

    assert_eq!(seq.advance(), Step::CreateHost);
    assert_eq!(seq.advance(), Step::Finish);
    assert_eq!(seq.advance(), Step::Complete);
    assert!(seq.is_terminal());
    assert!(!seq.can_go_back());
    assert_eq!(seq.advance(), Step::Complete);
}

#[test]
fn queue_changes_keep_the_cursor_meaningful() {
    let mut seq = StepSequencer::new(vec![Step::SelectTemplate, Step::CreateHost, Step::Finish, Step::Complete]);
    seq.advance();

    let removed = seq.set_queue(vec![
        Step::SelectTemplate,
        Step::CreateHost,
        Step::AddInterface,
        Step::Readme,
        Step::Finish,
        Step::Complete,
    ]);
    assert!(removed.is_empty());
    assert_eq!(seq.advance(), Step::AddInterface);

    // The current step left the queue: advancing picks the next one after it.
    let removed = seq.set_queue(vec![Step::SelectTemplate, Step::CreateHost, Step::Readme, Step::Finish, Step::Complete]);
    assert_eq!(removed, vec![Step::AddInterface]);
    assert!(!seq.contains(Step::AddInterface));
    assert_eq!(seq.index(), None);
    assert_eq!(seq.advance(), Step::Readme);
}
