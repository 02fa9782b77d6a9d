use super::common::*;
use host_wizard::api::SaveAction;
use host_wizard::binder::InputEvent;
use host_wizard::enums::Step;
use host_wizard::error::{ServerError, WizardError};
use host_wizard::types::GroupInput;
use host_wizard::validate::MSG_REQUIRED;
use host_wizard::wizard::{CancelOutcome, Transition};
use regex::Regex;
use std::collections::BTreeMap;
use std::time::Duration;

async fn to_create_host(wizard: &mut host_wizard::Wizard<StubBackend>) {
    assert_eq!(wizard.step(), Step::Welcome);
    assert_eq!(wizard.next().await.unwrap(), Transition::Advanced(Step::SelectTemplate));
    wizard
        .input(&InputEvent::text("template_selected", "10001"))
        .unwrap();
    assert_eq!(wizard.next().await.unwrap(), Transition::Advanced(Step::CreateHost));
}

// ─── Queue after loading a template ─────────────────────────────────────────

#[tokio::test]
async fn linux_cpu_queue() {
    let mut wizard = open(StubBackend::with_config(linux_cpu_config()));
    assert_eq!(
        wizard.queue(),
        &[Step::Welcome, Step::SelectTemplate, Step::CreateHost, Step::Finish, Step::Complete]
    );

    to_create_host(&mut wizard).await;

    let queue = wizard.queue();
    assert!(queue.contains(&Step::CreateHost));
    assert!(queue.contains(&Step::InstallAgent));
    assert!(queue.contains(&Step::ConfigureHost));
    assert!(queue.contains(&Step::Readme));
    assert!(!queue.contains(&Step::AddInterface));
}

#[tokio::test]
async fn snmp_template_adds_interface_step() {
    let mut wizard = open(StubBackend::with_config(snmp_config()));
    wizard.next().await.unwrap();
    wizard
        .input(&InputEvent::text("template_selected", "10002"))
        .unwrap();
    wizard.next().await.unwrap();

    assert_eq!(
        wizard.queue(),
        &[
            Step::Welcome,
            Step::SelectTemplate,
            Step::CreateHost,
            Step::AddInterface,
            Step::Finish,
            Step::Complete
        ]
    );
    let interfaces = wizard.state()["interfaces"].as_array().unwrap();
    assert_eq!(interfaces.len(), 1);
    assert_eq!(interfaces[0]["port"], "161");
    assert_eq!(interfaces[0]["details"]["community"], "{$SNMP_COMMUNITY}");
}

#[tokio::test]
async fn dismissing_welcome_skips_it() {
    let mut wizard = open(StubBackend::with_config(linux_cpu_config()));
    wizard
        .input(&InputEvent::checkbox("do_not_show_welcome", true))
        .unwrap();
    assert_eq!(wizard.state()["do_not_show_welcome"], "1");

    assert_eq!(wizard.next().await.unwrap(), Transition::Advanced(Step::SelectTemplate));
    assert!(!wizard.queue().contains(&Step::Welcome));
    assert_eq!(wizard.back().unwrap(), None);
}

// ─── Validation blocks advancing ────────────────────────────────────────────

#[tokio::test]
async fn empty_host_blocks_create_host() {
    let mut wizard = open(StubBackend::with_config(linux_cpu_config()));
    to_create_host(&mut wizard).await;

    assert_eq!(wizard.next().await.unwrap(), Transition::Invalid);
    assert_eq!(wizard.step(), Step::CreateHost);
    assert!(wizard.engine().has_errors(Step::CreateHost));
    assert_eq!(wizard.engine().error("host"), Some(MSG_REQUIRED));
    assert!(!wizard.next_enabled());

    let rendered = wizard.render();
    assert_eq!(rendered.field("host").unwrap().error.as_deref(), Some(MSG_REQUIRED));
    assert!(!rendered.next_enabled);

    wizard.input(&InputEvent::text("host", "web01")).unwrap();
    let outcome = wizard.blur("host", "web01").unwrap();
    assert_eq!(outcome.error, None);
    assert!(wizard.next_enabled());
    assert_eq!(wizard.next().await.unwrap(), Transition::Advanced(Step::InstallAgent));
}

#[tokio::test]
async fn missing_template_blocks_select_template() {
    let mut wizard = open(StubBackend::with_config(linux_cpu_config()));
    wizard.next().await.unwrap();

    assert_eq!(wizard.next().await.unwrap(), Transition::Invalid);
    assert_eq!(wizard.step(), Step::SelectTemplate);
    assert_eq!(wizard.engine().error("template_selected"), Some("Select a template."));
}

#[tokio::test]
async fn blur_before_first_next_records_nothing() {
    let mut wizard = open(StubBackend::with_config(linux_cpu_config()));
    to_create_host(&mut wizard).await;

    let outcome = wizard.blur("host", "   ").unwrap();
    assert_eq!(outcome.error.as_deref(), Some(MSG_REQUIRED));
    assert_eq!(wizard.engine().error("host"), None);
}

// ─── PSK material ───────────────────────────────────────────────────────────

#[tokio::test]
async fn psk_generated_on_template_load() {
    let mut wizard = open(StubBackend::with_config(linux_cpu_config()));
    to_create_host(&mut wizard).await;

    let psk = wizard.store().get_str("tls_psk").to_string();
    assert!(Regex::new(r"^[a-fA-F0-9]{64}$").unwrap().is_match(&psk), "psk: {}", psk);

    wizard.input(&InputEvent::text("host", "web01")).unwrap();
    assert_eq!(wizard.store().get_str("tls_psk_identity"), "web01 PSK");

    wizard.input(&InputEvent::text("host", "web02")).unwrap();
    assert_eq!(wizard.store().get_str("tls_psk_identity"), "web02 PSK");
}

#[tokio::test]
async fn edited_psk_identity_is_kept() {
    let mut wizard = open(StubBackend::with_config(linux_cpu_config()));
    to_create_host(&mut wizard).await;

    wizard.input(&InputEvent::text("host", "web01")).unwrap();
    wizard
        .input(&InputEvent::text("tls_psk_identity", "custom identity"))
        .unwrap();
    wizard.input(&InputEvent::text("host", "web02")).unwrap();
    assert_eq!(wizard.store().get_str("tls_psk_identity"), "custom identity");
}

// ─── Macro reset ────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_macro_reset_is_a_warning() {
    let mut wizard = open(StubBackend::with_config(linux_cpu_config()));
    to_create_host(&mut wizard).await;

    assert_eq!(wizard.state()["macros"][1]["value"], "user");
    assert_eq!(wizard.macro_resets().len(), 1);
    assert_eq!(wizard.macro_resets()[0].previous, "bogus");

    wizard.input(&InputEvent::text("host", "web01")).unwrap();
    while wizard.step() != Step::ConfigureHost {
        assert!(matches!(wizard.next().await.unwrap(), Transition::Advanced(_)));
    }

    let rendered = wizard.render();
    assert_eq!(
        rendered.warnings(),
        vec!["CPU mode: value \"bogus\" is no longer available and was reset to \"user\"."]
    );
    assert!(!wizard.engine().has_errors(Step::ConfigureHost));
    assert_eq!(wizard.next().await.unwrap(), Transition::Advanced(Step::Finish));
}

// ─── Saving ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn full_walk_saves_host() {
    let backend = StubBackend::with_config(linux_cpu_config());
    let saves = backend.saves.clone();
    let fetches = backend.fetches.clone();
    let mut wizard = open(backend);
    to_create_host(&mut wizard).await;
    wizard.input(&InputEvent::text("host", "web01")).unwrap();

    while wizard.step() != Step::Finish {
        assert!(matches!(wizard.next().await.unwrap(), Transition::Advanced(_)));
    }
    assert_eq!(wizard.render().next_label, "Create");
    assert_eq!(wizard.next().await.unwrap(), Transition::Advanced(Step::Complete));
    assert_eq!(wizard.saved_hostid(), Some("10500"));

    // Leaving CreateHost with the same template and host does not refetch.
    assert_eq!(fetches.lock().unwrap().len(), 1);

    let saves = saves.lock().unwrap();
    let (action, payload) = &saves[0];
    assert_eq!(*action, SaveAction::Create);
    assert_eq!(payload.host.as_deref(), Some("web01"));
    assert_eq!(payload.templateid, "10001");
    assert_eq!(
        payload.groups,
        vec![GroupInput::Existing {
            groupid: "2".to_string()
        }]
    );
    assert_eq!(payload.tls_psk_identity.as_deref(), Some("web01 PSK"));
    assert_eq!(payload.interfaces.len(), 1);
    assert_eq!(payload.macros.len(), 3);
    assert_eq!(payload.csrf_token, "csrf-token");
    drop(saves);

    assert_eq!(wizard.next().await.unwrap(), Transition::Closed);
    assert!(wizard.is_closed());
}

#[tokio::test]
async fn save_error_stays_on_finish() {
    let mut backend = StubBackend::with_config(snmp_config());
    backend.save_error = Some(WizardError::Server(ServerError {
        title: Some("Cannot add host".to_string()),
        messages: vec!["Host with the same name \"sw01\" already exists.".to_string()],
    }));
    let mut wizard = open(backend);
    wizard.next().await.unwrap();
    wizard
        .input(&InputEvent::text("template_selected", "10002"))
        .unwrap();
    wizard.next().await.unwrap();
    wizard.input(&InputEvent::text("host", "sw01")).unwrap();
    while wizard.step() != Step::Finish {
        wizard.next().await.unwrap();
    }
    let before = wizard.state().clone();

    let err = wizard.next().await.unwrap_err();
    assert!(matches!(err, WizardError::Server(_)));
    assert_eq!(wizard.step(), Step::Finish);
    assert!(!wizard.is_busy());
    assert_eq!(wizard.state(), &before);

    let message = wizard.render().message.unwrap();
    assert_eq!(message.title, "Cannot add host");
    wizard.dismiss_message();
    assert!(wizard.message().is_none());
}

#[tokio::test]
async fn save_form_errors_land_on_fields() {
    let mut backend = StubBackend::with_config(snmp_config());
    backend.save_error = Some(WizardError::FormErrors(BTreeMap::from([(
        "host".to_string(),
        "Incorrect host name.".to_string(),
    )])));
    let mut wizard = open(backend);
    wizard.next().await.unwrap();
    wizard
        .input(&InputEvent::text("template_selected", "10002"))
        .unwrap();
    wizard.next().await.unwrap();
    wizard.input(&InputEvent::text("host", "sw01")).unwrap();
    while wizard.step() != Step::Finish {
        wizard.next().await.unwrap();
    }

    assert!(wizard.next().await.is_err());
    assert_eq!(wizard.engine().error("host"), Some("Incorrect host name."));
}

// ─── Closing ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn response_after_close_is_ignored() {
    let backend = StubBackend::with_config(linux_cpu_config());
    let close_slot = backend.close_during_request.clone();
    let mut wizard = open(backend);
    *close_slot.lock().unwrap() = Some(wizard.close_handle());

    wizard.next().await.unwrap();
    wizard
        .input(&InputEvent::text("template_selected", "10001"))
        .unwrap();
    let before = wizard.state().clone();

    assert_eq!(wizard.next().await.unwrap(), Transition::Discarded);
    assert_eq!(wizard.state(), &before);
    assert!(wizard.loaded().is_none());
    assert_eq!(wizard.step(), Step::SelectTemplate);
    assert!(matches!(wizard.next().await, Err(WizardError::Closed)));
}

#[tokio::test]
async fn dropped_request_releases_busy() {
    let mut wizard = open(StubBackend {
        stall: true,
        ..StubBackend::with_config(linux_cpu_config())
    });
    wizard.next().await.unwrap();
    wizard
        .input(&InputEvent::text("template_selected", "10001"))
        .unwrap();

    let pending = tokio::time::timeout(Duration::from_millis(10), wizard.next()).await;
    assert!(pending.is_err());
    assert!(!wizard.is_busy());
    assert!(wizard.next_enabled());
    assert_eq!(wizard.step(), Step::SelectTemplate);
    assert_eq!(wizard.back().unwrap(), Some(Step::Welcome));
}

#[tokio::test]
async fn fetch_failure_keeps_step() {
    let mut wizard = open(StubBackend::default());
    wizard.next().await.unwrap();
    wizard
        .input(&InputEvent::text("template_selected", "10001"))
        .unwrap();

    let err = wizard.next().await.unwrap_err();
    assert!(matches!(err, WizardError::Transport(_)));
    assert_eq!(wizard.step(), Step::SelectTemplate);
    assert_eq!(wizard.message().unwrap().messages, vec!["no config".to_string()]);
}

#[tokio::test]
async fn cancel_needs_confirmation_once_template_selected() {
    let mut wizard = open(StubBackend::with_config(linux_cpu_config()));
    wizard.next().await.unwrap();
    wizard
        .input(&InputEvent::text("template_selected", "10001"))
        .unwrap();

    assert_eq!(wizard.cancel(), CancelOutcome::ConfirmationRequired);
    assert!(wizard.render().cancel_confirmation);
    wizard.abort_cancel();
    assert!(!wizard.render().cancel_confirmation);
    assert_eq!(wizard.step(), Step::SelectTemplate);

    assert_eq!(wizard.cancel(), CancelOutcome::ConfirmationRequired);
    wizard.confirm_cancel();
    assert!(wizard.is_closed());
    assert!(wizard.store().get("template_selected").is_none());
}

#[tokio::test]
async fn cancel_without_template_closes() {
    let mut wizard = open(StubBackend::default());
    assert_eq!(wizard.cancel(), CancelOutcome::Closed);
    assert!(wizard.is_closed());
}

// ─── Rows ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn interface_blur_tracks_next_button() {
    let mut wizard = open(StubBackend::with_config(snmp_config()));
    wizard.next().await.unwrap();
    wizard
        .input(&InputEvent::text("template_selected", "10002"))
        .unwrap();
    wizard.next().await.unwrap();
    wizard.input(&InputEvent::text("host", "sw01")).unwrap();
    assert_eq!(wizard.next().await.unwrap(), Transition::Advanced(Step::AddInterface));

    wizard.input(&InputEvent::text("interfaces[0][ip]", "")).unwrap();
    assert_eq!(wizard.next().await.unwrap(), Transition::Invalid);
    assert!(!wizard.next_enabled());

    // Fixing the field clears the row and the list errors too.
    wizard.input(&InputEvent::text("interfaces[0][ip]", "10.0.0.1")).unwrap();
    assert_eq!(wizard.blur("interfaces[0][ip]", "10.0.0.1").unwrap().error, None);
    assert!(wizard.engine().errors().is_empty());
    assert!(wizard.next_enabled());

    wizard.input(&InputEvent::text("interfaces[0][port]", "")).unwrap();
    let outcome = wizard.blur("interfaces[0][port]", "").unwrap();
    assert_eq!(outcome.error.as_deref(), Some(MSG_REQUIRED));
    assert!(wizard.engine().has_errors(Step::AddInterface));
    assert!(!wizard.next_enabled());

    wizard.input(&InputEvent::text("interfaces[0][port]", "161")).unwrap();
    wizard.blur("interfaces[0][port]", "161").unwrap();
    assert!(wizard.next_enabled());
    assert_eq!(wizard.next().await.unwrap(), Transition::Advanced(Step::Finish));
}

#[tokio::test]
async fn removing_interface_row_shifts_later_rows() {
    let mut wizard = open(StubBackend::with_config(snmp_config()));
    wizard.next().await.unwrap();
    wizard
        .input(&InputEvent::text("template_selected", "10002"))
        .unwrap();
    wizard.next().await.unwrap();

    let added = wizard
        .add_interface(host_wizard::enums::InterfaceType::Jmx)
        .unwrap();
    assert_eq!(added, 1);
    wizard.remove_row("interfaces", 0).unwrap();

    let rows = wizard.state()["interfaces"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["port"], "12345");
}

#[tokio::test]
async fn new_group_is_saved_by_name() {
    let backend = StubBackend::with_config(snmp_config());
    let saves = backend.saves.clone();
    let mut wizard = open(backend);
    wizard.next().await.unwrap();
    wizard
        .input(&InputEvent::text("template_selected", "10002"))
        .unwrap();
    wizard.next().await.unwrap();
    wizard.input(&InputEvent::text("host", "sw01")).unwrap();
    wizard.remove_row("groups", 0).unwrap();

    assert_eq!(wizard.next().await.unwrap(), Transition::Invalid);
    assert_eq!(wizard.engine().error("groups"), Some(MSG_REQUIRED));
    assert!(wizard.render().field("groups_ms").is_some());

    wizard.add_new_group("Switches").unwrap();
    assert_eq!(wizard.engine().error("groups"), None);
    while wizard.step() != Step::Complete {
        wizard.next().await.unwrap();
    }
    let saves = saves.lock().unwrap();
    assert_eq!(
        saves[0].1.groups,
        vec![GroupInput::New {
            new: "Switches".to_string()
        }]
    );
}
