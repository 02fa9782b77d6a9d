use host_wizard::enums::Step;
use host_wizard::sequencer::compute_queue;
use host_wizard::types::ConfigResponse;
use proptest::prelude::*;
use serde_json::json;

fn arb_config() -> impl Strategy<Value = Option<ConfigResponse>> {
    let config = (
        any::<[bool; 5]>(),
        prop_oneof![Just(""), Just("  "), Just("Readme text.")],
        0i64..4,
    )
        .prop_map(|(flags, readme, field_type)| {
            serde_json::from_value::<ConfigResponse>(json!({
                "template": {
                    "templateid": "10001",
                    "name": "T",
                    "readme": readme,
                    "macros": [{"macro": "{$A}", "config": {"type": field_type}}]
                },
                "agent_interface_required": flags[0],
                "snmp_interface_required": flags[1],
                "ipmi_interface_required": flags[2],
                "jmx_interface_required": flags[3],
                "install_agent_required": flags[4]
            }))
            .ok()
        });
    prop_oneof![Just(None), config]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn queue_is_ordered_and_pure(
        config in arb_config(),
        dismissed in prop_oneof![Just("0"), Just("1"), Just("")],
        show_welcome in any::<bool>(),
    ) {
        let state = json!({"do_not_show_welcome": dismissed});
        let queue = compute_queue(&state, config.as_ref(), show_welcome);

        prop_assert_eq!(&queue, &compute_queue(&state, config.as_ref(), show_welcome));
        prop_assert!(queue.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(queue.contains(&Step::Welcome), show_welcome && dismissed != "1");
        prop_assert!(queue.contains(&Step::SelectTemplate) && queue.contains(&Step::CreateHost));
        prop_assert_eq!(&queue[queue.len() - 2..], &[Step::Finish, Step::Complete]);

        if config.is_none() {
            prop_assert!(!queue.contains(&Step::InstallAgent));
            prop_assert!(!queue.contains(&Step::ConfigureHost));
        }
    }
}
