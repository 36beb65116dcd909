#[cfg(test)]
mod tests {
    use crate::events::{RunEvent, TransitionStatus, classify};
    use crate::session::progress::{COMPLETE, MAX_STEP_PROGRESS, MAX_TICK_PROGRESS, ProgressMachine};
    use crate::session::steps::{StepRegistry, builtin_steps};
    use crate::types::{RunId, StepKey};
    use proptest::prelude::*;

    fn arb_step_key() -> impl Strategy<Value = StepKey> {
        let mut keys: Vec<StepKey> = builtin_steps().into_iter().map(|s| s.key).collect();
        keys.push(StepKey::from("unknown_scan"));
        proptest::sample::select(keys)
    }

    fn arb_status() -> impl Strategy<Value = TransitionStatus> {
        prop_oneof![
            Just(TransitionStatus::Running),
            Just(TransitionStatus::Done),
            Just(TransitionStatus::Skip),
        ]
    }

    fn arb_event() -> impl Strategy<Value = RunEvent> {
        prop_oneof![
            4 => (arb_step_key(), arb_status())
                .prop_map(|(step, status)| RunEvent::StepTransition { step, status }),
            2 => Just(RunEvent::ProgressTick { text: "running (1m0s), 10/10 VUs".to_string() }),
            1 => "[a-z ]{1,20}".prop_map(|text| RunEvent::LogLine { text }),
            1 => "[a-z ]{1,20}".prop_map(|message| RunEvent::HardError { message }),
        ]
    }

    fn arb_line() -> impl Strategy<Value = String> {
        prop_oneof![
            (arb_step_key(), prop_oneof![Just("start"), Just("done"), Just("skip"), Just("bogus")])
                .prop_map(|(step, status)| format!("PROGRESS:{step}:{status}")),
            Just("PROGRESS:ssl".to_string()),
            Just("running".to_string()),
            Just("__FINISHED__".to_string()),
            "[ -~]{0,30}",
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_progress_never_decreases(
            events in prop::collection::vec(arb_event(), 0..60),
            budget in prop::option::of(0u64..120),
        ) {
            let mut machine = ProgressMachine::new(StepRegistry::builtin(), budget);
            let mut previous = machine.progress();
            for event in events {
                machine.apply(event);
                prop_assert!(machine.progress() >= previous);
                prop_assert!(machine.progress() <= MAX_STEP_PROGRESS);
                previous = machine.progress();
            }
            prop_assert!(!machine.is_resolved());
        }

        #[test]
        fn prop_ticks_alone_stay_at_or_below_eighty(
            ticks in 0usize..500,
            budget in 0u64..300,
        ) {
            let mut machine = ProgressMachine::new(StepRegistry::builtin(), Some(budget));
            for _ in 0..ticks {
                machine.apply(RunEvent::ProgressTick { text: "running".to_string() });
            }
            prop_assert!(machine.progress() <= MAX_TICK_PROGRESS);
        }

        #[test]
        fn prop_completion_reaches_hundred_and_settles_steps(
            events in prop::collection::vec(arb_event(), 0..40),
            id in "[a-z0-9]{1,12}",
        ) {
            let mut machine = ProgressMachine::new(StepRegistry::builtin(), Some(60));
            for event in events {
                machine.apply(event);
            }
            let run_id = RunId::new(&id).unwrap();
            machine.apply(RunEvent::RunCompleted { run_id });
            prop_assert_eq!(machine.progress(), COMPLETE);
            prop_assert!(machine.steps().iter().all(|step| step.status.is_settled()));
        }

        #[test]
        fn prop_classified_lines_keep_progress_monotonic(
            lines in prop::collection::vec(arb_line(), 0..60),
        ) {
            let mut machine = ProgressMachine::new(StepRegistry::builtin(), Some(30));
            let mut previous = 0;
            for line in lines {
                if let Some(event) = classify(&line) {
                    machine.apply(event);
                }
                prop_assert!(machine.progress() >= previous);
                previous = machine.progress();
            }
        }
    }
}
