//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across arbitrary message sequences.

use super::*;
use crate::templates::generate_from_template;
use chrono::Utc;
use proptest::prelude::*;
use std::collections::HashMap;

// ============================================================================
// Arbitrary Generators
// ============================================================================

/// Messages drawn from a vocabulary that hits every classifier branch
fn arb_message() -> impl Strategy<Value = String> {
    let words = prop_oneof![
        Just("yes"),
        Just("yeah"),
        Just("nope"),
        Just("not"),
        Just("wrong"),
        Just("my"),
        Just("mom"),
        Just("grandparents"),
        Just("growing up"),
        Just("music"),
        Just("films"),
        Just("honestly"),
        Just("maybe"),
        Just("I"),
    ];
    proptest::collection::vec(words, 0..6).prop_map(|w| w.join(" "))
}

fn arb_family_free_message() -> impl Strategy<Value = String> {
    let words = prop_oneof![
        Just("yes"),
        Just("nope"),
        Just("not"),
        Just("music"),
        Just("honestly"),
        Just("maybe"),
        Just("I"),
    ];
    proptest::collection::vec(words, 0..6).prop_map(|w| w.join(" "))
}

/// Free text, including text that looks like placeholders
fn arb_template_value() -> impl Strategy<Value = String> {
    prop_oneof![
        ".{0,30}",
        "[a-z ]{0,8}\\{(emotionalPattern|hiddenTrait|name)\\}[a-z ]{0,8}",
        "[{}a-z]{0,12}",
    ]
}

fn arb_phase() -> impl Strategy<Value = Phase> {
    prop_oneof![
        Just(Phase::Initial),
        Just(Phase::YesResponse),
        Just(Phase::NoResponse),
        Just(Phase::DiggingDeeper),
        Just(Phase::ParentMention),
        Just(Phase::Closure),
        Just(Phase::Unrecognized),
    ]
}

fn run(state: &ConversationState, message: &str) -> ConversationState {
    let update = transition(state, Signals::from_message(message), Utc::now());
    state.clone().apply(&update)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Invariant 1: phases never move backwards from a structured start
    #[test]
    fn prop_phase_is_monotonic(messages in proptest::collection::vec(arb_message(), 0..20)) {
        let mut state = ConversationState::initial("twin", Utc::now());

        for message in &messages {
            let next = run(&state, message);
            prop_assert!(
                next.current_phase.rank() >= state.current_phase.rank(),
                "{:?} -> {:?} on {:?}",
                state.current_phase,
                next.current_phase,
                message
            );
            if state.current_phase.rank() >= 1 {
                prop_assert_ne!(next.current_phase, Phase::Initial);
            }
            if state.current_phase.rank() >= 2 {
                prop_assert!(
                    !matches!(next.current_phase, Phase::YesResponse | Phase::NoResponse),
                    "moved back to {:?} from {:?}",
                    next.current_phase,
                    state.current_phase
                );
            }
            state = next;
        }
    }

    // Invariant 2: parent_mentioned never flips back to false
    #[test]
    fn prop_parent_mention_is_sticky(
        phase in arb_phase(),
        messages in proptest::collection::vec(arb_family_free_message(), 1..10),
    ) {
        let mut state = ConversationState::initial("twin", Utc::now());
        state.current_phase = phase;
        state.parent_mentioned = true;

        for message in &messages {
            state = run(&state, message);
            prop_assert!(state.parent_mentioned, "parent flag cleared by {:?}", message);
        }
    }

    // Invariant 3: the flow never leaves the structured phase set
    #[test]
    fn prop_transitions_produce_structured_phases(phase in arb_phase(), message in arb_message()) {
        let mut state = ConversationState::initial("twin", Utc::now());
        state.current_phase = phase;

        let next = run(&state, &message);
        prop_assert!(next.current_phase.is_structured(), "left unrecognized phase as {:?}", next.current_phase);
        if phase == Phase::Unrecognized {
            prop_assert_eq!(next.current_phase, Phase::Initial);
        }
    }

    // Invariant 4: transitions carry insights through untouched
    #[test]
    fn prop_insights_untouched(
        insights in proptest::collection::vec("[a-z ]{1,20}", 0..4),
        message in arb_message(),
    ) {
        let mut state = ConversationState::initial("twin", Utc::now());
        state.insights.clone_from(&insights);

        let next = run(&state, &message);
        prop_assert_eq!(next.insights, insights);
    }

    // Invariant 5: values are inserted verbatim, whatever they contain
    #[test]
    fn prop_dig_deeper_renders_any_values(
        pattern in arb_template_value(),
        trait_text in arb_template_value(),
    ) {
        let vars: HashMap<String, String> = [
            ("emotionalPattern".to_string(), pattern.clone()),
            ("hiddenTrait".to_string(), trait_text.clone()),
        ]
        .into_iter()
        .collect();

        let raw = crate::templates::find_template(crate::templates::DIG_DEEPER).unwrap().template;
        let (head, rest) = raw.split_once("{emotionalPattern}").unwrap();
        let (middle, tail) = rest.split_once("{hiddenTrait}").unwrap();
        let expected = format!("{head}{pattern}{middle}{trait_text}{tail}");

        let text = generate_from_template(crate::templates::DIG_DEEPER, &vars).unwrap();
        prop_assert_eq!(text, expected, "values must be inserted verbatim");
    }
}
