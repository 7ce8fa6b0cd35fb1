//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::state::ROUTES;
use super::transition::*;
use super::*;
use crate::menu::{BOT_RESUMED, HANDOFF_END_PHRASE};
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_state() -> impl Strategy<Value = ConvState> {
    proptest::sample::select(ConvState::ALL.to_vec())
}

fn arb_conversation() -> impl Strategy<Value = Conversation> {
    (arb_state(), any::<bool>()).prop_map(|(state, human_handoff_active)| Conversation {
        state,
        human_handoff_active,
    })
}

/// Free text plus a healthy share of menu-looking digits
fn arb_input() -> impl Strategy<Value = String> {
    prop_oneof![
        "[1-9]".prop_map(String::from),
        "[a-zA-Z0-9 ]{0,12}",
        Just(HANDOFF_END_PHRASE.to_string()),
    ]
}

/// The release phrase with random letter casing
fn arb_release_phrase() -> impl Strategy<Value = String> {
    proptest::collection::vec(any::<bool>(), HANDOFF_END_PHRASE.len()).prop_map(|upper| {
        HANDOFF_END_PHRASE
            .chars()
            .zip(upper)
            .map(|(c, up)| if up { c.to_ascii_uppercase() } else { c })
            .collect()
    })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Unrecognized input re-renders the current menu and never moves
    #[test]
    fn prop_unrecognized_input_reprompts(state in arb_state(), input in arb_input()) {
        prop_assume!(state.route(input.trim()).is_none());

        let conv = Conversation { state, human_handoff_active: false };
        let result = transition(&conv, &input);

        prop_assert_eq!(result.new_state, state);
        prop_assert!(!result.handoff);
        prop_assert!(!result.ends_conversation());
        let expected = invalid_choice(state);
        prop_assert_eq!(result.reply_text(), Some(expected.as_str()));
    }

    /// Outside handoff, every input gets exactly one reply
    #[test]
    fn prop_menu_mode_always_replies(state in arb_state(), input in arb_input()) {
        let conv = Conversation { state, human_handoff_active: false };
        let result = transition(&conv, &input);

        let replies = result
            .effects
            .iter()
            .filter(|e| matches!(e, Effect::Reply { .. }))
            .count();
        prop_assert_eq!(replies, 1);
    }

    /// During handoff nothing but the release phrase produces a reply
    #[test]
    fn prop_handoff_is_silent(state in arb_state(), input in arb_input()) {
        prop_assume!(!is_handoff_release(&input));

        let conv = Conversation { state, human_handoff_active: true };
        let result = transition(&conv, &input);

        prop_assert!(result.effects.is_empty());
        prop_assert_eq!(result.conversation(), conv);
    }

    /// The release phrase matches in any letter case and resets to Main
    #[test]
    fn prop_handoff_release_resets(state in arb_state(), phrase in arb_release_phrase()) {
        let conv = Conversation { state, human_handoff_active: true };
        let result = transition(&conv, &phrase);

        prop_assert_eq!(result.conversation(), Conversation::default());
        prop_assert!(result.reply_text().is_some_and(|t| t.starts_with(BOT_RESUMED)));
    }

    /// Transitions are deterministic
    #[test]
    fn prop_transition_is_pure(conv in arb_conversation(), input in arb_input()) {
        prop_assert_eq!(transition(&conv, &input), transition(&conv, &input));
    }

    /// Random walks only ever follow the routing table
    #[test]
    fn prop_walk_follows_table(inputs in proptest::collection::vec(arb_input(), 0..30)) {
        let mut conv = Conversation::default();

        for input in inputs {
            let before = conv;
            let result = transition(&conv, &input);

            if !before.human_handoff_active {
                match before.state.route(input.trim()) {
                    Some(Route::Goto(next)) => prop_assert_eq!(result.new_state, next),
                    Some(Route::Handoff) => prop_assert!(result.handoff),
                    Some(Route::Stay | Route::End) | None => {
                        prop_assert_eq!(result.new_state, before.state);
                    }
                }
            }

            if result.ends_conversation() {
                conv = Conversation::default();
            } else {
                conv = result.conversation();
            }
        }
    }
}

/// No navigation input targets its own node; only the Produk
/// placeholders (2 and 3) keep the state, and they do so via `Stay`.
#[test]
fn test_no_self_loops_except_produk_placeholders() {
    for (state, input, route) in ROUTES {
        if let Route::Goto(next) = route {
            assert_ne!(next, state, "self-loop at {state:?} on {input}");
        }

        let result = transition(
            &Conversation {
                state: *state,
                human_handoff_active: false,
            },
            input,
        );
        if result.new_state == *state && !result.handoff && !result.ends_conversation() {
            assert_eq!(*state, ConvState::Produk);
            assert!(matches!(*input, "2" | "3"));
        }
    }
}

/// Sending a `Stay` input twice leaves the state unchanged both times
#[test]
fn test_stay_is_idempotent() {
    let conv = Conversation {
        state: ConvState::Produk,
        human_handoff_active: false,
    };
    for input in ["2", "3"] {
        let once = transition(&conv, input).conversation();
        let twice = transition(&once, input).conversation();
        assert_eq!(once, conv);
        assert_eq!(twice, conv);
    }
}
