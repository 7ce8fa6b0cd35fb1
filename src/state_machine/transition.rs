//! Pure state transition function
//!
//! Given a conversation and the inbound text, compute the next node, the
//! handoff flag, and the replies to send. No I/O, no clock.

use super::{ConvState, Conversation, Effect, Route};
use crate::menu::{BOT_RESUMED, GOODBYE, HANDOFF_END_PHRASE, HANDOFF_WAIT, INVALID_CHOICE};

/// Result of a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub handoff: bool,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConvState, handoff: bool) -> Self {
        Self {
            new_state: state,
            handoff,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// The conversation record after this transition
    pub fn conversation(&self) -> Conversation {
        Conversation {
            state: self.new_state,
            human_handoff_active: self.handoff,
        }
    }

    /// Text of the first reply, if any
    #[allow(dead_code)]
    pub fn reply_text(&self) -> Option<&str> {
        self.effects.iter().find_map(|effect| match effect {
            Effect::Reply { text } => Some(text.as_str()),
            Effect::EndConversation => None,
        })
    }

    #[allow(dead_code)]
    pub fn ends_conversation(&self) -> bool {
        self.effects.contains(&Effect::EndConversation)
    }
}

/// Pure transition function
///
/// Inputs are trimmed before matching. While a human agent holds the
/// conversation, only the release phrase produces a reply.
pub fn transition(conversation: &Conversation, input: &str) -> TransitionResult {
    let input = input.trim();

    if conversation.human_handoff_active {
        return handoff_transition(conversation, input);
    }

    let state = conversation.state;
    match state.route(input) {
        Some(Route::Goto(next)) => {
            TransitionResult::new(next, false).with_effect(Effect::reply(next.menu().render()))
        }
        Some(Route::Stay) => {
            TransitionResult::new(state, false).with_effect(Effect::reply(state.menu().render()))
        }
        Some(Route::Handoff) => {
            TransitionResult::new(state, true).with_effect(Effect::reply(HANDOFF_WAIT))
        }
        Some(Route::End) => TransitionResult::new(state, false)
            .with_effect(Effect::reply(GOODBYE))
            .with_effect(Effect::EndConversation),
        None => TransitionResult::new(state, false).with_effect(Effect::reply(invalid_choice(state))),
    }
}

fn handoff_transition(conversation: &Conversation, input: &str) -> TransitionResult {
    if is_handoff_release(input) {
        let text = format!("{BOT_RESUMED}\n\n{}", ConvState::Main.menu().render());
        TransitionResult::new(ConvState::Main, false).with_effect(Effect::reply(text))
    } else {
        // The human agent answers out-of-band
        TransitionResult::new(conversation.state, true)
    }
}

pub fn is_handoff_release(input: &str) -> bool {
    input.trim().to_lowercase() == HANDOFF_END_PHRASE
}

/// Reprompt shown for an unrecognized choice on `state`
pub fn invalid_choice(state: ConvState) -> String {
    format!("{INVALID_CHOICE}\n\n{}", state.menu().render())
}
