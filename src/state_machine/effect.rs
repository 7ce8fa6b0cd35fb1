//! Effects produced by state transitions

/// Effects to be executed by the dispatcher after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send a bot reply (the dispatcher appends the bot suffix)
    Reply { text: String },

    /// Cancel the inactivity timer and drop the conversation
    EndConversation,
}

impl Effect {
    pub fn reply(text: impl Into<String>) -> Self {
        Effect::Reply { text: text.into() }
    }
}
