//! In-memory conversation store
//!
//! Owned by the dispatcher task, which processes one event at a time, so no
//! locking is needed.

use crate::state_machine::Conversation;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: HashMap<String, Conversation>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the conversation for `id`, creating a fresh one at Main.
    ///
    /// The flag is true when the entry was created by this call; the caller
    /// sends the welcome exactly then.
    pub fn get_or_create(&mut self, id: &str) -> (&mut Conversation, bool) {
        match self.conversations.entry(id.to_string()) {
            Entry::Occupied(entry) => (entry.into_mut(), false),
            Entry::Vacant(entry) => (entry.insert(Conversation::default()), true),
        }
    }

    #[allow(dead_code)] // Read access for tests; the dispatcher uses get_or_create
    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.get(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Conversation> {
        self.conversations.remove(id)
    }

    pub fn exists(&self, id: &str) -> bool {
        self.conversations.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    #[allow(dead_code)] // Pairs with len()
    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::ConvState;

    #[test]
    fn test_get_or_create_reports_creation_once() {
        let mut store = ConversationStore::new();

        let (conv, created) = store.get_or_create("a");
        assert!(created);
        assert_eq!(*conv, Conversation::default());
        conv.state = ConvState::Info;

        let (conv, created) = store.get_or_create("a");
        assert!(!created);
        assert_eq!(conv.state, ConvState::Info);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_then_recreate_starts_fresh() {
        let mut store = ConversationStore::new();
        store.get_or_create("a").0.human_handoff_active = true;

        let removed = store.remove("a").unwrap();
        assert!(removed.human_handoff_active);
        assert!(!store.exists("a"));
        assert!(store.remove("a").is_none());

        let (conv, created) = store.get_or_create("a");
        assert!(created);
        assert!(!conv.human_handoff_active);
    }

    #[test]
    fn test_ids_are_independent() {
        let mut store = ConversationStore::new();
        store.get_or_create("a").0.state = ConvState::Produk;
        store.get_or_create("b");

        assert_eq!(store.get("a").map(|c| c.state), Some(ConvState::Produk));
        assert_eq!(store.get("b").map(|c| c.state), Some(ConvState::Main));
        assert!(!store.is_empty());
    }
}
