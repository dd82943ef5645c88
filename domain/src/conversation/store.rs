//! In-memory conversation store - the single source of truth for rendering.

use crate::conversation::command::TurnCommand;
use crate::conversation::entities::{Conversation, ConversationId, ConversationSummary, Turn};
use crate::core::error::DomainError;
use std::collections::HashMap;
use tracing::debug;

/// Holds the conversation list and the loaded conversations.
///
/// At most one conversation is selected for rendering. All turn mutations go
/// through [`execute`](Self::execute), which records nothing by itself but
/// hands back the inverse command to the caller.
#[derive(Debug, Default)]
pub struct ConversationStore {
    summaries: Vec<ConversationSummary>,
    conversations: HashMap<ConversationId, Conversation>,
    selected: Option<ConversationId>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Conversation list ====================

    pub fn summaries(&self) -> &[ConversationSummary] {
        &self.summaries
    }

    /// Replace the list with what the server reported
    pub fn set_summaries(&mut self, summaries: Vec<ConversationSummary>) {
        self.summaries = summaries;
    }

    /// Update a conversation's title in the list and in the loaded copy
    pub fn set_title(&mut self, id: &ConversationId, title: impl Into<String>) {
        let title = title.into();
        if let Some(summary) = self.summaries.iter_mut().find(|s| &s.id == id) {
            summary.title = title.clone();
        }
        if let Some(conversation) = self.conversations.get_mut(id) {
            conversation.title = title;
        }
    }

    /// Forget a conversation entirely. Returns `true` if it was selected.
    pub fn remove_conversation(&mut self, id: &ConversationId) -> bool {
        self.summaries.retain(|s| &s.id != id);
        self.conversations.remove(id);
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
            return true;
        }
        false
    }

    // ==================== Selection ====================

    /// Insert or replace a conversation with its canonical server state
    pub fn load(&mut self, conversation: Conversation) {
        debug!(
            "Loaded conversation {} ({} turns)",
            conversation.id,
            conversation.turns.len()
        );
        self.conversations.insert(conversation.id.clone(), conversation);
    }

    /// Select an already loaded conversation for rendering
    pub fn select(&mut self, id: &ConversationId) -> Result<(), DomainError> {
        if !self.conversations.contains_key(id) {
            return Err(DomainError::UnknownConversation(id.to_string()));
        }
        self.selected = Some(id.clone());
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected_id(&self) -> Option<&ConversationId> {
        self.selected.as_ref()
    }

    pub fn active(&self) -> Option<&Conversation> {
        self.selected
            .as_ref()
            .and_then(|id| self.conversations.get(id))
    }

    pub fn conversation(&self, id: &ConversationId) -> Option<&Conversation> {
        self.conversations.get(id)
    }

    pub fn turns(&self, id: &ConversationId) -> Option<&[Turn]> {
        self.conversations.get(id).map(|c| c.turns.as_slice())
    }

    // ==================== Turn mutations ====================

    /// Apply a command to a conversation's turns, returning its inverse.
    pub fn execute(
        &mut self,
        id: &ConversationId,
        command: TurnCommand,
    ) -> Result<TurnCommand, DomainError> {
        let conversation = self
            .conversations
            .get_mut(id)
            .ok_or_else(|| DomainError::UnknownConversation(id.to_string()))?;
        let name = command.name();
        let inverse = command.apply(&mut conversation.turns)?;
        debug!(
            "Conversation {}: {} ({} turns)",
            id,
            name,
            conversation.turns.len()
        );
        Ok(inverse)
    }

    pub fn append_turn(&mut self, id: &ConversationId, turn: Turn) -> Result<(), DomainError> {
        self.execute(id, TurnCommand::AppendTurn(turn)).map(drop)
    }

    pub fn drop_last_turns(&mut self, id: &ConversationId, n: usize) -> Result<(), DomainError> {
        self.execute(id, TurnCommand::DropLastTurns(n)).map(drop)
    }

    pub fn replace_turns(
        &mut self,
        id: &ConversationId,
        turns: Vec<Turn>,
    ) -> Result<(), DomainError> {
        self.execute(id, TurnCommand::ReplaceTurns(turns)).map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ConversationId {
        ConversationId::new(s).unwrap()
    }

    fn store_with(ids: &[&str]) -> ConversationStore {
        let mut store = ConversationStore::new();
        for s in ids {
            store.load(Conversation::new(id(s)));
        }
        store.set_summaries(
            ids.iter()
                .map(|s| Conversation::new(id(s)).summary())
                .collect(),
        );
        store
    }

    #[test]
    fn test_select_requires_loaded_conversation() {
        let mut store = store_with(&["c1"]);
        assert!(store.select(&id("c1")).is_ok());
        assert_eq!(store.active().unwrap().id, id("c1"));
        assert_eq!(
            store.select(&id("missing")),
            Err(DomainError::UnknownConversation("missing".to_string()))
        );
    }

    #[test]
    fn test_execute_on_unknown_conversation_fails() {
        let mut store = ConversationStore::new();
        let result = store.append_turn(&id("c1"), Turn::user("Hello"));
        assert!(matches!(result, Err(DomainError::UnknownConversation(_))));
    }

    #[test]
    fn test_append_and_drop() {
        let mut store = store_with(&["c1"]);
        store.append_turn(&id("c1"), Turn::user("Hello")).unwrap();
        store.append_turn(&id("c1"), Turn::placeholder()).unwrap();
        assert_eq!(store.turns(&id("c1")).unwrap().len(), 2);
        store.drop_last_turns(&id("c1"), 1).unwrap();
        assert_eq!(store.turns(&id("c1")).unwrap(), &[Turn::user("Hello")]);
    }

    #[test]
    fn test_remove_selected_conversation_clears_selection() {
        let mut store = store_with(&["c1", "c2"]);
        store.select(&id("c1")).unwrap();
        assert!(store.remove_conversation(&id("c1")));
        assert!(store.selected_id().is_none());
        assert_eq!(store.summaries().len(), 1);
        assert!(!store.remove_conversation(&id("c2")));
    }

    #[test]
    fn test_set_title_updates_list_and_loaded_copy() {
        let mut store = store_with(&["c1"]);
        store.set_title(&id("c1"), "Rust errors");
        assert_eq!(store.summaries()[0].title, "Rust errors");
        assert_eq!(store.conversation(&id("c1")).unwrap().title, "Rust errors");
    }
}
