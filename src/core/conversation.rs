//! Ordered turn history for one logical session.

use crate::api::{ChatMessage, Role};

/// The full dialogue for a session. Every turn is sent on each request, so
/// the payload grows with the session; nothing is pruned or windowed.
///
/// There is no internal locking. Callers sharing one instance across tasks
/// must serialize access themselves (see [`crate::core::sessions`]).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the conversation with turns supplied at session start.
    pub fn with_initial(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }

    pub fn append_user_turn(&mut self, content: impl Into<String>, images: Vec<String>) {
        self.messages.push(ChatMessage::user(content, images));
    }

    pub fn append_assistant_turn(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(content));
    }

    /// Every turn so far, in order, ready to embed in the next request.
    pub fn snapshot_for_request(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The request payload for sending `pending` next, without committing it.
    /// Used so a failed call leaves the history untouched.
    pub fn snapshot_with(&self, pending: &ChatMessage) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        messages.extend_from_slice(&self.messages);
        messages.push(pending.clone());
        messages
    }

    /// Commits a user turn and the answer it produced.
    pub fn record_exchange(&mut self, user: ChatMessage, answer: impl Into<String>) {
        self.messages.push(user);
        self.append_assistant_turn(answer);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last_role(&self) -> Option<Role> {
        self.messages.last().map(|message| message.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_grows_snapshot_by_two_and_keeps_order() {
        let mut conversation = Conversation::new();
        conversation.append_user_turn("first", Vec::new());
        conversation.append_assistant_turn("one");
        let before: Vec<ChatMessage> = conversation.snapshot_for_request().to_vec();

        conversation.append_user_turn("second", vec!["aW1n".to_string()]);
        conversation.append_assistant_turn("two");

        let after = conversation.snapshot_for_request();
        assert_eq!(after.len(), before.len() + 2);
        assert_eq!(&after[..before.len()], before.as_slice());
        assert_eq!(after[2].role, Role::User);
        assert_eq!(after[2].images, vec!["aW1n".to_string()]);
        assert_eq!(after[3], ChatMessage::assistant("two"));
    }

    #[test]
    fn consecutive_user_turns_are_allowed() {
        let mut conversation = Conversation::new();
        conversation.append_user_turn("text", Vec::new());
        conversation.append_user_turn("file contents", Vec::new());
        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.last_role(), Some(Role::User));
    }

    #[test]
    fn snapshot_with_does_not_commit_pending_turn() {
        let mut conversation = Conversation::with_initial(vec![ChatMessage::user("hi", Vec::new())]);
        conversation.append_assistant_turn("hello");

        let pending = ChatMessage::user("how are you?", Vec::new());
        let payload = conversation.snapshot_with(&pending);

        assert_eq!(payload.len(), 3);
        assert_eq!(payload.last(), Some(&pending));
        assert_eq!(conversation.len(), 2);

        conversation.record_exchange(pending, "fine");
        assert_eq!(conversation.len(), 4);
        assert_eq!(conversation.last_role(), Some(Role::Assistant));
    }
}
