//! Append-only message history owned by one session.

use serde::Serialize;

use crate::core::types::{Message, Role};

/// Ordered message history replayed verbatim on every call.
///
/// Always starts with the system instruction, the user's prompt, and the
/// assistant acknowledgement. Messages can be appended but never edited or
/// removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Number of messages every transcript starts with.
    pub const SEED_LEN: usize = 3;

    pub fn seeded(system: &str, prompt: &str, acknowledgement: &str) -> Self {
        Self {
            messages: vec![
                Message::system(system),
                Message::user(prompt),
                Message::assistant(acknowledgement),
            ],
        }
    }

    pub(crate) fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The user's original prompt.
    pub fn prompt(&self) -> &str {
        &self.messages[1].content
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Check the seed prefix: exactly one system message, first, followed by
    /// the prompt and the acknowledgement.
    pub fn has_valid_seed(&self) -> bool {
        let roles: Vec<Role> = self.messages.iter().map(|m| m.role).collect();
        roles.len() >= Self::SEED_LEN
            && roles[..Self::SEED_LEN] == [Role::System, Role::User, Role::Assistant]
            && roles.iter().filter(|role| **role == Role::System).count() == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_transcript_has_fixed_prefix() {
        let transcript = Transcript::seeded("sys", "How many R's?", "ack");
        assert_eq!(transcript.len(), Transcript::SEED_LEN);
        assert_eq!(transcript.prompt(), "How many R's?");
        assert!(transcript.has_valid_seed());
        assert_eq!(transcript.last().map(|m| m.role), Some(Role::Assistant));
    }

    #[test]
    fn appended_messages_keep_insertion_order() {
        let mut transcript = Transcript::seeded("sys", "q", "ack");
        transcript.push(Message::assistant("step one"));
        transcript.push(Message::user("final please"));

        let contents: Vec<&str> = transcript
            .messages()
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["sys", "q", "ack", "step one", "final please"]);
        assert!(transcript.has_valid_seed());
    }

    #[test]
    fn second_system_message_breaks_seed() {
        let mut transcript = Transcript::seeded("sys", "q", "ack");
        transcript.push(Message::system("again"));
        assert!(!transcript.has_valid_seed());
    }
}
