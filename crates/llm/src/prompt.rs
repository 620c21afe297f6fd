//! Prompt building
//!
//! Constructs the conversational prompt handed to the language model, either
//! as a structured message list or as a manually formatted transcript. Both
//! renderings carry the same ordering: system instruction, prior turns oldest
//! first, then the new user utterance.

use std::fmt;

use serde::{Deserialize, Serialize};

use talkback_core::Turn;

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Builds the per-turn prompt from the system instruction, the replayed
/// history, and the new user utterance.
pub struct PromptBuilder {
    system: String,
    turns: Vec<Turn>,
    user_text: String,
}

impl PromptBuilder {
    /// Create a builder with the fixed system instruction.
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            turns: Vec::new(),
            user_text: String::new(),
        }
    }

    /// Replay prior turns, oldest first.
    pub fn with_history(mut self, turns: &[Turn]) -> Self {
        self.turns.extend_from_slice(turns);
        self
    }

    /// Set the new user utterance.
    pub fn with_user_text(mut self, user_text: impl Into<String>) -> Self {
        self.user_text = user_text.into();
        self
    }

    /// Render as a structured message list for chat-format backends.
    pub fn messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.turns.len() * 2 + 2);
        messages.push(Message::system(&self.system));
        for turn in &self.turns {
            messages.push(Message::user(&turn.user_text));
            messages.push(Message::assistant(&turn.assistant_text));
        }
        messages.push(Message::user(&self.user_text));
        messages
    }

    /// Render as a flat transcript for plain completion backends, ending with
    /// an open `Assistant:` cue.
    pub fn transcript(&self) -> String {
        let mut prompt = String::new();
        prompt.push_str(&self.system);
        prompt.push('\n');
        for turn in &self.turns {
            prompt.push_str(&format!(
                "User: {}\nAssistant: {}\n",
                turn.user_text, turn.assistant_text
            ));
        }
        prompt.push_str(&format!("User: {}\nAssistant:", self.user_text));
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_empty_history() {
        let messages = PromptBuilder::new("be brief")
            .with_user_text("hello")
            .messages();

        assert_eq!(
            messages,
            vec![Message::system("be brief"), Message::user("hello")]
        );
    }

    #[test]
    fn test_messages_alternate_roles_oldest_first() {
        let history = vec![Turn::new("u1", "a1"), Turn::new("u2", "a2")];
        let messages = PromptBuilder::new("sys")
            .with_history(&history)
            .with_user_text("u3")
            .messages();

        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(messages[1].content, "u1");
        assert_eq!(messages[3].content, "u2");
        assert_eq!(messages[5].content, "u3");
    }

    #[test]
    fn test_transcript_empty_history() {
        let prompt = PromptBuilder::new("be brief")
            .with_user_text("hello")
            .transcript();

        assert_eq!(prompt, "be brief\nUser: hello\nAssistant:");
    }

    #[test]
    fn test_transcript_orders_turns() {
        let history = vec![Turn::new("u1", "a1"), Turn::new("u2", "a2")];
        let prompt = PromptBuilder::new("sys")
            .with_history(&history)
            .with_user_text("u3")
            .transcript();

        assert_eq!(
            prompt,
            "sys\nUser: u1\nAssistant: a1\nUser: u2\nAssistant: a2\nUser: u3\nAssistant:"
        );
    }
}
