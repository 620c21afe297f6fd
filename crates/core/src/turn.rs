//! Conversation turns

use serde::{Deserialize, Serialize};

/// One completed user/assistant exchange.
///
/// Turns are created only after a reply has been generated and are never
/// mutated afterwards; histories replay them verbatim to the language model,
/// so their order is semantically load-bearing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// What the user said (transcribed or supplied as text)
    pub user_text: String,
    /// What the assistant replied
    pub assistant_text: String,
}

impl Turn {
    /// Create a new turn
    pub fn new(user_text: impl Into<String>, assistant_text: impl Into<String>) -> Self {
        Self {
            user_text: user_text.into(),
            assistant_text: assistant_text.into(),
        }
    }
}
