//! Message types for LLM communication.
//!
//! Defines the conversation a query session keeps with its model.

use serde::{Deserialize, Serialize};

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instruction fixed at session creation.
    System,
    /// User message (the natural-language question).
    User,
    /// Assistant message (the model's reply).
    Assistant,
}

impl Role {
    /// Returns the role as a string for API requests.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender.
    pub role: Role,
    /// The content of the message.
    pub content: String,
}

impl Message {
    /// Creates a new message with the given role and content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Default number of exchanges a conversation keeps.
pub const DEFAULT_MAX_EXCHANGES: usize = 10;

/// A conversation: leading system messages followed by user/assistant turns.
///
/// System messages are never trimmed. Older exchanges are dropped once the
/// conversation holds more than `max_exchanges` of them.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
    max_exchanges: usize,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::with_max_exchanges(DEFAULT_MAX_EXCHANGES)
    }
}

impl Conversation {
    /// Creates a new empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a conversation with a custom max exchanges limit.
    pub fn with_max_exchanges(max_exchanges: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_exchanges,
        }
    }

    /// Creates a conversation seeded with a system instruction.
    pub fn with_system(instruction: impl Into<String>, max_exchanges: usize) -> Self {
        let mut conversation = Self::with_max_exchanges(max_exchanges);
        conversation.messages.push(Message::system(instruction));
        conversation
    }

    /// Adds a message to the conversation.
    pub fn add(&mut self, message: Message) {
        self.messages.push(message);
        self.trim_to_limit();
    }

    /// Adds a user message to the conversation.
    pub fn add_user(&mut self, content: impl Into<String>) {
        self.add(Message::user(content));
    }

    /// Adds an assistant message to the conversation.
    pub fn add_assistant(&mut self, content: impl Into<String>) {
        self.add(Message::assistant(content));
    }

    /// Removes the last message if it is an unanswered user turn.
    pub fn pop_dangling_user(&mut self) -> Option<Message> {
        if self.messages.last().map(|m| m.role) == Some(Role::User) {
            self.messages.pop()
        } else {
            None
        }
    }

    /// Returns all messages in the conversation.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Drops every turn, keeping the system messages.
    pub fn reset(&mut self) {
        self.messages.retain(|m| m.role == Role::System);
    }

    /// Returns the number of messages in the conversation.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if the conversation has no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Trims the conversation to keep only the most recent exchanges.
    fn trim_to_limit(&mut self) {
        let start_idx = self
            .messages
            .iter()
            .position(|m| m.role != Role::System)
            .unwrap_or(self.messages.len());

        let mut exchange_count = self.messages[start_idx..]
            .windows(2)
            .filter(|pair| pair[0].role == Role::User && pair[1].role == Role::Assistant)
            .count();

        // Remove the oldest complete exchange until within the limit.
        while exchange_count > self.max_exchanges {
            let oldest = (start_idx..self.messages.len().saturating_sub(1)).find(|&i| {
                self.messages[i].role == Role::User && self.messages[i + 1].role == Role::Assistant
            });

            let Some(i) = oldest else {
                break;
            };
            self.messages.drain(i..i + 2);
            exchange_count -= 1;
        }
    }
}
