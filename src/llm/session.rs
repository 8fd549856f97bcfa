//! Conversational query generation session.
//!
//! A session owns one conversation with the model, seeded with the system
//! instruction. Turns are serialized: the conversation lock is held across
//! the model call, so concurrent callers queue behind each other.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::parser::extract_sql;
use super::prompt::format_user_query;
use super::types::{Conversation, Message};
use super::LlmClient;
use crate::error::{GeoQueryError, Result};
use crate::safety::CandidateSql;

/// A stateful question-to-SQL session with one model.
pub struct QuerySession {
    client: Box<dyn LlmClient>,
    conversation: Mutex<Conversation>,
}

impl QuerySession {
    /// Creates a session seeded with the given system instruction.
    ///
    /// Fails with a configuration error when the instruction is blank.
    pub fn create(
        client: Box<dyn LlmClient>,
        instruction: impl Into<String>,
        max_exchanges: usize,
    ) -> Result<Arc<Self>> {
        let instruction = instruction.into();
        if instruction.trim().is_empty() {
            return Err(GeoQueryError::config("system instruction is empty"));
        }

        info!(max_exchanges, "Query session created");

        Ok(Arc::new(Self {
            client,
            conversation: Mutex::new(Conversation::with_system(instruction, max_exchanges)),
        }))
    }

    /// Asks the model for SQL answering a natural-language question.
    ///
    /// The reply is kept in history even when it holds no usable SQL. When
    /// the model call itself fails, the question is dropped from history.
    pub async fn ask(&self, question: &str) -> Result<CandidateSql> {
        let mut conversation = self.conversation.lock().await;
        conversation.add_user(format_user_query(question));

        let start = Instant::now();
        let reply = match self.client.complete(conversation.messages()).await {
            Ok(reply) => reply,
            Err(e) => {
                conversation.pop_dangling_user();
                warn!(error = %e, "Model call failed");
                return Err(e);
            }
        };
        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            reply_len = reply.len(),
            "Model replied"
        );

        conversation.add_assistant(reply.as_str());
        extract_sql(&reply)
    }

    /// Clears history back to the system instruction.
    pub async fn reset(&self) {
        self.conversation.lock().await.reset();
        debug!("Query session reset");
    }

    /// Returns a copy of the current history.
    pub async fn history(&self) -> Vec<Message> {
        self.conversation.lock().await.messages().to_vec()
    }
}
