use std::collections::HashSet;

use super::message::Message;
use super::role::Role;
use crate::errors::{AgentError, AgentResult};

/// The ordered message history exchanged with the model for a single query.
///
/// Messages can only be appended. A message carrying tool responses is accepted only
/// when every response id answers a request made by the most recent assistant message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Seed a conversation with the system instructions and the user's query
    pub fn new(system_prompt: &str, query: &str) -> Self {
        Self {
            messages: vec![
                Message::system().with_text(system_prompt),
                Message::user().with_text(query),
            ],
        }
    }

    pub fn push(&mut self, message: Message) -> AgentResult<()> {
        let responses = message.tool_responses();
        if !responses.is_empty() {
            let pending: HashSet<&str> = self
                .messages
                .iter()
                .rev()
                .find(|m| m.role == Role::Assistant)
                .map(|m| m.tool_requests().into_iter().map(|r| r.id.as_str()).collect())
                .unwrap_or_default();

            if let Some(orphan) = responses.iter().find(|r| !pending.contains(r.id.as_str())) {
                return Err(AgentError::ConversationOrder(format!(
                    "tool response {} does not answer the latest assistant message",
                    orphan.id
                )));
            }
        }
        self.messages.push(message);
        Ok(())
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
}
