//! Prompt assembly.
//!
//! The message sequence sent to the completion API is:
//!
//! ```text
//! system     system prompt
//! user       current question
//! assistant  related knowledge-base content
//! user       turn[0].question
//! assistant  turn[0].answer
//! ...
//! user       current question (again)
//! ```
//!
//! The current question appears twice. Related content is injected as an
//! assistant message, even when it is empty.

use crate::models::{ChatMessage, Turn};

pub fn build_messages(
    system_prompt: &str,
    question: &str,
    related_content: &str,
    history: &[Turn],
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(4 + history.len() * 2);
    messages.push(ChatMessage::system(system_prompt));
    messages.push(ChatMessage::user(question));
    messages.push(ChatMessage::assistant(related_content));

    for turn in history {
        messages.push(ChatMessage::user(turn.question.as_str()));
        messages.push(ChatMessage::assistant(turn.answer.as_str()));
    }

    messages.push(ChatMessage::user(question));
    messages
}
