//! Core data models used throughout the assistant.
//!
//! These types represent the knowledge documents, chat messages,
//! conversation turns, and stored chunks that flow through the chat loop
//! and the ingestion pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A keyword-searchable document loaded from the knowledge directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeDocument {
    /// File name the document was loaded from (e.g. `"sdk.json"`).
    pub identifier: String,
    pub content: String,
}

/// Speaker of a [`ChatMessage`], serialized with the wire names used by
/// OpenAI-compatible completion APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
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

/// Opaque identifier handed back by the trace-logging service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(pub String);

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One question/answer exchange in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
    pub trace_id: TraceId,
}

/// User feedback on a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Up,
    Down,
}

impl Vote {
    /// Score recorded with the trace: `1.0` for up, `0.0` for down.
    pub fn score(self) -> f64 {
        match self {
            Vote::Up => 1.0,
            Vote::Down => 0.0,
        }
    }
}

/// A heading-delimited section of a Markdown file, ready for embedding.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub source_path: String,
    pub chunk_index: i64,
    pub text: String,
    pub hash: String,
}
