//! # Docs Assistant
//!
//! A chat assistant for product documentation. Questions typed into a
//! browser page are keyword-matched against a local JSON knowledge base,
//! combined with the conversation so far, and answered by a hosted
//! chat-completion model. Every exchange is recorded with an LLM
//! trace-logging service, and users can rate answers with 👍/👎.
//!
//! A separate `ingest` command embeds a Markdown documentation tree into an
//! on-disk vector store.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌────────────┐   ┌─────────────┐
//! │ Browser  │──▶│ HTTP server  │──▶│ Assistant  │──▶│ Completion  │
//! │  (UI)    │   │  + sessions  │   │  keyword   │   │ API         │
//! └──────────┘   └──────────────┘   │  matching  │   └─────────────┘
//!                                   │            │──▶┌─────────────┐
//!                                   └────────────┘   │ Trace log   │
//!                                                    └─────────────┘
//!
//! ┌──────────┐   ┌──────────────┐   ┌────────────┐   ┌─────────────┐
//! │ docs/*.md│──▶│ heading split│──▶│ embeddings │──▶│ SQLite store│
//! └──────────┘   └──────────────┘   └────────────┘   └─────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`knowledge`] | JSON knowledge base and keyword matching |
//! | [`prompt`] | Message sequence assembly |
//! | [`completion`] | Chat-completion client, fail-soft generation |
//! | [`trace`] | LLM trace and feedback logging |
//! | [`session`] | Per-browser conversation state |
//! | [`assistant`] | The question → turn loop |
//! | [`server`] | HTTP server and JSON API |
//! | [`ui`] | Chat page |
//! | [`markdown`] | Heading-based Markdown splitting |
//! | [`embedding`] | Embedding API client |
//! | [`store`] | SQLite vector store |
//! | [`ingest`] | Offline ingestion pipeline |

pub mod assistant;
pub mod completion;
pub mod config;
pub mod embedding;
pub mod ingest;
pub mod knowledge;
pub mod markdown;
pub mod models;
pub mod prompt;
pub mod server;
pub mod session;
pub mod store;
pub mod trace;
pub mod ui;
