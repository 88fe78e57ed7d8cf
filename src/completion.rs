//! Chat-completion client and the fail-soft generation step.
//!
//! [`CompletionClient`] is the seam between the assistant and the hosted
//! model. [`OpenAIChatClient`] talks to any OpenAI-compatible
//! `POST /chat/completions` endpoint with the configured model, `max_tokens`
//! and `temperature`.
//!
//! [`generate`] never fails: a client error becomes
//! [`Completion::Degraded`] carrying `"An error occurred: ..."`, which is
//! shown to the user in place of an answer.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::config::CompletionConfig;
use crate::models::ChatMessage;

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Model identifier recorded in trace metadata.
    fn model_name(&self) -> &str;

    /// Send `messages` and return the answer text.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Outcome of one generation.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Answered(String),
    /// The call failed; the payload is a user-displayable error description.
    Degraded(String),
}

impl Completion {
    pub fn text(&self) -> &str {
        match self {
            Completion::Answered(t) | Completion::Degraded(t) => t,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Completion::Answered(t) | Completion::Degraded(t) => t,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Completion::Degraded(_))
    }
}

#[derive(Debug, Clone)]
pub struct Generation {
    pub completion: Completion,
    /// Wall-clock time spent in the completion call.
    pub duration: Duration,
}

pub async fn generate(client: &dyn CompletionClient, messages: &[ChatMessage]) -> Generation {
    let started = Instant::now();
    let completion = match client.complete(messages).await {
        Ok(text) => Completion::Answered(text),
        Err(e) => {
            tracing::warn!(error = %format!("{:#}", e), "completion call failed");
            Completion::Degraded(format!("An error occurred: {:#}", e))
        }
    };
    Generation {
        completion,
        duration: started.elapsed(),
    }
}

// ============ OpenAI-compatible client ============

pub struct OpenAIChatClient {
    client: reqwest::Client,
    config: CompletionConfig,
}

impl OpenAIChatClient {
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f64,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl CompletionClient for OpenAIChatClient {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let api_key = std::env::var(&self.config.api_key_env)
            .with_context(|| format!("{} not set", self.config.api_key_env))?;

        let body = ChatRequest {
            model: &self.config.model,
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to reach completion API")?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Completion API error {}: {}", status, body_text);
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("Invalid completion response")?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("Invalid completion response: no choices"))?;

        Ok(content.trim().to_string())
    }
}
