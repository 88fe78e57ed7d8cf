//! TOML configuration.
//!
//! Every section is optional; missing keys fall back to the defaults below,
//! which reproduce the assistant's stock behavior (an OpenAI-compatible
//! completion endpoint, Comet LLM trace logging, `./knowledge_base/rag_db`
//! as the keyword corpus).
//!
//! API keys are never stored in the file. Each remote section names the
//! environment variable that holds its key (`OPENAI_API_KEY`,
//! `COMET_API_KEY` by default).

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Path used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "./config/assistant.toml";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an experienced assistant for the Comet platform, \
which is designed to enhance the ML lifecycle through efficient experiment tracking, model \
management, and production monitoring. You will: 1. Assist users with integrating Comet SDKs and \
APIs into their projects. 2. Help users write and troubleshoot Python code for creating custom \
panels. 3. Answer any questions about the Comet platform and its use cases. 4. Offer advice on \
best practices for using Comet to streamline ML workflows. Ensure your responses are thorough, \
accurate, and easy to understand.";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub trace: TraceConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Conversations untouched for this long are discarded.
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
    /// Upper bound on live conversations; the least recently used is
    /// dropped to make room.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            session_idle_secs: default_session_idle_secs(),
            max_sessions: default_max_sessions(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8501".to_string()
}
fn default_session_idle_secs() -> u64 {
    3600
}
fn default_max_sessions() -> usize {
    10_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct KnowledgeConfig {
    /// Directory of `*.json` documents used for keyword matching.
    #[serde(default = "default_knowledge_dir")]
    pub dir: PathBuf,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            dir: default_knowledge_dir(),
        }
    }
}

fn default_knowledge_dir() -> PathBuf {
    PathBuf::from("./knowledge_base/rag_db")
}

/// Chat-completion endpoint and fixed sampling parameters.
#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_chat_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            system_prompt: default_system_prompt(),
            api_key_env: default_openai_key_env(),
            timeout_secs: default_completion_timeout(),
        }
    }
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_chat_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_max_tokens() -> u32 {
    600
}
fn default_temperature() -> f64 {
    0.7
}
fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}
fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_completion_timeout() -> u64 {
    60
}

/// Trace-logging service. `provider` is `comet` or `disabled`.
#[derive(Debug, Deserialize, Clone)]
pub struct TraceConfig {
    #[serde(default = "default_trace_provider")]
    pub provider: String,
    #[serde(default = "default_comet_base_url")]
    pub base_url: String,
    #[serde(default = "default_comet_project")]
    pub project: String,
    #[serde(default)]
    pub workspace: Option<String>,
    #[serde(default = "default_comet_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_remote_timeout")]
    pub timeout_secs: u64,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            provider: default_trace_provider(),
            base_url: default_comet_base_url(),
            project: default_comet_project(),
            workspace: None,
            api_key_env: default_comet_key_env(),
            timeout_secs: default_remote_timeout(),
        }
    }
}

impl TraceConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_trace_provider() -> String {
    "comet".to_string()
}
fn default_comet_base_url() -> String {
    "https://www.comet.com/api/rest/v2".to_string()
}
fn default_comet_project() -> String {
    "llm-hackathon".to_string()
}
fn default_comet_key_env() -> String {
    "COMET_API_KEY".to_string()
}
fn default_remote_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_remote_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_embedding_model(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            api_key_env: default_openai_key_env(),
            timeout_secs: default_remote_timeout(),
        }
    }
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_docs_dir")]
    pub docs_dir: PathBuf,
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            docs_dir: default_docs_dir(),
            store_path: default_store_path(),
            include_globs: default_include_globs(),
        }
    }
}

fn default_docs_dir() -> PathBuf {
    PathBuf::from("./docs")
}
fn default_store_path() -> PathBuf {
    PathBuf::from("./rag_db/store.sqlite")
}
fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string()]
}

/// Load and validate the configuration at `path`.
///
/// A missing file is tolerated only for [`DEFAULT_CONFIG_PATH`], in which
/// case the built-in defaults are used.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() && path == Path::new(DEFAULT_CONFIG_PATH) {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.server.max_sessions == 0 {
        bail!("server.max_sessions must be > 0");
    }

    if config.completion.max_tokens == 0 {
        bail!("completion.max_tokens must be > 0");
    }

    if !(0.0..=2.0).contains(&config.completion.temperature) {
        bail!("completion.temperature must be in [0.0, 2.0]");
    }

    if config.embedding.batch_size == 0 {
        bail!("embedding.batch_size must be > 0");
    }

    match config.trace.provider.as_str() {
        "comet" | "disabled" => {}
        other => bail!(
            "Unknown trace provider: '{}'. Must be comet or disabled.",
            other
        ),
    }

    Ok(())
}
