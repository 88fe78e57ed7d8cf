//! LLM trace logging.
//!
//! Every generated answer is recorded with the trace service together with
//! its prompt, latency and model metadata. The service returns an opaque
//! [`TraceId`] that later carries the user's thumbs-up/down score.
//!
//! Failures are returned to the caller as errors. There is no local
//! buffering or fallback when the service is unreachable.
//!
//! # Providers
//!
//! | Config Value | Logger |
//! |-------------|--------|
//! | `"comet"` | [`CometTraceLogger`] |
//! | `"disabled"` | [`DisabledTraceLogger`] |
//!
//! # Comet protocol
//!
//! A prompt trace is a Comet experiment of type `LLM` in the configured
//! project. Logging one takes these REST v2 calls, all authenticated with
//! the raw API key in the `Authorization` header:
//!
//! | Step | Endpoint | Payload |
//! |------|----------|---------|
//! | create | `POST write/experiment/create` | `{projectName, workspaceName?, type: "LLM"}` returns `{experimentKey}` |
//! | record | `POST write/experiment/upload-asset` | multipart `comet_llm_data.json` (prompt, output, duration, metadata) |
//! | metadata | `POST write/experiment/parameter` | one call per metadata field |
//!
//! The experiment key is the trace id. Feedback is the `user_feedback`
//! metric on that experiment (`POST write/experiment/metric`).

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::TraceConfig;
use crate::models::TraceId;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceMetadata {
    pub model: String,
    pub system_prompt: String,
}

impl TraceMetadata {
    fn fields(&self) -> [(&'static str, &str); 2] {
        [
            ("model", self.model.as_str()),
            ("system_prompt", self.system_prompt.as_str()),
        ]
    }
}

/// One prompt/response exchange as sent to the trace service.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTrace {
    pub prompt: String,
    pub output: String,
    pub duration: Duration,
    pub metadata: TraceMetadata,
}

#[async_trait]
pub trait TraceLogger: Send + Sync {
    async fn log_prompt(&self, trace: &PromptTrace) -> Result<TraceId>;

    async fn log_feedback(&self, trace_id: &TraceId, score: f64) -> Result<()>;
}

pub fn create_trace_logger(config: &TraceConfig) -> Result<Arc<dyn TraceLogger>> {
    if !config.is_enabled() {
        return Ok(Arc::new(DisabledTraceLogger));
    }
    match config.provider.as_str() {
        "comet" => Ok(Arc::new(CometTraceLogger::new(config)?)),
        other => bail!("Unknown trace provider: {}", other),
    }
}

// ============ Comet ============

const EXPERIMENT_TYPE: &str = "LLM";
const LLM_DATA_FILE: &str = "comet_llm_data.json";
const LLM_DATA_ASSET_TYPE: &str = "llm_data";
const LLM_DATA_VERSION: &str = "1.3";
const FEEDBACK_METRIC: &str = "user_feedback";

/// Client for the Comet REST v2 experiment API.
pub struct CometTraceLogger {
    client: reqwest::Client,
    base_url: String,
    project: String,
    workspace: Option<String>,
    api_key: String,
}

impl CometTraceLogger {
    /// # Errors
    ///
    /// Returns an error if the API key variable is not set.
    pub fn new(config: &TraceConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .with_context(|| format!("{} environment variable not set", config.api_key_env))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            project: config.project.clone(),
            workspace: config.workspace.clone(),
            api_key,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &T,
    ) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(self.url(endpoint))
            .header("Authorization", &self.api_key)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to reach trace service ({})", endpoint))?;
        check_status(endpoint, response).await
    }

    async fn create_experiment(&self) -> Result<String> {
        let body = CreateExperimentRequest {
            project_name: &self.project,
            workspace_name: self.workspace.as_deref(),
            experiment_type: EXPERIMENT_TYPE,
        };
        let parsed: CreateExperimentResponse = self
            .post_json("write/experiment/create", &body)
            .await?
            .json()
            .await
            .context("Invalid trace service response")?;
        Ok(parsed.experiment_key)
    }

    async fn upload_llm_data(&self, experiment_key: &str, data: &Value) -> Result<()> {
        let endpoint = "write/experiment/upload-asset";
        let part = reqwest::multipart::Part::bytes(serde_json::to_vec(data)?)
            .file_name(LLM_DATA_FILE)
            .mime_str("application/json")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.url(endpoint))
            .header("Authorization", &self.api_key)
            .query(&[
                ("experimentKey", experiment_key),
                ("fileName", LLM_DATA_FILE),
                ("type", LLM_DATA_ASSET_TYPE),
            ])
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("Failed to reach trace service ({})", endpoint))?;
        check_status(endpoint, response).await?;
        Ok(())
    }
}

async fn check_status(endpoint: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        bail!("Trace service error {} on {}: {}", status, endpoint, body_text);
    }
    Ok(response)
}

/// The prompt record stored as the experiment's `llm_data` asset.
fn llm_data(trace: &PromptTrace, ended_at: DateTime<Utc>) -> Value {
    let end = ended_at.timestamp_millis();
    let start = end - trace.duration.as_millis() as i64;
    json!({
        "version": LLM_DATA_VERSION,
        "category": "single_prompt",
        "chain_nodes": [],
        "chain_edges": [],
        "chain_context": {},
        "chain_inputs": {
            "final_prompt": trace.prompt,
            "prompt_template": null,
            "prompt_template_variables": null,
        },
        "chain_outputs": { "output": trace.output },
        "metadata": trace.metadata,
        "start_timestamp": start,
        "end_timestamp": end,
        "chain_duration": trace.duration.as_secs_f64() * 1000.0,
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateExperimentRequest<'a> {
    project_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    workspace_name: Option<&'a str>,
    #[serde(rename = "type")]
    experiment_type: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateExperimentResponse {
    experiment_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ParameterRequest<'a> {
    experiment_key: &'a str,
    parameter_name: &'a str,
    parameter_value: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MetricRequest<'a> {
    experiment_key: &'a str,
    metric_name: &'a str,
    metric_value: f64,
}

#[async_trait]
impl TraceLogger for CometTraceLogger {
    async fn log_prompt(&self, trace: &PromptTrace) -> Result<TraceId> {
        let experiment_key = self.create_experiment().await?;

        self.upload_llm_data(&experiment_key, &llm_data(trace, Utc::now()))
            .await?;

        for (name, value) in trace.metadata.fields() {
            let body = ParameterRequest {
                experiment_key: &experiment_key,
                parameter_name: name,
                parameter_value: value,
            };
            self.post_json("write/experiment/parameter", &body).await?;
        }

        tracing::debug!(trace_id = %experiment_key, "prompt logged to comet");
        Ok(TraceId(experiment_key))
    }

    async fn log_feedback(&self, trace_id: &TraceId, score: f64) -> Result<()> {
        let body = MetricRequest {
            experiment_key: &trace_id.0,
            metric_name: FEEDBACK_METRIC,
            metric_value: score,
        };
        self.post_json("write/experiment/metric", &body).await?;
        Ok(())
    }
}


// ============ Disabled ============

/// Mints local trace ids and only writes the trace to the application log.
pub struct DisabledTraceLogger;

#[async_trait]
impl TraceLogger for DisabledTraceLogger {
    async fn log_prompt(&self, trace: &PromptTrace) -> Result<TraceId> {
        let id = TraceId(Uuid::new_v4().to_string());
        tracing::info!(
            trace_id = %id,
            model = %trace.metadata.model,
            duration_ms = trace.duration.as_millis() as u64,
            "prompt traced locally"
        );
        Ok(id)
    }

    async fn log_feedback(&self, trace_id: &TraceId, score: f64) -> Result<()> {
        tracing::info!(trace_id = %trace_id, score, "feedback traced locally");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_logger_mints_distinct_ids() {
        let logger = DisabledTraceLogger;
        let trace = PromptTrace {
            prompt: "p".to_string(),
            output: "o".to_string(),
            duration: Duration::from_millis(5),
            metadata: TraceMetadata {
                model: "m".to_string(),
                system_prompt: "s".to_string(),
            },
        };
        let a = logger.log_prompt(&trace).await.unwrap();
        let b = logger.log_prompt(&trace).await.unwrap();
        assert_ne!(a, b);
        logger.log_feedback(&a, 1.0).await.unwrap();
    }

    #[test]
    fn test_disabled_provider_needs_no_key() {
        let config = TraceConfig {
            provider: "disabled".to_string(),
            api_key_env: "DOCS_ASSISTANT_TEST_UNSET_KEY".to_string(),
            ..TraceConfig::default()
        };
        assert!(create_trace_logger(&config).is_ok());
    }

    #[test]
    fn test_llm_data_record() {
        let trace = PromptTrace {
            prompt: "How do panels work?".to_string(),
            output: "With Python.".to_string(),
            duration: Duration::from_millis(1500),
            metadata: TraceMetadata {
                model: "gpt-3.5-turbo".to_string(),
                system_prompt: "sys".to_string(),
            },
        };
        let ended_at = DateTime::<Utc>::from_timestamp_millis(10_000).unwrap();
        let data = llm_data(&trace, ended_at);

        assert_eq!(data["category"], "single_prompt");
        assert_eq!(data["chain_inputs"]["final_prompt"], "How do panels work?");
        assert_eq!(data["chain_outputs"]["output"], "With Python.");
        assert_eq!(data["metadata"]["model"], "gpt-3.5-turbo");
        assert_eq!(data["chain_duration"], 1500.0);
        assert_eq!(data["start_timestamp"], 8_500);
        assert_eq!(data["end_timestamp"], 10_000);
    }

    #[test]
    fn test_experiment_requests_use_comet_field_names() {
        let create = serde_json::to_value(CreateExperimentRequest {
            project_name: "llm-hackathon",
            workspace_name: None,
            experiment_type: EXPERIMENT_TYPE,
        })
        .unwrap();
        assert_eq!(create, json!({ "projectName": "llm-hackathon", "type": "LLM" }));

        let metric = serde_json::to_value(MetricRequest {
            experiment_key: "abc",
            metric_name: FEEDBACK_METRIC,
            metric_value: 0.0,
        })
        .unwrap();
        assert_eq!(
            metric,
            json!({ "experimentKey": "abc", "metricName": "user_feedback", "metricValue": 0.0 })
        );
    }

    #[test]
    fn test_comet_requires_api_key() {
        let config = TraceConfig {
            api_key_env: "DOCS_ASSISTANT_TEST_UNSET_KEY".to_string(),
            ..TraceConfig::default()
        };
        let err = CometTraceLogger::new(&config).err().unwrap();
        assert!(err.to_string().contains("DOCS_ASSISTANT_TEST_UNSET_KEY"));
    }
}
