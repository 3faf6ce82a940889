use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::Config;
use crate::llm::fallback::fallback_reply;
use crate::llm::CompletionResult;

/// Safe default for machines whose memory cannot be determined.
const COMPACT_MODEL: &str = "llama3.2:1b";
const STANDARD_MODEL: &str = "llama3.2:3b";

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

/// Health snapshot of the completion service, used by admin surfaces.
#[derive(Clone, Debug)]
pub struct ServiceStatus {
    pub available: bool,
    pub models: Vec<String>,
    pub error: Option<String>,
}

pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    default_model: Option<String>,
    generate_timeout: Duration,
    pull_timeout: Duration,
}

impl OllamaClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.ollama_url.trim_end_matches('/').to_string(),
            default_model: config.default_model.clone(),
            generate_timeout: Duration::from_secs(config.llm_timeout_secs),
            pull_timeout: Duration::from_secs(config.model_pull_timeout_secs),
        }
    }

    /// Generates a reply for `prompt` with `context` prepended. Never fails:
    /// any service error (timeout, refused connection, non-2xx) degrades to a
    /// canned fallback with `success: false`. One attempt, no retries.
    pub async fn generate(
        &self,
        prompt: &str,
        context: &str,
        model: Option<&str>,
    ) -> CompletionResult {
        let model = self.resolve_model(model);
        let full_prompt = compose_prompt(context, prompt);
        let context_used = !context.is_empty();

        let start = Instant::now();
        match self.request_generate(&model, &full_prompt).await {
            Ok(text) => {
                debug!("Completion from {} in {:?}", model, start.elapsed());
                CompletionResult {
                    success: true,
                    text,
                    model_used: Some(model),
                    latency_seconds: Some(start.elapsed().as_secs_f64()),
                    context_used,
                    error: None,
                }
            }
            Err(e) => {
                warn!("Completion service failed, using fallback: {}", e);
                CompletionResult {
                    success: false,
                    text: fallback_reply(prompt).to_string(),
                    model_used: None,
                    latency_seconds: None,
                    context_used,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn request_generate(&self, model: &str, prompt: &str) -> anyhow::Result<String> {
        let response = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .timeout(self.generate_timeout)
            .json(&json!({
                "model": model,
                "prompt": prompt,
                "stream": false,
                "options": {
                    "temperature": 0.7,
                    "top_p": 0.9,
                    "top_k": 40
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("completion service returned HTTP {}", response.status());
        }

        let body: GenerateResponse = response.json().await?;
        Ok(body.response.trim().to_string())
    }

    /// Caller choice wins, then the configured default, then a model sized to
    /// this machine's memory.
    fn resolve_model(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_string)
            .or_else(|| self.default_model.clone())
            .unwrap_or_else(|| recommended_model().to_string())
    }

    // --- Model management (admin surfaces only) ---

    pub async fn status(&self) -> ServiceStatus {
        match self.list_models().await {
            Ok(models) => ServiceStatus {
                available: true,
                models,
                error: None,
            },
            Err(e) => ServiceStatus {
                available: false,
                models: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }

    pub async fn list_models(&self) -> anyhow::Result<Vec<String>> {
        let response = self
            .http
            .get(format!("{}/api/tags", self.base_url))
            .timeout(self.generate_timeout)
            .send()
            .await?;
        if !response.status().is_success() {
            anyhow::bail!("model listing returned HTTP {}", response.status());
        }
        let body: TagsResponse = response.json().await?;
        Ok(body.models.into_iter().map(|m| m.name).collect())
    }

    pub async fn pull_model(&self, name: &str) -> anyhow::Result<()> {
        let response = self
            .http
            .post(format!("{}/api/pull", self.base_url))
            .timeout(self.pull_timeout)
            .json(&json!({ "name": name, "stream": false }))
            .send()
            .await?;
        if !response.status().is_success() {
            anyhow::bail!("model pull returned HTTP {}", response.status());
        }
        Ok(())
    }

    pub async fn delete_model(&self, name: &str) -> anyhow::Result<()> {
        let response = self
            .http
            .delete(format!("{}/api/delete", self.base_url))
            .timeout(self.generate_timeout)
            .json(&json!({ "name": name }))
            .send()
            .await?;
        if !response.status().is_success() {
            anyhow::bail!("model delete returned HTTP {}", response.status());
        }
        Ok(())
    }
}

const SYSTEM_PREAMBLE: &str = "You are Sidekick, a helpful assistant built into a \
productivity app. You help the user manage their tasks, calendar, and diary.\n\
Guidelines:\n\
- Be concise but helpful\n\
- Reference the user's actual data when the context provides it\n\
- Offer actionable suggestions and be encouraging\n\
- Keep responses under 200 words unless more detail is requested\n";

/// Fixed order: preamble, optional context block, user turn, assistant marker.
pub(crate) fn compose_prompt(context: &str, message: &str) -> String {
    if context.is_empty() {
        format!("{}\nUser: {}\nAssistant:", SYSTEM_PREAMBLE, message)
    } else {
        format!(
            "{}\nContext about the user:\n{}\n\nUser: {}\nAssistant:",
            SYSTEM_PREAMBLE, context, message
        )
    }
}

fn model_for_memory(total_ram_gb: f64) -> &'static str {
    if total_ram_gb >= 8.0 {
        STANDARD_MODEL
    } else {
        COMPACT_MODEL
    }
}

fn total_memory_gb() -> Option<f64> {
    let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
    let line = meminfo.lines().find(|l| l.starts_with("MemTotal:"))?;
    let kb: f64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb / (1024.0 * 1024.0))
}

/// Deterministic per machine; compact model when memory cannot be read.
pub fn recommended_model() -> &'static str {
    total_memory_gb()
        .map(model_for_memory)
        .unwrap_or(COMPACT_MODEL)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(url: &str, model: Option<&str>) -> Config {
        Config {
            ollama_url: url.to_string(),
            default_model: model.map(str::to_string),
            database_url: ":memory:".to_string(),
            chat_context_messages: 10,
            diary_lookback_days: 7,
            llm_timeout_secs: 2,
            model_pull_timeout_secs: 10,
        }
    }

    #[test]
    fn test_compose_prompt_order() {
        let prompt = compose_prompt("User ID: u1", "How am I doing?");
        let preamble = prompt.find("You are Sidekick").unwrap();
        let context = prompt.find("Context about the user:").unwrap();
        let user = prompt.find("User: How am I doing?").unwrap();
        assert!(preamble < context);
        assert!(context < user);
        assert!(prompt.ends_with("Assistant:"));
    }

    #[test]
    fn test_compose_prompt_without_context() {
        let prompt = compose_prompt("", "hi");
        assert!(!prompt.contains("Context about the user:"));
        assert!(prompt.ends_with("User: hi\nAssistant:"));
    }

    #[test]
    fn test_model_resolution_precedence() {
        let client = OllamaClient::new(&test_config("http://localhost:11434", Some("configured")));
        assert_eq!(client.resolve_model(Some("requested")), "requested");
        assert_eq!(client.resolve_model(None), "configured");

        let client = OllamaClient::new(&test_config("http://localhost:11434", None));
        let fallback = client.resolve_model(None);
        assert!(fallback == COMPACT_MODEL || fallback == STANDARD_MODEL);
    }

    #[test]
    fn test_model_for_memory_thresholds() {
        assert_eq!(model_for_memory(16.0), STANDARD_MODEL);
        assert_eq!(model_for_memory(8.0), STANDARD_MODEL);
        assert_eq!(model_for_memory(4.0), COMPACT_MODEL);
    }

    #[tokio::test]
    async fn test_generate_falls_back_when_unreachable() {
        // Port 9 (discard) is closed on any sane test machine
        let client = OllamaClient::new(&test_config("http://127.0.0.1:9", Some("m")));
        let result = client.generate("what tasks are left?", "some context", None).await;

        assert!(!result.success);
        assert!(!result.text.is_empty());
        assert!(result.context_used);
        assert!(result.model_used.is_none());
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn test_status_reports_unreachable() {
        let client = OllamaClient::new(&test_config("http://127.0.0.1:9", None));
        let status = client.status().await;
        assert!(!status.available);
        assert!(status.models.is_empty());
        assert!(status.error.is_some());
    }
}
