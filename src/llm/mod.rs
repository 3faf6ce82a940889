pub mod client;
pub mod fallback;

pub use client::OllamaClient;

use serde::Serialize;

/// Outcome of one completion attempt. `success: false` still carries a
/// usable reply text (the canned fallback), never an empty string.
#[derive(Clone, Debug, Serialize)]
pub struct CompletionResult {
    pub success: bool,
    pub text: String,
    pub model_used: Option<String>,
    pub latency_seconds: Option<f64>,
    pub context_used: bool,
    pub error: Option<String>,
}
