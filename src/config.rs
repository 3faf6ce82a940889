use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub ollama_url: String,
    /// Preferred generation model. When unset, a default is derived from
    /// available system memory at call time.
    pub default_model: Option<String>,
    pub database_url: String,
    // Context assembly settings
    pub chat_context_messages: usize,
    pub diary_lookback_days: i64,
    // Timeout settings
    pub llm_timeout_secs: u64,
    pub model_pull_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::build()
    }

    fn build() -> anyhow::Result<Self> {
        Ok(Config {
            ollama_url: env::var("OLLAMA_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            default_model: env::var("OLLAMA_MODEL").ok(),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "data/sidekick.db".to_string()),
            chat_context_messages: env::var("CHAT_CONTEXT_MESSAGES")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            diary_lookback_days: env::var("DIARY_LOOKBACK_DAYS")
                .unwrap_or_else(|_| "7".to_string())
                .parse()
                .unwrap_or(7),
            llm_timeout_secs: env::var("LLM_TIMEOUT_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap_or(60),
            model_pull_timeout_secs: env::var("MODEL_PULL_TIMEOUT_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .unwrap_or(300),
        })
    }
}
