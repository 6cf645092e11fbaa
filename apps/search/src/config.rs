use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::documents::chunker::ChunkConfig;
use crate::embedding::EmbeddingBackend;

pub const DEFAULT_STORE_DIR: &str = "chroma_db";
pub const DEFAULT_SECRETS_PATH: &str = ".streamlit/secrets.toml";
pub const DEFAULT_TOP_K: usize = 5;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Application configuration loaded from environment variables.
///
/// The API key is not part of this struct. It is resolved separately by
/// [`crate::credential::Credential::resolve`]; a missing key leaves the
/// service running in its `NoKey` phase.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub store_dir: PathBuf,
    pub secrets_path: PathBuf,
    pub chunking: ChunkConfig,
    pub top_k: usize,
    pub embedding: EmbeddingBackend,
    pub llm_api_url: String,
    pub llm_timeout: Duration,
    pub llm_max_retries: u32,
    /// Base delay of the exponential backoff between completion attempts.
    pub llm_retry_delay: Duration,
    pub max_upload_bytes: usize,
    /// Show raw completion-service errors to the operator. Disable for any
    /// deployment where the page is not restricted to a trusted operator.
    pub expose_error_detail: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let chunk_size = parse_or(&lookup, "CHUNK_SIZE", 500usize)?;
        let chunk_overlap = parse_or(&lookup, "CHUNK_OVERLAP", 50usize)?;
        let chunking = ChunkConfig::new(chunk_size, chunk_overlap)?;

        let top_k = parse_or(&lookup, "TOP_K", DEFAULT_TOP_K)?;
        if top_k == 0 {
            bail!("TOP_K must be greater than 0");
        }

        let embedding = match lookup("EMBEDDING_PROVIDER") {
            Some(raw) => raw.parse::<EmbeddingBackend>()?,
            None => EmbeddingBackend::default(),
        };

        Ok(Config {
            port: parse_or(&lookup, "PORT", 8501u16).context("PORT must be a valid port number")?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            store_dir: lookup("STORE_DIR")
                .unwrap_or_else(|| DEFAULT_STORE_DIR.to_string())
                .into(),
            secrets_path: lookup("SECRETS_PATH")
                .unwrap_or_else(|| DEFAULT_SECRETS_PATH.to_string())
                .into(),
            chunking,
            top_k,
            embedding,
            llm_api_url: lookup("GROQ_API_URL")
                .unwrap_or_else(|| crate::llm_client::GROQ_API_URL.to_string()),
            llm_timeout: Duration::from_secs(parse_or(&lookup, "LLM_TIMEOUT_SECS", 60u64)?),
            llm_max_retries: parse_or(&lookup, "LLM_MAX_RETRIES", 3u32)?,
            llm_retry_delay: Duration::from_millis(parse_or(
                &lookup,
                "LLM_RETRY_DELAY_MS",
                1000u64,
            )?),
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            expose_error_detail: parse_or(&lookup, "EXPOSE_ERROR_DETAIL", true)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: '{raw}'")),
        _ => Ok(default),
    }
}
