//! API key resolution for the completion service.
//!
//! Priority order: the platform secrets file, then the process environment.
//! Resolution happens once at startup; the resulting [`Credential`] is handed
//! to the completion client and never read from the environment again.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

pub const API_KEY_VAR: &str = "GROQ_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "GROQ_API_KEY is not configured. Add it to {} or set the GROQ_API_KEY environment variable, then restart.",
        secrets_path.display()
    )]
    MissingCredential { secrets_path: PathBuf },

    #[error("Secrets file {} could not be parsed: {reason}", path.display())]
    UnreadableSecrets { path: PathBuf, reason: String },
}

/// Where the key was found, shown next to the masked key on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    SecretsFile,
    Environment,
}

impl CredentialSource {
    pub fn label(&self) -> &'static str {
        match self {
            CredentialSource::SecretsFile => "secrets file",
            CredentialSource::Environment => "environment",
        }
    }
}

/// The completion-service API key. `Debug` and `Display` only ever show the
/// masked form.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    key: String,
    source: CredentialSource,
}

#[derive(Debug, Deserialize)]
struct SecretsFile {
    #[serde(rename = "GROQ_API_KEY")]
    groq_api_key: Option<String>,
}

impl Credential {
    /// Resolves the key from `secrets_path`, falling back to the environment.
    pub fn resolve(secrets_path: &Path) -> Result<Self, ConfigError> {
        Self::resolve_from(secrets_path, std::env::var(API_KEY_VAR).ok())
    }

    pub fn resolve_from(
        secrets_path: &Path,
        env_value: Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(key) = read_secrets_file(secrets_path)? {
            debug!("API key resolved from {}", secrets_path.display());
            return Ok(Self::new(key, CredentialSource::SecretsFile));
        }

        match env_value.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => {
                debug!("API key resolved from {API_KEY_VAR}");
                Ok(Self::new(key.to_string(), CredentialSource::Environment))
            }
            _ => Err(ConfigError::MissingCredential {
                secrets_path: secrets_path.to_path_buf(),
            }),
        }
    }

    fn new(key: String, source: CredentialSource) -> Self {
        Self { key, source }
    }

    pub fn expose(&self) -> &str {
        &self.key
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    /// `****` followed by the last four characters of the key.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.key.chars().collect();
        let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
        format!("****{tail}")
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("key", &self.masked())
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

fn read_secrets_file(path: &Path) -> Result<Option<String>, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            warn!("Could not read secrets file {}: {e}", path.display());
            return Ok(None);
        }
    };

    let secrets: SecretsFile = toml::from_str(&raw).map_err(|e| ConfigError::UnreadableSecrets {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    Ok(secrets
        .groq_api_key
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty()))
}
