//! Configuration structures for the extraction pipeline.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RcptError, Result};
use crate::models::receipt::{DEFAULT_PROMPT, DEFAULT_SYSTEM_PROMPT};

/// Environment variable holding the service endpoint.
pub const ENV_ENDPOINT: &str = "AOAI_ENDPOINT";

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "AOAI_API_KEY";

/// Environment variable holding the deployment (model) name.
pub const ENV_DEPLOYMENT: &str = "AOAI_DEPLOYMENT";

/// Main configuration for rcpt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RcptConfig {
    /// Remote service configuration.
    pub service: ServiceConfig,

    /// Extraction request configuration.
    pub extraction: ExtractionConfig,

    /// Batch run configuration.
    pub batch: BatchConfig,
}

/// Remote service configuration.
///
/// The API key is never stored here; it is read from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service endpoint, e.g. `https://my-resource.openai.azure.com`.
    pub endpoint: Option<String>,

    /// Deployment name of the vision model.
    pub deployment: Option<String>,

    /// API version query parameter.
    pub api_version: String,

    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,

    /// Connection timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            deployment: None,
            api_version: "2024-08-01-preview".to_string(),
            timeout_secs: 120,
            connect_timeout_secs: 10,
        }
    }
}

/// Extraction request configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// System message.
    pub system_prompt: String,

    /// User instruction sent with every image.
    pub prompt: String,

    /// Token ceiling for the completion.
    pub max_tokens: u32,

    /// Sampling temperature.
    pub temperature: f64,

    /// Largest accepted input file in bytes (0 = unlimited).
    pub max_image_bytes: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            max_tokens: 2000,
            temperature: 0.7,
            max_image_bytes: 20 * 1024 * 1024,
        }
    }
}

/// Batch run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Directory scanned for images.
    pub input_dir: PathBuf,

    /// Directory receiving one JSON file per image.
    pub output_dir: PathBuf,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input_documents"),
            output_dir: PathBuf::from("output_results"),
        }
    }
}

impl RcptConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| RcptError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Resolved connection settings for the Azure OpenAI service.
#[derive(Clone)]
pub struct AzureSettings {
    /// Endpoint without a trailing slash.
    pub endpoint: String,

    /// API key sent in the `api-key` header.
    pub api_key: String,

    /// Deployment name.
    pub deployment: String,

    /// API version query parameter.
    pub api_version: String,
}

impl std::fmt::Debug for AzureSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureSettings")
            .field("endpoint", &self.endpoint)
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl AzureSettings {
    /// Resolve settings from the process environment, falling back to the
    /// config file for the endpoint and deployment.
    pub fn from_env(service: &ServiceConfig) -> Result<Self> {
        Self::resolve(service, |key| std::env::var(key).ok())
    }

    /// Resolve settings with a custom variable lookup.
    ///
    /// Environment values take precedence over the config file. Empty values
    /// count as missing.
    pub fn resolve<F>(service: &ServiceConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let endpoint = get(ENV_ENDPOINT)
            .or_else(|| service.endpoint.clone().filter(|v| !v.trim().is_empty()))
            .ok_or_else(|| missing(ENV_ENDPOINT))?;
        let deployment = get(ENV_DEPLOYMENT)
            .or_else(|| service.deployment.clone().filter(|v| !v.trim().is_empty()))
            .ok_or_else(|| missing(ENV_DEPLOYMENT))?;
        let api_key = get(ENV_API_KEY).ok_or_else(|| missing(ENV_API_KEY))?;

        Ok(Self {
            endpoint: endpoint.trim().trim_end_matches('/').to_string(),
            api_key,
            deployment: deployment.trim().to_string(),
            api_version: service.api_version.clone(),
        })
    }

    /// Full chat-completions URL for the configured deployment.
    pub fn chat_completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, self.api_version
        )
    }
}

fn missing(key: &str) -> RcptError {
    RcptError::Config(format!("{} must be set", key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_batch_layout() {
        let config = RcptConfig::default();
        assert_eq!(config.batch.input_dir, PathBuf::from("input_documents"));
        assert_eq!(config.batch.output_dir, PathBuf::from("output_results"));
        assert_eq!(config.extraction.max_tokens, 2000);
        assert_eq!(config.service.api_version, "2024-08-01-preview");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: RcptConfig =
            serde_json::from_str(r#"{"extraction": {"temperature": 0.0}}"#).unwrap();
        assert_eq!(config.extraction.temperature, 0.0);
        assert_eq!(config.extraction.max_tokens, 2000);
        assert_eq!(config.service.timeout_secs, 120);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = RcptConfig::default();
        config.service.deployment = Some("gpt-4o".to_string());
        config.save(&path).unwrap();

        let loaded = RcptConfig::from_file(&path).unwrap();
        assert_eq!(loaded.service.deployment.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(RcptConfig::from_file(&path), Err(RcptError::Config(_))));
    }

    #[test]
    fn test_resolve_from_environment() {
        let settings = AzureSettings::resolve(
            &ServiceConfig::default(),
            lookup(&[
                (ENV_ENDPOINT, "https://example.openai.azure.com/"),
                (ENV_API_KEY, "secret"),
                (ENV_DEPLOYMENT, "gpt-4o"),
            ]),
        )
        .unwrap();

        assert_eq!(
            settings.chat_completions_url(),
            "https://example.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-08-01-preview"
        );
        assert_eq!(settings.api_key, "secret");
    }

    #[test]
    fn test_environment_overrides_file() {
        let service = ServiceConfig {
            endpoint: Some("https://file.example.com".to_string()),
            deployment: Some("file-deployment".to_string()),
            ..ServiceConfig::default()
        };

        let settings = AzureSettings::resolve(
            &service,
            lookup(&[(ENV_API_KEY, "secret"), (ENV_DEPLOYMENT, "env-deployment")]),
        )
        .unwrap();

        assert_eq!(settings.endpoint, "https://file.example.com");
        assert_eq!(settings.deployment, "env-deployment");
    }

    #[test]
    fn test_missing_credential_is_config_error() {
        let err = AzureSettings::resolve(
            &ServiceConfig::default(),
            lookup(&[
                (ENV_ENDPOINT, "https://example.openai.azure.com"),
                (ENV_DEPLOYMENT, "gpt-4o"),
                (ENV_API_KEY, ""),
            ]),
        )
        .unwrap_err();

        assert!(err.to_string().contains(ENV_API_KEY));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let settings = AzureSettings::resolve(
            &ServiceConfig::default(),
            lookup(&[
                (ENV_ENDPOINT, "https://example.openai.azure.com"),
                (ENV_API_KEY, "top-secret"),
                (ENV_DEPLOYMENT, "gpt-4o"),
            ]),
        )
        .unwrap();

        assert!(!format!("{:?}", settings).contains("top-secret"));
    }
}
