//! Configuration for the remote client and the staging workflow.
//!
//! Both structs deserialize from TOML with every field optional. The client
//! configuration can also be read from `FIREKEY_API_*` environment
//! variables.

use serde::{Deserialize, Serialize};

use crate::error::{ImportError, ImportResult};
use crate::merge_strategy::MergeStrategy;

pub const ENV_API_URL: &str = "FIREKEY_API_URL";
pub const ENV_API_TIMEOUT_SECS: &str = "FIREKEY_API_TIMEOUT_SECS";
pub const ENV_API_TOKEN: &str = "FIREKEY_API_TOKEN";

fn default_base_url() -> String {
    "http://localhost:8080/api/import-export".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("firekey-import-core/{}", env!("CARGO_PKG_VERSION"))
}

fn default_true() -> bool {
    true
}

/// Connection settings for the remote analysis service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL the endpoint paths (`/upload`, `/preview/..`) are appended to
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout; an expired timeout is a network error
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Bearer token of the current session, if any
    #[serde(default)]
    pub api_token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            api_token: None,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Load from environment variables, keeping defaults for unset ones.
    pub fn from_env() -> ImportResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ImportResult<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_URL) {
            config.base_url = url;
        }
        if let Some(timeout) = lookup(ENV_API_TIMEOUT_SECS) {
            config.timeout_secs = timeout.trim().parse().map_err(|_| {
                ImportError::Validation(format!("{} must be a number of seconds", ENV_API_TIMEOUT_SECS))
            })?;
        }
        config.api_token = lookup(ENV_API_TOKEN).filter(|t| !t.trim().is_empty());

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(input: &str) -> ImportResult<Self> {
        let config: Self = toml::from_str(input)
            .map_err(|e| ImportError::Validation(format!("Invalid client configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ImportResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(ImportError::Validation("API base URL cannot be empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(ImportError::Validation("Timeout must be at least one second".to_string()));
        }
        Ok(())
    }

    /// Join an endpoint path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Behavior switches for the staging workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Accept a confirm on a degraded (locally parsed) session
    #[serde(default = "default_true")]
    pub allow_degraded_confirm: bool,
    /// Re-fetch the full preview when entering review
    #[serde(default = "default_true")]
    pub refetch_preview: bool,
    #[serde(default)]
    pub default_merge_strategy: MergeStrategy,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            allow_degraded_confirm: true,
            refetch_preview: true,
            default_merge_strategy: MergeStrategy::default(),
        }
    }
}

impl WorkflowConfig {
    pub fn from_toml_str(input: &str) -> ImportResult<Self> {
        toml::from_str(input)
            .map_err(|e| ImportError::Validation(format!("Invalid workflow configuration: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_client_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout_secs, 30);
        assert!(config.api_token.is_none());
        assert!(config.user_agent.starts_with("firekey-import-core/"));
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (ENV_API_URL, "https://vault.example/api/"),
            (ENV_API_TIMEOUT_SECS, "5"),
            (ENV_API_TOKEN, "tok"),
        ]
        .into_iter()
        .collect();

        let config = ClientConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.base_url, "https://vault.example/api/");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.api_token.as_deref(), Some("tok"));
        assert_eq!(config.endpoint("/upload"), "https://vault.example/api/upload");
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        let bad_timeout = ClientConfig::from_lookup(|k| {
            (k == ENV_API_TIMEOUT_SECS).then(|| "soon".to_string())
        });
        assert!(matches!(bad_timeout, Err(ImportError::Validation(_))));

        let empty_url = ClientConfig::from_lookup(|k| (k == ENV_API_URL).then(String::new));
        assert!(matches!(empty_url, Err(ImportError::Validation(_))));
    }

    #[test]
    fn test_client_from_toml() {
        let config = ClientConfig::from_toml_str("base_url = \"https://x.test\"\ntimeout_secs = 10\n").unwrap();
        assert_eq!(config.base_url, "https://x.test");
        assert_eq!(config.timeout_secs, 10);

        assert!(ClientConfig::from_toml_str("timeout_secs = 0").is_err());
    }

    #[test]
    fn test_workflow_from_toml() {
        let config = WorkflowConfig::from_toml_str("allow_degraded_confirm = false\ndefault_merge_strategy = \"skip\"\n").unwrap();
        assert!(!config.allow_degraded_confirm);
        assert!(config.refetch_preview);
        assert_eq!(config.default_merge_strategy, MergeStrategy::Skip);

        assert_eq!(WorkflowConfig::from_toml_str("").unwrap(), WorkflowConfig::default());
    }
}
