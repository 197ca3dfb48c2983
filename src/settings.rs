//! Runtime settings: which store and config key to use, how to treat
//! unrecognized roles, and where the HTTP providers live.
//!
//! Settings come from an optional YAML file, then environment variables
//! override individual fields:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `AI_CONFIG_PATH` | `config_path` |
//! | `AI_CONFIG_KEY` | `config_key` (default `sample-ai-config`) |
//! | `AI_PROVIDER` | `provider` |
//! | `AI_ROLE_POLICY` | `role_policy` (`drop` or `reject`) |
//! | `AI_HTTP_TIMEOUT_SECS` | `http.timeout_secs` (default 30) |
//! | `OPENAI_BASE_URL` | `http.openai_base_url` |
//! | `GEMINI_BASE_URL` | `http.gemini_base_url` |
//! | `BEDROCK_BASE_URL` | `http.bedrock_base_url` |
//!
//! API keys are not part of the settings; the HTTP client reads them itself.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::drivers::ProviderKind;
use crate::error::{Error, ErrorContext};
use crate::normalize::RolePolicy;
use crate::Result;

pub const DEFAULT_CONFIG_KEY: &str = "sample-ai-config";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_BEDROCK_BASE_URL: &str = "https://bedrock-runtime.us-east-1.amazonaws.com";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub openai_base_url: String,
    pub gemini_base_url: String,
    pub bedrock_base_url: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            bedrock_base_url: DEFAULT_BEDROCK_BASE_URL.to_string(),
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn base_url(&self, kind: ProviderKind) -> Option<&str> {
        match kind {
            ProviderKind::OpenAi => Some(&self.openai_base_url),
            ProviderKind::Gemini => Some(&self.gemini_base_url),
            ProviderKind::Bedrock => Some(&self.bedrock_base_url),
            ProviderKind::LangChain | ProviderKind::LangGraph => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub config_path: Option<PathBuf>,
    pub config_key: String,
    /// Forces a provider family instead of the one named by the config.
    pub provider: Option<ProviderKind>,
    pub role_policy: RolePolicy,
    pub http: HttpSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_path: None,
            config_key: DEFAULT_CONFIG_KEY.to_string(),
            provider: None,
            role_policy: RolePolicy::default(),
            http: HttpSettings::default(),
        }
    }
}

impl Settings {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let settings: Settings = serde_yaml::from_str(&text)?;
        Ok(settings)
    }

    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable lookup; blank values are ignored.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(path) = get("AI_CONFIG_PATH") {
            self.config_path = Some(PathBuf::from(path));
        }
        if let Some(key) = get("AI_CONFIG_KEY") {
            self.config_key = key;
        }
        if let Some(provider) = get("AI_PROVIDER") {
            self.provider = Some(provider.parse()?);
        }
        if let Some(policy) = get("AI_ROLE_POLICY") {
            self.role_policy = policy.parse()?;
        }
        if let Some(secs) = get("AI_HTTP_TIMEOUT_SECS") {
            self.http.timeout_secs = secs.trim().parse::<u64>().map_err(|_| {
                Error::configuration_with_context(
                    format!("invalid timeout '{}'", secs),
                    ErrorContext::new()
                        .with_field_path("AI_HTTP_TIMEOUT_SECS")
                        .with_details("expected whole seconds")
                        .with_source("settings"),
                )
            })?;
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            self.http.openai_base_url = url;
        }
        if let Some(url) = get("GEMINI_BASE_URL") {
            self.http.gemini_base_url = url;
        }
        if let Some(url) = get("BEDROCK_BASE_URL") {
            self.http.bedrock_base_url = url;
        }
        Ok(self)
    }
}
