//! Resolved AI configuration structures

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::types::Message;

/// Model selection plus open-ended model parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub parameters: HashMap<String, Value>,
}

impl ModelConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: HashMap::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn parameter(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key).filter(|v| !v.is_null())
    }

    pub fn parameter_f64(&self, key: &str) -> Option<f64> {
        self.parameter(key).and_then(Value::as_f64)
    }

    pub fn parameter_u64(&self, key: &str) -> Option<u64> {
        self.parameter(key).and_then(Value::as_u64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
}

impl ProviderConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// The resolved bundle returned for an evaluation context.
///
/// Completion configs carry `messages`; agent configs carry `instructions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl AiConfig {
    pub fn new(model: ModelConfig) -> Self {
        Self {
            enabled: true,
            model,
            provider: None,
            messages: Vec::new(),
            instructions: None,
        }
    }

    /// Fallback that switches the feature off when nothing better resolves.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(ModelConfig::default())
        }
    }

    pub fn with_provider(mut self, name: impl Into<String>) -> Self {
        self.provider = Some(ProviderConfig::new(name));
        self
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn provider_name(&self) -> Option<&str> {
        self.provider.as_ref().map(|p| p.name.as_str())
    }
}
