//! File-backed configuration store.
//!
//! The YAML document holds a `configs` map keyed by config key. The parsed
//! snapshot lives behind an `ArcSwap`, so [`ConfigStore::reload`] replaces it
//! atomically while readers keep whatever snapshot they already loaded.

use arc_swap::ArcSwap;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::interpolate::render;
use super::resolver::{require_key, ConfigResolver, ResolvedConfig};
use super::AiConfig;
use crate::error::{Error, ErrorContext};
use crate::tracking::{LoggingMetricsSink, MetricsSink};
use crate::types::{EvaluationContext, Message};
use crate::Result;

/// Builds the tracker handed out with each resolved config.
pub type SinkFactory = Arc<dyn Fn(&str) -> Arc<dyn MetricsSink> + Send + Sync>;

#[derive(Debug, Default, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    configs: HashMap<String, AiConfig>,
}

type Snapshot = HashMap<String, Arc<AiConfig>>;

pub struct ConfigStore {
    snapshot: ArcSwap<Snapshot>,
    path: Option<PathBuf>,
    sink_factory: SinkFactory,
}

impl ConfigStore {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let snapshot = parse_snapshot(yaml)?;
        Ok(Self {
            snapshot: ArcSwap::from_pointee(snapshot),
            path: None,
            sink_factory: default_sink_factory(),
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut store = Self::from_yaml_str(&text).map_err(|e| with_path(e, path))?;
        store.path = Some(path.to_path_buf());
        info!(
            path = %path.display(),
            configs = store.len(),
            "loaded ai config store"
        );
        Ok(store)
    }

    /// Replace the tracker factory (default: one [`LoggingMetricsSink`] per key).
    pub fn with_sink_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&str) -> Arc<dyn MetricsSink> + Send + Sync + 'static,
    {
        self.sink_factory = Arc::new(factory);
        self
    }

    /// Re-read the backing file. Returns the number of configs now loaded.
    pub fn reload(&self) -> Result<usize> {
        let path = self.path.as_ref().ok_or_else(|| {
            Error::configuration_with_context(
                "store was not loaded from a file",
                ErrorContext::new().with_source("config_store"),
            )
        })?;
        let text = std::fs::read_to_string(path)?;
        let snapshot = parse_snapshot(&text).map_err(|e| with_path(e, path))?;
        let count = snapshot.len();
        self.snapshot.store(Arc::new(snapshot));
        info!(path = %path.display(), configs = count, "reloaded ai config store");
        Ok(count)
    }

    /// Swap in a new document without touching the file system.
    pub fn replace_from_yaml_str(&self, yaml: &str) -> Result<usize> {
        let snapshot = parse_snapshot(yaml)?;
        let count = snapshot.len();
        self.snapshot.store(Arc::new(snapshot));
        Ok(count)
    }

    pub fn get(&self, key: &str) -> Option<Arc<AiConfig>> {
        self.snapshot.load().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.snapshot.load().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn resolve(
        &self,
        key: &str,
        context: &EvaluationContext,
        default: AiConfig,
        variables: &HashMap<String, Value>,
    ) -> Result<ResolvedConfig> {
        require_key(key)?;
        let config = match self.get(key) {
            Some(stored) => stored.as_ref().clone(),
            None => {
                debug!(config_key = key, "config not found, using default");
                default
            }
        };
        let config = interpolate(config, variables, context);
        Ok(ResolvedConfig::new(key, config, (self.sink_factory)(key)))
    }
}

impl fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigStore")
            .field("path", &self.path)
            .field("keys", &self.keys())
            .finish_non_exhaustive()
    }
}

impl ConfigResolver for ConfigStore {
    fn config(
        &self,
        key: &str,
        context: &EvaluationContext,
        default: AiConfig,
        variables: &HashMap<String, Value>,
    ) -> Result<ResolvedConfig> {
        self.resolve(key, context, default, variables)
    }
}

fn default_sink_factory() -> SinkFactory {
    Arc::new(|key: &str| Arc::new(LoggingMetricsSink::new(key)) as Arc<dyn MetricsSink>)
}

fn parse_snapshot(yaml: &str) -> Result<Snapshot> {
    let doc: StoreDocument = serde_yaml::from_str(yaml)?;
    let mut snapshot = HashMap::with_capacity(doc.configs.len());
    for (key, config) in doc.configs {
        if key.trim().is_empty() {
            return Err(Error::configuration_with_context(
                "config key must not be empty",
                ErrorContext::new()
                    .with_field_path("configs")
                    .with_source("config_store"),
            ));
        }
        snapshot.insert(key, Arc::new(config));
    }
    Ok(snapshot)
}

fn with_path(err: Error, path: &Path) -> Error {
    match err {
        Error::Configuration { message, context } => Error::Configuration {
            message,
            context: context.with_details(format!("file: {}", path.display())),
        },
        other => other,
    }
}

fn interpolate(
    mut config: AiConfig,
    variables: &HashMap<String, Value>,
    context: &EvaluationContext,
) -> AiConfig {
    config.messages = config
        .messages
        .into_iter()
        .map(|m| Message::new(m.role, render(&m.content, variables, context)))
        .collect();
    config.instructions = config
        .instructions
        .map(|text| render(&text, variables, context));
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::tracking::InMemoryMetricsSink;
    use serde_json::json;

    const STORE: &str = r#"
configs:
  sample-ai-config:
    provider: { name: openai }
    model:
      name: gpt-4o
      parameters: { temperature: 0.5 }
    messages:
      - { role: system, content: "You help {{ companyName }} users." }
      - { role: user, content: "I am {{ context.name }}." }
  code-review-agent:
    enabled: false
    model: { name: claude-3-haiku }
    instructions: "Review code for {{ context.key }}."
"#;

    fn ctx() -> EvaluationContext {
        EvaluationContext::builder("example-user-key")
            .name("Sandy")
            .build()
            .unwrap()
    }

    #[test]
    fn test_config_interpolates_messages() {
        let store = ConfigStore::from_yaml_str(STORE).unwrap();
        let mut vars = HashMap::new();
        vars.insert("companyName".to_string(), json!("Acme"));
        let resolved = store
            .config("sample-ai-config", &ctx(), AiConfig::disabled(), &vars)
            .unwrap();
        assert!(resolved.config.enabled);
        assert_eq!(resolved.config.provider_name(), Some("openai"));
        assert_eq!(resolved.config.messages[0].content, "You help Acme users.");
        assert_eq!(resolved.config.messages[1].content, "I am Sandy.");
        assert_eq!(resolved.key, "sample-ai-config");
    }

    #[test]
    fn test_agent_interpolates_instructions() {
        let store = ConfigStore::from_yaml_str(STORE).unwrap();
        let resolved = store
            .agent("code-review-agent", &ctx(), AiConfig::disabled())
            .unwrap();
        assert!(!resolved.config.enabled);
        assert_eq!(
            resolved.config.instructions.as_deref(),
            Some("Review code for example-user-key.")
        );
    }

    #[test]
    fn test_missing_key_falls_back_to_default() {
        let store = ConfigStore::from_yaml_str(STORE).unwrap();
        let default = AiConfig::new(ModelConfig::new("fallback-model"))
            .with_messages(vec![Message::system("Hello {{ context.name }}")]);
        let resolved = store
            .config("nope", &ctx(), default, &HashMap::new())
            .unwrap();
        assert_eq!(resolved.config.model.name, "fallback-model");
        assert_eq!(resolved.config.messages[0].content, "Hello Sandy");
    }

    #[test]
    fn test_empty_key_is_configuration_error() {
        let store = ConfigStore::from_yaml_str(STORE).unwrap();
        let err = store
            .config("  ", &ctx(), AiConfig::disabled(), &HashMap::new())
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_sink_factory_receives_key() {
        let sink = Arc::new(InMemoryMetricsSink::new());
        let shared = sink.clone();
        let store = ConfigStore::from_yaml_str(STORE)
            .unwrap()
            .with_sink_factory(move |_| shared.clone() as Arc<dyn MetricsSink>);
        let resolved = store
            .config("sample-ai-config", &ctx(), AiConfig::disabled(), &HashMap::new())
            .unwrap();
        resolved.tracker.record_success();
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_replace_swaps_snapshot() {
        let store = ConfigStore::from_yaml_str(STORE).unwrap();
        let before = store.get("sample-ai-config").unwrap();
        let count = store
            .replace_from_yaml_str("configs:\n  other:\n    model: { name: gpt-4o-mini }\n")
            .unwrap();
        assert_eq!(count, 1);
        assert!(store.get("sample-ai-config").is_none());
        assert_eq!(before.model.name, "gpt-4o");
        assert_eq!(store.keys(), vec!["other".to_string()]);
    }

    #[test]
    fn test_reload_without_file_fails() {
        let store = ConfigStore::from_yaml_str(STORE).unwrap();
        assert!(matches!(store.reload(), Err(Error::Configuration { .. })));
    }

    #[test]
    fn test_invalid_yaml_is_yaml_error() {
        let err = ConfigStore::from_yaml_str("configs: [unclosed").unwrap_err();
        assert!(matches!(err, Error::Yaml(_)));
    }
}
