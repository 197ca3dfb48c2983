use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::AiConfig;
use crate::error::{Error, ErrorContext};
use crate::tracking::{MetricsSink, TrackedInvocation};
use crate::types::EvaluationContext;
use crate::Result;

/// A configuration resolved for one evaluation context, with the tracker
/// that invocations made under it report to.
#[derive(Clone)]
pub struct ResolvedConfig {
    pub config: AiConfig,
    pub key: String,
    pub tracker: Arc<dyn MetricsSink>,
}

impl ResolvedConfig {
    pub fn new(key: impl Into<String>, config: AiConfig, tracker: Arc<dyn MetricsSink>) -> Self {
        Self {
            config,
            key: key.into(),
            tracker,
        }
    }

    /// A tracked invocation reporting to this config's tracker.
    pub fn tracked(&self) -> TrackedInvocation<'_> {
        TrackedInvocation::new(self.tracker.as_ref())
    }
}

impl fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("key", &self.key)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Source of AI configurations (a remote flag service, a local file, ...).
pub trait ConfigResolver: Send + Sync {
    /// Completion config; `variables` fill `{{ name }}` placeholders in messages.
    fn config(
        &self,
        key: &str,
        context: &EvaluationContext,
        default: AiConfig,
        variables: &HashMap<String, Value>,
    ) -> Result<ResolvedConfig>;

    /// Agent config; callers read `instructions` rather than `messages`.
    fn agent(
        &self,
        key: &str,
        context: &EvaluationContext,
        default: AiConfig,
    ) -> Result<ResolvedConfig> {
        self.config(key, context, default, &HashMap::new())
    }
}

pub(crate) fn require_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(Error::configuration_with_context(
            "config key must not be empty",
            ErrorContext::new()
                .with_field_path("key")
                .with_source("config_resolver"),
        ));
    }
    Ok(())
}
