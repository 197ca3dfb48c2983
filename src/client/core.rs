use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::{AiConfig, ConfigResolver, ResolvedConfig};
use crate::drivers::{build_request, ProviderKind, ProviderRequest, ProviderResponse};
use crate::error::ErrorContext;
use crate::settings::Settings;
use crate::tracking::MetricsSink;
use crate::transport::ProviderClient;
use crate::types::{EvaluationContext, Message, TokenUsage};
use crate::{Error, Result};

/// Resolves AI configs and runs tracked provider calls under them.
pub struct AiConfigClient {
    pub(crate) resolver: Arc<dyn ConfigResolver>,
    pub(crate) provider: Arc<dyn ProviderClient>,
    pub(crate) settings: Settings,
}

/// A finished generation.
pub struct Completion {
    pub key: String,
    pub response: ProviderResponse,
    pub usage: Option<TokenUsage>,
    pub duration: Duration,
    tracker: Arc<dyn MetricsSink>,
}

impl Completion {
    pub fn text(&self) -> Option<String> {
        self.response.text()
    }

    /// Report user feedback for this generation to its config's tracker.
    pub fn record_feedback(&self, positive: bool) {
        self.tracker.record_feedback(positive);
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("key", &self.key)
            .field("response", &self.response)
            .field("usage", &self.usage)
            .field("duration", &self.duration)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for AiConfigClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiConfigClient")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl AiConfigClient {
    pub fn new(resolver: Arc<dyn ConfigResolver>, provider: Arc<dyn ProviderClient>) -> Self {
        Self {
            resolver,
            provider,
            settings: Settings::default(),
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Provider family for a config: the settings override, else the config's provider name.
    pub fn provider_kind(&self, config: &AiConfig) -> Result<ProviderKind> {
        if let Some(kind) = self.settings.provider {
            return Ok(kind);
        }
        match config.provider_name() {
            Some(name) => ProviderKind::from_name(name),
            None => Err(Error::configuration_with_context(
                "no provider configured",
                ErrorContext::new()
                    .with_field_path("provider.name")
                    .with_details("set the config's provider or AI_PROVIDER")
                    .with_source("client"),
            )),
        }
    }

    /// Resolve a completion config and build its request without sending it.
    pub fn prepare(
        &self,
        key: &str,
        context: &EvaluationContext,
        default: AiConfig,
        variables: &HashMap<String, Value>,
        extra: &[Message],
    ) -> Result<(ResolvedConfig, ProviderRequest)> {
        let resolved = self.resolver.config(key, context, default, variables)?;
        let request = self.request_for(&resolved, extra)?;
        Ok((resolved, request))
    }

    /// Run a completion: config messages followed by `extra` turns.
    pub async fn completion(
        &self,
        key: &str,
        context: &EvaluationContext,
        default: AiConfig,
        variables: &HashMap<String, Value>,
        extra: &[Message],
    ) -> Result<Completion> {
        let (resolved, request) = self.prepare(key, context, default, variables, extra)?;
        self.invoke(resolved, request, 0).await
    }

    /// Run an agent: `input` turns under the config's instructions.
    ///
    /// Usage is attributed only to messages the agent added beyond the ones it
    /// was given.
    pub async fn agent(
        &self,
        key: &str,
        context: &EvaluationContext,
        default: AiConfig,
        input: &[Message],
    ) -> Result<Completion> {
        let resolved = self.resolver.agent(key, context, default)?;
        let request = self.request_for(&resolved, input)?;
        let sent = request.message_count();
        self.invoke(resolved, request, sent).await
    }

    fn request_for(&self, resolved: &ResolvedConfig, extra: &[Message]) -> Result<ProviderRequest> {
        if !resolved.config.enabled {
            return Err(Error::Disabled {
                key: resolved.key.clone(),
            });
        }
        let kind = self.provider_kind(&resolved.config)?;
        build_request(kind, &resolved.config, extra, self.settings.role_policy)
    }

    async fn invoke(
        &self,
        resolved: ResolvedConfig,
        request: ProviderRequest,
        skip: usize,
    ) -> Result<Completion> {
        let kind = request.kind;
        let provider = &self.provider;
        let tracked = resolved
            .tracked()
            .skip_messages(skip)
            .run_async(async {
                provider
                    .invoke(&request)
                    .await
                    .map(|body| ProviderResponse::new(kind, body))
            })
            .await;

        let duration = tracked.duration;
        let usage = tracked.usage();
        let response = tracked.into_result()?;
        info!(
            config_key = %resolved.key,
            provider = %kind,
            duration_ms = duration.as_millis() as u64,
            "ai config generation completed"
        );
        Ok(Completion {
            key: resolved.key,
            response,
            usage,
            duration,
            tracker: resolved.tracker,
        })
    }
}
