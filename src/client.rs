//! Client facade: resolve a config, shape its request, run the provider call
//! under a tracked invocation.
//!
//! Implementation details are split into submodules under `src/client/`.

pub mod builder;
pub mod core;

pub use builder::AiConfigClientBuilder;
pub use self::core::{AiConfigClient, Completion};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AiConfig, ConfigStore, ModelConfig};
    use crate::drivers::{ProviderKind, ProviderRequest};
    use crate::settings::Settings;
    use crate::tracking::{InMemoryMetricsSink, MetricEvent, MetricsSink};
    use crate::transport::ProviderClient;
    use crate::types::{EvaluationContext, Message, TokenUsage};
    use crate::{Error, Result};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    const STORE: &str = r#"
configs:
  sample-ai-config:
    provider: { name: bedrock }
    model: { name: "anthropic.claude-3-haiku-20240307-v1:0" }
    messages:
      - { role: system, content: "Be terse." }
  code-review-agent:
    provider: { name: openai }
    model: { name: gpt-4o }
    instructions: "You review code."
  switched-off:
    enabled: false
    provider: { name: openai }
    model: { name: gpt-4o }
"#;

    struct Scripted {
        reply: std::result::Result<Value, u16>,
        seen: Mutex<Vec<ProviderRequest>>,
    }

    #[async_trait]
    impl ProviderClient for Scripted {
        async fn invoke(&self, request: &ProviderRequest) -> Result<Value> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(request.clone());
            }
            match &self.reply {
                Ok(v) => Ok(v.clone()),
                Err(status) => Err(Error::Remote {
                    provider: request.kind,
                    status: *status,
                    message: "throttled".into(),
                }),
            }
        }
    }

    fn client(
        reply: std::result::Result<Value, u16>,
        settings: Settings,
    ) -> (AiConfigClient, Arc<InMemoryMetricsSink>, Arc<Scripted>) {
        let sink = Arc::new(InMemoryMetricsSink::new());
        let shared = sink.clone();
        let store = ConfigStore::from_yaml_str(STORE)
            .unwrap()
            .with_sink_factory(move |_| shared.clone() as Arc<dyn MetricsSink>);
        let provider = Arc::new(Scripted {
            reply,
            seen: Mutex::new(Vec::new()),
        });
        let client = AiConfigClientBuilder::new()
            .with_settings(settings)
            .with_resolver(Arc::new(store))
            .with_provider_client(provider.clone())
            .build()
            .unwrap();
        (client, sink, provider)
    }

    fn ctx() -> EvaluationContext {
        EvaluationContext::builder("example-user-key").build().unwrap()
    }

    #[tokio::test]
    async fn test_completion_tracks_bedrock_usage() {
        let reply = json!({
            "output": {"message": {"role": "assistant", "content": [{"text": "Hello."}]}},
            "usage": {"inputTokens": 10, "outputTokens": 5, "totalTokens": 15}
        });
        let (client, sink, provider) = client(Ok(reply), Settings::default());
        let done = client
            .completion(
                "sample-ai-config",
                &ctx(),
                AiConfig::disabled(),
                &HashMap::new(),
                &[Message::user("Hi")],
            )
            .await
            .unwrap();

        assert_eq!(done.text().as_deref(), Some("Hello."));
        assert_eq!(done.usage, Some(TokenUsage::new(10, 5, 15)));
        let sent = provider.seen.lock().unwrap()[0].clone();
        assert_eq!(sent.kind, ProviderKind::Bedrock);
        assert_eq!(sent.body["system"], json!([{"text": "Be terse."}]));
        assert_eq!(
            sent.body["messages"],
            json!([{"role": "user", "content": [{"text": "Hi"}]}])
        );

        done.record_feedback(true);
        let events = sink.events();
        assert_eq!(events[1], MetricEvent::Success);
        assert_eq!(events[2], MetricEvent::Tokens(TokenUsage::new(10, 5, 15)));
        assert_eq!(events[3], MetricEvent::Feedback { positive: true });
    }

    #[tokio::test]
    async fn test_provider_error_propagates_unchanged() {
        let (client, sink, _) = client(Err(429), Settings::default());
        let err = client
            .completion(
                "sample-ai-config",
                &ctx(),
                AiConfig::disabled(),
                &HashMap::new(),
                &[Message::user("Hi")],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Remote { status: 429, .. }));
        assert_eq!(sink.events()[1], MetricEvent::Error);
        assert_eq!(sink.len(), 2);
    }

    #[tokio::test]
    async fn test_disabled_config_is_not_invoked() {
        let (client, sink, provider) = client(Ok(json!({})), Settings::default());
        let err = client
            .completion("switched-off", &ctx(), AiConfig::disabled(), &HashMap::new(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Disabled { .. }));
        assert!(sink.is_empty());
        assert!(provider.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_agent_counts_only_new_messages() {
        let reply = json!({
            "messages": [
                {"role": "user", "content": "Review this"},
                {"role": "assistant", "content": "Looks fine.", "usage_metadata": {"input_tokens": 80, "output_tokens": 30, "total_tokens": 110}}
            ]
        });
        let settings = Settings {
            provider: Some(ProviderKind::LangGraph),
            ..Settings::default()
        };
        let (client, _, provider) = client(Ok(reply), settings);
        let done = client
            .agent(
                "code-review-agent",
                &ctx(),
                AiConfig::disabled(),
                &[Message::user("Review this")],
            )
            .await
            .unwrap();
        assert_eq!(done.usage, Some(TokenUsage::new(80, 30, 110)));
        assert_eq!(done.text().as_deref(), Some("Looks fine."));
        let sent = provider.seen.lock().unwrap()[0].clone();
        assert_eq!(sent.body["prompt"], "You review code.");
        assert_eq!(sent.body["model_provider"], "openai");
    }

    #[test]
    fn test_missing_provider_is_configuration_error() {
        let (client, _, _) = client(Ok(json!({})), Settings::default());
        let cfg = AiConfig::new(ModelConfig::new("gpt-4o"));
        assert!(matches!(
            client.provider_kind(&cfg),
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn test_client_debug_shows_settings() {
        let settings = Settings {
            provider: Some(ProviderKind::OpenAi),
            ..Settings::default()
        };
        let (client, _, _) = client(Ok(json!({})), settings);
        let shown = format!("{:?}", client);
        assert!(shown.starts_with("AiConfigClient"));
        assert!(shown.contains("OpenAi"));
    }

    #[test]
    fn test_builder_without_resolver_or_path_fails() {
        let err = AiConfigClientBuilder::new().build().unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }
}
