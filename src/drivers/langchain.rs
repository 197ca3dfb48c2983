//! Agent framework drivers: chat-model invocation and ReAct agent runs.
//!
//! Both take the configured provider name through [`map_provider_name`] to
//! get the framework's integration name. The chat model receives system
//! messages inline, in their original positions. The agent takes its
//! `prompt` from the configured instructions, or from the joined system text
//! when there are none. Agent results
//! are a `messages` list where every model-produced message carries its own
//! `usage_metadata`.

use serde_json::{json, Value};
use tracing::debug;

use crate::config::AiConfig;
use crate::error::{Error, ErrorContext};
use crate::normalize::{map_provider_name, NormalizedRequest};
use crate::usage::{ResponseShape, UsageFields};
use crate::Result;

use super::{flat_turns, ProviderDriver, ProviderKind, SamplingParams};

pub(crate) const USAGE_FIELDS: UsageFields = UsageFields {
    container: "usage_metadata",
    input: "input_tokens",
    output: "output_tokens",
    total: "total_tokens",
};

const DEFAULT_TEMPERATURE: f64 = 0.7;
const DEFAULT_MAX_TOKENS: u64 = 1000;

fn model_provider(config: &AiConfig, kind: ProviderKind) -> Result<String> {
    match config.provider_name() {
        Some(name) if !name.trim().is_empty() => Ok(map_provider_name(name)),
        _ => Err(Error::configuration_with_context(
            "provider name is required to pick a framework integration",
            ErrorContext::new()
                .with_field_path("provider.name")
                .with_source(kind.as_str()),
        )),
    }
}

#[derive(Debug, Default)]
pub struct LangChainDriver;

impl ProviderDriver for LangChainDriver {
    fn kind(&self) -> ProviderKind {
        ProviderKind::LangChain
    }

    fn build_body(&self, config: &AiConfig, prompt: &NormalizedRequest) -> Result<Value> {
        let params = SamplingParams::from_model(&config.model);
        let mut body = json!({
            "model": config.model.name,
            "model_provider": model_provider(config, self.kind())?,
            "temperature": params.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            "max_tokens": params.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "messages": flat_turns(&prompt.conversation),
        });
        if let Some(p) = params.top_p {
            body["top_p"] = json!(p);
        }
        Ok(body)
    }

    fn response_shape(&self, body: &Value) -> ResponseShape {
        ResponseShape::single(body, &USAGE_FIELDS)
    }

    fn response_text(&self, body: &Value) -> Option<String> {
        body.get("content").and_then(Value::as_str).map(String::from)
    }
}

#[derive(Debug, Default)]
pub struct LangGraphDriver;

impl LangGraphDriver {
    /// Agent prompt: the configured instructions, else the joined system text.
    fn prompt(config: &AiConfig, prompt: &NormalizedRequest) -> Option<String> {
        let system = prompt.system.as_deref().filter(|s| !s.is_empty());
        match config.instructions.as_deref().filter(|s| !s.is_empty()) {
            Some(instructions) => {
                if system.is_some() {
                    debug!("agent instructions take precedence over system messages");
                }
                Some(instructions.to_string())
            }
            None => system.map(String::from),
        }
    }
}

impl ProviderDriver for LangGraphDriver {
    fn kind(&self) -> ProviderKind {
        ProviderKind::LangGraph
    }

    fn build_body(&self, config: &AiConfig, prompt: &NormalizedRequest) -> Result<Value> {
        let mut body = json!({
            "model": config.model.name,
            "model_provider": model_provider(config, self.kind())?,
            "messages": flat_turns(&prompt.turns),
        });
        if let Some(p) = Self::prompt(config, prompt) {
            body["prompt"] = Value::String(p);
        }
        Ok(body)
    }

    fn response_shape(&self, body: &Value) -> ResponseShape {
        ResponseShape::message_list(body, "messages", &USAGE_FIELDS)
    }

    fn response_text(&self, body: &Value) -> Option<String> {
        body.get("messages")
            .and_then(Value::as_array)
            .and_then(|m| m.last())
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
            .map(String::from)
    }
}
