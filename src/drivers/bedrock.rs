//! Bedrock Converse API 驱动：嵌套内容块与独立的 system 字段
//!
//! Converse API driver. Key differences from chat-completions:
//! - Each turn carries `content` as an array of parts: `[{"text": "..."}]`.
//! - System text goes to the top-level `system` list, never into `messages`.
//! - Sampling parameters live under `inferenceConfig` (`maxTokens`, `topP`).
//! - The model id is a path segment, so it is not part of the body.
//! - Response: `output.message.content[0].text`, usage under `usage`.

use serde_json::{json, Value};

use crate::config::AiConfig;
use crate::normalize::NormalizedRequest;
use crate::types::Message;
use crate::usage::{ResponseShape, UsageFields};
use crate::Result;

use super::{ProviderDriver, ProviderKind, SamplingParams};

pub(crate) const USAGE_FIELDS: UsageFields = UsageFields {
    container: "usage",
    input: "inputTokens",
    output: "outputTokens",
    total: "totalTokens",
};

#[derive(Debug, Default)]
pub struct BedrockDriver;

impl BedrockDriver {
    /// `{role, content: [{text}]}` per turn.
    pub fn conversation(turns: &[Message]) -> Vec<Value> {
        turns
            .iter()
            .map(|m| {
                json!({
                    "role": m.role.as_str(),
                    "content": [{ "text": m.content }],
                })
            })
            .collect()
    }
}

impl ProviderDriver for BedrockDriver {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Bedrock
    }

    fn build_body(&self, config: &AiConfig, prompt: &NormalizedRequest) -> Result<Value> {
        let mut body = json!({
            "messages": Self::conversation(&prompt.turns),
        });

        if let Some(sys) = &prompt.system {
            body["system"] = json!([{ "text": sys }]);
        }

        let params = SamplingParams::from_model(&config.model);
        if !params.is_empty() {
            let mut inference = json!({});
            if let Some(t) = params.temperature {
                inference["temperature"] = json!(t);
            }
            if let Some(mt) = params.max_tokens {
                inference["maxTokens"] = json!(mt);
            }
            if let Some(p) = params.top_p {
                inference["topP"] = json!(p);
            }
            body["inferenceConfig"] = inference;
        }

        Ok(body)
    }

    fn response_shape(&self, body: &Value) -> ResponseShape {
        ResponseShape::single(body, &USAGE_FIELDS)
    }

    fn response_text(&self, body: &Value) -> Option<String> {
        body.pointer("/output/message/content/0/text")
            .and_then(Value::as_str)
            .map(String::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::normalize::{normalize, RolePolicy};
    use crate::types::TokenUsage;
    use crate::usage::{extract_usage, UsageWindow};

    #[test]
    fn test_system_goes_out_of_band() {
        let msgs = vec![Message::system("Be terse."), Message::user("Hi")];
        let prompt = normalize(&msgs, RolePolicy::Drop).unwrap();
        let cfg = AiConfig::new(ModelConfig::new("anthropic.claude-3-haiku"));
        let body = BedrockDriver.build_body(&cfg, &prompt).unwrap();
        assert_eq!(
            body["messages"],
            json!([{ "role": "user", "content": [{ "text": "Hi" }] }])
        );
        assert_eq!(body["system"], json!([{ "text": "Be terse." }]));
        assert!(body.get("inferenceConfig").is_none());
        assert!(body.get("modelId").is_none());
    }

    #[test]
    fn test_no_system_field_without_system_messages() {
        let prompt = normalize(&[Message::user("Hi")], RolePolicy::Drop).unwrap();
        let cfg = AiConfig::new(ModelConfig::new("m"));
        let body = BedrockDriver.build_body(&cfg, &prompt).unwrap();
        assert!(body.get("system").is_none());
    }

    #[test]
    fn test_inference_config_mapping() {
        let prompt = normalize(&[Message::user("Hi")], RolePolicy::Drop).unwrap();
        let cfg = AiConfig::new(
            ModelConfig::new("m")
                .with_parameter("temperature", 0.3)
                .with_parameter("max_tokens", 512),
        );
        let body = BedrockDriver.build_body(&cfg, &prompt).unwrap();
        assert_eq!(body["inferenceConfig"]["temperature"], 0.3);
        assert_eq!(body["inferenceConfig"]["maxTokens"], 512);
    }

    #[test]
    fn test_parse_converse_response() {
        let body = json!({
            "output": { "message": { "role": "assistant", "content": [{ "text": "Hello!" }] } },
            "stopReason": "end_turn",
            "usage": { "inputTokens": 12, "outputTokens": 3, "totalTokens": 15 }
        });
        assert_eq!(BedrockDriver.response_text(&body).as_deref(), Some("Hello!"));
        let shape = BedrockDriver.response_shape(&body);
        assert_eq!(
            extract_usage(&shape, UsageWindow::all()),
            Some(TokenUsage::new(12, 3, 15))
        );
    }
}
