//! Gemini Generate API 驱动：实现 Google Gemini 特有的请求/响应格式转换
//!
//! Google Gemini generateContent API driver. Key differences:
//! - Uses `contents` instead of `messages`, with `parts` instead of `content`.
//! - Roles: `user` and `model` (not `assistant`). System uses `systemInstruction`.
//! - `generationConfig` wraps temperature, max_tokens (→ `maxOutputTokens`), etc.
//! - Response: `candidates[0].content.parts[0].text`, usage under `usageMetadata`.
//! - The model is part of the URL (`models/{model}:generateContent`).

use serde_json::{json, Value};

use crate::config::AiConfig;
use crate::normalize::NormalizedRequest;
use crate::types::{Message, MessageRole};
use crate::usage::{ResponseShape, UsageFields};
use crate::Result;

use super::{ProviderDriver, ProviderKind, SamplingParams};

pub(crate) const USAGE_FIELDS: UsageFields = UsageFields {
    container: "usageMetadata",
    input: "promptTokenCount",
    output: "candidatesTokenCount",
    total: "totalTokenCount",
};

/// Google Gemini generateContent API driver.
#[derive(Debug, Default)]
pub struct GeminiDriver;

impl GeminiDriver {
    /// Convert chat turns to Gemini `contents`.
    pub fn contents(turns: &[Message]) -> Vec<Value> {
        turns
            .iter()
            .filter_map(|m| {
                let role = match m.role {
                    MessageRole::User => "user",
                    MessageRole::Assistant => "model",
                    // normalized turns never carry these
                    MessageRole::System | MessageRole::Other(_) => return None,
                };
                Some(json!({
                    "role": role,
                    "parts": [{ "text": m.content }],
                }))
            })
            .collect()
    }
}

impl ProviderDriver for GeminiDriver {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn build_body(&self, config: &AiConfig, prompt: &NormalizedRequest) -> Result<Value> {
        let mut body = json!({
            "contents": Self::contents(&prompt.turns),
        });

        if let Some(sys) = &prompt.system {
            body["systemInstruction"] = json!({ "parts": [{ "text": sys }] });
        }

        // Gemini uses `generationConfig` for parameters
        let params = SamplingParams::from_model(&config.model);
        if !params.is_empty() {
            let mut gen_config = json!({});
            if let Some(t) = params.temperature {
                gen_config["temperature"] = json!(t);
            }
            if let Some(mt) = params.max_tokens {
                gen_config["maxOutputTokens"] = json!(mt);
            }
            if let Some(p) = params.top_p {
                gen_config["topP"] = json!(p);
            }
            body["generationConfig"] = gen_config;
        }

        Ok(body)
    }

    fn response_shape(&self, body: &Value) -> ResponseShape {
        ResponseShape::single(body, &USAGE_FIELDS)
    }

    fn response_text(&self, body: &Value) -> Option<String> {
        let parts = body
            .pointer("/candidates/0/content/parts")
            .and_then(Value::as_array)?;
        let text: String = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}
