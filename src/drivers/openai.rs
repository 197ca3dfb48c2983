//! Chat-completions driver.
//!
//! Turns are flat `{role, content}` pairs. System messages stay inline at
//! their original positions. Model parameters are already named the
//! way the API expects, so all of them are copied into the body.

use serde_json::{json, Value};

use crate::config::AiConfig;
use crate::normalize::NormalizedRequest;
use crate::usage::{ResponseShape, UsageFields};
use crate::Result;

use super::{flat_turns, ProviderDriver, ProviderKind};

pub(crate) const USAGE_FIELDS: UsageFields = UsageFields {
    container: "usage",
    input: "prompt_tokens",
    output: "completion_tokens",
    total: "total_tokens",
};

#[derive(Debug, Default)]
pub struct OpenAiDriver;

impl ProviderDriver for OpenAiDriver {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn build_body(&self, config: &AiConfig, prompt: &NormalizedRequest) -> Result<Value> {
        let mut body = json!({
            "model": config.model.name,
            "messages": flat_turns(&prompt.conversation),
        });

        for (k, v) in &config.model.parameters {
            if k == "model" || k == "messages" || v.is_null() {
                continue;
            }
            body[k] = v.clone();
        }

        Ok(body)
    }

    fn response_shape(&self, body: &Value) -> ResponseShape {
        ResponseShape::single(body, &USAGE_FIELDS)
    }

    fn response_text(&self, body: &Value) -> Option<String> {
        body.pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(String::from)
    }
}
