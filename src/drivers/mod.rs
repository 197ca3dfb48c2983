//! Provider 驱动：将统一的 AI 配置转换为各厂商的调用载荷
//!
//! Provider drivers. Each supported provider family has one stateless driver
//! that turns a resolved [`AiConfig`] into the provider's call payload and
//! knows where that provider puts usage data and response text.
//!
//! Dispatch is a closed table: [`ProviderKind::driver`] maps every kind to
//! its driver at compile time, and [`ProviderKind::from_name`] rejects names
//! outside the table with [`Error::UnsupportedProvider`].

pub mod bedrock;
pub mod gemini;
pub mod langchain;
pub mod openai;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::config::{AiConfig, ModelConfig};
use crate::error::{Error, ErrorContext};
use crate::normalize::{normalize, NormalizedRequest, RolePolicy};
use crate::types::Message;
use crate::usage::{ResponseShape, UsageSource};
use crate::Result;

pub use bedrock::BedrockDriver;
pub use gemini::GeminiDriver;
pub use langchain::{LangChainDriver, LangGraphDriver};
pub use openai::OpenAiDriver;

/// Supported provider families.
///
/// Deserializes through [`ProviderKind::from_name`], so aliases such as
/// `google_genai` are accepted wherever a kind is read from YAML or JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ProviderKind {
    /// Managed model hosting, Converse API.
    Bedrock,
    /// Chat-completions API.
    OpenAi,
    /// Generative-AI `generateContent` API.
    Gemini,
    /// Agent framework chat model.
    LangChain,
    /// Agent framework ReAct agent.
    LangGraph,
}

static BEDROCK: BedrockDriver = BedrockDriver;
static OPENAI: OpenAiDriver = OpenAiDriver;
static GEMINI: GeminiDriver = GeminiDriver;
static LANGCHAIN: LangChainDriver = LangChainDriver;
static LANGGRAPH: LangGraphDriver = LangGraphDriver;

impl ProviderKind {
    pub const ALL: [ProviderKind; 5] = [
        ProviderKind::Bedrock,
        ProviderKind::OpenAi,
        ProviderKind::Gemini,
        ProviderKind::LangChain,
        ProviderKind::LangGraph,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Bedrock => "bedrock",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
            ProviderKind::LangChain => "langchain",
            ProviderKind::LangGraph => "langgraph",
        }
    }

    /// Resolve a provider family by name (case-insensitive).
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "bedrock" => Ok(ProviderKind::Bedrock),
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" | "google" | "google_genai" => Ok(ProviderKind::Gemini),
            "langchain" => Ok(ProviderKind::LangChain),
            "langgraph" => Ok(ProviderKind::LangGraph),
            _ => Err(Error::UnsupportedProvider {
                name: name.to_string(),
            }),
        }
    }

    /// The dispatch table.
    pub fn driver(&self) -> &'static dyn ProviderDriver {
        match self {
            ProviderKind::Bedrock => &BEDROCK,
            ProviderKind::OpenAi => &OPENAI,
            ProviderKind::Gemini => &GEMINI,
            ProviderKind::LangChain => &LANGCHAIN,
            ProviderKind::LangGraph => &LANGGRAPH,
        }
    }

    /// Whether the kind is a plain HTTP API rather than an in-process framework.
    pub fn is_http_native(&self) -> bool {
        matches!(
            self,
            ProviderKind::Bedrock | ProviderKind::OpenAi | ProviderKind::Gemini
        )
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ProviderKind::from_name(s)
    }
}

impl TryFrom<String> for ProviderKind {
    type Error = Error;

    fn try_from(name: String) -> Result<Self> {
        ProviderKind::from_name(&name)
    }
}

/// A provider call ready to hand to a [`crate::transport::ProviderClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub kind: ProviderKind,
    /// Model identifier; some providers take it in the URL instead of the body.
    pub model: String,
    pub body: Value,
}

impl ProviderRequest {
    /// Length of the body's `messages` list; zero when it has none.
    pub fn message_count(&self) -> usize {
        self.body
            .get("messages")
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

/// A raw provider response tagged with the family that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub kind: ProviderKind,
    pub body: Value,
}

impl ProviderResponse {
    pub fn new(kind: ProviderKind, body: Value) -> Self {
        Self { kind, body }
    }

    /// Generated text, when the response carries any.
    pub fn text(&self) -> Option<String> {
        self.kind.driver().response_text(&self.body)
    }
}

impl UsageSource for ProviderResponse {
    fn response_shape(&self) -> ResponseShape {
        self.kind.driver().response_shape(&self.body)
    }
}

/// Sampling parameters every driver knows how to place.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SamplingParams {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u64>,
    pub top_p: Option<f64>,
}

impl SamplingParams {
    pub fn from_model(model: &ModelConfig) -> Self {
        Self {
            temperature: model.parameter_f64("temperature"),
            max_tokens: model.parameter_u64("max_tokens"),
            top_p: model.parameter_f64("top_p"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.max_tokens.is_none() && self.top_p.is_none()
    }
}

/// Core trait for provider-specific payload adaptation.
///
/// Drivers are stateless; the same instance serves every call.
pub trait ProviderDriver: Send + Sync + fmt::Debug {
    fn kind(&self) -> ProviderKind;

    /// Build the call payload from a config and its normalized prompt.
    fn build_body(&self, config: &AiConfig, prompt: &NormalizedRequest) -> Result<Value>;

    /// Classify a raw response for usage extraction.
    fn response_shape(&self, body: &Value) -> ResponseShape;

    /// Pull the generated text out of a raw response.
    fn response_text(&self, body: &Value) -> Option<String>;
}

/// Normalize `config.messages` followed by `extra` and build the request for `kind`.
pub fn build_request(
    kind: ProviderKind,
    config: &AiConfig,
    extra: &[Message],
    policy: RolePolicy,
) -> Result<ProviderRequest> {
    if config.model.name.trim().is_empty() {
        return Err(Error::validation_with_context(
            "model name must not be empty",
            ErrorContext::new()
                .with_field_path("model.name")
                .with_source(kind.as_str()),
        ));
    }

    let mut prompt = normalize(&config.messages, policy)?;
    prompt.extend(extra, policy)?;

    let body = kind.driver().build_body(config, &prompt)?;
    Ok(ProviderRequest {
        kind,
        model: config.model.name.clone(),
        body,
    })
}

/// `[{"role": ..., "content": "..."}]` for providers with flat text turns.
pub(crate) fn flat_turns(messages: &[Message]) -> Value {
    Value::Array(
        messages
            .iter()
            .map(|m| serde_json::json!({ "role": m.role.as_str(), "content": m.content }))
            .collect(),
    )
}
