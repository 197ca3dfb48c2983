//! # ai-config-bridge
//!
//! 将动态解析的 AI 配置路由到具体的 LLM 厂商调用，并上报耗时、成功/失败与 Token 用量。
//!
//! Routes a dynamically resolved, provider-agnostic AI configuration (model,
//! provider, parameters, messages or agent instructions) into the call
//! payload of a concrete LLM provider, runs the call, and reports telemetry
//! to a metrics sink.
//!
//! ## Overview
//!
//! Three pieces do the work:
//!
//! - **Message normalization** ([`normalize`], [`drivers`]): system text is
//!   split out and placed where each provider wants it; chat turns keep
//!   their order.
//! - **Tracked invocation** ([`tracking`]): one provider call is timed,
//!   classified as success or error, and its usage reported.
//! - **Usage extraction** ([`usage`]): single-call responses and agent
//!   message lists both reduce to an optional [`TokenUsage`].
//!
//! Supported provider families: Bedrock (Converse), OpenAI (chat
//! completions), Gemini (`generateContent`), LangChain chat models and
//! LangGraph ReAct agents.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ai_config_bridge::{AiConfig, AiConfigClientBuilder, EvaluationContext, Message};
//! use std::collections::HashMap;
//!
//! #[tokio::main]
//! async fn main() -> ai_config_bridge::Result<()> {
//!     // AI_CONFIG_PATH points at the YAML config store.
//!     let client = AiConfigClientBuilder::from_env()?.build()?;
//!     let context = EvaluationContext::builder("example-user-key")
//!         .name("Sandy")
//!         .build()?;
//!
//!     let done = client
//!         .completion(
//!             "sample-ai-config",
//!             &context,
//!             AiConfig::disabled(),
//!             &HashMap::new(),
//!             &[Message::user("What can you help me with?")],
//!         )
//!         .await?;
//!     println!("{:?} ({:?})", done.text(), done.usage);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | AI config model, resolver trait, YAML store |
//! | [`normalize`] | System/turn split, role policy, provider aliases |
//! | [`drivers`] | Per-provider payload and response handling |
//! | [`tracking`] | Tracked invocation and metrics sinks |
//! | [`usage`] | Token usage extraction |
//! | [`transport`] | Provider client trait and HTTP client |
//! | [`client`] | Facade tying the pieces together |
//! | [`settings`] | Runtime settings and environment overrides |
//! | [`types`] | Messages, usage counters, evaluation context |

pub mod client;
pub mod config;
pub mod drivers;
pub mod normalize;
pub mod settings;
pub mod tracking;
pub mod transport;
pub mod types;
pub mod usage;

// Re-export main types for convenience
pub use client::{AiConfigClient, AiConfigClientBuilder, Completion};
pub use config::{AiConfig, ConfigResolver, ConfigStore, ModelConfig, ResolvedConfig};
pub use drivers::{build_request, ProviderKind, ProviderRequest, ProviderResponse};
pub use normalize::{map_provider_name, normalize, NormalizedRequest, RolePolicy};
pub use settings::Settings;
pub use tracking::{Invocation, InvocationOutcome, MetricsSink, TrackedInvocation};
pub use transport::{HttpProviderClient, ProviderClient};
pub use types::{EvaluationContext, Message, MessageRole, TokenUsage};
pub use usage::{extract_usage, ResponseShape, UsageWindow};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
