//! 类型系统模块：消息、Token 用量与评估上下文。
//!
//! # Types Module
//!
//! Core value types shared by the normalizer, the tracker and the resolver.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Message`] | Chat message with role and text content |
//! | [`MessageRole`] | `system`, `user`, `assistant`, or an unrecognized role |
//! | [`TokenUsage`] | Input/output/total token counters |
//! | [`EvaluationContext`] | Identity and attributes a configuration is resolved for |
//!
//! ## Example
//!
//! ```rust
//! use ai_config_bridge::types::{EvaluationContext, Message};
//!
//! let context = EvaluationContext::builder("example-user-key")
//!     .name("Sandy")
//!     .build()
//!     .unwrap();
//! let prompt = vec![Message::system("Be terse."), Message::user("Hi")];
//! assert_eq!(context.kind, "user");
//! assert_eq!(prompt.len(), 2);
//! ```

pub mod context;
pub mod message;
pub mod usage;

pub use context::{EvaluationContext, EvaluationContextBuilder};
pub use message::{Message, MessageRole};
pub use usage::TokenUsage;
