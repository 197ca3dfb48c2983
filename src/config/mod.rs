//! AI 配置模型与解析：配置数据结构、解析接口与本地文件存储
//!
//! AI configuration model, the resolver seam and a local file-backed store.
//!
//! A [`ConfigResolver`] turns a config key plus an [`EvaluationContext`]
//! into a [`ResolvedConfig`]: the [`AiConfig`] to use and the metrics sink
//! its invocations report to. [`ConfigStore`] is the bundled implementation,
//! reading a YAML document and rendering `{{ ... }}` placeholders.
//!
//! [`EvaluationContext`]: crate::types::EvaluationContext

mod interpolate;
mod model;
pub mod resolver;
pub mod store;

pub use interpolate::render;
pub use model::{AiConfig, ModelConfig, ProviderConfig};
pub use resolver::{ConfigResolver, ResolvedConfig};
pub use store::{ConfigStore, SinkFactory};
