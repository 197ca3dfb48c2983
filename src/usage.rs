//! Token 用量提取：将不同形态的响应归一化为 `TokenUsage`。
//!
//! Usage extraction from a closed set of response shapes.
//!
//! | Shape | Produced by |
//! |-------|-------------|
//! | [`ResponseShape::SingleUsage`] | single-call providers (one usage attachment) |
//! | [`ResponseShape::MessageList`] | agent runs (usage on each produced message) |
//! | [`ResponseShape::NoUsage`] | anything that carries no usage data |
//!
//! "No usage" is a normal result, distinct from a zero-valued [`TokenUsage`]:
//! extraction never fails.

use serde_json::Value;

use crate::types::TokenUsage;

/// Raw counters read from one usage attachment. A missing counter is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageCounters {
    pub input: u64,
    pub output: u64,
    pub total: u64,
}

impl From<UsageCounters> for TokenUsage {
    fn from(c: UsageCounters) -> Self {
        TokenUsage::new(c.input, c.output, c.total)
    }
}

/// Field names of a provider's usage attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageFields {
    /// Key of the usage object on the response (or on each agent message).
    pub container: &'static str,
    pub input: &'static str,
    pub output: &'static str,
    pub total: &'static str,
}

impl UsageFields {
    /// Read the usage attachment from `value`, if it has one.
    ///
    /// The attachment must be a non-empty object; anything else counts as
    /// "no usage" rather than all-zero usage.
    pub fn read(&self, value: &Value) -> Option<UsageCounters> {
        let usage = value.get(self.container)?.as_object()?;
        if usage.is_empty() {
            return None;
        }
        let counter = |key: &str| usage.get(key).and_then(Value::as_u64).unwrap_or(0);
        Some(UsageCounters {
            input: counter(self.input),
            output: counter(self.output),
            total: counter(self.total),
        })
    }
}

/// Recognized response shapes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ResponseShape {
    SingleUsage(UsageCounters),
    /// One entry per message, `None` for messages without usage metadata.
    MessageList(Vec<Option<UsageCounters>>),
    #[default]
    NoUsage,
}

impl ResponseShape {
    /// Shape of a single-call response whose usage sits under `fields.container`.
    pub fn single(body: &Value, fields: &UsageFields) -> Self {
        match fields.read(body) {
            Some(counters) => ResponseShape::SingleUsage(counters),
            None => ResponseShape::NoUsage,
        }
    }

    /// Shape of an agent result: `messages` array, usage per message.
    pub fn message_list(body: &Value, list_key: &str, fields: &UsageFields) -> Self {
        match body.get(list_key).and_then(Value::as_array) {
            Some(messages) => {
                ResponseShape::MessageList(messages.iter().map(|m| fields.read(m)).collect())
            }
            None => ResponseShape::NoUsage,
        }
    }
}

/// Which part of a message list belongs to the current invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageWindow {
    /// Number of leading messages already attributed to earlier steps.
    pub skip: usize,
}

impl UsageWindow {
    pub fn all() -> Self {
        Self { skip: 0 }
    }

    pub fn skip(count: usize) -> Self {
        Self { skip: count }
    }
}

/// Anything the tracker can pull token usage out of.
pub trait UsageSource {
    fn response_shape(&self) -> ResponseShape;
}

impl UsageSource for ResponseShape {
    fn response_shape(&self) -> ResponseShape {
        self.clone()
    }
}

impl UsageSource for TokenUsage {
    fn response_shape(&self) -> ResponseShape {
        ResponseShape::SingleUsage(UsageCounters {
            input: self.input,
            output: self.output,
            total: self.total,
        })
    }
}

/// Normalize `shape` into token usage.
///
/// The window only applies to message lists; a single usage attachment
/// always belongs to the call that produced it.
pub fn extract_usage(shape: &ResponseShape, window: UsageWindow) -> Option<TokenUsage> {
    match shape {
        ResponseShape::SingleUsage(counters) => Some((*counters).into()),
        ResponseShape::MessageList(messages) => messages
            .iter()
            .skip(window.skip)
            .flatten()
            .map(|c| TokenUsage::from(*c))
            .reduce(|acc, u| acc + u),
        ResponseShape::NoUsage => None,
    }
}
