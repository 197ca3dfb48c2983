//! Metrics sinks: where tracked invocations report to.
//!
//! Reporting is fire-and-forget, so every method returns `()`. Sinks must be
//! `Send + Sync`; they are owned by the caller and may be shared across
//! concurrent invocations.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::info;

use crate::types::TokenUsage;

/// One recorded metric, in the order it was reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetricEvent {
    Duration { millis: u64 },
    Success,
    Error,
    Tokens(TokenUsage),
    Feedback { positive: bool },
}

/// External collaborator receiving invocation telemetry.
pub trait MetricsSink: Send + Sync {
    fn record_duration(&self, duration: Duration);

    fn record_success(&self);

    fn record_error(&self);

    fn record_tokens(&self, usage: TokenUsage);

    /// User feedback on a generation (thumbs up / down).
    fn record_feedback(&self, _positive: bool) {}
}

/// Default sink (no collection).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn record_duration(&self, _duration: Duration) {}
    fn record_success(&self) {}
    fn record_error(&self) {}
    fn record_tokens(&self, _usage: TokenUsage) {}
}

pub fn noop_sink() -> Arc<dyn MetricsSink> {
    Arc::new(NoopMetricsSink)
}

/// In-memory sink for testing.
#[derive(Debug, Default)]
pub struct InMemoryMetricsSink {
    events: Mutex<Vec<MetricEvent>>,
}

impl InMemoryMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<MetricEvent> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn push(&self, event: MetricEvent) {
        self.lock().push(event);
    }

    // poisoned locks still record
    fn lock(&self) -> MutexGuard<'_, Vec<MetricEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MetricsSink for InMemoryMetricsSink {
    fn record_duration(&self, duration: Duration) {
        self.push(MetricEvent::Duration {
            millis: duration.as_millis() as u64,
        });
    }

    fn record_success(&self) {
        self.push(MetricEvent::Success);
    }

    fn record_error(&self) {
        self.push(MetricEvent::Error);
    }

    fn record_tokens(&self, usage: TokenUsage) {
        self.push(MetricEvent::Tokens(usage));
    }

    fn record_feedback(&self, positive: bool) {
        self.push(MetricEvent::Feedback { positive });
    }
}

/// Emits one `tracing` event per metric, tagged with the config key.
#[derive(Debug, Clone)]
pub struct LoggingMetricsSink {
    config_key: String,
}

impl LoggingMetricsSink {
    pub fn new(config_key: impl Into<String>) -> Self {
        Self {
            config_key: config_key.into(),
        }
    }
}

impl MetricsSink for LoggingMetricsSink {
    fn record_duration(&self, duration: Duration) {
        info!(
            config_key = %self.config_key,
            duration_ms = duration.as_millis() as u64,
            "ai config duration"
        );
    }

    fn record_success(&self) {
        info!(config_key = %self.config_key, "ai config generation succeeded");
    }

    fn record_error(&self) {
        info!(config_key = %self.config_key, "ai config generation failed");
    }

    fn record_tokens(&self, usage: TokenUsage) {
        info!(
            config_key = %self.config_key,
            input_tokens = usage.input,
            output_tokens = usage.output,
            total_tokens = usage.total,
            "ai config token usage"
        );
    }

    fn record_feedback(&self, positive: bool) {
        info!(config_key = %self.config_key, positive, "ai config feedback");
    }
}

/// Composite sink for multiple destinations.
#[derive(Default, Clone)]
pub struct CompositeMetricsSink {
    sinks: Vec<Arc<dyn MetricsSink>>,
}

impl CompositeMetricsSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl MetricsSink for CompositeMetricsSink {
    fn record_duration(&self, duration: Duration) {
        for s in &self.sinks {
            s.record_duration(duration);
        }
    }

    fn record_success(&self) {
        for s in &self.sinks {
            s.record_success();
        }
    }

    fn record_error(&self) {
        for s in &self.sinks {
            s.record_error();
        }
    }

    fn record_tokens(&self, usage: TokenUsage) {
        for s in &self.sinks {
            s.record_tokens(usage);
        }
    }

    fn record_feedback(&self, positive: bool) {
        for s in &self.sinks {
            s.record_feedback(positive);
        }
    }
}
