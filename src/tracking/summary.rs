use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::sink::{noop_sink, MetricsSink};
use crate::types::TokenUsage;

/// Running totals of what a tracker has reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrackerSummary {
    pub successes: u64,
    pub errors: u64,
    pub total_duration_ms: u64,
    pub last_duration_ms: Option<u64>,
    /// Sum of every usage record; `None` until the first one arrives.
    pub usage: Option<TokenUsage>,
    pub last_feedback: Option<bool>,
}

impl TrackerSummary {
    pub fn invocations(&self) -> u64 {
        self.successes.saturating_add(self.errors)
    }
}

/// Sink decorator that keeps a [`TrackerSummary`] and forwards every record.
pub struct SummarizingSink {
    inner: Arc<dyn MetricsSink>,
    summary: Mutex<TrackerSummary>,
}

impl SummarizingSink {
    pub fn new(inner: Arc<dyn MetricsSink>) -> Self {
        Self {
            inner,
            summary: Mutex::new(TrackerSummary::default()),
        }
    }

    pub fn summary(&self) -> TrackerSummary {
        self.summary
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update(&self, f: impl FnOnce(&mut TrackerSummary)) {
        let mut summary = self.summary.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *summary);
    }
}

impl Default for SummarizingSink {
    fn default() -> Self {
        Self::new(noop_sink())
    }
}

impl MetricsSink for SummarizingSink {
    fn record_duration(&self, duration: Duration) {
        let ms = duration.as_millis() as u64;
        self.update(|s| {
            s.total_duration_ms = s.total_duration_ms.saturating_add(ms);
            s.last_duration_ms = Some(ms);
        });
        self.inner.record_duration(duration);
    }

    fn record_success(&self) {
        self.update(|s| s.successes = s.successes.saturating_add(1));
        self.inner.record_success();
    }

    fn record_error(&self) {
        self.update(|s| s.errors = s.errors.saturating_add(1));
        self.inner.record_error();
    }

    fn record_tokens(&self, usage: TokenUsage) {
        self.update(|s| {
            s.usage = Some(match s.usage {
                Some(acc) => acc + usage,
                None => usage,
            });
        });
        self.inner.record_tokens(usage);
    }

    fn record_feedback(&self, positive: bool) {
        self.update(|s| s.last_feedback = Some(positive));
        self.inner.record_feedback(positive);
    }
}
