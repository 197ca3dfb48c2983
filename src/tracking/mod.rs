//! 调用追踪：计时、成功/失败分类与 Token 用量上报。
//!
//! Tracked invocation of a provider call.
//!
//! [`TrackedInvocation`] runs one prepared call (a closure or a future),
//! measures its wall-clock duration and reports to a [`MetricsSink`]:
//!
//! | Outcome | Records, in order |
//! |---------|-------------------|
//! | success | duration, success, tokens (only when usage is available) |
//! | failure | duration, error |
//!
//! The error is never swallowed: it comes back inside
//! [`InvocationOutcome::Failure`] exactly as the call produced it, and
//! [`Invocation::into_result`] hands it to the caller unchanged. There is no
//! retry here; wrap the tracker in a retry loop if one is wanted.
//!
//! ## Example
//!
//! ```rust
//! use ai_config_bridge::tracking::{InMemoryMetricsSink, TrackedInvocation};
//! use ai_config_bridge::types::TokenUsage;
//!
//! let sink = InMemoryMetricsSink::new();
//! let tracked = TrackedInvocation::new(&sink)
//!     .run(|| Ok::<_, std::io::Error>(TokenUsage::new(10, 5, 15)));
//! assert_eq!(tracked.usage(), Some(TokenUsage::new(10, 5, 15)));
//! assert_eq!(sink.len(), 3);
//! ```

pub mod sink;
pub mod summary;

pub use sink::{
    noop_sink, CompositeMetricsSink, InMemoryMetricsSink, LoggingMetricsSink, MetricEvent,
    MetricsSink, NoopMetricsSink,
};
pub use summary::{SummarizingSink, TrackerSummary};

use std::future::Future;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::types::TokenUsage;
use crate::usage::{extract_usage, ResponseShape, UsageSource, UsageWindow};

/// Result of the tracked call.
#[derive(Debug)]
pub enum InvocationOutcome<T, E> {
    Success {
        value: T,
        usage: Option<TokenUsage>,
    },
    Failure(E),
}

/// Outcome of one tracked call, paired with its measured duration.
#[derive(Debug)]
pub struct Invocation<T, E> {
    pub duration: Duration,
    pub outcome: InvocationOutcome<T, E>,
}

impl<T, E> Invocation<T, E> {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, InvocationOutcome::Success { .. })
    }

    pub fn usage(&self) -> Option<TokenUsage> {
        match &self.outcome {
            InvocationOutcome::Success { usage, .. } => *usage,
            InvocationOutcome::Failure(_) => None,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match &self.outcome {
            InvocationOutcome::Success { value, .. } => Some(value),
            InvocationOutcome::Failure(_) => None,
        }
    }

    /// The call's own result; a failure is returned as the original error.
    pub fn into_result(self) -> Result<T, E> {
        match self.outcome {
            InvocationOutcome::Success { value, .. } => Ok(value),
            InvocationOutcome::Failure(err) => Err(err),
        }
    }
}

/// Wraps a single provider call with telemetry.
///
/// Holds no state of its own beyond the borrowed sink and the usage window,
/// so independent invocations can run concurrently.
#[derive(Clone, Copy)]
pub struct TrackedInvocation<'a> {
    sink: &'a dyn MetricsSink,
    window: UsageWindow,
}

impl<'a> TrackedInvocation<'a> {
    pub fn new(sink: &'a dyn MetricsSink) -> Self {
        Self {
            sink,
            window: UsageWindow::all(),
        }
    }

    /// Attribute usage only to messages after the first `count` of an agent
    /// result (those belong to earlier steps).
    pub fn skip_messages(mut self, count: usize) -> Self {
        self.window = UsageWindow::skip(count);
        self
    }

    pub fn run<T, E, F>(&self, call: F) -> Invocation<T, E>
    where
        T: UsageSource,
        F: FnOnce() -> Result<T, E>,
    {
        self.run_with(call, |value: &T| value.response_shape())
    }

    /// Like [`run`](Self::run) for values that do not implement
    /// [`UsageSource`]; `shape` classifies the successful value.
    pub fn run_with<T, E, F, S>(&self, call: F, shape: S) -> Invocation<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        S: FnOnce(&T) -> ResponseShape,
    {
        let start = Instant::now();
        let result = call();
        let duration = start.elapsed();
        Invocation {
            duration,
            outcome: self.observe(duration, result, shape),
        }
    }

    pub async fn run_async<T, E, Fut>(&self, call: Fut) -> Invocation<T, E>
    where
        T: UsageSource,
        Fut: Future<Output = Result<T, E>>,
    {
        let start = Instant::now();
        let result = call.await;
        let duration = start.elapsed();
        Invocation {
            duration,
            outcome: self.observe(duration, result, |value: &T| value.response_shape()),
        }
    }

    fn observe<T, E, S>(
        &self,
        duration: Duration,
        result: Result<T, E>,
        shape: S,
    ) -> InvocationOutcome<T, E>
    where
        S: FnOnce(&T) -> ResponseShape,
    {
        self.sink.record_duration(duration);
        match result {
            Ok(value) => {
                self.sink.record_success();
                let usage = extract_usage(&shape(&value), self.window);
                if let Some(u) = usage {
                    self.sink.record_tokens(u);
                }
                debug!(
                    duration_ms = duration.as_millis() as u64,
                    usage_tracked = usage.is_some(),
                    "tracked invocation succeeded"
                );
                InvocationOutcome::Success { value, usage }
            }
            Err(err) => {
                self.sink.record_error();
                debug!(
                    duration_ms = duration.as_millis() as u64,
                    "tracked invocation failed"
                );
                InvocationOutcome::Failure(err)
            }
        }
    }
}
