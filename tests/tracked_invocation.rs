//! Tracked invocation: record ordering, error passthrough, concurrency.

use ai_config_bridge::drivers::ProviderResponse;
use ai_config_bridge::tracking::{
    CompositeMetricsSink, InMemoryMetricsSink, MetricEvent, MetricsSink, SummarizingSink,
};
use ai_config_bridge::{InvocationOutcome, ProviderKind, TokenUsage, TrackedInvocation};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, PartialEq)]
enum ProviderFailure {
    Throttled { retry_after_secs: u64 },
}

fn openai_reply() -> ProviderResponse {
    ProviderResponse::new(
        ProviderKind::OpenAi,
        json!({
            "choices": [{"message": {"role": "assistant", "content": "Hi"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }),
    )
}

#[test]
fn test_success_with_usage_reports_three_records() {
    let sink = InMemoryMetricsSink::new();
    let inv = TrackedInvocation::new(&sink).run(|| Ok::<_, ProviderFailure>(openai_reply()));
    match &inv.outcome {
        InvocationOutcome::Success { value, usage } => {
            assert_eq!(value.text().as_deref(), Some("Hi"));
            assert_eq!(*usage, Some(TokenUsage::new(10, 5, 15)));
        }
        InvocationOutcome::Failure(e) => panic!("unexpected failure {:?}", e),
    }
    let events = sink.events();
    assert_eq!(events.len(), 3);
    assert_eq!(events[2], MetricEvent::Tokens(TokenUsage::new(10, 5, 15)));
}

#[test]
fn test_failure_preserves_error_value() {
    let sink = InMemoryMetricsSink::new();
    let inv = TrackedInvocation::new(&sink).run(|| {
        Err::<ProviderResponse, _>(ProviderFailure::Throttled {
            retry_after_secs: 7,
        })
    });
    let err = inv.into_result().unwrap_err();
    assert_eq!(
        err,
        ProviderFailure::Throttled {
            retry_after_secs: 7
        }
    );
    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1], MetricEvent::Error);
    assert!(!events.iter().any(|e| matches!(e, MetricEvent::Tokens(_))));
}

#[test]
fn test_duration_covers_the_call() {
    let sink = InMemoryMetricsSink::new();
    let inv = TrackedInvocation::new(&sink).run(|| {
        std::thread::sleep(Duration::from_millis(15));
        Ok::<_, ProviderFailure>(openai_reply())
    });
    assert!(inv.duration >= Duration::from_millis(15));
}

#[test]
fn test_block_on_async_invocation() {
    let sink = InMemoryMetricsSink::new();
    let inv = tokio_test::block_on(
        TrackedInvocation::new(&sink).run_async(async { Ok::<_, ProviderFailure>(openai_reply()) }),
    );
    assert!(inv.is_success());
    assert_eq!(sink.len(), 3);
}

#[tokio::test]
async fn test_concurrent_invocations_share_a_sink() {
    let summary = Arc::new(SummarizingSink::default());
    let mut handles = Vec::new();
    for i in 0..8u64 {
        let sink = summary.clone();
        handles.push(tokio::spawn(async move {
            TrackedInvocation::new(sink.as_ref())
                .run_async(async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    if i % 4 == 0 {
                        Err(ProviderFailure::Throttled { retry_after_secs: 1 })
                    } else {
                        Ok(TokenUsage::new(i, 1, i + 1))
                    }
                })
                .await
                .is_success()
        }));
    }
    let mut ok = 0;
    for h in handles {
        if h.await.unwrap() {
            ok += 1;
        }
    }
    let s = summary.summary();
    assert_eq!(ok, 6);
    assert_eq!(s.successes, 6);
    assert_eq!(s.errors, 2);
    // 1+2+3+5+6+7
    assert_eq!(s.usage, Some(TokenUsage::new(24, 6, 30)));
}

#[test]
fn test_composite_sink_sees_same_sequence() {
    let a = Arc::new(InMemoryMetricsSink::new());
    let b = Arc::new(InMemoryMetricsSink::new());
    let composite = CompositeMetricsSink::new()
        .add_sink(a.clone() as Arc<dyn MetricsSink>)
        .add_sink(b.clone() as Arc<dyn MetricsSink>);
    TrackedInvocation::new(&composite).run(|| Ok::<_, ProviderFailure>(openai_reply()));
    assert_eq!(a.events(), b.events());
    assert_eq!(a.len(), 3);
}
