//! Tier ordering, retry budgets, and circuit breaker behaviour.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use fetch_gateway::fetch::FetchRequest;
use fetch_gateway::observability::Outcome;
use fetch_gateway::resilience::{CircuitBreaker, CircuitStatus, RetryPolicy};
use fetch_gateway::{FetchError, StrategyKind};

mod common;
use common::{content, network, ScriptedStrategy, Step};

fn request() -> FetchRequest {
    FetchRequest::new("https://shop.example/item/42", Duration::from_secs(60)).unwrap()
}

#[tokio::test(start_paused = true)]
async fn open_circuit_calls_no_strategy() {
    let breaker = Arc::new(CircuitBreaker::new(1));
    let fast = Arc::new(ScriptedStrategy::always(StrategyKind::Fast, content("<html>ok</html>")));
    let rendered = Arc::new(ScriptedStrategy::always(StrategyKind::Rendered, content("<html>ok</html>")));
    let orchestrator = common::orchestrator(
        breaker.clone(),
        vec![fast.clone(), rendered.clone()],
        common::standard_policy(),
    );

    breaker.record_failure();
    for _ in 0..3 {
        let err = orchestrator.fetch(&request()).await.unwrap_err();
        assert_eq!(err, FetchError::CircuitOpen { consecutive_failures: 1 });
    }

    assert_eq!(fast.calls(), 0);
    assert_eq!(rendered.calls(), 0);
}

/// Threshold 5, three attempts per tier, every origin down.
#[tokio::test(start_paused = true)]
async fn breaker_opens_after_five_exhausted_requests() {
    let breaker = Arc::new(CircuitBreaker::new(5));
    let fast = Arc::new(ScriptedStrategy::always(StrategyKind::Fast, network("HTTP 503")));
    let rendered = Arc::new(ScriptedStrategy::always(StrategyKind::Rendered, network("render down")));
    let orchestrator = common::orchestrator(
        breaker.clone(),
        vec![fast.clone(), rendered.clone()],
        common::standard_policy(),
    );

    for i in 1..=5u32 {
        let err = orchestrator.fetch(&request()).await.unwrap_err();
        let FetchError::Exhausted(failures) = err else {
            panic!("expected Exhausted, got {err:?}");
        };
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].strategy, StrategyKind::Fast);
        assert_eq!(failures[0].attempts, 3);
        assert_eq!(failures[1].strategy, StrategyKind::Rendered);
        assert_eq!(failures[1].attempts, 3);
        assert_eq!(breaker.consecutive_failures(), i);
    }

    assert_eq!(breaker.status(), CircuitStatus::Open);
    assert_eq!(fast.calls(), 15);
    assert_eq!(rendered.calls(), 15);

    let err = orchestrator.fetch(&request()).await.unwrap_err();
    assert!(matches!(err, FetchError::CircuitOpen { .. }));
    assert_eq!(fast.calls(), 15);
    assert_eq!(rendered.calls(), 15);

    breaker.reset();
    assert_eq!(breaker.status(), CircuitStatus::Closed);
    assert!(orchestrator.fetch(&request()).await.is_err());
    assert_eq!(fast.calls(), 18);
}

#[tokio::test(start_paused = true)]
async fn success_resets_failure_count() {
    let breaker = Arc::new(CircuitBreaker::new(5));
    let fast = Arc::new(ScriptedStrategy::sequence(
        StrategyKind::Fast,
        vec![network("reset"); 6],
        content("<html>19.99</html>"),
    ));
    let orchestrator = common::orchestrator(breaker.clone(), vec![fast.clone()], common::standard_policy());

    assert!(orchestrator.fetch(&request()).await.is_err());
    assert!(orchestrator.fetch(&request()).await.is_err());
    assert_eq!(breaker.consecutive_failures(), 2);

    let result = orchestrator.fetch(&request()).await.unwrap();
    assert_eq!(result.strategy, StrategyKind::Fast);
    assert_eq!(breaker.consecutive_failures(), 0);
    assert_eq!(breaker.status(), CircuitStatus::Closed);
}

/// Fast fails twice, then succeeds on the third attempt.
#[tokio::test(start_paused = true)]
async fn fast_recovers_within_budget() {
    let breaker = Arc::new(CircuitBreaker::new(5));
    let fast = Arc::new(ScriptedStrategy::sequence(
        StrategyKind::Fast,
        vec![network("HTTP 503"), Step::Fail(FetchError::Timeout(Duration::from_secs(10)))],
        content("<html>19.99</html>"),
    ));
    let rendered = Arc::new(ScriptedStrategy::always(StrategyKind::Rendered, content("<html>r</html>")));
    let orchestrator = common::orchestrator(
        breaker.clone(),
        vec![fast.clone(), rendered.clone()],
        common::standard_policy(),
    );

    let result = orchestrator.fetch(&request()).await.unwrap();

    assert_eq!(result.strategy, StrategyKind::Fast);
    assert_eq!(result.attempts, 3);
    assert_eq!(result.content, "<html>19.99</html>");
    // 0.5s + 1s of backoff, no time spent in the scripted attempts.
    assert_eq!(result.elapsed, Duration::from_millis(1500));
    assert_eq!(rendered.calls(), 0);
    assert_eq!(breaker.consecutive_failures(), 0);

    let metrics = orchestrator.metrics();
    assert_eq!(metrics.count(StrategyKind::Fast, Outcome::Success), 1);
    assert_eq!(metrics.count(StrategyKind::Fast, Outcome::Failure), 0);
}

#[tokio::test(start_paused = true)]
async fn rendered_runs_only_after_fast_budget_exhausted() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let breaker = Arc::new(CircuitBreaker::new(5));
    let fast = Arc::new(
        ScriptedStrategy::always(StrategyKind::Fast, network("HTTP 403")).with_log(log.clone()),
    );
    let rendered = Arc::new(
        ScriptedStrategy::always(StrategyKind::Rendered, content("<html>rendered</html>"))
            .with_log(log.clone()),
    );
    let orchestrator = common::orchestrator(
        breaker.clone(),
        vec![fast.clone(), rendered.clone()],
        common::standard_policy(),
    );

    let result = orchestrator.fetch(&request()).await.unwrap();

    assert_eq!(result.strategy, StrategyKind::Rendered);
    assert_eq!(result.attempts, 1);
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            StrategyKind::Fast,
            StrategyKind::Fast,
            StrategyKind::Fast,
            StrategyKind::Rendered
        ]
    );

    let metrics = orchestrator.metrics();
    assert_eq!(metrics.count(StrategyKind::Fast, Outcome::Failure), 1);
    assert_eq!(metrics.count(StrategyKind::Rendered, Outcome::Success), 1);
    assert_eq!(metrics.latency_count(StrategyKind::Rendered), 1);
    assert_eq!(breaker.consecutive_failures(), 0);
}

#[tokio::test(start_paused = true)]
async fn unusable_content_skips_to_next_tier_without_retry() {
    let breaker = Arc::new(CircuitBreaker::new(5));
    let fast = Arc::new(ScriptedStrategy::always(StrategyKind::Fast, content("   ")));
    let rendered = Arc::new(ScriptedStrategy::always(StrategyKind::Rendered, content("<html>ok</html>")));
    let orchestrator = common::orchestrator(
        breaker.clone(),
        vec![fast.clone(), rendered.clone()],
        common::standard_policy(),
    );

    let result = orchestrator.fetch(&request()).await.unwrap();
    assert_eq!(result.strategy, StrategyKind::Rendered);
    assert_eq!(fast.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn unusable_content_everywhere_spares_breaker() {
    let breaker = Arc::new(CircuitBreaker::new(1));
    let fast = Arc::new(ScriptedStrategy::always(StrategyKind::Fast, content("")));
    let rendered = Arc::new(ScriptedStrategy::always(StrategyKind::Rendered, content("")));
    let orchestrator = common::orchestrator(
        breaker.clone(),
        vec![fast.clone(), rendered.clone()],
        common::standard_policy(),
    );

    let err = orchestrator.fetch(&request()).await.unwrap_err();
    let FetchError::Exhausted(failures) = err else {
        panic!("expected Exhausted, got {err:?}");
    };
    assert!(failures.iter().all(|f| f.error.kind() == "extraction"));
    assert_eq!(breaker.status(), CircuitStatus::Closed);
    assert_eq!(breaker.consecutive_failures(), 0);
}

#[tokio::test(start_paused = true)]
async fn hung_attempt_times_out_at_tier_limit() {
    let breaker = Arc::new(CircuitBreaker::new(5));
    let fast = Arc::new(
        ScriptedStrategy::always(StrategyKind::Fast, Step::Hang).with_timeout(Duration::from_secs(2)),
    );
    let orchestrator = common::orchestrator(breaker.clone(), vec![fast.clone()], RetryPolicy::no_retry());

    let started = tokio::time::Instant::now();
    let err = orchestrator.fetch(&request()).await.unwrap_err();

    assert_eq!(started.elapsed(), Duration::from_secs(2));
    let FetchError::Exhausted(failures) = err else {
        panic!("expected Exhausted, got {err:?}");
    };
    assert_eq!(*failures[0].error, FetchError::Timeout(Duration::from_secs(2)));
    assert_eq!(breaker.consecutive_failures(), 1);
}

#[tokio::test(start_paused = true)]
async fn request_deadline_bounds_every_tier() {
    let breaker = Arc::new(CircuitBreaker::new(5));
    let fast = Arc::new(ScriptedStrategy::always(StrategyKind::Fast, Step::Hang));
    let rendered = Arc::new(ScriptedStrategy::always(StrategyKind::Rendered, content("<html>late</html>")));
    let orchestrator = common::orchestrator(
        breaker.clone(),
        vec![fast.clone(), rendered.clone()],
        common::standard_policy(),
    );

    let request = FetchRequest::new("https://shop.example/slow", Duration::from_secs(3)).unwrap();
    let started = tokio::time::Instant::now();
    let err = orchestrator.fetch(&request).await.unwrap_err();

    assert!(started.elapsed() <= Duration::from_secs(3));
    assert_eq!(fast.calls(), 1);
    assert_eq!(rendered.calls(), 0);
    assert!(matches!(err, FetchError::Exhausted(ref f) if f.len() == 1));
    assert_eq!(breaker.consecutive_failures(), 0);
}

/// Tight caller budgets must not open the circuit for a healthy origin.
#[tokio::test(start_paused = true)]
async fn exhausted_request_budget_spares_breaker() {
    let breaker = Arc::new(CircuitBreaker::new(5));
    let fast = Arc::new(ScriptedStrategy::always(
        StrategyKind::Fast,
        Step::Slow(Duration::from_millis(20), "<html>19.99</html>".into()),
    ));
    let rendered = Arc::new(ScriptedStrategy::always(
        StrategyKind::Rendered,
        Step::Slow(Duration::from_millis(20), "<html>19.99</html>".into()),
    ));
    let orchestrator = common::orchestrator(
        breaker.clone(),
        vec![fast.clone(), rendered.clone()],
        common::standard_policy(),
    );

    for _ in 0..6 {
        let tight = FetchRequest::new("https://shop.example/item/42", Duration::from_millis(1)).unwrap();
        let err = orchestrator.fetch(&tight).await.unwrap_err();
        assert_eq!(err.kind(), "exhausted");
    }

    assert_eq!(breaker.consecutive_failures(), 0);
    assert_eq!(breaker.status(), CircuitStatus::Closed);
    assert_eq!(rendered.calls(), 0);

    let result = orchestrator.fetch(&request()).await.unwrap();
    assert_eq!(result.strategy, StrategyKind::Fast);
}

/// A retry cut short because the next backoff would overrun the budget.
#[tokio::test(start_paused = true)]
async fn budget_too_small_for_backoff_spares_breaker() {
    let breaker = Arc::new(CircuitBreaker::new(1));
    let fast = Arc::new(ScriptedStrategy::always(StrategyKind::Fast, network("HTTP 503")));
    let rendered = Arc::new(ScriptedStrategy::always(StrategyKind::Rendered, network("render down")));
    let orchestrator = common::orchestrator(
        breaker.clone(),
        vec![fast.clone(), rendered.clone()],
        common::standard_policy(),
    );

    let request = FetchRequest::new("https://shop.example/item/42", Duration::from_millis(300)).unwrap();
    let err = orchestrator.fetch(&request).await.unwrap_err();

    assert!(matches!(err, FetchError::Exhausted(ref f) if f.len() == 1));
    assert_eq!(fast.calls(), 1);
    assert_eq!(rendered.calls(), 0);
    assert_eq!(breaker.status(), CircuitStatus::Closed);
}

#[tokio::test(start_paused = true)]
async fn shutdown_error_is_not_a_breaker_failure() {
    let breaker = Arc::new(CircuitBreaker::new(1));
    let fast = Arc::new(ScriptedStrategy::always(StrategyKind::Fast, Step::Fail(FetchError::Shutdown)));
    let rendered = Arc::new(ScriptedStrategy::always(StrategyKind::Rendered, content("<html>ok</html>")));
    let orchestrator = common::orchestrator(
        breaker.clone(),
        vec![fast.clone(), rendered.clone()],
        common::standard_policy(),
    );

    assert_eq!(orchestrator.fetch(&request()).await.unwrap_err(), FetchError::Shutdown);
    assert_eq!(rendered.calls(), 0);
    assert_eq!(breaker.status(), CircuitStatus::Closed);
}
