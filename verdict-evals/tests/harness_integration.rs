// Copyright 2025 Verdict (https://github.com/verdict-rs/verdict)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! End-to-end tests for the assertion and bulk-evaluation harness.
//!
//! Metrics here are stubs with call counters, so cache behavior and
//! scheduling policy are observable without any real scorer.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use verdict_evals::{
    assert_test, evaluate, EvalOptions, MeasureContext, Metric, MetricError, MetricVerdict,
    TestCase,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

struct StubMetric {
    name: String,
    threshold: f64,
    score: f64,
    passed: bool,
    error: Option<String>,
    prefer_async: bool,
    prefer_verbose: bool,
    calls: Arc<AtomicUsize>,
    saw_verbose: Arc<AtomicBool>,
}

impl StubMetric {
    fn scoring(name: &str, score: f64, threshold: f64) -> Self {
        Self {
            name: name.to_string(),
            threshold,
            score,
            passed: score >= threshold,
            error: None,
            prefer_async: true,
            prefer_verbose: false,
            calls: Arc::new(AtomicUsize::new(0)),
            saw_verbose: Arc::new(AtomicBool::new(false)),
        }
    }

    fn erroring(name: &str, detail: &str) -> Self {
        Self {
            error: Some(detail.to_string()),
            ..Self::scoring(name, 0.0, 0.5)
        }
    }
}

#[async_trait]
impl Metric for StubMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn async_mode(&self) -> bool {
        self.prefer_async
    }

    fn verbose_mode(&self) -> bool {
        self.prefer_verbose
    }

    async fn measure(
        &self,
        _test_case: &TestCase,
        ctx: &MeasureContext,
    ) -> Result<MetricVerdict, MetricError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if ctx.verbose {
            self.saw_verbose.store(true, Ordering::SeqCst);
        }
        match &self.error {
            Some(detail) => Err(MetricError::Execution(detail.clone())),
            None => Ok(MetricVerdict::new(self.score, self.passed)
                .with_reason(format!("stub score {:.2}", self.score))),
        }
    }
}

fn quiet_options() -> EvalOptions {
    EvalOptions::new()
        .print_results(false)
        .show_indicator(false)
        .write_cache(false)
}

#[tokio::test]
async fn test_context_backed_case_passes_stub_metric() -> anyhow::Result<()> {
    init_tracing();

    let case = TestCase::new(
        "Why did the chicken cross the road?",
        "To get to the other side.",
    )?
    .with_context(vec!["The chicken wanted to cross the road.".to_string()]);

    let metrics: Vec<Arc<dyn Metric>> = vec![Arc::new(StubMetric::scoring("relevancy", 0.9, 0.5))];
    let results = evaluate(&[case], &metrics, quiet_options()).await?;

    assert_eq!(results.len(), 1);
    assert!(results[0].passed);
    assert_eq!(results[0].metric_results[0].score, Some(0.9));
    Ok(())
}

#[tokio::test]
async fn test_assert_passes_then_fails() -> anyhow::Result<()> {
    let case = TestCase::new("prompt", "out")?;

    let passing: Vec<Arc<dyn Metric>> = vec![Arc::new(StubMetric::scoring("relevancy", 0.9, 0.5))];
    assert_test(&case, &passing).await?;

    let failing: Vec<Arc<dyn Metric>> = vec![Arc::new(StubMetric::scoring("relevancy", 0.2, 0.5))];
    let err = assert_test(&case, &failing).await.unwrap_err();
    assert!(err.to_string().contains("relevancy"));
    Ok(())
}

#[tokio::test]
async fn test_cache_reuse_skips_metric_invocation() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let cases = vec![
        TestCase::new("first prompt", "first output")?,
        TestCase::new("second prompt", "second output")?,
    ];

    let cached_options = || {
        quiet_options()
            .write_cache(true)
            .use_cache(true)
            .cache_dir(dir.path())
    };

    let first = StubMetric::scoring("relevancy", 0.9, 0.5);
    let first_calls = first.calls.clone();
    let metrics: Vec<Arc<dyn Metric>> = vec![Arc::new(first)];
    let first_results = evaluate(&cases, &metrics, cached_options()).await?;
    assert_eq!(first_calls.load(Ordering::SeqCst), 2);

    // Fresh metric instance and evaluator: every result must come from the
    // durable cache without a single measure call.
    let second = StubMetric::scoring("relevancy", 0.9, 0.5);
    let second_calls = second.calls.clone();
    let metrics: Vec<Arc<dyn Metric>> = vec![Arc::new(second)];
    let second_results = evaluate(&cases, &metrics, cached_options()).await?;

    assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    for (fresh, cached) in first_results.iter().zip(&second_results) {
        assert_eq!(
            fresh.metric_results[0].score,
            cached.metric_results[0].score
        );
        assert_eq!(fresh.passed, cached.passed);
    }
    Ok(())
}

#[tokio::test]
async fn test_changed_threshold_misses_cache() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let case = TestCase::new("prompt", "out")?;

    let cached_options = || {
        quiet_options()
            .write_cache(true)
            .use_cache(true)
            .cache_dir(dir.path())
    };

    let loose = StubMetric::scoring("relevancy", 0.9, 0.5);
    let metrics: Vec<Arc<dyn Metric>> = vec![Arc::new(loose)];
    evaluate(std::slice::from_ref(&case), &metrics, cached_options()).await?;

    // Same metric name, different configuration: must recompute.
    let strict = StubMetric::scoring("relevancy", 0.9, 0.95);
    let strict_calls = strict.calls.clone();
    let metrics: Vec<Arc<dyn Metric>> = vec![Arc::new(strict)];
    let results = evaluate(std::slice::from_ref(&case), &metrics, cached_options()).await?;

    assert_eq!(strict_calls.load(Ordering::SeqCst), 1);
    assert!(!results[0].passed);
    Ok(())
}

#[tokio::test]
async fn test_errored_results_are_not_cached() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let case = TestCase::new("prompt", "out")?;

    let cached_options = || {
        quiet_options()
            .write_cache(true)
            .use_cache(true)
            .cache_dir(dir.path())
            .ignore_errors(true)
    };

    let flaky = StubMetric::erroring("relevancy", "transient outage");
    let metrics: Vec<Arc<dyn Metric>> = vec![Arc::new(flaky)];
    let results = evaluate(std::slice::from_ref(&case), &metrics, cached_options()).await?;
    assert!(results[0].metric_results[0].errored);

    // The error was not persisted, so a recovered metric is re-invoked.
    let recovered = StubMetric::scoring("relevancy", 0.9, 0.5);
    let recovered_calls = recovered.calls.clone();
    let metrics: Vec<Arc<dyn Metric>> = vec![Arc::new(recovered)];
    let results = evaluate(std::slice::from_ref(&case), &metrics, cached_options()).await?;

    assert_eq!(recovered_calls.load(Ordering::SeqCst), 1);
    assert!(results[0].passed);
    Ok(())
}

#[tokio::test]
async fn test_verbose_override_reaches_metrics() -> anyhow::Result<()> {
    let case = TestCase::new("prompt", "out")?;

    let quiet_metric = StubMetric::scoring("relevancy", 0.9, 0.5);
    let saw_verbose = quiet_metric.saw_verbose.clone();
    let metrics: Vec<Arc<dyn Metric>> = vec![Arc::new(quiet_metric)];

    // Without an override the metric's own preference (off) applies.
    evaluate(std::slice::from_ref(&case), &metrics, quiet_options()).await?;
    assert!(!saw_verbose.load(Ordering::SeqCst));

    // The call-level override wins for this call only.
    evaluate(
        std::slice::from_ref(&case),
        &metrics,
        quiet_options().verbose_mode(true),
    )
    .await?;
    assert!(saw_verbose.load(Ordering::SeqCst));
    Ok(())
}

#[tokio::test]
async fn test_mixed_scheduling_preferences_cover_all_metrics() -> anyhow::Result<()> {
    let cases = vec![
        TestCase::new("first prompt", "first output")?,
        TestCase::new("second prompt", "second output")?,
    ];

    let mut sequentialist = StubMetric::scoring("bleu", 0.7, 0.5);
    sequentialist.prefer_async = false;
    let sequential_calls = sequentialist.calls.clone();
    let concurrentist = StubMetric::scoring("relevancy", 0.9, 0.5);
    let concurrent_calls = concurrentist.calls.clone();

    let metrics: Vec<Arc<dyn Metric>> = vec![Arc::new(concurrentist), Arc::new(sequentialist)];
    let results = evaluate(&cases, &metrics, quiet_options().per_metric_mode()).await?;

    assert_eq!(results.len(), 2);
    assert_eq!(sequential_calls.load(Ordering::SeqCst), 2);
    assert_eq!(concurrent_calls.load(Ordering::SeqCst), 2);
    for run in &results {
        assert!(run.passed);
        assert_eq!(run.metric_results.len(), 2);
    }
    Ok(())
}
