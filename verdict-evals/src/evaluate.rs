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

//! Bulk evaluation of many test cases against many metrics
//!
//! Unlike the assert runner, bulk evaluation treats metric failure as data:
//! a failing score lands in the returned [`TestRunResult`] rather than in an
//! error. Only a metric *error* aborts the call, and only while
//! `ignore_errors` is off. Output order always matches test-case input
//! order regardless of concurrency inside each case.
//!
//! Per (test case, metric) pair the lifecycle is cache-hit or compute, then
//! passed, failed, or errored. Nothing is retried automatically; callers
//! wanting a fresh measurement re-run with `use_cache` off.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use uuid::Uuid;
use verdict_core::{MetricResult, TestCase, TestRunResult};

use crate::cache::{CacheStats, ResultCache};
use crate::config::EvalOptions;
use crate::exec;
use crate::progress::ProgressReporter;
use crate::report::{self, RunSummary};
use crate::{EvalError, Metric, MetricError};

/// Evaluate every test case against every metric with the given options.
pub async fn evaluate(
    test_cases: &[TestCase],
    metrics: &[Arc<dyn Metric>],
    options: EvalOptions,
) -> Result<Vec<TestRunResult>, EvalError> {
    BulkEvaluator::new(options)?.evaluate(test_cases, metrics).await
}

/// Many-case evaluation engine with caching, concurrency and error
/// tolerance per [`EvalOptions`].
pub struct BulkEvaluator {
    options: EvalOptions,
    cache: Option<ResultCache>,
}

impl BulkEvaluator {
    /// Build an evaluator, opening the durable cache when any cache option
    /// is on. A cache directory that cannot be created fails construction.
    pub fn new(options: EvalOptions) -> Result<Self, EvalError> {
        let cache = if options.use_cache || options.write_cache {
            Some(ResultCache::open(options.resolved_cache_dir())?)
        } else {
            None
        };
        Ok(Self { options, cache })
    }

    /// Hit/miss statistics for this evaluator's cache, when one is open.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| cache.stats())
    }

    /// Run the evaluation. Returns one [`TestRunResult`] per test case, in
    /// input order. An empty test-case list yields an empty vector; an
    /// empty metric list is an invalid-input error.
    pub async fn evaluate(
        &self,
        test_cases: &[TestCase],
        metrics: &[Arc<dyn Metric>],
    ) -> Result<Vec<TestRunResult>, EvalError> {
        if metrics.is_empty() {
            return Err(EvalError::InvalidInput(
                "no metrics supplied to evaluate".to_string(),
            ));
        }

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let started = Instant::now();
        info!(
            %run_id,
            cases = test_cases.len(),
            metrics = metrics.len(),
            "starting bulk evaluation"
        );

        let progress = ProgressReporter::new(
            (test_cases.len() * metrics.len()) as u64,
            self.options.show_indicator,
        );
        let semaphore = Semaphore::new(self.options.max_concurrent.max(1));
        let mut cached_results = 0usize;
        let mut results = Vec::with_capacity(test_cases.len());

        for (case_index, test_case) in test_cases.iter().enumerate() {
            let metric_results = self
                .run_case(
                    case_index,
                    test_cases.len(),
                    test_case,
                    metrics,
                    &semaphore,
                    &progress,
                    &mut cached_results,
                )
                .await?;
            results.push(TestRunResult::new(test_case.clone(), metric_results));
        }

        progress.finish();
        let summary =
            RunSummary::from_results(&results, cached_results, started.elapsed().as_millis() as u64);
        info!(%run_id, %summary, "bulk evaluation finished");
        if self.options.print_results {
            println!(
                "{}",
                report::render(
                    run_id,
                    started_at,
                    &self.options.hyperparameters,
                    &results,
                    &summary
                )
            );
        }
        Ok(results)
    }

    /// Resolve every metric for one test case, cache-or-compute, preserving
    /// metric list order in the returned results.
    #[allow(clippy::too_many_arguments)]
    async fn run_case(
        &self,
        case_index: usize,
        case_count: usize,
        test_case: &TestCase,
        metrics: &[Arc<dyn Metric>],
        semaphore: &Semaphore,
        progress: &ProgressReporter,
        cached_results: &mut usize,
    ) -> Result<Vec<MetricResult>, EvalError> {
        let keys: Option<Vec<String>> = self.cache.as_ref().map(|_| {
            metrics
                .iter()
                .map(|metric| {
                    ResultCache::key(test_case, metric.name(), &metric.config_fingerprint())
                })
                .collect()
        });

        let mut slots: Vec<Option<MetricResult>> = vec![None; metrics.len()];
        let mut concurrent = Vec::new();
        let mut sequential = Vec::new();

        for (index, metric) in metrics.iter().enumerate() {
            if self.options.use_cache {
                if let (Some(cache), Some(keys)) = (self.cache.as_ref(), keys.as_ref()) {
                    if let Some(result) = cache.get(&keys[index]).await {
                        debug!(metric = metric.name(), case = case_index, "cache hit");
                        *cached_results += 1;
                        progress.metric_done(case_index, case_count, metric.name());
                        slots[index] = Some(result);
                        continue;
                    }
                }
            }
            if exec::effective_async(self.options.run_async, metric.as_ref()) {
                concurrent.push((index, metric));
            } else {
                sequential.push((index, metric));
            }
        }

        let measured = join_all(concurrent.into_iter().map(|(index, metric)| {
            let ctx = exec::context_for(self.options.verbose_mode, metric.as_ref());
            async move {
                (
                    index,
                    exec::measure_bounded(semaphore, metric.as_ref(), test_case, ctx).await,
                )
            }
        }))
        .await;

        // join_all keeps submission order, so the first error seen is the
        // earliest offender in metric list order.
        let mut strict_error: Option<(usize, MetricError)> = None;
        for (index, measured) in measured {
            progress.metric_done(case_index, case_count, &measured.result.metric_name);
            match measured.error {
                Some(err) if self.options.ignore_errors => {
                    warn!(
                        metric = %measured.result.metric_name,
                        error = %err,
                        "metric errored; recorded and skipped"
                    );
                }
                Some(err) => {
                    if strict_error.is_none() {
                        strict_error = Some((index, err));
                    }
                }
                None => self.persist(keys.as_ref(), index, &measured.result).await,
            }
            slots[index] = Some(measured.result);
        }
        if let Some((index, source)) = strict_error {
            return Err(EvalError::Metric {
                metric: metrics[index].name().to_string(),
                case_index,
                source,
            });
        }

        // Sequential tail, strictly in list order; a strict error aborts
        // before the remaining sequential metrics run.
        for (index, metric) in sequential {
            let ctx = exec::context_for(self.options.verbose_mode, metric.as_ref());
            let measured = exec::measure_one(metric.as_ref(), test_case, ctx).await;
            progress.metric_done(case_index, case_count, metric.name());
            match measured.error {
                Some(source) if !self.options.ignore_errors => {
                    return Err(EvalError::Metric {
                        metric: metric.name().to_string(),
                        case_index,
                        source,
                    });
                }
                Some(err) => {
                    warn!(
                        metric = metric.name(),
                        error = %err,
                        "metric errored; recorded and skipped"
                    );
                }
                None => self.persist(keys.as_ref(), index, &measured.result).await,
            }
            slots[index] = Some(measured.result);
        }

        Ok(slots.into_iter().flatten().collect())
    }

    /// Best-effort cache write for a successfully computed result. Errored
    /// results are never persisted, keeping transient failures retryable.
    async fn persist(&self, keys: Option<&Vec<String>>, index: usize, result: &MetricResult) {
        if !self.options.write_cache {
            return;
        }
        if let (Some(cache), Some(keys)) = (self.cache.as_ref(), keys) {
            if let Err(err) = cache.put(&keys[index], result).await {
                warn!(error = %err, "failed to persist cache entry");
            }
        }
    }
}
