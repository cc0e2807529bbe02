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

//! Single-case assertion runner: strict, CI-style pass/fail
//!
//! `assert_test` evaluates one test case against a list of metrics and
//! raises on any failing or erroring metric. Its only observable effect on
//! full pass is returning; there is no report object and no error-tolerance
//! knob: an executing error is always a failure to surface.

use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::debug;
use verdict_core::{MetricResult, TestCase};

use crate::exec;
use crate::{EvalError, Metric};

/// Raised when one or more metrics failed or errored during an assert.
#[derive(Debug, Clone)]
pub struct AssertionFailure {
    failures: Vec<MetricFailure>,
}

/// One offending metric inside an [`AssertionFailure`].
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFailure {
    pub metric_name: String,
    /// Absent when the metric errored before scoring
    pub score: Option<f64>,
    pub threshold: f64,
    pub error_detail: Option<String>,
}

impl AssertionFailure {
    /// Collect the failing and erroring entries; `None` when everything passed.
    fn from_results(results: &[MetricResult]) -> Option<Self> {
        let failures: Vec<MetricFailure> = results
            .iter()
            .filter(|result| result.errored || !result.passed)
            .map(|result| MetricFailure {
                metric_name: result.metric_name.clone(),
                score: result.score,
                threshold: result.threshold,
                error_detail: result.error_detail.clone(),
            })
            .collect();
        if failures.is_empty() {
            None
        } else {
            Some(Self { failures })
        }
    }

    /// Every failing or erroring metric, in metric list order.
    pub fn failures(&self) -> &[MetricFailure] {
        &self.failures
    }
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} metric(s) did not pass:", self.failures.len())?;
        for failure in &self.failures {
            match (&failure.error_detail, failure.score) {
                (Some(detail), _) => {
                    write!(f, " [{}: errored: {}]", failure.metric_name, detail)?;
                }
                (None, Some(score)) => {
                    write!(
                        f,
                        " [{}: score {:.4}, threshold {:.4}]",
                        failure.metric_name, score, failure.threshold
                    )?;
                }
                (None, None) => {
                    write!(f, " [{}: no score produced]", failure.metric_name)?;
                }
            }
        }
        Ok(())
    }
}

impl std::error::Error for AssertionFailure {}

/// Evaluates one test case against a list of metrics, strict by default.
///
/// The runner defaults to concurrent metric execution (the `run_async=true`
/// contract); `per_metric_mode` defers to each metric's own declared
/// preference instead.
#[derive(Debug, Clone)]
pub struct AssertRunner {
    run_async: Option<bool>,
    verbose_mode: Option<bool>,
    max_concurrent: usize,
}

impl AssertRunner {
    pub fn new() -> Self {
        Self {
            run_async: Some(true),
            verbose_mode: None,
            max_concurrent: 10,
        }
    }

    /// Force all metrics concurrent (`true`) or strictly sequential (`false`)
    /// for this runner, overriding each metric's own preference.
    pub fn run_async(mut self, run_async: bool) -> Self {
        self.run_async = Some(run_async);
        self
    }

    /// Defer to each metric's own declared concurrency preference.
    pub fn per_metric_mode(mut self) -> Self {
        self.run_async = None;
        self
    }

    /// Override every metric's verbose preference for this runner.
    pub fn verbose_mode(mut self, verbose: bool) -> Self {
        self.verbose_mode = Some(verbose);
        self
    }

    /// Bound on concurrently running measurements (default 10).
    pub fn max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Evaluate `test_case` against every metric and raise on any failure.
    ///
    /// Returns `Ok(())` only when every metric passed. Failing or erroring
    /// metrics surface as [`EvalError::Assertion`] carrying each offender's
    /// name, score, threshold and error detail. In sequential execution the
    /// first metric error stops the remaining metrics.
    pub async fn assert(
        &self,
        test_case: &TestCase,
        metrics: &[Arc<dyn Metric>],
    ) -> Result<(), EvalError> {
        if metrics.is_empty() {
            return Err(EvalError::InvalidInput(
                "no metrics supplied to assert".to_string(),
            ));
        }

        let results = self.run_metrics(test_case, metrics).await;
        match AssertionFailure::from_results(&results) {
            Some(failure) => Err(failure.into()),
            None => Ok(()),
        }
    }

    async fn run_metrics(
        &self,
        test_case: &TestCase,
        metrics: &[Arc<dyn Metric>],
    ) -> Vec<MetricResult> {
        let semaphore = Semaphore::new(self.max_concurrent);
        let mut slots: Vec<Option<MetricResult>> = vec![None; metrics.len()];

        let mut concurrent = Vec::new();
        let mut sequential = Vec::new();
        for (index, metric) in metrics.iter().enumerate() {
            if exec::effective_async(self.run_async, metric.as_ref()) {
                concurrent.push((index, metric));
            } else {
                sequential.push((index, metric));
            }
        }

        let measured = join_all(concurrent.into_iter().map(|(index, metric)| {
            let ctx = exec::context_for(self.verbose_mode, metric.as_ref());
            let semaphore = &semaphore;
            async move {
                (
                    index,
                    exec::measure_bounded(semaphore, metric.as_ref(), test_case, ctx).await,
                )
            }
        }))
        .await;
        for (index, measured) in measured {
            slots[index] = Some(measured.result);
        }

        // Strict policy: the first sequential error stops the remaining
        // sequential metrics. Results keep metric list order either way.
        for (index, metric) in sequential {
            let ctx = exec::context_for(self.verbose_mode, metric.as_ref());
            debug!(metric = metric.name(), "measuring sequentially");
            let measured = exec::measure_one(metric.as_ref(), test_case, ctx).await;
            let errored = measured.error.is_some();
            slots[index] = Some(measured.result);
            if errored {
                break;
            }
        }

        slots.into_iter().flatten().collect()
    }
}

impl Default for AssertRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Assert one test case with the default runner (metrics run concurrently).
pub async fn assert_test(
    test_case: &TestCase,
    metrics: &[Arc<dyn Metric>],
) -> Result<(), EvalError> {
    AssertRunner::new().assert(test_case, metrics).await
}
