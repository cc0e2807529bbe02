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

//! # Verdict Evaluation Harness
//!
//! Evaluates [`TestCase`] records against pluggable quality metrics.
//!
//! ## Features
//!
//! - **Trait-based metric system**: any scorer behind the [`Metric`] trait
//! - **Single-case assertions**: strict, CI-style pass/fail via [`assert_test`]
//! - **Bulk evaluation**: many cases against many metrics with per-case
//!   concurrency, error tolerance, and progress reporting
//! - **Durable result caching**: content-addressed, survives restarts
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use verdict_evals::{assert_test, evaluate, EvalOptions, Metric, TestCase};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let case = TestCase::new(
//!         "Why did the chicken cross the road?",
//!         "To get to the other side.",
//!     )?
//!     .with_context(vec!["The chicken wanted to cross the road.".to_string()]);
//!
//!     let metrics: Vec<Arc<dyn Metric>> = vec![Arc::new(MyRelevancyMetric::new(0.5))];
//!
//!     // CI-style: raises on the first failing metric set
//!     assert_test(&case, &metrics).await?;
//!
//!     // Exploratory: best-effort bulk run with a report
//!     let results = evaluate(&[case], &metrics, EvalOptions::default()).await?;
//!     assert!(results[0].passed);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod assertions;
pub mod cache;
pub mod config;
pub mod evaluate;
pub mod report;

mod exec;
mod progress;

pub use assertions::{assert_test, AssertRunner, AssertionFailure, MetricFailure};
pub use cache::{CacheStats, ResultCache};
pub use config::{EvalOptions, DEFAULT_CACHE_DIR};
pub use evaluate::{evaluate, BulkEvaluator};
pub use report::RunSummary;
pub use verdict_core::{MetricResult, TestCase, TestCaseBuilder, TestRunResult, ValidationError};

/// Capability trait implemented by every metric the harness can run.
///
/// A metric is an opaque scorer: it declares a threshold and applies its own
/// pass rule relative to it. Which test-case fields a metric needs is the
/// metric's business; a missing field surfaces as
/// [`MetricError::MissingField`] at measurement time, never at construction.
#[async_trait]
pub trait Metric: Send + Sync {
    /// Stable metric name, also used for cache identity (e.g. "relevancy_v1")
    fn name(&self) -> &str;

    /// Score at or beyond which this metric considers a case passing
    fn threshold(&self) -> f64;

    /// Declared concurrency preference; a run-level `run_async` overrides it
    fn async_mode(&self) -> bool {
        true
    }

    /// Declared verbose/debug-output preference; a run-level `verbose_mode`
    /// overrides it
    fn verbose_mode(&self) -> bool {
        false
    }

    /// Configuration identity folded into cache keys. Two metrics with the
    /// same name but different fingerprints never share cache entries.
    fn config_fingerprint(&self) -> String {
        format!("threshold={}", self.threshold())
    }

    /// Measure one test case. The test case is read-only; the context
    /// carries per-call settings resolved by the harness.
    async fn measure(
        &self,
        test_case: &TestCase,
        ctx: &MeasureContext,
    ) -> Result<MetricVerdict, MetricError>;
}

/// Outcome of one successful measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricVerdict {
    pub score: f64,
    /// The metric's own pass rule applied to `score` and its threshold
    pub passed: bool,
    pub reason: Option<String>,
}

impl MetricVerdict {
    pub fn new(score: f64, passed: bool) -> Self {
        Self {
            score,
            passed,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Per-call settings the harness resolves before invoking a metric.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeasureContext {
    /// Effective verbosity: the run-level override when given, otherwise the
    /// metric's own declared preference
    pub verbose: bool,
}

/// A metric failed to produce a score.
#[derive(Debug, Error)]
pub enum MetricError {
    /// The test case does not carry a field this metric requires
    #[error("missing required field: {0}")]
    MissingField(String),

    /// The measurement itself failed (network failure, malformed model
    /// output, internal error)
    #[error("metric execution failed: {0}")]
    Execution(String),

    /// The metric enforced its own deadline and gave up
    #[error("metric timed out after {0}s")]
    Timeout(u64),
}

/// Errors surfaced by the harness entry points.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A metric errored while error tolerance was off
    #[error("metric `{metric}` errored on test case {case_index}: {source}")]
    Metric {
        metric: String,
        case_index: usize,
        #[source]
        source: MetricError,
    },

    /// One or more metrics failed or errored during an assert
    #[error(transparent)]
    Assertion(#[from] AssertionFailure),

    #[error("cache error: {0}")]
    Cache(#[from] cache::CacheError),
}
