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

//! Result types produced by evaluation runs

use serde::{Deserialize, Serialize};

use crate::test_case::TestCase;

/// Outcome of one metric measured against one test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    /// Name of the metric that produced this result
    pub metric_name: String,

    /// Numeric score; absent exactly when the metric errored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    /// The metric's declared pass threshold
    pub threshold: f64,

    /// Whether the score met the metric's own pass rule
    pub passed: bool,

    /// Whether the metric failed to produce a score at all
    pub errored: bool,

    /// Error detail when `errored`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,

    /// Metric-supplied explanation of the verdict
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Wall time spent measuring, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl MetricResult {
    /// A result for a metric that produced a score.
    pub fn scored(
        metric_name: impl Into<String>,
        score: f64,
        threshold: f64,
        passed: bool,
    ) -> Self {
        Self {
            metric_name: metric_name.into(),
            score: Some(score),
            threshold,
            passed,
            errored: false,
            error_detail: None,
            reason: None,
            duration_ms: None,
        }
    }

    /// A result for a metric that failed to produce a score.
    pub fn errored(
        metric_name: impl Into<String>,
        threshold: f64,
        error_detail: impl Into<String>,
    ) -> Self {
        Self {
            metric_name: metric_name.into(),
            score: None,
            threshold,
            passed: false,
            errored: true,
            error_detail: Some(error_detail.into()),
            reason: None,
            duration_ms: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

/// All metric results for one test case, with the overall verdict.
///
/// `passed` is the logical AND over the non-errored metric results. Errored
/// results are excluded from the conjunction; a run where every metric
/// errored carries no evidence of passing and is marked failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRunResult {
    pub test_case: TestCase,

    /// Results in metric input order
    pub metric_results: Vec<MetricResult>,

    pub passed: bool,
}

impl TestRunResult {
    /// Assemble a run result, computing the overall verdict.
    pub fn new(test_case: TestCase, metric_results: Vec<MetricResult>) -> Self {
        let passed = overall_passed(&metric_results);
        Self {
            test_case,
            metric_results,
            passed,
        }
    }

    /// Metric results that produced a score below their pass rule.
    pub fn failures(&self) -> Vec<&MetricResult> {
        self.metric_results
            .iter()
            .filter(|result| !result.errored && !result.passed)
            .collect()
    }

    /// Metric results that passed.
    pub fn successes(&self) -> Vec<&MetricResult> {
        self.metric_results
            .iter()
            .filter(|result| !result.errored && result.passed)
            .collect()
    }

    /// Metric results that failed to produce a score.
    pub fn errors(&self) -> Vec<&MetricResult> {
        self.metric_results
            .iter()
            .filter(|result| result.errored)
            .collect()
    }
}

fn overall_passed(metric_results: &[MetricResult]) -> bool {
    let mut scored = metric_results.iter().filter(|result| !result.errored);
    let mut any_scored = false;
    for result in &mut scored {
        any_scored = true;
        if !result.passed {
            return false;
        }
    }
    any_scored
}
