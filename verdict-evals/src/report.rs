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

//! Human-readable reporting for bulk evaluation runs

use std::collections::HashMap;
use std::fmt;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use uuid::Uuid;
use verdict_core::TestRunResult;

/// Aggregate statistics for one bulk evaluation run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub total_cases: usize,
    pub passed_cases: usize,
    pub failed_cases: usize,
    pub metric_results: usize,
    pub errored_metrics: usize,
    pub cached_results: usize,
    pub duration_ms: u64,
}

impl RunSummary {
    pub fn from_results(results: &[TestRunResult], cached_results: usize, duration_ms: u64) -> Self {
        let passed_cases = results.iter().filter(|run| run.passed).count();
        let metric_results = results.iter().map(|run| run.metric_results.len()).sum();
        let errored_metrics = results
            .iter()
            .flat_map(|run| run.metric_results.iter())
            .filter(|result| result.errored)
            .count();
        Self {
            total_cases: results.len(),
            passed_cases,
            failed_cases: results.len() - passed_cases,
            metric_results,
            errored_metrics,
            cached_results,
            duration_ms,
        }
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total_cases == 0 {
            0.0
        } else {
            self.passed_cases as f64 / self.total_cases as f64
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Test cases: {}/{} passed ({:.0}%), {} metric results ({} cached, {} errored), {}ms",
            self.passed_cases,
            self.total_cases,
            self.pass_rate() * 100.0,
            self.metric_results,
            self.cached_results,
            self.errored_metrics,
            self.duration_ms
        )
    }
}

/// Render the full report printed when `print_results` is on.
pub fn render(
    run_id: Uuid,
    started_at: DateTime<Utc>,
    hyperparameters: &HashMap<String, serde_json::Value>,
    results: &[TestRunResult],
    summary: &RunSummary,
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "=== Verdict run {run_id} ({}) ===",
        started_at.to_rfc3339()
    );

    if !hyperparameters.is_empty() {
        let _ = writeln!(out, "Hyperparameters:");
        let mut entries: Vec<_> = hyperparameters.iter().collect();
        entries.sort_by_key(|(key, _)| key.as_str());
        for (key, value) in entries {
            let _ = writeln!(out, "  {key}: {value}");
        }
    }

    for (index, run) in results.iter().enumerate() {
        let status = if run.passed { "PASS" } else { "FAIL" };
        let _ = writeln!(
            out,
            "Test case {} [{}]: {}",
            index + 1,
            status,
            preview(run.test_case.input(), 60)
        );
        for result in &run.metric_results {
            if result.errored {
                let _ = writeln!(
                    out,
                    "  ERROR {}: {}",
                    result.metric_name,
                    result.error_detail.as_deref().unwrap_or("unknown error")
                );
                continue;
            }
            let marker = if result.passed { "PASS" } else { "FAIL" };
            let score = result
                .score
                .map(|score| format!("{score:.4}"))
                .unwrap_or_else(|| "n/a".to_string());
            let _ = write!(
                out,
                "  {marker} {}: score {score}, threshold {:.4}",
                result.metric_name, result.threshold
            );
            if let Some(reason) = &result.reason {
                let _ = write!(out, " ({reason})");
            }
            let _ = writeln!(out);
        }
    }

    let _ = writeln!(out, "{summary}");
    out
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}
