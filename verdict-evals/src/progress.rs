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

//! Terminal progress for bulk evaluation runs

use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

/// Ticks once per metric per test case. Purely presentational: results are
/// identical with the indicator on or off.
pub(crate) struct ProgressReporter {
    bar: Option<ProgressBar>,
}

impl ProgressReporter {
    pub fn new(total: u64, enabled: bool) -> Self {
        let bar = enabled.then(|| {
            let bar = ProgressBar::new(total);
            bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap()
                .progress_chars("##-"),
            );
            bar
        });
        Self { bar }
    }

    pub fn metric_done(&self, case_index: usize, case_count: usize, metric_name: &str) {
        debug!(
            case = case_index + 1,
            cases = case_count,
            metric = metric_name,
            "metric evaluated"
        );
        if let Some(bar) = &self.bar {
            bar.set_message(format!(
                "case {}/{} · {}",
                case_index + 1,
                case_count,
                metric_name
            ));
            bar.inc(1);
        }
    }

    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}
