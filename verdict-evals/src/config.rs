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

//! Configuration for bulk evaluation runs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Default on-disk cache location, relative to the working directory.
pub const DEFAULT_CACHE_DIR: &str = ".verdict/cache";

/// Options governing one [`crate::evaluate`] call.
///
/// Presentation options (`show_indicator`, `print_results`) never affect
/// results; `hyperparameters` is an opaque mapping attached to the rendered
/// report and has no effect on scoring.
#[derive(Debug, Clone)]
pub struct EvalOptions {
    /// Opaque key/value pairs echoed into the run report
    pub hyperparameters: HashMap<String, serde_json::Value>,

    /// `Some(true)`: all metrics for one case run concurrently.
    /// `Some(false)`: strictly sequential in list order.
    /// `None`: defer to each metric's declared preference.
    pub run_async: Option<bool>,

    /// Record metric errors as data and keep going instead of aborting
    pub ignore_errors: bool,

    /// When set, overrides every metric's verbose preference for this call
    pub verbose_mode: Option<bool>,

    /// Persist each computed result to the durable cache
    pub write_cache: bool,

    /// Consult the cache before computing; hits skip the metric entirely
    pub use_cache: bool,

    /// Tick a terminal progress bar per metric per test case
    pub show_indicator: bool,

    /// Render the human-readable report after completion
    pub print_results: bool,

    /// Bound on concurrently running metric measurements
    pub max_concurrent: usize,

    /// Cache location override; `None` means [`DEFAULT_CACHE_DIR`]
    pub cache_dir: Option<PathBuf>,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            hyperparameters: HashMap::new(),
            run_async: Some(true),
            ignore_errors: false,
            verbose_mode: None,
            write_cache: true,
            use_cache: false,
            show_indicator: true,
            print_results: true,
            max_concurrent: 10,
            cache_dir: None,
        }
    }
}

impl EvalOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach one hyperparameter to the run report.
    pub fn with_hyperparameter(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.hyperparameters.insert(key.into(), value.into());
        self
    }

    /// Force all metrics concurrent (`true`) or sequential (`false`).
    pub fn run_async(mut self, run_async: bool) -> Self {
        self.run_async = Some(run_async);
        self
    }

    /// Defer to each metric's own declared concurrency preference.
    pub fn per_metric_mode(mut self) -> Self {
        self.run_async = None;
        self
    }

    pub fn ignore_errors(mut self, ignore_errors: bool) -> Self {
        self.ignore_errors = ignore_errors;
        self
    }

    /// Override every metric's verbose preference for this call.
    pub fn verbose_mode(mut self, verbose: bool) -> Self {
        self.verbose_mode = Some(verbose);
        self
    }

    pub fn write_cache(mut self, write_cache: bool) -> Self {
        self.write_cache = write_cache;
        self
    }

    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn show_indicator(mut self, show_indicator: bool) -> Self {
        self.show_indicator = show_indicator;
        self
    }

    pub fn print_results(mut self, print_results: bool) -> Self {
        self.print_results = print_results;
        self
    }

    pub fn max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(cache_dir.into());
        self
    }

    pub(crate) fn resolved_cache_dir(&self) -> &Path {
        self.cache_dir
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_CACHE_DIR))
    }
}
