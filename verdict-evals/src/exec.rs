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

//! Shared measurement machinery for the assert and bulk runners

use std::time::Instant;

use tokio::sync::Semaphore;
use verdict_core::{MetricResult, TestCase};

use crate::{MeasureContext, Metric, MetricError};

/// One measured metric, with the raw error kept alongside the recorded
/// result so strict error policies can re-surface it.
pub(crate) struct Measured {
    pub result: MetricResult,
    pub error: Option<MetricError>,
}

/// Effective scheduling mode for one metric: the run-level override wins,
/// otherwise the metric's declared preference applies.
pub(crate) fn effective_async(run_async: Option<bool>, metric: &dyn Metric) -> bool {
    run_async.unwrap_or_else(|| metric.async_mode())
}

/// Effective per-call context for one metric.
pub(crate) fn context_for(verbose_override: Option<bool>, metric: &dyn Metric) -> MeasureContext {
    MeasureContext {
        verbose: verbose_override.unwrap_or_else(|| metric.verbose_mode()),
    }
}

/// Invoke one metric and fold the outcome into a [`MetricResult`].
pub(crate) async fn measure_one(
    metric: &dyn Metric,
    test_case: &TestCase,
    ctx: MeasureContext,
) -> Measured {
    let start = Instant::now();
    match metric.measure(test_case, &ctx).await {
        Ok(verdict) => {
            let mut result =
                MetricResult::scored(metric.name(), verdict.score, metric.threshold(), verdict.passed);
            if let Some(reason) = verdict.reason {
                result = result.with_reason(reason);
            }
            Measured {
                result: result.with_duration_ms(start.elapsed().as_millis() as u64),
                error: None,
            }
        }
        Err(err) => {
            let result = MetricResult::errored(metric.name(), metric.threshold(), err.to_string())
                .with_duration_ms(start.elapsed().as_millis() as u64);
            Measured {
                result,
                error: Some(err),
            }
        }
    }
}

/// Like [`measure_one`], gated on the run's concurrency limiter.
pub(crate) async fn measure_bounded(
    semaphore: &Semaphore,
    metric: &dyn Metric,
    test_case: &TestCase,
    ctx: MeasureContext,
) -> Measured {
    match semaphore.acquire().await {
        Ok(_permit) => measure_one(metric, test_case, ctx).await,
        // The limiter is never closed while a run is in flight; if it is,
        // record the metric as errored rather than panicking.
        Err(_) => {
            let err = MetricError::Execution("concurrency limiter closed".to_string());
            Measured {
                result: MetricResult::errored(metric.name(), metric.threshold(), err.to_string()),
                error: Some(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MetricVerdict;
    use async_trait::async_trait;

    struct Scorer {
        score: f64,
        fail: bool,
    }

    #[async_trait]
    impl Metric for Scorer {
        fn name(&self) -> &str {
            "scorer"
        }

        fn threshold(&self) -> f64 {
            0.5
        }

        async fn measure(
            &self,
            _test_case: &TestCase,
            _ctx: &MeasureContext,
        ) -> Result<MetricVerdict, MetricError> {
            if self.fail {
                Err(MetricError::Execution("boom".to_string()))
            } else {
                Ok(MetricVerdict::new(self.score, self.score >= 0.5).with_reason("stub"))
            }
        }
    }

    #[tokio::test]
    async fn test_measure_one_scored() {
        let case = TestCase::new("prompt", "out").unwrap();
        let metric = Scorer {
            score: 0.8,
            fail: false,
        };
        let measured = measure_one(&metric, &case, MeasureContext::default()).await;
        assert!(measured.error.is_none());
        assert!(measured.result.passed);
        assert_eq!(measured.result.score, Some(0.8));
        assert_eq!(measured.result.reason.as_deref(), Some("stub"));
        assert!(measured.result.duration_ms.is_some());
    }

    #[tokio::test]
    async fn test_measure_one_errored() {
        let case = TestCase::new("prompt", "out").unwrap();
        let metric = Scorer {
            score: 0.0,
            fail: true,
        };
        let measured = measure_one(&metric, &case, MeasureContext::default()).await;
        assert!(measured.error.is_some());
        assert!(measured.result.errored);
        assert!(measured.result.score.is_none());
    }

    #[test]
    fn test_effective_async() {
        let prefers_async = Scorer {
            score: 0.0,
            fail: false,
        };
        assert!(effective_async(None, &prefers_async));
        assert!(!effective_async(Some(false), &prefers_async));
        assert!(effective_async(Some(true), &prefers_async));
    }
}
