// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Incremental single-pass summary of a numeric stream.

use crate::metrics::{MetricsError, MetricsResult, StatSummary};

/// Running count/min/max/sum/mean/variance over every value ever seen.
///
/// The variance uses Welford's update so no sample is retained and precision
/// does not degrade as the count grows. The reported mean is `sum / count`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RollingStatistic {
    count: u64,
    min: f64,
    max: f64,
    sum: f64,
    mean: f64,
    /// Sum of squared deviations from the running mean.
    m2: f64,
}

impl RollingStatistic {
    /// Creates an empty statistic.
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one value into the summary.
    pub fn update(&mut self, value: f64) -> MetricsResult<()> {
        if !value.is_finite() {
            return Err(MetricsError::non_finite(value));
        }

        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }

        self.count += 1;
        self.sum += value;

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
        Ok(())
    }

    /// Number of values folded in so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Population variance, or `None` before the first update.
    pub fn variance(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        Some(self.m2 / self.count as f64)
    }

    /// Returns the current summary.
    pub fn snapshot(&self) -> StatSummary {
        if self.count == 0 {
            return StatSummary {
                count: 0,
                sum: Some(0.0),
                ..Default::default()
            };
        }
        StatSummary {
            count: self.count,
            min: Some(self.min),
            max: Some(self.max),
            sum: Some(self.sum),
            mean: Some(self.sum / self.count as f64),
            standard_deviation: self.variance().map(f64::sqrt),
        }
    }
}
