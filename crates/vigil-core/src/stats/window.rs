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

//! Fixed-capacity history of the most recent samples.

use crate::metrics::{MetricsError, MetricsResult, StatSummary};

/// A circular buffer of numeric samples, overwriting the oldest once full.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowedHistory {
    buffer: Vec<f64>,
    capacity: usize,
    /// Next slot to overwrite once the buffer is full.
    cursor: usize,
}

impl WindowedHistory {
    /// Creates an empty history retaining at most `capacity` samples.
    pub fn new(capacity: usize) -> MetricsResult<Self> {
        if capacity == 0 {
            return Err(MetricsError::InvalidConfig(
                "windowed history capacity must be positive".to_string(),
            ));
        }
        Ok(Self {
            buffer: Vec::with_capacity(capacity),
            capacity,
            cursor: 0,
        })
    }

    /// Pushes a new value into the buffer, evicting the oldest if full.
    pub fn push(&mut self, value: f64) -> MetricsResult<()> {
        if !value.is_finite() {
            return Err(MetricsError::non_finite(value));
        }
        if self.buffer.len() < self.capacity {
            self.buffer.push(value);
        } else {
            self.buffer[self.cursor] = value;
        }
        self.cursor = (self.cursor + 1) % self.capacity;
        Ok(())
    }

    /// Returns the number of samples currently retained.
    pub fn count(&self) -> usize {
        self.buffer.len()
    }

    /// Returns an iterator over the values in chronological order (oldest to newest).
    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        let split = if self.buffer.len() < self.capacity {
            0
        } else {
            self.cursor
        };
        let (newest, oldest) = self.buffer.split_at(split);
        oldest.iter().chain(newest.iter())
    }

    /// Computes count/min/max/mean over the retained samples.
    pub fn snapshot(&self) -> StatSummary {
        let count = self.buffer.len();
        if count == 0 {
            return StatSummary::default();
        }
        let min = self.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = self.iter().sum::<f64>() / count as f64;
        StatSummary {
            count: count as u64,
            min: Some(min),
            max: Some(max),
            mean: Some(mean),
            ..Default::default()
        }
    }
}
