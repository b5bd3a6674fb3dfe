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

//! Periodic execution of a reporter.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use vigil_core::{MetricsError, MetricsResult};

/// A task repeating an action on a fixed interval until stopped or dropped.
///
/// Must be created from within a Tokio runtime.
#[derive(Debug)]
pub struct Periodic {
    handle: JoinHandle<()>,
}

impl Periodic {
    /// Runs `tick` every `interval`, starting one interval from now.
    ///
    /// Each tick is awaited before the next is scheduled; late ticks are delayed
    /// rather than bunched up.
    pub fn spawn<F, Fut>(interval: Duration, mut tick: F) -> MetricsResult<Self>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if interval.is_zero() {
            return Err(MetricsError::InvalidConfig(
                "schedule interval must be positive".to_string(),
            ));
        }

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                tick().await;
            }
        });
        Ok(Self { handle })
    }

    /// Stops the schedule. A tick in progress is cancelled at its next await.
    pub fn stop(&self) {
        self.handle.abort();
    }

    /// Returns `true` once the schedule has been stopped.
    pub fn is_stopped(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Periodic {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
