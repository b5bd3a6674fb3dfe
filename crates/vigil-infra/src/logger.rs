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

//! Hands snapshots to a sink function, on demand or on an interval.

use crate::schedule::Periodic;
use std::sync::Arc;
use std::time::Duration;
use vigil_core::{MetricMap, MetricsResult};
use vigil_telemetry::MetricsService;

type Sink = Arc<dyn Fn(&MetricMap) + Send + Sync>;

/// Delivers snapshots of a service to an arbitrary sink.
#[derive(Clone)]
pub struct StatsLogger {
    service: MetricsService,
    sink: Sink,
}

impl StatsLogger {
    /// Creates a logger handing each snapshot to `sink`.
    pub fn new(service: MetricsService, sink: impl Fn(&MetricMap) + Send + Sync + 'static) -> Self {
        Self {
            service,
            sink: Arc::new(sink),
        }
    }

    /// Creates a logger writing each snapshot as JSON through the `log` facade.
    pub fn to_log(service: MetricsService) -> Self {
        Self::new(service, |snapshot| match serde_json::to_string(snapshot) {
            Ok(json) => log::info!("{json}"),
            Err(e) => log::warn!("Unable to serialize stats: {e}"),
        })
    }

    /// Takes one snapshot and hands it to the sink.
    pub async fn log_now(&self) -> MetricsResult<()> {
        let sink = Arc::clone(&self.sink);
        self.service.get_stats_with(|snapshot| sink(snapshot)).await
    }

    /// Repeats [`log_now`](Self::log_now) every `interval` until the returned
    /// schedule is stopped or dropped.
    pub fn start(&self, interval: Duration) -> MetricsResult<Periodic> {
        let logger = self.clone();
        log::info!("Logging stats every {interval:?}");
        Periodic::spawn(interval, move || {
            let logger = logger.clone();
            async move {
                if let Err(e) = logger.log_now().await {
                    log::warn!("Unable to log stats: {e}");
                }
            }
        })
    }
}

impl std::fmt::Debug for StatsLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsLogger")
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}
