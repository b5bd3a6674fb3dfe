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

//! The ordered, strictly sequential helper chain.

use std::sync::{Arc, RwLock};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use vigil_core::{Helper, MetricMap, MetricsError, MetricsResult, SharedState};

/// Root namespace holding the chain's own runtime metadata.
pub const RUNTIME_NAMESPACE: &str = "vigil";

/// Root counter incremented each time a helper reports a failure.
pub const HELPER_ERRORS_KEY: &str = "helperErrors";

/// An ordered list of helpers run one at a time against the shared state.
///
/// At most one run is in flight per chain: concurrent callers queue on an
/// async gate and are served in order. Helpers registered during a run take
/// effect from the next run.
#[derive(Debug, Default)]
pub struct HelperChain {
    helpers: RwLock<Vec<Arc<dyn Helper>>>,
    run_gate: tokio::sync::Mutex<()>,
}

impl HelperChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a helper. Registration order is execution order; no dedup.
    pub fn register(&self, helper: Arc<dyn Helper>) -> MetricsResult<()> {
        let mut helpers = self
            .helpers
            .write()
            .map_err(|_| MetricsError::StorageError("Failed to acquire write lock".to_string()))?;
        log::debug!("Registered helper #{}: {}", helpers.len(), helper.helper_id());
        helpers.push(helper);
        Ok(())
    }

    /// Returns the number of registered helpers.
    pub fn len(&self) -> usize {
        self.helpers.read().map(|h| h.len()).unwrap_or(0)
    }

    /// Returns `true` if no helper is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs every helper against `state` and returns the enriched snapshot.
    ///
    /// An empty chain returns the state untouched, without runtime metadata.
    /// A failing helper bumps the root `helperErrors` counter and the chain
    /// moves on; the snapshot is always produced.
    pub async fn run(&self, state: &SharedState) -> MetricsResult<MetricMap> {
        let _gate = self.run_gate.lock().await;

        let helpers: Vec<Arc<dyn Helper>> = self
            .helpers
            .read()
            .map_err(|_| MetricsError::StorageError("Failed to acquire read lock".to_string()))?
            .clone();

        if helpers.is_empty() {
            return state.snapshot();
        }

        let start = Instant::now();
        let root = state.root();
        log::trace!("Running helper chain ({} steps)", helpers.len());

        for (index, helper) in helpers.iter().enumerate() {
            if let Err(e) = helper.run(&root).await {
                let failure =
                    MetricsError::HelperStep(format!("#{index} {}: {e:#}", helper.helper_id()));
                log::warn!("{failure}");
                if let Err(e) = root.increment(HELPER_ERRORS_KEY) {
                    log::error!("Could not record helper failure: {e}");
                }
            }
        }

        let elapsed = start.elapsed();
        let checktime = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        match root.scoped(RUNTIME_NAMESPACE) {
            Ok(runtime) => {
                runtime.set("checktime", checktime)?;
                runtime.set("stats_runtime", elapsed.as_secs_f64())?;
            }
            Err(e) => log::error!("Could not record chain runtime: {e}"),
        }

        state.snapshot()
    }
}
