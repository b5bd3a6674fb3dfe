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

//! Service owning the metric state and the helper chain that enriches it.

use crate::chain::HelperChain;
use crate::handles::{RollingHandle, StatReporter, WindowHandle};
use crate::namespace::Namespace;
use std::sync::Arc;
use vigil_core::{
    FnHelper, Helper, MetricMap, MetricValue, MetricsResult, Section, SharedState,
};

/// The metrics engine: shared state, the helper chain, and the recording API.
///
/// Cloning is cheap; every clone records into and reports the same state.
#[derive(Debug, Clone, Default)]
pub struct MetricsService {
    inner: Arc<ServiceInner>,
}

#[derive(Debug, Default)]
struct ServiceInner {
    state: SharedState,
    chain: HelperChain,
}

impl MetricsService {
    /// Creates a service seeded with `initial`.
    pub fn new(initial: MetricMap) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                state: SharedState::new(initial),
                chain: HelperChain::new(),
            }),
        }
    }

    /// Creates a service seeded from a JSON object.
    pub fn from_json(json: &str) -> MetricsResult<Self> {
        Ok(Self::new(MetricMap::from_json(json)?))
    }

    fn root(&self) -> Section {
        self.inner.state.root()
    }

    /// Unconditionally overwrites `key`.
    pub fn set(&self, key: impl Into<String>, value: impl Into<MetricValue>) -> MetricsResult<()> {
        self.root().set(key, value)
    }

    /// Adds one to `key`, starting over at 1 if it is absent or not numeric.
    pub fn increment(&self, key: impl Into<String>) -> MetricsResult<f64> {
        self.root().increment(key)
    }

    /// Increments `subkey` inside the mapping stored under `key`.
    pub fn increment_hash(
        &self,
        key: impl Into<String>,
        subkey: impl Into<String>,
    ) -> MetricsResult<f64> {
        self.root().increment_hash(key, subkey)
    }

    /// Reads a single top-level value.
    pub fn get(&self, key: &str) -> MetricsResult<Option<MetricValue>> {
        self.root().get(key)
    }

    /// Appends a helper to the chain.
    pub fn register_helper(&self, helper: impl Helper) -> MetricsResult<()> {
        self.register_shared(Arc::new(helper))
    }

    /// Appends an already shared helper to the chain.
    pub fn register_shared(&self, helper: Arc<dyn Helper>) -> MetricsResult<()> {
        self.inner.chain.register(helper)
    }

    /// Appends a synchronous closure to the chain.
    pub fn register_fn<F>(&self, id: &'static str, f: F) -> MetricsResult<()>
    where
        F: Fn(&Section) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register_helper(FnHelper::new(id, f))
    }

    /// Returns the number of registered helpers.
    pub fn helper_count(&self) -> usize {
        self.inner.chain.len()
    }

    /// Creates a windowed history of `capacity` samples reported under `key`.
    pub fn windowed_stat(&self, key: impl Into<String>, capacity: usize) -> MetricsResult<WindowHandle> {
        let handle = WindowHandle::new(key, capacity)?;
        self.register_helper(StatReporter::new(handle.clone()))?;
        Ok(handle)
    }

    /// Creates a rolling statistic reported under `key`.
    pub fn add_stat(&self, key: impl Into<String>) -> MetricsResult<RollingHandle> {
        let handle = RollingHandle::new(key);
        self.register_helper(StatReporter::new(handle.clone()))?;
        Ok(handle)
    }

    /// Returns the namespace `name`, creating its region if absent.
    ///
    /// Handles for the same name address the same region and compare equal.
    pub fn namespace(&self, name: &str) -> MetricsResult<Namespace> {
        let section = self.root().scoped(name)?;
        Ok(Namespace::new(self.clone(), section))
    }

    /// Runs the helper chain and returns the enriched snapshot.
    pub async fn get_stats(&self) -> MetricsResult<MetricMap> {
        self.inner.chain.run(&self.inner.state).await
    }

    /// Runs the helper chain and hands the snapshot to `callback` exactly once.
    pub async fn get_stats_with<R>(&self, callback: impl FnOnce(&MetricMap) -> R) -> MetricsResult<R> {
        let snapshot = self.get_stats().await?;
        Ok(callback(&snapshot))
    }

    /// Returns `true` if both handles refer to the same service.
    pub fn ptr_eq(&self, other: &MetricsService) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
