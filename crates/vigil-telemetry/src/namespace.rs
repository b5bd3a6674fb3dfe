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

//! Namespaces: isolated sub-regions of the state with the service's own API.

use crate::handles::{RollingHandle, StatReporter, WindowHandle};
use crate::service::MetricsService;
use async_trait::async_trait;
use std::borrow::Cow;
use std::sync::Arc;
use vigil_core::{FnHelper, Helper, MetricMap, MetricValue, MetricsError, MetricsResult, Section};

/// A view that records into `root[name]` of its parent service.
///
/// It is not a second engine: helpers registered here join the parent's
/// chain in registration order and are handed the namespace region instead
/// of the root.
#[derive(Debug, Clone)]
pub struct Namespace {
    service: MetricsService,
    section: Section,
}

impl Namespace {
    pub(crate) fn new(service: MetricsService, section: Section) -> Self {
        Self { service, section }
    }

    /// The namespace key in the root state.
    pub fn name(&self) -> &str {
        self.section.namespace().unwrap_or_default()
    }

    /// Unconditionally overwrites `key` inside the namespace.
    pub fn set(&self, key: impl Into<String>, value: impl Into<MetricValue>) -> MetricsResult<()> {
        self.section.set(key, value)
    }

    /// Adds one to `key` inside the namespace.
    pub fn increment(&self, key: impl Into<String>) -> MetricsResult<f64> {
        self.section.increment(key)
    }

    /// Increments `subkey` inside the mapping `key` of the namespace.
    pub fn increment_hash(
        &self,
        key: impl Into<String>,
        subkey: impl Into<String>,
    ) -> MetricsResult<f64> {
        self.section.increment_hash(key, subkey)
    }

    /// Reads a single value from the namespace.
    pub fn get(&self, key: &str) -> MetricsResult<Option<MetricValue>> {
        self.section.get(key)
    }

    /// Appends a helper to the parent chain, scoped to this namespace.
    pub fn register_helper(&self, helper: impl Helper) -> MetricsResult<()> {
        self.service.register_helper(NamespacedHelper {
            namespace: self.name().to_string(),
            inner: Arc::new(helper),
        })
    }

    /// Appends a synchronous closure to the parent chain, scoped to this namespace.
    pub fn register_fn<F>(&self, id: &'static str, f: F) -> MetricsResult<()>
    where
        F: Fn(&Section) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register_helper(FnHelper::new(id, f))
    }

    /// Creates a windowed history reported under `name.key`.
    pub fn windowed_stat(&self, key: impl Into<String>, capacity: usize) -> MetricsResult<WindowHandle> {
        let handle = WindowHandle::new(key, capacity)?;
        self.register_helper(StatReporter::new(handle.clone()))?;
        Ok(handle)
    }

    /// Creates a rolling statistic reported under `name.key`.
    pub fn add_stat(&self, key: impl Into<String>) -> MetricsResult<RollingHandle> {
        let handle = RollingHandle::new(key);
        self.register_helper(StatReporter::new(handle.clone()))?;
        Ok(handle)
    }

    /// Always fails: namespaces do not nest.
    pub fn namespace(&self, _name: &str) -> MetricsResult<Namespace> {
        Err(MetricsError::UnsupportedOperation(format!(
            "'{}' is already a namespace; nested namespaces are not supported",
            self.name()
        )))
    }

    /// Runs the parent chain and returns the full snapshot.
    pub async fn get_stats(&self) -> MetricsResult<MetricMap> {
        self.service.get_stats().await
    }
}

impl PartialEq for Namespace {
    fn eq(&self, other: &Self) -> bool {
        self.service.ptr_eq(&other.service) && self.name() == other.name()
    }
}

/// Re-targets a helper at a namespace region of whatever section it is run with.
#[derive(Debug)]
struct NamespacedHelper {
    namespace: String,
    inner: Arc<dyn Helper>,
}

#[async_trait]
impl Helper for NamespacedHelper {
    fn helper_id(&self) -> Cow<'static, str> {
        format!("{}/{}", self.namespace, self.inner.helper_id()).into()
    }

    async fn run(&self, section: &Section) -> anyhow::Result<()> {
        let scoped = section.scoped(&self.namespace)?;
        self.inner.run(&scoped).await
    }
}
