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

//! Shared, lock-protected metric state and scoped views into it.

use crate::metrics::{MetricMap, MetricValue, MetricsError, MetricsResult};
use std::sync::{Arc, RwLock};

/// The root metric state, shared by every handle of a service.
///
/// Locks are only ever held for synchronous sections, never across an await.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    storage: Arc<RwLock<MetricMap>>,
}

impl SharedState {
    /// Wraps an initial state.
    pub fn new(initial: MetricMap) -> Self {
        Self {
            storage: Arc::new(RwLock::new(initial)),
        }
    }

    /// Runs `f` against the root map under a read lock.
    pub fn read<R>(&self, f: impl FnOnce(&MetricMap) -> R) -> MetricsResult<R> {
        let storage = self
            .storage
            .read()
            .map_err(|_| MetricsError::StorageError("Failed to acquire read lock".to_string()))?;
        Ok(f(&storage))
    }

    /// Runs `f` against the root map under a write lock.
    pub fn write<R>(&self, f: impl FnOnce(&mut MetricMap) -> MetricsResult<R>) -> MetricsResult<R> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| MetricsError::StorageError("Failed to acquire write lock".to_string()))?;
        f(&mut storage)
    }

    /// Clones the whole tree.
    pub fn snapshot(&self) -> MetricsResult<MetricMap> {
        self.read(MetricMap::clone)
    }

    /// Returns a view addressing the root map.
    pub fn root(&self) -> Section {
        Section {
            state: self.clone(),
            namespace: None,
        }
    }
}

/// A view into either the root map or one namespace region of a [`SharedState`].
///
/// Helpers receive a `Section`; a namespace's helpers receive one bound to
/// their region, so the same helper code works at either level.
#[derive(Debug, Clone)]
pub struct Section {
    state: SharedState,
    namespace: Option<String>,
}

impl Section {
    /// The namespace this view is bound to, `None` for the root.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Returns a view bound to the namespace `name`, creating the region if absent.
    ///
    /// Namespaces do not nest: calling this on a namespace view fails with
    /// `UnsupportedOperation`.
    pub fn scoped(&self, name: &str) -> MetricsResult<Section> {
        if let Some(current) = &self.namespace {
            return Err(MetricsError::UnsupportedOperation(format!(
                "'{current}' is already a namespace; nested namespaces are not supported"
            )));
        }
        self.state.write(|root| root.ensure_namespace(name).map(|_| ()))?;
        Ok(Section {
            state: self.state.clone(),
            namespace: Some(name.to_string()),
        })
    }

    /// Runs `f` against the addressed map under the write lock.
    pub fn with_map<R>(&self, f: impl FnOnce(&mut MetricMap) -> MetricsResult<R>) -> MetricsResult<R> {
        self.state.write(|root| match &self.namespace {
            None => f(root),
            Some(name) => f(root.ensure_namespace(name)?),
        })
    }

    /// Reads a single value from the addressed map.
    pub fn get(&self, key: &str) -> MetricsResult<Option<MetricValue>> {
        self.state.read(|root| {
            let target = match &self.namespace {
                None => Some(root),
                Some(name) => root.get(name).and_then(MetricValue::as_map),
            };
            target.and_then(|map| map.get(key)).cloned()
        })
    }

    /// See [`MetricMap::set`].
    pub fn set(&self, key: impl Into<String>, value: impl Into<MetricValue>) -> MetricsResult<()> {
        self.with_map(|map| map.set(key, value))
    }

    /// See [`MetricMap::increment`].
    pub fn increment(&self, key: impl Into<String>) -> MetricsResult<f64> {
        self.with_map(|map| map.increment(key))
    }

    /// See [`MetricMap::increment_hash`].
    pub fn increment_hash(
        &self,
        key: impl Into<String>,
        subkey: impl Into<String>,
    ) -> MetricsResult<f64> {
        self.with_map(|map| map.increment_hash(key, subkey))
    }

    /// See [`MetricMap::merge`].
    pub fn merge(&self, key: impl Into<String>, record: MetricMap) -> MetricsResult<()> {
        self.with_map(|map| map.merge(key, record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_section_writes() {
        let state = SharedState::default();
        let root = state.root();
        root.set("cat", "meow").unwrap();
        root.increment("lines").unwrap();
        root.increment("lines").unwrap();

        let snapshot = state.snapshot().unwrap();
        assert_eq!(snapshot.get("cat").and_then(MetricValue::as_str), Some("meow"));
        assert_eq!(snapshot.get("lines").and_then(MetricValue::as_f64), Some(2.0));
    }

    #[test]
    fn test_scoped_section_is_isolated() {
        let state = SharedState::default();
        let root = state.root();
        root.set("foo", 7.0).unwrap();

        let ns = root.scoped("ns").unwrap();
        ns.increment("foo").unwrap();

        assert_eq!(root.get("foo").unwrap(), Some(MetricValue::Number(7.0)));
        assert_eq!(ns.get("foo").unwrap(), Some(MetricValue::Number(1.0)));
        assert_eq!(ns.namespace(), Some("ns"));
    }

    #[test]
    fn test_scoped_does_not_nest() {
        let state = SharedState::default();
        let ns = state.root().scoped("ns").unwrap();
        assert!(matches!(
            ns.scoped("inner"),
            Err(MetricsError::UnsupportedOperation(_))
        ));
    }
}
