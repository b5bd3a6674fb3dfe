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

//! Handles for windowed and rolling stats, and the helpers that report them.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use vigil_core::{
    Helper, MetricsError, MetricsResult, RollingStatistic, Section, StatSummary, WindowedHistory,
};

/// Something a numeric sample can be recorded into.
pub trait Observe: Send + Sync {
    /// Records one sample.
    fn observe(&self, value: f64) -> MetricsResult<()>;
}

/// Handle for a windowed history registered under a key.
#[derive(Debug, Clone)]
pub struct WindowHandle {
    key: String,
    window: Arc<Mutex<WindowedHistory>>,
}

impl WindowHandle {
    pub(crate) fn new(key: impl Into<String>, capacity: usize) -> MetricsResult<Self> {
        Ok(Self {
            key: key.into(),
            window: Arc::new(Mutex::new(WindowedHistory::new(capacity)?)),
        })
    }

    /// Push a sample, evicting the oldest once the window is full.
    pub fn push(&self, value: f64) -> MetricsResult<()> {
        self.lock()?.push(value)
    }

    /// Current count/min/max/mean over the retained samples.
    pub fn snapshot(&self) -> MetricsResult<StatSummary> {
        Ok(self.lock()?.snapshot())
    }

    /// The key the summary is reported under.
    pub fn key(&self) -> &str {
        &self.key
    }

    fn lock(&self) -> MetricsResult<std::sync::MutexGuard<'_, WindowedHistory>> {
        self.window
            .lock()
            .map_err(|_| MetricsError::StorageError("Failed to acquire window lock".to_string()))
    }
}

impl Observe for WindowHandle {
    fn observe(&self, value: f64) -> MetricsResult<()> {
        self.push(value)
    }
}

/// Handle for a rolling statistic registered under a key.
#[derive(Debug, Clone)]
pub struct RollingHandle {
    key: String,
    stat: Arc<Mutex<RollingStatistic>>,
}

impl RollingHandle {
    pub(crate) fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            stat: Arc::new(Mutex::new(RollingStatistic::new())),
        }
    }

    /// Fold a value into the statistic.
    pub fn update(&self, value: f64) -> MetricsResult<()> {
        self.lock()?.update(value)
    }

    /// Current count/min/max/sum/mean/standard deviation.
    pub fn snapshot(&self) -> MetricsResult<StatSummary> {
        Ok(self.lock()?.snapshot())
    }

    /// The key the summary is reported under.
    pub fn key(&self) -> &str {
        &self.key
    }

    fn lock(&self) -> MetricsResult<std::sync::MutexGuard<'_, RollingStatistic>> {
        self.stat
            .lock()
            .map_err(|_| MetricsError::StorageError("Failed to acquire stat lock".to_string()))
    }
}

impl Observe for RollingHandle {
    fn observe(&self, value: f64) -> MetricsResult<()> {
        self.update(value)
    }
}

/// A stat handle whose summary can be reported.
pub(crate) trait Summarize: Send + Sync + std::fmt::Debug + 'static {
    fn key(&self) -> &str;
    fn summary(&self) -> MetricsResult<StatSummary>;
}

impl Summarize for WindowHandle {
    fn key(&self) -> &str {
        &self.key
    }

    fn summary(&self) -> MetricsResult<StatSummary> {
        self.snapshot()
    }
}

impl Summarize for RollingHandle {
    fn key(&self) -> &str {
        &self.key
    }

    fn summary(&self) -> MetricsResult<StatSummary> {
        self.snapshot()
    }
}

/// Writes a handle's summary under its key on every chain run.
#[derive(Debug)]
pub(crate) struct StatReporter<H> {
    handle: H,
}

impl<H: Summarize> StatReporter<H> {
    pub(crate) fn new(handle: H) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl<H: Summarize> Helper for StatReporter<H> {
    fn helper_id(&self) -> std::borrow::Cow<'static, str> {
        format!("stat:{}", self.handle.key()).into()
    }

    async fn run(&self, section: &Section) -> anyhow::Result<()> {
        let summary = self.handle.summary()?;
        section.set(self.handle.key(), summary)?;
        Ok(())
    }
}
