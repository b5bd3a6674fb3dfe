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

//! Configuration for the reporters.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use vigil_core::{MetricsError, MetricsResult};

/// Configuration for the HTTP pusher.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    /// Full URL the snapshot is sent to. Required.
    pub url: String,
    /// HTTP method used for the push.
    pub method: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Extra request headers. `User-Agent` entries are ignored.
    pub headers: BTreeMap<String, String>,
    /// Repeat the push every N seconds when set.
    pub interval_secs: Option<u64>,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: "POST".to_string(),
            timeout_ms: 10_000,
            headers: BTreeMap::new(),
            interval_secs: None,
        }
    }
}

impl PushConfig {
    /// Creates a config pushing to `url` with default settings.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// The request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Configuration for the stats page server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to listen on. `0` picks a free port.
    pub port: u16,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7667,
        }
    }
}

/// Configuration for the interval logger.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Log the snapshot every N seconds when set.
    pub interval_secs: Option<u64>,
}

/// Top-level reporter configuration, typically read from a JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InfraConfig {
    /// Seed values for the metric state.
    pub initial: Option<serde_json::Value>,
    /// Install the memory/system/process helpers.
    pub system_helpers: bool,
    /// Interval logger settings.
    pub logger: Option<LoggerConfig>,
    /// HTTP pusher settings.
    pub push: Option<PushConfig>,
    /// Stats page settings.
    pub page: Option<PageConfig>,
}

impl InfraConfig {
    /// Parses a JSON document.
    pub fn from_json(json: &str) -> MetricsResult<Self> {
        serde_json::from_str(json).map_err(|e| MetricsError::InvalidConfig(e.to_string()))
    }
}

/// Converts an optional seconds count into a schedule interval.
pub(crate) fn interval_from_secs(secs: Option<u64>) -> Option<Duration> {
    secs.filter(|s| *s > 0).map(Duration::from_secs)
}
