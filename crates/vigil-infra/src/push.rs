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

//! Sends snapshots to a remote HTTP endpoint.

use crate::config::PushConfig;
use crate::schedule::Periodic;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method};
use std::time::Duration;
use vigil_core::{MetricsError, MetricsResult};
use vigil_telemetry::MetricsService;

/// User agent sent with every push; callers cannot override it.
pub const PUSH_USER_AGENT: &str = concat!("vigil-pusher/", env!("CARGO_PKG_VERSION"));

/// Responses larger than this are truncated before parsing.
const MAX_RESPONSE_BYTES: usize = 2048;

/// Outcome of a single push.
#[derive(Debug, Clone, PartialEq)]
pub struct PushResponse {
    /// HTTP status returned by the remote end.
    pub status: u16,
    /// Parsed JSON body, or `{"error": ...}` when it was not JSON.
    pub content: serde_json::Value,
}

/// Serializes snapshots as JSON and sends them to the configured URL.
#[derive(Debug, Clone)]
pub struct StatsPusher {
    service: MetricsService,
    client: Client,
    method: Method,
    config: PushConfig,
}

impl StatsPusher {
    /// Creates a pusher. Fails with `InvalidConfig` when the URL is empty or
    /// the method is not a valid HTTP method.
    pub fn new(service: MetricsService, config: PushConfig) -> MetricsResult<Self> {
        if config.url.trim().is_empty() {
            return Err(MetricsError::InvalidConfig(
                "a url to push to is required".to_string(),
            ));
        }
        let method = Method::from_bytes(config.method.to_ascii_uppercase().as_bytes())
            .map_err(|e| MetricsError::InvalidConfig(format!("method '{}': {e}", config.method)))?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| MetricsError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            service,
            client,
            method,
            config,
        })
    }

    /// The URL snapshots are pushed to.
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Takes one snapshot and sends it.
    pub async fn push(&self) -> anyhow::Result<PushResponse> {
        let snapshot = self.service.get_stats().await?;
        let body = serde_json::to_vec(&snapshot)?;

        let mut request = self
            .client
            .request(self.method.clone(), &self.config.url)
            .header(CONTENT_TYPE, "application/json");
        for (name, value) in &self.config.headers {
            if name.eq_ignore_ascii_case(USER_AGENT.as_str()) {
                continue;
            }
            request = request.header(name.as_str(), value.as_str());
        }
        let mut response = request
            .header(USER_AGENT, PUSH_USER_AGENT)
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let mut content = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            content.extend_from_slice(&chunk);
            if content.len() >= MAX_RESPONSE_BYTES {
                content.truncate(MAX_RESPONSE_BYTES);
                break;
            }
        }
        let content = serde_json::from_slice(&content).unwrap_or_else(
            |_| serde_json::json!({"error": "Failed to parse response as json"}),
        );

        Ok(PushResponse { status, content })
    }

    /// Pushes every `interval` until the returned schedule is stopped or
    /// dropped. Failures are logged and the schedule keeps going.
    pub fn start(&self, interval: Duration) -> MetricsResult<Periodic> {
        let pusher = self.clone();
        log::info!("Pushing stats to {} every {interval:?}", self.config.url);
        Periodic::spawn(interval, move || {
            let pusher = pusher.clone();
            async move {
                match pusher.push().await {
                    Ok(response) if response.status >= 400 => {
                        log::warn!("Unable to push stats. Server reported {}", response.status)
                    }
                    Ok(_) => log::trace!("Pushed stats to {}", pusher.url()),
                    Err(e) => log::warn!("Unable to push stats: {e:#}"),
                }
            }
        })
    }
}
