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

//! Starts the reporters described by an [`InfraConfig`].

use crate::config::{interval_from_secs, InfraConfig};
use crate::logger::StatsLogger;
use crate::page::StatsPage;
use crate::push::StatsPusher;
use crate::schedule::Periodic;
use crate::system::install_defaults;
use vigil_core::MetricMap;
use vigil_telemetry::MetricsService;

/// Everything started from a configuration. Dropping it stops the schedules;
/// call [`shutdown`](Self::shutdown) to also drain the stats page.
#[derive(Debug, Default)]
pub struct Reporters {
    schedules: Vec<Periodic>,
    page: Option<StatsPage>,
}

impl Reporters {
    /// Number of running interval schedules.
    pub fn schedule_count(&self) -> usize {
        self.schedules.len()
    }

    /// The running stats page, if one was configured.
    pub fn page(&self) -> Option<&StatsPage> {
        self.page.as_ref()
    }

    /// Stops every schedule and the stats page.
    pub async fn shutdown(mut self) {
        for schedule in self.schedules.drain(..) {
            schedule.stop();
        }
        if let Some(page) = self.page.as_mut() {
            page.stop().await;
        }
    }
}

impl InfraConfig {
    /// Builds a service seeded with `initial`, installing the system helpers
    /// when enabled.
    pub fn build_service(&self) -> anyhow::Result<MetricsService> {
        let initial = match &self.initial {
            Some(value) => MetricMap::try_from(value.clone())?,
            None => MetricMap::new(),
        };
        let service = MetricsService::new(initial);
        if self.system_helpers {
            install_defaults(&service)?;
        }
        Ok(service)
    }

    /// Starts the configured logger, pusher and page against `service`.
    ///
    /// Sections without an interval are constructed but not scheduled.
    pub async fn start(&self, service: &MetricsService) -> anyhow::Result<Reporters> {
        let mut reporters = Reporters::default();

        if let Some(logger) = &self.logger {
            if let Some(interval) = interval_from_secs(logger.interval_secs) {
                let logger = StatsLogger::to_log(service.clone());
                reporters.schedules.push(logger.start(interval)?);
            }
        }

        if let Some(push) = &self.push {
            let pusher = StatsPusher::new(service.clone(), push.clone())?;
            if let Some(interval) = interval_from_secs(push.interval_secs) {
                reporters.schedules.push(pusher.start(interval)?);
            }
        }

        if let Some(page) = &self.page {
            reporters.page = Some(StatsPage::bind(service.clone(), page).await?);
        }

        Ok(reporters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::MetricValue;

    #[test]
    fn test_build_service_seeds_initial() {
        let config = InfraConfig::from_json(r#"{"initial": {"service": "api", "build": 7}}"#).unwrap();
        let service = config.build_service().unwrap();

        assert_eq!(
            service.get("service").unwrap().as_ref().and_then(MetricValue::as_str),
            Some("api")
        );
        assert_eq!(service.helper_count(), 0);
    }

    #[test]
    fn test_build_service_rejects_non_object_initial() {
        let config = InfraConfig::from_json(r#"{"initial": [1, 2]}"#).unwrap();
        assert!(config.build_service().is_err());
    }

    #[tokio::test]
    async fn test_start_from_config() {
        let config = InfraConfig::from_json(
            r#"{
                "system_helpers": true,
                "logger": {"interval_secs": 60},
                "push": {"url": "http://127.0.0.1:1/ingest"},
                "page": {"host": "127.0.0.1", "port": 0}
            }"#,
        )
        .unwrap();
        let service = config.build_service().unwrap();
        assert_eq!(service.helper_count(), 3);

        let reporters = config.start(&service).await.unwrap();

        assert_eq!(reporters.schedule_count(), 1);
        assert!(reporters.page().is_some());
        reporters.shutdown().await;
    }

    #[tokio::test]
    async fn test_start_rejects_empty_push_url() {
        let config = InfraConfig::from_json(r#"{"push": {"method": "PUT"}}"#).unwrap();
        let service = config.build_service().unwrap();
        assert!(config.start(&service).await.is_err());
    }
}
