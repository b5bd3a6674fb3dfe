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

//! Records a handful of metrics and reports them as configured.
//!
//! Usage: `sandbox [config.json]`. Without a config the snapshot is printed
//! once; with one, the configured logger, pusher and page run until Ctrl-C.

use anyhow::Context;
use vigil_infra::InfraConfig;
use vigil_telemetry::{MetricsService, Observe, ScopedMetricTimer};

fn record_demo_metrics(service: &MetricsService) -> anyhow::Result<()> {
    service.set("cat", "meow")?;
    for _ in 0..3 {
        service.increment("lines")?;
    }
    service.increment_hash("requests", "GET")?;

    let games = service.windowed_stat("games", 10)?;
    for score in [50.0, 100.0, 75.0] {
        games.observe(score)?;
    }

    let ht = service.add_stat("ht")?;
    for sample in [40.0, 1000.0, 352.0, 550.0] {
        ht.observe(sample)?;
    }

    let latency = service.windowed_stat("setup_ms", 16)?;
    let _timer = ScopedMetricTimer::new(&latency);
    let ns = service.namespace("foo")?;
    ns.increment("foo")?;
    ns.set("bar", "baz")?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {path}"))?;
            InfraConfig::from_json(&json)?
        }
        None => InfraConfig {
            system_helpers: true,
            ..Default::default()
        },
    };

    let service = config.build_service()?;
    record_demo_metrics(&service)?;

    let snapshot = service.get_stats().await?;
    log::info!("{}", serde_json::to_string_pretty(&snapshot)?);

    let reporters = config.start(&service).await?;
    if reporters.schedule_count() == 0 && reporters.page().is_none() {
        return Ok(());
    }

    log::info!("Reporters running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    reporters.shutdown().await;
    Ok(())
}
