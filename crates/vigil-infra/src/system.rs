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

//! sysinfo-based helpers reporting memory, host and process information.

use async_trait::async_trait;
use std::sync::Mutex;
use sysinfo::{Pid, ProcessesToUpdate, System};
use vigil_core::{Helper, MetricMap, MetricsResult, Section};
use vigil_telemetry::MetricsService;

fn current_pid() -> anyhow::Result<Pid> {
    sysinfo::get_current_pid().map_err(|e| anyhow::anyhow!("cannot resolve current pid: {e}"))
}

/// Reports host and process memory under `system.memory` and `process.memory`.
#[derive(Debug)]
pub struct MemoryStats {
    system: Mutex<System>,
}

impl MemoryStats {
    /// Creates a new MemoryStats helper.
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for MemoryStats {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Helper for MemoryStats {
    async fn run(&self, section: &Section) -> anyhow::Result<()> {
        let pid = current_pid()?;
        let (host, process) = {
            let mut system = self
                .system
                .lock()
                .map_err(|_| anyhow::anyhow!("sysinfo lock poisoned"))?;
            system.refresh_memory();
            system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

            let host = MetricMap::new()
                .with("free", system.free_memory())
                .with("total", system.total_memory());
            let process = system.process(pid).map(|p| {
                MetricMap::new()
                    .with("rss", p.memory())
                    .with("virtual", p.virtual_memory())
            });
            (host, process)
        };

        section.merge("system", MetricMap::new().with("memory", host))?;
        if let Some(process) = process {
            section.merge("process", MetricMap::new().with("memory", process))?;
        }
        Ok(())
    }
}

/// Reports architecture, platform, hostname, uptime, load average and CPU
/// information under `system`.
#[derive(Debug)]
pub struct SystemStats {
    system: Mutex<System>,
}

impl SystemStats {
    /// Creates a new SystemStats helper.
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_all();
        Self {
            system: Mutex::new(system),
        }
    }
}

impl Default for SystemStats {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Helper for SystemStats {
    async fn run(&self, section: &Section) -> anyhow::Result<()> {
        let load = System::load_average();
        let loadavg = MetricMap::new()
            .with("1m", load.one)
            .with("5m", load.five)
            .with("15m", load.fifteen);

        let cpu = {
            let mut system = self
                .system
                .lock()
                .map_err(|_| anyhow::anyhow!("sysinfo lock poisoned"))?;
            system.refresh_cpu_all();
            let cpus = system.cpus();
            let mut cpu = MetricMap::new().with("cores", cpus.len());
            if let Some(first) = cpus.first() {
                cpu = cpu.with("model", first.brand().trim());
            }
            if !cpus.is_empty() {
                let speed = cpus.iter().map(|c| c.frequency() as f64).sum::<f64>() / cpus.len() as f64;
                cpu = cpu.with("speed", speed);
            }
            cpu
        };

        let record = MetricMap::new()
            .with("arch", std::env::consts::ARCH)
            .with("platform", std::env::consts::OS)
            .with("hostname", System::host_name().unwrap_or_default())
            .with("uptime", System::uptime())
            .with("loadavg", loadavg)
            .with("cpu", cpu);
        section.merge("system", record)?;
        Ok(())
    }
}

/// Reports pid, name, uptime and user of the current process under `process`.
#[derive(Debug)]
pub struct ProcessStats {
    system: Mutex<System>,
}

impl ProcessStats {
    /// Creates a new ProcessStats helper.
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for ProcessStats {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Helper for ProcessStats {
    async fn run(&self, section: &Section) -> anyhow::Result<()> {
        let pid = current_pid()?;
        let mut record = MetricMap::new()
            .with("pid", u64::from(pid.as_u32()))
            .with("user", std::env::var("USER").unwrap_or_default());

        {
            let mut system = self
                .system
                .lock()
                .map_err(|_| anyhow::anyhow!("sysinfo lock poisoned"))?;
            system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
            if let Some(process) = system.process(pid) {
                record = record
                    .with("name", process.name().to_string_lossy().into_owned())
                    .with("uptime", process.run_time());
            }
        }

        section.merge("process", record)?;
        Ok(())
    }
}

/// Registers the memory, system and process helpers, in that order.
pub fn install_defaults(service: &MetricsService) -> MetricsResult<()> {
    service.register_helper(MemoryStats::new())?;
    service.register_helper(SystemStats::new())?;
    service.register_helper(ProcessStats::new())?;
    log::info!("Installed default system helpers");
    Ok(())
}
