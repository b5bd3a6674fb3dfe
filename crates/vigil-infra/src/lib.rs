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

//! # Vigil Infra
//!
//! Concrete implementations that plug into the metrics service: sysinfo-based
//! system and process helpers, and the reporters that deliver snapshots to a
//! log sink, a remote HTTP endpoint, or a local stats page.

#![warn(missing_docs)]

pub mod config;
pub mod logger;
pub mod page;
pub mod push;
pub mod reporters;
pub mod schedule;
pub mod system;

pub use config::{InfraConfig, LoggerConfig, PageConfig, PushConfig};
pub use logger::StatsLogger;
pub use page::StatsPage;
pub use push::{PushResponse, StatsPusher};
pub use reporters::Reporters;
pub use schedule::Periodic;
pub use system::{install_defaults, MemoryStats, ProcessStats, SystemStats};
