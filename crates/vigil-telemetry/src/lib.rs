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

//! # Vigil Telemetry
//!
//! The metrics service: a shared state container, the ordered helper chain
//! that enriches it on demand, namespaces, and the windowed/rolling stat
//! handles whose reporters run as ordinary helpers.

#![warn(missing_docs)]

pub mod chain;
pub mod handles;
pub mod namespace;
pub mod service;
pub mod utils;

pub use chain::{HelperChain, HELPER_ERRORS_KEY, RUNTIME_NAMESPACE};
pub use handles::{Observe, RollingHandle, WindowHandle};
pub use namespace::Namespace;
pub use service::MetricsService;
pub use utils::timer::ScopedMetricTimer;

pub use vigil_core::{
    FnHelper, Helper, MetricKind, MetricMap, MetricValue, MetricsError, MetricsResult, Section,
    StatSummary,
};
