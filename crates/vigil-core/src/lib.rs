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

//! # Vigil Core
//!
//! Foundational crate containing the metric value model, the statistics
//! primitives and the helper contract that the aggregation engine is built on.

#![warn(missing_docs)]

pub mod helper;
pub mod metrics;
pub mod state;
pub mod stats;

pub use helper::{FnHelper, Helper};
pub use metrics::{MetricKind, MetricMap, MetricValue, MetricsError, MetricsResult, StatSummary};
pub use state::{Section, SharedState};
pub use stats::{RollingStatistic, WindowedHistory};
