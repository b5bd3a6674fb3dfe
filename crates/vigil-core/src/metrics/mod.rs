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

//! Provides the "common language" for every recorded value.
//!
//! This module defines the tagged value model stored in the metric state and
//! the error taxonomy shared by the whole engine. `vigil-telemetry` builds the
//! service on top of it, and `vigil-infra` provides concrete helpers and
//! reporters that consume it.

pub mod error;
pub mod value;

pub use self::error::{MetricsError, MetricsResult};
pub use self::value::{MetricKind, MetricMap, MetricValue, StatSummary};
