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

//! Error types for the metrics engine.

use super::value::MetricKind;
use std::fmt::Display;

/// A specialized `Result` type for metric-related operations.
pub type MetricsResult<T> = Result<T, MetricsError>;

/// An error that can occur within the metrics engine.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricsError {
    /// A numeric-only operation received a value it cannot use
    /// (e.g., `NaN` pushed into a windowed history).
    InvalidValue(String),
    /// A component was configured with an unusable parameter
    /// (e.g., a windowed history with zero capacity).
    InvalidConfig(String),
    /// The operation is not supported on this handle
    /// (e.g., creating a namespace inside a namespace).
    UnsupportedOperation(String),
    /// A key is already occupied by a value of an incompatible kind.
    KeyConflict {
        /// The key that was addressed.
        key: String,
        /// The kind of value currently stored under the key.
        found: MetricKind,
    },
    /// A helper step reported a failure during a chain run.
    HelperStep(String),
    /// An error originating from the shared state storage.
    StorageError(String),
}

impl MetricsError {
    /// Builds an `InvalidValue` error for a non-finite sample.
    pub fn non_finite(value: f64) -> Self {
        MetricsError::InvalidValue(format!("expected a finite number, got {value}"))
    }
}

impl Display for MetricsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricsError::InvalidValue(msg) => write!(f, "Invalid value: {msg}"),
            MetricsError::InvalidConfig(msg) => write!(f, "Invalid configuration: {msg}"),
            MetricsError::UnsupportedOperation(msg) => write!(f, "Unsupported operation: {msg}"),
            MetricsError::KeyConflict { key, found } => {
                write!(f, "Key conflict: '{key}' already holds a {found:?}")
            }
            MetricsError::HelperStep(msg) => write!(f, "Helper step failed: {msg}"),
            MetricsError::StorageError(msg) => write!(f, "Storage error: {msg}"),
        }
    }
}

impl std::error::Error for MetricsError {}
