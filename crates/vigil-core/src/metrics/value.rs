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

//! The tagged value model stored in the metric state.

use super::error::{MetricsError, MetricsResult};
use serde::{Serialize, Serializer};
use std::collections::btree_map::{self, BTreeMap};

/// The fundamental kind of a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// A finite 64-bit float (counters and gauges).
    Number,
    /// A free-form string.
    Text,
    /// A plain nested record (e.g. produced by `increment_hash`).
    Map,
    /// A nested region created through `namespace()`.
    Namespace,
    /// A statistical summary written by a stat reporter.
    Summary,
}

/// An enumeration of possible stored values.
///
/// Serialized as plain JSON: numbers, strings and nested objects. Whole
/// numbers are written as integers.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    /// A counter or gauge value.
    Number(f64),
    /// A string value.
    Text(String),
    /// A plain nested mapping.
    Map(MetricMap),
    /// A namespace region. Only `MetricMap::ensure_namespace` creates these.
    Namespace(MetricMap),
    /// A count/min/max/mean(/sum/stddev) summary.
    Summary(StatSummary),
}

impl MetricValue {
    /// Returns the [`MetricKind`] corresponding to this value.
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricValue::Number(_) => MetricKind::Number,
            MetricValue::Text(_) => MetricKind::Text,
            MetricValue::Map(_) => MetricKind::Map,
            MetricValue::Namespace(_) => MetricKind::Namespace,
            MetricValue::Summary(_) => MetricKind::Summary,
        }
    }

    /// Returns the value as an `f64` if it is a `Number`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as a `&str` if it is `Text`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetricValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the nested mapping if the value is a `Map` or a `Namespace`.
    pub fn as_map(&self) -> Option<&MetricMap> {
        match self {
            MetricValue::Map(m) | MetricValue::Namespace(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the summary if the value is a `Summary`.
    pub fn as_summary(&self) -> Option<&StatSummary> {
        match self {
            MetricValue::Summary(s) => Some(s),
            _ => None,
        }
    }

    fn as_map_mut(&mut self) -> Option<&mut MetricMap> {
        match self {
            MetricValue::Map(m) | MetricValue::Namespace(m) => Some(m),
            _ => None,
        }
    }

    /// Fails with `InvalidValue` if a non-finite number appears anywhere in
    /// the value, including nested maps and summary fields.
    pub fn check_finite(&self) -> MetricsResult<()> {
        match self {
            MetricValue::Number(n) => finite(*n),
            MetricValue::Text(_) => Ok(()),
            MetricValue::Map(m) | MetricValue::Namespace(m) => {
                m.values().try_for_each(MetricValue::check_finite)
            }
            MetricValue::Summary(s) => [s.min, s.max, s.sum, s.mean, s.standard_deviation]
                .into_iter()
                .flatten()
                .try_for_each(finite),
        }
    }

    /// Demotes namespace regions to plain maps, recursively.
    fn into_plain(self) -> Self {
        match self {
            MetricValue::Namespace(m) | MetricValue::Map(m) => MetricValue::Map(m.into_plain()),
            other => other,
        }
    }
}

fn finite(n: f64) -> MetricsResult<()> {
    if n.is_finite() {
        Ok(())
    } else {
        Err(MetricsError::non_finite(n))
    }
}

/// Largest magnitude below which every whole `f64` is an exact integer.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

fn serialize_number<S: Serializer>(n: f64, serializer: S) -> Result<S::Ok, S::Error> {
    if n.fract() == 0.0 && n.abs() < MAX_EXACT_INTEGER {
        serializer.serialize_i64(n as i64)
    } else {
        serializer.serialize_f64(n)
    }
}

fn serialize_optional_number<S: Serializer>(
    n: &Option<f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match n {
        Some(n) => serialize_number(*n, serializer),
        None => serializer.serialize_none(),
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MetricValue::Number(n) => serialize_number(*n, serializer),
            MetricValue::Text(t) => serializer.serialize_str(t),
            MetricValue::Map(m) | MetricValue::Namespace(m) => m.serialize(serializer),
            MetricValue::Summary(s) => s.serialize(serializer),
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Number(value)
    }
}

impl From<u64> for MetricValue {
    fn from(value: u64) -> Self {
        MetricValue::Number(value as f64)
    }
}

impl From<i64> for MetricValue {
    fn from(value: i64) -> Self {
        MetricValue::Number(value as f64)
    }
}

impl From<usize> for MetricValue {
    fn from(value: usize) -> Self {
        MetricValue::Number(value as f64)
    }
}

impl From<String> for MetricValue {
    fn from(value: String) -> Self {
        MetricValue::Text(value)
    }
}

impl From<&str> for MetricValue {
    fn from(value: &str) -> Self {
        MetricValue::Text(value.to_string())
    }
}

impl From<MetricMap> for MetricValue {
    fn from(value: MetricMap) -> Self {
        MetricValue::Map(value.into_plain())
    }
}

impl From<StatSummary> for MetricValue {
    fn from(value: StatSummary) -> Self {
        MetricValue::Summary(value)
    }
}

/// A read-only summary of a numeric stream.
///
/// Absent fields are omitted from serialized output, so an empty stat never
/// leaks `NaN` or `null` into a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatSummary {
    /// Number of samples the summary covers.
    pub count: u64,
    /// Smallest sample.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_optional_number"
    )]
    pub min: Option<f64>,
    /// Largest sample.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_optional_number"
    )]
    pub max: Option<f64>,
    /// Sum of all samples (rolling statistics only).
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_optional_number"
    )]
    pub sum: Option<f64>,
    /// Arithmetic mean.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_optional_number"
    )]
    pub mean: Option<f64>,
    /// Population standard deviation (rolling statistics only).
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_optional_number"
    )]
    pub standard_deviation: Option<f64>,
}

/// An ordered mapping from key to [`MetricValue`]; the root of the state tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricMap {
    entries: BTreeMap<String, MetricValue>,
}

impl MetricMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON object into a map.
    ///
    /// Numbers, strings and nested objects are accepted; anything else is an
    /// `InvalidValue` error.
    pub fn from_json(json: &str) -> MetricsResult<Self> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| MetricsError::InvalidValue(format!("malformed JSON: {e}")))?;
        Self::try_from(value)
    }

    /// Builder-style insert used when assembling records (e.g. in helpers).
    ///
    /// Values are not validated here; [`set`](Self::set) and
    /// [`merge`](Self::merge) reject records holding non-finite numbers.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        self.entries.insert(key.into(), value.into().into_plain());
        self
    }

    /// Returns the number of top-level entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&MetricValue> {
        self.entries.get(key)
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterates over values in key order.
    pub fn values(&self) -> btree_map::Values<'_, String, MetricValue> {
        self.entries.values()
    }

    /// Iterates over entries in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, MetricValue> {
        self.entries.iter()
    }

    /// Unconditionally overwrites `key`.
    ///
    /// Fails with `KeyConflict` if `key` is a namespace, and with
    /// `InvalidValue` for non-finite numbers. Namespace values cannot be
    /// stored directly; they are demoted to plain maps.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<MetricValue>) -> MetricsResult<()> {
        let key = key.into();
        self.check_scalar_slot(&key)?;
        let value = value.into().into_plain();
        value.check_finite()?;
        self.entries.insert(key, value);
        Ok(())
    }

    /// Adds one to the number under `key`, starting over at 1 when the
    /// current value is absent or not numeric. Returns the new value.
    pub fn increment(&mut self, key: impl Into<String>) -> MetricsResult<f64> {
        let key = key.into();
        self.check_scalar_slot(&key)?;
        let slot = self.entries.entry(key).or_insert(MetricValue::Number(0.0));
        let next = match slot.as_f64() {
            Some(current) => current + 1.0,
            None => 1.0,
        };
        *slot = MetricValue::Number(next);
        Ok(next)
    }

    /// Ensures `key` addresses a nested mapping, then applies the
    /// [`increment`](Self::increment) rule to `subkey` inside it.
    ///
    /// A non-mapping value under `key` is replaced by a fresh map.
    pub fn increment_hash(
        &mut self,
        key: impl Into<String>,
        subkey: impl Into<String>,
    ) -> MetricsResult<f64> {
        let slot = self
            .entries
            .entry(key.into())
            .or_insert_with(|| MetricValue::Map(MetricMap::new()));
        match slot {
            MetricValue::Map(map) | MetricValue::Namespace(map) => map.increment(subkey),
            other => {
                let mut fresh = MetricMap::new();
                let next = fresh.increment(subkey)?;
                *other = MetricValue::Map(fresh);
                Ok(next)
            }
        }
    }

    /// Returns the namespace region under `name`, creating it if absent.
    ///
    /// Fails with `KeyConflict` if `name` already holds a non-namespace value.
    pub fn ensure_namespace(&mut self, name: &str) -> MetricsResult<&mut MetricMap> {
        let slot = self
            .entries
            .entry(name.to_string())
            .or_insert_with(|| MetricValue::Namespace(MetricMap::new()));
        match slot {
            MetricValue::Namespace(map) => Ok(map),
            other => Err(MetricsError::KeyConflict {
                key: name.to_string(),
                found: other.kind(),
            }),
        }
    }

    /// Deep-merges `record` into the mapping under `key`.
    ///
    /// Nested mappings are merged key by key; any other value is overwritten.
    /// A non-mapping value under `key` is replaced. A record holding a
    /// non-finite number anywhere fails with `InvalidValue` and changes nothing.
    pub fn merge(&mut self, key: impl Into<String>, record: MetricMap) -> MetricsResult<()> {
        record.values().try_for_each(MetricValue::check_finite)?;
        let slot = self
            .entries
            .entry(key.into())
            .or_insert_with(|| MetricValue::Map(MetricMap::new()));
        if slot.as_map().is_none() {
            *slot = MetricValue::Map(MetricMap::new());
        }
        if let Some(target) = slot.as_map_mut() {
            target.merge_entries(record);
        }
        Ok(())
    }

    fn merge_entries(&mut self, record: MetricMap) {
        for (key, value) in record.entries {
            let existing = self.entries.get(&key).map(MetricValue::kind);
            match (existing, value) {
                (Some(MetricKind::Map | MetricKind::Namespace), MetricValue::Map(incoming)) => {
                    if let Some(target) = self.entries.get_mut(&key).and_then(MetricValue::as_map_mut) {
                        target.merge_entries(incoming);
                    }
                }
                (Some(MetricKind::Namespace), _) => {
                    log::warn!("Skipping merge of '{key}': key is a namespace");
                }
                (_, value) => {
                    self.entries.insert(key, value.into_plain());
                }
            }
        }
    }

    fn check_scalar_slot(&self, key: &str) -> MetricsResult<()> {
        match self.entries.get(key) {
            Some(MetricValue::Namespace(_)) => Err(MetricsError::KeyConflict {
                key: key.to_string(),
                found: MetricKind::Namespace,
            }),
            _ => Ok(()),
        }
    }

    fn into_plain(self) -> Self {
        Self {
            entries: self
                .entries
                .into_iter()
                .map(|(k, v)| (k, v.into_plain()))
                .collect(),
        }
    }
}

impl Serialize for MetricMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

impl<'a> IntoIterator for &'a MetricMap {
    type Item = (&'a String, &'a MetricValue);
    type IntoIter = btree_map::Iter<'a, String, MetricValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl TryFrom<serde_json::Value> for MetricMap {
    type Error = MetricsError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::Object(object) => {
                let mut entries = BTreeMap::new();
                for (key, value) in object {
                    let value = MetricValue::try_from(value).map_err(|e| match e {
                        MetricsError::InvalidValue(msg) => {
                            MetricsError::InvalidValue(format!("{key}: {msg}"))
                        }
                        other => other,
                    })?;
                    entries.insert(key, value);
                }
                Ok(Self { entries })
            }
            other => Err(MetricsError::InvalidValue(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }
}

impl TryFrom<serde_json::Value> for MetricValue {
    type Error = MetricsError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(MetricValue::Number)
                .ok_or_else(|| MetricsError::InvalidValue(format!("unrepresentable number {n}"))),
            serde_json::Value::String(s) => Ok(MetricValue::Text(s)),
            serde_json::Value::Object(_) => Ok(MetricValue::Map(MetricMap::try_from(value)?)),
            other => Err(MetricsError::InvalidValue(format!(
                "unsupported JSON value {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_starts_over_on_non_numeric() {
        let mut map = MetricMap::new();
        assert_eq!(map.increment("lines").unwrap(), 1.0);
        assert_eq!(map.increment("lines").unwrap(), 2.0);

        map.set("label", "meow").unwrap();
        assert_eq!(map.increment("label").unwrap(), 1.0);
        assert_eq!(map.get("label").and_then(MetricValue::as_f64), Some(1.0));
    }

    #[test]
    fn test_increment_hash() {
        let mut map = MetricMap::new();
        map.increment_hash("codes", "200").unwrap();
        map.increment_hash("codes", "200").unwrap();
        map.increment_hash("codes", "404").unwrap();

        let codes = map.get("codes").and_then(MetricValue::as_map).unwrap();
        assert_eq!(codes.get("200").and_then(MetricValue::as_f64), Some(2.0));
        assert_eq!(codes.get("404").and_then(MetricValue::as_f64), Some(1.0));
        assert_eq!(map.get("codes").unwrap().kind(), MetricKind::Map);
    }

    #[test]
    fn test_increment_hash_replaces_scalar() {
        let mut map = MetricMap::new();
        map.set("codes", 3.0).unwrap();
        assert_eq!(map.increment_hash("codes", "500").unwrap(), 1.0);
        assert_eq!(map.get("codes").unwrap().kind(), MetricKind::Map);
    }

    #[test]
    fn test_namespace_collisions() {
        let mut map = MetricMap::new();
        map.ensure_namespace("ns").unwrap();

        assert_eq!(
            map.set("ns", 1.0),
            Err(MetricsError::KeyConflict {
                key: "ns".to_string(),
                found: MetricKind::Namespace
            })
        );
        assert!(map.increment("ns").is_err());

        map.set("plain", "text").unwrap();
        assert_eq!(
            map.ensure_namespace("plain").unwrap_err(),
            MetricsError::KeyConflict {
                key: "plain".to_string(),
                found: MetricKind::Text
            }
        );
    }

    #[test]
    fn test_set_rejects_non_finite_numbers() {
        let mut map = MetricMap::new();
        assert!(matches!(
            map.set("x", f64::INFINITY),
            Err(MetricsError::InvalidValue(_))
        ));
        assert!(!map.contains_key("x"));
    }

    #[test]
    fn test_set_rejects_nested_non_finite() {
        let mut map = MetricMap::new();
        let record = MetricMap::new().with("inner", MetricMap::new().with("load", f64::NAN));
        assert!(matches!(map.set("system", record), Err(MetricsError::InvalidValue(_))));

        let summary = StatSummary {
            count: 1,
            mean: Some(f64::INFINITY),
            ..Default::default()
        };
        assert!(map.set("latency", summary).is_err());
        assert!(map.is_empty());
    }

    #[test]
    fn test_merge_rejects_non_finite() {
        let mut map = MetricMap::new();
        map.merge("system", MetricMap::new().with("arch", "x86_64")).unwrap();

        let result = map.merge(
            "system",
            MetricMap::new()
                .with("uptime", 12u64)
                .with("loadavg", MetricMap::new().with("1m", f64::NAN)),
        );

        assert!(matches!(result, Err(MetricsError::InvalidValue(_))));
        assert_eq!(
            serde_json::to_value(&map).unwrap(),
            serde_json::json!({"system": {"arch": "x86_64"}})
        );
    }

    #[test]
    fn test_whole_numbers_serialize_as_integers() {
        let map = MetricMap::new()
            .with("lines", 3u64)
            .with("checktime", 1_792_419_821_874u64)
            .with("delta", -2i64)
            .with("ratio", 0.25)
            .with(
                "ht",
                StatSummary {
                    count: 2,
                    min: Some(40.0),
                    max: Some(41.0),
                    sum: Some(81.0),
                    mean: Some(40.5),
                    standard_deviation: Some(0.5),
                },
            );

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(
            json,
            r#"{"checktime":1792419821874,"delta":-2,"ht":{"count":2,"min":40,"max":41,"sum":81,"mean":40.5,"standard_deviation":0.5},"lines":3,"ratio":0.25}"#
        );
    }

    #[test]
    fn test_merge_is_deep() {
        let mut map = MetricMap::new();
        map.merge("system", MetricMap::new().with("memory", MetricMap::new().with("free", 10u64)))
            .unwrap();
        map.merge("system", MetricMap::new().with("memory", MetricMap::new().with("total", 20u64)))
            .unwrap();
        map.merge("system", MetricMap::new().with("arch", "x86_64")).unwrap();

        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"system": {"arch": "x86_64", "memory": {"free": 10, "total": 20}}})
        );
    }

    #[test]
    fn test_summary_serialization_omits_absent_fields() {
        let map = MetricMap::new().with(
            "empty",
            StatSummary {
                count: 0,
                sum: Some(0.0),
                ..Default::default()
            },
        );
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"empty":{"count":0,"sum":0}}"#);
    }

    #[test]
    fn test_from_json() {
        let map = MetricMap::from_json(r#"{"foo": "initial", "n": 3, "nested": {"a": 1}}"#).unwrap();
        assert_eq!(map.get("foo").and_then(MetricValue::as_str), Some("initial"));
        assert_eq!(map.get("n").and_then(MetricValue::as_f64), Some(3.0));
        assert_eq!(map.get("nested").unwrap().kind(), MetricKind::Map);

        assert!(MetricMap::from_json(r#"{"flag": true}"#).is_err());
        assert!(MetricMap::from_json("[1, 2]").is_err());
    }
}
