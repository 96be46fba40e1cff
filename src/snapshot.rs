//! Snapshot data model and sources.
//!
//! A snapshot is one polling cycle's worth of neuron-monitor output. It is
//! parsed fresh every cycle and never retained. Runtime entries and group
//! payloads are kept as raw JSON here and decoded one at a time by the
//! dispatcher, so a single odd-shaped entry cannot fail the whole cycle.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default location neuron-monitor writes its report to.
pub const DEFAULT_SNAPSHOT_PATH: &str = "/opt/aws/neuron/bin/neuron-monitor-output.json";

/// Default top-level key the snapshot is nested under.
pub const DEFAULT_SNAPSHOT_KEY: &str = "1";

/// Errors raised while reading or decoding a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode snapshot: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("snapshot document has no top-level key '{0}'")]
    MissingKey(String),
}

/// One cycle's telemetry.
#[derive(Debug, Clone, Deserialize)]
pub struct Snapshot {
    /// Per-process runtime entries, decoded with [`RuntimeReport::from_value`].
    /// `None` when the field is absent or null.
    #[serde(default)]
    pub neuron_runtime_data: Option<Vec<Value>>,

    /// System-wide report.
    #[serde(default)]
    pub system_data: Option<Report>,

    pub instance_info: InstanceInfo,

    #[serde(default)]
    pub neuron_hardware_info: Option<HardwareInfo>,
}

impl Snapshot {
    /// Decodes a snapshot from a JSON document.
    ///
    /// With a non-empty `key` the snapshot is taken from that top-level field,
    /// otherwise the whole document is the snapshot.
    pub fn from_json(document: &str, key: &str) -> Result<Self, SnapshotError> {
        if key.is_empty() {
            return Ok(serde_json::from_str(document)?);
        }

        let mut root: Map<String, Value> = serde_json::from_str(document)?;
        let inner = root
            .remove(key)
            .ok_or_else(|| SnapshotError::MissingKey(key.to_string()))?;
        Ok(serde_json::from_value(inner)?)
    }
}

/// Report produced by a single runtime process.
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeReport {
    #[serde(deserialize_with = "tag_as_string")]
    pub neuron_runtime_tag: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub error: String,

    /// Absent or null for runtimes that reported an error.
    #[serde(default)]
    pub report: Option<Report>,
}

impl RuntimeReport {
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }
}

/// Named metric groups of a report, payloads still undecoded.
pub type Report = BTreeMap<String, Value>;

/// Raw payload of a single metric group.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupData {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub error: String,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl GroupData {
    /// Splits a raw group payload into its error and fields. Fails when the
    /// payload is not an object.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    /// Decodes the group payload into its typed representation.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.fields.clone()))
    }
}

/// Static instance identity.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstanceInfo {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub instance_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub instance_id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub instance_type: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub instance_availability_zone: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub instance_region: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub subnet_id: String,
}

/// Static hardware identity.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HardwareInfo {
    pub neuron_device_count: u64,
    pub neuroncore_per_device_count: u64,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub error: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// neuron-monitor emits the tag as a string, older builds as a number.
fn tag_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "unexpected runtime tag {other}"
        ))),
    }
}

/// Anything that can produce a fresh snapshot each cycle.
pub trait SnapshotSource {
    fn read(&self) -> Result<Snapshot, SnapshotError>;
}

/// Reads snapshots from the JSON file neuron-monitor keeps rewriting.
#[derive(Debug, Clone)]
pub struct FileSnapshotSource {
    path: PathBuf,
    key: String,
}

impl FileSnapshotSource {
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotSource for FileSnapshotSource {
    fn read(&self) -> Result<Snapshot, SnapshotError> {
        let content = fs::read_to_string(&self.path).map_err(|source| SnapshotError::Io {
            path: self.path.clone(),
            source,
        })?;
        Snapshot::from_json(&content, &self.key)
    }
}
