//! Group mappers.
//!
//! Each metric group of a neuron-monitor report has one mapper that decodes
//! the group's payload and updates the registry. Mappers are looked up
//! through [`GroupKind`], a static table from group name to handler.

pub mod execution;
pub mod hw_counters;
pub mod info;
pub mod memory_info;
pub mod memory_used;
pub mod neuroncore;
pub mod runtime_vcpu;
pub mod system_vcpu;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::labels::LabelSet;
use crate::registry::{MetricHandle, MetricKind, MetricRegistry, RegistryError};
use crate::snapshot::GroupData;

// Dimension label names.
pub const NEURONCORE: &str = "neuroncore";
pub const NEURON_DEVICE_INDEX: &str = "neuron_device_index";
pub const USAGE_TYPE: &str = "usage_type";
pub const MEMORY_LOCATION: &str = "memory_location";
pub const ERROR_TYPE: &str = "error_type";
pub const STATUS_TYPE: &str = "status_type";
pub const EVENT_TYPE: &str = "event_type";
pub const PERCENTILE: &str = "percentile";

/// Errors raised while mapping one group.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("malformed group payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Maps one decoded group payload to registry updates.
pub trait GroupMapper: Send + Sync {
    /// `labels` is a private copy; mappers add their dimensions to it freely.
    fn map(&self, scope: &GroupScope<'_>, data: &GroupData, labels: LabelSet)
        -> Result<(), MapError>;
}

/// Registry view bound to one metric group.
pub struct GroupScope<'a> {
    registry: &'a MetricRegistry,
    group: &'a str,
}

impl<'a> GroupScope<'a> {
    pub fn new(registry: &'a MetricRegistry, group: &'a str) -> Self {
        Self { registry, group }
    }

    pub fn gauge(
        &self,
        name: &str,
        help: &str,
        labels: &LabelSet,
        dimensions: &[&str],
    ) -> Result<MetricHandle, RegistryError> {
        self.metric(name, MetricKind::Gauge, help, labels, dimensions)
    }

    pub fn counter(
        &self,
        name: &str,
        help: &str,
        labels: &LabelSet,
        dimensions: &[&str],
    ) -> Result<MetricHandle, RegistryError> {
        self.metric(name, MetricKind::Counter, help, labels, dimensions)
    }

    pub fn info(&self, name: &str, help: &str, labels: &LabelSet) -> Result<MetricHandle, RegistryError> {
        self.metric(name, MetricKind::Info, help, labels, &[])
    }

    /// Label keys are the caller's labels plus the metric's own dimensions.
    fn metric(
        &self,
        name: &str,
        kind: MetricKind,
        help: &str,
        labels: &LabelSet,
        dimensions: &[&str],
    ) -> Result<MetricHandle, RegistryError> {
        let mut keys: Vec<&str> = labels.keys().filter(|k| !dimensions.contains(k)).collect();
        keys.extend_from_slice(dimensions);
        self.registry.get_or_create(self.group, name, kind, &keys, help)
    }
}

/// Metric groups with a registered mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKind {
    NeuroncoreCounters,
    RuntimeVcpuUsage,
    MemoryUsed,
    ExecutionStats,
    HwCounters,
    SystemVcpuUsage,
    MemoryInfo,
}

impl GroupKind {
    pub const ALL: [GroupKind; 7] = [
        GroupKind::NeuroncoreCounters,
        GroupKind::RuntimeVcpuUsage,
        GroupKind::MemoryUsed,
        GroupKind::ExecutionStats,
        GroupKind::HwCounters,
        GroupKind::SystemVcpuUsage,
        GroupKind::MemoryInfo,
    ];

    /// Resolves a report group name. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Group name as it appears in the report.
    pub fn name(self) -> &'static str {
        match self {
            GroupKind::NeuroncoreCounters => "neuroncore_counters",
            GroupKind::RuntimeVcpuUsage => "neuron_runtime_vcpu_usage",
            GroupKind::MemoryUsed => "memory_used",
            GroupKind::ExecutionStats => "execution_stats",
            GroupKind::HwCounters => "neuron_hw_counters",
            GroupKind::SystemVcpuUsage => "vcpu_usage",
            GroupKind::MemoryInfo => "memory_info",
        }
    }

    pub fn mapper(self) -> &'static dyn GroupMapper {
        match self {
            GroupKind::NeuroncoreCounters => &neuroncore::NeuroncoreCountersMapper,
            GroupKind::RuntimeVcpuUsage => &runtime_vcpu::RuntimeVcpuUsageMapper,
            GroupKind::MemoryUsed => &memory_used::MemoryUsedMapper,
            GroupKind::ExecutionStats => &execution::ExecutionStatsMapper,
            GroupKind::HwCounters => &hw_counters::HwCountersMapper,
            GroupKind::SystemVcpuUsage => &system_vcpu::SystemVcpuUsageMapper,
            GroupKind::MemoryInfo => &memory_info::MemoryInfoMapper,
        }
    }
}

/// Numeric fields neuron-monitor may leave null.
pub(crate) fn zero_if_null<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}
