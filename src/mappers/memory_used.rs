//! `memory_used`: runtime memory by location and per-core breakdown.
//!
//! The per-core `neuroncore_memory_usage_*` gauges are labelled by
//! `neuroncore` only. They carry no `memory_location` label, so their label
//! set differs from `neuron_runtime_memory_used_bytes` and from exporters
//! that emit `memory_location="None"` on the per-core series.

use serde::Deserialize;
use std::collections::BTreeMap;

use super::{zero_if_null, GroupMapper, GroupScope, MapError, MEMORY_LOCATION, NEURONCORE};
use crate::labels::LabelSet;
use crate::snapshot::GroupData;

#[derive(Debug, Deserialize)]
struct MemoryUsed {
    #[serde(default)]
    neuron_runtime_used_bytes: RuntimeUsedBytes,
}

#[derive(Debug, Default, Deserialize)]
struct RuntimeUsedBytes {
    #[serde(default, deserialize_with = "zero_if_null")]
    host: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    neuron_device: f64,
    #[serde(default)]
    usage_breakdown: UsageBreakdown,
}

#[derive(Debug, Default, Deserialize)]
struct UsageBreakdown {
    #[serde(default)]
    neuroncore_memory_usage: BTreeMap<u32, CoreMemoryUsage>,
}

#[derive(Debug, Default, Deserialize)]
struct CoreMemoryUsage {
    #[serde(default, deserialize_with = "zero_if_null")]
    constants: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    model_code: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    model_shared_scratchpad: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    runtime_memory: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    tensors: f64,
}

/// Per-core memory categories, in exposition order.
pub const CORE_MEMORY_CATEGORIES: [&str; 5] = [
    "constants",
    "model_code",
    "model_shared_scratchpad",
    "runtime_memory",
    "tensors",
];

impl CoreMemoryUsage {
    fn bytes(&self, category: &str) -> f64 {
        match category {
            "constants" => self.constants,
            "model_code" => self.model_code,
            "model_shared_scratchpad" => self.model_shared_scratchpad,
            "runtime_memory" => self.runtime_memory,
            "tensors" => self.tensors,
            _ => 0.0,
        }
    }
}

pub struct MemoryUsedMapper;

impl GroupMapper for MemoryUsedMapper {
    fn map(&self, scope: &GroupScope<'_>, data: &GroupData, labels: LabelSet) -> Result<(), MapError> {
        let memory: MemoryUsed = data.decode()?;
        let used = &memory.neuron_runtime_used_bytes;

        let by_location = scope.gauge(
            "neuron_runtime_memory_used_bytes",
            "Runtime memory used bytes",
            &labels,
            &[MEMORY_LOCATION],
        )?;
        for (location, bytes) in [("host", used.host), ("neuron_device", used.neuron_device)] {
            by_location.record(&labels.with(MEMORY_LOCATION, location), bytes)?;
        }

        for category in CORE_MEMORY_CATEGORIES {
            let gauge = scope.gauge(
                &format!("neuroncore_memory_usage_{category}"),
                &format!("NeuronCore memory utilization for {category}"),
                &labels,
                &[NEURONCORE],
            )?;
            for (core, usage) in &used.usage_breakdown.neuroncore_memory_usage {
                gauge.record(&labels.with(NEURONCORE, core), usage.bytes(category))?;
            }
        }
        Ok(())
    }
}
