//! `memory_info`: system memory and swap totals.

use serde::Deserialize;

use super::{zero_if_null, GroupMapper, GroupScope, MapError};
use crate::labels::LabelSet;
use crate::snapshot::GroupData;

#[derive(Debug, Deserialize)]
struct MemoryInfo {
    #[serde(default, deserialize_with = "zero_if_null")]
    memory_total_bytes: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    memory_used_bytes: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    swap_total_bytes: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    swap_used_bytes: f64,
}

pub struct MemoryInfoMapper;

impl GroupMapper for MemoryInfoMapper {
    fn map(&self, scope: &GroupScope<'_>, data: &GroupData, labels: LabelSet) -> Result<(), MapError> {
        let info: MemoryInfo = data.decode()?;

        let gauges = [
            ("system_memory_total_bytes", "System memory total bytes", info.memory_total_bytes),
            ("system_memory_used_bytes", "System memory used bytes", info.memory_used_bytes),
            ("system_swap_total_bytes", "System swap total bytes", info.swap_total_bytes),
            ("system_swap_used_bytes", "System swap used bytes", info.swap_used_bytes),
        ];
        for (name, help, bytes) in gauges {
            scope.gauge(name, help, &labels, &[])?.record(&labels, bytes)?;
        }
        Ok(())
    }
}
