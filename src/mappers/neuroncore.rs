//! `neuroncore_counters`: per-core utilization of a runtime.

use serde::Deserialize;
use std::collections::BTreeMap;

use super::{zero_if_null, GroupMapper, GroupScope, MapError, NEURONCORE};
use crate::labels::LabelSet;
use crate::snapshot::GroupData;

#[derive(Debug, Deserialize)]
struct NeuroncoreCounters {
    #[serde(default)]
    neuroncores_in_use: BTreeMap<u32, CoreCounters>,
}

#[derive(Debug, Deserialize)]
struct CoreCounters {
    #[serde(default, deserialize_with = "zero_if_null")]
    neuroncore_utilization: f64,
}

pub struct NeuroncoreCountersMapper;

impl GroupMapper for NeuroncoreCountersMapper {
    fn map(&self, scope: &GroupScope<'_>, data: &GroupData, labels: LabelSet) -> Result<(), MapError> {
        let counters: NeuroncoreCounters = data.decode()?;

        let utilization = scope.gauge(
            "neuroncore_utilization_ratio",
            "NeuronCore utilization ratio",
            &labels,
            &[NEURONCORE],
        )?;
        for (core, counter) in &counters.neuroncores_in_use {
            utilization.record(
                &labels.with(NEURONCORE, core),
                counter.neuroncore_utilization / 100.0,
            )?;
        }
        Ok(())
    }
}
