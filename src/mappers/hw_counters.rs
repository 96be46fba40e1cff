//! `neuron_hw_counters`: per-device ECC event counters.

use serde::Deserialize;

use super::{zero_if_null, GroupMapper, GroupScope, MapError, EVENT_TYPE, NEURON_DEVICE_INDEX};
use crate::labels::LabelSet;
use crate::snapshot::GroupData;

#[derive(Debug, Deserialize)]
struct HwCounters {
    #[serde(default)]
    neuron_devices: Vec<DeviceCounters>,
}

#[derive(Debug, Deserialize)]
struct DeviceCounters {
    neuron_device_index: u32,
    #[serde(default, deserialize_with = "zero_if_null")]
    mem_ecc_corrected: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    mem_ecc_uncorrected: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    sram_ecc_corrected: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    sram_ecc_uncorrected: f64,
}

impl DeviceCounters {
    fn events(&self) -> [(&'static str, f64); 4] {
        [
            ("mem_ecc_corrected", self.mem_ecc_corrected),
            ("mem_ecc_uncorrected", self.mem_ecc_uncorrected),
            ("sram_ecc_corrected", self.sram_ecc_corrected),
            ("sram_ecc_uncorrected", self.sram_ecc_uncorrected),
        ]
    }
}

pub struct HwCountersMapper;

impl GroupMapper for HwCountersMapper {
    fn map(&self, scope: &GroupScope<'_>, data: &GroupData, labels: LabelSet) -> Result<(), MapError> {
        let counters: HwCounters = data.decode()?;

        let ecc_events = scope.counter(
            "hardware_ecc_events_total",
            "Hardware ecc events total",
            &labels,
            &[EVENT_TYPE, NEURON_DEVICE_INDEX],
        )?;
        for device in &counters.neuron_devices {
            let device_labels = labels.with(NEURON_DEVICE_INDEX, device.neuron_device_index);
            for (event_type, delta) in device.events() {
                ecc_events.record(&device_labels.with(EVENT_TYPE, event_type), delta)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MetricRegistry;
    use crate::test_support::{sample, series_count};
    use serde_json::json;

    #[test]
    fn test_every_event_type_per_device() {
        let registry = MetricRegistry::new();
        let scope = GroupScope::new(&registry, "neuron_hw_counters");
        let data: GroupData = serde_json::from_value(json!({
            "neuron_devices": [
                {"neuron_device_index": 0, "mem_ecc_corrected": 3},
                {"neuron_device_index": 1, "sram_ecc_uncorrected": 1}
            ],
            "error": ""
        }))
        .unwrap();

        HwCountersMapper.map(&scope, &data, LabelSet::new()).unwrap();

        let text = registry.encode().unwrap();
        assert_eq!(series_count(&text, "hardware_ecc_events_total"), 8);
        assert_eq!(
            sample(
                &text,
                "hardware_ecc_events_total",
                &[("neuron_device_index", "0"), ("event_type", "mem_ecc_corrected")]
            ),
            Some(3.0)
        );
        assert_eq!(
            sample(
                &text,
                "hardware_ecc_events_total",
                &[("neuron_device_index", "1"), ("event_type", "mem_ecc_corrected")]
            ),
            Some(0.0)
        );
    }
}
