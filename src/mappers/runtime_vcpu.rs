//! `neuron_runtime_vcpu_usage`: host CPU consumed by a runtime.

use serde::Deserialize;

use super::{zero_if_null, GroupMapper, GroupScope, MapError, USAGE_TYPE};
use crate::labels::LabelSet;
use crate::snapshot::GroupData;

#[derive(Debug, Deserialize)]
struct RuntimeVcpuUsage {
    #[serde(default)]
    vcpu_usage: VcpuUsage,
}

#[derive(Debug, Default, Deserialize)]
struct VcpuUsage {
    #[serde(default, deserialize_with = "zero_if_null")]
    user: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    system: f64,
}

pub struct RuntimeVcpuUsageMapper;

impl GroupMapper for RuntimeVcpuUsageMapper {
    fn map(&self, scope: &GroupScope<'_>, data: &GroupData, labels: LabelSet) -> Result<(), MapError> {
        let usage: RuntimeVcpuUsage = data.decode()?;

        let gauge = scope.gauge(
            "neuron_runtime_vcpu_usage_ratio",
            "Runtime vCPU utilization ratio",
            &labels,
            &[USAGE_TYPE],
        )?;
        for (usage_type, percent) in [("user", usage.vcpu_usage.user), ("system", usage.vcpu_usage.system)] {
            gauge.record(&labels.with(USAGE_TYPE, usage_type), percent / 100.0)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MetricRegistry;
    use crate::test_support::sample;
    use serde_json::json;

    #[test]
    fn test_both_usage_types_are_emitted() {
        let registry = MetricRegistry::new();
        let scope = GroupScope::new(&registry, "neuron_runtime_vcpu_usage");
        let data: GroupData =
            serde_json::from_value(json!({"vcpu_usage": {"user": 25.0}, "error": ""})).unwrap();

        RuntimeVcpuUsageMapper
            .map(&scope, &data, LabelSet::new().with("runtime_tag", "7"))
            .unwrap();

        let text = registry.encode().unwrap();
        assert_eq!(
            sample(&text, "neuron_runtime_vcpu_usage_ratio", &[("usage_type", "user")]),
            Some(0.25)
        );
        assert_eq!(
            sample(&text, "neuron_runtime_vcpu_usage_ratio", &[("usage_type", "system")]),
            Some(0.0)
        );
    }
}
