//! `vcpu_usage`: system vCPU count and aggregated usage ratios.

use serde::de::IgnoredAny;
use serde::Deserialize;
use std::collections::BTreeMap;

use super::{zero_if_null, GroupMapper, GroupScope, MapError, USAGE_TYPE};
use crate::labels::LabelSet;
use crate::snapshot::GroupData;

/// Upstream rounding can push the summed categories past 100%.
const MAX_USAGE_PERCENT: f64 = 100.0;

#[derive(Debug, Deserialize)]
struct SystemVcpuUsage {
    #[serde(default)]
    usage_data: BTreeMap<String, IgnoredAny>,
    #[serde(default)]
    average_usage: CpuUsage,
}

#[derive(Debug, Default, Deserialize)]
struct CpuUsage {
    #[serde(default, deserialize_with = "zero_if_null")]
    user: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    nice: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    system: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    io_wait: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    irq: f64,
    #[serde(default, deserialize_with = "zero_if_null")]
    soft_irq: f64,
}

impl CpuUsage {
    /// OS-level categories folded into the coarse user/system buckets.
    fn buckets(&self) -> [(&'static str, f64); 2] {
        [
            ("user", self.user + self.nice),
            ("system", self.system + self.io_wait + self.irq + self.soft_irq),
        ]
    }
}

fn usage_ratio(percent: f64) -> f64 {
    percent.min(MAX_USAGE_PERCENT) / 100.0
}

pub struct SystemVcpuUsageMapper;

impl GroupMapper for SystemVcpuUsageMapper {
    fn map(&self, scope: &GroupScope<'_>, data: &GroupData, labels: LabelSet) -> Result<(), MapError> {
        let usage: SystemVcpuUsage = data.decode()?;

        scope
            .gauge("system_vcpu_count", "System vCPU count", &labels, &[])?
            .record(&labels, usage.usage_data.len() as f64)?;

        let ratio = scope.gauge(
            "system_vcpu_usage_ratio",
            "System CPU utilization ratio",
            &labels,
            &[USAGE_TYPE],
        )?;
        for (usage_type, percent) in usage.average_usage.buckets() {
            ratio.record(&labels.with(USAGE_TYPE, usage_type), usage_ratio(percent))?;
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

    fn map(average_usage: serde_json::Value) -> String {
        let registry = MetricRegistry::new();
        let scope = GroupScope::new(&registry, "vcpu_usage");
        let data: GroupData = serde_json::from_value(json!({
            "usage_data": {
                "0": {"user": 1.0, "system": 0.5},
                "1": {"user": 2.0, "system": 0.0},
                "2": {"user": 0.0, "system": 0.0}
            },
            "average_usage": average_usage,
            "context_switch_count": 1234,
            "error": ""
        }))
        .unwrap();
        SystemVcpuUsageMapper.map(&scope, &data, LabelSet::new()).unwrap();
        registry.encode().unwrap()
    }

    #[test]
    fn test_count_and_aggregated_ratios() {
        let text = map(json!({"user": 20.0, "nice": 5.0, "system": 10.0,
                             "idle": 50.0, "io_wait": 5.0, "irq": 5.0, "soft_irq": 5.0}));

        assert_eq!(sample(&text, "system_vcpu_count", &[]), Some(3.0));
        assert_eq!(sample(&text, "system_vcpu_usage_ratio", &[("usage_type", "user")]), Some(0.25));
        assert_eq!(sample(&text, "system_vcpu_usage_ratio", &[("usage_type", "system")]), Some(0.25));
    }

    #[test]
    fn test_ratio_is_clamped_to_one() {
        let text = map(json!({"user": 99.5, "nice": 1.5, "system": 60.0,
                             "io_wait": 30.0, "irq": 10.0, "soft_irq": 0.7}));

        assert_eq!(sample(&text, "system_vcpu_usage_ratio", &[("usage_type", "user")]), Some(1.0));
        assert_eq!(sample(&text, "system_vcpu_usage_ratio", &[("usage_type", "system")]), Some(1.0));
    }
}
