//! Routing of snapshot groups to their mappers.

use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::labels::{LabelBuilder, LabelSet};
use crate::mappers::info::{record_hardware_info, record_instance_info};
use crate::mappers::{GroupKind, GroupScope};
use crate::registry::MetricRegistry;
use crate::reset;
use crate::snapshot::{GroupData, Report, RuntimeReport, Snapshot};

/// What one dispatch did, for logging and self-telemetry.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Groups whose mapper ran successfully.
    pub groups_applied: usize,
    /// Groups skipped because the report flagged an error for them.
    pub group_errors: Vec<String>,
    /// Groups whose payload could not be mapped.
    pub map_failures: Vec<String>,
    /// Runtime reports skipped because of a report-level error.
    pub runtimes_skipped: usize,
    /// Whether the workload was absent and transient series were cleared.
    pub reset: bool,
}

/// Applies snapshots to the registry.
pub struct Dispatcher {
    registry: Arc<MetricRegistry>,
    labels: Option<LabelBuilder>,
}

impl Dispatcher {
    pub fn new(registry: Arc<MetricRegistry>) -> Self {
        Self {
            registry,
            labels: None,
        }
    }

    /// Applies one snapshot.
    ///
    /// Instance identity is taken from the first snapshot seen and reused
    /// afterwards.
    pub fn dispatch(&mut self, snapshot: &Snapshot) -> DispatchSummary {
        let labels = self
            .labels
            .get_or_insert_with(|| LabelBuilder::from_instance(&snapshot.instance_info))
            .clone();
        let mut summary = DispatchSummary::default();

        match &snapshot.neuron_runtime_data {
            Some(runtimes) if !runtimes.is_empty() => {
                for entry in runtimes {
                    let runtime = match RuntimeReport::from_value(entry) {
                        Ok(runtime) => runtime,
                        Err(e) => {
                            warn!("Malformed runtime report: {}", e);
                            summary.runtimes_skipped += 1;
                            continue;
                        }
                    };
                    let tag = runtime.neuron_runtime_tag.as_str();
                    if !runtime.error.is_empty() {
                        warn!("Runtime {} error: {}", tag, runtime.error);
                        summary.runtimes_skipped += 1;
                        continue;
                    }
                    let Some(report) = &runtime.report else {
                        debug!("Runtime {} sent no report", tag);
                        continue;
                    };
                    self.dispatch_report(report, &labels.runtime(tag), Some(tag), &mut summary);
                }
            }
            _ => {
                if reset::workload_absent(snapshot) {
                    reset::clear_transient_series(&self.registry);
                    summary.reset = true;
                }
            }
        }

        let base = labels.base();
        if let Some(system) = &snapshot.system_data {
            self.dispatch_report(system, &base, None, &mut summary);
        }

        if let Err(e) = record_instance_info(&self.registry, &base) {
            warn!("Failed to record instance info: {}", e);
        }
        if let Some(hardware) = &snapshot.neuron_hardware_info {
            if let Err(e) = record_hardware_info(&self.registry, hardware, &base) {
                warn!("Failed to record hardware info: {}", e);
            }
        }

        debug!(
            applied = summary.groups_applied,
            group_errors = summary.group_errors.len(),
            map_failures = summary.map_failures.len(),
            runtimes_skipped = summary.runtimes_skipped,
            reset = summary.reset,
            "Snapshot dispatched"
        );
        summary
    }

    fn dispatch_report(
        &self,
        report: &Report,
        labels: &LabelSet,
        runtime_tag: Option<&str>,
        summary: &mut DispatchSummary,
    ) {
        for (name, payload) in report {
            let Some(kind) = GroupKind::from_name(name) else {
                trace!(group = %name, "No mapper for group, ignoring");
                continue;
            };

            let group = match GroupData::from_value(payload) {
                Ok(group) => group,
                Err(e) => {
                    match runtime_tag {
                        Some(tag) => warn!("Malformed {} for runtime tag {}: {}", name, tag, e),
                        None => warn!("Malformed {}: {}", name, e),
                    }
                    summary.map_failures.push(name.clone());
                    continue;
                }
            };

            if !group.error.is_empty() {
                match runtime_tag {
                    Some(tag) => warn!("Error getting {} for runtime tag {}: {}", name, tag, group.error),
                    None => warn!("Error getting {}: {}", name, group.error),
                }
                summary.group_errors.push(name.clone());
                continue;
            }

            let scope = GroupScope::new(&self.registry, kind.name());
            match kind.mapper().map(&scope, &group, labels.clone()) {
                Ok(()) => summary.groups_applied += 1,
                Err(e) => {
                    match runtime_tag {
                        Some(tag) => warn!("Failed to map {} for runtime tag {}: {}", name, tag, e),
                        None => warn!("Failed to map {}: {}", name, e),
                    }
                    summary.map_failures.push(name.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample, series_count};

    fn dispatch(dispatcher: &mut Dispatcher, document: &str) -> DispatchSummary {
        let snapshot = Snapshot::from_json(document, "").unwrap();
        dispatcher.dispatch(&snapshot)
    }

    const INSTANCE: &str = r#""instance_info": {"instance_id": "i-1", "instance_type": "trn1.2xlarge"}"#;

    #[test]
    fn test_unknown_groups_are_ignored() {
        let mut dispatcher = Dispatcher::new(Arc::new(MetricRegistry::new()));
        let summary = dispatch(
            &mut dispatcher,
            &format!(
                r#"{{"system_data": {{"neuron_hw_power": {{"error": ""}},
                    "memory_info": {{"memory_total_bytes": 10, "error": ""}}}}, {INSTANCE}}}"#
            ),
        );

        assert_eq!(summary.groups_applied, 1);
        assert!(summary.group_errors.is_empty());
        assert!(summary.map_failures.is_empty());
    }

    #[test]
    fn test_runtime_error_skips_whole_report() {
        let registry = Arc::new(MetricRegistry::new());
        let mut dispatcher = Dispatcher::new(registry.clone());
        let summary = dispatch(
            &mut dispatcher,
            &format!(
                r#"{{"neuron_runtime_data": [
                    {{"neuron_runtime_tag": "9", "error": "runtime unreachable",
                      "report": {{"neuron_runtime_vcpu_usage": {{"vcpu_usage": {{"user": 1}}, "error": ""}}}}}},
                    {{"neuron_runtime_tag": "10", "error": "",
                      "report": {{"neuron_runtime_vcpu_usage": {{"vcpu_usage": {{"user": 50}}, "error": ""}}}}}}
                ], {INSTANCE}}}"#
            ),
        );

        assert_eq!(summary.runtimes_skipped, 1);
        assert_eq!(summary.groups_applied, 1);
        let text = registry.encode().unwrap();
        assert_eq!(series_count(&text, "neuron_runtime_vcpu_usage_ratio"), 2);
        assert_eq!(
            sample(&text, "neuron_runtime_vcpu_usage_ratio", &[("runtime_tag", "10"), ("usage_type", "user")]),
            Some(0.5)
        );
    }

    #[test]
    fn test_malformed_group_is_reported_and_siblings_apply() {
        let registry = Arc::new(MetricRegistry::new());
        let mut dispatcher = Dispatcher::new(registry.clone());
        let summary = dispatch(
            &mut dispatcher,
            &format!(
                r#"{{"system_data": {{
                    "vcpu_usage": {{"usage_data": "not a map", "error": ""}},
                    "memory_info": {{"memory_total_bytes": 10, "error": ""}}
                }}, {INSTANCE}}}"#
            ),
        );

        assert_eq!(summary.map_failures, vec!["vcpu_usage".to_string()]);
        assert_eq!(summary.groups_applied, 1);
        let text = registry.encode().unwrap();
        assert_eq!(sample(&text, "system_memory_total_bytes", &[]), Some(10.0));
        assert_eq!(series_count(&text, "system_vcpu_count"), 0);
    }

    #[test]
    fn test_instance_labels_fixed_by_first_snapshot() {
        let registry = Arc::new(MetricRegistry::new());
        let mut dispatcher = Dispatcher::new(registry.clone());
        dispatch(&mut dispatcher, &format!(r#"{{{INSTANCE}}}"#));
        dispatch(
            &mut dispatcher,
            r#"{"system_data": {"memory_info": {"memory_total_bytes": 1, "error": ""}},
                "instance_info": {"instance_id": "i-2"}}"#,
        );

        let text = registry.encode().unwrap();
        assert_eq!(sample(&text, "system_memory_total_bytes", &[("instance_id", "i-1")]), Some(1.0));
        assert_eq!(sample(&text, "instance_info", &[("instance_id", "i-1")]), Some(1.0));
    }

    #[test]
    fn test_unknown_group_with_non_object_payload_is_ignored() {
        let registry = Arc::new(MetricRegistry::new());
        let mut dispatcher = Dispatcher::new(registry.clone());
        let summary = dispatch(
            &mut dispatcher,
            &format!(
                r#"{{"system_data": {{
                    "neuron_hw_power": null,
                    "future_group": [1, 2, 3],
                    "memory_info": {{"memory_total_bytes": 10, "error": ""}}
                }}, {INSTANCE}}}"#
            ),
        );

        assert_eq!(summary.groups_applied, 1);
        assert!(summary.group_errors.is_empty());
        assert!(summary.map_failures.is_empty());
        let text = registry.encode().unwrap();
        assert_eq!(sample(&text, "system_memory_total_bytes", &[]), Some(10.0));
    }

    #[test]
    fn test_known_group_with_null_payload_is_a_map_failure() {
        let registry = Arc::new(MetricRegistry::new());
        let mut dispatcher = Dispatcher::new(registry.clone());
        let summary = dispatch(
            &mut dispatcher,
            &format!(
                r#"{{"system_data": {{
                    "vcpu_usage": null,
                    "memory_info": {{"memory_total_bytes": 10, "error": ""}}
                }}, {INSTANCE}}}"#
            ),
        );

        assert_eq!(summary.map_failures, vec!["vcpu_usage".to_string()]);
        assert_eq!(summary.groups_applied, 1);
    }

    #[test]
    fn test_errored_runtime_without_report_skips_only_itself() {
        let registry = Arc::new(MetricRegistry::new());
        let mut dispatcher = Dispatcher::new(registry.clone());
        let summary = dispatch(
            &mut dispatcher,
            &format!(
                r#"{{"neuron_runtime_data": [
                    {{"neuron_runtime_tag": "9", "error": "runtime unreachable", "report": null}},
                    {{"neuron_runtime_tag": "8", "error": "runtime unreachable"}},
                    {{"report": 42}},
                    {{"neuron_runtime_tag": "10", "error": "",
                      "report": {{"neuron_runtime_vcpu_usage": {{"vcpu_usage": {{"user": 50}}, "error": ""}}}}}}
                ],
                "system_data": {{"memory_info": {{"memory_total_bytes": 10, "error": ""}}}},
                {INSTANCE}}}"#
            ),
        );

        assert_eq!(summary.runtimes_skipped, 3);
        assert_eq!(summary.groups_applied, 2);
        let text = registry.encode().unwrap();
        assert_eq!(
            sample(&text, "neuron_runtime_vcpu_usage_ratio", &[("runtime_tag", "10"), ("usage_type", "user")]),
            Some(0.5)
        );
        assert_eq!(sample(&text, "system_memory_total_bytes", &[]), Some(10.0));
        assert_eq!(sample(&text, "instance_info", &[("instance_id", "i-1")]), Some(1.0));
    }
}
