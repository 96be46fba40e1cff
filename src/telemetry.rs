//! The exporter's own metrics.
//!
//! Registered directly on the Prometheus registry, outside the group map,
//! so workload resets never touch them.

use prometheus::{Counter, CounterVec, Gauge, Opts, Registry};

use crate::dispatcher::DispatchSummary;

#[derive(Clone)]
pub struct ExporterMetrics {
    pub polls_total: Counter,
    pub snapshot_errors_total: Counter,
    pub group_errors_total: CounterVec, // labels: group
    pub resets_total: Counter,
    pub tls_reloads_total: Counter,
    pub tls_reload_errors_total: Counter,
    pub poll_duration_seconds: Gauge,
    pub last_poll_success: Gauge,
}

impl ExporterMetrics {
    /// Creates and registers all exporter metrics with the registry.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let polls_total = Counter::new(
            "neuron_exporter_polls_total",
            "Number of poll cycles run",
        )?;
        let snapshot_errors_total = Counter::new(
            "neuron_exporter_snapshot_errors_total",
            "Poll cycles skipped because the snapshot could not be read or decoded",
        )?;
        let group_errors_total = CounterVec::new(
            Opts::new(
                "neuron_exporter_group_errors_total",
                "Metric groups skipped because of a reported or mapping error",
            ),
            &["group"],
        )?;
        let resets_total = Counter::new(
            "neuron_exporter_resets_total",
            "Times runtime series were cleared because no runtime was running",
        )?;
        let tls_reloads_total = Counter::new(
            "neuron_exporter_tls_reloads_total",
            "TLS context rebuilds after certificate or key changes",
        )?;
        let tls_reload_errors_total = Counter::new(
            "neuron_exporter_tls_reload_errors_total",
            "Failed TLS certificate checks or rebuilds",
        )?;
        let poll_duration_seconds = Gauge::new(
            "neuron_exporter_poll_duration_seconds",
            "Time spent in the last poll cycle",
        )?;
        let last_poll_success = Gauge::new(
            "neuron_exporter_last_poll_success",
            "Whether the last poll read a snapshot (1) or not (0)",
        )?;

        registry.register(Box::new(polls_total.clone()))?;
        registry.register(Box::new(snapshot_errors_total.clone()))?;
        registry.register(Box::new(group_errors_total.clone()))?;
        registry.register(Box::new(resets_total.clone()))?;
        registry.register(Box::new(tls_reloads_total.clone()))?;
        registry.register(Box::new(tls_reload_errors_total.clone()))?;
        registry.register(Box::new(poll_duration_seconds.clone()))?;
        registry.register(Box::new(last_poll_success.clone()))?;

        Ok(Self {
            polls_total,
            snapshot_errors_total,
            group_errors_total,
            resets_total,
            tls_reloads_total,
            tls_reload_errors_total,
            poll_duration_seconds,
            last_poll_success,
        })
    }

    pub fn observe_dispatch(&self, summary: &DispatchSummary) {
        for group in summary.group_errors.iter().chain(&summary.map_failures) {
            self.group_errors_total.with_label_values(&[group.as_str()]).inc();
        }
        if summary.reset {
            self.resets_total.inc();
        }
    }
}
