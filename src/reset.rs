//! Clearing of transient series when the monitored workload disappears.

use tracing::info;

use crate::registry::MetricRegistry;
use crate::snapshot::Snapshot;

/// True when the snapshot carries a runtime list and that list is empty.
///
/// An absent or null runtime list says nothing about the workload and does
/// not trigger a reset.
pub fn workload_absent(snapshot: &Snapshot) -> bool {
    snapshot
        .neuron_runtime_data
        .as_ref()
        .is_some_and(|runtimes| runtimes.is_empty())
}

/// Clears every gauge and counter series so they read as absent, keeping the
/// families registered for reuse. Returns the number of families cleared.
pub fn clear_transient_series(registry: &MetricRegistry) -> usize {
    let cleared = registry.clear_series();
    if cleared > 0 {
        info!(families = cleared, "No neuron runtime running, cleared runtime series");
    }
    cleared
}
