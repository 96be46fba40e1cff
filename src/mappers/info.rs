//! Static instance and hardware identity, exposed as info metrics.
//!
//! Both are written once per process lifetime; later snapshots, identical
//! or not, leave them untouched.

use tracing::warn;

use super::{GroupScope, MapError};
use crate::labels::LabelSet;
use crate::registry::MetricRegistry;
use crate::snapshot::HardwareInfo;

pub const INSTANCE_INFO: &str = "instance_info";
pub const HARDWARE_INFO: &str = "neuron_hardware_info";

/// Records the instance identity labels.
pub fn record_instance_info(registry: &MetricRegistry, labels: &LabelSet) -> Result<(), MapError> {
    GroupScope::new(registry, INSTANCE_INFO)
        .info(INSTANCE_INFO, "EC2 instance information", labels)?
        .record(labels, 1.0)?;
    Ok(())
}

/// Records hardware identity merged with the instance labels.
pub fn record_hardware_info(
    registry: &MetricRegistry,
    hardware: &HardwareInfo,
    labels: &LabelSet,
) -> Result<(), MapError> {
    if !hardware.error.is_empty() {
        warn!("Error getting {}: {}", HARDWARE_INFO, hardware.error);
        return Ok(());
    }

    let labels = labels
        .with("neuron_device_count", hardware.neuron_device_count)
        .with("neuroncore_per_device_count", hardware.neuroncore_per_device_count);
    GroupScope::new(registry, HARDWARE_INFO)
        .info(HARDWARE_INFO, "Neuron Hardware Information", &labels)?
        .record(&labels, 1.0)?;
    Ok(())
}
