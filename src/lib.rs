//! Neuron Monitor Exporter Library
//!
//! Turns the periodic JSON reports written by neuron-monitor into Prometheus
//! metrics. The library is framework-agnostic: it owns the metric registry
//! and the poll loop, and leaves serving `/metrics` to the binary.
//!
//! # Features
//!
//! - **Typed snapshots**: Each report is decoded into a [`snapshot::Snapshot`]
//! - **Group mappers**: One mapper per metric group translates payloads into series
//! - **Stable label sets**: Every family keeps the label keys of its first write
//! - **Workload resets**: Runtime series disappear when no runtime is running
//! - **TLS hot swap**: Rotated certificates are picked up without a restart
//!
//! # Usage
//!
//! ```rust
//! use neuron_monitor_exporter::{Dispatcher, MetricRegistry, Snapshot};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(MetricRegistry::new());
//! let mut dispatcher = Dispatcher::new(registry.clone());
//!
//! let snapshot = Snapshot::from_json(
//!     r#"{"system_data": {"memory_info": {"memory_total_bytes": 1024, "error": ""}},
//!         "instance_info": {"instance_id": "i-0123"}}"#,
//!     "",
//! )
//! .unwrap();
//! dispatcher.dispatch(&snapshot);
//!
//! let text = registry.encode().unwrap();
//! assert!(text.contains("system_memory_total_bytes"));
//! ```

pub mod cert_watch;
pub mod dispatcher;
pub mod labels;
pub mod mappers;
pub mod poller;
pub mod registry;
pub mod reset;
pub mod snapshot;
pub mod telemetry;

#[cfg(test)]
mod test_support;

// Re-export main types for convenience
pub use cert_watch::{CertWatch, CertWatchError, TlsMode, TlsReload, WatchState};
pub use dispatcher::{DispatchSummary, Dispatcher};
pub use labels::{LabelBuilder, LabelSet};
pub use poller::{PollOutcome, Poller, DEFAULT_POLL_INTERVAL};
pub use registry::{MetricHandle, MetricKind, MetricRegistry, RegistryError};
pub use snapshot::{FileSnapshotSource, Snapshot, SnapshotError, SnapshotSource};
pub use telemetry::ExporterMetrics;
