//! Application state management for the exporter.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers. The poll loop owns the write side of the registry;
//! handlers only read from it.

use neuron_monitor_exporter::{ExporterMetrics, MetricRegistry};
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Global application state shared across requests.
pub struct AppState {
    pub registry: Arc<MetricRegistry>,
    pub telemetry: ExporterMetrics,
    pub config: Arc<Config>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}
