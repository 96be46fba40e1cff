//! Metric registry keyed by group and metric name.
//!
//! Handles are created lazily the first time a mapper asks for them and keep
//! their name, kind and label keys for the lifetime of the process. Only the
//! label values of their series change between polls. The underlying
//! Prometheus vecs synchronise each family internally, so the poll loop and
//! concurrent scrapes never wait on each other for longer than a single
//! series update.

use ahash::AHashMap as HashMap;
use dashmap::DashMap;
use prometheus::{CounterVec, Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::labels::LabelSet;

/// Errors raised by the metric registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to register metric {name}: {source}")]
    Register {
        name: String,
        #[source]
        source: prometheus::Error,
    },

    #[error("metric {name} requires label '{label}'")]
    MissingLabel { name: String, label: String },

    #[error("failed to resolve series of {name}: {source}")]
    Series {
        name: String,
        #[source]
        source: prometheus::Error,
    },

    #[error("failed to encode metrics: {0}")]
    Encode(#[source] prometheus::Error),
}

/// Kind of a metric handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Absolute value, overwritten on each update.
    Gauge,
    /// Cumulative value, incremented by a per-cycle delta.
    Counter,
    /// Static facts carried as labels, written at most once.
    Info,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Gauge => write!(f, "gauge"),
            MetricKind::Counter => write!(f, "counter"),
            MetricKind::Info => write!(f, "info"),
        }
    }
}

#[derive(Clone)]
enum Family {
    Gauge(GaugeVec),
    Counter(CounterVec),
}

/// Persistent handle to one metric family.
#[derive(Clone)]
pub struct MetricHandle {
    name: Arc<str>,
    kind: MetricKind,
    label_keys: Arc<[String]>,
    family: Family,
    info_written: Arc<AtomicBool>,
}

impl fmt::Debug for MetricHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricHandle")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("label_keys", &self.label_keys)
            .finish()
    }
}

impl MetricHandle {
    fn new(
        name: &str,
        kind: MetricKind,
        label_keys: &[&str],
        help: &str,
    ) -> Result<Self, prometheus::Error> {
        let opts = Opts::new(name, help);
        let family = match kind {
            MetricKind::Gauge | MetricKind::Info => Family::Gauge(GaugeVec::new(opts, label_keys)?),
            MetricKind::Counter => Family::Counter(CounterVec::new(opts, label_keys)?),
        };

        Ok(Self {
            name: Arc::from(name),
            kind,
            label_keys: label_keys.iter().map(|k| k.to_string()).collect(),
            family,
            info_written: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn label_keys(&self) -> &[String] {
        &self.label_keys
    }

    /// Records `value` for the series identified by `labels`.
    ///
    /// Gauges are overwritten, counters grow by `value` starting from zero,
    /// info metrics are written once with value 1 and ignored afterwards.
    /// Labels not in the handle's key set are ignored.
    pub fn record(&self, labels: &LabelSet, value: f64) -> Result<(), RegistryError> {
        let values = self.label_values(labels)?;

        match (&self.family, self.kind) {
            (Family::Gauge(vec), MetricKind::Info) => {
                if self.info_written.swap(true, Ordering::AcqRel) {
                    return Ok(());
                }
                self.gauge_series(vec, &values)?.set(1.0);
            }
            (Family::Gauge(vec), _) => {
                self.gauge_series(vec, &values)?.set(value);
            }
            (Family::Counter(vec), _) => {
                let series = vec
                    .get_metric_with_label_values(values.as_slice())
                    .map_err(|source| self.series_error(source))?;
                if value.is_finite() && value >= 0.0 {
                    series.inc_by(value);
                } else {
                    warn!(metric = %self.name, value, "Ignoring invalid counter increment");
                }
            }
        }
        Ok(())
    }

    /// Drops every series of this family. Name, kind and label keys stay.
    pub(crate) fn clear(&self) {
        match &self.family {
            Family::Gauge(vec) => vec.reset(),
            Family::Counter(vec) => vec.reset(),
        }
    }

    fn collector(&self) -> Box<dyn prometheus::core::Collector> {
        match &self.family {
            Family::Gauge(vec) => Box::new(vec.clone()),
            Family::Counter(vec) => Box::new(vec.clone()),
        }
    }

    fn label_values<'a>(&self, labels: &'a LabelSet) -> Result<Vec<&'a str>, RegistryError> {
        self.label_keys
            .iter()
            .map(|key| {
                labels.get(key).ok_or_else(|| RegistryError::MissingLabel {
                    name: self.name.to_string(),
                    label: key.clone(),
                })
            })
            .collect()
    }

    fn gauge_series(
        &self,
        vec: &GaugeVec,
        values: &[&str],
    ) -> Result<prometheus::Gauge, RegistryError> {
        vec.get_metric_with_label_values(values)
            .map_err(|source| self.series_error(source))
    }

    fn series_error(&self, source: prometheus::Error) -> RegistryError {
        RegistryError::Series {
            name: self.name.to_string(),
            source,
        }
    }
}

/// Registry of metric handles, grouped by the metric group that owns them.
pub struct MetricRegistry {
    registry: Registry,
    groups: DashMap<String, HashMap<String, MetricHandle>>,
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::with_registry(Registry::new())
    }

    /// Wraps an existing Prometheus registry, e.g. one that already carries
    /// the exporter's own telemetry.
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry,
            groups: DashMap::new(),
        }
    }

    /// The underlying Prometheus registry scrapes are served from.
    pub fn prometheus(&self) -> &Registry {
        &self.registry
    }

    /// Returns the handle for `(group, name)`, creating it on first use.
    ///
    /// Later calls return the existing handle and ignore `kind`, `label_keys`
    /// and `help`.
    pub fn get_or_create(
        &self,
        group: &str,
        name: &str,
        kind: MetricKind,
        label_keys: &[&str],
        help: &str,
    ) -> Result<MetricHandle, RegistryError> {
        let mut metrics = self.groups.entry(group.to_string()).or_default();
        if let Some(handle) = metrics.get(name) {
            if handle.kind != kind {
                debug!(group, metric = name, existing = %handle.kind, requested = %kind, "Metric kind mismatch ignored");
            }
            return Ok(handle.clone());
        }

        let register_error = |source| RegistryError::Register {
            name: name.to_string(),
            source,
        };
        let handle = MetricHandle::new(name, kind, label_keys, help).map_err(register_error)?;
        self.registry
            .register(handle.collector())
            .map_err(register_error)?;

        debug!(group, metric = name, kind = %kind, "Registered metric");
        metrics.insert(name.to_string(), handle.clone());
        Ok(handle)
    }

    /// Looks up an existing handle without creating it.
    pub fn handle(&self, group: &str, name: &str) -> Option<MetricHandle> {
        self.groups
            .get(group)
            .and_then(|metrics| metrics.get(name).cloned())
    }

    /// Number of registered metric families across all groups.
    pub fn family_count(&self) -> usize {
        self.groups.iter().map(|entry| entry.value().len()).sum()
    }

    /// Clears every gauge and counter series. Info metrics are untouched.
    ///
    /// Returns the number of families cleared.
    pub fn clear_series(&self) -> usize {
        let mut cleared = 0;
        for entry in self.groups.iter() {
            for handle in entry.value().values() {
                if handle.kind != MetricKind::Info {
                    handle.clear();
                    cleared += 1;
                }
            }
        }
        cleared
    }

    /// Renders the registry in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, RegistryError> {
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buffer)
            .map_err(RegistryError::Encode)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
