//! `execution_stats`: execution error/status counters and latency percentiles.

use serde::Deserialize;
use std::collections::BTreeMap;

use super::{GroupMapper, GroupScope, MapError, ERROR_TYPE, PERCENTILE, STATUS_TYPE};
use crate::labels::LabelSet;
use crate::snapshot::GroupData;

#[derive(Debug, Deserialize)]
struct ExecutionStats {
    #[serde(default)]
    error_summary: BTreeMap<String, f64>,
    #[serde(default)]
    execution_summary: BTreeMap<String, f64>,
    #[serde(default)]
    latency_stats: LatencyStats,
}

#[derive(Debug, Default, Deserialize)]
struct LatencyStats {
    #[serde(default)]
    total_latency: Option<BTreeMap<String, Option<f64>>>,
}

pub struct ExecutionStatsMapper;

impl GroupMapper for ExecutionStatsMapper {
    fn map(&self, scope: &GroupScope<'_>, data: &GroupData, labels: LabelSet) -> Result<(), MapError> {
        let stats: ExecutionStats = data.decode()?;

        let errors = scope.counter(
            "execution_errors_total",
            "Execution errors total",
            &labels,
            &[ERROR_TYPE],
        )?;
        for (error_type, count) in &stats.error_summary {
            errors.record(&labels.with(ERROR_TYPE, error_type), *count)?;
        }

        let status = scope.counter(
            "execution_status_total",
            "Execution status total",
            &labels,
            &[STATUS_TYPE],
        )?;
        for (status_type, count) in &stats.execution_summary {
            status.record(&labels.with(STATUS_TYPE, status_type), *count)?;
        }

        let Some(total_latency) = &stats.latency_stats.total_latency else {
            return Ok(());
        };
        let latency = scope.gauge(
            "execution_latency_seconds",
            "Execution latency in seconds",
            &labels,
            &[PERCENTILE],
        )?;
        for (percentile, seconds) in total_latency {
            if let Some(seconds) = seconds {
                latency.record(&labels.with(PERCENTILE, percentile), *seconds)?;
            }
        }
        Ok(())
    }
}
