//! The poll loop.
//!
//! Each iteration checks the TLS credentials, reads a fresh snapshot and
//! dispatches it, then sleeps for the configured interval. Shutdown is only
//! observed while sleeping, so an iteration is never interrupted halfway
//! through a registry update.

use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

use crate::cert_watch::{CertWatch, TlsReload, WatchState};
use crate::dispatcher::{DispatchSummary, Dispatcher};
use crate::snapshot::SnapshotSource;
use crate::telemetry::ExporterMetrics;

/// Default pause between two polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Result of one poll iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Dispatched(DispatchSummary),
    SnapshotUnavailable,
}

pub struct Poller<S, R> {
    source: S,
    dispatcher: Dispatcher,
    cert_watch: Option<CertWatch<R>>,
    telemetry: ExporterMetrics,
    interval: Duration,
}

impl<S, R> Poller<S, R>
where
    S: SnapshotSource,
    R: TlsReload,
{
    pub fn new(source: S, dispatcher: Dispatcher, telemetry: ExporterMetrics, interval: Duration) -> Self {
        Self {
            source,
            dispatcher,
            cert_watch: None,
            telemetry,
            interval,
        }
    }

    /// Enables certificate rotation checks at the start of every iteration.
    pub fn with_cert_watch(mut self, cert_watch: CertWatch<R>) -> Self {
        self.cert_watch = Some(cert_watch);
        self
    }

    /// Runs one iteration: cert check, snapshot read, dispatch.
    #[instrument(skip(self))]
    pub async fn poll_once(&mut self) -> PollOutcome {
        let start = Instant::now();
        self.telemetry.polls_total.inc();

        if let Some(watch) = self.cert_watch.as_mut() {
            match watch.check().await {
                Ok(WatchState::Changed) => self.telemetry.tls_reloads_total.inc(),
                Ok(WatchState::Idle) => {}
                Err(e) => {
                    error!("TLS certificate check failed: {}", e);
                    self.telemetry.tls_reload_errors_total.inc();
                }
            }
        }

        let outcome = match self.source.read() {
            Ok(snapshot) => {
                let summary = self.dispatcher.dispatch(&snapshot);
                self.telemetry.observe_dispatch(&summary);
                self.telemetry.last_poll_success.set(1.0);
                PollOutcome::Dispatched(summary)
            }
            Err(e) => {
                warn!("Skipping poll, snapshot unavailable: {}", e);
                self.telemetry.snapshot_errors_total.inc();
                self.telemetry.last_poll_success.set(0.0);
                PollOutcome::SnapshotUnavailable
            }
        };

        let elapsed = start.elapsed();
        self.telemetry.poll_duration_seconds.set(elapsed.as_secs_f64());
        debug!("Poll completed in {:.3}ms", elapsed.as_secs_f64() * 1000.0);
        outcome
    }

    /// Polls until `shutdown` resolves.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!("Poll loop started, interval {:?}", self.interval);
        tokio::pin!(shutdown);

        loop {
            self.poll_once().await;

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("Poll loop stopped");
    }
}
