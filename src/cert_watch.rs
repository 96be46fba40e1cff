//! TLS credential hot-swapping.
//!
//! The watcher compares SHA-256 digests of the certificate and key files on
//! every poll. When either changed it rebuilds the server's TLS context from
//! the bytes it just hashed. The live context is an atomically swappable
//! handle: connections already accepted keep the old context, connections
//! accepted afterwards get the new one.

use axum_server::tls_rustls::RustlsConfig;
use sha2::{Digest, Sha256};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Transport selected by the optional certificate/key pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsMode {
    /// Neither path given: plain HTTP.
    Disabled,
    /// Both paths given: HTTPS with hot reload.
    Enabled { cert: PathBuf, key: PathBuf },
    /// Exactly one path given. Rejected before the exporter starts.
    Misconfigured,
}

impl TlsMode {
    pub fn from_paths(cert: Option<PathBuf>, key: Option<PathBuf>) -> Self {
        match (cert, key) {
            (None, None) => TlsMode::Disabled,
            (Some(cert), Some(key)) => TlsMode::Enabled { cert, key },
            _ => TlsMode::Misconfigured,
        }
    }
}

/// Something holding a live TLS context that can be rebuilt in place.
pub trait TlsReload {
    fn reload(&self, cert_pem: Vec<u8>, key_pem: Vec<u8>) -> impl Future<Output = io::Result<()>> + Send;
}

impl TlsReload for RustlsConfig {
    fn reload(&self, cert_pem: Vec<u8>, key_pem: Vec<u8>) -> impl Future<Output = io::Result<()>> + Send {
        let config = self.clone();
        async move { config.reload_from_pem(cert_pem, key_pem).await }
    }
}

/// Errors raised by a watch check. None of them stop the poll loop.
#[derive(Debug, Error)]
pub enum CertWatchError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to rebuild TLS context: {0}")]
    Reload(#[source] io::Error),
}

/// Outcome of one watch check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Files unchanged since the last check.
    Idle,
    /// Files changed and the context was rebuilt.
    Changed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Fingerprint {
    cert: String,
    key: String,
}

/// Polling watcher over one certificate/key pair.
pub struct CertWatch<R> {
    cert_path: PathBuf,
    key_path: PathBuf,
    reloader: R,
    last: Option<Fingerprint>,
}

impl<R: TlsReload> CertWatch<R> {
    /// Creates a watcher whose baseline is the current content of both
    /// files, i.e. the pair the server was started with.
    ///
    /// If the files cannot be read now, the first successful check rebuilds
    /// the context.
    pub fn new(cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>, reloader: R) -> Self {
        let cert_path = cert_path.into();
        let key_path = key_path.into();
        let last = read_pair(&cert_path, &key_path)
            .ok()
            .map(|(fingerprint, _, _)| fingerprint);

        Self {
            cert_path,
            key_path,
            reloader,
            last,
        }
    }

    /// Rebuilds the TLS context if either file's content changed.
    ///
    /// The remembered digests only move forward after a successful rebuild,
    /// so a pair that fails to load is retried on the next check.
    pub async fn check(&mut self) -> Result<WatchState, CertWatchError> {
        let (current, cert_pem, key_pem) = read_pair(&self.cert_path, &self.key_path)?;
        if self.last.as_ref() == Some(&current) {
            debug!("TLS certificate and key unchanged");
            return Ok(WatchState::Idle);
        }

        self.reloader
            .reload(cert_pem, key_pem)
            .await
            .map_err(CertWatchError::Reload)?;

        info!(
            cert = %self.cert_path.display(),
            key = %self.key_path.display(),
            "Refreshing TLS certificates"
        );
        self.last = Some(current);
        Ok(WatchState::Changed)
    }
}

fn read_pair(cert_path: &Path, key_path: &Path) -> Result<(Fingerprint, Vec<u8>, Vec<u8>), CertWatchError> {
    let cert_pem = read_file(cert_path)?;
    let key_pem = read_file(key_path)?;
    let fingerprint = Fingerprint {
        cert: digest(&cert_pem),
        key: digest(&key_pem),
    };
    Ok((fingerprint, cert_pem, key_pem))
}

fn read_file(path: &Path) -> Result<Vec<u8>, CertWatchError> {
    std::fs::read(path).map_err(|source| CertWatchError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn digest(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
