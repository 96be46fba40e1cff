//! Configuration management for neuron-monitor-exporter.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use crate::cli::{Args, ConfigFormat};
use anyhow::{anyhow, bail, Context, Result};
use neuron_monitor_exporter::snapshot::{DEFAULT_SNAPSHOT_KEY, DEFAULT_SNAPSHOT_PATH};
use neuron_monitor_exporter::{TlsMode, DEFAULT_POLL_INTERVAL};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_LOG_LEVEL: &str = "info";

const DEFAULT_CONFIG_LOCATIONS: [&str; 3] = [
    "/etc/neuron-monitor-exporter/config.yaml",
    "./neuron-monitor-exporter.yaml",
    "./neuron-monitor-exporter.json",
];

/// Effective exporter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,

    // Snapshot source
    #[serde(alias = "snapshot-path")]
    pub snapshot_path: Option<PathBuf>,
    #[serde(alias = "snapshot-key")]
    pub snapshot_key: Option<String>,
    #[serde(alias = "poll-interval-secs")]
    pub poll_interval_secs: Option<u64>,

    // Logging
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,

    // TLS/SSL Configuration
    #[serde(alias = "tls-cert-path")]
    pub tls_cert_path: Option<PathBuf>,
    #[serde(alias = "tls-key-path")]
    pub tls_key_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: Some(DEFAULT_PORT),
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            snapshot_path: Some(PathBuf::from(DEFAULT_SNAPSHOT_PATH)),
            snapshot_key: Some(DEFAULT_SNAPSHOT_KEY.to_string()),
            poll_interval_secs: Some(DEFAULT_POLL_INTERVAL.as_secs()),
            log_level: Some(DEFAULT_LOG_LEVEL.to_string()),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl Config {
    pub fn tls_mode(&self) -> TlsMode {
        TlsMode::from_paths(self.tls_cert_path.clone(), self.tls_key_path.clone())
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.snapshot_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_PATH))
    }

    pub fn snapshot_key(&self) -> &str {
        self.snapshot_key.as_deref().unwrap_or(DEFAULT_SNAPSHOT_KEY)
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let bind = self.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        let port = self.port.unwrap_or(DEFAULT_PORT);
        format!("{}:{}", bind, port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", bind, port))
    }

    pub fn log_filter(&self) -> Result<LevelFilter> {
        let level = self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL);
        level
            .parse()
            .map_err(|_| anyhow!("Invalid log_level '{}'", level))
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<()> {
    if cfg.poll_interval_secs == Some(0) {
        bail!("poll_interval_secs must be greater than 0");
    }

    cfg.log_filter()?;
    cfg.listen_addr()?;

    match cfg.tls_mode() {
        TlsMode::Disabled => {}
        TlsMode::Misconfigured => {
            bail!("both --cert-file and --key-file must be provided to enable HTTPS");
        }
        TlsMode::Enabled { cert, key } => {
            check_pem_file(&cert, "TLS certificate")?;
            check_pem_file(&key, "TLS private key")?;
        }
    }

    Ok(())
}

fn check_pem_file(path: &Path, what: &str) -> Result<()> {
    if !path.exists() {
        bail!("{} file not found: {}", what, path.display());
    }
    match fs::metadata(path) {
        Ok(meta) if meta.len() == 0 => bail!("{} file is empty: {}", what, path.display()),
        Err(e) => bail!("{} file is not readable: {} ({})", what, path.display(), e),
        Ok(_) => Ok(()),
    }
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }
    if let Some(port) = args.port {
        config.port = Some(port);
    }
    if let Some(path) = &args.snapshot_path {
        config.snapshot_path = Some(path.clone());
    }
    if let Some(key) = &args.snapshot_key {
        config.snapshot_key = Some(key.clone());
    }
    if let Some(secs) = args.poll_interval {
        config.poll_interval_secs = Some(secs);
    }
    if let Some(level) = args.log_level {
        config.log_level = Some(level.as_str().to_string());
    }

    // TLS configuration: CLI wins if provided
    if let Some(cert) = &args.cert_file {
        config.tls_cert_path = Some(cert.clone());
    }
    if let Some(key) = &args.key_file {
        config.tls_key_path = Some(key.clone());
    }

    Ok(config)
}

/// Loads the config file, falling back to defaults when none exists.
///
/// Fields missing from the file keep their default values.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match DEFAULT_CONFIG_LOCATIONS.iter().find(|p| Path::new(p).exists()) {
            Some(p) => PathBuf::from(p),
            None => return Ok(Config::default()),
        },
    };

    if !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let loaded: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content)?,
        Some("toml") => toml::from_str(&content)?,
        // Default to YAML
        _ => serde_yaml::from_str(&content)?,
    };
    info!("Loaded configuration from: {}", path.display());

    Ok(merge_defaults(loaded))
}

fn merge_defaults(loaded: Config) -> Config {
    let defaults = Config::default();
    Config {
        port: loaded.port.or(defaults.port),
        bind: loaded.bind.or(defaults.bind),
        snapshot_path: loaded.snapshot_path.or(defaults.snapshot_path),
        snapshot_key: loaded.snapshot_key.or(defaults.snapshot_key),
        poll_interval_secs: loaded.poll_interval_secs.or(defaults.poll_interval_secs),
        log_level: loaded.log_level.or(defaults.log_level),
        tls_cert_path: loaded.tls_cert_path,
        tls_key_path: loaded.tls_key_path,
    }
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<()> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };

    println!("{output}");
    Ok(())
}
