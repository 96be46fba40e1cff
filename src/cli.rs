//! CLI arguments for neuron-monitor-exporter.
//!
//! Every flag is optional so that unset flags fall through to the config
//! file and then to the built-in defaults.

use clap::{Parser, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Configuration format options for output
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "neuron-monitor-exporter",
    about = "Prometheus exporter for AWS Neuron accelerator telemetry",
    long_about = "Prometheus exporter for AWS Neuron accelerator telemetry.\n\n\
                  Polls the JSON report written by neuron-monitor and exposes NeuronCore \
                  utilization, runtime memory, execution statistics, ECC events and host \
                  CPU/memory usage as Prometheus metrics over HTTP or HTTPS.",
    version,
    propagate_version = true
)]
pub struct Args {
    /// HTTP listen port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// TLS certificate file (PEM). Requires --key-file
    #[arg(long)]
    pub cert_file: Option<PathBuf>,

    /// TLS private key file (PEM). Requires --cert-file
    #[arg(long)]
    pub key_file: Option<PathBuf>,

    /// neuron-monitor JSON output file
    #[arg(long)]
    pub snapshot_path: Option<PathBuf>,

    /// Top-level key the report is nested under ("" for the whole document)
    #[arg(long)]
    pub snapshot_key: Option<String>,

    /// Seconds between two polls
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// Log level
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_default_to_unset() {
        let args = Args::try_parse_from(["neuron-monitor-exporter"]).unwrap();
        assert!(args.port.is_none());
        assert!(args.cert_file.is_none());
        assert!(args.log_level.is_none());
        assert!(!args.check_config);
    }

    #[test]
    fn test_parse_tls_and_poll_flags() {
        let args = Args::try_parse_from([
            "neuron-monitor-exporter",
            "-p",
            "9000",
            "--cert-file",
            "/etc/ssl/server.crt",
            "--key-file",
            "/etc/ssl/server.key",
            "--poll-interval",
            "10",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(args.port, Some(9000));
        assert_eq!(args.cert_file, Some(PathBuf::from("/etc/ssl/server.crt")));
        assert_eq!(args.key_file, Some(PathBuf::from("/etc/ssl/server.key")));
        assert_eq!(args.poll_interval, Some(10));
        assert_eq!(args.log_level, Some(LogLevel::Debug));
    }
}
