//! Command-line configuration

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

/// Errors in command-line values
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Listen address could not be parsed or resolved
    #[error("invalid listen address {0:?}")]
    InvalidListenAddr(String),

    /// Metric namespace contains characters Prometheus doesn't allow
    #[error("invalid metric namespace {0:?}: use letters, digits and underscores")]
    InvalidNamespace(String),
}

#[derive(Parser, Debug)]
#[command(name = "jarvis-exporter")]
#[command(version)]
#[command(
    about = "Exports Jarvis desk height and preset events read from the handset bus as Prometheus metrics.",
    long_about = None,
    after_help = "Examples:\n  jarvis-exporter --serialport /dev/ttyUSB0\n  jarvis-exporter --addr 127.0.0.1:9833 --replay capture.bin"
)]
pub struct Cli {
    /// Address to listen on for /metrics (host may be omitted, e.g. ":9833")
    #[arg(long, default_value = ":9833", value_parser = parse_listen_addr)]
    pub addr: SocketAddr,

    /// Serial port connected to the desk bus
    #[arg(long, default_value = "/dev/ttyUSB0")]
    pub serialport: String,

    /// Serial baud rate
    #[arg(long, default_value_t = 9600)]
    pub baud: u32,

    /// Prefix for all exported metric names
    #[arg(long, default_value = "jarvis", value_parser = parse_namespace)]
    pub namespace: String,

    /// Delay before reopening the serial port after a read error
    #[arg(long, default_value_t = 1000)]
    pub reconnect_delay_ms: u64,

    /// Decode a captured byte file instead of reading the serial port, then exit
    #[arg(long, value_name = "FILE")]
    pub replay: Option<PathBuf>,
}

/// Where frames are read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    /// A serial port, reopened after read errors
    Serial {
        path: String,
        baud_rate: u32,
        reconnect_delay: Duration,
    },
    /// A file of raw bus bytes, decoded once
    Replay(PathBuf),
}

/// Resolved exporter configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExporterConfig {
    /// Address for the metrics endpoint
    pub listen_addr: SocketAddr,
    /// Metric name prefix
    pub namespace: String,
    /// Frame source
    pub source: SourceConfig,
}

impl From<Cli> for ExporterConfig {
    fn from(cli: Cli) -> Self {
        let source = match cli.replay {
            Some(path) => SourceConfig::Replay(path),
            None => SourceConfig::Serial {
                path: cli.serialport,
                baud_rate: cli.baud,
                reconnect_delay: Duration::from_millis(cli.reconnect_delay_ms),
            },
        };

        Self {
            listen_addr: cli.addr,
            namespace: cli.namespace,
            source,
        }
    }
}

/// Parse a listen address, accepting Go-style ":port" for all interfaces
pub fn parse_listen_addr(value: &str) -> Result<SocketAddr, ConfigError> {
    let full = if value.starts_with(':') {
        format!("0.0.0.0{value}")
    } else {
        value.to_string()
    };

    full.to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .ok_or_else(|| ConfigError::InvalidListenAddr(value.to_string()))
}

fn parse_namespace(value: &str) -> Result<String, ConfigError> {
    let valid = value
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(value.to_string())
    } else {
        Err(ConfigError::InvalidNamespace(value.to_string()))
    }
}
