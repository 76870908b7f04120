//! Live transport network monitor entry point.
//!
//! Connects to the event service over secure WebSockets, speaks STOMP 1.2,
//! subscribes to the passenger-event stream, and maintains per-station
//! occupancy counts in memory until stopped with Ctrl-C.
//!
//! # Usage
//!
//! ```text
//! ltnm-monitor [OPTIONS] --username <USERNAME> --password <PASSWORD>
//!
//! Options:
//!   --url <URL>                    Event service host [default: ltnm.example.com]
//!   --port <PORT>                  Event service TLS port [default: 443]
//!   --username <USERNAME>          STOMP login
//!   --password <PASSWORD>          STOMP passcode
//!   --cacert-file <PATH>           CA certificate [default: cacert.pem]
//!   --network-layout-file <PATH>   Local layout document; downloaded when omitted
//! ```
//!
//! # Environment variable overrides
//!
//! CLI arguments take precedence when both are present.
//!
//! | Variable                        | Overrides               |
//! |---------------------------------|-------------------------|
//! | `LTNM_SERVER_URL`               | `--url`                 |
//! | `LTNM_SERVER_PORT`              | `--port`                |
//! | `LTNM_USERNAME`                 | `--username`            |
//! | `LTNM_PASSWORD`                 | `--password`            |
//! | `LTNM_NETWORK_LAYOUT_FILE_PATH` | `--network-layout-file` |
//!
//! Log verbosity is controlled by `RUST_LOG` (e.g. `RUST_LOG=debug`).

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ltnm_monitor::{MonitorConfig, NetworkMonitor};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Live transport network monitor.
///
/// Streams passenger events from the event service and maintains an
/// in-memory view of per-station occupancy.
#[derive(Debug, Parser)]
#[command(name = "ltnm-monitor", version)]
struct Cli {
    /// Event service host, without scheme or port.
    #[arg(long, default_value = "ltnm.example.com", env = "LTNM_SERVER_URL")]
    url: String,

    /// Event service TLS port.
    #[arg(long, default_value_t = 443, env = "LTNM_SERVER_PORT")]
    port: u16,

    /// Login presented in the STOMP connection frame.
    #[arg(long, env = "LTNM_USERNAME")]
    username: String,

    /// Passcode presented in the STOMP connection frame.
    #[arg(long, env = "LTNM_PASSWORD")]
    password: String,

    /// CA certificate the server's certificate chains to.
    #[arg(long, default_value = "cacert.pem")]
    cacert_file: PathBuf,

    /// Local network-layout document. When omitted, the document is
    /// downloaded from the event service.
    #[arg(long, env = "LTNM_NETWORK_LAYOUT_FILE_PATH")]
    network_layout_file: Option<PathBuf>,
}

impl Cli {
    fn into_monitor_config(self) -> MonitorConfig {
        MonitorConfig {
            url: self.url,
            port: self.port,
            username: self.username,
            password: self.password,
            ca_cert_file: self.cacert_file,
            network_layout_file: self.network_layout_file,
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.into_monitor_config();
    info!(
        "live transport network monitor starting: server={}:{}",
        config.url, config.port
    );

    let mut monitor = NetworkMonitor::new();
    monitor
        .configure(config)
        .await
        .context("monitor configuration failed")?;

    // Ctrl-C cancels the run; the monitor preserves its last error so it
    // can be reported below.
    let stop = monitor.stop_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl-C; stopping the monitor");
                stop.stop();
            }
            Err(e) => error!("failed to listen for Ctrl-C: {e}"),
        }
    });

    monitor.run().await;

    match monitor.last_error() {
        None => {
            info!("live transport network monitor stopped");
            Ok(())
        }
        Some(e) => {
            error!("live transport network monitor stopped: {e}");
            Err(anyhow::anyhow!(e))
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut full = vec!["ltnm-monitor", "--username", "u", "--password", "p"];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    #[test]
    fn test_cli_default_url() {
        let cli = parse(&[]);
        assert_eq!(cli.url, "ltnm.example.com");
    }

    #[test]
    fn test_cli_default_port_is_443() {
        let cli = parse(&[]);
        assert_eq!(cli.port, 443);
    }

    #[test]
    fn test_cli_default_cacert_file() {
        let cli = parse(&[]);
        assert_eq!(cli.cacert_file, PathBuf::from("cacert.pem"));
    }

    #[test]
    fn test_cli_layout_file_defaults_to_download() {
        let cli = parse(&[]);
        assert!(cli.network_layout_file.is_none());
    }

    #[test]
    fn test_cli_url_override() {
        let cli = parse(&["--url", "other.example.org"]);
        assert_eq!(cli.url, "other.example.org");
    }

    #[test]
    fn test_cli_port_override() {
        let cli = parse(&["--port", "8443"]);
        assert_eq!(cli.port, 8443);
    }

    #[test]
    fn test_cli_layout_file_override() {
        let cli = parse(&["--network-layout-file", "/tmp/layout.json"]);
        assert_eq!(
            cli.network_layout_file,
            Some(PathBuf::from("/tmp/layout.json"))
        );
    }

    #[test]
    fn test_into_monitor_config_carries_credentials() {
        let config = parse(&[]).into_monitor_config();
        assert_eq!(config.username, "u");
        assert_eq!(config.password, "p");
        assert_eq!(config.port, 443);
    }
}
