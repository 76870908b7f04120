//! Monitor configuration.
//!
//! [`MonitorConfig`] is a plain struct with no environment reads of its
//! own; the CLI layer in `main.rs` populates it from arguments and `LTNM_*`
//! environment variables. Keeping the struct inert makes the monitor easy
//! to embed in tests.

use std::path::PathBuf;

/// All inputs the monitor needs to come up.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Server URL without scheme or port, e.g. `ltnm.example.com`. Used
    /// both to dial the WebSocket and as the `host` header of the STOMP
    /// connection frame.
    pub url: String,

    /// Server TLS port.
    pub port: u16,

    /// Login presented in the STOMP connection frame.
    pub username: String,

    /// Passcode presented in the STOMP connection frame.
    pub password: String,

    /// Path to the CA certificate the server's certificate chains to.
    pub ca_cert_file: PathBuf,

    /// Path to a local network-layout document. When `None`, the document
    /// is downloaded from the server during configuration.
    pub network_layout_file: Option<PathBuf>,
}

impl MonitorConfig {
    /// A configuration suitable for tests against the mock transport:
    /// the default server coordinates with the fixture credentials.
    pub fn for_tests(ca_cert_file: PathBuf, network_layout_file: PathBuf) -> Self {
        Self {
            url: "ltnm.example.com".to_string(),
            port: 443,
            username: "some_username".to_string(),
            password: "some_password_123".to_string(),
            ca_cert_file,
            network_layout_file: Some(network_layout_file),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
