//! TLS client configuration anchored to a single CA certificate.
//!
//! The event service presents a certificate signed by a known CA; the
//! monitor trusts exactly that CA and nothing else, so the root store is
//! built from the configured PEM file instead of the system store.

use std::path::Path;

use rustls::{ClientConfig, RootCertStore};

use crate::transport::TransportError;

/// Builds a rustls client configuration whose root store contains the
/// certificates found in `ca_cert_file`.
///
/// # Errors
///
/// Returns [`TransportError::Tls`] when the file cannot be read, contains
/// no certificate, or contains certificates rustls rejects.
pub fn client_tls_config(ca_cert_file: &Path) -> Result<ClientConfig, TransportError> {
    let pem = std::fs::read(ca_cert_file).map_err(|e| {
        TransportError::Tls(format!("could not read {}: {e}", ca_cert_file.display()))
    })?;

    let mut roots = RootCertStore::empty();
    let mut reader = std::io::Cursor::new(pem);
    for cert in rustls_pemfile::certs(&mut reader) {
        let cert = cert.map_err(|e| {
            TransportError::Tls(format!(
                "invalid certificate in {}: {e}",
                ca_cert_file.display()
            ))
        })?;
        roots.add(cert).map_err(|e| {
            TransportError::Tls(format!(
                "rejected certificate in {}: {e}",
                ca_cert_file.display()
            ))
        })?;
    }
    if roots.is_empty() {
        return Err(TransportError::Tls(format!(
            "no certificates found in {}",
            ca_cert_file.display()
        )));
    }

    Ok(ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
