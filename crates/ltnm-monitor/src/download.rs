//! HTTPS download of the network-layout document.
//!
//! The event service publishes its layout at
//! `https://{url}/network-layout.json`. The download trusts only the
//! configured CA certificate, the same anchor the WebSocket connection
//! uses.

use std::path::Path;

use thiserror::Error;
use tracing::debug;

/// Errors that can occur while downloading a file.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The CA certificate could not be read or parsed.
    #[error("could not load the CA certificate from {path}: {reason}")]
    CaCertificate { path: String, reason: String },

    /// The HTTP request failed (DNS, TLS, connectivity, non-2xx status).
    #[error("request for {url} failed: {reason}")]
    Request { url: String, reason: String },

    /// The response body could not be written to the destination path.
    #[error("could not write {path}: {reason}")]
    Write { path: String, reason: String },
}

/// Downloads `url` to `dest_path`, trusting only the CA certificate at
/// `ca_cert_file`.
///
/// # Errors
///
/// Returns a [`DownloadError`] describing the failing stage; the
/// destination file is only created on success.
pub async fn download_file(
    url: &str,
    dest_path: &Path,
    ca_cert_file: &Path,
) -> Result<(), DownloadError> {
    let pem = tokio::fs::read(ca_cert_file)
        .await
        .map_err(|e| DownloadError::CaCertificate {
            path: ca_cert_file.display().to_string(),
            reason: e.to_string(),
        })?;
    let certificate =
        reqwest::Certificate::from_pem(&pem).map_err(|e| DownloadError::CaCertificate {
            path: ca_cert_file.display().to_string(),
            reason: e.to_string(),
        })?;

    let client = reqwest::Client::builder()
        .use_rustls_tls()
        .tls_built_in_root_certs(false)
        .add_root_certificate(certificate)
        .build()
        .map_err(|e| DownloadError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    debug!("downloading {url} to {}", dest_path.display());
    let response = client
        .get(url)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|e| DownloadError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    let body = response.bytes().await.map_err(|e| DownloadError::Request {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    tokio::fs::write(dest_path, &body)
        .await
        .map_err(|e| DownloadError::Write {
            path: dest_path.display().to_string(),
            reason: e.to_string(),
        })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
