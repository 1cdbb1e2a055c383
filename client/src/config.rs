use anyhow::{Context, Result};
use quinn::ClientConfig;
use std::path::Path;

use common::config::{ALPN_PROTOCOL, create_quinn_client_config, load_certs};

// ============================================================================
// Connection Configuration
// ============================================================================

// The server certificate is trusted directly, so self-signed certificates work
pub fn configure_client(cert_path: &Path) -> Result<ClientConfig> {
    let certs = load_certs(cert_path)?;

    let mut roots = rustls::RootCertStore::empty();
    for cert in certs {
        roots.add(cert).context("Failed to add certificate to root store")?;
    }

    let mut crypto = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    crypto.alpn_protocols = vec![ALPN_PROTOCOL.to_vec()];

    create_quinn_client_config(crypto)
}
