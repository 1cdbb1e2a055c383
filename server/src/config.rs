use anyhow::{Context, Result};
use quinn::ServerConfig;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use common::config::{ALPN_PROTOCOL, create_quinn_server_config, load_certs, load_private_key};

const DEFAULT_LOG_FILTER: &str = "info";

// ============================================================================
// Connection Configuration
// ============================================================================

pub fn configure_server(cert_path: &Path, key_path: &Path) -> Result<ServerConfig> {
    let certs = load_certs(cert_path)?;
    let private_key = load_private_key(key_path)?;

    let mut crypto = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, private_key)
        .context("Failed to configure TLS")?;
    crypto.alpn_protocols = vec![ALPN_PROTOCOL.to_vec()];

    create_quinn_server_config(crypto)
}

// ============================================================================
// Logging
// ============================================================================

// RUST_LOG overrides the default filter
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}
