use anyhow::{Context, Result};
use quinn::TransportConfig;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use std::{path::Path, sync::Arc, time::Duration};

// ============================================================================
// Constants
// ============================================================================

const IDLE_TIMEOUT_SECS: u64 = 10;
const KEEPALIVE_INTERVAL_SECS: u64 = 2;

// ============================================================================
// Shared Configuration
// ============================================================================

pub const DEFAULT_CERT_PATH: &str = "cert.pem";
pub const DEFAULT_KEY_PATH: &str = "key.pem";

// ALPN protocol name negotiated by the level server and its clients
pub const ALPN_PROTOCOL: &[u8] = b"maze-level";

pub fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let cert = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let certs = rustls_pemfile::certs(&mut &cert[..])
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to parse certificates")?;
    if certs.is_empty() {
        anyhow::bail!("No certificates found in {}", path.display());
    }
    Ok(certs)
}

pub fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let key = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    rustls_pemfile::private_key(&mut &key[..])
        .context("Failed to read private key")?
        .ok_or_else(|| anyhow::anyhow!("No private key found in {}", path.display()))
}

// Create a shared transport configuration with timeouts and keepalive
pub fn create_transport_config() -> Result<Arc<TransportConfig>> {
    let mut transport = TransportConfig::default();
    transport.max_idle_timeout(Some(
        Duration::from_secs(IDLE_TIMEOUT_SECS)
            .try_into()
            .context("Invalid idle timeout")?,
    ));
    transport.keep_alive_interval(Some(Duration::from_secs(KEEPALIVE_INTERVAL_SECS)));
    Ok(Arc::new(transport))
}

// Create a Quinn `ClientConfig` from a rustls `ClientConfig` with transport settings
pub fn create_quinn_client_config(crypto: rustls::ClientConfig) -> Result<quinn::ClientConfig> {
    let mut config = quinn::ClientConfig::new(Arc::new(
        quinn::crypto::rustls::QuicClientConfig::try_from(crypto).context("Failed to create QUIC client config")?,
    ));
    let transport = create_transport_config()?;
    config.transport_config(transport);
    Ok(config)
}

// Create a Quinn `ServerConfig` from a rustls `ServerConfig` with transport settings
pub fn create_quinn_server_config(crypto: rustls::ServerConfig) -> Result<quinn::ServerConfig> {
    let mut config = quinn::ServerConfig::with_crypto(Arc::new(
        quinn::crypto::rustls::QuicServerConfig::try_from(crypto).context("Failed to create QUIC server config")?,
    ));
    let transport = create_transport_config()?;
    config.transport_config(transport);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_pem_files_name_the_path() {
        let err = load_certs(Path::new("missing-cert.pem")).unwrap_err();
        assert!(err.to_string().contains("missing-cert.pem"));
        let err = load_private_key(Path::new("missing-key.pem")).unwrap_err();
        assert!(err.to_string().contains("missing-key.pem"));
    }

    #[test]
    fn transport_config_builds() {
        assert!(create_transport_config().is_ok());
    }
}
