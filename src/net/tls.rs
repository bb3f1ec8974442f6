use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use ring::digest::{digest, SHA256};
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::info;
use wtransport::Identity;

use crate::config::ServerConfig;

// Dev certificate paths, generated on first start when no paths are configured
const DEV_CERT_FILE: &str = "certs/cert.pem";
const DEV_KEY_FILE: &str = "certs/key.pem";

/// TLS configuration for the WebTransport endpoint
pub struct TlsConfig {
    /// The wtransport Identity containing certificate and key
    pub identity: Identity,
    /// Base64-encoded SHA-256 hash of the certificate (for browser
    /// `serverCertificateHashes`)
    pub cert_hash: String,
}

impl TlsConfig {
    /// Load TLS configuration
    ///
    /// Production: set TLS_CERT_PATH and TLS_KEY_PATH.
    /// Development: a self-signed localhost certificate is generated under
    /// `certs/` on first start and reused afterwards.
    pub async fn load(config: &ServerConfig) -> Result<Self> {
        if let (Some(cert_path), Some(key_path)) =
            (config.tls_cert_path.as_deref(), config.tls_key_path.as_deref())
        {
            info!("Loading TLS certificate from configured paths");
            return Self::load_from_paths(cert_path, key_path).await;
        }

        if !(Path::new(DEV_CERT_FILE).exists() && Path::new(DEV_KEY_FILE).exists()) {
            info!("Generating self-signed dev certificate in certs/");
            generate_dev_cert().context("Failed to generate dev certificate")?;
        }
        Self::load_from_paths(DEV_CERT_FILE, DEV_KEY_FILE).await
    }

    /// Load certificate from PEM file paths
    async fn load_from_paths(cert_path: &str, key_path: &str) -> Result<Self> {
        let identity = Identity::load_pemfiles(cert_path, key_path)
            .await
            .context("Failed to load certificate from PEM files")?;

        let cert_hash = Self::compute_cert_hash(&identity);
        Ok(Self {
            identity,
            cert_hash,
        })
    }

    fn compute_cert_hash(identity: &Identity) -> String {
        identity
            .certificate_chain()
            .as_slice()
            .first()
            .map(|cert| {
                let der_bytes = cert.der();
                let hash = digest(&SHA256, der_bytes);
                STANDARD.encode(hash.as_ref())
            })
            .unwrap_or_default()
    }

    /// Get the certificate hash for client configuration
    pub fn get_cert_hash(&self) -> &str {
        &self.cert_hash
    }
}

/// Generate a self-signed localhost certificate under `certs/`.
///
/// Valid for 14 days - browsers reject longer-lived certificates for
/// WebTransport `serverCertificateHashes`.
fn generate_dev_cert() -> Result<()> {
    fs::create_dir_all("certs")?;

    let mut params = CertificateParams::new(vec![
        "localhost".to_string(),
        "127.0.0.1".to_string(),
    ])?;

    params.distinguished_name = DistinguishedName::new();
    params
        .distinguished_name
        .push(DnType::CommonName, "Lights Out Dev");
    params
        .distinguished_name
        .push(DnType::OrganizationName, "Development");

    let now = SystemTime::now();
    let fourteen_days = Duration::from_secs(14 * 24 * 60 * 60);
    params.not_before = now.into();
    params.not_after = (now + fourteen_days).into();

    let key_pair = KeyPair::generate()?;
    let cert = params.self_signed(&key_pair)?;

    fs::write(DEV_CERT_FILE, cert.pem())?;
    fs::write(DEV_KEY_FILE, key_pair.serialize_pem())?;

    Ok(())
}
