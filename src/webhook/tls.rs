// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Server-side TLS for the webhook listener

use crate::error::{OutfitterError, Result};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig;
use rustls_pemfile::{certs, private_key};
use std::fs;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Build a rustls server configuration from a PEM certificate chain and key
pub fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<Arc<ServerConfig>> {
    let chain = load_certs_from_pem(cert_path)?;
    if chain.is_empty() {
        return Err(OutfitterError::TlsConfiguration(format!(
            "no valid certificates found in '{}'",
            cert_path.display()
        )));
    }
    debug!(
        "loaded {} certificate(s) from {}",
        chain.len(),
        cert_path.display()
    );
    let key = load_private_key_from_pem(key_path)?;

    let mut config = ServerConfig::builder_with_provider(Arc::new(
        rustls::crypto::aws_lc_rs::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| {
        OutfitterError::TlsConfiguration(format!("failed to configure TLS protocol versions: {e}"))
    })?
    .with_no_client_auth()
    .with_single_cert(chain, key)
    .map_err(|e| OutfitterError::TlsConfiguration(format!("invalid certificate or key: {e}")))?;
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(Arc::new(config))
}

fn load_certs_from_pem(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let file = fs::File::open(path).map_err(|e| {
        OutfitterError::TlsConfiguration(format!(
            "failed to open certificate file '{}': {e}",
            path.display()
        ))
    })?;
    let mut reader = BufReader::new(file);

    certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| {
            OutfitterError::TlsConfiguration(format!(
                "failed to parse certificates from '{}': {e}",
                path.display()
            ))
        })
}

fn load_private_key_from_pem(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let file = fs::File::open(path).map_err(|e| {
        OutfitterError::TlsConfiguration(format!(
            "failed to open private key file '{}': {e}",
            path.display()
        ))
    })?;
    let mut reader = BufReader::new(file);

    private_key(&mut reader)
        .map_err(|e| {
            OutfitterError::TlsConfiguration(format!(
                "failed to parse private key from '{}': {e}",
                path.display()
            ))
        })?
        .ok_or_else(|| {
            OutfitterError::TlsConfiguration(format!("no private key found in '{}'", path.display()))
        })
}
