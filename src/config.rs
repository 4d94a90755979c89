// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::defaults;
use anyhow::{bail, Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Which half of the operator this process runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Watch pods and claims, annotate volumes
    Initializer,
    /// Serve the mutating admission webhook
    Webhook,
}

impl std::str::FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "initializer" => Ok(Mode::Initializer),
            "webhook" => Ok(Mode::Webhook),
            other => bail!("unknown OUTFITTER_MODE '{}', expected 'initializer' or 'webhook'", other),
        }
    }
}

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    /// Label whose value selects a rule
    pub grouping_label: String,
    /// PersistentVolume annotation key that receives merged attributes
    pub volume_annotation: String,
    /// Scheduling gate the initializer removes once it has handled a pod
    pub scheduling_gate: String,
    pub configmap_namespace: String,
    pub configmap_name: String,
    /// When set, rules are read from this file instead of the ConfigMap
    pub config_file: Option<PathBuf>,
    pub webhook_addr: SocketAddr,
    /// PEM certificate chain served by the webhook; plain HTTP when unset
    pub tls_cert_file: Option<PathBuf>,
    /// PEM private key matching `tls_cert_file`
    pub tls_key_file: Option<PathBuf>,
    pub reload_interval: Duration,
    pub resync_interval: Duration,
    pub sync_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mode = env_or("OUTFITTER_MODE", "initializer").parse()?;
        let webhook_addr = env_or("WEBHOOK_ADDR", defaults::WEBHOOK_ADDR)
            .parse()
            .context("WEBHOOK_ADDR is not a valid socket address")?;
        let tls_cert_file = env_path("TLS_CERT_FILE");
        let tls_key_file = env_path("TLS_KEY_FILE");
        if tls_cert_file.is_some() != tls_key_file.is_some() {
            bail!("TLS_CERT_FILE and TLS_KEY_FILE must be set together");
        }

        Ok(Config {
            mode,
            grouping_label: env_or("GROUPING_LABEL", defaults::GROUPING_LABEL),
            volume_annotation: env_or("VOLUME_ANNOTATION", defaults::VOLUME_ANNOTATION),
            scheduling_gate: env_or("SCHEDULING_GATE", defaults::SCHEDULING_GATE),
            configmap_namespace: env_or("CONFIGMAP_NAMESPACE", defaults::CONFIGMAP_NAMESPACE),
            configmap_name: env_or("CONFIGMAP_NAME", defaults::CONFIGMAP_NAME),
            config_file: env_path("CONFIG_FILE"),
            webhook_addr,
            tls_cert_file,
            tls_key_file,
            reload_interval: Duration::from_secs(
                env_secs("RELOAD_INTERVAL_SECS", defaults::RELOAD_INTERVAL_SECS),
            ),
            resync_interval: Duration::from_secs(env_secs(
                "RESYNC_INTERVAL_SECS",
                defaults::RESYNC_INTERVAL_SECS,
            )),
            sync_timeout: Duration::from_secs(env_secs(
                "SYNC_TIMEOUT_SECS",
                defaults::SYNC_TIMEOUT_SECS,
            )),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var(key).ok().filter(|s| !s.is_empty()).map(PathBuf::from)
}

fn env_secs(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
