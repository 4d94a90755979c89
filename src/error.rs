// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OutfitterError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Malformed attributes: {0}")]
    MalformedAttributes(String),

    #[error("Update conflict: {0}")]
    UpdateConflict(String),

    #[error("Write failed: {0}")]
    WriteFailure(String),

    #[error("Failed to decode admission request: {0}")]
    DecodeFailure(String),

    #[error("Timed out waiting for {0} watch to sync")]
    SyncTimeout(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("TLS configuration error: {0}")]
    TlsConfiguration(String),
}

impl OutfitterError {
    /// Map a failed GET into `NotFound` when the API answered 404
    pub fn from_fetch(err: kube::Error, what: &str) -> Self {
        match err {
            kube::Error::Api(ref resp) if resp.code == 404 => Self::NotFound(what.to_string()),
            other => Self::KubeError(other),
        }
    }

    /// Map a failed write into `UpdateConflict` (409) or `WriteFailure`
    pub fn from_write(err: kube::Error, what: &str) -> Self {
        match err {
            kube::Error::Api(ref resp) if resp.code == 409 => {
                Self::UpdateConflict(format!("{}: {}", what, resp.message))
            }
            other => Self::WriteFailure(format!("{}: {}", what, other)),
        }
    }

    /// Whether trying the same operation again may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::KubeError(_) | Self::UpdateConflict(_) | Self::WriteFailure(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, OutfitterError>;
