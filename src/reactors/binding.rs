// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Claim binder - applies pending attributes once a claim binds to a volume.

use crate::constants::CLAIM_BOUND;
use crate::error::Result;
use crate::kubernetes::{EventHandler, VolumeAnnotator};
use crate::pending::PendingAssociations;
use crate::types::ClaimKey;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Name of the volume a claim is bound to, if any
pub fn bound_volume(claim: &PersistentVolumeClaim) -> Option<&str> {
    claim
        .spec
        .as_ref()
        .and_then(|s| s.volume_name.as_deref())
        .filter(|name| !name.is_empty())
}

/// Whether the claim reports phase `Bound` and names its volume
pub fn is_bound(claim: &PersistentVolumeClaim) -> bool {
    let phase_bound = claim
        .status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .is_some_and(|phase| phase == CLAIM_BOUND);
    phase_bound && bound_volume(claim).is_some()
}

pub struct ClaimBinder {
    annotator: VolumeAnnotator,
    pending: Arc<PendingAssociations>,
}

impl ClaimBinder {
    pub fn new(annotator: VolumeAnnotator, pending: Arc<PendingAssociations>) -> Self {
        Self { annotator, pending }
    }

    /// Apply and clear the pending attributes of a claim that is now bound.
    ///
    /// Binding is confirmed before the pending entry is taken, so events for
    /// claims that are still unbound leave the entry in place. A write that
    /// fails transiently puts the entry back for the next resync.
    #[instrument(skip(self, claim), fields(claim = %ClaimKey::from_claim(claim)))]
    pub async fn reconcile(&self, claim: &PersistentVolumeClaim) -> Result<()> {
        let key = ClaimKey::from_claim(claim);

        if !is_bound(claim) {
            if self.pending.contains(&key) {
                debug!("Claim has pending attributes but is not bound yet");
            }
            return Ok(());
        }

        let Some(attributes) = self.pending.take_if_present(&key) else {
            return Ok(());
        };
        let Some(volume) = bound_volume(claim) else {
            return Ok(());
        };

        info!("Claim bound to volume {}, applying pending attributes", volume);
        if let Err(e) = self.annotator.apply(volume, &attributes).await {
            warn!("Failed to annotate volume {} for claim {}: {}", volume, key, e);
            if e.is_transient() {
                self.pending.put(key, attributes);
            }
        }

        Ok(())
    }

    /// Drop the pending attributes of a claim that no longer exists
    pub fn forget(&self, claim: &PersistentVolumeClaim) {
        let key = ClaimKey::from_claim(claim);
        if self.pending.take_if_present(&key).is_some() {
            info!("Claim {} deleted before binding, dropping pending attributes", key);
        }
    }
}

impl EventHandler<PersistentVolumeClaim> for ClaimBinder {
    async fn on_add(&self, claim: &PersistentVolumeClaim) -> Result<()> {
        self.reconcile(claim).await
    }

    async fn on_update(
        &self,
        _old: &PersistentVolumeClaim,
        new: &PersistentVolumeClaim,
    ) -> Result<()> {
        self.reconcile(new).await
    }

    async fn on_delete(&self, claim: &PersistentVolumeClaim) -> Result<()> {
        self.forget(claim);
        Ok(())
    }
}
