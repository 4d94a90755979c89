// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Pod initializer - resolves storage attributes for gated pods, annotates
//! bound volumes or defers until the claim binds, then releases the pod.

use crate::config::Config;
use crate::error::{OutfitterError, Result};
use crate::kubernetes::{EventHandler, VolumeAnnotator};
use crate::pending::PendingAssociations;
use crate::reactors::binding::bound_volume;
use crate::rules::{attributes_for, RuleStore};
use crate::types::ClaimKey;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Pod};
use kube::{api::PostParams, Api, Client, ResourceExt};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct PodInitializer {
    client: Client,
    rules: RuleStore,
    pending: Arc<PendingAssociations>,
    annotator: VolumeAnnotator,
    grouping_label: String,
    gate: String,
}

impl PodInitializer {
    pub fn new(
        client: Client,
        config: &Config,
        rules: RuleStore,
        pending: Arc<PendingAssociations>,
    ) -> Self {
        Self {
            annotator: VolumeAnnotator::new(client.clone(), config.volume_annotation.clone()),
            client,
            rules,
            pending,
            grouping_label: config.grouping_label.clone(),
            gate: config.scheduling_gate.clone(),
        }
    }

    /// Whether the pod still waits on our scheduling gate
    pub fn is_gated(&self, pod: &Pod) -> bool {
        pod.spec
            .as_ref()
            .and_then(|s| s.scheduling_gates.as_ref())
            .is_some_and(|gates| gates.iter().any(|g| g.name == self.gate))
    }

    #[instrument(skip(self, pod), fields(pod = %format!("{}/{}", pod.namespace().unwrap_or_default(), pod.name_any())))]
    pub async fn initialize(&self, pod: &Pod) -> Result<()> {
        if !self.is_gated(pod) {
            return Ok(());
        }

        info!("Initializing pod");
        let namespace = pod.namespace().unwrap_or_default();

        match self.resolve_attributes(pod) {
            Some(attributes) => {
                for claim_name in claim_names(pod) {
                    self.propagate(ClaimKey::new(&namespace, claim_name), &attributes)
                        .await;
                }
            }
            None => debug!("No attributes configured for pod"),
        }

        let pods: Api<Pod> = Api::namespaced(self.client.clone(), &namespace);
        let initialized = remove_gate(pod, &self.gate);
        if let Err(e) = pods
            .replace(&pod.name_any(), &PostParams::default(), &initialized)
            .await
        {
            warn!("Failed to update pod: {}", e);
            return Err(OutfitterError::from_write(e, &format!("pod {}", pod.name_any())));
        }

        info!("Initialized pod");
        Ok(())
    }

    fn resolve_attributes(&self, pod: &Pod) -> Option<String> {
        let value = pod.labels().get(&self.grouping_label)?;
        attributes_for(value, &self.rules.snapshot())
    }

    /// Annotate the claim's volume now, or remember the attributes until it binds
    async fn propagate(&self, key: ClaimKey, attributes: &str) {
        let claims: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), &key.namespace);
        let claim = match claims.get(&key.name).await {
            Ok(claim) => claim,
            Err(e) => {
                let e = OutfitterError::from_fetch(e, &format!("persistentvolumeclaim {}", key));
                warn!("Failed to get claim {}: {}", key, e);
                return;
            }
        };

        match bound_volume(&claim) {
            Some(volume) => {
                if let Err(e) = self.annotator.apply(volume, attributes).await {
                    warn!("Failed to annotate volume {} for claim {}: {}", volume, key, e);
                }
            }
            None => {
                info!("Claim {} not bound yet, deferring attributes", key);
                self.pending.put(key.clone(), attributes.to_string());
                self.recheck(&claims, &key).await;
            }
        }
    }

    /// Look at a deferred claim once more. It may have bound after the first
    /// read but before the registration, in which case the binder has
    /// already seen it and found nothing pending.
    async fn recheck(&self, claims: &Api<PersistentVolumeClaim>, key: &ClaimKey) {
        let claim = match claims.get(&key.name).await {
            Ok(claim) => claim,
            Err(e) => {
                debug!("Could not re-read claim {}: {}", key, e);
                return;
            }
        };
        let Some(volume) = bound_volume(&claim) else {
            return;
        };
        let Some(attributes) = self.pending.take_if_present(key) else {
            return;
        };

        info!("Claim {} bound meanwhile, applying attributes", key);
        if let Err(e) = self.annotator.apply(volume, &attributes).await {
            warn!("Failed to annotate volume {} for claim {}: {}", volume, key, e);
            if e.is_transient() {
                self.pending.put(key.clone(), attributes);
            }
        }
    }
}

impl EventHandler<Pod> for PodInitializer {
    async fn on_add(&self, pod: &Pod) -> Result<()> {
        self.initialize(pod).await
    }

    // A pod that is still gated on update was not released by an earlier
    // attempt, so it is handled again.
    async fn on_update(&self, _old: &Pod, new: &Pod) -> Result<()> {
        self.initialize(new).await
    }
}

/// Names of the claims mounted by the pod, in volume order
pub fn claim_names(pod: &Pod) -> Vec<&str> {
    pod.spec
        .iter()
        .flat_map(|s| s.volumes.iter().flatten())
        .filter_map(|v| v.persistent_volume_claim.as_ref())
        .map(|c| c.claim_name.as_str())
        .collect()
}

/// Copy of the pod without `gate`, other gates keep their order
pub fn remove_gate(pod: &Pod, gate: &str) -> Pod {
    let mut pod = pod.clone();
    if let Some(spec) = pod.spec.as_mut() {
        let remaining: Vec<_> = spec
            .scheduling_gates
            .take()
            .unwrap_or_default()
            .into_iter()
            .filter(|g| g.name != gate)
            .collect();
        spec.scheduling_gates = (!remaining.is_empty()).then_some(remaining);
    }
    pod
}
