// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Merging storage attributes into a PersistentVolume annotation

use crate::error::{OutfitterError, Result};
use crate::merge::merge;
use k8s_openapi::api::core::v1::PersistentVolume;
use kube::{api::PostParams, Api, Client, ResourceExt};
use tracing::{debug, info, instrument};

/// Writes attribute blobs into one annotation key on PersistentVolumes
#[derive(Clone)]
pub struct VolumeAnnotator {
    volumes: Api<PersistentVolume>,
    annotation: String,
}

impl VolumeAnnotator {
    pub fn new(client: Client, annotation: impl Into<String>) -> Self {
        Self {
            volumes: Api::all(client),
            annotation: annotation.into(),
        }
    }

    /// Fetch the volume, merge `attributes` into its annotation and write it back
    #[instrument(skip(self, attributes), fields(volume = %volume_name))]
    pub async fn apply(&self, volume_name: &str, attributes: &str) -> Result<()> {
        let mut pv = self
            .volumes
            .get(volume_name)
            .await
            .map_err(|e| OutfitterError::from_fetch(e, &format!("persistentvolume {}", volume_name)))?;

        let existing = pv.annotations().get(&self.annotation).map(String::as_str);
        let merged = merge(existing, attributes)?;
        debug!("updating {} from {:?} to {}", self.annotation, existing, merged);

        pv.annotations_mut().insert(self.annotation.clone(), merged);

        self.volumes
            .replace(volume_name, &PostParams::default(), &pv)
            .await
            .map_err(|e| OutfitterError::from_write(e, &format!("persistentvolume {}", volume_name)))?;

        info!("Annotated volume {}", volume_name);
        Ok(())
    }
}
