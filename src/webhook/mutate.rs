// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Deployment mutation - injects configured host aliases into the pod template

use crate::constants::admission::{GROUP, HOST_ALIASES_PATH, RESOURCE, VERSION};
use crate::error::{OutfitterError, Result};
use crate::rules::aliases_for;
use crate::types::Rule;
use json_patch::jsonptr::PointerBuf;
use json_patch::{AddOperation, Patch, PatchOperation};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::HostAlias;
use kube::api::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse};
use kube::ResourceExt;
use tracing::{debug, error, info};

/// Decide the response for one Deployment admission request.
///
/// Returns `None` when the request is not for `apps/v1` deployments. The
/// response is always allowed; it carries a patch only when aliases resolve
/// for the Deployment's grouping label.
pub fn mutate(
    request: &AdmissionRequest<DynamicObject>,
    rules: &[Rule],
    grouping_label: &str,
) -> Option<AdmissionResponse> {
    let resource = &request.resource;
    if resource.group != GROUP || resource.version != VERSION || resource.resource != RESOURCE {
        error!(
            uid = %request.uid,
            "expected resource to be {}/{}/{}, got {}/{}/{}",
            GROUP, VERSION, RESOURCE, resource.group, resource.version, resource.resource
        );
        return None;
    }

    let allowed = AdmissionResponse::from(request);

    let Some(object) = request.object.as_ref() else {
        debug!(uid = %request.uid, "No object in request, allowing unchanged");
        return Some(allowed);
    };

    let deployment = match decode(object) {
        Ok(d) => d,
        Err(e) => {
            error!(uid = %request.uid, "{}", e);
            let mut response = allowed;
            response.result.message = e.to_string();
            response.warnings = Some(vec![e.to_string()]);
            return Some(response);
        }
    };

    let Some(app) = deployment.labels().get(grouping_label) else {
        debug!(uid = %request.uid, "No {} label, allowing unchanged", grouping_label);
        return Some(allowed);
    };

    let resolved = aliases_for(app, rules);
    if resolved.is_empty() {
        debug!(uid = %request.uid, app = %app, "No host aliases configured");
        return Some(allowed);
    }

    let aliases = merged_aliases(&deployment, resolved);
    info!(
        uid = %request.uid,
        app = %app,
        deployment = %deployment.name_any(),
        "Injecting {} host aliases",
        aliases.len()
    );

    let patch = match host_aliases_patch(&aliases) {
        Ok(patch) => patch,
        Err(e) => {
            error!(uid = %request.uid, "Failed to build host aliases patch: {}", e);
            return Some(allowed);
        }
    };

    match AdmissionResponse::from(request).with_patch(patch) {
        Ok(response) => Some(response),
        Err(e) => {
            error!(uid = %request.uid, "Failed to serialize patch: {}", e);
            Some(allowed)
        }
    }
}

fn decode(object: &DynamicObject) -> Result<Deployment> {
    serde_json::to_value(object)
        .and_then(serde_json::from_value)
        .map_err(|e| OutfitterError::DecodeFailure(e.to_string()))
}

/// Aliases already on the pod template, followed by the resolved ones
pub fn merged_aliases(deployment: &Deployment, resolved: &[HostAlias]) -> Vec<HostAlias> {
    let mut aliases: Vec<HostAlias> = deployment
        .spec
        .as_ref()
        .and_then(|s| s.template.spec.as_ref())
        .and_then(|s| s.host_aliases.clone())
        .unwrap_or_default();
    aliases.extend(resolved.iter().cloned());
    aliases
}

/// Single `add` of the whole alias list at the pod template path
pub fn host_aliases_patch(aliases: &[HostAlias]) -> serde_json::Result<Patch> {
    Ok(Patch(vec![PatchOperation::Add(AddOperation {
        path: PointerBuf::from_tokens(HOST_ALIASES_PATH),
        value: serde_json::to_value(aliases)?,
    })]))
}
