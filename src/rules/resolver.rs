// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Label value to rule lookup

use crate::types::Rule;
use k8s_openapi::api::core::v1::HostAlias;
use tracing::trace;

/// Find the first rule whose label equals `key`, in table order
pub fn resolve<'a>(key: &str, table: &'a [Rule]) -> Option<&'a Rule> {
    table.iter().find(|rule| {
        trace!("looking for {} using {}", key, rule.label);
        rule.label == key
    })
}

/// Attribute blob of the first rule matching `key`
pub fn attributes_for(key: &str, table: &[Rule]) -> Option<String> {
    resolve(key, table).and_then(Rule::attribute_blob)
}

/// Host aliases of the first rule matching `key`, empty when nothing matches
pub fn aliases_for<'a>(key: &str, table: &'a [Rule]) -> &'a [HostAlias] {
    resolve(key, table).map(Rule::aliases).unwrap_or_default()
}
