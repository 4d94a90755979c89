// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use k8s_openapi::api::core::v1::HostAlias;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered rule table, first match wins
pub type RuleTable = Vec<Rule>;

/// One operator-declared rule, selected by the value of the grouping label.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    #[serde(default)]
    pub name: String,
    /// Grouping label value this rule applies to
    #[serde(alias = "matchLabel")]
    pub label: String,
    /// Storage attributes, either a mapping or a JSON-encoded string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Value>,
    #[serde(default, alias = "aliases", skip_serializing_if = "Vec::is_empty")]
    pub host_aliases: Vec<HostAlias>,
}

impl Rule {
    /// Attributes in their wire form (a JSON object serialized as a string).
    ///
    /// Returns `None` when the rule declares no attributes, or only an empty
    /// mapping or string. A non-object value is returned as-is and rejected
    /// later by the merger.
    pub fn attribute_blob(&self) -> Option<String> {
        match self.attributes.as_ref()? {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Object(map) if map.is_empty() => None,
            other => Some(other.to_string()),
        }
    }

    pub fn aliases(&self) -> &[HostAlias] {
        &self.host_aliases
    }
}
