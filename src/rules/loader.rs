// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Rule loading from a ConfigMap or a file, and periodic reload

use crate::config::Config;
use crate::constants::CONFIGMAP_KEY;
use crate::error::{OutfitterError, Result};
use crate::rules::store::RuleStore;
use crate::types::RuleTable;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::{Api, Client};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

/// Where the rule table is read from
#[derive(Clone)]
pub enum RuleSource {
    ConfigMap {
        api: Api<ConfigMap>,
        namespace: String,
        name: String,
    },
    File(PathBuf),
}

impl RuleSource {
    /// Pick the source from configuration: a file when `CONFIG_FILE` is set,
    /// the ConfigMap otherwise (which requires a client).
    pub fn from_config(config: &Config, client: Option<&Client>) -> Result<Self> {
        if let Some(path) = &config.config_file {
            return Ok(RuleSource::File(path.clone()));
        }

        let client = client.ok_or_else(|| {
            OutfitterError::ConfigError(
                "loading rules from a ConfigMap requires a Kubernetes client".to_string(),
            )
        })?;

        Ok(RuleSource::ConfigMap {
            api: Api::namespaced(client.clone(), &config.configmap_namespace),
            namespace: config.configmap_namespace.clone(),
            name: config.configmap_name.clone(),
        })
    }

    pub fn describe(&self) -> String {
        match self {
            RuleSource::ConfigMap {
                namespace, name, ..
            } => format!("configmap {}/{}", namespace, name),
            RuleSource::File(path) => format!("file {}", path.display()),
        }
    }

    /// Read and parse the rule table
    pub async fn load(&self) -> Result<RuleTable> {
        match self {
            RuleSource::ConfigMap { api, name, .. } => {
                let cm = api
                    .get(name)
                    .await
                    .map_err(|e| OutfitterError::from_fetch(e, &format!("configmap {}", name)))?;
                let raw = cm
                    .data
                    .as_ref()
                    .and_then(|d| d.get(CONFIGMAP_KEY))
                    .ok_or_else(|| {
                        OutfitterError::ConfigError(format!(
                            "configmap {} has no '{}' key",
                            name, CONFIGMAP_KEY
                        ))
                    })?;
                parse_rules(raw)
            }
            RuleSource::File(path) => {
                let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
                    OutfitterError::ConfigError(format!("failed to open {}: {}", path.display(), e))
                })?;
                parse_rules(&raw)
            }
        }
    }
}

/// Parse a YAML sequence of rules
pub fn parse_rules(raw: &str) -> Result<RuleTable> {
    let rules: RuleTable = serde_yaml::from_str(raw)
        .map_err(|e| OutfitterError::ConfigError(format!("failed to parse rules: {}", e)))?;
    debug!("rules {:?}", rules);
    Ok(rules)
}

/// Periodically reloads the rule table into a `RuleStore`
pub struct RuleReloader {
    source: RuleSource,
    store: RuleStore,
    period: Duration,
}

impl RuleReloader {
    pub fn new(source: RuleSource, store: RuleStore, period: Duration) -> Self {
        Self {
            source,
            store,
            period,
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; the table was loaded at startup
        ticker.tick().await;

        loop {
            ticker.tick().await;
            self.reload().await;
        }
    }

    /// Load once; on failure the previous table stays in place
    #[instrument(skip(self), fields(source = %self.source.describe()))]
    pub async fn reload(&self) {
        match self.source.load().await {
            Ok(rules) => {
                if *self.store.snapshot() != rules {
                    info!("Rules changed, {} rules loaded", rules.len());
                }
                self.store.replace(rules);
            }
            Err(e) => warn!("Invalid rules, keeping previous table: {}", e),
        }
    }
}
