// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Pod};
use kube::{Api, Client};
use std::sync::Arc;
use tracing::{info, warn};

use outfitter::config::{Config, Mode};
use outfitter::kubernetes::{wait_for_sync, Subscription, VolumeAnnotator};
use outfitter::pending::PendingAssociations;
use outfitter::reactors::{ClaimBinder, PodInitializer};
use outfitter::rules::{RuleReloader, RuleSource, RuleStore};
use outfitter::webhook::{load_tls_config, WebhookServer, WebhookState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting Outfitter operator");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: mode={:?}, grouping_label={}",
        config.mode, config.grouping_label
    );

    match config.mode {
        Mode::Initializer => run_initializer(config).await?,
        Mode::Webhook => run_webhook(config).await?,
    }

    // This should never be reached as the watchers and server run forever
    warn!("All tasks stopped unexpectedly");
    Ok(())
}

/// Load the initial rule table; failing here is fatal
async fn load_rules(config: &Config, client: Option<&Client>) -> Result<(RuleStore, RuleReloader)> {
    let source = RuleSource::from_config(config, client)?;
    info!("Loading rules from {}", source.describe());
    let rules = source.load().await?;
    info!("Loaded {} rules", rules.len());

    let store = RuleStore::new(rules);
    let reloader = RuleReloader::new(source, store.clone(), config.reload_interval);
    Ok((store, reloader))
}

async fn run_initializer(config: Config) -> Result<()> {
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let (rules, reloader) = load_rules(&config, Some(&client)).await?;
    let pending = Arc::new(PendingAssociations::new());

    let pod_initializer = PodInitializer::new(client.clone(), &config, rules, pending.clone());
    let claim_binder = ClaimBinder::new(
        VolumeAnnotator::new(client.clone(), config.volume_annotation.clone()),
        pending,
    );

    let pods = Subscription::new(
        Api::<Pod>::all(client.clone()),
        pod_initializer,
        config.resync_interval,
    );
    let claims = Subscription::new(
        Api::<PersistentVolumeClaim>::all(client),
        claim_binder,
        config.resync_interval,
    );
    let pod_store = pods.store();
    let claim_store = claims.store();
    let sync_timeout = config.sync_timeout;

    info!("Starting watchers...");

    // Claims are watched only once the pod cache is complete
    tokio::try_join!(reloader.run(), pods.run(), async move {
        wait_for_sync(&pod_store, "pod", sync_timeout).await?;
        tokio::try_join!(claims.run(), async {
            wait_for_sync(&claim_store, "persistentvolumeclaim", sync_timeout).await?;
            Ok::<_, anyhow::Error>(())
        })?;
        Ok::<_, anyhow::Error>(())
    })?;

    Ok(())
}

async fn run_webhook(config: Config) -> Result<()> {
    let client = match config.config_file {
        Some(_) => None,
        None => Some(Client::try_default().await?),
    };

    let (rules, reloader) = load_rules(&config, client.as_ref()).await?;
    let mut server = WebhookServer::new(
        config.webhook_addr,
        WebhookState {
            rules,
            grouping_label: config.grouping_label.clone(),
        },
    );
    match (&config.tls_cert_file, &config.tls_key_file) {
        (Some(cert), Some(key)) => server = server.with_tls(load_tls_config(cert, key)?),
        _ => warn!("TLS_CERT_FILE not set, serving plain HTTP"),
    }

    tokio::try_join!(reloader.run(), server.run())?;
    Ok(())
}
