// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Watch subscription delivering typed add/update callbacks

use crate::error::{OutfitterError, Result};
use futures::StreamExt;
use kube::{Api, Resource, ResourceExt};
use kube_runtime::reflector::{self, ObjectRef, Store};
use kube_runtime::watcher::{self, Event};
use kube_runtime::WatchStreamExt;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::pin::pin;
use std::time::Duration;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Receives the objects observed by a `Subscription`
pub trait EventHandler<K> {
    /// An object seen for the first time
    fn on_add(&self, obj: &K) -> impl Future<Output = Result<()>> + Send;

    /// A known object changed, was re-listed after a watch restart, or is
    /// redelivered by a periodic resync (`old` and `new` are then equal)
    fn on_update(&self, old: &K, new: &K) -> impl Future<Output = Result<()>> + Send;

    /// An object was removed
    fn on_delete(&self, _obj: &K) -> impl Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }
}

/// Watches one resource kind, keeps a local cache and dispatches events to a
/// handler, one at a time.
///
/// Every `resync_period` all cached objects are handed to the handler again
/// as updates, so a handler that failed on an object gets another attempt.
pub struct Subscription<K, H>
where
    K: Resource + Clone + 'static,
    K::DynamicType: Eq + Hash + Clone,
{
    api: Api<K>,
    handler: H,
    reader: Store<K>,
    writer: reflector::store::Writer<K>,
    kind: String,
    resync_period: Duration,
}

impl<K, H> Subscription<K, H>
where
    K: Resource + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
    K::DynamicType: Eq + Hash + Clone + Default,
    H: EventHandler<K>,
{
    pub fn new(api: Api<K>, handler: H, resync_period: Duration) -> Self {
        let (reader, writer) = reflector::store();
        let kind = K::kind(&K::DynamicType::default()).to_string();
        Self {
            api,
            handler,
            reader,
            writer,
            kind,
            resync_period,
        }
    }

    /// Read handle on the local cache, used to wait for the initial sync
    pub fn store(&self) -> Store<K> {
        self.reader.clone()
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        info!(
            "{} subscription starting, resync every {:?}",
            self.kind, self.resync_period
        );
        let mut events = pin!(watch_events(self.api.clone()));
        let mut ticker = interval(self.resync_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately, before anything is cached
        ticker.tick().await;

        loop {
            tokio::select! {
                event = events.next() => match event {
                    Some(Ok(event)) => self.dispatch(event).await,
                    Some(Err(e)) => warn!("{} watch error: {}", self.kind, e),
                    None => break,
                },
                _ = ticker.tick() => self.resync().await,
            }
        }

        warn!("{} watch stream ended", self.kind);
        Ok(())
    }

    pub(crate) async fn dispatch(&mut self, event: Event<K>) {
        match &event {
            Event::Apply(obj) | Event::InitApply(obj) => {
                let old = self.reader.get(&ObjectRef::from_obj(obj));
                self.writer.apply_watcher_event(&event);
                let result = match old {
                    Some(old) => self.handler.on_update(&old, obj).await,
                    None => self.handler.on_add(obj).await,
                };
                self.report(result, obj);
            }
            Event::Delete(obj) => {
                self.writer.apply_watcher_event(&event);
                let result = self.handler.on_delete(obj).await;
                self.report(result, obj);
            }
            Event::Init => self.writer.apply_watcher_event(&event),
            Event::InitDone => {
                self.writer.apply_watcher_event(&event);
                debug!("{} initial list complete", self.kind);
            }
        }
    }

    /// Hand every cached object to the handler again
    pub(crate) async fn resync(&self) {
        let objects = self.reader.state();
        debug!("Resyncing {} {} objects", objects.len(), self.kind);
        for obj in objects {
            let result = self.handler.on_update(&obj, &obj).await;
            self.report(result, &obj);
        }
    }

    fn report(&self, result: Result<()>, obj: &K) {
        if let Err(e) = result {
            warn!(
                "Failed to handle {} {}/{}, retrying on next resync: {}",
                self.kind,
                obj.namespace().unwrap_or_default(),
                obj.name_any(),
                e
            );
        }
    }
}

fn watch_events<K>(api: Api<K>) -> impl futures::Stream<Item = std::result::Result<Event<K>, watcher::Error>>
where
    K: Resource + Clone + DeserializeOwned + Debug + Send + 'static,
{
    watcher::watcher(api, watcher::Config::default()).default_backoff()
}

/// Wait until the store has seen its first complete listing.
///
/// Timing out is the one unrecoverable condition: the caller is expected to
/// exit so the orchestrator can restart the process.
pub async fn wait_for_sync<K>(store: &Store<K>, kind: &str, limit: Duration) -> Result<()>
where
    K: Resource + Clone + 'static,
    K::DynamicType: Eq + Hash + Clone,
{
    info!("Waiting for {} informer initial sync", kind);
    match timeout(limit, store.wait_until_ready()).await {
        Ok(Ok(())) => {
            info!("{} informer synced", kind);
            Ok(())
        }
        Ok(Err(_)) | Err(_) => Err(OutfitterError::SyncTimeout(kind.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockService;
    use k8s_openapi::api::core::v1::ConfigMap;
    use kube::api::ObjectMeta;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder {
        seen: Arc<Mutex<Vec<String>>>,
        /// Number of upcoming calls that fail
        failures: Arc<Mutex<usize>>,
    }

    impl Recorder {
        fn record(&self, entry: String) -> Result<()> {
            self.seen.lock().unwrap().push(entry);
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(OutfitterError::WriteFailure("injected".to_string()));
            }
            Ok(())
        }
    }

    impl EventHandler<ConfigMap> for Recorder {
        async fn on_add(&self, obj: &ConfigMap) -> Result<()> {
            self.record(format!("add {}", obj.name_any()))
        }

        async fn on_update(&self, old: &ConfigMap, new: &ConfigMap) -> Result<()> {
            self.record(format!(
                "update {} {:?} -> {:?}",
                new.name_any(),
                old.data.as_ref().and_then(|d| d.get("v")),
                new.data.as_ref().and_then(|d| d.get("v"))
            ))
        }

        async fn on_delete(&self, obj: &ConfigMap) -> Result<()> {
            self.record(format!("delete {}", obj.name_any()))
        }
    }

    fn configmap(name: &str, value: &str) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            data: Some(BTreeMap::from([("v".to_string(), value.to_string())])),
            ..Default::default()
        }
    }

    fn subscription(recorder: Recorder) -> Subscription<ConfigMap, Recorder> {
        let api = Api::namespaced(MockService::new().into_client(), "default");
        Subscription::new(api, recorder, Duration::from_secs(30))
    }

    fn seen(recorder: &Recorder) -> Vec<String> {
        recorder.seen.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_dispatch_add_then_update() {
        let recorder = Recorder::default();
        let mut sub = subscription(recorder.clone());

        sub.dispatch(Event::Init).await;
        sub.dispatch(Event::InitApply(configmap("a", "1"))).await;
        sub.dispatch(Event::InitDone).await;
        sub.dispatch(Event::Apply(configmap("a", "2"))).await;
        sub.dispatch(Event::Apply(configmap("b", "1"))).await;

        assert_eq!(
            seen(&recorder),
            vec![
                "add a".to_string(),
                r#"update a Some("1") -> Some("2")"#.to_string(),
                "add b".to_string(),
            ]
        );
        assert_eq!(sub.kind, "ConfigMap");
    }

    #[tokio::test]
    async fn test_delete_is_delivered_and_forgotten() {
        let recorder = Recorder::default();
        let mut sub = subscription(recorder.clone());

        sub.dispatch(Event::Apply(configmap("a", "1"))).await;
        sub.dispatch(Event::Delete(configmap("a", "1"))).await;
        sub.dispatch(Event::Apply(configmap("a", "2"))).await;

        assert_eq!(
            seen(&recorder),
            vec![
                "add a".to_string(),
                "delete a".to_string(),
                "add a".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_resync_redelivers_cached_objects() {
        let recorder = Recorder::default();
        let mut sub = subscription(recorder.clone());

        sub.dispatch(Event::Apply(configmap("a", "1"))).await;
        sub.dispatch(Event::Apply(configmap("b", "2"))).await;
        sub.dispatch(Event::Delete(configmap("b", "2"))).await;
        recorder.seen.lock().unwrap().clear();

        sub.resync().await;

        assert_eq!(
            seen(&recorder),
            vec![r#"update a Some("1") -> Some("1")"#.to_string()]
        );
    }

    #[tokio::test]
    async fn test_failed_object_is_retried_on_resync() {
        let recorder = Recorder::default();
        *recorder.failures.lock().unwrap() = 1;
        let mut sub = subscription(recorder.clone());

        sub.dispatch(Event::Apply(configmap("a", "1"))).await;
        sub.resync().await;

        assert_eq!(
            seen(&recorder),
            vec![
                "add a".to_string(),
                r#"update a Some("1") -> Some("1")"#.to_string()
            ]
        );
        assert_eq!(*recorder.failures.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_wait_for_sync_succeeds_after_initial_list() {
        let mut sub = subscription(Recorder::default());
        let store = sub.store();

        sub.dispatch(Event::Init).await;
        sub.dispatch(Event::InitDone).await;

        wait_for_sync(&store, "ConfigMap", Duration::from_secs(1))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_sync_times_out() {
        let sub = subscription(Recorder::default());

        let err = wait_for_sync(&sub.store(), "ConfigMap", Duration::from_millis(20))
            .await
            .unwrap_err();

        assert!(matches!(err, OutfitterError::SyncTimeout(kind) if kind == "ConfigMap"));
    }
}
