// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Defaults for values that can be overridden through the environment
pub mod defaults {
    /// Label whose value selects a rule
    pub const GROUPING_LABEL: &str = "app";
    /// PersistentVolume annotation that receives the storage attributes
    pub const VOLUME_ANNOTATION: &str = "csi.volume.kubernetes.io/volume-attributes";
    /// Scheduling gate owned by the initializer
    pub const SCHEDULING_GATE: &str = "outfitter.geeko.me/volume-attributes";
    pub const CONFIGMAP_NAMESPACE: &str = "default";
    pub const CONFIGMAP_NAME: &str = "outfitter";
    pub const WEBHOOK_ADDR: &str = "0.0.0.0:8443";
    pub const RELOAD_INTERVAL_SECS: u64 = 10;
    /// Period after which watched objects are handed to their handler again
    pub const RESYNC_INTERVAL_SECS: u64 = 30;
    pub const SYNC_TIMEOUT_SECS: u64 = 300;
}

/// Key inside the rule ConfigMap holding the YAML rule list
pub const CONFIGMAP_KEY: &str = "config";

/// Phase reported by a PersistentVolumeClaim once it is bound
pub const CLAIM_BOUND: &str = "Bound";

/// Admission webhook constants
pub mod admission {
    pub const GROUP: &str = "apps";
    pub const VERSION: &str = "v1";
    pub const RESOURCE: &str = "deployments";
    /// Path the host aliases patch is applied to
    pub const HOST_ALIASES_PATH: [&str; 4] = ["spec", "template", "spec", "hostAliases"];
    pub const MUTATE_ROUTE: &str = "/mutate";
}
