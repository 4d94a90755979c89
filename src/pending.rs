// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Attributes waiting for a claim to bind

use crate::types::ClaimKey;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// In-memory table of attribute blobs keyed by the claim they wait on.
///
/// Shared between the pod and claim reactors. One lock guards the whole
/// map; entries are rare and short-lived.
#[derive(Default)]
pub struct PendingAssociations {
    entries: Mutex<HashMap<ClaimKey, String>>,
}

impl PendingAssociations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register attributes for a claim, replacing any earlier registration
    pub fn put(&self, key: ClaimKey, attributes: String) {
        debug!("registering pending attributes for claim {}: {}", key, attributes);
        self.lock().insert(key, attributes);
    }

    /// Remove and return the attributes registered for a claim
    pub fn take_if_present(&self, key: &ClaimKey) -> Option<String> {
        let taken = self.lock().remove(key);
        if taken.is_some() {
            debug!("took pending attributes for claim {}", key);
        }
        taken
    }

    pub fn contains(&self, key: &ClaimKey) -> bool {
        self.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Every operation is a single map call, so a panic elsewhere cannot
    // leave the map half-updated.
    fn lock(&self) -> MutexGuard<'_, HashMap<ClaimKey, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_take_is_observed_once() {
        let pending = PendingAssociations::new();
        let key = ClaimKey::new("default", "data");

        pending.put(key.clone(), r#"{"pool":"ssd"}"#.to_string());

        assert_eq!(pending.take_if_present(&key).unwrap(), r#"{"pool":"ssd"}"#);
        assert!(pending.take_if_present(&key).is_none());
        assert!(pending.is_empty());
    }

    #[test]
    fn test_put_overwrites_earlier_registration() {
        let pending = PendingAssociations::new();
        let key = ClaimKey::new("default", "data");

        pending.put(key.clone(), r#"{"pool":"hdd"}"#.to_string());
        pending.put(key.clone(), r#"{"pool":"ssd"}"#.to_string());

        assert_eq!(pending.len(), 1);
        assert_eq!(pending.take_if_present(&key).unwrap(), r#"{"pool":"ssd"}"#);
    }

    #[test]
    fn test_keys_are_namespace_scoped() {
        let pending = PendingAssociations::new();
        pending.put(ClaimKey::new("a", "data"), "{}".to_string());

        assert!(pending.take_if_present(&ClaimKey::new("b", "data")).is_none());
        assert!(pending.contains(&ClaimKey::new("a", "data")));
    }

    #[test]
    fn test_concurrent_put_and_take() {
        const THREADS: usize = 8;
        const KEYS: usize = 64;

        let pending = Arc::new(PendingAssociations::new());

        let writers: Vec<_> = (0..THREADS)
            .map(|t| {
                let pending = pending.clone();
                thread::spawn(move || {
                    for i in 0..KEYS {
                        pending.put(ClaimKey::new("ns", format!("claim-{i}")), format!("{t}"));
                    }
                })
            })
            .collect();
        let takers: Vec<_> = (0..THREADS)
            .map(|_| {
                let pending = pending.clone();
                thread::spawn(move || {
                    let mut taken = 0;
                    for i in 0..KEYS {
                        if pending.take_if_present(&ClaimKey::new("ns", format!("claim-{i}"))).is_some() {
                            taken += 1;
                        }
                    }
                    taken
                })
            })
            .collect();

        for w in writers {
            w.join().unwrap();
        }
        let taken: usize = takers.into_iter().map(|t| t.join().unwrap()).sum();

        // Every key ends up either taken at least once or still present
        let remaining = pending.len();
        assert!(remaining <= KEYS);
        for i in 0..KEYS {
            let key = ClaimKey::new("ns", format!("claim-{i}"));
            if let Some(value) = pending.take_if_present(&key) {
                assert!(value.parse::<usize>().unwrap() < THREADS);
            }
        }
        assert!(pending.is_empty());
        assert!(taken + remaining >= KEYS);
    }
}
