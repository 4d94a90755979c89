// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Atomically swappable rule snapshot

use crate::types::RuleTable;
use std::sync::Arc;
use tokio::sync::watch;

/// Shared handle to the current rule table.
///
/// Readers take an `Arc` snapshot and never see a partially updated table;
/// `replace` swaps the whole table.
#[derive(Clone)]
pub struct RuleStore {
    tx: Arc<watch::Sender<Arc<RuleTable>>>,
    rx: watch::Receiver<Arc<RuleTable>>,
}

impl RuleStore {
    pub fn new(table: RuleTable) -> Self {
        let (tx, rx) = watch::channel(Arc::new(table));
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Current rule table
    pub fn snapshot(&self) -> Arc<RuleTable> {
        self.rx.borrow().clone()
    }

    /// Replace the rule table as a whole
    pub fn replace(&self, table: RuleTable) {
        self.tx.send_replace(Arc::new(table));
    }
}
