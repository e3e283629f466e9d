//! Per-domain lock table.
//!
//! Every engine write to a (candidate, track) runs while holding that
//! domain's mutex, which serializes grading, forced submission and
//! certificate issuance for the same key.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::model::DomainKey;

/// Lazily-populated table of one mutex per [`DomainKey`].
#[derive(Debug, Default)]
pub struct DomainLocks {
    table: Mutex<HashMap<DomainKey, Arc<Mutex<()>>>>,
}

impl DomainLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The mutex guarding `key`. Lock it for the duration of a transaction.
    pub fn handle(&self, key: &DomainKey) -> Arc<Mutex<()>> {
        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(table.entry(key.clone()).or_default())
    }
}
