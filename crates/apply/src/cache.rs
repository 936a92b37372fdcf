//! Last-successful-apply cache keyed by object identity.
//!
//! An entry remembers the hash of the rendered bytes and the resourceVersion
//! the server returned. A re-apply is skipped only when both still match, so
//! out-of-band edits to the live object are always reverted.

use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use ocmhub_core::ObjectRef;
use rustc_hash::{FxHashMap, FxHasher};

#[derive(Debug, Clone, PartialEq, Eq)]
struct CacheEntry {
    hash: u64,
    resource_version: String,
}

#[derive(Debug, Default)]
pub struct ApplyCache {
    entries: Mutex<FxHashMap<ObjectRef, CacheEntry>>,
}

pub fn content_hash(bytes: &[u8]) -> u64 {
    let mut h = FxHasher::default();
    bytes.hash(&mut h);
    h.finish()
}

impl ApplyCache {
    pub fn new() -> Self { Self::default() }

    /// resourceVersion recorded for `object` if the rendered content is unchanged.
    pub fn fresh_version(&self, object: &ObjectRef, hash: u64) -> Option<String> {
        let entries = self.entries.lock().ok()?;
        entries
            .get(object)
            .filter(|e| e.hash == hash)
            .map(|e| e.resource_version.clone())
    }

    /// True when a re-apply can be skipped: the rendered content matches the
    /// last successful apply and the live object still carries the
    /// resourceVersion that apply returned.
    pub fn is_current(&self, object: &ObjectRef, hash: u64, live_resource_version: Option<&str>) -> bool {
        match (self.fresh_version(object, hash), live_resource_version) {
            (Some(cached), Some(live)) => cached == live,
            _ => false,
        }
    }

    pub fn record(&self, object: &ObjectRef, hash: u64, resource_version: Option<String>) {
        let Ok(mut entries) = self.entries.lock() else { return };
        match resource_version {
            Some(rv) if !rv.is_empty() => {
                entries.insert(object.clone(), CacheEntry { hash, resource_version: rv });
            }
            _ => {
                entries.remove(object);
            }
        }
    }

    pub fn evict(&self, object: &ObjectRef) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(object);
        }
    }

    pub fn len(&self) -> usize { self.entries.lock().map(|e| e.len()).unwrap_or(0) }
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}
