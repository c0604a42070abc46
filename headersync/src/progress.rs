//! Progress snapshot exposed to `/api/headersync/status`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ProgressSnapshot {
    pub is_syncing: bool,
    pub total_headers: u64,
    pub highest_height: u64,
    pub chain_tip_height: u64,
    pub last_synced_at_ms: u64,
}

/// Shared, lock-free progress state updated by the sync loop and read by
/// the HTTP API from any thread.
#[derive(Clone, Default)]
pub struct ProgressHandle {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    is_syncing: AtomicBool,
    total_headers: AtomicU64,
    highest_height: AtomicU64,
    chain_tip_height: AtomicU64,
    last_synced_at_ms: AtomicU64,
}

impl ProgressHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_syncing(&self, syncing: bool) {
        self.inner.is_syncing.store(syncing, Ordering::Relaxed);
    }

    pub fn set_total_headers(&self, n: u64) {
        self.inner.total_headers.store(n, Ordering::Relaxed);
    }

    pub fn set_highest_height(&self, height: u64) {
        self.inner.highest_height.store(height, Ordering::Relaxed);
    }

    pub fn set_chain_tip_height(&self, height: u64) {
        self.inner.chain_tip_height.store(height, Ordering::Relaxed);
    }

    pub fn touch_synced_at(&self, now_ms: u64) {
        self.inner.last_synced_at_ms.store(now_ms, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            is_syncing: self.inner.is_syncing.load(Ordering::Relaxed),
            total_headers: self.inner.total_headers.load(Ordering::Relaxed),
            highest_height: self.inner.highest_height.load(Ordering::Relaxed),
            chain_tip_height: self.inner.chain_tip_height.load(Ordering::Relaxed),
            last_synced_at_ms: self.inner.last_synced_at_ms.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_report_idle() {
        let handle = ProgressHandle::new();
        let snap = handle.snapshot();
        assert!(!snap.is_syncing);
        assert_eq!(snap.highest_height, 0);
    }

    #[test]
    fn updates_are_visible_in_snapshot() {
        let handle = ProgressHandle::new();
        handle.set_syncing(true);
        handle.set_highest_height(42);
        let snap = handle.snapshot();
        assert!(snap.is_syncing);
        assert_eq!(snap.highest_height, 42);
    }
}
