// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session mutual exclusion.
//!
//! Turns sharing a session id run one at a time so history reads and
//! appends never interleave. Different sessions never contend. A lock
//! entry lives only while some turn holds or waits for it.

use std::sync::Arc;

use dashmap::DashMap;
use querychain_prometheus::set_active_sessions;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = DashMap<String, Arc<Mutex<()>>>;

#[derive(Clone, Default)]
pub struct SessionLocks {
    inner: Arc<LockMap>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `session_id`.
    pub async fn acquire(&self, session_id: &str) -> SessionGuard {
        let mutex = Arc::clone(self.inner.entry(session_id.to_string()).or_default().value());
        set_active_sessions(self.inner.len());
        let guard = mutex.lock_owned().await;
        SessionGuard {
            locks: Arc::clone(&self.inner),
            session_id: session_id.to_string(),
            guard: Some(guard),
        }
    }

    /// Sessions currently holding or awaiting a lock.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Held for the duration of one turn.
pub struct SessionGuard {
    locks: Arc<LockMap>,
    session_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map itself still references an idle entry.
        self.locks
            .remove_if(&self.session_id, |_, m| Arc::strong_count(m) == 1);
        set_active_sessions(self.locks.len());
    }
}
