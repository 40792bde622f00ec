//! Live Connection Registry.
//!
//! The single source of truth for "is this user reachable". One entry per
//! user; a later registration supersedes the earlier one.
//!
//! Every operation holds the lock only for the map operation itself, so it is
//! a plain `std` lock: no awaits and no I/O happen under it, and it can be
//! used from drop guards.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use liime_core::UserId;
use tracing::debug;

use crate::handle::ConnectionHandle;

#[derive(Default)]
pub struct ConnectionRegistry {
    entries: RwLock<HashMap<UserId, ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `handle` for `user`, returning the handle it replaced.
    ///
    /// The caller owns closing whatever is returned.
    pub fn register(&self, user: UserId, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        let conn_id = handle.id();
        let previous = {
            let mut w = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            w.insert(user, handle)
        };
        debug!(user = %user, conn_id = %conn_id, superseded = previous.is_some(), "Connection registered");
        previous
    }

    /// Remove `user`'s entry only if it still is `handle`.
    ///
    /// Returns whether an entry was removed. A superseded session calling this
    /// during its own cleanup gets `false` and leaves the newer entry alone.
    pub fn unregister(&self, user: UserId, handle: &ConnectionHandle) -> bool {
        let removed = {
            let mut w = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            match w.get(&user) {
                Some(current) if current.same_connection(handle) => {
                    w.remove(&user);
                    true
                }
                _ => false,
            }
        };
        debug!(user = %user, conn_id = %handle.id(), removed, "Connection unregistered");
        removed
    }

    pub fn lookup(&self, user: UserId) -> Option<ConnectionHandle> {
        let r = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        r.get(&user).cloned()
    }

    pub fn is_online(&self, user: UserId) -> bool {
        let r = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        r.contains_key(&user)
    }

    /// Users online at one instant during the call. May be stale by the time
    /// the caller looks at it.
    pub fn snapshot(&self) -> HashSet<UserId> {
        let r = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        r.keys().copied().collect()
    }

    /// Copy of every live handle, for fan-out outside the lock.
    pub fn handles(&self) -> Vec<ConnectionHandle> {
        let r = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        r.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        let r = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        r.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
