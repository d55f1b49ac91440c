//! Weak user table
//!
//! The table never keeps a user alive. Members, message authors and channel
//! recipients hold the strong handles; once the last one is gone the entry
//! stops resolving and is swept on a later insert.

use dashmap::DashMap;
use relay_core::{Snowflake, User, UserRef};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

/// Inserts between sweeps of dead entries
const SWEEP_INTERVAL: usize = 256;

pub struct UserTable {
    users: DashMap<Snowflake, Weak<RwLock<User>>>,
    inserts: AtomicUsize,
}

impl UserTable {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            inserts: AtomicUsize::new(0),
        }
    }

    /// Resolve a live user
    pub fn get(&self, id: Snowflake) -> Option<UserRef> {
        self.users.get(&id).and_then(|weak| weak.upgrade())
    }

    /// Index a user without taking ownership of it
    pub fn insert(&self, user: &UserRef) {
        let id = user.read().id;
        self.users.insert(id, Arc::downgrade(user));

        if self.inserts.fetch_add(1, Ordering::Relaxed) % SWEEP_INTERVAL == SWEEP_INTERVAL - 1 {
            self.sweep();
        }
    }

    pub fn remove(&self, id: Snowflake) {
        self.users.remove(&id);
    }

    /// Drop entries whose user has been released, returning how many went
    pub fn sweep(&self) -> usize {
        let before = self.users.len();
        self.users.retain(|_, weak| weak.strong_count() > 0);
        let swept = before.saturating_sub(self.users.len());
        if swept > 0 {
            tracing::trace!(swept, "Swept released users");
        }
        swept
    }

    /// Number of live users
    pub fn len(&self) -> usize {
        self.users
            .iter()
            .filter(|entry| entry.value().strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.users.clear();
    }
}

impl Default for UserTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for UserTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserTable")
            .field("entries", &self.users.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64) -> UserRef {
        User::new(Snowflake::new(id), format!("user{id}"), "0001").into_ref()
    }

    #[test]
    fn test_lookup_while_owned() {
        let table = UserTable::new();
        let alice = user(1);
        table.insert(&alice);

        let found = table.get(Snowflake::new(1)).unwrap();
        assert!(Arc::ptr_eq(&found, &alice));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_released_user_stops_resolving() {
        let table = UserTable::new();
        let bob = user(2);
        table.insert(&bob);
        drop(bob);

        assert!(table.get(Snowflake::new(2)).is_none());
        assert_eq!(table.len(), 0);
        assert_eq!(table.sweep(), 1);
    }

    #[test]
    fn test_periodic_sweep_on_insert() {
        let table = UserTable::new();
        for id in 0..SWEEP_INTERVAL as i64 {
            // Each user is dropped right after insertion
            table.insert(&user(id));
        }
        // Only the user alive during the sweep itself survives it
        assert_eq!(table.users.len(), 1);
    }
}
