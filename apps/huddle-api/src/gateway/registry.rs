//! Process-local registry of which live connections belong to which user.

use std::collections::HashSet;

use dashmap::DashMap;

use super::session::ConnectionId;

/// User id to live connection ids, plus the reverse binding.
///
/// Uses `DashMap` for shard-level concurrency. A user key is present only
/// while that user has at least one bound connection.
#[derive(Default)]
pub struct ConnectionRegistry {
    users: DashMap<String, HashSet<ConnectionId>>,
    bindings: DashMap<ConnectionId, String>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a connection to a user. Binding the same pair twice is a no-op.
    pub fn bind(&self, user_id: &str, connection_id: &ConnectionId) {
        if let Some(previous) = self
            .bindings
            .insert(connection_id.clone(), user_id.to_string())
        {
            if previous != user_id {
                self.remove_from_user(&previous, connection_id);
            }
        }
        self.users
            .entry(user_id.to_string())
            .or_default()
            .insert(connection_id.clone());
    }

    /// Remove a connection from its owner's set.
    ///
    /// The owner comes from the reverse binding, or from `user_id` when the
    /// binding is already gone. Unbinding a connection that was never bound
    /// is a no-op. Returns whether anything was removed.
    pub fn unbind(&self, connection_id: &ConnectionId, user_id: Option<&str>) -> bool {
        let owner = self
            .bindings
            .remove(connection_id)
            .map(|(_, user)| user)
            .or_else(|| user_id.map(str::to_string));

        match owner {
            Some(owner) => self.remove_from_user(&owner, connection_id),
            None => false,
        }
    }

    /// Current live connections of a user, possibly empty.
    pub fn connections_for(&self, user_id: &str) -> HashSet<ConnectionId> {
        self.users
            .get(user_id)
            .map(|set| set.clone())
            .unwrap_or_default()
    }

    /// The user a connection is bound to, if any.
    pub fn user_for(&self, connection_id: &ConnectionId) -> Option<String> {
        self.bindings.get(connection_id).map(|user| user.clone())
    }

    /// Number of users with at least one live connection.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Number of bound connections.
    pub fn connection_count(&self) -> usize {
        self.bindings.len()
    }

    fn remove_from_user(&self, user_id: &str, connection_id: &ConnectionId) -> bool {
        let removed = self
            .users
            .get_mut(user_id)
            .map(|mut set| set.remove(connection_id))
            .unwrap_or(false);
        self.users.remove_if(user_id, |_, set| set.is_empty());
        removed
    }
}
