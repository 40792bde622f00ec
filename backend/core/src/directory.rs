//! Process-local chat directory.
//!
//! Stands in for the persistence service when the server runs on its own:
//! memberships are seeded at startup and online-status writes are kept in
//! memory with the time of the last transition.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::DirectoryError;
use crate::traits::ChatDirectory;
use crate::types::{ChatId, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPresence {
    pub is_online: bool,
    pub last_seen: DateTime<Utc>,
}

#[derive(Default)]
pub struct InMemoryChatDirectory {
    members: RwLock<HashMap<ChatId, HashSet<UserId>>>,
    presence: RwLock<HashMap<UserId, StoredPresence>>,
}

impl InMemoryChatDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the member set of a chat.
    pub async fn set_members(&self, chat_id: ChatId, members: impl IntoIterator<Item = UserId>) {
        let mut w = self.members.write().await;
        w.insert(chat_id, members.into_iter().collect());
    }

    /// Last recorded presence for a user, if any write has arrived.
    pub async fn stored_presence(&self, user: UserId) -> Option<StoredPresence> {
        let r = self.presence.read().await;
        r.get(&user).cloned()
    }
}

#[async_trait]
impl ChatDirectory for InMemoryChatDirectory {
    async fn list_chat_members(&self, chat_id: ChatId) -> Result<HashSet<UserId>, DirectoryError> {
        let r = self.members.read().await;
        r.get(&chat_id)
            .cloned()
            .ok_or(DirectoryError::ChatNotFound(chat_id))
    }

    async fn set_online_status(&self, user: UserId, is_online: bool) -> Result<(), DirectoryError> {
        let mut w = self.presence.write().await;
        let entry = w.entry(user).or_insert(StoredPresence {
            is_online,
            last_seen: Utc::now(),
        });
        entry.is_online = is_online;
        // last_seen only moves when the user goes away, like the users table.
        if !is_online {
            entry.last_seen = Utc::now();
        }
        debug!(user = %user, is_online, "Stored presence updated");
        Ok(())
    }
}
