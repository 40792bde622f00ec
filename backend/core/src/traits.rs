use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::{AuthError, DirectoryError};
use crate::types::{ChatId, Credential, UserId};

/// Authentication collaborator: turns a connection credential into a verified
/// identity.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve_identity(&self, credential: &Credential) -> Result<UserId, AuthError>;
}

/// Persistence collaborator: owns chats, memberships, and stored presence.
#[async_trait]
pub trait ChatDirectory: Send + Sync {
    /// All members of a chat, sender included.
    async fn list_chat_members(&self, chat_id: ChatId) -> Result<HashSet<UserId>, DirectoryError>;

    /// Record an online/offline transition. Callers treat this as
    /// fire-and-forget.
    async fn set_online_status(&self, user: UserId, is_online: bool) -> Result<(), DirectoryError>;
}
