//! Connection handshake.
//!
//! Identity verification belongs to the authentication service; this module
//! only hands the credential to an [`IdentityResolver`] and maps the answer
//! into a handshake result.

use async_trait::async_trait;
use liime_core::{AuthError, Credential, HandshakeError, IdentityResolver, UserId};

/// WebSocket close code for a connection whose identity could not be
/// established.
pub const CLOSE_IDENTITY_INVALID: u16 = 4002;

/// Trusts the numeric user id in the connect path.
///
/// The default for a standalone deployment, where the authentication service
/// sits in front of the gateway and only forwards verified paths.
#[derive(Debug, Default, Clone)]
pub struct PathIdentityResolver;

#[async_trait]
impl IdentityResolver for PathIdentityResolver {
    async fn resolve_identity(&self, credential: &Credential) -> Result<UserId, AuthError> {
        let user: UserId = credential
            .subject
            .parse()
            .map_err(|_| AuthError::Malformed(credential.subject.clone()))?;
        if user.0 <= 0 {
            return Err(AuthError::Malformed(credential.subject.clone()));
        }
        Ok(user)
    }
}

/// Run the `Connecting` step: establish who is on the other end.
pub async fn handshake(
    resolver: &dyn IdentityResolver,
    credential: &Credential,
) -> Result<UserId, HandshakeError> {
    if credential.subject.trim().is_empty() {
        return Err(HandshakeError::MissingIdentity);
    }
    Ok(resolver.resolve_identity(credential).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DenyAll;

    #[async_trait]
    impl IdentityResolver for DenyAll {
        async fn resolve_identity(&self, _credential: &Credential) -> Result<UserId, AuthError> {
            Err(AuthError::InvalidCredentials)
        }
    }

    #[tokio::test]
    async fn test_path_identity() {
        let user = handshake(&PathIdentityResolver, &Credential::new("42")).await.unwrap();
        assert_eq!(user, UserId(42));
    }

    #[tokio::test]
    async fn test_rejects_non_numeric_and_non_positive() {
        for subject in ["alice", "0", "-3"] {
            let err = handshake(&PathIdentityResolver, &Credential::new(subject))
                .await
                .unwrap_err();
            assert!(matches!(err, HandshakeError::Rejected(AuthError::Malformed(_))), "{subject}");
        }
    }

    #[tokio::test]
    async fn test_missing_identity() {
        let err = handshake(&PathIdentityResolver, &Credential::new("  ")).await.unwrap_err();
        assert!(matches!(err, HandshakeError::MissingIdentity));
    }

    #[tokio::test]
    async fn test_resolver_rejection_propagates() {
        let err = handshake(&DenyAll, &Credential::new("1").with_token("t")).await.unwrap_err();
        assert!(matches!(err, HandshakeError::Rejected(AuthError::InvalidCredentials)));
    }
}
