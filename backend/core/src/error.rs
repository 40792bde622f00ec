use thiserror::Error;

use crate::types::ChatId;

/// The connection never produced a usable identity; it is closed without
/// registering.
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("missing identity")]
    MissingIdentity,

    #[error("identity rejected: {0}")]
    Rejected(#[from] AuthError),
}

/// Failure on an established connection. Only ever tears down that connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,

    #[error("outbound queue full")]
    QueueFull,
}

/// Returned by the authentication collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("malformed identity: {0}")]
    Malformed(String),

    #[error("invalid credentials")]
    InvalidCredentials,
}

/// Returned by the persistence collaborator.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("chat {0} not found")]
    ChatNotFound(ChatId),
}

/// An inbound frame that could not be decoded. The frame is discarded; the
/// connection stays up.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_wraps_auth_error() {
        let err: HandshakeError = AuthError::Malformed("abc".into()).into();
        assert_eq!(err.to_string(), "identity rejected: malformed identity: abc");
    }

    #[test]
    fn test_frame_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: FrameError = json_err.into();
        assert!(err.to_string().starts_with("malformed frame"));
    }
}
