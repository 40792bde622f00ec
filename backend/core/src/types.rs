use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Authenticated user a connection belongs to.
///
/// Numeric to match the persistence layer's primary keys; serialized as a bare
/// integer on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// Chat (direct or group) identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(UserId)
    }
}

/// What a client presented when opening its real-time channel.
///
/// `subject` is the identity segment of the connect path; `token` is the
/// optional bearer credential from the query string.
#[derive(Debug, Clone, Default)]
pub struct Credential {
    pub subject: String,
    pub token: Option<String>,
}

impl Credential {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}
