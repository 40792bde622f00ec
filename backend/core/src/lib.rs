pub mod directory;
pub mod error;
pub mod event;
pub mod traits;
pub mod types;

pub use directory::{InMemoryChatDirectory, StoredPresence};
pub use error::{AuthError, DirectoryError, FrameError, HandshakeError, TransportError};
pub use event::{EventKind, RealtimeEvent};
pub use traits::{ChatDirectory, IdentityResolver};
pub use types::{ChatId, Credential, UserId};
