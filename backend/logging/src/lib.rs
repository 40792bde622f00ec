//! Structured logging for the Liime server.
//!
//! Handles console and rolling NDJSON output, credential redaction, and
//! delivery event records.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{DeliveryEvent, DeliveryEventLogger, DeliveryLogEntry};
pub use logger::init_logger;
pub use redact::redact_sensitive_data;
