//! # socket-relay-shared
//!
//! Shared error handling and redaction utilities for the socket-relay
//! workspace.
//!
//! This crate provides the foundational types used by every other crate:
//!
//! - Structured error envelopes with stable codes and metadata
//! - Secret detection and redaction for logs and error output
//!
//! ## Design Principles
//!
//! 1. **No workspace dependencies** - This crate only depends on external crates
//! 2. **Serde-compatible** - All public error types support serialization
//! 3. **Safe by default** - Secret-looking values never reach logs unredacted

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod errors;
pub mod redaction;

pub use errors::{
    ErrorClass, ErrorCode, ErrorEnvelope, ErrorKind, ErrorMetadata, REDACTED_VALUE,
    redact_metadata,
};
pub use redaction::{REDACTED, is_secret_key, redact_if_secret};

/// Returns the shared crate version.
#[must_use]
pub const fn shared_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
