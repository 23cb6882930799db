//! Conditions callers need to tell apart.
//!
//! Everything else travels as `anyhow::Error` with context; batch-level
//! operations (full audit, detection sweep) isolate per-item failures so a
//! single credential or malformed log entry never aborts the whole pass.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Signup collision on username; surfaced to the caller.
    #[error("username already registered")]
    DuplicateCredential,

    /// No wordlist candidate resolved to an existing readable file.
    #[error("no usable wordlist candidate")]
    WordlistUnavailable,

    /// The external cracking tool binary could not be started; a
    /// distinguished terminal audit outcome, not a batch failure.
    #[error("cracking tool unavailable: {0}")]
    ToolUnavailable(String),

    /// I/O on the per-invocation scratch artifact; degrades to a failed
    /// audit result for the one affected user.
    #[error("scratch artifact i/o")]
    ScratchArtifact(#[source] std::io::Error),

    #[error(transparent)]
    Store(#[from] sqlx::Error),
}
