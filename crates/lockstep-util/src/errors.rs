use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all lockstep operations.
#[derive(Debug, Error, Diagnostic)]
pub enum LockstepError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or malformed manifest or lockfile.
    #[error("Manifest error: {message}")]
    #[diagnostic(help("Check your Lockstep.toml and Lockstep.lock for syntax errors"))]
    Manifest { message: String },

    /// Invalid global configuration.
    #[error("Config error: {message}")]
    Config { message: String },

    /// Manifest and lockfile disagree about the pinned version of a dependency.
    #[error("Inconsistent dependency data for {name}: {left} vs {right}")]
    #[diagnostic(help("Regenerate the lockfile so it agrees with the manifest"))]
    DataInconsistency {
        name: String,
        left: String,
        right: String,
    },

    /// A pinned version vanished upstream and unlocking it did not help.
    #[error("Missing pinned version for {name} after {:.1}s: {message}", .elapsed.as_secs_f64())]
    MissingPinnedVersionUnrecoverable {
        name: String,
        message: String,
        elapsed: Duration,
    },

    /// No safe unlock expansion exists, or multi-unlock is disabled.
    #[error(
        "Unresolvable version conflict involving {} after {:.1}s: {message}",
        .names.join(", "),
        .elapsed.as_secs_f64()
    )]
    #[diagnostic(help("Try allowing other dependencies to be updated, or relax a top-level requirement"))]
    VersionConflictUnrecoverable {
        names: Vec<String>,
        message: String,
        elapsed: Duration,
    },

    /// Two consecutive transient failures.
    #[error("Resolver failed twice with transient errors after {:.1}s: {message}", .elapsed.as_secs_f64())]
    TransientExhausted { message: String, elapsed: Duration },

    /// The solver rejected the files outright.
    #[error("Dependency files not resolvable after {:.1}s: {message}", .elapsed.as_secs_f64())]
    Unresolvable { message: String, elapsed: Duration },

    /// A requirement cannot be rewritten mechanically.
    #[error("Requirement {constraint:?} is not rewritable: {reason}")]
    NotRewritable { constraint: String, reason: String },

    /// The resolver helper process misbehaved (bad envelope, spawn failure).
    #[error("Resolver helper error: {message}")]
    Helper { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

impl LockstepError {
    /// Whether this error aborts the whole update attempt.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, LockstepError::NotRewritable { .. })
    }
}
