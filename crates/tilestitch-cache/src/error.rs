//! Error types for the cache crate.

use thiserror::Error;

/// Errors that can occur while operating a retrieval cache.
///
/// Failures inside a [`Producer`](crate::Producer) are never reported through
/// this type: they are converted into a cache miss at the cache boundary.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error on the cache directory itself.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Walking the cache directory failed during the warm scan.
    #[error("Failed to scan cache directory: {0}")]
    Scan(#[from] walkdir::Error),

    /// Cache lock was poisoned (a thread panicked while holding the lock).
    #[error("Cache lock was poisoned")]
    LockPoisoned,

    /// A key that would escape the cache root or is otherwise unusable.
    #[error("Invalid cache key '{0}'")]
    InvalidKey(String),

    /// A textual size or quantity that cannot be parsed.
    #[error("Invalid value: '{0}'")]
    InvalidValue(String),

    /// A textual quantity with an unknown unit suffix.
    #[error("Unknown multiplier '{multiplier}' in '{value}'. Valid multipliers are: {valid}")]
    InvalidMultiplier {
        /// Full value being parsed.
        value: String,
        /// The unrecognised suffix.
        multiplier: String,
        /// Comma separated list of recognised suffixes.
        valid: String,
    },

    /// No cache was configured under the requested namespace.
    #[error("Unknown cache namespace '{name}'. Valid namespaces are: {valid}")]
    UnknownNamespace {
        /// Requested namespace.
        name: String,
        /// Comma separated list of configured namespaces.
        valid: String,
    },
}
