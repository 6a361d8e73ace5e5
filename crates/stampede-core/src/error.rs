use thiserror::Error;

/// Boxed error for loader and source-of-truth callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Convenience result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error types for stampede operations.
///
/// Capacity ("no stock") and conflict ("duplicate purchase") outcomes are
/// *not* errors — they are values of [`crate::Admission`] and are never
/// retried. This enum covers the remaining taxonomy: transient
/// infrastructure failures, lock contention, corruption, and failures
/// propagated out of caller-supplied loaders.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The backing store (Redis, queue) failed or was unreachable.
    /// Transient: retried with backoff by the recovery loop, surfaced as a
    /// generic failure on synchronous paths.
    #[error("backend error: {0}")]
    Backend(String),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Time formatting error (id generator date bucket)
    #[error("time formatting error: {0}")]
    TimeFormat(#[from] time::error::Format),

    /// A logical-expiry envelope failed to deserialize. Treated as a cache
    /// miss by readers — partial data is never served.
    #[error("corrupt cache entry at key {key}")]
    CorruptEntry { key: String },

    /// A named lock was held by another process.
    #[error("lock contended: {name}")]
    LockContended { name: String },

    /// The caller-supplied source-of-truth callback failed.
    #[error("source of truth error: {0}")]
    Source(#[source] BoxError),
}

impl CoreError {
    /// Create a new Backend error from any displayable cause.
    pub fn backend(message: impl ToString) -> Self {
        Self::Backend(message.to_string())
    }

    /// Wrap a loader / source-of-truth failure.
    pub fn source(err: impl Into<BoxError>) -> Self {
        Self::Source(err.into())
    }

    /// Whether retrying this error later can reasonably succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Backend(_) | Self::Source(_) | Self::LockContended { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(CoreError::backend("connection reset").is_transient());
        assert!(
            CoreError::LockContended {
                name: "lock:order:1".into()
            }
            .is_transient()
        );
        assert!(
            !CoreError::CorruptEntry {
                key: "cache:shop:1".into()
            }
            .is_transient()
        );
    }
}
