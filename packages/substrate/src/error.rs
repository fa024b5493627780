//! Error types for the substrate layer.
//!
//! Errors at this level are transport and store focused. Semantic errors
//! (codec failures, typed lookups) belong in higher layers.

use thiserror::Error;

/// Errors reported by a substrate implementation.
#[derive(Error, Debug)]
pub enum SubstrateError {
    /// The key has no live value.
    #[error("key not found: {key}")]
    NotFound {
        /// The key that was looked up.
        key: String,
    },

    /// The key has no entry at the requested revision.
    #[error("revision {revision} not found for key: {key}")]
    RevisionNotFound {
        /// The key that was looked up.
        key: String,
        /// The revision that was requested.
        revision: u64,
    },

    /// Create on a key that already holds a live value.
    #[error("key already exists: {key} (current revision {revision})")]
    AlreadyExists {
        /// The key that already exists.
        key: String,
        /// The key's current revision.
        revision: u64,
    },

    /// Update with a stale expected revision.
    #[error("wrong last revision for key {key}: expected {expected}, current {current}")]
    WrongLastRevision {
        /// The key being updated.
        key: String,
        /// The revision the caller expected.
        expected: u64,
        /// The key's actual current revision (0 if the key is absent).
        current: u64,
    },

    /// A subject or key pattern failed validation.
    #[error("invalid subject: {subject}")]
    InvalidSubject {
        /// The offending subject.
        subject: String,
    },

    /// The subscription or connection has been closed.
    #[error("subscription closed")]
    Closed,

    /// Generic transport failure from the underlying messaging system.
    #[error("transport error: {0}")]
    Transport(Box<dyn std::error::Error + Send + Sync>),
}

impl SubstrateError {
    /// True for absent key or revision lookups.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SubstrateError::NotFound { .. } | SubstrateError::RevisionNotFound { .. }
        )
    }

    /// True for the optimistic-concurrency failures: create on an existing
    /// key, or update with a stale revision.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            SubstrateError::AlreadyExists { .. } | SubstrateError::WrongLastRevision { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let e = SubstrateError::NotFound {
            key: "foo".to_string(),
        };
        assert_eq!(format!("{}", e), "key not found: foo");

        let e = SubstrateError::WrongLastRevision {
            key: "foo".to_string(),
            expected: 3,
            current: 5,
        };
        assert!(format!("{}", e).contains("expected 3"));
        assert!(format!("{}", e).contains("current 5"));
    }

    #[test]
    fn not_found_predicate() {
        assert!(SubstrateError::NotFound {
            key: "k".to_string()
        }
        .is_not_found());
        assert!(SubstrateError::RevisionNotFound {
            key: "k".to_string(),
            revision: 2
        }
        .is_not_found());
        assert!(!SubstrateError::Closed.is_not_found());
    }

    #[test]
    fn conflict_predicate() {
        assert!(SubstrateError::AlreadyExists {
            key: "k".to_string(),
            revision: 1
        }
        .is_conflict());
        assert!(SubstrateError::WrongLastRevision {
            key: "k".to_string(),
            expected: 1,
            current: 2
        }
        .is_conflict());
        assert!(!SubstrateError::NotFound {
            key: "k".to_string()
        }
        .is_conflict());
    }

    #[test]
    fn transport_display_includes_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let e = SubstrateError::Transport(Box::new(io));
        assert!(format!("{}", e).contains("pipe closed"));
    }
}
