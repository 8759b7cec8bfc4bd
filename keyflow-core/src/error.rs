//! Error types for the observation layer.
//!
//! Contract violations (duplicate owned subscriptions, mutating a property that
//! was never bound to its owner) are reported as errors in every build rather
//! than asserted, so callers decide whether they are fatal.

use thiserror::Error;

use crate::observe::{PropertyKey, SubjectId};

/// Errors returned by the observation layer.
#[derive(Debug, Error)]
pub enum ObserveError {
    /// The owner already holds a live subscription for this subject and key.
    ///
    /// Unsubscribe first; an existing subscription is never overwritten.
    #[error("owner already observes `{key}` on subject {subject}")]
    DuplicateSubscription { subject: SubjectId, key: PropertyKey },

    /// A property or computed value was used before being bound to its owner.
    #[error("property is not bound to an owner")]
    Unbound,

    /// `bind` was called a second time.
    #[error("property is already bound as `{key}`")]
    AlreadyBound { key: PropertyKey },

    /// The owner of a bound property has been dropped.
    #[error("owner of `{key}` has been released")]
    OwnerReleased { key: PropertyKey },

    /// A key path is empty, has an empty segment, or misuses the collection marker.
    #[error("invalid key path `{key}`: {reason}")]
    InvalidKey { key: String, reason: &'static str },

    /// A `$key` was read for a key whose value is not a collection.
    #[error("`{key}` does not hold a collection")]
    NotACollection { key: PropertyKey },

    /// No tokio runtime is running on the calling thread.
    #[error("no tokio runtime on the current thread")]
    NoRuntime,

    /// The mutation thread must be backed by a current-thread runtime.
    #[error("the mutation thread requires a current-thread tokio runtime")]
    MultiThreadRuntime,

    /// The mutation thread shut down before applying a marshaled write.
    #[error("mutation thread stopped before applying the write")]
    MutationThreadStopped,
}

/// Result alias used throughout the crate.
pub type Result<T, E = ObserveError> = std::result::Result<T, E>;
