//! Identifiers for subjects and observers.
//!
//! Subjects are compared by identity, never by value. Every [`Notifier`]
//! receives a fresh [`SubjectId`] when it is created, and every subscription
//! receives a fresh [`ObserverId`].
//!
//! [`Notifier`]: super::Notifier

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of an observable subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubjectId(u64);

impl SubjectId {
    /// Generate a new unique subject ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<u64> for SubjectId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of one registration.
///
/// Used to match registrations on removal and to key the global registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Generate a new unique observer ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observer_ids_are_unique() {
        let id1 = ObserverId::new();
        let id2 = ObserverId::new();
        let id3 = ObserverId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn subject_ids_are_unique() {
        assert_ne!(SubjectId::new(), SubjectId::new());
    }

    #[test]
    fn subject_id_displays_raw_value() {
        assert_eq!(SubjectId::from(42).to_string(), "#42");
        assert_eq!(SubjectId::from(42).raw(), 42);
    }
}
