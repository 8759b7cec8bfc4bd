//! Live Subscription Registry
//!
//! A process-wide index of every started, not-yet-invalidated subscription.
//! It does not participate in delivery (notifiers hold their own weak lists);
//! it exists so leaks can be detected: once an owner is dropped, none of the
//! subscriptions it held should remain here.
//!
//! # Thread Safety
//!
//! Backed by a `DashMap`, so registration from different subjects does not
//! contend on a single lock.

use std::sync::OnceLock;

use dashmap::DashMap;

use super::{ObserverId, PropertyKey, SubjectId};

/// What a live subscription observes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub subject: SubjectId,
    pub path: PropertyKey,
}

static REGISTRY: OnceLock<DashMap<ObserverId, Registration>> = OnceLock::new();

fn get_registry() -> &'static DashMap<ObserverId, Registration> {
    REGISTRY.get_or_init(DashMap::new)
}

/// Record a started subscription.
pub(crate) fn register(id: ObserverId, subject: SubjectId, path: &str) {
    get_registry().insert(
        id,
        Registration {
            subject,
            path: path.to_string(),
        },
    );
}

/// Forget a subscription. No-op if it was never registered.
pub(crate) fn unregister(id: ObserverId) {
    get_registry().remove(&id);
}

/// Whether the subscription is started and not yet invalidated.
pub fn is_live(id: ObserverId) -> bool {
    get_registry().contains_key(&id)
}

/// The registration for a live subscription.
pub fn lookup(id: ObserverId) -> Option<Registration> {
    get_registry().get(&id).map(|entry| entry.value().clone())
}

/// Number of live subscriptions whose root is `subject`.
pub fn live_count_for(subject: SubjectId) -> usize {
    get_registry()
        .iter()
        .filter(|entry| entry.value().subject == subject)
        .count()
}

/// Number of live subscriptions in the process.
pub fn live_count() -> usize {
    get_registry().len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_registers_and_unregisters() {
        let id = ObserverId::new();
        let subject = SubjectId::new();

        register(id, subject, "name");
        assert!(is_live(id));
        assert_eq!(live_count_for(subject), 1);
        assert_eq!(
            lookup(id),
            Some(Registration {
                subject,
                path: "name".to_string()
            })
        );

        unregister(id);
        assert!(!is_live(id));
        assert_eq!(live_count_for(subject), 0);
    }

    #[test]
    fn unregistering_unknown_id_is_a_no_op() {
        unregister(ObserverId::new());
    }
}
