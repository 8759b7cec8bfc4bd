//! One-time binding of a property cell to its owner.

use std::sync::{Arc, OnceLock, Weak};

use crate::error::{ObserveError, Result};
use crate::observe::{Observable, PropertyKey};

/// The owner and key a property notifies through.
///
/// Set exactly once, from the owner's constructor, after the owner has been
/// placed in an `Arc`.
#[derive(Default)]
pub(crate) struct OwnerLink {
    slot: OnceLock<(Weak<dyn Observable>, PropertyKey)>,
}

impl OwnerLink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn bind(&self, owner: Weak<dyn Observable>, key: &str) -> Result<()> {
        self.slot
            .set((owner, key.to_string()))
            .map_err(|_| ObserveError::AlreadyBound {
                key: self.key().unwrap_or_default().to_string(),
            })?;
        Ok(())
    }

    pub(crate) fn key(&self) -> Option<&str> {
        self.slot.get().map(|(_, key)| key.as_str())
    }

    /// The live owner and key, or why there is none.
    pub(crate) fn resolve(&self) -> Result<(Arc<dyn Observable>, &str)> {
        let (owner, key) = self.slot.get().ok_or(ObserveError::Unbound)?;
        let owner = owner.upgrade().ok_or_else(|| ObserveError::OwnerReleased { key: key.clone() })?;
        Ok((owner, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::Notifier;

    struct Owner {
        notifier: Notifier,
    }

    impl Observable for Owner {
        fn notifier(&self) -> &Notifier {
            &self.notifier
        }
    }

    #[test]
    fn unbound_link_reports_unbound() {
        let link = OwnerLink::new();
        assert!(matches!(link.resolve(), Err(ObserveError::Unbound)));
    }

    #[test]
    fn binding_twice_fails() {
        let owner: Arc<dyn Observable> = Arc::new(Owner { notifier: Notifier::new() });
        let link = OwnerLink::new();

        link.bind(Arc::downgrade(&owner), "name").unwrap();
        let err = link.bind(Arc::downgrade(&owner), "other").unwrap_err();

        assert!(matches!(err, ObserveError::AlreadyBound { key } if key == "name"));
        assert_eq!(link.key(), Some("name"));
    }

    #[test]
    fn released_owner_is_reported() {
        let owner: Arc<dyn Observable> = Arc::new(Owner { notifier: Notifier::new() });
        let link = OwnerLink::new();
        link.bind(Arc::downgrade(&owner), "name").unwrap();

        drop(owner);
        assert!(matches!(link.resolve(), Err(ObserveError::OwnerReleased { .. })));
    }
}
