//! Stored Properties
//!
//! A [`Property`] is a value cell that notifies through its owner. The owner
//! embeds the cell, binds it once under a key, and publishes its value from
//! [`Observable::value_for_key`]:
//!
//! ```rust,ignore
//! struct Person {
//!     notifier: Notifier,
//!     first: Property<String>,
//! }
//!
//! impl Person {
//!     fn new(first: &str) -> Arc<Self> {
//!         let person = Arc::new(Self {
//!             notifier: Notifier::new(),
//!             first: Property::new(first.to_string()),
//!         });
//!         person.first.bind(&person, "first").unwrap();
//!         person
//!     }
//! }
//!
//! impl Observable for Person {
//!     fn notifier(&self) -> &Notifier {
//!         &self.notifier
//!     }
//!
//!     fn value_for_key(&self, key: &str) -> Option<Value> {
//!         (key == "first").then(|| self.first.to_value())
//!     }
//! }
//! ```
//!
//! Every [`Property::set`] is bracketed by the owner's will-change and
//! did-change notifications for the bound key. The value lock is released
//! before either notification goes out.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use super::link::OwnerLink;
use crate::error::Result;
use crate::observe::{Change, Observable, PropertyValue, Value};

/// Value and owner binding shared by [`Property`] and
/// [`GuardedProperty`](super::GuardedProperty).
pub(crate) struct Slot<T> {
    value: RwLock<T>,
    link: OwnerLink,
}

impl<T: PropertyValue> Slot<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
            link: OwnerLink::new(),
        }
    }

    pub(crate) fn bind<O: Observable>(&self, owner: &Arc<O>, key: &str) -> Result<()> {
        let weak = Arc::downgrade(owner);
        let weak: Weak<dyn Observable> = weak;
        self.link.bind(weak, key)?;
        tracing::trace!(key, owner = %owner.notifier().id(), "property bound");
        Ok(())
    }

    pub(crate) fn key(&self) -> Option<&str> {
        self.link.key()
    }

    pub(crate) fn get(&self) -> T {
        self.value.read().clone()
    }

    pub(crate) fn to_value(&self) -> Value {
        self.value.read().to_value()
    }

    /// Replace the value, notifying through the owner.
    ///
    /// Nothing is stored if the property is unbound or its owner is gone.
    pub(crate) fn apply(&self, value: T) -> Result<()> {
        let (owner, key) = self.link.resolve().inspect_err(|err| {
            tracing::warn!(%err, "property mutated without a live owner");
        })?;

        owner.will_change_value(key);
        let new_value = value.to_value();
        let old = std::mem::replace(&mut *self.value.write(), value);
        owner.did_change_value(key, Change::setting(Some(old.to_value()), Some(new_value)));
        Ok(())
    }
}

/// An observable value owned by a subject.
pub struct Property<T: PropertyValue> {
    slot: Slot<T>,
}

impl<T: PropertyValue> Property<T> {
    pub fn new(value: T) -> Self {
        Self { slot: Slot::new(value) }
    }

    /// Attach this property to `owner` under `key`.
    ///
    /// Call once, from the owner's constructor, after the owner is in an `Arc`.
    pub fn bind<O: Observable>(&self, owner: &Arc<O>, key: &str) -> Result<()> {
        self.slot.bind(owner, key)
    }

    /// The key this property is bound under.
    pub fn key(&self) -> Option<&str> {
        self.slot.key()
    }

    pub fn get(&self) -> T {
        self.slot.get()
    }

    /// Store `value` and notify observers of the owner's key.
    ///
    /// Fails with [`Unbound`](crate::ObserveError::Unbound) or
    /// [`OwnerReleased`](crate::ObserveError::OwnerReleased) without storing.
    pub fn set(&self, value: T) -> Result<()> {
        self.slot.apply(value)
    }

    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(&self.slot.value.read());
        self.set(next)
    }

    /// The current value as published through `value_for_key`.
    pub fn to_value(&self) -> Value {
        self.slot.to_value()
    }
}

impl<T: PropertyValue + Default> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: PropertyValue + fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("key", &self.key())
            .field("value", &*self.slot.value.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ObserveError;
    use crate::observe::{subscribe, Notifier, ObserveOptions};
    use parking_lot::Mutex;

    struct Account {
        notifier: Notifier,
        balance: Property<i64>,
    }

    impl Account {
        fn new(balance: i64) -> Arc<Self> {
            let account = Arc::new(Self {
                notifier: Notifier::new(),
                balance: Property::new(balance),
            });
            account.balance.bind(&account, "balance").unwrap();
            account
        }
    }

    impl Observable for Account {
        fn notifier(&self) -> &Notifier {
            &self.notifier
        }

        fn value_for_key(&self, key: &str) -> Option<Value> {
            (key == "balance").then(|| self.balance.to_value())
        }
    }

    #[test]
    fn set_brackets_the_mutation() {
        let account = Account::new(10);
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_clone = log.clone();

        subscribe(&account, "balance", ObserveOptions::PRIOR, None, move |account, change| {
            log_clone.lock().push((
                change.is_prior,
                account.balance.get(),
                change.old_as::<i64>(),
                change.new_as::<i64>(),
            ));
        })
        .unwrap();

        account.balance.set(25).unwrap();

        assert_eq!(
            *log.lock(),
            vec![(true, 10, None, None), (false, 25, Some(10), Some(25))]
        );
    }

    #[test]
    fn update_derives_from_current_value() {
        let account = Account::new(10);
        account.balance.update(|balance| balance * 3).unwrap();
        assert_eq!(account.balance.get(), 30);
    }

    #[test]
    fn unbound_property_refuses_writes() {
        let property = Property::new(1_u8);
        assert!(matches!(property.set(2), Err(ObserveError::Unbound)));
        assert_eq!(property.get(), 1);
    }

    #[test]
    fn binding_twice_fails() {
        let account = Account::new(0);
        let err = account.balance.bind(&account, "other").unwrap_err();
        assert!(matches!(err, ObserveError::AlreadyBound { .. }));
        assert_eq!(account.balance.key(), Some("balance"));
    }

    #[test]
    fn released_owner_refuses_writes() {
        let account = Account::new(5);
        let orphan = Property::new(0_i64);
        orphan.bind(&account, "balance").unwrap();

        drop(account);
        assert!(matches!(orphan.set(1), Err(ObserveError::OwnerReleased { .. })));
    }
}
