//! Change Notifier
//!
//! Every observable subject embeds a [`Notifier`]: the per-subject registry of
//! observers, keyed by property name. Property setters bracket each mutation
//! with [`Observable::will_change_value`] and [`Observable::did_change_value`],
//! which by default forward here.
//!
//! # Ownership
//!
//! The notifier holds observers weakly. It never keeps a subscription alive;
//! whoever started the subscription owns it. The one exception is the
//! anonymous table: subscriptions started without an owner are retained by
//! the subject they observe, and are invalidated when the subject is dropped.
//!
//! # Delivery
//!
//! Delivery is synchronous and in registration order. The observer list is
//! snapshotted under the lock and the lock is released before any callback
//! runs, so callbacks may freely subscribe, unsubscribe or mutate. Each
//! callback runs isolated: a panic in one does not stop delivery to the others
//! and is resumed once they have all run.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use smallvec::SmallVec;

use super::change::Change;
use super::context::DeliveryContext;
use super::handle::ObserverHandle;
use super::observer::Observer;
use super::value::Value;
use super::{ObserverId, PropertyKey, SubjectId};
use crate::config;

/// An entity with independently observable, named properties.
///
/// Implementors embed a [`Notifier`] and expose it through [`notifier`].
/// The remaining methods have defaults; override them to publish values for
/// initial replay and key-path traversal ([`value_for_key`]), or to interpose
/// on notifications ([`will_change_value`], [`did_change_value`]) and
/// registrations ([`add_observer`], [`remove_observer`]).
///
/// [`notifier`]: Observable::notifier
/// [`value_for_key`]: Observable::value_for_key
/// [`will_change_value`]: Observable::will_change_value
/// [`did_change_value`]: Observable::did_change_value
/// [`add_observer`]: Observable::add_observer
/// [`remove_observer`]: Observable::remove_observer
pub trait Observable: Send + Sync + 'static {
    fn notifier(&self) -> &Notifier;

    /// The current value of a single-segment key, if this subject publishes it.
    fn value_for_key(&self, _key: &str) -> Option<Value> {
        None
    }

    fn will_change_value(&self, key: &str) {
        self.notifier().will_change(key);
    }

    fn did_change_value(&self, key: &str, change: Change) {
        self.notifier().did_change(key, change);
    }

    fn add_observer(&self, observer: &Arc<Observer>) {
        self.notifier().add(observer);
    }

    fn remove_observer(&self, observer: &Observer) -> bool {
        self.notifier().remove(observer)
    }
}

struct Entry {
    id: ObserverId,
    observer: Weak<Observer>,
}

type Entries = SmallVec<[Entry; 4]>;

/// Per-subject observer registry.
pub struct Notifier {
    id: SubjectId,
    observers: Mutex<HashMap<PropertyKey, Entries>>,
    anonymous: Mutex<Vec<ObserverHandle>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self {
            id: SubjectId::new(),
            observers: Mutex::new(HashMap::new()),
            anonymous: Mutex::new(Vec::new()),
        }
    }

    /// Identity of the subject embedding this notifier.
    pub fn id(&self) -> SubjectId {
        self.id
    }

    /// Register `observer` under its key.
    pub fn add(&self, observer: &Arc<Observer>) {
        self.observers
            .lock()
            .entry(observer.key().to_string())
            .or_default()
            .push(Entry {
                id: observer.id(),
                observer: Arc::downgrade(observer),
            });
    }

    /// Remove one registration of `observer`. Returns `false` if it was not registered.
    pub fn remove(&self, observer: &Observer) -> bool {
        let mut observers = self.observers.lock();
        let Some(entries) = observers.get_mut(observer.key()) else {
            return false;
        };
        let Some(position) = entries.iter().position(|e| e.id == observer.id()) else {
            return false;
        };
        entries.remove(position);
        if entries.is_empty() {
            observers.remove(observer.key());
        }
        true
    }

    /// Number of live, active registrations for `key`.
    pub fn observer_count(&self, key: &str) -> usize {
        self.observers.lock().get(key).map_or(0, |entries| {
            entries
                .iter()
                .filter(|e| e.observer.upgrade().is_some_and(|o| o.is_active()))
                .count()
        })
    }

    /// Number of live, active registrations across all keys.
    pub fn total_observer_count(&self) -> usize {
        let keys: Vec<PropertyKey> = self.observers.lock().keys().cloned().collect();
        keys.iter().map(|key| self.observer_count(key)).sum()
    }

    /// Raise the will-change phase for `key`.
    pub fn will_change(&self, key: &str) {
        self.dispatch(key, &Change::prior());
    }

    /// Raise the did-change phase for `key`.
    pub fn did_change(&self, key: &str, change: Change) {
        debug_assert!(!change.is_prior, "did_change called with a prior change");
        self.dispatch(key, &change);
    }

    /// Retain a subscription for the lifetime of this subject.
    pub(crate) fn retain_anonymous(&self, handle: ObserverHandle) {
        let mut anonymous = self.anonymous.lock();
        anonymous.retain(|h| h.is_active());
        anonymous.push(handle);
    }

    pub fn anonymous_count(&self) -> usize {
        self.anonymous.lock().iter().filter(|h| h.is_active()).count()
    }

    fn snapshot(&self, key: &str) -> Vec<Arc<Observer>> {
        let mut observers = self.observers.lock();
        let Some(entries) = observers.get_mut(key) else {
            return Vec::new();
        };

        let mut live = Vec::with_capacity(entries.len());
        entries.retain(|entry| match entry.observer.upgrade() {
            Some(observer) if observer.is_active() => {
                live.push(observer);
                true
            }
            _ => false,
        });
        if entries.is_empty() {
            observers.remove(key);
        }
        live
    }

    fn dispatch(&self, key: &str, change: &Change) {
        let observers = self.snapshot(key);
        if observers.is_empty() {
            return;
        }

        let max_depth = config::current().max_delivery_depth;
        if DeliveryContext::depth() >= max_depth {
            tracing::error!(
                subject = %self.id,
                key,
                max_depth,
                "delivery depth exceeded, dropping notification (dependency cycle?)"
            );
            return;
        }

        let mut first_panic = None;
        for observer in observers {
            let result = panic::catch_unwind(AssertUnwindSafe(|| observer.notify(change)));
            if let Err(payload) = result {
                tracing::warn!(subject = %self.id, key, observer = %observer.id(), "observer callback panicked");
                first_panic.get_or_insert(payload);
            }
        }

        if let Some(payload) = first_panic {
            panic::resume_unwind(payload);
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("id", &self.id)
            .field("keys", &self.observers.lock().len())
            .field("anonymous", &self.anonymous.lock().len())
            .finish()
    }
}
