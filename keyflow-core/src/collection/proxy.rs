//! Observable Collection Proxy
//!
//! Stands in for a collection-valued property during key-path observation.
//! Every observer registered on the proxy (a "request") is registered on
//! each current element instead, so the proxy fans element changes out to
//! whoever observes through it.
//!
//! # Invariant
//!
//! Each live request is registered exactly once on each current element.
//! When the collection is replaced, every request is first removed from all
//! old elements and then added to all new ones. Elements are compared by
//! identity; an element present before and after ends up registered once.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::{ObserveError, Result};
use crate::observe::{Notifier, Observable, ObserveOptions, Observer, ObserverHandle, PropertyKey, Value};

pub struct CollectionProxy {
    notifier: Notifier,
    key: PropertyKey,
    elements: Mutex<Vec<Arc<dyn Observable>>>,
    requests: Mutex<Vec<Weak<Observer>>>,
    tracking: Mutex<Option<ObserverHandle>>,
}

impl CollectionProxy {
    /// A proxy over `owner`'s collection at `key`, following later replacements.
    ///
    /// Fails with `NotACollection` unless `key` currently reads as a collection.
    pub(crate) fn new(owner: &Arc<dyn Observable>, key: &str) -> Result<Arc<Self>> {
        let elements = owner
            .value_for_key(key)
            .and_then(Value::into_collection)
            .ok_or_else(|| ObserveError::NotACollection { key: key.to_string() })?;
        let proxy = Arc::new(Self {
            notifier: Notifier::new(),
            key: key.to_string(),
            elements: Mutex::new(elements),
            requests: Mutex::new(Vec::new()),
            tracking: Mutex::new(None),
        });

        let weak_proxy = Arc::downgrade(&proxy);
        let weak_owner = Arc::downgrade(owner);
        let tracking = ObserverHandle::create(owner, key, ObserveOptions::empty(), move |change| {
            if change.is_prior {
                return;
            }
            let (Some(proxy), Some(owner)) = (weak_proxy.upgrade(), weak_owner.upgrade()) else {
                return;
            };
            let elements = owner
                .value_for_key(&proxy.key)
                .and_then(Value::into_collection)
                .unwrap_or_default();
            proxy.set_collection(elements);
        })?;
        tracking.start();
        *proxy.tracking.lock() = Some(tracking);

        tracing::trace!(key, proxy = %proxy.notifier.id(), "collection proxy created");
        Ok(proxy)
    }

    /// The owner's key this proxy wraps.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Snapshot of the current elements.
    pub fn elements(&self) -> Vec<Arc<dyn Observable>> {
        self.elements.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.elements.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of live subscription requests.
    pub fn request_count(&self) -> usize {
        self.live_requests().len()
    }

    /// Replace the element snapshot, moving every request from the old
    /// elements to the new ones.
    pub fn set_collection(&self, elements: Vec<Arc<dyn Observable>>) {
        let requests = self.live_requests();
        let old = std::mem::replace(&mut *self.elements.lock(), elements.clone());

        for request in &requests {
            for element in &old {
                element.remove_observer(request);
            }
        }
        for request in &requests {
            for element in &elements {
                element.add_observer(request);
            }
        }
        tracing::trace!(
            key = %self.key,
            removed = old.len(),
            added = elements.len(),
            requests = requests.len(),
            "collection replaced"
        );
    }

    fn live_requests(&self) -> Vec<Arc<Observer>> {
        let mut requests = self.requests.lock();
        let mut live = Vec::with_capacity(requests.len());
        requests.retain(|request| match request.upgrade() {
            Some(observer) if observer.is_active() => {
                live.push(observer);
                true
            }
            _ => false,
        });
        live
    }
}

impl Observable for CollectionProxy {
    fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    fn value_for_key(&self, key: &str) -> Option<Value> {
        (key == "count").then(|| Value::scalar(self.len()))
    }

    fn add_observer(&self, observer: &Arc<Observer>) {
        self.requests.lock().push(Arc::downgrade(observer));
        for element in self.elements() {
            element.add_observer(observer);
        }
    }

    fn remove_observer(&self, observer: &Observer) -> bool {
        let removed = {
            let mut requests = self.requests.lock();
            let position = requests
                .iter()
                .position(|request| request.upgrade().is_some_and(|r| r.id() == observer.id()));
            position.map(|index| requests.remove(index)).is_some()
        };
        if removed {
            for element in self.elements() {
                element.remove_observer(observer);
            }
        }
        removed
    }
}

impl Drop for CollectionProxy {
    fn drop(&mut self) {
        let requests = self.live_requests();
        let elements = std::mem::take(self.elements.get_mut());
        for request in &requests {
            for element in &elements {
                element.remove_observer(request);
            }
        }
    }
}

impl fmt::Debug for CollectionProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionProxy")
            .field("key", &self.key)
            .field("elements", &self.len())
            .field("requests", &self.requests.lock().len())
            .finish()
    }
}
