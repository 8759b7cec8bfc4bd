//! Segment-level registrations.
//!
//! An [`Observer`] is what a subject's [`Notifier`](super::Notifier) actually
//! stores (weakly): one callback interested in one property name. A
//! subscription on a dotted key path owns one `Observer` per segment, and a
//! collection proxy registers the same `Observer` on every element.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::change::Change;
use super::context::DeliveryContext;
use super::{ObserverId, PropertyKey};

pub(crate) type Delivery = Arc<dyn Fn(&Change) + Send + Sync>;

/// One callback registered for one property name.
pub struct Observer {
    id: ObserverId,
    key: PropertyKey,
    wants_prior: bool,
    invalidated: AtomicBool,
    deliver: Mutex<Option<Delivery>>,
}

impl Observer {
    pub(crate) fn new<F>(key: impl Into<PropertyKey>, wants_prior: bool, deliver: F) -> Arc<Self>
    where
        F: Fn(&Change) + Send + Sync + 'static,
    {
        Arc::new(Self {
            id: ObserverId::new(),
            key: key.into(),
            wants_prior,
            invalidated: AtomicBool::new(false),
            deliver: Mutex::new(Some(Arc::new(deliver))),
        })
    }

    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// The single property name this observer is registered under.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_active(&self) -> bool {
        !self.invalidated.load(Ordering::Acquire)
    }

    /// Invoke the callback for `change`.
    ///
    /// The callback is cloned out of its slot before running, so the lock is
    /// never held while user code executes.
    pub(crate) fn notify(&self, change: &Change) {
        if change.is_prior && !self.wants_prior {
            return;
        }

        let deliver = self.deliver.lock().clone();
        let Some(deliver) = deliver else { return };
        if !self.is_active() {
            return;
        }

        let _ctx = DeliveryContext::enter(self.id);
        deliver(change);
    }

    /// Stop delivering and release the callback. Returns `false` if already invalidated.
    pub(crate) fn invalidate(&self) -> bool {
        if self.invalidated.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.deliver.lock().take();
        true
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("active", &self.is_active())
            .finish()
    }
}
