//! Owner-scoped subscriptions.
//!
//! An owner embeds an [`ObserverTable`] to hold the subscriptions it starts.
//! The table allows at most one subscription per (subject, key path) and
//! invalidates everything it holds when dropped, so an owner's death never
//! leaves callbacks behind.
//!
//! [`subscribe`] and [`unsubscribe`] are the entry points: with an owner the
//! subscription lands in the owner's table; without one it is retained by the
//! subject itself and lives exactly as long as the subject.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::change::{Change, ObserveOptions, TypedChange};
use super::handle::ObserverHandle;
use super::key::Key;
use super::notifier::Observable;
use super::{ObserverId, PropertyKey, SubjectId};
use crate::error::{ObserveError, Result};

type Slot = (SubjectId, PropertyKey);

/// The subscriptions held on behalf of one owner.
#[derive(Default)]
pub struct ObserverTable {
    entries: Mutex<IndexMap<Slot, ObserverHandle>>,
}

impl ObserverTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start observing `path` on `subject` on behalf of this table's owner.
    ///
    /// Fails with [`ObserveError::DuplicateSubscription`] if this owner already
    /// observes the same path on the same subject.
    pub fn observe<S, F>(
        &self,
        subject: &Arc<S>,
        path: &str,
        options: ObserveOptions,
        callback: F,
    ) -> Result<ObserverId>
    where
        S: Observable,
        F: Fn(&Arc<S>, &Change) + Send + Sync + 'static,
    {
        let slot = (subject.notifier().id(), path.to_string());
        let weak = Arc::downgrade(subject);
        let root: Arc<dyn Observable> = subject.clone();
        let handle = ObserverHandle::create(&root, path, options, move |change| {
            if let Some(subject) = weak.upgrade() {
                callback(&subject, change);
            }
        })?;

        let id = handle.id();
        let inner = handle.shared();
        {
            let mut entries = self.entries.lock();
            if let Some(existing) = entries.get(&slot) {
                if existing.is_active() {
                    tracing::warn!(subject = %slot.0, path, "duplicate owned subscription rejected");
                    return Err(ObserveError::DuplicateSubscription {
                        subject: slot.0,
                        key: slot.1,
                    });
                }
            }
            entries.insert(slot, handle);
        }

        // Started outside the lock: the initial replay may call back into this table.
        inner.start();
        Ok(id)
    }

    /// Invalidate and forget the subscription for `path` on `subject`.
    ///
    /// Returns `false` if there was none.
    pub fn stop_observing<S>(&self, subject: &S, path: &str) -> bool
    where
        S: Observable + ?Sized,
    {
        let slot = (subject.notifier().id(), path.to_string());
        let removed = self.entries.lock().shift_remove(&slot);
        match removed {
            Some(handle) => {
                handle.invalidate();
                true
            }
            None => false,
        }
    }

    /// Whether a live subscription exists for `path` on `subject`.
    pub fn contains(&self, subject: SubjectId, path: &str) -> bool {
        self.entries
            .lock()
            .get(&(subject, path.to_string()))
            .is_some_and(ObserverHandle::is_active)
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.entries.lock().values().filter(|h| h.is_active()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invalidate every subscription held by this table.
    pub fn clear(&self) {
        let drained: Vec<ObserverHandle> = {
            let mut entries = self.entries.lock();
            entries.drain(..).map(|(_, handle)| handle).collect()
        };
        drop(drained);
    }
}

impl Drop for ObserverTable {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for ObserverTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.lock().values()).finish()
    }
}

/// Observe `path` on `subject`.
///
/// With an `owner`, the subscription belongs to the owner's table (one per
/// subject and path; duplicates are rejected). Without one, it is retained by
/// `subject` and ends when the subject is dropped.
pub fn subscribe<S, F>(
    subject: &Arc<S>,
    path: &str,
    options: ObserveOptions,
    owner: Option<&ObserverTable>,
    callback: F,
) -> Result<ObserverId>
where
    S: Observable,
    F: Fn(&Arc<S>, &Change) + Send + Sync + 'static,
{
    if let Some(owner) = owner {
        return owner.observe(subject, path, options, callback);
    }

    let weak = Arc::downgrade(subject);
    let root: Arc<dyn Observable> = subject.clone();
    let handle = ObserverHandle::create(&root, path, options, move |change| {
        if let Some(subject) = weak.upgrade() {
            callback(&subject, change);
        }
    })?;
    let id = handle.id();
    let inner = handle.shared();
    subject.notifier().retain_anonymous(handle);
    inner.start();
    Ok(id)
}

/// Observe a typed key, receiving changes downcast to the key's value type.
pub fn subscribe_key<S, V, F>(
    subject: &Arc<S>,
    key: Key<S, V>,
    options: ObserveOptions,
    owner: Option<&ObserverTable>,
    callback: F,
) -> Result<ObserverId>
where
    S: Observable,
    V: Clone + 'static,
    F: Fn(&Arc<S>, TypedChange<V>) + Send + Sync + 'static,
{
    subscribe(subject, key.name(), options, owner, move |subject, change| {
        callback(subject, change.typed::<V>());
    })
}

/// Stop the subscription `owner` holds for `path` on `subject`. No-op if absent.
pub fn unsubscribe<S>(owner: &ObserverTable, subject: &S, path: &str) -> bool
where
    S: Observable + ?Sized,
{
    owner.stop_observing(subject, path)
}
