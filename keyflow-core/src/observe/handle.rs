//! Observer Handles
//!
//! An [`ObserverHandle`] is one live subscription: a root subject, a key path,
//! delivery options and a callback.
//!
//! # Lifecycle
//!
//! ```text
//! Created --start()--> Active --invalidate()--> Invalidated
//! ```
//!
//! Invalidation is idempotent and terminal: the callback and everything it
//! captured are released immediately, and no notification is delivered
//! afterwards, including one already being dispatched. Dropping the handle
//! invalidates it.
//!
//! If the callback invalidates its own handle while it is being called for the
//! initial-value replay, deregistration waits until the replay has unwound.
//!
//! # Key paths
//!
//! For a path `a.b.c` the handle registers one segment observer per level:
//! `a` on the root, `b` on the object currently at `a`, `c` on the object
//! currently at `a.b`. When an intermediate level changes, every deeper level
//! is torn down and rebuilt against the new object before the callback runs,
//! so the callback always observes a consistent chain.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::change::{Change, ObserveOptions};
use super::context::DeliveryContext;
use super::notifier::Observable;
use super::observer::{Delivery, Observer};
use super::value::Value;
use super::{key, registry, ObserverId, PropertyKey, SubjectId};
use crate::error::Result;

const CREATED: u8 = 0;
const ACTIVE: u8 = 1;
const INVALIDATED: u8 = 2;

/// Lifecycle state of an [`ObserverHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Created,
    Active,
    Invalidated,
}

struct Level {
    subject: Weak<dyn Observable>,
    observer: Arc<Observer>,
}

impl Level {
    fn detach(self) {
        if let Some(subject) = self.subject.upgrade() {
            subject.remove_observer(&self.observer);
        }
        self.observer.invalidate();
    }
}

pub(crate) struct HandleInner {
    id: ObserverId,
    this: Weak<HandleInner>,
    root: Weak<dyn Observable>,
    root_id: SubjectId,
    path: PropertyKey,
    segments: Vec<String>,
    options: ObserveOptions,
    state: AtomicU8,
    deferred: AtomicBool,
    callback: Mutex<Option<Delivery>>,
    levels: Mutex<Vec<Level>>,
}

/// A live subscription. Dropping it invalidates the subscription.
pub struct ObserverHandle {
    inner: Arc<HandleInner>,
}

impl ObserverHandle {
    /// Create a subscription without starting it.
    pub(crate) fn create<F>(
        root: &Arc<dyn Observable>,
        path: &str,
        options: ObserveOptions,
        callback: F,
    ) -> Result<Self>
    where
        F: Fn(&Change) + Send + Sync + 'static,
    {
        let segments = key::segments(path)?;
        let callback: Delivery = Arc::new(callback);
        let inner = Arc::new_cyclic(|this| HandleInner {
            id: ObserverId::new(),
            this: this.clone(),
            root: Arc::downgrade(root),
            root_id: root.notifier().id(),
            path: path.to_string(),
            segments,
            options,
            state: AtomicU8::new(CREATED),
            deferred: AtomicBool::new(false),
            callback: Mutex::new(Some(callback)),
            levels: Mutex::new(Vec::new()),
        });
        Ok(Self { inner })
    }

    /// Observe `path` on `subject` for as long as the returned handle lives.
    ///
    /// The callback receives the subject and the change. The handle holds the
    /// subject weakly; once the subject is gone the callback is never called.
    pub fn observe<S, F>(
        subject: &Arc<S>,
        path: &str,
        options: ObserveOptions,
        callback: F,
    ) -> Result<Self>
    where
        S: Observable,
        F: Fn(&Arc<S>, &Change) + Send + Sync + 'static,
    {
        let weak = Arc::downgrade(subject);
        let root: Arc<dyn Observable> = subject.clone();
        let handle = Self::create(&root, path, options, move |change| {
            if let Some(subject) = weak.upgrade() {
                callback(&subject, change);
            }
        })?;
        handle.start();
        Ok(handle)
    }

    pub(crate) fn shared(&self) -> Arc<HandleInner> {
        self.inner.clone()
    }

    /// Register with every subject along the path and replay if requested.
    ///
    /// Has no effect unless the handle is freshly created.
    pub fn start(&self) {
        self.inner.start();
    }

    /// Stop the subscription. Safe to call repeatedly and from inside callbacks.
    pub fn invalidate(&self) {
        self.inner.invalidate();
    }

    pub fn id(&self) -> ObserverId {
        self.inner.id
    }

    pub fn path(&self) -> &str {
        &self.inner.path
    }

    pub fn subject_id(&self) -> SubjectId {
        self.inner.root_id
    }

    pub fn state(&self) -> HandleState {
        match self.inner.state.load(Ordering::Acquire) {
            CREATED => HandleState::Created,
            ACTIVE => HandleState::Active,
            _ => HandleState::Invalidated,
        }
    }

    /// Created or active.
    pub fn is_active(&self) -> bool {
        self.state() != HandleState::Invalidated
    }
}

impl Drop for ObserverHandle {
    fn drop(&mut self) {
        self.inner.invalidate();
    }
}

impl fmt::Debug for ObserverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverHandle")
            .field("id", &self.inner.id)
            .field("subject", &self.inner.root_id)
            .field("path", &self.inner.path)
            .field("state", &self.state())
            .finish()
    }
}

impl HandleInner {
    fn is_active(&self) -> bool {
        self.state.load(Ordering::Acquire) == ACTIVE
    }

    pub(crate) fn start(&self) {
        if self
            .state
            .compare_exchange(CREATED, ACTIVE, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        registry::register(self.id, self.root_id, &self.path);
        tracing::trace!(observer = %self.id, subject = %self.root_id, path = %self.path, "subscription started");

        self.rebuild_from(0);

        if self.options.contains(ObserveOptions::INITIAL) {
            let _ctx = DeliveryContext::enter_replay(self.id);
            self.deliver(&Change::initial(self.resolve()));
        }

        if self.deferred.swap(false, Ordering::AcqRel) {
            tracing::trace!(observer = %self.id, "applying invalidation deferred by initial replay");
            self.teardown();
        }
    }

    pub(crate) fn invalidate(&self) {
        if self.state.swap(INVALIDATED, Ordering::AcqRel) == INVALIDATED {
            return;
        }

        self.callback.lock().take();
        registry::unregister(self.id);

        if DeliveryContext::is_replaying(self.id) {
            self.deferred.store(true, Ordering::Release);
            return;
        }

        self.teardown();
        tracing::trace!(observer = %self.id, path = %self.path, "subscription invalidated");
    }

    fn teardown(&self) {
        let levels = std::mem::take(&mut *self.levels.lock());
        for level in levels {
            level.detach();
        }
    }

    fn deliver(&self, change: &Change) {
        let callback = self.callback.lock().clone();
        if let Some(callback) = callback {
            if self.is_active() {
                callback(change);
            }
        }
    }

    /// The current value at the end of the path.
    fn resolve(&self) -> Option<Value> {
        let mut subject = self.root.upgrade()?;
        let (last, parents) = self.segments.split_last()?;
        for segment in parents {
            subject = subject.value_for_key(segment)?.into_object()?;
        }
        subject.value_for_key(last)
    }

    /// Replace the observers for levels `from..` with fresh ones.
    fn rebuild_from(&self, from: usize) {
        let stale = {
            let mut levels = self.levels.lock();
            if levels.len() > from {
                levels.split_off(from)
            } else {
                Vec::new()
            }
        };
        for level in stale {
            level.detach();
        }

        if !self.is_active() {
            return;
        }

        let mut subject = if from == 0 {
            self.root.upgrade()
        } else {
            let parent = self
                .levels
                .lock()
                .get(from - 1)
                .map(|parent| (parent.subject.clone(), parent.observer.key().to_string()));
            parent.and_then(|(parent, key)| parent.upgrade()?.value_for_key(&key)?.into_object())
        };

        let wants_prior = self.options.contains(ObserveOptions::PRIOR);
        for index in from..self.segments.len() {
            let Some(current) = subject.take() else { break };

            let this = self.this.clone();
            let observer = Observer::new(self.segments[index].clone(), wants_prior, move |change| {
                if let Some(inner) = this.upgrade() {
                    inner.on_level_change(index, change);
                }
            });
            current.add_observer(&observer);

            if index + 1 < self.segments.len() {
                subject = current
                    .value_for_key(&self.segments[index])
                    .and_then(Value::into_object);
            }

            self.levels.lock().push(Level {
                subject: Arc::downgrade(&current),
                observer,
            });
        }
    }

    fn on_level_change(&self, index: usize, change: &Change) {
        if !self.is_active() {
            return;
        }

        let is_leaf = index + 1 == self.segments.len();
        if is_leaf {
            self.deliver(change);
            return;
        }

        if change.is_prior {
            let mut prior = Change::prior();
            prior.old_value = self.resolve();
            self.deliver(&prior);
        } else {
            self.rebuild_from(index + 1);
            let mut resolved = change.clone();
            resolved.old_value = None;
            resolved.new_value = self.resolve();
            self.deliver(&resolved);
        }
    }
}
