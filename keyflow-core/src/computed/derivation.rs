//! State shared by every derived property: the recompute function, its
//! upstream keys, the cached value, and the subscriptions feeding it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use indexmap::IndexSet;
use parking_lot::RwLock;

use crate::error::{ObserveError, Result};
use crate::observe::key::segments;
use crate::observe::{Change, Observable, ObserveOptions, ObserverTable, PropertyKey, PropertyValue, Value};

pub(crate) type Compute<O, T> = Box<dyn Fn(&O) -> T + Send + Sync>;

pub(crate) struct Derivation<O, T> {
    compute: Compute<O, T>,
    upstream: IndexSet<PropertyKey>,
    cache: RwLock<Option<T>>,
    owner: OnceLock<(Weak<O>, PropertyKey)>,
    binding: AtomicBool,
    recomputes: AtomicU64,
    subscriptions: ObserverTable,
}

impl<O: Observable, T: PropertyValue> Derivation<O, T> {
    pub(crate) fn new<I, K>(compute: Compute<O, T>, upstream: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<PropertyKey>,
    {
        Self {
            compute,
            upstream: upstream.into_iter().map(Into::into).collect(),
            cache: RwLock::new(None),
            owner: OnceLock::new(),
            binding: AtomicBool::new(false),
            recomputes: AtomicU64::new(0),
            subscriptions: ObserverTable::new(),
        }
    }

    pub(crate) fn upstream(&self) -> &IndexSet<PropertyKey> {
        &self.upstream
    }

    pub(crate) fn key(&self) -> Option<&str> {
        self.owner.get().map(|(_, key)| key.as_str())
    }

    pub(crate) fn owner(&self) -> Option<Arc<O>> {
        self.owner.get().and_then(|(owner, _)| owner.upgrade())
    }

    /// Whether `bind` is still wiring upstream subscriptions.
    pub(crate) fn is_binding(&self) -> bool {
        self.binding.load(Ordering::Acquire)
    }

    /// Subscribe to every upstream key on `owner`, then compute and emit.
    ///
    /// `on_change` runs for every did-change of an upstream key, including
    /// the initial replays delivered while binding. Every upstream path is
    /// validated before anything is wired, so a failed bind leaves the
    /// property unbound.
    ///
    /// The first value is emitted under `key`, so dependents bound earlier
    /// than this property catch up.
    pub(crate) fn bind<F>(&self, owner: &Arc<O>, key: &str, on_change: F) -> Result<()>
    where
        F: Fn(&Arc<O>) + Clone + Send + Sync + 'static,
    {
        for upstream in &self.upstream {
            segments(upstream)?;
        }

        self.owner
            .set((Arc::downgrade(owner), key.to_string()))
            .map_err(|_| ObserveError::AlreadyBound {
                key: self.key().unwrap_or_default().to_string(),
            })?;

        self.binding.store(true, Ordering::Release);
        let wired = self.upstream.iter().try_for_each(|upstream| {
            let on_change = on_change.clone();
            self.subscriptions
                .observe(owner, upstream, ObserveOptions::INITIAL, move |owner, change| {
                    if !change.is_prior {
                        on_change(owner);
                    }
                })
                .map(drop)
        });
        self.binding.store(false, Ordering::Release);
        if let Err(err) = wired {
            self.subscriptions.clear();
            return Err(err);
        }

        self.emit(owner);
        tracing::trace!(key, upstream = ?self.upstream, "derived property bound");
        Ok(())
    }

    /// Recompute into the cache without notifying.
    pub(crate) fn refresh(&self, owner: &O) -> (Option<T>, T) {
        let next = (self.compute)(owner);
        self.recomputes.fetch_add(1, Ordering::Relaxed);
        let previous = self.cache.write().replace(next.clone());
        (previous, next)
    }

    /// Recompute and notify observers of the owner's key.
    pub(crate) fn emit(&self, owner: &O) {
        let Some(key) = self.key() else { return };
        owner.will_change_value(key);
        let (previous, next) = self.refresh(owner);
        owner.did_change_value(
            key,
            Change::setting(previous.map(|v| v.to_value()), Some(next.to_value())),
        );
    }

    pub(crate) fn get(&self) -> Result<T> {
        if let Some(value) = self.cache.read().as_ref() {
            return Ok(value.clone());
        }

        let (owner, key) = self.owner.get().ok_or(ObserveError::Unbound)?;
        let owner = owner
            .upgrade()
            .ok_or_else(|| ObserveError::OwnerReleased { key: key.clone() })?;
        Ok(self.refresh(&owner).1)
    }

    pub(crate) fn to_value(&self) -> Value {
        self.cache
            .read()
            .as_ref()
            .map_or(Value::Null, PropertyValue::to_value)
    }

    pub(crate) fn recompute_count(&self) -> u64 {
        self.recomputes.load(Ordering::Relaxed)
    }
}
