//! Debounced computed properties.
//!
//! A [`Computed`] recomputes when any upstream key changes, but emits at most
//! once per change-rate window. Let Δ be the window and Δt the time since the
//! last emission:
//!
//! - no timer pending and Δt ≥ Δ: recompute and emit now;
//! - no timer pending and Δt < Δ: schedule one emission Δ − Δt from now on
//!   the mutation thread;
//! - timer pending: the change is folded into the scheduled emission.
//!
//! The emission time is stamped at bind, so a burst that starts right after
//! construction is already coalesced.
//!
//! Timers run on the mutation thread given with [`Computed::with_thread`], or
//! else the one captured at bind. Without either (bound outside a
//! current-thread tokio runtime) every change is applied immediately and a
//! warning is logged.

use std::fmt;
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::derivation::Derivation;
use crate::config;
use crate::dispatch::MutationThread;
use crate::error::Result;
use crate::observe::{Observable, PropertyKey, PropertyValue, Value};

#[derive(Default)]
struct Debounce {
    last_update: Option<Instant>,
    timer: Option<JoinHandle<()>>,
}

struct ComputedInner<O, T> {
    core: Derivation<O, T>,
    change_rate: Duration,
    thread: OnceLock<Option<MutationThread>>,
    debounce: Mutex<Debounce>,
}

/// A derived property over any number of upstream keys of its owner.
///
/// # Example
///
/// ```rust,ignore
/// let total = Computed::new(
///     |cart: &Cart| cart.items.get().iter().map(|i| i.price.get()).sum::<u64>(),
///     ["$items.price"],
/// );
/// ```
pub struct Computed<O: Observable, T: PropertyValue> {
    inner: Arc<ComputedInner<O, T>>,
}

impl<O: Observable, T: PropertyValue> Computed<O, T> {
    /// A computed property using the configured change rate.
    pub fn new<F, I, K>(compute: F, upstream: I) -> Self
    where
        F: Fn(&O) -> T + Send + Sync + 'static,
        I: IntoIterator<Item = K>,
        K: Into<PropertyKey>,
    {
        Self::with_change_rate(compute, upstream, config::current().change_rate())
    }

    pub fn with_change_rate<F, I, K>(compute: F, upstream: I, change_rate: Duration) -> Self
    where
        F: Fn(&O) -> T + Send + Sync + 'static,
        I: IntoIterator<Item = K>,
        K: Into<PropertyKey>,
    {
        Self {
            inner: Arc::new(ComputedInner {
                core: Derivation::new(Box::new(compute), upstream),
                change_rate,
                thread: OnceLock::new(),
                debounce: Mutex::new(Debounce::default()),
            }),
        }
    }

    /// Schedule debounced updates on `thread` instead of the thread that binds.
    ///
    /// Needed when the owner is built off the mutation thread, or inside a
    /// multi-thread runtime. Has no effect once bound.
    pub fn with_thread(self, thread: MutationThread) -> Self {
        let _ = self.inner.thread.set(Some(thread));
        self
    }

    /// Attach to `owner` under `key` and subscribe to every upstream key.
    ///
    /// The value is computed and emitted once here. Call from the owner's
    /// constructor, after the owner is in an `Arc`.
    pub fn bind(&self, owner: &Arc<O>, key: &str) -> Result<()> {
        let thread = self.inner.thread.get_or_init(|| MutationThread::current().ok());
        if thread.is_none() {
            tracing::warn!(key, "no mutation thread at bind; changes will not be debounced");
        }

        let weak = Arc::downgrade(&self.inner);
        self.inner.core.bind(owner, key, move |owner| {
            if let Some(inner) = weak.upgrade() {
                ComputedInner::upstream_changed(&inner, owner);
            }
        })?;

        self.inner.debounce.lock().last_update = Some(Instant::now());
        Ok(())
    }

    /// The cached value, computing it if it never has been.
    pub fn get(&self) -> Result<T> {
        self.inner.core.get()
    }

    pub fn to_value(&self) -> Value {
        self.inner.core.to_value()
    }

    pub fn key(&self) -> Option<&str> {
        self.inner.core.key()
    }

    pub fn upstream(&self) -> impl Iterator<Item = &str> {
        self.inner.core.upstream().iter().map(String::as_str)
    }

    pub fn change_rate(&self) -> Duration {
        self.inner.change_rate
    }

    /// How many times the value has been computed.
    pub fn recompute_count(&self) -> u64 {
        self.inner.core.recompute_count()
    }

    /// Whether an emission is scheduled.
    pub fn is_pending(&self) -> bool {
        self.inner.debounce.lock().timer.is_some()
    }
}

impl<O: Observable, T: PropertyValue> ComputedInner<O, T> {
    fn upstream_changed(this: &Arc<Self>, owner: &Arc<O>) {
        if this.core.is_binding() {
            return;
        }

        let Some(thread) = this.thread.get().and_then(Option::as_ref) else {
            this.core.emit(owner);
            return;
        };

        let now = Instant::now();
        let mut debounce = this.debounce.lock();
        if debounce.timer.is_some() {
            tracing::debug!(key = ?this.core.key(), "change coalesced into pending update");
            return;
        }

        let elapsed = debounce
            .last_update
            .map_or(this.change_rate, |last| now.saturating_duration_since(last));
        if elapsed >= this.change_rate {
            debounce.last_update = Some(now);
            drop(debounce);
            this.core.emit(owner);
            return;
        }

        let delay = this.change_rate - elapsed;
        tracing::debug!(key = ?this.core.key(), ?delay, "scheduling debounced update");
        let weak: Weak<Self> = Arc::downgrade(this);
        debounce.timer = Some(thread.run_after(delay, move || {
            if let Some(inner) = weak.upgrade() {
                inner.fire();
            }
        }));
    }

    fn fire(&self) {
        {
            let mut debounce = self.debounce.lock();
            debounce.timer = None;
            debounce.last_update = Some(Instant::now());
        }
        if let Some(owner) = self.core.owner() {
            self.core.emit(&owner);
        }
    }
}

impl<O, T> Drop for ComputedInner<O, T> {
    fn drop(&mut self) {
        if let Some(timer) = self.debounce.get_mut().timer.take() {
            timer.abort();
        }
    }
}

impl<O: Observable, T: PropertyValue + fmt::Debug> fmt::Debug for Computed<O, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("key", &self.key())
            .field("upstream", self.inner.core.upstream())
            .field("change_rate", &self.inner.change_rate)
            .field("pending", &self.is_pending())
            .finish()
    }
}
