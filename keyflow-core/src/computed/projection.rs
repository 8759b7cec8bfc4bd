//! Synchronous projections over one to three typed keys.

use std::fmt;
use std::sync::Arc;

use super::derivation::Derivation;
use crate::error::Result;
use crate::observe::{Key, Observable, PropertyValue, Value};

/// A derived property that recomputes and emits on every upstream change.
///
/// Unlike [`Computed`](super::Computed) there is no change-rate window: each
/// upstream did-change produces exactly one recompute and one notification.
pub struct Projection<O: Observable, T: PropertyValue> {
    core: Arc<Derivation<O, T>>,
}

impl<O: Observable, T: PropertyValue> Projection<O, T> {
    pub fn one<A, F>(a: Key<O, A>, f: F) -> Self
    where
        A: 'static,
        F: Fn(A) -> T + Send + Sync + 'static,
    {
        Self::from_parts(move |owner| f(a.read(owner)), [a.name()])
    }

    pub fn two<A, B, F>(a: Key<O, A>, b: Key<O, B>, f: F) -> Self
    where
        A: 'static,
        B: 'static,
        F: Fn(A, B) -> T + Send + Sync + 'static,
    {
        Self::from_parts(move |owner| f(a.read(owner), b.read(owner)), [a.name(), b.name()])
    }

    pub fn three<A, B, C, F>(a: Key<O, A>, b: Key<O, B>, c: Key<O, C>, f: F) -> Self
    where
        A: 'static,
        B: 'static,
        C: 'static,
        F: Fn(A, B, C) -> T + Send + Sync + 'static,
    {
        Self::from_parts(
            move |owner| f(a.read(owner), b.read(owner), c.read(owner)),
            [a.name(), b.name(), c.name()],
        )
    }

    fn from_parts<F, const N: usize>(compute: F, upstream: [&'static str; N]) -> Self
    where
        F: Fn(&O) -> T + Send + Sync + 'static,
    {
        Self {
            core: Arc::new(Derivation::new(Box::new(compute), upstream)),
        }
    }

    pub fn bind(&self, owner: &Arc<O>, key: &str) -> Result<()> {
        let weak = Arc::downgrade(&self.core);
        self.core.bind(owner, key, move |owner| {
            if let Some(core) = weak.upgrade() {
                if !core.is_binding() {
                    core.emit(owner);
                }
            }
        })
    }

    pub fn get(&self) -> Result<T> {
        self.core.get()
    }

    pub fn to_value(&self) -> Value {
        self.core.to_value()
    }

    pub fn key(&self) -> Option<&str> {
        self.core.key()
    }

    pub fn recompute_count(&self) -> u64 {
        self.core.recompute_count()
    }
}

impl<O: Observable, T: PropertyValue + fmt::Debug> fmt::Debug for Projection<O, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Projection")
            .field("key", &self.key())
            .field("upstream", self.core.upstream())
            .finish()
    }
}
