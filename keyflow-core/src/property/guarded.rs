//! Properties writable from any thread.
//!
//! A [`GuardedProperty`] applies every write on the mutation thread. Writes
//! from that thread apply inline; writes from elsewhere are posted to it and
//! the writer blocks until the change, and its notifications, have happened.

use std::fmt;
use std::sync::Arc;

use super::stored::Slot;
use crate::dispatch::MutationThread;
use crate::error::Result;
use crate::observe::{Observable, PropertyValue, Value};

pub struct GuardedProperty<T: PropertyValue> {
    slot: Arc<Slot<T>>,
    thread: MutationThread,
}

impl<T: PropertyValue> GuardedProperty<T> {
    pub fn new(value: T, thread: MutationThread) -> Self {
        Self {
            slot: Arc::new(Slot::new(value)),
            thread,
        }
    }

    /// Attach this property to `owner` under `key`.
    pub fn bind<O: Observable>(&self, owner: &Arc<O>, key: &str) -> Result<()> {
        self.slot.bind(owner, key)
    }

    pub fn key(&self) -> Option<&str> {
        self.slot.key()
    }

    pub fn get(&self) -> T {
        self.slot.get()
    }

    /// Store `value` on the mutation thread and wait for it to be applied.
    ///
    /// From a foreign thread this blocks until the mutation thread has run the
    /// write. Fails with
    /// [`MutationThreadStopped`](crate::ObserveError::MutationThreadStopped)
    /// if the runtime shut down first.
    pub fn set(&self, value: T) -> Result<()> {
        if self.thread.is_current() {
            return self.slot.apply(value);
        }

        tracing::trace!(key = ?self.key(), "marshaling write onto the mutation thread");
        let slot = self.slot.clone();
        self.thread.run_sync(move || slot.apply(value))?
    }

    pub fn to_value(&self) -> Value {
        self.slot.to_value()
    }

    pub fn mutation_thread(&self) -> &MutationThread {
        &self.thread
    }
}

impl<T: PropertyValue + fmt::Debug> fmt::Debug for GuardedProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardedProperty")
            .field("key", &self.key())
            .field("value", &self.get())
            .field("thread", &self.thread.thread_id())
            .finish()
    }
}
