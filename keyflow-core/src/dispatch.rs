//! Mutation Thread
//!
//! All observable state is mutated, and all notifications are delivered, on
//! one designated thread. Here that thread is the one driving a tokio
//! current-thread runtime: tasks spawned on its handle (marshaled writes,
//! debounce timers) run there and nowhere else.
//!
//! # Marshaled writes
//!
//! [`MutationThread::run_sync`] applies a closure immediately when called on
//! the mutation thread. From any other thread it posts the closure to the
//! runtime and blocks until it has run, so the caller can read its own write
//! as soon as the call returns.
//!
//! The mutation thread must keep polling its runtime (be inside an `.await`)
//! while another thread waits on it, or the two will deadlock.

use std::fmt;
use std::thread::{self, ThreadId};
use std::time::Duration;

use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::{ObserveError, Result};

/// Handle to the designated mutation thread.
#[derive(Clone)]
pub struct MutationThread {
    thread: ThreadId,
    handle: Handle,
}

impl MutationThread {
    /// Designate the calling thread, which must be driving a current-thread runtime.
    pub fn current() -> Result<Self> {
        let handle = Handle::try_current().map_err(|_| ObserveError::NoRuntime)?;
        if handle.runtime_flavor() != RuntimeFlavor::CurrentThread {
            return Err(ObserveError::MultiThreadRuntime);
        }

        Ok(Self {
            thread: thread::current().id(),
            handle,
        })
    }

    /// Whether the caller is on the mutation thread.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread
    }

    pub fn thread_id(&self) -> ThreadId {
        self.thread
    }

    /// Run `f` on the mutation thread and wait for its result.
    ///
    /// Must not be called from an async context on another runtime thread:
    /// the wait is a blocking receive.
    pub fn run_sync<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_current() {
            return Ok(f());
        }

        let (tx, rx) = oneshot::channel();
        self.handle.spawn(async move {
            let _ = tx.send(f());
        });
        rx.blocking_recv()
            .map_err(|_| ObserveError::MutationThreadStopped)
    }

    /// Run `f` on the mutation thread after `delay`.
    pub fn run_after<F>(&self, delay: Duration, f: F) -> JoinHandle<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            f();
        })
    }
}

impl fmt::Debug for MutationThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationThread")
            .field("thread", &self.thread)
            .finish()
    }
}
