//! Delivery Context
//!
//! The delivery context tracks which observer callbacks are currently running
//! on this thread. Deliveries nest: a setter fires a notification, the
//! callback recomputes a derived value, which fires its own notification, and
//! so on down the dependency chain.
//!
//! # Implementation
//!
//! We use a thread-local stack. Entering a delivery pushes the observer onto
//! the stack; dropping the returned guard pops it. Two questions are answered
//! from the stack:
//!
//! - Is a given subscription currently inside its own initial-value replay?
//!   Invalidation requested from there is deferred until the replay unwinds.
//! - How deep is the current chain? Runaway depth means a dependency cycle.

use std::cell::RefCell;

use super::ObserverId;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = const { RefCell::new(Vec::new()) };
}

/// An entry in the delivery stack.
#[derive(Debug, Clone, Copy)]
struct ContextEntry {
    observer_id: ObserverId,
    /// Set while the entry is an initial-value replay rather than a change.
    replay: bool,
}

/// Guard that pops the context when dropped.
///
/// This keeps the stack balanced even if a callback panics.
pub struct DeliveryContext {
    observer_id: ObserverId,
}

impl DeliveryContext {
    /// Enter a change delivery for the given observer.
    pub fn enter(observer_id: ObserverId) -> Self {
        Self::push(observer_id, false)
    }

    /// Enter an initial-value replay for the given observer.
    pub fn enter_replay(observer_id: ObserverId) -> Self {
        Self::push(observer_id, true)
    }

    fn push(observer_id: ObserverId, replay: bool) -> Self {
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(ContextEntry { observer_id, replay });
        });

        Self { observer_id }
    }

    /// Check if any delivery is running on this thread.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// Number of nested deliveries on this thread.
    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }

    /// The innermost observer being delivered to, if any.
    pub fn current_observer() -> Option<ObserverId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().map(|entry| entry.observer_id))
    }

    /// Whether `observer_id` is anywhere inside its own initial replay.
    pub fn is_replaying(observer_id: ObserverId) -> bool {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .iter()
                .any(|entry| entry.replay && entry.observer_id == observer_id)
        })
    }
}

impl Drop for DeliveryContext {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.observer_id, self.observer_id,
                    "DeliveryContext mismatch: expected {:?}, got {:?}",
                    self.observer_id, entry.observer_id
                );
            }
        });
    }
}
