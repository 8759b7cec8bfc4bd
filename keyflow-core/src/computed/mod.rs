//! Derived Properties
//!
//! A derived property is computed from other properties of the same owner and
//! is itself observable under its own key. It subscribes to its upstream keys
//! through the owner's notifier and re-emits when they change, so derived
//! properties can depend on each other and on collection synthetic keys.
//!
//! - [`Computed`]: any number of upstream key paths, debounced.
//! - [`Projection`]: one to three typed keys, recomputed synchronously.

mod debounced;
mod derivation;
mod projection;

pub use debounced::Computed;
pub use projection::Projection;
