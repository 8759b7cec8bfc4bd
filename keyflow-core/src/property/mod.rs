//! Property Cells
//!
//! Storage for observable values owned by a subject. A cell is bound once to
//! its owner and key; from then on every write notifies the owner's
//! observers.
//!
//! - [`Property`]: written on the mutation thread.
//! - [`GuardedProperty`]: writable from any thread; writes are marshaled onto
//!   the mutation thread.

mod guarded;
mod link;
mod stored;

pub use guarded::GuardedProperty;
pub use stored::Property;
