//! Observation Primitives
//!
//! This module implements the change-notification core: subjects, their
//! notifiers, and the subscriptions that observe them.
//!
//! # Concepts
//!
//! ## Subjects
//!
//! A subject is anything implementing [`Observable`]. It embeds a
//! [`Notifier`] and brackets every mutation of an observable property with a
//! will-change and a did-change notification. Subjects are compared by
//! identity ([`SubjectId`]).
//!
//! ## Subscriptions
//!
//! A subscription ([`ObserverHandle`]) watches one key path on one subject.
//! It holds the subject weakly, and the subject's notifier holds the
//! subscription's observers weakly: neither keeps the other alive. Ownership
//! of the subscription lies with whoever started it, normally an owner's
//! [`ObserverTable`].
//!
//! ## Key paths
//!
//! Keys may be dotted (`"address.city"`). Each segment names a property of
//! the object at the previous segment; intermediate segments must publish an
//! [`Value::Object`] through [`Observable::value_for_key`].
//!
//! # Threading
//!
//! Mutation and delivery are expected on one designated mutation thread (see
//! [`crate::dispatch`]). The registries are still guarded by per-subject
//! locks, held only while lists are mutated or snapshotted, never while a
//! callback runs.

mod change;
mod context;
mod handle;
mod id;
pub mod key;
mod notifier;
mod observer;
pub mod registry;
mod table;
mod value;

pub use change::{Change, ChangeKind, ObserveOptions, TypedChange};
pub use context::DeliveryContext;
pub use handle::{HandleState, ObserverHandle};
pub use id::{ObserverId, SubjectId};
pub use key::{Key, PropertyKey};
pub use notifier::{Notifier, Observable};
pub use observer::Observer;
pub use table::{subscribe, subscribe_key, unsubscribe, ObserverTable};
pub use value::{PropertyValue, Value};
