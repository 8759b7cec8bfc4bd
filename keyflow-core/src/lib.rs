//! Keyflow Core
//!
//! This crate provides a reactive property-observation layer for mutable
//! object graphs. It implements:
//!
//! - Per-subject change notification with owner-scoped subscriptions
//! - Key-path observation through nested subjects
//! - Derived properties that recompute when their inputs change
//! - Collection forwarding through synthetic `$` keys
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `observe`: subjects, notifiers, subscriptions and their owners
//! - `property`: value cells that notify through their owner
//! - `computed`: debounced and synchronous derived properties
//! - `collection`: collection proxies and the synthetic-key bridge
//! - `dispatch`: the designated mutation thread
//! - `config`: process-wide settings
//!
//! # Example
//!
//! ```rust,ignore
//! use keyflow_core::{Computed, Notifier, Observable, Property, Value};
//!
//! struct Person {
//!     notifier: Notifier,
//!     first: Property<String>,
//!     last: Property<String>,
//!     full: Computed<Person, String>,
//! }
//!
//! impl Person {
//!     fn new(first: &str, last: &str) -> Arc<Self> {
//!         let person = Arc::new(Self {
//!             notifier: Notifier::new(),
//!             first: Property::new(first.into()),
//!             last: Property::new(last.into()),
//!             full: Computed::new(
//!                 |p: &Person| format!("{} {}", p.first.get(), p.last.get()),
//!                 ["first", "last"],
//!             ),
//!         });
//!         person.first.bind(&person, "first").unwrap();
//!         person.last.bind(&person, "last").unwrap();
//!         person.full.bind(&person, "full").unwrap();
//!         person
//!     }
//! }
//!
//! // Observers of "full" are notified whenever first or last changes.
//! person.first.set("Grace".into())?;
//! ```
//!
//! Every owner wires its cells with explicit `bind` calls from its
//! constructor, once it is inside an `Arc`.

pub mod collection;
pub mod computed;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod observe;
pub mod property;

pub use collection::{real_key, synthetic_key, CollectionBridge, CollectionProxy, COLLECTION_MARKER};
pub use computed::{Computed, Projection};
pub use config::ObserveConfig;
pub use dispatch::MutationThread;
pub use error::{ObserveError, Result};
pub use observe::{
    subscribe, subscribe_key, unsubscribe, Change, ChangeKind, Key, Notifier, Observable, ObserveOptions,
    ObserverHandle, ObserverId, ObserverTable, PropertyKey, PropertyValue, SubjectId, TypedChange, Value,
};
pub use property::{GuardedProperty, Property};
