//! Change records delivered to observers.

use std::collections::BTreeSet;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::value::Value;

bitflags! {
    /// Delivery options for a subscription.
    ///
    /// The empty set delivers did-change notifications only, without replay.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ObserveOptions: u8 {
        /// Deliver the current value immediately when the subscription starts.
        const INITIAL = 0b01;
        /// Also deliver the will-change phase (`is_prior == true`).
        const PRIOR = 0b10;
    }
}

/// What kind of mutation a change describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// The whole value was replaced.
    Setting,
    /// Elements were inserted at `indexes`.
    Insertion,
    /// Elements were removed from `indexes`.
    Removal,
    /// Elements at `indexes` were replaced.
    Replacement,
}

/// A single change notification.
///
/// `old_value` and `new_value` are absent for prior notifications and for bulk
/// changes where the setter did not supply them.
#[derive(Debug, Clone)]
pub struct Change {
    pub kind: ChangeKind,
    pub new_value: Option<Value>,
    pub old_value: Option<Value>,
    pub indexes: Option<BTreeSet<usize>>,
    pub is_prior: bool,
}

impl Change {
    /// A did-change for a whole-value replacement.
    pub fn setting(old_value: Option<Value>, new_value: Option<Value>) -> Self {
        Self {
            kind: ChangeKind::Setting,
            new_value,
            old_value,
            indexes: None,
            is_prior: false,
        }
    }

    /// A did-change for an indexed mutation of a collection.
    pub fn indexed(kind: ChangeKind, indexes: impl IntoIterator<Item = usize>) -> Self {
        Self {
            kind,
            new_value: None,
            old_value: None,
            indexes: Some(indexes.into_iter().collect()),
            is_prior: false,
        }
    }

    /// The will-change phase.
    pub fn prior() -> Self {
        Self {
            kind: ChangeKind::Setting,
            new_value: None,
            old_value: None,
            indexes: None,
            is_prior: true,
        }
    }

    /// The replay delivered when a subscription starts with [`ObserveOptions::INITIAL`].
    pub fn initial(value: Option<Value>) -> Self {
        Self::setting(None, value)
    }

    /// The new value downcast to `T`, if it is a scalar of that type.
    pub fn new_as<T: Clone + 'static>(&self) -> Option<T> {
        self.new_value.as_ref().and_then(Value::get)
    }

    /// The old value downcast to `T`, if it is a scalar of that type.
    pub fn old_as<T: Clone + 'static>(&self) -> Option<T> {
        self.old_value.as_ref().and_then(Value::get)
    }

    /// Convert into a typed change, dropping values that are not `T`.
    pub fn typed<T: Clone + 'static>(&self) -> TypedChange<T> {
        TypedChange {
            kind: self.kind,
            new_value: self.new_as(),
            old_value: self.old_as(),
            indexes: self.indexes.clone(),
            is_prior: self.is_prior,
        }
    }
}

/// A [`Change`] whose values have been downcast to the observed property's type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedChange<T> {
    pub kind: ChangeKind,
    pub new_value: Option<T>,
    pub old_value: Option<T>,
    pub indexes: Option<BTreeSet<usize>>,
    pub is_prior: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_options_mean_did_change_only() {
        let options = ObserveOptions::empty();
        assert!(!options.contains(ObserveOptions::INITIAL));
        assert!(!options.contains(ObserveOptions::PRIOR));
    }

    #[test]
    fn typed_change_downcasts_scalars() {
        let change = Change::setting(Some(Value::scalar(1_i32)), Some(Value::scalar(2_i32)));
        let typed = change.typed::<i32>();
        assert_eq!(typed.old_value, Some(1));
        assert_eq!(typed.new_value, Some(2));
        assert!(!typed.is_prior);

        assert_eq!(change.typed::<String>().new_value, None);
    }

    #[test]
    fn indexed_change_collects_indexes() {
        let change = Change::indexed(ChangeKind::Insertion, [3, 1, 3]);
        assert_eq!(change.kind, ChangeKind::Insertion);
        assert_eq!(change.indexes, Some(BTreeSet::from([1, 3])));
    }

    #[test]
    fn prior_change_has_no_values() {
        let change = Change::prior();
        assert!(change.is_prior);
        assert!(change.new_value.is_none() && change.old_value.is_none());
    }
}
