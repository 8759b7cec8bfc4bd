//! Type-erased property values.
//!
//! Observers are registered by key, so the values carried by a [`Change`] or
//! returned from [`Observable::value_for_key`] cannot be statically typed.
//! Scalars are stored behind `Arc<dyn Any>` and downcast on demand; nested
//! subjects and collections of subjects keep their identity so key paths and
//! collection forwarding can walk into them.
//!
//! [`Change`]: super::Change

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::notifier::Observable;

/// A property value as seen by the observation layer.
#[derive(Clone, Default)]
pub enum Value {
    /// No value (`None`, or a computed value that was never evaluated).
    #[default]
    Null,
    /// An opaque value.
    Scalar(Arc<dyn Any + Send + Sync>),
    /// A nested observable subject.
    Object(Arc<dyn Observable>),
    /// An ordered collection of observable subjects.
    Collection(Vec<Arc<dyn Observable>>),
}

impl Value {
    /// Wrap a plain value.
    pub fn scalar<T: Any + Send + Sync>(value: T) -> Self {
        Value::Scalar(Arc::new(value))
    }

    /// Wrap a nested subject.
    pub fn object<S: Observable>(subject: Arc<S>) -> Self {
        Value::Object(subject)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the scalar as `T`.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        match self {
            Value::Scalar(any) => any.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Clone the scalar out as `T`.
    pub fn get<T: Clone + 'static>(&self) -> Option<T> {
        self.downcast_ref::<T>().cloned()
    }

    pub fn as_object(&self) -> Option<&Arc<dyn Observable>> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn into_object(self) -> Option<Arc<dyn Observable>> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&[Arc<dyn Observable>]> {
        match self {
            Value::Collection(elements) => Some(elements),
            _ => None,
        }
    }

    pub fn into_collection(self) -> Option<Vec<Arc<dyn Observable>>> {
        match self {
            Value::Collection(elements) => Some(elements),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Scalar(_) => f.write_str("Scalar(..)"),
            Value::Object(object) => write!(f, "Object({})", object.notifier().id()),
            Value::Collection(elements) => f
                .debug_list()
                .entries(elements.iter().map(|e| e.notifier().id()))
                .finish(),
        }
    }
}

/// Types that can be stored in an observable property.
///
/// Scalars become [`Value::Scalar`]; `Arc<S>` of an observable subject becomes
/// [`Value::Object`]; `Vec<Arc<S>>` becomes [`Value::Collection`].
pub trait PropertyValue: Clone + Send + Sync + 'static {
    fn to_value(&self) -> Value;
}

macro_rules! scalar_property_values {
    ($($ty:ty),* $(,)?) => {
        $(
            impl PropertyValue for $ty {
                fn to_value(&self) -> Value {
                    Value::scalar(self.clone())
                }
            }
        )*
    };
}

scalar_property_values!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
    String, &'static str,
);

impl<T: PropertyValue> PropertyValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(value) => value.to_value(),
            None => Value::Null,
        }
    }
}

impl<S: Observable> PropertyValue for Arc<S> {
    fn to_value(&self) -> Value {
        Value::Object(self.clone())
    }
}

impl<S: Observable> PropertyValue for Vec<Arc<S>> {
    fn to_value(&self) -> Value {
        Value::Collection(
            self.iter()
                .map(|element| element.clone() as Arc<dyn Observable>)
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::Notifier;

    struct Leaf {
        notifier: Notifier,
    }

    impl Observable for Leaf {
        fn notifier(&self) -> &Notifier {
            &self.notifier
        }
    }

    #[test]
    fn scalar_round_trips_through_any() {
        let value = "hello".to_string().to_value();
        assert_eq!(value.get::<String>().as_deref(), Some("hello"));
        assert!(value.get::<i32>().is_none());
    }

    #[test]
    fn option_none_is_null() {
        assert!(None::<i32>.to_value().is_null());
        assert_eq!(Some(3_i32).to_value().get::<i32>(), Some(3));
    }

    #[test]
    fn collections_keep_identity() {
        let leaf = Arc::new(Leaf { notifier: Notifier::new() });
        let id = leaf.notifier.id();
        let value = vec![leaf.clone(), leaf].to_value();

        let elements = value.as_collection().unwrap();
        assert_eq!(elements.len(), 2);
        assert!(elements.iter().all(|e| e.notifier().id() == id));
    }
}
