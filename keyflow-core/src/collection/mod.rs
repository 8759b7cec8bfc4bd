//! Collection Forwarding
//!
//! A collection-valued property `items` is also observable under the
//! synthetic key `$items`. Reading `$items` yields a [`CollectionProxy`]
//! wrapping the current elements; observing a path through it
//! (`"$items.price"`) observes that property on every element, and follows
//! the collection as it is replaced.
//!
//! An owner opts in by embedding a [`CollectionBridge`] and routing its
//! `value_for_key`, `will_change_value` and `did_change_value` through it:
//!
//! ```rust,ignore
//! impl Observable for Cart {
//!     fn notifier(&self) -> &Notifier {
//!         &self.notifier
//!     }
//!
//!     fn value_for_key(&self, key: &str) -> Option<Value> {
//!         self.bridge.value_for_key(key).or_else(|| match key {
//!             "items" => Some(self.items.to_value()),
//!             _ => None,
//!         })
//!     }
//!
//!     fn will_change_value(&self, key: &str) {
//!         self.bridge.will_change(&self.notifier, key);
//!     }
//!
//!     fn did_change_value(&self, key: &str, change: Change) {
//!         self.bridge.did_change(&self.notifier, key, change);
//!     }
//! }
//! ```

mod bridge;
mod proxy;

pub use bridge::CollectionBridge;
pub use proxy::CollectionProxy;

use crate::observe::PropertyKey;

/// Prefix that turns a collection key into its synthetic key.
pub const COLLECTION_MARKER: char = '$';

/// The synthetic key for `real_key`: `"items"` becomes `"$items"`.
pub fn synthetic_key(real_key: &str) -> PropertyKey {
    format!("{COLLECTION_MARKER}{real_key}")
}

/// The collection key behind a synthetic key, or `None` if `key` is not one.
pub fn real_key(key: &str) -> Option<&str> {
    key.strip_prefix(COLLECTION_MARKER).filter(|real| !real.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_keys_round_trip() {
        assert_eq!(synthetic_key("items"), "$items");
        assert_eq!(real_key("$items"), Some("items"));
    }

    #[test]
    fn plain_keys_are_not_synthetic() {
        assert_eq!(real_key("items"), None);
        assert_eq!(real_key("$"), None);
        assert_eq!(real_key(""), None);
    }
}
