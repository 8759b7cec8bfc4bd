//! Property keys.
//!
//! A key path is a dot-separated list of segments. Each segment names one
//! property of the subject produced by the previous segment. A segment may
//! start with [`COLLECTION_MARKER`](crate::collection::COLLECTION_MARKER) to
//! address the per-element view of a collection property.

use std::fmt;

use crate::collection::COLLECTION_MARKER;
use crate::error::{ObserveError, Result};

/// A property name or dotted key path.
pub type PropertyKey = String;

/// Split a key path into segments, rejecting malformed paths.
pub fn segments(path: &str) -> Result<Vec<String>> {
    let invalid = |reason| ObserveError::InvalidKey {
        key: path.to_string(),
        reason,
    };

    if path.is_empty() {
        return Err(invalid("empty key"));
    }

    path.split('.')
        .map(|segment| {
            if segment.is_empty() {
                return Err(invalid("empty segment"));
            }
            let body = segment.strip_prefix(COLLECTION_MARKER).unwrap_or(segment);
            if body.is_empty() {
                return Err(invalid("collection marker without a key"));
            }
            if body.contains(COLLECTION_MARKER) {
                return Err(invalid("collection marker inside a segment"));
            }
            Ok(segment.to_string())
        })
        .collect()
}

/// A statically typed key on an owner of type `O`.
///
/// Pairs the property name used for notifications with an accessor that reads
/// the current value. Typically declared as an associated constant:
///
/// ```rust,ignore
/// impl Person {
///     pub const NAME: Key<Person, String> = Key::new("name", |p| p.name.get());
/// }
/// ```
pub struct Key<O, V> {
    name: &'static str,
    read: fn(&O) -> V,
}

impl<O, V> Key<O, V> {
    pub const fn new(name: &'static str, read: fn(&O) -> V) -> Self {
        Self { name, read }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Read the current value from `owner`.
    pub fn read(&self, owner: &O) -> V {
        (self.read)(owner)
    }
}

impl<O, V> Clone for Key<O, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<O, V> Copy for Key<O, V> {}

impl<O, V> fmt::Debug for Key<O, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Key").field(&self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_dotted_paths() {
        assert_eq!(segments("list.intProperty").unwrap(), vec!["list", "intProperty"]);
        assert_eq!(segments("name").unwrap(), vec!["name"]);
    }

    #[test]
    fn accepts_leading_marker() {
        assert_eq!(segments("$list.count").unwrap(), vec!["$list", "count"]);
    }

    #[test]
    fn rejects_malformed_paths() {
        assert!(segments("").is_err());
        assert!(segments("a..b").is_err());
        assert!(segments("a.").is_err());
        assert!(segments("$").is_err());
        assert!(segments("li$t").is_err());
    }

    #[test]
    fn typed_key_reads_owner() {
        struct Owner {
            count: u32,
        }
        const COUNT: Key<Owner, u32> = Key::new("count", |o| o.count);

        assert_eq!(COUNT.name(), "count");
        assert_eq!(COUNT.read(&Owner { count: 3 }), 3);
    }
}
