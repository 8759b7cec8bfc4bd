//! Synthetic-key bridge between an owner and its collection proxies.

use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::proxy::CollectionProxy;
use super::{real_key, synthetic_key, COLLECTION_MARKER};
use crate::error::{ObserveError, Result};
use crate::observe::{Change, Notifier, Observable, PropertyKey, Value};

/// Serves `$key` reads and mirrors `key` notifications onto `$key`.
///
/// Notification order for a change of `key`, once a proxy for it exists:
///
/// ```text
/// will($key)  will(key)  ...mutation...  did(key)  did($key)
/// ```
#[derive(Default)]
pub struct CollectionBridge {
    owner: OnceLock<Weak<dyn Observable>>,
    proxies: Mutex<IndexMap<PropertyKey, Arc<CollectionProxy>>>,
}

impl CollectionBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach to `owner`. Call once, from the owner's constructor.
    pub fn bind<O: Observable>(&self, owner: &Arc<O>) -> Result<()> {
        let weak = Arc::downgrade(owner);
        let weak: Weak<dyn Observable> = weak;
        self.owner.set(weak).map_err(|_| ObserveError::AlreadyBound {
            key: COLLECTION_MARKER.to_string(),
        })
    }

    /// The proxy for a synthetic key, or `None` for any other key.
    pub fn value_for_key(&self, key: &str) -> Option<Value> {
        let real = real_key(key)?;
        match self.proxy(real) {
            Ok(proxy) => Some(Value::Object(proxy)),
            Err(err) => {
                tracing::warn!(key, %err, "collection proxy unavailable");
                None
            }
        }
    }

    /// The proxy wrapping the collection at `real_key`, created on first use.
    pub fn proxy(&self, real_key: &str) -> Result<Arc<CollectionProxy>> {
        if let Some(proxy) = self.proxies.lock().get(real_key) {
            return Ok(proxy.clone());
        }

        let owner = self
            .owner
            .get()
            .ok_or(ObserveError::Unbound)?
            .upgrade()
            .ok_or_else(|| ObserveError::OwnerReleased {
                key: real_key.to_string(),
            })?;
        // Built unlocked: reading the collection re-enters the owner.
        let proxy = CollectionProxy::new(&owner, real_key)?;
        Ok(self
            .proxies
            .lock()
            .entry(real_key.to_string())
            .or_insert(proxy)
            .clone())
    }

    /// Whether a proxy exists for `real_key`.
    pub fn has_proxy(&self, real_key: &str) -> bool {
        self.proxies.lock().contains_key(real_key)
    }

    /// Will-change for `key`, preceded by `$key` if it is proxied.
    pub fn will_change(&self, notifier: &Notifier, key: &str) {
        if self.has_proxy(key) {
            notifier.will_change(&synthetic_key(key));
        }
        notifier.will_change(key);
    }

    /// Did-change for `key`, followed by `$key` if it is proxied.
    pub fn did_change(&self, notifier: &Notifier, key: &str, change: Change) {
        if !self.has_proxy(key) {
            notifier.did_change(key, change);
            return;
        }
        notifier.did_change(key, change.clone());
        notifier.did_change(&synthetic_key(key), change);
    }
}

impl fmt::Debug for CollectionBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionBridge")
            .field("proxies", &self.proxies.lock().keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::{subscribe, ObserveOptions};
    use crate::property::Property;

    struct Item {
        notifier: Notifier,
    }

    impl Observable for Item {
        fn notifier(&self) -> &Notifier {
            &self.notifier
        }
    }

    struct Basket {
        notifier: Notifier,
        bridge: CollectionBridge,
        items: Property<Vec<Arc<Item>>>,
        label: Property<String>,
    }

    impl Basket {
        fn new() -> Arc<Self> {
            let basket = Arc::new(Self {
                notifier: Notifier::new(),
                bridge: CollectionBridge::new(),
                items: Property::new(Vec::new()),
                label: Property::new(String::new()),
            });
            basket.bridge.bind(&basket).unwrap();
            basket.items.bind(&basket, "items").unwrap();
            basket.label.bind(&basket, "label").unwrap();
            basket
        }
    }

    impl Observable for Basket {
        fn notifier(&self) -> &Notifier {
            &self.notifier
        }

        fn value_for_key(&self, key: &str) -> Option<Value> {
            self.bridge.value_for_key(key).or_else(|| match key {
                "items" => Some(self.items.to_value()),
                "label" => Some(self.label.to_value()),
                _ => None,
            })
        }

        fn will_change_value(&self, key: &str) {
            self.bridge.will_change(&self.notifier, key);
        }

        fn did_change_value(&self, key: &str, change: Change) {
            self.bridge.did_change(&self.notifier, key, change);
        }
    }

    #[test]
    fn synthetic_key_reads_are_cached() {
        let basket = Basket::new();
        let first = basket.value_for_key("$items").and_then(Value::into_object).unwrap();
        let second = basket.value_for_key("$items").and_then(Value::into_object).unwrap();
        assert_eq!(first.notifier().id(), second.notifier().id());
        assert!(basket.value_for_key("items").is_some());
    }

    #[test]
    fn synthetic_key_over_a_non_collection_has_no_proxy() {
        let basket = Basket::new();
        assert!(basket.value_for_key("$missing").is_none());
        assert!(basket.value_for_key("$label").is_none());
        assert!(matches!(
            basket.bridge.proxy("label"),
            Err(ObserveError::NotACollection { key }) if key == "label"
        ));
        assert!(!basket.bridge.has_proxy("missing"));
        assert!(!basket.bridge.has_proxy("label"));

        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let log_clone = log.clone();
        subscribe(&basket, "label", ObserveOptions::PRIOR, None, move |_, change| {
            let phase = if change.is_prior { "will" } else { "did" };
            log_clone.lock().push(phase);
        })
        .unwrap();
        basket.label.set("fruit".to_string()).unwrap();

        assert_eq!(*log.lock(), vec!["will", "did"]);
    }

    #[test]
    fn unbound_bridge_serves_nothing() {
        let bridge = CollectionBridge::new();
        assert!(bridge.value_for_key("$items").is_none());
        assert!(matches!(bridge.proxy("items"), Err(ObserveError::Unbound)));
    }

    #[test]
    fn synthetic_notifications_wrap_the_real_ones() {
        let basket = Basket::new();
        assert!(basket.value_for_key("$items").is_some());
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));

        for key in ["items", "$items"] {
            let log = log.clone();
            subscribe(&basket, key, ObserveOptions::PRIOR, None, move |_, change| {
                let phase = if change.is_prior { "will" } else { "did" };
                log.lock().push(format!("{phase} {key}"));
            })
            .unwrap();
        }

        basket
            .items
            .set(vec![Arc::new(Item { notifier: Notifier::new() })])
            .unwrap();

        assert_eq!(
            *log.lock(),
            vec!["will $items", "will items", "did items", "did $items"]
        );
    }

    #[test]
    fn unproxied_keys_notify_only_themselves() {
        let basket = Basket::new();
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let log_clone = log.clone();
        subscribe(&basket, "items", ObserveOptions::empty(), None, move |_, _| {
            log_clone.lock().push("items");
        })
        .unwrap();

        basket.items.set(Vec::new()).unwrap();

        assert!(!basket.bridge.has_proxy("items"));
        assert_eq!(*log.lock(), vec!["items"]);
    }
}
