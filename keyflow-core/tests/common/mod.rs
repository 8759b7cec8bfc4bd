//! Owner models shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use keyflow_core::{
    Change, CollectionBridge, Computed, Key, Notifier, Observable, Projection, Property, Value,
};

pub struct Person {
    pub notifier: Notifier,
    pub name: Property<String>,
    pub surname: Property<String>,
    pub fullname: Computed<Person, String>,
    pub greeting: Projection<Person, String>,
}

impl Person {
    pub const FULLNAME: Key<Person, String> =
        Key::new("fullname", |p| p.fullname.get().unwrap_or_default());

    pub fn new(name: &str, surname: &str) -> Arc<Self> {
        let person = Arc::new(Self {
            notifier: Notifier::new(),
            name: Property::new(name.to_string()),
            surname: Property::new(surname.to_string()),
            fullname: Computed::new(
                |p: &Person| format!("{} {}", p.name.get(), p.surname.get()),
                ["name", "surname"],
            ),
            greeting: Projection::one(Self::FULLNAME, |full| format!("Hello, {full}")),
        });
        person.name.bind(&person, "name").unwrap();
        person.surname.bind(&person, "surname").unwrap();
        person.fullname.bind(&person, "fullname").unwrap();
        person.greeting.bind(&person, "greeting").unwrap();
        person
    }
}

impl Observable for Person {
    fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    fn value_for_key(&self, key: &str) -> Option<Value> {
        match key {
            "name" => Some(self.name.to_value()),
            "surname" => Some(self.surname.to_value()),
            "fullname" => Some(self.fullname.to_value()),
            "greeting" => Some(self.greeting.to_value()),
            _ => None,
        }
    }
}

pub struct LineItem {
    pub notifier: Notifier,
    pub price: Property<u64>,
}

impl LineItem {
    pub fn new(price: u64) -> Arc<Self> {
        let item = Arc::new(Self {
            notifier: Notifier::new(),
            price: Property::new(price),
        });
        item.price.bind(&item, "price").unwrap();
        item
    }
}

impl Observable for LineItem {
    fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    fn value_for_key(&self, key: &str) -> Option<Value> {
        (key == "price").then(|| self.price.to_value())
    }
}

pub struct Cart {
    pub notifier: Notifier,
    pub bridge: CollectionBridge,
    pub items: Property<Vec<Arc<LineItem>>>,
    pub total: Computed<Cart, u64>,
}

impl Cart {
    pub fn new(items: Vec<Arc<LineItem>>) -> Arc<Self> {
        let cart = Arc::new(Self {
            notifier: Notifier::new(),
            bridge: CollectionBridge::new(),
            items: Property::new(items),
            total: Computed::new(
                |cart: &Cart| cart.items.get().iter().map(|item| item.price.get()).sum::<u64>(),
                ["$items.price"],
            ),
        });
        cart.bridge.bind(&cart).unwrap();
        cart.items.bind(&cart, "items").unwrap();
        cart.total.bind(&cart, "total").unwrap();
        cart
    }
}

impl Observable for Cart {
    fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    fn value_for_key(&self, key: &str) -> Option<Value> {
        self.bridge.value_for_key(key).or_else(|| match key {
            "items" => Some(self.items.to_value()),
            "total" => Some(self.total.to_value()),
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
