//! End-to-end over a real SQLite database: create tables, insert the flat
//! rows of a couple of aggregates, load them back through the full stack.

#![cfg(feature = "rusqlite")]

use std::collections::BTreeMap;
use std::sync::Arc;

use rowfold_core::{
    Aggregate, Dialect, Entity, RusqliteExecutor, SingleSelectDataAccessStrategy, Value,
};
use serde::Deserialize;

#[derive(Debug, Deserialize, PartialEq)]
struct Shipping {
    street: String,
    city: String,
}

#[derive(Debug, Deserialize, PartialEq)]
struct Customer {
    id: i64,
    name: String,
}

#[derive(Debug, Deserialize, PartialEq)]
struct LineItem {
    id: i64,
    qty: i64,
}

#[derive(Debug, Deserialize, PartialEq)]
struct Order {
    id: i64,
    note: Option<String>,
    shipping: Option<Shipping>,
    customer: Option<Customer>,
    items: Vec<LineItem>,
    attributes: BTreeMap<String, String>,
}

impl Aggregate for Order {
    fn entity() -> Arc<Entity> {
        let shipping = Entity::builder("address")
            .scalar("street")
            .scalar("city")
            .build();
        let customer = Entity::builder("customer").id("id").scalar("name").build();
        let line_item = Entity::builder("line_item").id("id").scalar("qty").build();
        Entity::builder("order")
            .id("id")
            .scalar("note")
            .embedded("shipping", shipping)
            .one("customer", customer)
            .ordered_list("items", line_item)
            .scalar_map("attributes")
            .build()
    }
}

fn seeded_strategy() -> SingleSelectDataAccessStrategy {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    conn.execute_batch(
        r#"
        CREATE TABLE "order" (
            id INTEGER PRIMARY KEY,
            note TEXT,
            shipping_street TEXT,
            shipping_city TEXT
        );
        CREATE TABLE customer (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            order_id INTEGER NOT NULL REFERENCES "order"(id)
        );
        CREATE TABLE line_item (
            id INTEGER PRIMARY KEY,
            qty INTEGER NOT NULL,
            order_id INTEGER NOT NULL REFERENCES "order"(id),
            items_key INTEGER NOT NULL
        );
        CREATE TABLE order_attributes (
            order_id INTEGER NOT NULL REFERENCES "order"(id),
            attributes_key TEXT NOT NULL,
            attributes TEXT NOT NULL
        );

        INSERT INTO "order" VALUES (42, 'rush', '1 Main St', 'Springfield');
        INSERT INTO customer VALUES (7, 'Ada', 42);
        INSERT INTO line_item VALUES (10, 2, 42, 0);
        INSERT INTO line_item VALUES (11, 5, 42, 1);
        INSERT INTO line_item VALUES (12, 1, 42, 2);
        INSERT INTO order_attributes VALUES (42, 'color', 'red');
        INSERT INTO order_attributes VALUES (42, 'size', 'xl');

        INSERT INTO "order" (id) VALUES (43);
        "#,
    )
    .unwrap();

    SingleSelectDataAccessStrategy::new(Dialect::SQLite, Arc::new(RusqliteExecutor::new(conn)))
}

fn full_order() -> Order {
    Order {
        id: 42,
        note: Some("rush".to_string()),
        shipping: Some(Shipping {
            street: "1 Main St".to_string(),
            city: "Springfield".to_string(),
        }),
        customer: Some(Customer {
            id: 7,
            name: "Ada".to_string(),
        }),
        items: vec![
            LineItem { id: 10, qty: 2 },
            LineItem { id: 11, qty: 5 },
            LineItem { id: 12, qty: 1 },
        ],
        attributes: BTreeMap::from([
            ("color".to_string(), "red".to_string()),
            ("size".to_string(), "xl".to_string()),
        ]),
    }
}

fn empty_order() -> Order {
    Order {
        id: 43,
        note: None,
        shipping: None,
        customer: None,
        items: Vec::new(),
        attributes: BTreeMap::new(),
    }
}

#[test]
fn loads_a_full_aggregate_in_one_statement() {
    let strategy = seeded_strategy();
    let found: Order = strategy.find_by_id(&Value::Integer(42)).unwrap().unwrap();
    assert_eq!(found, full_order());
}

#[test]
fn loads_an_aggregate_with_empty_branches() {
    let strategy = seeded_strategy();
    let found: Order = strategy.find_by_id(&Value::Integer(43)).unwrap().unwrap();
    assert_eq!(found, empty_order());
}

#[test]
fn missing_identifier_loads_nothing() {
    let strategy = seeded_strategy();
    let found: Option<Order> = strategy.find_by_id(&Value::Integer(99)).unwrap();
    assert!(found.is_none());
}

#[test]
fn loads_every_aggregate() {
    let strategy = seeded_strategy();
    let mut found: Vec<Order> = strategy.find_all().unwrap();
    found.sort_by_key(|order| order.id);
    assert_eq!(found, [full_order(), empty_order()]);
}

#[test]
fn reader_loads_an_identifier_set() {
    let strategy = seeded_strategy();
    let reader = strategy.factory().reader_for::<Order>().unwrap();

    let found = reader
        .find_all_by_id(&[Value::Integer(42), Value::Integer(99)])
        .unwrap();
    assert_eq!(found, [full_order()]);
}
