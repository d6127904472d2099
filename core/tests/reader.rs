//! Reconstruction tests over a canned executor: flat rows in, nested
//! aggregates out, without touching a real database.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use rowfold_core::{
    Aggregate, AggregateReader, AggregateReaderFactory, Dialect, Entity, Executor, ResultRow,
    Result, RowfoldError, Value,
};
use serde::Deserialize;

/// Returns the same rows for every statement and records what was executed.
struct CannedRows {
    rows: Vec<ResultRow>,
    executed: Mutex<Vec<(String, Vec<Value>)>>,
}

impl CannedRows {
    fn new(rows: Vec<ResultRow>) -> Arc<Self> {
        Arc::new(Self {
            rows,
            executed: Mutex::new(Vec::new()),
        })
    }

    fn last_executed(&self) -> (String, Vec<Value>) {
        self.executed
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("nothing was executed")
    }
}

impl Executor for CannedRows {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<Vec<ResultRow>> {
        self.executed
            .lock()
            .map_err(|_| RowfoldError::Execution("log mutex poisoned".to_string()))?
            .push((sql.to_string(), params.to_vec()));
        Ok(self.rows.clone())
    }
}

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

fn reader(rows: Vec<ResultRow>) -> (AggregateReader<Order>, Arc<CannedRows>) {
    let executor = CannedRows::new(rows);
    let reader = AggregateReader::new(Dialect::SQLite, &Order::entity(), executor.clone()).unwrap();
    (reader, executor)
}

/// One flat row of the order query, cartesian across items and attributes.
fn order_row(
    order_id: i64,
    note: Value,
    item: Option<(i64, i64, i64)>,
    attribute: Option<(i64, &str, &str)>,
) -> ResultRow {
    let (item_rn, item_id, item_qty) = match item {
        Some((rn, id, qty)) => (Value::Integer(rn), Value::Integer(id), Value::Integer(qty)),
        None => (Value::Null, Value::Null, Value::Null),
    };
    let (attr_rn, attr_key, attr_value) = match attribute {
        Some((rn, key, value)) => (Value::Integer(rn), Value::from(key), Value::from(value)),
        None => (Value::Null, Value::Null, Value::Null),
    };
    ResultRow::new()
        .with("id", order_id)
        .with("note", note)
        .with("shipping.street", "1 Main St")
        .with("shipping.city", "Springfield")
        .with("customer.id", 7i64)
        .with("customer.name", "Ada")
        .with("items__rn", item_rn)
        .with("items__key", item_rn2key(item))
        .with("items.id", item_id)
        .with("items.qty", item_qty)
        .with("attributes__rn", attr_rn)
        .with("attributes__key", attr_key)
        .with("attributes", attr_value)
}

fn item_rn2key(item: Option<(i64, i64, i64)>) -> Value {
    match item {
        Some((rn, _, _)) => Value::Integer(rn - 1),
        None => Value::Null,
    }
}

/// Three items times two attributes, as the flattened join produces them.
fn full_order_rows() -> Vec<ResultRow> {
    let items = [(1, 10, 2), (2, 11, 5), (3, 12, 1)];
    let attributes = [(1, "color", "red"), (2, "size", "xl")];
    let mut rows = Vec::new();
    for item in items {
        for attribute in attributes {
            rows.push(order_row(42, Value::from("rush"), Some(item), Some(attribute)));
        }
    }
    rows
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

#[test]
fn folds_the_flattened_join_back_into_one_aggregate() {
    let (reader, _) = reader(full_order_rows());
    let found = reader.find_by_id(&Value::Integer(42)).unwrap().unwrap();
    assert_eq!(found, full_order());
}

#[test]
fn item_order_follows_row_numbers() {
    let (reader, _) = reader(full_order_rows());
    let found = reader.find_by_id(&Value::Integer(42)).unwrap().unwrap();
    let ids: Vec<i64> = found.items.iter().map(|i| i.id).collect();
    assert_eq!(ids, [10, 11, 12]);
}

#[test]
fn row_order_does_not_matter() {
    let mut rows = full_order_rows();
    rows.reverse();
    rows.rotate_left(2);

    let (reader, _) = reader(rows);
    let found = reader.find_by_id(&Value::Integer(42)).unwrap().unwrap();
    assert_eq!(found, full_order());
}

#[test]
fn empty_branches_come_back_empty_not_as_null_elements() {
    // one row, every multi-valued branch NULL, association absent
    let row = ResultRow::new()
        .with("id", 42i64)
        .with("note", Value::Null)
        .with("shipping.street", Value::Null)
        .with("shipping.city", Value::Null)
        .with("customer.id", Value::Null)
        .with("customer.name", Value::Null)
        .with("items__rn", Value::Null)
        .with("items__key", Value::Null)
        .with("items.id", Value::Null)
        .with("items.qty", Value::Null)
        .with("attributes__rn", Value::Null)
        .with("attributes__key", Value::Null)
        .with("attributes", Value::Null);

    let (reader, _) = reader(vec![row]);
    let found = reader.find_by_id(&Value::Integer(42)).unwrap().unwrap();

    assert_eq!(found.id, 42);
    assert!(found.note.is_none());
    assert!(found.shipping.is_none());
    assert!(found.customer.is_none());
    assert!(found.items.is_empty());
    assert!(found.attributes.is_empty());
}

#[test]
fn unmatched_identifier_is_none() {
    let (reader, _) = reader(Vec::new());
    assert!(reader.find_by_id(&Value::Integer(99)).unwrap().is_none());
}

#[test]
fn find_all_keeps_first_seen_group_order() {
    let mut rows = Vec::new();
    rows.push(order_row(2, Value::Null, Some((1, 20, 1)), None));
    rows.push(order_row(1, Value::Null, Some((1, 10, 1)), None));
    rows.push(order_row(2, Value::Null, Some((2, 21, 3)), None));

    let (reader, _) = reader(rows);
    let found = reader.find_all().unwrap();

    let ids: Vec<i64> = found.iter().map(|o| o.id).collect();
    assert_eq!(ids, [2, 1]);
    assert_eq!(found[0].items.len(), 2);
    assert_eq!(found[1].items.len(), 1);
}

#[test]
fn id_set_travels_as_one_json_parameter_on_sqlite() {
    let (reader, executor) = reader(Vec::new());
    let found = reader
        .find_all_by_id(&[Value::Integer(1), Value::Integer(2)])
        .unwrap();
    assert!(found.is_empty());

    let (sql, params) = executor.last_executed();
    assert!(sql.contains("json_each(?)"));
    assert_eq!(params, [Value::Text("[1,2]".to_string())]);
}

#[test]
fn empty_id_set_skips_execution() {
    let (reader, executor) = reader(full_order_rows());
    let found = reader.find_all_by_id(&[]).unwrap();
    assert!(found.is_empty());
    assert!(executor.executed.lock().unwrap().is_empty());
}

#[test]
fn null_root_identifier_is_a_data_integrity_error() {
    let row = order_row(42, Value::Null, None, None).with("id", Value::Null);
    let (reader, _) = reader(vec![row]);

    let err = reader.find_all().unwrap_err();
    assert!(matches!(err, RowfoldError::DataIntegrity(_)));
}

#[test]
fn two_groups_for_one_identifier_is_a_data_integrity_error() {
    let rows = vec![
        order_row(1, Value::Null, None, None),
        order_row(2, Value::Null, None, None),
    ];
    let (reader, _) = reader(rows);

    let err = reader.find_by_id(&Value::Integer(1)).unwrap_err();
    assert!(matches!(err, RowfoldError::DataIntegrity(_)));
}

#[test]
fn missing_projected_column_is_a_data_integrity_error() {
    let row = ResultRow::new().with("id", 42i64);
    let (reader, _) = reader(vec![row]);

    let err = reader.find_by_id(&Value::Integer(42)).unwrap_err();
    match err {
        RowfoldError::DataIntegrity(message) => assert!(message.contains("missing column")),
        other => panic!("expected DataIntegrity, got {other:?}"),
    }
}

#[test]
fn mismatched_target_type_is_a_mapping_error() {
    #[derive(Debug, Deserialize)]
    struct Strict {
        #[allow(dead_code)]
        id: String, // the column holds an integer
    }

    impl Aggregate for Strict {
        fn entity() -> Arc<Entity> {
            Entity::builder("marker").id("id").build()
        }
    }

    let executor = CannedRows::new(vec![ResultRow::new().with("id", 1i64)]);
    let reader: AggregateReader<Strict> =
        AggregateReader::new(Dialect::SQLite, &Strict::entity(), executor).unwrap();

    let err = reader.find_all().unwrap_err();
    assert!(matches!(err, RowfoldError::Mapping(_)));
}

#[test]
fn ordered_scalar_values_round_trip() {
    #[derive(Debug, Deserialize, PartialEq)]
    struct Playlist {
        id: i64,
        tracks: Vec<String>,
    }

    impl Aggregate for Playlist {
        fn entity() -> Arc<Entity> {
            Entity::builder("playlist")
                .id("id")
                .ordered_scalar_list("tracks")
                .build()
        }
    }

    let rows = vec![
        ResultRow::new()
            .with("id", 5i64)
            .with("tracks__rn", 2i64)
            .with("tracks__key", 1i64)
            .with("tracks", "b-side"),
        ResultRow::new()
            .with("id", 5i64)
            .with("tracks__rn", 1i64)
            .with("tracks__key", 0i64)
            .with("tracks", "a-side"),
    ];
    let executor = CannedRows::new(rows);
    let reader: AggregateReader<Playlist> =
        AggregateReader::new(Dialect::SQLite, &Playlist::entity(), executor).unwrap();

    let found = reader.find_by_id(&Value::Integer(5)).unwrap().unwrap();
    assert_eq!(
        found,
        Playlist {
            id: 5,
            tracks: vec!["a-side".to_string(), "b-side".to_string()],
        }
    );
}

#[derive(Debug, Deserialize, PartialEq)]
struct Region {
    id: i64,
    name: String,
}

#[derive(Debug, Deserialize, PartialEq)]
struct Dispatch {
    street: Option<String>,
    region: Option<Region>,
}

#[derive(Debug, Deserialize, PartialEq)]
struct Shipment {
    id: i64,
    shipping: Option<Dispatch>,
}

impl Aggregate for Shipment {
    fn entity() -> Arc<Entity> {
        let region = Entity::builder("region").id("id").scalar("name").build();
        let dispatch = Entity::builder("dispatch")
            .scalar("street")
            .one("region", region)
            .build();
        Entity::builder("shipment")
            .id("id")
            .embedded("shipping", dispatch)
            .build()
    }
}

fn shipment_reader(rows: Vec<ResultRow>) -> AggregateReader<Shipment> {
    AggregateReader::new(Dialect::SQLite, &Shipment::entity(), CannedRows::new(rows)).unwrap()
}

#[test]
fn absent_embedded_with_association_collapses_to_none() {
    let row = ResultRow::new()
        .with("id", 42i64)
        .with("shipping.street", Value::Null)
        .with("shipping.region.id", Value::Null)
        .with("shipping.region.name", Value::Null);

    let reader = shipment_reader(vec![row]);
    let found = reader.find_by_id(&Value::Integer(42)).unwrap().unwrap();

    assert_eq!(
        found,
        Shipment {
            id: 42,
            shipping: None,
        }
    );
}

#[test]
fn embedded_with_present_association_survives_null_leaves() {
    let row = ResultRow::new()
        .with("id", 42i64)
        .with("shipping.street", Value::Null)
        .with("shipping.region.id", 3i64)
        .with("shipping.region.name", "west");

    let reader = shipment_reader(vec![row]);
    let found = reader.find_by_id(&Value::Integer(42)).unwrap().unwrap();

    assert_eq!(
        found,
        Shipment {
            id: 42,
            shipping: Some(Dispatch {
                street: None,
                region: Some(Region {
                    id: 3,
                    name: "west".to_string(),
                }),
            }),
        }
    );
}

#[test]
fn factory_hands_out_the_same_reader_twice() {
    let factory = AggregateReaderFactory::new(Dialect::SQLite, CannedRows::new(Vec::new()));

    let first = factory.reader_for::<Order>().unwrap();
    let second = factory.reader_for::<Order>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}
