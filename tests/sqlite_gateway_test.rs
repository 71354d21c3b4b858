//! Integration tests for the record gateway on SQLite.
//!
//! Tests verify that:
//! - Records round-trip through create / get / list / update / delete
//! - Lookups return None or an empty list when nothing matches
//! - Single-row lookups fail when more than one row matches
//! - Procedure failures, mapping failures and connection failures surface
//!   as distinct error kinds
//! - Cancelled or early-stopped operations give their connection back

use sproc_gateway::config::PoolOptions;
use sproc_gateway::db::ProcedureCatalog;
use sproc_gateway::models::{ConnectionConfig, Item, ParamSet, Value};
use sproc_gateway::{GatewayError, RecordGateway};
use tempfile::{NamedTempFile, TempPath};
use std::time::Duration;
use tokio_test::assert_ok;
use uuid::Uuid;

const ITEMS_CATALOG: &str = include_str!("../demos/items_catalog.json");

/// A gateway over a temporary database file, removed on drop.
struct TestDb {
    gateway: RecordGateway,
    _path: TempPath,
}

fn items_catalog() -> ProcedureCatalog {
    ProcedureCatalog::from_json(ITEMS_CATALOG)
        .unwrap()
        .with_procedure(
            "getduplicatesbyid",
            "SELECT Id, Name FROM items WHERE Id = @Id \
             UNION ALL SELECT Id, Name FROM items WHERE Id = @Id",
        )
        .and_then(|c| c.with_procedure("getnamelessids", "SELECT NULL AS Id, Name FROM items"))
        .and_then(|c| c.with_procedure("countitems", "SELECT COUNT(*) AS Total FROM items"))
        .and_then(|c| {
            c.with_procedure(
                "manyrecords",
                "WITH RECURSIVE n(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM n WHERE x < 200000) \
                 SELECT '00000000-0000-0000-0000-000000000000' AS Id, 'n' || x AS Name FROM n",
            )
        })
        .unwrap()
}

async fn setup_db() -> TestDb {
    setup_db_with(PoolOptions::default()).await
}

async fn setup_db_with(pool_options: PoolOptions) -> TestDb {
    let path = NamedTempFile::new().unwrap().into_temp_path();
    let url = format!("sqlite:{}", path.to_str().unwrap());
    let config = ConnectionConfig::new(url, pool_options).unwrap();
    let gateway = RecordGateway::connect(&config, items_catalog()).await.unwrap();
    TestDb {
        gateway,
        _path: path,
    }
}

fn item(name: &str) -> Item {
    Item::new(name)
}

#[tokio::test]
async fn test_create_then_get_by_id_round_trips() {
    let db = setup_db().await;
    let record = item("Dima");

    let added = assert_ok!(db.gateway.create_record("addrecord", &record).await);
    assert_eq!(added, 1);

    let found: Option<Item> = assert_ok!(db.gateway.get_by_id("getrecordbyid", record.id).await);
    assert_eq!(found, Some(record));
}

#[tokio::test]
async fn test_null_field_round_trips() {
    let db = setup_db().await;
    let record = Item {
        id: Uuid::new_v4(),
        name: None,
    };
    db.gateway.create_record("addrecord", &record).await.unwrap();

    let found: Option<Item> = db.gateway.get_by_id("getrecordbyid", record.id).await.unwrap();
    assert_eq!(found, Some(record));
}

#[tokio::test]
async fn test_list_all_empty() {
    let db = setup_db().await;
    let items: Vec<Item> = db.gateway.list_all("getrecords").await.unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn test_list_all_in_store_order() {
    let db = setup_db().await;
    let first = item("a");
    let second = item("b");
    db.gateway.create_record("addrecord", &first).await.unwrap();
    db.gateway.create_record("addrecord", &second).await.unwrap();

    let items: Vec<Item> = db.gateway.list_all("getrecords").await.unwrap();
    assert_eq!(items, vec![first, second]);
}

#[tokio::test]
async fn test_delete_missing_id_returns_zero() {
    let db = setup_db().await;
    let deleted = db
        .gateway
        .delete_record("deleterecord", Uuid::new_v4())
        .await
        .unwrap();
    assert_eq!(deleted, 0);
}

#[tokio::test]
async fn test_get_by_id_missing_is_none() {
    let db = setup_db().await;
    let found: Option<Item> = db
        .gateway
        .get_by_id("getrecordbyid", Uuid::new_v4())
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_list_by_field_cardinality() {
    let db = setup_db().await;
    let first = item("Dima");
    let second = item("Dima");
    db.gateway.create_record("addrecord", &first).await.unwrap();
    db.gateway.create_record("addrecord", &item("Kate")).await.unwrap();
    db.gateway.create_record("addrecord", &second).await.unwrap();

    let none: Vec<Item> = db
        .gateway
        .list_by_field("getrecordsbyname", "Name", "Nobody")
        .await
        .unwrap();
    assert!(none.is_empty());

    let dimas: Vec<Item> = db
        .gateway
        .list_by_field("getrecordsbyname", "Name", "Dima")
        .await
        .unwrap();
    assert_eq!(dimas, vec![first, second]);
}

#[tokio::test]
async fn test_get_one_by_field() {
    let db = setup_db().await;
    let kate = item("Kate");
    db.gateway.create_record("addrecord", &kate).await.unwrap();

    let found: Option<Item> = db
        .gateway
        .get_one_by_field("getonebyname", "Name", "Kate")
        .await
        .unwrap();
    assert_eq!(found, Some(kate));

    let missing: Option<Item> = db
        .gateway
        .get_one_by_field("getonebyname", "Name", "Nobody")
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_get_one_by_field_with_duplicates_fails() {
    let db = setup_db().await;
    db.gateway.create_record("addrecord", &item("Dima")).await.unwrap();
    db.gateway.create_record("addrecord", &item("Dima")).await.unwrap();

    let err = db
        .gateway
        .get_one_by_field::<Item>("getonebyname", "Name", "Dima")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GatewayError::MultipleRows { ref procedure } if procedure == "getonebyname"
    ));
}

#[tokio::test]
async fn test_get_by_id_with_duplicates_fails() {
    let db = setup_db().await;
    let record = item("Dima");
    db.gateway.create_record("addrecord", &record).await.unwrap();

    let err = db
        .gateway
        .get_by_id::<Item>("getduplicatesbyid", record.id)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::MultipleRows { .. }));
}

#[tokio::test]
async fn test_update_upserts_single_row() {
    let db = setup_db().await;
    let record = item("Dima");
    db.gateway.create_record("addrecord", &record).await.unwrap();

    let renamed = Item {
        id: record.id,
        name: Some("Dima1".to_string()),
    };
    let updated = db.gateway.update_record("updaterecord", &renamed).await.unwrap();
    assert_eq!(updated, 1);

    let items: Vec<Item> = db.gateway.list_all("getrecords").await.unwrap();
    assert_eq!(items, vec![renamed]);
}

#[tokio::test]
async fn test_update_missing_id_inserts() {
    let db = setup_db().await;
    let record = item("fresh");
    db.gateway.update_record("updaterecord", &record).await.unwrap();

    let found: Option<Item> = db.gateway.get_by_id("getrecordbyid", record.id).await.unwrap();
    assert_eq!(found, Some(record));
}

#[tokio::test]
async fn test_dima_scenario() {
    let db = setup_db().await;
    let dima = item("Dima");

    db.gateway.create_record("addrecord", &dima).await.unwrap();

    let items: Vec<Item> = db.gateway.list_all("getrecords").await.unwrap();
    assert_eq!(items, vec![dima.clone()]);

    let deleted = db.gateway.delete_record("deleterecord", dima.id).await.unwrap();
    assert_eq!(deleted, 1);

    let found: Option<Item> = db.gateway.get_by_id("getrecordbyid", dima.id).await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_unknown_procedure_is_remote_error() {
    let db = setup_db().await;
    let err = db.gateway.list_all::<Item>("nosuchprocedure").await.unwrap_err();
    assert!(matches!(
        err,
        GatewayError::RemoteExecution { ref procedure, .. } if procedure == "nosuchprocedure"
    ));
}

#[tokio::test]
async fn test_procedure_names_ignore_case() {
    let db = setup_db().await;
    let record = item("Dima");
    db.gateway.create_record("AddRecord", &record).await.unwrap();
    let items: Vec<Item> = db.gateway.list_all("GETRECORDS").await.unwrap();
    assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn test_constraint_violation_is_remote_error() {
    let db = setup_db().await;
    let record = item("Dima");
    db.gateway.create_record("addrecord", &record).await.unwrap();

    let err = db
        .gateway
        .create_record("addrecord", &record)
        .await
        .unwrap_err();
    match err {
        GatewayError::RemoteExecution {
            procedure,
            sql_state,
            ..
        } => {
            assert_eq!(procedure, "addrecord");
            assert!(sql_state.is_some());
        }
        other => panic!("expected RemoteExecution, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_argument_is_remote_error() {
    let db = setup_db().await;
    let err = db
        .gateway
        .execute("deleterecord", &ParamSet::new())
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::RemoteExecution { .. }));
    assert!(err.to_string().contains("@Id"));
}

#[tokio::test]
async fn test_undeclared_argument_is_remote_error() {
    let db = setup_db().await;
    let err = db
        .gateway
        .list_by_field::<Item>("getrecordsbyname", "Colour", "red")
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::RemoteExecution { .. }));
}

#[tokio::test]
async fn test_invalid_parameter_name_is_invalid_input() {
    let db = setup_db().await;
    let err = db
        .gateway
        .list_by_field::<Item>("getrecordsbyname", "Name = 1 OR 1", "x")
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::InvalidInput { .. }));
}

#[tokio::test]
async fn test_null_required_field_is_mapping_error() {
    let db = setup_db().await;
    db.gateway.create_record("addrecord", &item("Dima")).await.unwrap();

    let err = db.gateway.list_all::<Item>("getnamelessids").await.unwrap_err();
    assert!(matches!(err, GatewayError::Mapping { ref column, .. } if column == "Id"));
}

#[tokio::test]
async fn test_untyped_query_single() {
    let db = setup_db().await;
    db.gateway.create_record("addrecord", &item("a")).await.unwrap();
    db.gateway.create_record("addrecord", &item("b")).await.unwrap();

    let row = db
        .gateway
        .query_single("countitems", &ParamSet::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.get("total"), Some(&Value::Int(2)));
}

#[tokio::test]
async fn test_unreachable_database_is_connectivity_error() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!(
        "sqlite:{}",
        dir.path().join("missing").join("items.db").display()
    );
    let config = ConnectionConfig::new(url, PoolOptions::default()).unwrap();

    let err = RecordGateway::connect(&config, items_catalog())
        .await
        .unwrap_err();
    assert!(err.is_connectivity());
    assert!(err.suggestion().is_some());
}

#[tokio::test]
async fn test_closed_gateway_is_connectivity_error() {
    let db = setup_db().await;
    db.gateway.close().await;

    let err = db.gateway.list_all::<Item>("getrecords").await.unwrap_err();
    assert!(err.is_connectivity());
}

#[tokio::test]
async fn test_concurrent_operations() {
    let db = setup_db().await;
    let records: Vec<Item> = (0..8).map(|i| item(&format!("item-{i}"))).collect();

    let mut handles = Vec::new();
    for record in records.clone() {
        let gateway = db.gateway.clone();
        handles.push(tokio::spawn(async move {
            gateway.create_record("addrecord", &record).await
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), 1);
    }

    let (all, one) = tokio::join!(
        db.gateway.list_all::<Item>("getrecords"),
        db.gateway.get_by_id::<Item>("getrecordbyid", records[3].id),
    );
    assert_eq!(all.unwrap().len(), records.len());
    assert_eq!(one.unwrap(), Some(records[3].clone()));
}

/// The SQLite pool holds a single connection; a short acquire timeout turns
/// a leaked connection into a failure instead of a hang.
fn single_connection_options() -> PoolOptions {
    PoolOptions {
        acquire_timeout_secs: Some(2),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_cancelled_list_releases_connection() {
    let db = setup_db_with(single_connection_options()).await;

    let cancelled = tokio::time::timeout(
        Duration::from_millis(1),
        db.gateway.list_all::<Item>("manyrecords"),
    )
    .await;
    assert!(cancelled.is_err());

    let added = assert_ok!(db.gateway.create_record("addrecord", &item("after")).await);
    assert_eq!(added, 1);
}

#[tokio::test]
async fn test_write_after_multiple_rows_succeeds() {
    let db = setup_db_with(single_connection_options()).await;
    db.gateway.create_record("addrecord", &item("Dima")).await.unwrap();
    db.gateway.create_record("addrecord", &item("Dima")).await.unwrap();

    let err = db
        .gateway
        .get_one_by_field::<Item>("getonebyname", "Name", "Dima")
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::MultipleRows { .. }));
    let added = assert_ok!(db.gateway.create_record("addrecord", &item("Kate")).await);
    assert_eq!(added, 1);

    // Most of the result set is still unread when the lookup stops
    let err = db
        .gateway
        .query_single("manyrecords", &ParamSet::new())
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::MultipleRows { .. }));
    let added = assert_ok!(db.gateway.create_record("addrecord", &item("Olga")).await);
    assert_eq!(added, 1);

    let items: Vec<Item> = db.gateway.list_all("getrecords").await.unwrap();
    assert_eq!(items.len(), 4);
}
