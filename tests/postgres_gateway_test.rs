//! Integration tests for the record gateway on PostgreSQL.
//!
//! Requires a server: set `TEST_POSTGRES_URL`, otherwise the tests skip.

use sproc_gateway::config::PoolOptions;
use sproc_gateway::models::ConnectionConfig;
use sproc_gateway::{ProcedureCatalog, RecordGateway};
use tokio_test::assert_ok;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
struct Stock {
    id: Uuid,
    qty: i32,
    ratio: f32,
}

sproc_gateway::impl_record!(Stock {
    id => "Id",
    qty => "Qty",
    ratio => "Ratio",
});

fn postgres_url() -> Option<String> {
    match std::env::var("TEST_POSTGRES_URL") {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!("Skipping test: TEST_POSTGRES_URL not set");
            None
        }
    }
}

#[tokio::test]
async fn test_narrow_fields_resolve_integer_and_real_arguments() {
    let Some(url) = postgres_url() else {
        return;
    };
    let suffix = Uuid::new_v4().simple().to_string();
    let table = format!("stock_{}", suffix);
    let add = format!("add_stock_{}", suffix);
    let list = format!("list_stock_{}", suffix);

    let admin = sqlx::PgPool::connect(&url).await.unwrap();
    sqlx::raw_sql(&format!(
        "CREATE TABLE {table} (id uuid PRIMARY KEY, qty integer NOT NULL, ratio real NOT NULL);
         CREATE FUNCTION {add}(id uuid, qty integer, ratio real) RETURNS integer AS $$
             INSERT INTO {table} VALUES ($1, $2, $3);
             SELECT 1;
         $$ LANGUAGE sql;
         CREATE FUNCTION {list}() RETURNS TABLE (id uuid, qty integer, ratio real) AS $$
             SELECT s.id, s.qty, s.ratio FROM {table} s;
         $$ LANGUAGE sql;"
    ))
    .execute(&admin)
    .await
    .unwrap();

    let config = ConnectionConfig::new(url, PoolOptions::default()).unwrap();
    let gateway = RecordGateway::connect(&config, ProcedureCatalog::new())
        .await
        .unwrap();
    let record = Stock {
        id: Uuid::new_v4(),
        qty: 12,
        ratio: 0.5,
    };

    let added = gateway.create_record(&add, &record).await;
    let listed = gateway.list_all::<Stock>(&list).await;
    gateway.close().await;

    sqlx::raw_sql(&format!(
        "DROP FUNCTION {list}(); DROP FUNCTION {add}(uuid, integer, real); DROP TABLE {table};"
    ))
    .execute(&admin)
    .await
    .unwrap();
    admin.close().await;

    assert_eq!(assert_ok!(added), 1);
    assert_eq!(assert_ok!(listed), vec![record]);
}
