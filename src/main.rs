//! Stored-procedure gateway demo.
//!
//! Runs the full set of record operations for [`Item`] against the
//! configured database.

use clap::Parser;
use sproc_gateway::config::Config;
use sproc_gateway::models::{DatabaseType, Item};
use sproc_gateway::{GatewayError, GatewayResult, ProcedureCatalog, RecordGateway};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const BUNDLED_CATALOG: &str = include_str!("../demos/items_catalog.json");

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init();
    }
}

fn load_catalog(config: &Config, db_type: DatabaseType) -> GatewayResult<ProcedureCatalog> {
    match &config.catalog {
        Some(path) => ProcedureCatalog::from_file(path),
        None if db_type == DatabaseType::SQLite => ProcedureCatalog::from_json(BUNDLED_CATALOG),
        // Server backends resolve procedures themselves
        None => Ok(ProcedureCatalog::new()),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("<unserializable: {}>", e))
}

async fn run_demo(gateway: &RecordGateway) -> GatewayResult<()> {
    let item = Item::new("Dima");
    let added = gateway.create_record("addrecord", &item).await?;
    info!(id = %item.id, rows_affected = added, "Added record");

    let items: Vec<Item> = gateway.list_all("getrecords").await?;
    info!(count = items.len(), items = %to_json(&items), "Listed records");

    let renamed = Item {
        id: item.id,
        name: Some("Dima1".to_string()),
    };
    let updated = gateway.update_record("updaterecord", &renamed).await?;
    info!(id = %item.id, rows_affected = updated, "Updated record");

    let deleted = gateway.delete_record("deleterecord", item.id).await?;
    info!(id = %item.id, rows_affected = deleted, "Deleted record");

    let found: Option<Item> = gateway.get_by_id("getrecordbyid", item.id).await?;
    info!(id = %item.id, found = %to_json(&found), "Looked up record by id");

    let by_name: Vec<Item> = gateway
        .list_by_field("getrecordsbyname", "Name", "Dima")
        .await?;
    info!(count = by_name.len(), items = %to_json(&by_name), "Listed records by name");

    match gateway
        .get_one_by_field::<Item>("getonebyname", "Name", "Dima")
        .await
    {
        Ok(one) => info!(found = %to_json(&one), "Looked up one record by name"),
        Err(e @ GatewayError::MultipleRows { .. }) => {
            warn!(error = %e, "Name is not unique")
        }
        Err(e) => return Err(e),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    // Initialize logging
    init_tracing(&config);

    info!("Starting sproc-gateway demo v{}", env!("CARGO_PKG_VERSION"));

    let connection = config.parse_database()?.to_connection_config()?;
    let catalog = load_catalog(&config, connection.db_type)?;
    let names: Vec<&str> = catalog.procedure_names().collect();
    info!(
        db_type = %connection.db_type,
        count = catalog.len(),
        procedures = ?names,
        "Loaded procedure catalog"
    );

    let gateway = RecordGateway::connect(&connection, catalog).await?;
    let result = run_demo(&gateway).await;
    gateway.close().await;

    if let Err(e) = result {
        match e.suggestion() {
            Some(suggestion) => error!(error = %e, suggestion, "Demo failed"),
            None => error!(error = %e, "Demo failed"),
        }
        return Err(e.into());
    }

    info!("Demo complete");
    Ok(())
}
