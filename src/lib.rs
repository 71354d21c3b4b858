//! Stored-procedure record gateway.
//!
//! A small data-access library that runs CRUD operations for arbitrary
//! record types through named stored procedures on PostgreSQL, MySQL and
//! SQLite (where procedures come from a [`db::ProcedureCatalog`]).

pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod models;

pub use config::Config;
pub use db::ProcedureCatalog;
pub use error::{GatewayError, GatewayResult};
pub use gateway::RecordGateway;
pub use models::{FromResultRow, Item, ParamSet, ResultRow, ToParams, Value};
