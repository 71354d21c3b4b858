//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Connection pool management
//! - Procedure execution per backend
//! - The SQLite procedure catalog
//! - Type mappings from driver rows to [`crate::models::Value`]
//! - Database dispatch macros for reducing code duplication

#[macro_use]
pub mod macros;
pub mod catalog;
pub mod executor;
pub mod params;
pub mod pool;
pub mod types;

pub use catalog::{ProcedureCatalog, ProcedureDefinition};
pub use executor::ProcedureExecutor;
pub use pool::DbPool;
