//! Data models for the record gateway.
//!
//! This module re-exports all model types used throughout the crate.

pub mod connection;
pub mod item;
pub mod record;
pub mod value;

// Re-export commonly used types
pub use connection::{ConnectionConfig, DatabaseType};
pub use item::Item;
pub use record::{FromResultRow, ResultRow, ToParams};
pub use value::{FromValue, ParamSet, ToValue, Value};
