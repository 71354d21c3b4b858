//! The example entity used by the demo program.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named item keyed by UUID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub name: Option<String>,
}

impl Item {
    /// Create an item with a fresh random identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: Some(name.into()),
        }
    }
}

crate::impl_record!(Item {
    id => "Id",
    name => "Name",
});
