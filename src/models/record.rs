//! Result rows and the record mapping traits.

use crate::error::{GatewayError, GatewayResult};
use crate::models::value::{FromValue, ParamSet, Value};

/// One decoded row of a procedure result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultRow {
    columns: Vec<(String, Value)>,
}

static NULL: Value = Value::Null;

impl ResultRow {
    pub fn new(columns: Vec<(String, Value)>) -> Self {
        Self { columns }
    }

    /// Look up a column by name, ignoring case.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, value)| value)
    }

    /// Convert a column into a field type.
    ///
    /// A column missing from the row converts like NULL, so optional fields
    /// tolerate procedures that do not project them.
    pub fn get_as<T: FromValue>(&self, column: &str) -> GatewayResult<T> {
        let value = self.get(column).unwrap_or(&NULL);
        T::from_value(value).map_err(|message| GatewayError::mapping(column, message))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Serialize every public field of a record as named parameters.
pub trait ToParams {
    fn to_params(&self) -> ParamSet;
}

/// Build a record from a row of named columns.
pub trait FromResultRow: Sized {
    fn from_row(row: &ResultRow) -> GatewayResult<Self>;
}

impl FromResultRow for ResultRow {
    fn from_row(row: &ResultRow) -> GatewayResult<Self> {
        Ok(row.clone())
    }
}

impl ToParams for ParamSet {
    fn to_params(&self) -> ParamSet {
        self.clone()
    }
}

/// Implement [`ToParams`] and [`FromResultRow`] for a plain struct.
///
/// Every field must be listed with the column/parameter name it maps to.
///
/// # Example
///
/// ```ignore
/// pub struct Item {
///     pub id: Uuid,
///     pub name: Option<String>,
/// }
///
/// impl_record!(Item {
///     id => "Id",
///     name => "Name",
/// });
/// ```
#[macro_export]
macro_rules! impl_record {
    ($ty:ident { $($field:ident => $column:literal),+ $(,)? }) => {
        impl $crate::models::ToParams for $ty {
            fn to_params(&self) -> $crate::models::ParamSet {
                let mut params = $crate::models::ParamSet::new();
                $(
                    params.add($column, $crate::models::ToValue::to_value(&self.$field));
                )+
                params
            }
        }

        impl $crate::models::FromResultRow for $ty {
            fn from_row(
                row: &$crate::models::ResultRow,
            ) -> $crate::error::GatewayResult<Self> {
                Ok(Self {
                    $( $field: row.get_as($column)?, )+
                })
            }
        }
    };
}
