//! Scalar values and named parameter sets.
//!
//! A `Value` is what crosses the procedure boundary in either direction:
//! bound into a call through a `ParamSet`, or decoded out of a result column.

use chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;

/// A dynamically typed scalar.
///
/// 32-bit fields keep their width so they bind as `int4`/`float4` where the
/// server resolves calls by argument type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Int32(i32),
    Float(f64),
    Float32(f32),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this value for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Int32(_) => "int32",
            Self::Float(_) => "float",
            Self::Float32(_) => "float32",
            Self::Uuid(_) => "uuid",
            Self::Timestamp(_) => "timestamp",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float32(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

// =============================================================================
// Field Conversions
// =============================================================================

/// Convert a record field into a bindable value.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

/// Build a record field from a decoded column value.
///
/// `value` is `Value::Null` both for SQL NULL and for a column the result
/// set does not contain; only `Option<T>` accepts it.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, String>;
}

macro_rules! to_value_via_from {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl ToValue for $ty {
                fn to_value(&self) -> Value {
                    Value::from(self.clone())
                }
            }
        )+
    };
}

to_value_via_from!(String, i64, i32, bool, f64, f32, Uuid, DateTime<Utc>, Vec<u8>);

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map(ToValue::to_value).unwrap_or(Value::Null)
    }
}

fn mismatch(expected: &str, value: &Value) -> String {
    if value.is_null() {
        format!("expected {}, found NULL or missing column", expected)
    } else {
        format!("expected {}, found {}", expected, value.type_name())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, String> {
        Ok(value.clone())
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            Value::Uuid(u) => Ok(u.to_string()),
            other => Err(mismatch("text", other)),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Int(v) => Ok(*v),
            Value::Int32(v) => Ok(i64::from(*v)),
            Value::Bool(b) => Ok(i64::from(*b)),
            other => Err(mismatch("integer", other)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self, String> {
        if let Value::Int32(v) = value {
            return Ok(*v);
        }
        let wide = i64::from_value(value)?;
        i32::try_from(wide).map_err(|_| format!("integer {} out of range for i32", wide))
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Float(v) => Ok(*v),
            Value::Float32(v) => Ok(f64::from(*v)),
            Value::Int(v) => Ok(*v as f64),
            Value::Int32(v) => Ok(f64::from(*v)),
            // DECIMAL/NUMERIC columns decode as their exact text
            Value::Text(s) => s
                .parse()
                .map_err(|_| format!("'{}' is not a number", s)),
            other => Err(mismatch("float", other)),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Float32(v) => Ok(*v),
            other => f64::from_value(other).map(|v| v as f32),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Int(0) | Value::Int32(0) => Ok(false),
            Value::Int(1) | Value::Int32(1) => Ok(true),
            other => Err(mismatch("boolean", other)),
        }
    }
}

impl FromValue for Uuid {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Uuid(u) => Ok(*u),
            Value::Text(s) => Uuid::parse_str(s).map_err(|e| format!("invalid UUID '{}': {}", s, e)),
            Value::Bytes(b) => Uuid::from_slice(b).map_err(|e| format!("invalid UUID bytes: {}", e)),
            other => Err(mismatch("uuid", other)),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Timestamp(t) => Ok(*t),
            Value::Text(s) => parse_timestamp(s),
            other => Err(mismatch("timestamp", other)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Bytes(b) => Ok(b.clone()),
            other => Err(mismatch("bytes", other)),
        }
    }
}

/// Parse RFC 3339 text, falling back to a zone-less `YYYY-MM-DD HH:MM:SS`
/// form interpreted as UTC.
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|_| format!("'{}' is not a timestamp", s))
}

// =============================================================================
// Named Parameter Set
// =============================================================================

/// Ordered name → value mapping bound into one procedure call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamSet {
    entries: Vec<(String, Value)>,
}

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter. A leading `@` or `:` is stripped from the name; an
    /// existing parameter with the same name (ignoring case) is replaced in
    /// place.
    pub fn add(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        let name = normalize_name(name);
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
        self
    }

    /// Builder-style variant of [`ParamSet::add`].
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.add(name, value);
        self
    }

    /// Look up a parameter by name, ignoring case and sigil.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let name = normalize_name(name);
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, value)| value)
    }
}

fn normalize_name(name: &str) -> &str {
    name.strip_prefix('@')
        .or_else(|| name.strip_prefix(':'))
        .unwrap_or(name)
}
