//! Storage and member type definitions.
//!
//! [`FieldType`] is the storage-level kind of a column and knows its SQL type
//! name. [`MemberKind`] describes the Rust value a mapped member holds, and
//! [`Value`] is the dynamically typed value moved between members and rows.

use std::fmt;

use chrono::{DateTime, Utc};

/// Storage-level value kinds and their SQL type names.
///
/// # Examples
///
/// ```
/// use relmap_core::FieldType;
///
/// assert_eq!(FieldType::Real.storage_name(), "REAL");
/// // Dates are stored as epoch seconds in an INTEGER column.
/// assert_eq!(FieldType::Date.storage_name(), "INTEGER");
/// assert_ne!(FieldType::Date, FieldType::Integer);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FieldType {
    /// No value.
    #[default]
    Null,
    /// Signed integer, 1-8 bytes depending on magnitude.
    Integer,
    /// 8-byte IEEE floating point.
    Real,
    /// Text in the database encoding.
    Text,
    /// Boolean stored as integer 0 or 1.
    Boolean,
    /// Unix time in seconds, stored as an integer.
    Date,
}

impl FieldType {
    /// Returns the SQL type name used in `CREATE TABLE`.
    pub fn storage_name(self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Integer | Self::Date => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
            Self::Boolean => "BOOLEAN",
        }
    }

    /// Numeric kinds emit their default values unquoted.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Real)
    }

    /// Encodes a timestamp as the epoch-seconds integer stored in `Date` columns.
    pub fn encode_date(value: DateTime<Utc>) -> i64 {
        value.timestamp()
    }

    /// Decodes a stored `Date` column; `None` when the seconds are out of range.
    pub fn decode_date(seconds: i64) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(seconds, 0)
    }
}

/// Underlying Rust type of a mapped member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberType {
    Int32,
    Int64,
    Float32,
    Float64,
    Text,
    Bool,
    Timestamp,
}

impl MemberType {
    fn rust_name(self) -> &'static str {
        match self {
            Self::Int32 => "i32",
            Self::Int64 => "i64",
            Self::Float32 => "f32",
            Self::Float64 => "f64",
            Self::Text => "String",
            Self::Bool => "bool",
            Self::Timestamp => "DateTime<Utc>",
        }
    }
}

/// A member's underlying type plus whether it is wrapped in `Option`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberKind {
    pub ty: MemberType,
    pub optional: bool,
}

impl MemberKind {
    pub const fn required(ty: MemberType) -> Self {
        Self {
            ty,
            optional: false,
        }
    }

    pub const fn optional(ty: MemberType) -> Self {
        Self { ty, optional: true }
    }

    /// Fixed-size numeric members that cannot represent an absent value.
    pub fn is_primitive(self) -> bool {
        !self.optional
            && matches!(
                self.ty,
                MemberType::Int32 | MemberType::Int64 | MemberType::Float32 | MemberType::Float64
            )
    }
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.optional {
            write!(f, "Option<{}>", self.ty.rust_name())
        } else {
            f.write_str(self.ty.rust_name())
        }
    }
}

/// A dynamically typed member value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Text(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Returns the string encoding stored in a value bag, or `None` for null.
    ///
    /// ```
    /// use relmap_core::Value;
    ///
    /// assert_eq!(Value::Float64(1.5).encode().as_deref(), Some("1.5"));
    /// assert_eq!(Value::Int32(-3).encode().as_deref(), Some("-3"));
    /// assert_eq!(Value::Null.encode(), None);
    /// ```
    pub fn encode(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Int32(v) => Some(v.to_string()),
            Self::Int64(v) => Some(v.to_string()),
            Self::Float32(v) => Some(v.to_string()),
            Self::Float64(v) => Some(v.to_string()),
            Self::Text(v) => Some(v.clone()),
            Self::Bool(v) => Some(if *v { "1" } else { "0" }.to_string()),
            Self::Timestamp(v) => Some(FieldType::encode_date(*v).to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Rust types that can back a mapped member.
///
/// Implemented for `i32`, `i64`, `f32`, `f64`, `String`, `bool`,
/// `DateTime<Utc>` and `Option` of each.
pub trait MemberValue: Sized + 'static {
    const KIND: MemberKind;

    fn into_value(self) -> Value;

    /// Converts back from a decoded value; `None` when the value does not fit.
    fn from_value(value: Value) -> Option<Self>;
}

macro_rules! member_value {
    ($ty:ty, $member:ident, $variant:ident) => {
        impl MemberValue for $ty {
            const KIND: MemberKind = MemberKind::required(MemberType::$member);

            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

member_value!(i32, Int32, Int32);
member_value!(i64, Int64, Int64);
member_value!(f32, Float32, Float32);
member_value!(f64, Float64, Float64);
member_value!(String, Text, Text);
member_value!(bool, Bool, Bool);
member_value!(DateTime<Utc>, Timestamp, Timestamp);

impl<V: MemberValue> MemberValue for Option<V> {
    const KIND: MemberKind = MemberKind::optional(V::KIND.ty);

    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => V::from_value(other).map(Some),
        }
    }
}
