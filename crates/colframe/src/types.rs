use std::fmt;
use std::sync::Arc;

/// Logical element type of a column.
///
/// The set is closed: every operator matches on it exhaustively, so adding a variant is a
/// compile error until each operator decides what to do with it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DType {
    Int64,
    Float64,
    Utf8,
    Bool,
}

impl DType {
    /// Inverse of [`ColumnBuffer::type_tag`](crate::ColumnBuffer::type_tag).
    ///
    /// Strings have no tag: their backing storage is not a flat primitive buffer.
    pub fn from_type_tag(tag: i32) -> Option<DType> {
        match tag {
            0 => Some(DType::Int64),
            1 => Some(DType::Float64),
            2 => Some(DType::Bool),
            _ => None,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::Int64 => "Int64",
            DType::Float64 => "Float64",
            DType::Utf8 => "Utf8",
            DType::Bool => "Bool",
        };
        f.write_str(name)
    }
}

/// A single cell value, used for row-level access and predicates.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int64(i64),
    Float64(f64),
    Utf8(Arc<str>),
    Bool(bool),
}

impl Value {
    pub fn dtype(&self) -> DType {
        match self {
            Value::Int64(_) => DType::Int64,
            Value::Float64(_) => DType::Float64,
            Value::Utf8(_) => DType::Utf8,
            Value::Bool(_) => DType::Bool,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(v) => Some(*v),
            Value::Int64(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Utf8(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int64(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Utf8(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Utf8(Arc::from(v))
    }
}
