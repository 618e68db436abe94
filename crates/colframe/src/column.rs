use crate::bitmap::BitVec;
use crate::types::{DType, Value};
use std::ops::Range;
use std::sync::Arc;

/// Backing storage of a column: one contiguous vector of the declared element type.
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnData {
    Int64(Vec<i64>),
    Float64(Vec<f64>),
    Utf8(Vec<Arc<str>>),
    Bool(Vec<bool>),
}

impl ColumnData {
    pub fn dtype(&self) -> DType {
        match self {
            ColumnData::Int64(_) => DType::Int64,
            ColumnData::Float64(_) => DType::Float64,
            ColumnData::Utf8(_) => DType::Utf8,
            ColumnData::Bool(_) => DType::Bool,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Int64(v) => v.len(),
            ColumnData::Float64(v) => v.len(),
            ColumnData::Utf8(v) => v.len(),
            ColumnData::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gather `indices` into a new vector of the same type.
    pub fn take(&self, indices: &[usize]) -> ColumnData {
        match self {
            ColumnData::Int64(v) => ColumnData::Int64(indices.iter().map(|&i| v[i]).collect()),
            ColumnData::Float64(v) => ColumnData::Float64(indices.iter().map(|&i| v[i]).collect()),
            ColumnData::Utf8(v) => {
                ColumnData::Utf8(indices.iter().map(|&i| v[i].clone()).collect())
            }
            ColumnData::Bool(v) => ColumnData::Bool(indices.iter().map(|&i| v[i]).collect()),
        }
    }

    pub fn slice(&self, range: Range<usize>) -> ColumnData {
        match self {
            ColumnData::Int64(v) => ColumnData::Int64(v[range].to_vec()),
            ColumnData::Float64(v) => ColumnData::Float64(v[range].to_vec()),
            ColumnData::Utf8(v) => ColumnData::Utf8(v[range].to_vec()),
            ColumnData::Bool(v) => ColumnData::Bool(v[range].to_vec()),
        }
    }

    fn filter(&self, mask: &BitVec) -> ColumnData {
        debug_assert_eq!(mask.len(), self.len(), "mask length must match column");
        let keep: Vec<usize> = mask.iter_ones().collect();
        self.take(&keep)
    }
}

/// Borrowed view of a column's primitive buffer, for hosts that wrap it without copying.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ColumnBuffer<'a> {
    Int64(&'a [i64]),
    Float64(&'a [f64]),
    Bool(&'a [bool]),
}

impl ColumnBuffer<'_> {
    pub fn type_tag(&self) -> i32 {
        match self {
            ColumnBuffer::Int64(_) => 0,
            ColumnBuffer::Float64(_) => 1,
            ColumnBuffer::Bool(_) => 2,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnBuffer::Int64(v) => v.len(),
            ColumnBuffer::Float64(v) => v.len(),
            ColumnBuffer::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy the borrowed values into owned column storage.
    pub fn to_data(&self) -> ColumnData {
        match *self {
            ColumnBuffer::Int64(v) => ColumnData::Int64(v.to_vec()),
            ColumnBuffer::Float64(v) => ColumnData::Float64(v.to_vec()),
            ColumnBuffer::Bool(v) => ColumnData::Bool(v.to_vec()),
        }
    }
}

/// A named, typed, fixed-length column.
///
/// The element type never changes after construction; replacing a column's values means
/// building a new `Column`.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn from_i64(name: impl Into<String>, values: Vec<i64>) -> Self {
        Self::new(name, ColumnData::Int64(values))
    }

    pub fn from_f64(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::new(name, ColumnData::Float64(values))
    }

    pub fn from_bool(name: impl Into<String>, values: Vec<bool>) -> Self {
        Self::new(name, ColumnData::Bool(values))
    }

    pub fn from_strings<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let values = values.into_iter().map(|s| Arc::<str>::from(s.as_ref()));
        Self::new(name, ColumnData::Utf8(values.collect()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut ColumnData {
        &mut self.data
    }

    pub fn get(&self, row: usize) -> Option<Value> {
        match &self.data {
            ColumnData::Int64(v) => v.get(row).copied().map(Value::Int64),
            ColumnData::Float64(v) => v.get(row).copied().map(Value::Float64),
            ColumnData::Utf8(v) => v.get(row).cloned().map(Value::Utf8),
            ColumnData::Bool(v) => v.get(row).copied().map(Value::Bool),
        }
    }

    pub fn as_i64(&self) -> Option<&[i64]> {
        match &self.data {
            ColumnData::Int64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<&[f64]> {
        match &self.data {
            ColumnData::Float64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_utf8(&self) -> Option<&[Arc<str>]> {
        match &self.data {
            ColumnData::Utf8(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<&[bool]> {
        match &self.data {
            ColumnData::Bool(v) => Some(v),
            _ => None,
        }
    }

    /// Primitive buffer view, or `None` for string columns.
    pub fn buffer(&self) -> Option<ColumnBuffer<'_>> {
        match &self.data {
            ColumnData::Int64(v) => Some(ColumnBuffer::Int64(v)),
            ColumnData::Float64(v) => Some(ColumnBuffer::Float64(v)),
            ColumnData::Bool(v) => Some(ColumnBuffer::Bool(v)),
            ColumnData::Utf8(_) => None,
        }
    }

    pub fn take(&self, indices: &[usize]) -> Column {
        Column::new(self.name.clone(), self.data.take(indices))
    }

    pub fn slice(&self, range: Range<usize>) -> Column {
        Column::new(self.name.clone(), self.data.slice(range))
    }

    pub(crate) fn filter(&self, mask: &BitVec) -> Column {
        Column::new(self.name.clone(), self.data.filter(mask))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_and_slice_keep_name_and_type() {
        let col = Column::from_strings("s", ["a", "b", "c", "d"]);
        let taken = col.take(&[3, 0, 0]);
        assert_eq!(taken.name(), "s");
        assert_eq!(taken.dtype(), DType::Utf8);
        assert_eq!(taken.get(0), Some(Value::from("d")));
        assert_eq!(taken.get(2), Some(Value::from("a")));

        let head = col.slice(0..2);
        assert_eq!(head.len(), 2);
        assert_eq!(head.get(2), None);
    }

    #[test]
    fn buffer_view_is_unavailable_for_strings() {
        let ints = Column::from_i64("i", vec![1, 2, 3]);
        let buf = ints.buffer().unwrap();
        assert_eq!(buf.type_tag(), 0);
        assert_eq!(buf.len(), 3);
        assert_eq!(buf, ColumnBuffer::Int64(&[1, 2, 3]));

        let flags = Column::from_bool("b", vec![true]);
        assert_eq!(flags.buffer().unwrap().type_tag(), 2);

        for col in [ints, flags, Column::from_f64("f", vec![0.5])] {
            let tag = col.buffer().unwrap().type_tag();
            assert_eq!(DType::from_type_tag(tag), Some(col.dtype()));
        }

        assert!(Column::from_strings("s", ["x"]).buffer().is_none());
    }

    #[test]
    fn filter_keeps_masked_rows_in_order() {
        let col = Column::from_f64("f", vec![0.5, 1.5, 2.5, 3.5]);
        let mask: BitVec = [false, true, false, true].into_iter().collect();
        assert_eq!(col.filter(&mask).as_f64(), Some(&[1.5, 3.5][..]));
    }
}
