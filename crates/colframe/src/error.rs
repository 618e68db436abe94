use crate::types::DType;

pub type Result<T> = std::result::Result<T, FrameError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrameError {
    #[error("column length mismatch for {column}: expected {expected} values, got {actual}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("row {row} out of bounds for table with {rows} rows")]
    RowOutOfBounds { row: usize, rows: usize },

    #[error("permutation length mismatch: expected {expected} rows, got {actual}")]
    PermutationLength { expected: usize, actual: usize },

    #[error("type error for column {column}: expected {expected}, got {actual}")]
    TypeMismatch {
        column: String,
        expected: DType,
        actual: DType,
    },

    #[error("cannot aggregate column {column} of type {dtype}")]
    UnsupportedAggregation { column: String, dtype: DType },

    #[error("group_by requires at least one grouping column")]
    NoGroupColumns,

    #[error("handle {0} does not refer to a grouped table")]
    NotGrouped(u64),

    #[error("handle {0} refers to a grouped table and cannot be modified")]
    GroupedHandle(u64),

    #[error("unknown handle: {0}")]
    UnknownHandle(u64),

    #[error("column {column} of type {dtype} has no foreign buffer representation")]
    NotTransferable { column: String, dtype: DType },

    #[error("unknown type tag: {0}")]
    UnknownTypeTag(i32),

    #[error("buffer for column {column} is {bytes} bytes, not a multiple of {width}")]
    MisalignedBuffer {
        column: String,
        bytes: usize,
        width: usize,
    },

    #[error("unknown aggregation code: {0}")]
    UnknownAggregation(i32),
}
