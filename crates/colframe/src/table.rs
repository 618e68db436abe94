use crate::bitmap::BitVec;
use crate::column::{Column, ColumnBuffer, ColumnData};
use crate::error::{FrameError, Result};
use crate::parallel;
use crate::permute::Permutation;
use crate::sort;
use crate::types::{DType, Value};
use std::cmp::Ordering;
use std::sync::Arc;

/// Execution knobs carried by a table and inherited by every table derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableOptions {
    /// Number of shards for parallel sections. `None` uses the worker pool size.
    pub workers: Option<usize>,
    /// Radix passes are sharded when the key count is strictly above this.
    pub radix_parallel_threshold: usize,
    /// Group-by accumulation is sharded when the row count is strictly above this.
    pub aggregate_parallel_threshold: usize,
    /// Confirm group membership by comparing grouping values, not only the 128-bit key.
    pub verify_group_keys: bool,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            workers: None,
            radix_parallel_threshold: 1 << 15,
            aggregate_parallel_threshold: 50_000,
            verify_group_keys: false,
        }
    }
}

impl TableOptions {
    pub fn effective_workers(&self) -> usize {
        self.workers
            .unwrap_or_else(parallel::available_workers)
            .max(1)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CmpOp {
    fn matches(self, ord: Option<Ordering>) -> bool {
        match (self, ord) {
            (CmpOp::Ne, None) => true,
            (_, None) => false,
            (CmpOp::Eq, Some(o)) => o == Ordering::Equal,
            (CmpOp::Ne, Some(o)) => o != Ordering::Equal,
            (CmpOp::Lt, Some(o)) => o == Ordering::Less,
            (CmpOp::Lte, Some(o)) => o != Ordering::Greater,
            (CmpOp::Gt, Some(o)) => o == Ordering::Greater,
            (CmpOp::Gte, Some(o)) => o != Ordering::Less,
        }
    }
}

/// Row predicate over the values of a single column.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    Cmp { op: CmpOp, value: Value },
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn cmp(op: CmpOp, value: impl Into<Value>) -> Self {
        Predicate::Cmp {
            op,
            value: value.into(),
        }
    }

    pub fn and(self, other: Predicate) -> Self {
        Predicate::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Predicate) -> Self {
        Predicate::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    fn mask(&self, column: &Column) -> Result<BitVec> {
        match self {
            Predicate::Cmp { op, value } => cmp_mask(column, *op, value),
            Predicate::And(a, b) => {
                let mut mask = a.mask(column)?;
                mask.and_inplace(&b.mask(column)?);
                Ok(mask)
            }
            Predicate::Or(a, b) => {
                let mut mask = a.mask(column)?;
                mask.or_inplace(&b.mask(column)?);
                Ok(mask)
            }
            Predicate::Not(inner) => {
                let mut mask = inner.mask(column)?;
                mask.not_inplace();
                Ok(mask)
            }
        }
    }
}

fn cmp_mask(column: &Column, op: CmpOp, value: &Value) -> Result<BitVec> {
    let mismatch = || FrameError::TypeMismatch {
        column: column.name().to_owned(),
        expected: column.dtype(),
        actual: value.dtype(),
    };

    let mask: BitVec = match (column.data(), value) {
        (ColumnData::Int64(v), Value::Int64(rhs)) => {
            v.iter().map(|x| op.matches(Some(x.cmp(rhs)))).collect()
        }
        (ColumnData::Int64(v), Value::Float64(rhs)) => v
            .iter()
            .map(|&x| op.matches((x as f64).partial_cmp(rhs)))
            .collect(),
        (ColumnData::Float64(v), Value::Float64(_) | Value::Int64(_)) => {
            let rhs = value.as_f64().ok_or_else(mismatch)?;
            v.iter().map(|x| op.matches(x.partial_cmp(&rhs))).collect()
        }
        (ColumnData::Utf8(v), Value::Utf8(rhs)) => v
            .iter()
            .map(|x| op.matches(Some(x.as_ref().cmp(rhs.as_ref()))))
            .collect(),
        (ColumnData::Bool(v), Value::Bool(rhs)) => {
            v.iter().map(|x| op.matches(Some(x.cmp(rhs)))).collect()
        }
        _ => return Err(mismatch()),
    };
    Ok(mask)
}

/// An immutable set of equally long, uniquely named columns.
///
/// Operators return new tables; columns that an operator does not change are shared with the
/// source table instead of copied. The only mutating operators are the explicitly named
/// `*_in_place` methods.
#[derive(Clone, Debug)]
pub struct Table {
    columns: Vec<Arc<Column>>,
    rows: usize,
    options: TableOptions,
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows
            && self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(other.columns.iter())
                .all(|(a, b)| Arc::ptr_eq(a, b) || a == b)
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::empty()
    }
}

impl Table {
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: 0,
            options: TableOptions::default(),
        }
    }

    pub fn new(columns: Vec<Column>) -> Result<Self> {
        Self::with_options(columns, TableOptions::default())
    }

    pub fn with_options(columns: Vec<Column>, options: TableOptions) -> Result<Self> {
        Self::from_shared(columns.into_iter().map(Arc::new).collect(), options)
    }

    pub(crate) fn from_shared(columns: Vec<Arc<Column>>, options: TableOptions) -> Result<Self> {
        let rows = columns.first().map(|c| c.len()).unwrap_or(0);
        for (idx, column) in columns.iter().enumerate() {
            if column.len() != rows {
                return Err(FrameError::LengthMismatch {
                    column: column.name().to_owned(),
                    expected: rows,
                    actual: column.len(),
                });
            }
            if columns[..idx].iter().any(|c| c.name() == column.name()) {
                return Err(FrameError::DuplicateColumn(column.name().to_owned()));
            }
        }

        Ok(Self {
            columns,
            rows,
            options,
        })
    }

    /// Same columns, different execution options.
    pub fn with_table_options(mut self, options: TableOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.columns.len())
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name()).collect()
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().map(|c| c.as_ref())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.shared_column(name).map(|c| c.as_ref())
    }

    pub(crate) fn shared_column(&self, name: &str) -> Result<&Arc<Column>> {
        self.columns
            .iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| FrameError::UnknownColumn(name.to_owned()))
    }

    pub fn dtype(&self, name: &str) -> Result<DType> {
        Ok(self.column(name)?.dtype())
    }

    /// `true` when both tables hold the very same column allocation under `name`.
    pub fn shares_column(&self, other: &Table, name: &str) -> bool {
        match (self.shared_column(name), other.shared_column(name)) {
            (Ok(a), Ok(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn get(&self, row: usize, column: &str) -> Result<Value> {
        let col = self.column(column)?;
        col.get(row).ok_or(FrameError::RowOutOfBounds {
            row,
            rows: self.rows,
        })
    }

    /// Zero-copy view of a primitive column for host-side wrapping.
    pub fn buffer(&self, column: &str) -> Result<ColumnBuffer<'_>> {
        let col = self.column(column)?;
        col.buffer().ok_or_else(|| FrameError::NotTransferable {
            column: column.to_owned(),
            dtype: col.dtype(),
        })
    }

    fn derive(&self, columns: Vec<Arc<Column>>, rows: usize) -> Table {
        debug_assert!(columns.iter().all(|c| c.len() == rows));
        Table {
            columns,
            rows,
            options: self.options,
        }
    }

    /// Add a column, or replace the column with the same name (keeping its position).
    pub fn with_column(&self, column: Column) -> Result<Table> {
        if !self.columns.is_empty() && column.len() != self.rows {
            return Err(FrameError::LengthMismatch {
                column: column.name().to_owned(),
                expected: self.rows,
                actual: column.len(),
            });
        }

        let rows = column.len();
        let mut columns = self.columns.clone();
        match self.column_index(column.name()) {
            Some(idx) => columns[idx] = Arc::new(column),
            None => columns.push(Arc::new(column)),
        }
        Ok(self.derive(columns, rows))
    }

    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Table> {
        let mut columns: Vec<Arc<Column>> = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            if columns.iter().any(|c| c.name() == name) {
                return Err(FrameError::DuplicateColumn(name.to_owned()));
            }
            columns.push(self.shared_column(name)?.clone());
        }
        let rows = if columns.is_empty() { 0 } else { self.rows };
        Ok(self.derive(columns, rows))
    }

    /// Row mask for `predicate` evaluated against `column`.
    ///
    /// An Int64 column compared with a Float64 literal is converted to `f64` cell by cell, so
    /// integers beyond 2^53 in magnitude compare at `f64` precision.
    pub fn filter_mask(&self, column: &str, predicate: &Predicate) -> Result<BitVec> {
        predicate.mask(self.column(column)?)
    }

    pub fn filter(&self, column: &str, predicate: &Predicate) -> Result<Table> {
        let mask = self.filter_mask(column, predicate)?;
        Ok(self.apply_mask(&mask))
    }

    /// Keep rows for which `keep` returns `true` when given that row's value in `column`.
    pub fn filter_with<F>(&self, column: &str, mut keep: F) -> Result<Table>
    where
        F: FnMut(&Value) -> bool,
    {
        let col = self.column(column)?;
        let mask: BitVec = (0..self.rows)
            .map(|row| col.get(row).is_some_and(|v| keep(&v)))
            .collect();
        Ok(self.apply_mask(&mask))
    }

    fn apply_mask(&self, mask: &BitVec) -> Table {
        if mask.all_true() {
            return self.clone();
        }
        let columns = self
            .columns
            .iter()
            .map(|c| Arc::new(c.filter(mask)))
            .collect();
        self.derive(columns, mask.count_ones())
    }

    /// The first `n` rows (all rows when `n >= row_count`).
    pub fn head(&self, n: usize) -> Table {
        if n >= self.rows {
            return self.clone();
        }
        let columns = self
            .columns
            .iter()
            .map(|c| Arc::new(c.slice(0..n)))
            .collect();
        self.derive(columns, n)
    }

    /// Gather rows by index into a new table. Indices may repeat.
    pub fn take(&self, indices: &[usize]) -> Result<Table> {
        if let Some(&row) = indices.iter().find(|&&i| i >= self.rows) {
            return Err(FrameError::RowOutOfBounds {
                row,
                rows: self.rows,
            });
        }
        let columns = self
            .columns
            .iter()
            .map(|c| Arc::new(c.take(indices)))
            .collect();
        Ok(self.derive(columns, indices.len()))
    }

    /// Stable ordering of the rows by `column`.
    pub fn sort_permutation(&self, column: &str, ascending: bool) -> Result<Permutation> {
        let col = self.column(column)?;
        Ok(sort::column_permutation(col.data(), ascending, &self.options))
    }

    /// A new table with rows ordered by `column`. The source table is left untouched.
    pub fn sort_by_column(&self, column: &str, ascending: bool) -> Result<Table> {
        let mut sorted = self.clone();
        sorted.sort_by_column_in_place(column, ascending)?;
        Ok(sorted)
    }

    /// Reorder this table's rows by `column` and return the permutation that was applied.
    ///
    /// Columns shared with other tables are copied before they are reordered, so the mutation is
    /// never visible through another table.
    pub fn sort_by_column_in_place(&mut self, column: &str, ascending: bool) -> Result<Permutation> {
        let perm = self.sort_permutation(column, ascending)?;
        self.permute_in_place(&perm)?;
        Ok(perm)
    }

    /// Rows in index order (ascending) or reversed (descending).
    pub fn sort_by_row_index(&self, ascending: bool) -> Table {
        if ascending || self.rows <= 1 {
            return self.clone();
        }
        let mut out = self.clone();
        out.apply_in_place(&Permutation::reversed(self.rows));
        out
    }

    pub fn apply_permutation(&self, perm: &Permutation) -> Result<Table> {
        let mut out = self.clone();
        out.permute_in_place(perm)?;
        Ok(out)
    }

    /// Reorder every column in place so that row `i` becomes the old row `perm[i]`.
    pub fn permute_in_place(&mut self, perm: &Permutation) -> Result<()> {
        if perm.len() != self.rows {
            return Err(FrameError::PermutationLength {
                expected: self.rows,
                actual: perm.len(),
            });
        }
        self.apply_in_place(perm);
        Ok(())
    }

    fn apply_in_place(&mut self, perm: &Permutation) {
        if perm.is_identity() {
            return;
        }
        let mut columns: Vec<&mut Column> = self.columns.iter_mut().map(Arc::make_mut).collect();
        parallel::for_each_mut(&mut columns, |column| {
            column.data_mut().permute_in_place(perm)
        });
    }
}
