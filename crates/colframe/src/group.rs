//! Hash group-by with single-pass streaming aggregation.
//!
//! Every row is reduced to a [`Key128`] over the grouping columns and folded into a running
//! accumulator for that key. Large inputs are split into contiguous row shards; each shard owns
//! a private accumulator table and the calling thread merges them once all shards are done.

use crate::column::{Column, ColumnData};
use crate::error::{FrameError, Result};
use crate::keys::{self, Key128};
use crate::parallel::{map_tasks, shard_ranges, should_shard};
use crate::table::{Table, TableOptions};
use ahash::AHashMap;
use smallvec::SmallVec;
use std::ops::Range;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AggKind {
    Sum,
    Mean,
    Count,
    Min,
    Max,
}

impl AggKind {
    /// Numeric codes used across the handle boundary.
    pub fn from_code(code: i32) -> Option<AggKind> {
        match code {
            0 => Some(AggKind::Sum),
            1 => Some(AggKind::Mean),
            2 => Some(AggKind::Count),
            3 => Some(AggKind::Min),
            4 => Some(AggKind::Max),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            AggKind::Sum => 0,
            AggKind::Mean => 1,
            AggKind::Count => 2,
            AggKind::Min => 3,
            AggKind::Max => 4,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            AggKind::Sum => "sum",
            AggKind::Mean => "mean",
            AggKind::Count => "count",
            AggKind::Min => "min",
            AggKind::Max => "max",
        }
    }
}

/// Element types that can be aggregated.
trait AggNumber: Copy + PartialOrd + Send + Sync {
    fn plus(self, other: Self) -> Self;
    fn is_nan(self) -> bool;
    /// `sum / count` with the type's native division.
    fn mean(sum: Self, count: u64) -> Self;
    fn into_column_data(values: Vec<Self>) -> ColumnData;
}

impl AggNumber for i64 {
    fn plus(self, other: Self) -> Self {
        self.wrapping_add(other)
    }

    fn is_nan(self) -> bool {
        false
    }

    fn mean(sum: Self, count: u64) -> Self {
        sum.wrapping_div(count as i64)
    }

    fn into_column_data(values: Vec<Self>) -> ColumnData {
        ColumnData::Int64(values)
    }
}

impl AggNumber for f64 {
    fn plus(self, other: Self) -> Self {
        self + other
    }

    fn is_nan(self) -> bool {
        f64::is_nan(self)
    }

    fn mean(sum: Self, count: u64) -> Self {
        sum / count as f64
    }

    fn into_column_data(values: Vec<Self>) -> ColumnData {
        ColumnData::Float64(values)
    }
}

/// Min/max ignore NaN: a NaN extreme is replaced by the first non-NaN value and a NaN candidate
/// never wins, so the result is NaN only when every value was NaN. Merging shard extremes with the
/// same rule gives the serial result for any shard boundaries.
fn keep_min<T: AggNumber>(current: &mut T, candidate: T) {
    if candidate < *current || (current.is_nan() && !candidate.is_nan()) {
        *current = candidate;
    }
}

fn keep_max<T: AggNumber>(current: &mut T, candidate: T) {
    if candidate > *current || (current.is_nan() && !candidate.is_nan()) {
        *current = candidate;
    }
}

/// Running statistics for one group.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Accumulator<T> {
    sum: T,
    min: T,
    max: T,
    count: u64,
    /// First row seen for this group; supplies the grouping values in the output.
    first_row: usize,
}

impl<T: AggNumber> Accumulator<T> {
    fn new(value: T, row: usize) -> Self {
        Self {
            sum: value,
            min: value,
            max: value,
            count: 1,
            first_row: row,
        }
    }

    fn update(&mut self, value: T) {
        self.sum = self.sum.plus(value);
        keep_min(&mut self.min, value);
        keep_max(&mut self.max, value);
        self.count += 1;
    }

    fn merge(&mut self, other: &Accumulator<T>) {
        self.sum = self.sum.plus(other.sum);
        keep_min(&mut self.min, other.min);
        keep_max(&mut self.max, other.max);
        self.count += other.count;
        self.first_row = self.first_row.min(other.first_row);
    }
}

/// Accumulators for one shard (or the merged result), in first-seen order.
struct GroupState<T> {
    /// Key -> accumulator slots. More than one slot per key only exists when grouping values
    /// are verified and two distinct value tuples hashed to the same key.
    slots: AHashMap<Key128, SmallVec<[usize; 1]>>,
    keys: Vec<Key128>,
    accs: Vec<Accumulator<T>>,
}

impl<T: AggNumber> GroupState<T> {
    fn new() -> Self {
        Self {
            slots: AHashMap::new(),
            keys: Vec::new(),
            accs: Vec::new(),
        }
    }

    fn insert(&mut self, key: Key128, acc: Accumulator<T>, group_cols: &[&ColumnData], verify: bool) {
        let candidates = self.slots.entry(key).or_default();
        let found = candidates.iter().copied().find(|&slot| {
            !verify || keys::rows_equal(group_cols, self.accs[slot].first_row, acc.first_row)
        });
        match found {
            Some(slot) => self.accs[slot].merge(&acc),
            None => {
                candidates.push(self.accs.len());
                self.keys.push(key);
                self.accs.push(acc);
            }
        }
    }

    fn observe(&mut self, key: Key128, row: usize, value: T, group_cols: &[&ColumnData], verify: bool) {
        let candidates = self.slots.entry(key).or_default();
        let found = candidates.iter().copied().find(|&slot| {
            !verify || keys::rows_equal(group_cols, self.accs[slot].first_row, row)
        });
        match found {
            Some(slot) => self.accs[slot].update(value),
            None => {
                candidates.push(self.accs.len());
                self.keys.push(key);
                self.accs.push(Accumulator::new(value, row));
            }
        }
    }

    /// Fold a later shard into this one. Keys new to `self` are appended in the order the shard
    /// first saw them, so merging shards in row order preserves first-appearance order.
    fn merge(&mut self, other: GroupState<T>, group_cols: &[&ColumnData], verify: bool) {
        for (key, acc) in other.keys.into_iter().zip(other.accs) {
            self.insert(key, acc, group_cols, verify);
        }
    }
}

fn accumulate_range<T, K>(
    values: &[T],
    group_cols: &[&ColumnData],
    key_of: &K,
    rows: Range<usize>,
    verify: bool,
) -> GroupState<T>
where
    T: AggNumber,
    K: Fn(usize) -> Key128,
{
    let mut state = GroupState::new();
    for row in rows {
        state.observe(key_of(row), row, values[row], group_cols, verify);
    }
    state
}

fn accumulate<T, K>(
    values: &[T],
    group_cols: &[&ColumnData],
    key_of: K,
    options: &TableOptions,
) -> GroupState<T>
where
    T: AggNumber,
    K: Fn(usize) -> Key128 + Sync,
{
    let rows = values.len();
    let verify = options.verify_group_keys;
    let workers = options.effective_workers();

    if !should_shard(rows, workers, options.aggregate_parallel_threshold) {
        return accumulate_range(values, group_cols, &key_of, 0..rows, verify);
    }

    let shards = shard_ranges(rows, workers);
    log::debug!(
        "sharded group-by: {rows} rows across {} shards",
        shards.len()
    );
    let states = map_tasks(shards, |range| {
        accumulate_range(values, group_cols, &key_of, range, verify)
    });

    let mut merged = GroupState::new();
    for state in states {
        merged.merge(state, group_cols, verify);
    }
    merged
}

/// Representative rows and the finished aggregate column for one accumulation.
fn finish<T: AggNumber>(state: GroupState<T>, kind: AggKind) -> (Vec<usize>, ColumnData) {
    let reps = state.accs.iter().map(|a| a.first_row).collect();
    let pick: fn(&Accumulator<T>) -> T = match kind {
        AggKind::Count => {
            let counts = state.accs.iter().map(|a| a.count as i64).collect();
            return (reps, ColumnData::Int64(counts));
        }
        AggKind::Sum => |a| a.sum,
        AggKind::Mean => |a| T::mean(a.sum, a.count),
        AggKind::Min => |a| a.min,
        AggKind::Max => |a| a.max,
    };
    (reps, T::into_column_data(state.accs.iter().map(pick).collect()))
}

/// A table together with the columns it is grouped by.
///
/// Grouping is lazy: the key and accumulate passes run when [`GroupBy::aggregate`] is called.
#[derive(Clone, Debug)]
pub struct GroupBy {
    table: Table,
    keys: Vec<String>,
}

impl Table {
    pub fn group_by<S: AsRef<str>>(&self, columns: &[S]) -> Result<GroupBy> {
        if columns.is_empty() {
            return Err(FrameError::NoGroupColumns);
        }
        let mut keys: Vec<String> = Vec::with_capacity(columns.len());
        for name in columns {
            let name = name.as_ref();
            self.column(name)?;
            if keys.iter().any(|k| k == name) {
                return Err(FrameError::DuplicateColumn(name.to_owned()));
            }
            keys.push(name.to_owned());
        }
        Ok(GroupBy {
            table: self.clone(),
            keys,
        })
    }
}

impl GroupBy {
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// One row per distinct group: the grouping columns (values from the group's first row)
    /// followed by the aggregated column.
    ///
    /// Row order is first-appearance order of each group. The aggregated column keeps its name
    /// unless it is also a grouping column, in which case it is named `"{column}_{kind}"`.
    pub fn aggregate(&self, column: &str, kind: AggKind) -> Result<Table> {
        let source = self.table.column(column)?;
        let options = self.table.options();

        let group_cols: Vec<&ColumnData> = self
            .keys
            .iter()
            .map(|k| self.table.column(k).map(|c| c.data()))
            .collect::<Result<_>>()?;
        let key_of = |row: usize| Key128::for_row(&group_cols, row);

        let (reps, data) = match source.data() {
            ColumnData::Int64(values) => {
                finish(accumulate(values, &group_cols, key_of, options), kind)
            }
            ColumnData::Float64(values) => {
                finish(accumulate(values, &group_cols, key_of, options), kind)
            }
            ColumnData::Utf8(_) | ColumnData::Bool(_) => {
                return Err(FrameError::UnsupportedAggregation {
                    column: column.to_owned(),
                    dtype: source.dtype(),
                })
            }
        };

        let mut columns: Vec<Arc<Column>> = Vec::with_capacity(self.keys.len() + 1);
        for key in &self.keys {
            columns.push(Arc::new(self.table.column(key)?.take(&reps)));
        }
        let name = if self.keys.iter().any(|k| k == column) {
            format!("{column}_{}", kind.suffix())
        } else {
            column.to_owned()
        };
        columns.push(Arc::new(Column::new(name, data)));

        Table::from_shared(columns, *options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;
    use pretty_assertions::assert_eq;

    fn scenario() -> Table {
        Table::new(vec![
            Column::from_i64("g", vec![1, 1, 2, 2, 2]),
            Column::from_i64("v", vec![10, 20, 30, 40, 50]),
        ])
        .unwrap()
    }

    fn pairs(table: &Table, key: &str, value: &str) -> Vec<(Value, Value)> {
        (0..table.row_count())
            .map(|r| (table.get(r, key).unwrap(), table.get(r, value).unwrap()))
            .collect()
    }

    #[test]
    fn sum_count_max_by_single_key() {
        let grouped = scenario().group_by(&["g"]).unwrap();

        let sum = grouped.aggregate("v", AggKind::Sum).unwrap();
        assert_eq!(sum.column_names(), vec!["g", "v"]);
        assert_eq!(
            pairs(&sum, "g", "v"),
            vec![(Value::Int64(1), Value::Int64(30)), (Value::Int64(2), Value::Int64(120))]
        );

        let count = grouped.aggregate("v", AggKind::Count).unwrap();
        assert_eq!(
            pairs(&count, "g", "v"),
            vec![(Value::Int64(1), Value::Int64(2)), (Value::Int64(2), Value::Int64(3))]
        );

        let max = grouped.aggregate("v", AggKind::Max).unwrap();
        assert_eq!(
            pairs(&max, "g", "v"),
            vec![(Value::Int64(1), Value::Int64(20)), (Value::Int64(2), Value::Int64(50))]
        );

        let min = grouped.aggregate("v", AggKind::Min).unwrap();
        assert_eq!(
            pairs(&min, "g", "v"),
            vec![(Value::Int64(1), Value::Int64(10)), (Value::Int64(2), Value::Int64(30))]
        );
    }

    #[test]
    fn integer_mean_truncates_toward_zero() {
        let table = Table::new(vec![
            Column::from_strings("k", ["a", "a", "b", "b"]),
            Column::from_i64("v", vec![-3, -4, 3, 4]),
        ])
        .unwrap();
        let mean = table.group_by(&["k"]).unwrap().aggregate("v", AggKind::Mean).unwrap();
        assert_eq!(mean.column("v").unwrap().as_i64(), Some(&[-3, 3][..]));
    }

    #[test]
    fn float_mean_and_count_type() {
        let table = Table::new(vec![
            Column::from_bool("k", vec![true, false, true]),
            Column::from_f64("v", vec![1.0, 2.0, 2.0]),
        ])
        .unwrap();
        let grouped = table.group_by(&["k"]).unwrap();
        let mean = grouped.aggregate("v", AggKind::Mean).unwrap();
        assert_eq!(mean.column("v").unwrap().as_f64(), Some(&[1.5, 2.0][..]));

        let count = grouped.aggregate("v", AggKind::Count).unwrap();
        assert_eq!(count.column("v").unwrap().as_i64(), Some(&[2, 1][..]));
    }

    #[test]
    fn rejects_bad_requests() {
        let table = Table::new(vec![
            Column::from_strings("s", ["x"]),
            Column::from_i64("v", vec![1]),
        ])
        .unwrap();
        assert_eq!(
            table.group_by::<&str>(&[]).unwrap_err(),
            FrameError::NoGroupColumns
        );
        assert_eq!(
            table.group_by(&["missing"]).unwrap_err(),
            FrameError::UnknownColumn("missing".to_owned())
        );
        let grouped = table.group_by(&["v"]).unwrap();
        assert_eq!(
            grouped.aggregate("s", AggKind::Count).unwrap_err(),
            FrameError::UnsupportedAggregation {
                column: "s".to_owned(),
                dtype: crate::types::DType::Utf8,
            }
        );
    }

    #[test]
    fn aggregating_a_key_column_renames_output() {
        let out = scenario().group_by(&["g"]).unwrap().aggregate("g", AggKind::Count).unwrap();
        assert_eq!(out.column_names(), vec!["g", "g_count"]);
    }

    #[test]
    fn empty_table_yields_empty_result() {
        let table = Table::new(vec![
            Column::from_i64("g", vec![]),
            Column::from_f64("v", vec![]),
        ])
        .unwrap();
        let out = table.group_by(&["g"]).unwrap().aggregate("v", AggKind::Sum).unwrap();
        assert_eq!(out.shape(), (0, 2));
    }

    #[test]
    fn verified_keys_split_colliding_groups() {
        let g = ColumnData::Int64(vec![1, 2, 1, 2, 3]);
        let values = [1i64, 10, 100, 1000, 10000];
        let cols = [&g];
        let collide = |_row: usize| Key128::default();

        let trusting = accumulate_range(&values, &cols, &collide, 0..5, false);
        assert_eq!(trusting.accs.len(), 1);
        assert_eq!(trusting.accs[0].sum, 11111);

        let verified = accumulate_range(&values, &cols, &collide, 0..5, true);
        let sums: Vec<i64> = verified.accs.iter().map(|a| a.sum).collect();
        assert_eq!(sums, vec![101, 1010, 10000]);
    }

    #[test]
    fn min_max_ignore_nan_wherever_shards_split() {
        let g = ColumnData::Int64(vec![1; 4]);
        let cols = [&g];
        let key_of = |row: usize| Key128::for_row(&cols, row);

        for (values, min, max) in [
            ([1.0, 5.0, f64::NAN, 0.0], 0.0, 5.0),
            ([1.0, f64::NAN, 9.0, 2.0], 1.0, 9.0),
            ([f64::NAN, f64::NAN, -3.0, f64::NAN], -3.0, -3.0),
        ] {
            let whole = accumulate_range(&values, &cols, &key_of, 0..4, false);
            assert_eq!((whole.accs[0].min, whole.accs[0].max), (min, max));

            for split in 1..4 {
                let mut left = accumulate_range(&values, &cols, &key_of, 0..split, false);
                let right = accumulate_range(&values, &cols, &key_of, split..4, false);
                left.merge(right, &cols, false);
                assert_eq!(
                    (left.accs[0].min, left.accs[0].max),
                    (min, max),
                    "{values:?} split at {split}"
                );
            }
        }

        let all_nan = [f64::NAN; 3];
        let state = accumulate_range(&all_nan, &cols, &key_of, 0..3, false);
        assert!(state.accs[0].min.is_nan() && state.accs[0].max.is_nan());
    }

    #[test]
    fn merge_keeps_first_row_and_order() {
        let g = ColumnData::Int64(vec![7, 8, 8, 7, 9]);
        let values = [1i64, 2, 3, 4, 5];
        let cols = [&g];
        let key_of = |row: usize| Key128::for_row(&cols, row);

        let mut left = accumulate_range(&values, &cols, &key_of, 0..2, true);
        let right = accumulate_range(&values, &cols, &key_of, 2..5, true);
        left.merge(right, &cols, true);

        let whole = accumulate_range(&values, &cols, &key_of, 0..5, true);
        assert_eq!(left.keys, whole.keys);
        assert_eq!(left.accs, whole.accs);
    }

    #[test]
    fn sharded_path_matches_serial() {
        let n = 2_000usize;
        let table = Table::new(vec![
            Column::from_i64("a", (0..n as i64).map(|i| i % 7).collect()),
            Column::from_strings("b", (0..n).map(|i| if i % 3 == 0 { "x" } else { "y" })),
            Column::from_i64("v", (0..n as i64).map(|i| (i * 37) % 101 - 50).collect()),
        ])
        .unwrap();

        let serial_opts = TableOptions {
            workers: Some(1),
            ..TableOptions::default()
        };
        let serial = table
            .clone()
            .with_table_options(serial_opts)
            .group_by(&["a", "b"])
            .unwrap();

        for workers in [2, 8] {
            let sharded_opts = TableOptions {
                workers: Some(workers),
                aggregate_parallel_threshold: 0,
                ..TableOptions::default()
            };
            let sharded = table
                .clone()
                .with_table_options(sharded_opts)
                .group_by(&["a", "b"])
                .unwrap();
            for kind in [AggKind::Sum, AggKind::Mean, AggKind::Count, AggKind::Min, AggKind::Max] {
                assert_eq!(
                    sharded.aggregate("v", kind).unwrap(),
                    serial.aggregate("v", kind).unwrap(),
                    "workers={workers} kind={kind:?}"
                );
            }
        }
    }

    #[test]
    fn codes_round_trip() {
        for code in 0..5 {
            assert_eq!(AggKind::from_code(code).unwrap().code(), code);
        }
        assert_eq!(AggKind::from_code(5), None);
    }
}
