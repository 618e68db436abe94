use crate::column::ColumnData;
use crate::keys;
use crate::permute::Permutation;
use crate::radix;
use crate::table::TableOptions;
use std::cmp::Ordering;

/// Stable ordering permutation for one column.
///
/// Numeric columns go through the radix engine; strings and booleans use a stable comparison
/// sort (byte-wise lexicographic for strings, `false < true`).
pub(crate) fn column_permutation(
    data: &ColumnData,
    ascending: bool,
    options: &TableOptions,
) -> Permutation {
    let by_radix = |keys: Vec<u64>| {
        radix::radix_sort(
            &keys,
            ascending,
            options.effective_workers(),
            options.radix_parallel_threshold,
        )
    };

    match data {
        ColumnData::Int64(v) => by_radix(v.iter().map(|&x| keys::encode_i64(x)).collect()),
        ColumnData::Float64(v) => by_radix(v.iter().map(|&x| keys::encode_f64(x)).collect()),
        ColumnData::Utf8(v) => comparison_permutation(v.len(), ascending, |a, b| v[a].cmp(&v[b])),
        ColumnData::Bool(v) => comparison_permutation(v.len(), ascending, |a, b| v[a].cmp(&v[b])),
    }
}

fn comparison_permutation<F>(len: usize, ascending: bool, cmp: F) -> Permutation
where
    F: Fn(usize, usize) -> Ordering,
{
    let mut indices: Vec<usize> = (0..len).collect();
    if ascending {
        indices.sort_by(|&a, &b| cmp(a, b));
    } else {
        indices.sort_by(|&a, &b| cmp(b, a));
    }
    Permutation::from_vec_unchecked(indices)
}
