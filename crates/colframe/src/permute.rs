//! Row permutations and in-place application via cycle decomposition.

use crate::bitmap::BitVec;
use crate::column::ColumnData;

/// A bijection on `0..len`: slot `i` of the reordered data takes the value at `self[i]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Permutation(Vec<usize>);

impl Permutation {
    pub fn identity(len: usize) -> Self {
        Self((0..len).collect())
    }

    pub fn reversed(len: usize) -> Self {
        Self((0..len).rev().collect())
    }

    /// Validate and wrap a source-index vector. Returns `None` unless `indices` is a bijection on
    /// `0..indices.len()`.
    pub fn try_from_vec(indices: Vec<usize>) -> Option<Self> {
        is_bijection(&indices).then_some(Self(indices))
    }

    /// Wrap indices produced by one of the sort engines.
    pub(crate) fn from_vec_unchecked(indices: Vec<usize>) -> Self {
        debug_assert!(is_bijection(&indices), "sort produced a non-bijective permutation");
        Self(indices)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn is_identity(&self) -> bool {
        self.0.iter().enumerate().all(|(i, &src)| i == src)
    }

    /// The permutation that undoes `self`.
    pub fn inverse(&self) -> Permutation {
        let mut out = vec![0usize; self.0.len()];
        for (dest, &src) in self.0.iter().enumerate() {
            out[src] = dest;
        }
        Permutation(out)
    }

    /// Apply to a column by copying into a new buffer.
    pub fn gather(&self, data: &ColumnData) -> ColumnData {
        data.take(&self.0)
    }
}

fn is_bijection(indices: &[usize]) -> bool {
    let mut seen = BitVec::with_len_all_false(indices.len());
    for &src in indices {
        if src >= indices.len() || seen.get(src) {
            return false;
        }
        seen.set(src, true);
    }
    true
}

/// Reorder `data` so that `data[i]` becomes the old `data[perm[i]]`, without a second buffer.
///
/// Each cycle `i -> perm[i] -> perm[perm[i]] -> ...` is walked once: swapping slot `j` with
/// `perm[j]` settles slot `j` and carries the displaced value forward, until the next hop
/// returns to the cycle start (whose original value has by then reached the last slot).
pub fn permute_in_place<T>(data: &mut [T], perm: &Permutation) {
    let perm = perm.as_slice();
    debug_assert_eq!(data.len(), perm.len(), "permutation length must match data");

    let mut visited = BitVec::with_len_all_false(perm.len());
    for start in 0..perm.len() {
        if visited.get(start) || perm[start] == start {
            continue;
        }
        let mut j = start;
        loop {
            visited.set(j, true);
            let next = perm[j];
            if next == start {
                break;
            }
            data.swap(j, next);
            j = next;
        }
    }
}

impl ColumnData {
    pub fn permute_in_place(&mut self, perm: &Permutation) {
        match self {
            ColumnData::Int64(v) => permute_in_place(v, perm),
            ColumnData::Float64(v) => permute_in_place(v, perm),
            ColumnData::Utf8(v) => permute_in_place(v, perm),
            ColumnData::Bool(v) => permute_in_place(v, perm),
        }
    }
}
