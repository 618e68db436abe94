//! Order-preserving sort keys and composite group keys.
//!
//! Sort keys map a numeric cell onto `u64` so that unsigned ordering matches the numeric
//! ordering of the source type. Group keys hash the canonical bytes of each grouping cell and
//! fold the per-column hashes into a 128-bit [`Key128`].

use crate::column::ColumnData;
use xxhash_rust::xxh64::xxh64;

const SIGN_BIT: u64 = 0x8000_0000_0000_0000;

/// Signed integers: flipping the sign bit maps `i64::MIN..=i64::MAX` monotonically onto
/// `0..=u64::MAX`.
#[inline]
pub fn encode_i64(value: i64) -> u64 {
    (value as u64) ^ SIGN_BIT
}

/// IEEE-754 doubles: non-negative values get the sign bit flipped, negative values get every
/// bit complemented.
///
/// NaN payloads are not canonicalized, so distinct NaN bit patterns order by their raw bits
/// (positive NaNs above `+inf`, negative NaNs below `-inf`).
#[inline]
pub fn encode_f64(value: f64) -> u64 {
    let bits = value.to_bits();
    if bits >> 63 == 0 {
        bits ^ SIGN_BIT
    } else {
        !bits
    }
}

/// Composite 128-bit hash of one row's grouping values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key128 {
    pub hi: u64,
    pub lo: u64,
}

impl Key128 {
    /// Fold the hash of grouping column `position` into the key.
    ///
    /// The hash is rotated left by `position * 11 mod 64` bits and XORed into `hi` for even
    /// positions, `lo` for odd ones.
    #[inline]
    pub fn mix(&mut self, position: usize, hash: u64) {
        let rotated = hash.rotate_left(((position * 11) % 64) as u32);
        if position % 2 == 0 {
            self.hi ^= rotated;
        } else {
            self.lo ^= rotated;
        }
    }

    pub fn for_row(columns: &[&ColumnData], row: usize) -> Key128 {
        let mut key = Key128::default();
        for (position, data) in columns.iter().enumerate() {
            key.mix(position, hash_cell(data, row));
        }
        key
    }
}

/// XXH64 (seed 0) over the canonical bytes of one cell.
///
/// Integers, float bit patterns and booleans (as 0/1) hash as 8 little-endian bytes; strings
/// hash as their UTF-8 bytes.
#[inline]
pub fn hash_cell(data: &ColumnData, row: usize) -> u64 {
    match data {
        ColumnData::Int64(v) => xxh64(&v[row].to_le_bytes(), 0),
        ColumnData::Float64(v) => xxh64(&v[row].to_bits().to_le_bytes(), 0),
        ColumnData::Utf8(v) => xxh64(v[row].as_bytes(), 0),
        ColumnData::Bool(v) => xxh64(&u64::from(v[row]).to_le_bytes(), 0),
    }
}

/// Exact comparison of two rows over the grouping columns, using the same canonical
/// representation the hash sees (floats compare by bit pattern).
pub(crate) fn rows_equal(columns: &[&ColumnData], a: usize, b: usize) -> bool {
    columns.iter().all(|data| match data {
        ColumnData::Int64(v) => v[a] == v[b],
        ColumnData::Float64(v) => v[a].to_bits() == v[b].to_bits(),
        ColumnData::Utf8(v) => v[a] == v[b],
        ColumnData::Bool(v) => v[a] == v[b],
    })
}
