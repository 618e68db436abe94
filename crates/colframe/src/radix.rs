//! Stable LSD radix sort over pre-encoded `u64` keys.
//!
//! Keys are sorted one byte at a time (8 passes of 256 buckets). The output is a
//! [`Permutation`] of the original positions; descending order reverses the bucket scan so that
//! equal keys still keep their original relative order.

use crate::parallel::{map_tasks, shard_ranges, should_shard};
use crate::permute::Permutation;
use std::ops::Range;

pub const BITS_PER_PASS: u32 = 8;
pub const BUCKETS: usize = 1 << BITS_PER_PASS;
pub const PASSES: u32 = u64::BITS / BITS_PER_PASS;

type Histogram = [usize; BUCKETS];

#[inline]
fn digit(key: u64, shift: u32) -> usize {
    ((key >> shift) & 0xFF) as usize
}

/// Buckets in the order their output ranges are laid out.
fn bucket_order(ascending: bool) -> impl Iterator<Item = usize> {
    (0..BUCKETS).map(move |i| if ascending { i } else { BUCKETS - 1 - i })
}

/// Turn bucket counts into starting offsets.
fn bucket_offsets(counts: &mut Histogram, ascending: bool) {
    let mut sum = 0usize;
    for b in bucket_order(ascending) {
        let c = counts[b];
        counts[b] = sum;
        sum += c;
    }
}

/// Single-threaded radix sort.
pub fn radix_sort_u64(keys: &[u64], ascending: bool) -> Permutation {
    let n = keys.len();
    let mut indices: Vec<usize> = (0..n).collect();
    if n <= 1 {
        return Permutation::from_vec_unchecked(indices);
    }

    let mut scratch = vec![0usize; n];
    let mut counts: Histogram = [0; BUCKETS];

    for pass in 0..PASSES {
        let shift = pass * BITS_PER_PASS;

        counts.fill(0);
        for &idx in &indices {
            counts[digit(keys[idx], shift)] += 1;
        }

        bucket_offsets(&mut counts, ascending);

        for &idx in &indices {
            let b = digit(keys[idx], shift);
            scratch[counts[b]] = idx;
            counts[b] += 1;
        }

        std::mem::swap(&mut indices, &mut scratch);
    }

    Permutation::from_vec_unchecked(indices)
}

/// Starting offset of every (shard, bucket) output range.
///
/// Buckets are laid out in scan order; within a bucket, shards follow their input order, which
/// is what keeps the sharded sort stable.
fn shard_offsets(histograms: &[Histogram], ascending: bool) -> Vec<Histogram> {
    let mut global: Histogram = [0; BUCKETS];
    for hist in histograms {
        for (total, &count) in global.iter_mut().zip(hist.iter()) {
            *total += count;
        }
    }
    bucket_offsets(&mut global, ascending);

    let mut offsets = vec![[0usize; BUCKETS]; histograms.len()];
    for b in 0..BUCKETS {
        let mut offset = global[b];
        for (shard, hist) in histograms.iter().enumerate() {
            offsets[shard][b] = offset;
            offset += hist[b];
        }
    }
    offsets
}

/// Carve `dest` into the disjoint (shard, bucket) ranges described by `offsets`.
///
/// The returned slices are indexed `[shard][bucket]`.
fn split_destination<'a>(
    dest: &'a mut [usize],
    histograms: &[Histogram],
    offsets: &[Histogram],
    ascending: bool,
) -> Vec<Vec<&'a mut [usize]>> {
    let mut per_shard: Vec<Vec<&'a mut [usize]>> = histograms
        .iter()
        .map(|_| (0..BUCKETS).map(|_| <&mut [usize]>::default()).collect())
        .collect();

    let mut consumed = 0usize;
    let mut rest = dest;
    for b in bucket_order(ascending) {
        for (shard, hist) in histograms.iter().enumerate() {
            debug_assert_eq!(consumed, offsets[shard][b]);
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(hist[b]);
            per_shard[shard][b] = head;
            rest = tail;
            consumed += hist[b];
        }
    }
    debug_assert!(rest.is_empty());
    per_shard
}

/// Radix sort with every pass split across `workers` contiguous shards.
///
/// Per pass: shards build private histograms, the calling thread derives each shard's offset
/// within each bucket, then shards scatter into disjoint ranges of the destination. Produces
/// exactly the same permutation as [`radix_sort_u64`].
pub fn radix_sort_u64_sharded(keys: &[u64], ascending: bool, workers: usize) -> Permutation {
    let n = keys.len();
    if n <= 1 || workers <= 1 {
        return radix_sort_u64(keys, ascending);
    }

    let ranges = shard_ranges(n, workers);
    let mut indices: Vec<usize> = (0..n).collect();
    let mut scratch = vec![0usize; n];

    for pass in 0..PASSES {
        let shift = pass * BITS_PER_PASS;

        let histograms: Vec<Histogram> = map_tasks(ranges.clone(), |range: Range<usize>| {
            let mut hist: Histogram = [0; BUCKETS];
            for &idx in &indices[range] {
                hist[digit(keys[idx], shift)] += 1;
            }
            hist
        });

        let offsets = shard_offsets(&histograms, ascending);
        log::trace!("radix pass {pass}: {} shards over {n} keys", histograms.len());

        let destinations = split_destination(&mut scratch, &histograms, &offsets, ascending);
        let tasks: Vec<(Range<usize>, Vec<&mut [usize]>)> =
            ranges.iter().cloned().zip(destinations).collect();
        map_tasks(tasks, |(range, mut buckets)| {
            let mut cursor: Histogram = [0; BUCKETS];
            for &idx in &indices[range] {
                let b = digit(keys[idx], shift);
                buckets[b][cursor[b]] = idx;
                cursor[b] += 1;
            }
        });

        std::mem::swap(&mut indices, &mut scratch);
    }

    Permutation::from_vec_unchecked(indices)
}

/// Pick the serial or sharded sort based on input size and available workers.
pub fn radix_sort(keys: &[u64], ascending: bool, workers: usize, threshold: usize) -> Permutation {
    if should_shard(keys.len(), workers, threshold) {
        log::debug!(
            "sharded radix sort: {} keys across {workers} workers",
            keys.len()
        );
        radix_sort_u64_sharded(keys, ascending, workers)
    } else {
        radix_sort_u64(keys, ascending)
    }
}
