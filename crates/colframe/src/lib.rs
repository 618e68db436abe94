//! In-memory columnar tables for Colframe.
//!
//! This crate focuses on:
//! - Typed, immutable columns shared between tables (operators copy only what they change).
//! - Stable LSD radix sorting over order-preserving `u64` keys, sharded across a worker pool.
//! - Hash group-by with single-pass streaming aggregation and a deterministic shard merge.
//! - An integer handle registry for hosts that wrap column buffers without copying.

#![forbid(unsafe_code)]

mod bitmap;
mod column;
mod error;
mod group;
mod handle;
mod keys;
mod parallel;
mod permute;
mod radix;
mod sort;
mod table;
mod types;

pub use crate::bitmap::BitVec;
pub use crate::column::{Column, ColumnBuffer, ColumnData};
pub use crate::error::{FrameError, Result};
pub use crate::group::{AggKind, GroupBy};
pub use crate::handle::{HandleId, HandleRegistry};
pub use crate::keys::{encode_f64, encode_i64, hash_cell, Key128};
pub use crate::permute::{permute_in_place, Permutation};
pub use crate::radix::{radix_sort, radix_sort_u64, radix_sort_u64_sharded};
pub use crate::table::{CmpOp, Predicate, Table, TableOptions};
pub use crate::types::{DType, Value};
