//! Integer handles for hosts that cannot hold Rust values directly.
//!
//! A [`HandleRegistry`] owns every table a host has created and hands out opaque `u64` ids.
//! Ids start at 1 and are never reused within a registry. An entry lives until it is released;
//! releasing one entry never affects tables derived from it, since those own (or share) their
//! columns independently.

use crate::column::{Column, ColumnBuffer, ColumnData};
use crate::error::{FrameError, Result};
use crate::group::{AggKind, GroupBy};
use crate::table::Table;
use crate::types::DType;
use ahash::AHashMap;

pub type HandleId = u64;

#[derive(Clone, Debug)]
enum Entry {
    Table(Table),
    Grouped(GroupBy),
}

impl Entry {
    fn table(&self) -> &Table {
        match self {
            Entry::Table(table) => table,
            Entry::Grouped(grouped) => grouped.table(),
        }
    }
}

#[derive(Debug)]
pub struct HandleRegistry {
    next: HandleId,
    entries: AHashMap<HandleId, Entry>,
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self {
            next: 1,
            entries: AHashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn issue(&mut self, entry: Entry) -> HandleId {
        let id = self.next;
        self.next += 1;
        self.entries.insert(id, entry);
        id
    }

    fn entry(&self, id: HandleId) -> Result<&Entry> {
        self.entries.get(&id).ok_or(FrameError::UnknownHandle(id))
    }

    /// The entry's table, refusing grouped entries.
    fn table_mut(&mut self, id: HandleId) -> Result<&mut Table> {
        match self.entries.get_mut(&id) {
            Some(Entry::Table(table)) => Ok(table),
            Some(Entry::Grouped(_)) => Err(FrameError::GroupedHandle(id)),
            None => Err(FrameError::UnknownHandle(id)),
        }
    }

    /// Register an empty table with no columns.
    pub fn new_table(&mut self) -> HandleId {
        self.insert_table(Table::empty())
    }

    pub fn insert_table(&mut self, table: Table) -> HandleId {
        self.issue(Entry::Table(table))
    }

    /// The table behind `id`. For grouped handles this is the table that was grouped.
    pub fn table(&self, id: HandleId) -> Result<&Table> {
        Ok(self.entry(id)?.table())
    }

    pub fn is_grouped(&self, id: HandleId) -> Result<bool> {
        Ok(matches!(self.entry(id)?, Entry::Grouped(_)))
    }

    pub fn shape(&self, id: HandleId) -> Result<(usize, usize)> {
        Ok(self.table(id)?.shape())
    }

    pub fn column_names(&self, id: HandleId) -> Result<Vec<String>> {
        Ok(self
            .table(id)?
            .column_names()
            .into_iter()
            .map(str::to_owned)
            .collect())
    }

    pub fn buffer(&self, id: HandleId, column: &str) -> Result<ColumnBuffer<'_>> {
        self.table(id)?.buffer(column)
    }

    /// Add `column` to the table, replacing any column of the same name.
    ///
    /// On error the entry is left as it was.
    pub fn add_column(&mut self, id: HandleId, column: Column) -> Result<()> {
        let table = self.table_mut(id)?;
        *table = table.with_column(column)?;
        Ok(())
    }

    /// Copy a host buffer into a new column.
    pub fn add_buffer(&mut self, id: HandleId, name: &str, buffer: ColumnBuffer<'_>) -> Result<()> {
        self.add_column(id, Column::new(name, buffer.to_data()))
    }

    /// Decode a little-endian byte buffer tagged with a host type tag into a new column.
    ///
    /// Int64 and Float64 take 8 bytes per value; Bool takes one byte per value, nonzero meaning
    /// `true`.
    pub fn add_tagged(&mut self, id: HandleId, name: &str, tag: i32, bytes: &[u8]) -> Result<()> {
        let dtype = DType::from_type_tag(tag).ok_or(FrameError::UnknownTypeTag(tag))?;
        let data = decode_tagged(name, dtype, bytes)?;
        self.add_column(id, Column::new(name, data))
    }

    pub fn sort_by_column(&mut self, id: HandleId, column: &str, ascending: bool) -> Result<()> {
        self.table_mut(id)?
            .sort_by_column_in_place(column, ascending)
            .map(|_| ())
    }

    pub fn sort_by_row_index(&mut self, id: HandleId, ascending: bool) -> Result<()> {
        let table = self.table_mut(id)?;
        *table = table.sort_by_row_index(ascending);
        Ok(())
    }

    /// Group the table behind `id` and register the grouping under a new handle.
    pub fn group_by<S: AsRef<str>>(&mut self, id: HandleId, columns: &[S]) -> Result<HandleId> {
        let grouped = self.table(id)?.group_by(columns)?;
        Ok(self.issue(Entry::Grouped(grouped)))
    }

    /// Aggregate a grouped handle; the result is registered as a new table handle.
    pub fn aggregate(&mut self, id: HandleId, column: &str, code: i32) -> Result<HandleId> {
        let kind = AggKind::from_code(code).ok_or(FrameError::UnknownAggregation(code))?;
        let grouped = match self.entry(id)? {
            Entry::Grouped(grouped) => grouped,
            Entry::Table(_) => return Err(FrameError::NotGrouped(id)),
        };
        let result = grouped.aggregate(column, kind)?;
        Ok(self.insert_table(result))
    }

    /// Drop the entry for `id`. Returns `false` if it was not registered.
    pub fn release(&mut self, id: HandleId) -> bool {
        self.entries.remove(&id).is_some()
    }

    pub fn release_all(&mut self) {
        let released = self.entries.len();
        self.entries.clear();
        log::debug!("released {released} handles");
    }
}

fn decode_tagged(name: &str, dtype: DType, bytes: &[u8]) -> Result<ColumnData> {
    let check_width = |width: usize| {
        if bytes.len() % width == 0 {
            Ok(())
        } else {
            Err(FrameError::MisalignedBuffer {
                column: name.to_owned(),
                bytes: bytes.len(),
                width,
            })
        }
    };
    let words = || {
        bytes.chunks_exact(8).map(|chunk| {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            word
        })
    };

    match dtype {
        DType::Int64 => {
            check_width(8)?;
            Ok(ColumnData::Int64(words().map(i64::from_le_bytes).collect()))
        }
        DType::Float64 => {
            check_width(8)?;
            Ok(ColumnData::Float64(words().map(f64::from_le_bytes).collect()))
        }
        DType::Bool => Ok(ColumnData::Bool(bytes.iter().map(|&b| b != 0).collect())),
        DType::Utf8 => Err(FrameError::NotTransferable {
            column: name.to_owned(),
            dtype,
        }),
    }
}
