use std::io::Cursor;

use bit_vec::BitVec;
use log::debug;

use super::HeapPageID;
use crate::{
    error::TinyError,
    io::TinyWriter,
    storage::{
        buffer_pool::BufferPool,
        schema::Schema,
        tuple::{Tuple, WrappedTuple},
    },
    transaction::Transaction,
    types::TinyResult,
};

/// A slotted heap page.
///
/// On disk the page is: ceil(N/8) header bytes (slot-occupancy
/// bitmap, bit i stored at byte i/8, offset i%8, 1 = used), then N
/// slots of the schema's tuple size, then zero padding up to the
/// page size.
pub struct HeapPage {
    pid: HeapPageID,
    schema: Schema,

    pub slot_count: usize,

    // indicate slots' status: true means occupied, false means empty
    header: BitVec,

    // all tuples (include empty tuples)
    tuples: Vec<Tuple>,

    // page image as of the last flush, used to answer before-image
    // queries after the page has been modified in memory
    old_data: Vec<u8>,

    dirtied_by: Option<Transaction>,
}

impl HeapPage {
    pub fn new(pid: &HeapPageID, bytes: &[u8], schema: &Schema) -> Result<Self, TinyError> {
        let slot_count = Self::calculate_slots_count(schema);
        let header_size = Self::calculate_header_size(slot_count);
        let tuple_size = schema.get_size();

        if bytes.len() != BufferPool::get_page_size() {
            return Err(TinyError::new(&format!(
                "corrupt page image, {} bytes, expect {}",
                bytes.len(),
                BufferPool::get_page_size()
            )));
        }

        let header = Self::decode_header(&bytes[..header_size], slot_count);

        let mut tuples = Vec::with_capacity(slot_count);
        for i in 0..slot_count {
            let start = header_size + i * tuple_size;
            let end = start + tuple_size;
            let mut reader = Cursor::new(&bytes[start..end]);
            tuples.push(Tuple::read_from(&mut reader, schema)?);
        }

        Ok(Self {
            pid: *pid,
            schema: schema.clone(),
            slot_count,
            header,
            tuples,
            old_data: bytes.to_vec(),
            dirtied_by: None,
        })
    }

    pub fn empty_page_data() -> Vec<u8> {
        vec![0; BufferPool::get_page_size()]
    }

    /// The maximum number of tuples a page of the current page size
    /// can hold: each tuple costs its byte size plus one header bit.
    pub fn calculate_slots_count(schema: &Schema) -> usize {
        let page_size = BufferPool::get_page_size();
        let bits_per_tuple_including_header = schema.get_size() * 8 + 1;
        let mut slot_count = (page_size * 8) / bits_per_tuple_including_header;

        // the bitmap rounds up to whole bytes, which can push the
        // bit-level estimate one tuple over the page
        while Self::calculate_header_size(slot_count) + slot_count * schema.get_size() > page_size
        {
            slot_count -= 1;
        }
        slot_count
    }

    pub fn calculate_header_size(slot_count: usize) -> usize {
        (slot_count + 7) / 8
    }

    // The bitmap is stored least-significant-bit first within each
    // byte, which is not the order `BitVec::from_bytes` uses.
    fn decode_header(bytes: &[u8], slot_count: usize) -> BitVec {
        let mut header = BitVec::from_elem(slot_count, false);
        for i in 0..slot_count {
            if (bytes[i / 8] >> (i % 8)) & 1 == 1 {
                header.set(i, true);
            }
        }
        header
    }

    fn encode_header(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; Self::calculate_header_size(self.slot_count)];
        for i in 0..self.slot_count {
            if self.header[i] {
                bytes[i / 8] |= 1 << (i % 8);
            }
        }
        bytes
    }

    pub fn get_pid(&self) -> HeapPageID {
        self.pid
    }

    pub fn get_schema(&self) -> &Schema {
        &self.schema
    }

    /// The on-disk image of this page, exactly one page size long.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TinyError> {
        let tuple_size = self.schema.get_size();

        let mut writer = TinyWriter::new();
        writer.write_bytes(&self.encode_header());
        for i in 0..self.slot_count {
            if self.is_slot_used(i) {
                writer.write_bytes(&self.tuples[i].encode(&self.schema)?);
            } else {
                writer.write_bytes(&vec![0; tuple_size]);
            }
        }

        Ok(writer.to_padded_bytes(BufferPool::get_page_size()))
    }

    pub fn get_slots_count(&self) -> usize {
        self.slot_count
    }

    pub fn empty_slots_count(&self) -> usize {
        (0..self.slot_count).filter(|i| !self.header[*i]).count()
    }

    /// Returns the number of tuples currently stored on this page
    pub fn tuples_count(&self) -> usize {
        self.slot_count - self.empty_slots_count()
    }

    pub fn is_slot_used(&self, slot_index: usize) -> bool {
        self.header[slot_index]
    }

    fn mark_slot_status(&mut self, slot_index: usize, used: bool) {
        self.header.set(slot_index, used);
    }

    /// Store the tuple in the lowest free slot and return that slot.
    pub fn insert_tuple(&mut self, tuple: &Tuple) -> Result<usize, TinyError> {
        if !tuple.matches_schema(&self.schema) {
            return Err(TinyError::new(&format!(
                "schema mismatch, tuple {} does not fit page {}",
                tuple, self.pid
            )));
        }

        for i in 0..self.slot_count {
            if !self.is_slot_used(i) {
                self.tuples[i] = tuple.clone();
                self.mark_slot_status(i, true);
                debug!("tuple inserted, page: {}, slot: {}", self.pid, i);
                return Ok(i);
            }
        }

        Err(TinyError::new(&format!("no empty slot on page {}", self.pid)))
    }

    /// Clear the slot addressed by the tuple's record id. The record
    /// must refer to this page and the slot must hold this tuple.
    pub fn delete_tuple(&mut self, tuple: &WrappedTuple) -> TinyResult {
        if tuple.get_pid() != self.pid {
            return Err(TinyError::new(&format!(
                "record {} does not refer to page {}",
                tuple.get_pid(),
                self.pid
            )));
        }

        let slot_index = tuple.get_slot_number();
        if slot_index >= self.slot_count || !self.is_slot_used(slot_index) {
            return Err(TinyError::new(&format!(
                "slot {} of page {} is not in use",
                slot_index, self.pid
            )));
        }

        if self.tuples[slot_index] != **tuple {
            return Err(TinyError::new(&format!(
                "slot {} of page {} holds a different tuple",
                slot_index, self.pid
            )));
        }

        self.mark_slot_status(slot_index, false);
        debug!("tuple deleted, page: {}, slot: {}", self.pid, slot_index);
        Ok(())
    }

    pub fn mark_dirty(&mut self, dirtied_by: Option<Transaction>) {
        self.dirtied_by = dirtied_by;
    }

    /// The transaction that dirtied this page, if any.
    pub fn dirtied_by(&self) -> Option<Transaction> {
        self.dirtied_by
    }

    pub fn set_before_image(&mut self) -> TinyResult {
        self.old_data = self.to_bytes()?;
        Ok(())
    }

    pub fn get_before_image(&self) -> Result<HeapPage, TinyError> {
        HeapPage::new(&self.pid, &self.old_data, &self.schema)
    }

    pub fn iter(&self) -> HeapPageIterator {
        HeapPageIterator {
            page: self,
            cursor: 0,
        }
    }
}

/// Used tuples of a page in ascending slot order.
pub struct HeapPageIterator<'page> {
    page: &'page HeapPage,
    cursor: usize,
}

impl<'page> Iterator for HeapPageIterator<'page> {
    type Item = WrappedTuple;

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor < self.page.slot_count {
            let cursor = self.cursor;
            self.cursor += 1;

            if self.page.is_slot_used(cursor) {
                return Some(WrappedTuple::new(
                    self.page.tuples[cursor].clone(),
                    cursor,
                    self.page.get_pid(),
                ));
            }
        }
        None
    }
}
