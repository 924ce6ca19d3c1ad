//! Internal node (C3): a leading child pointer followed by ordered
//! `(key, child_page)` separators.
//!
//! ```text
//! offset 0   : key_count        (4 bytes)
//! offset 4   : first_child_page (4 bytes)
//! offset 8   : 120 entries, each 8 bytes: key(4) || child_page(4)
//! offset 968 : 56 bytes reserved/zero
//! ```
//!
//! For keys `k_1 < … < k_n` and children `c_0, c_1, … , c_n`, the subtree
//! rooted at `c_i` holds keys `k` with `k_i ≤ k < k_{i+1}`
//! (`k_0 = -∞`, `k_{n+1} = +∞`).

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

use crate::error::{IndexError, IndexResult};
use crate::node::NodeResult;
use crate::page::{empty_page, PageBuf, PageStore, PAGE_SIZE};

const HEADER_SIZE: usize = 8;
const ENTRY_SIZE: usize = 8;
pub const CAPACITY: usize = 120;

const _: () = assert!(HEADER_SIZE + CAPACITY * ENTRY_SIZE <= PAGE_SIZE);

#[derive(Debug, Clone)]
pub struct InternalNode {
    buf: PageBuf,
}

impl InternalNode {
    pub fn new_empty() -> Self {
        InternalNode { buf: empty_page() }
    }

    pub fn read<S: PageStore>(store: &mut S, page_id: i32) -> IndexResult<Self> {
        let mut buf = empty_page();
        store.read(page_id, &mut buf)?;
        Ok(InternalNode { buf })
    }

    pub fn write<S: PageStore>(&self, store: &mut S, page_id: i32) -> IndexResult<()> {
        store.write(page_id, &self.buf)
    }

    pub fn key_count(&self) -> i32 {
        read_i32(&self.buf, 0)
    }

    fn set_key_count(&mut self, count: i32) {
        write_i32(&mut self.buf, 0, count);
    }

    pub fn first_child(&self) -> i32 {
        read_i32(&self.buf, 4)
    }

    pub fn set_first_child(&mut self, child: i32) {
        write_i32(&mut self.buf, 4, child);
    }

    fn entry_offset(index: usize) -> usize {
        HEADER_SIZE + index * ENTRY_SIZE
    }

    fn raw_key_at(&self, index: usize) -> i32 {
        read_i32(&self.buf, Self::entry_offset(index))
    }

    pub fn read_entry(&self, index: usize) -> (i32, i32) {
        let off = Self::entry_offset(index);
        (read_i32(&self.buf, off), read_i32(&self.buf, off + 4))
    }

    fn write_entry(&mut self, index: usize, key: i32, child: i32) {
        let off = Self::entry_offset(index);
        write_i32(&mut self.buf, off, key);
        write_i32(&mut self.buf, off + 4, child);
    }

    /// Returns the child to descend into for `search_key`: the largest
    /// child whose separator is `<= search_key`, or `first_child()` if
    /// none qualifies.
    pub fn locate_child(&self, search_key: i32) -> i32 {
        let mut pid = self.first_child();
        let mut index = 0usize;
        loop {
            let key = self.raw_key_at(index);
            if key == 0 || key > search_key {
                break;
            }
            let (_, child) = self.read_entry(index);
            pid = child;
            index += 1;
        }
        pid
    }

    /// Inserts separator `(key, child)`. If `key` already exists, its child
    /// pointer is overwritten in place (idempotent separator update, needed
    /// when a parent re-absorbs a separator it already holds during split
    /// propagation).
    pub fn insert(&mut self, key: i32, child: i32) -> IndexResult<NodeResult<()>> {
        if key == 0 {
            return Err(IndexError::ZeroKey);
        }

        let count = self.key_count() as usize;
        let mut pos = 0usize;
        while pos < count {
            let k = self.raw_key_at(pos);
            if k == 0 || k >= key {
                break;
            }
            pos += 1;
        }

        if pos < count && self.raw_key_at(pos) == key {
            let (_, existing_child) = self.read_entry(pos);
            let _ = existing_child;
            self.write_entry(pos, key, child);
            return Ok(NodeResult::Ok(()));
        }

        if count >= CAPACITY {
            return Ok(NodeResult::NodeFull);
        }

        for i in (pos..count).rev() {
            let (k, c) = self.read_entry(i);
            self.write_entry(i + 1, k, c);
        }
        self.write_entry(pos, key, child);
        self.set_key_count(count as i32 + 1);
        Ok(NodeResult::Ok(()))
    }

    /// Splits a full internal node. The middle separator is promoted out of
    /// both halves: its child pointer becomes `sibling`'s `first_child`,
    /// and the key itself is returned to the caller for insertion into the
    /// parent — it does not survive in either node's entry list. This is
    /// the standard B+-tree rule (see module docs on the historical
    /// duplicate-and-promote defect this spec does not reproduce).
    ///
    /// Precondition: `self.key_count() == CAPACITY` and `sibling` is empty.
    pub fn insert_and_split(
        &mut self,
        key: i32,
        child: i32,
        sibling: &mut InternalNode,
    ) -> IndexResult<i32> {
        debug_assert_eq!(self.key_count() as usize, CAPACITY);
        debug_assert_eq!(sibling.key_count(), 0);

        let half = CAPACITY / 2;
        let (mid_key, mid_child) = self.read_entry(half);

        sibling.set_first_child(mid_child);
        for i in (half + 1)..CAPACITY {
            let (k, c) = self.read_entry(i);
            sibling
                .insert(k, c)
                .expect("sibling copy")
                .expect_ok("sibling split insert cannot overflow");
        }

        for i in half..CAPACITY {
            self.write_entry(i, 0, 0);
        }
        self.set_key_count(half as i32);

        if mid_key < key {
            sibling.insert(key, child)?.expect_ok("sibling has room after split");
        } else {
            self.insert(key, child)?.expect_ok("original has room after split");
        }

        Ok(mid_key)
    }

    /// Writes a one-separator root: `first_child = left`, entry `(key,
    /// right)`, `key_count = 1`.
    pub fn initialize_root(left_child: i32, key: i32, right_child: i32) -> Self {
        let mut node = InternalNode::new_empty();
        node.set_first_child(left_child);
        node.write_entry(0, key, right_child);
        node.set_key_count(1);
        node
    }
}

fn read_i32(buf: &[u8], offset: usize) -> i32 {
    Cursor::new(&buf[offset..offset + 4])
        .read_i32::<LittleEndian>()
        .unwrap()
}

fn write_i32(buf: &mut [u8], offset: usize, value: i32) {
    (&mut buf[offset..offset + 4])
        .write_i32::<LittleEndian>(value)
        .unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_root_has_one_separator() {
        let root = InternalNode::initialize_root(1, 50, 2);
        assert_eq!(root.key_count(), 1);
        assert_eq!(root.first_child(), 1);
        assert_eq!(root.read_entry(0), (50, 2));
    }

    #[test]
    fn locate_child_picks_first_child_below_every_separator() {
        let mut node = InternalNode::initialize_root(1, 50, 2);
        node.insert(100, 3).unwrap().expect_ok("room");
        assert_eq!(node.locate_child(10), 1);
        assert_eq!(node.locate_child(50), 2);
        assert_eq!(node.locate_child(75), 2);
        assert_eq!(node.locate_child(150), 3);
    }

    #[test]
    fn insert_on_existing_key_overwrites_child() {
        let mut node = InternalNode::initialize_root(1, 50, 2);
        node.insert(50, 99).unwrap().expect_ok("room");
        assert_eq!(node.key_count(), 1);
        assert_eq!(node.read_entry(0), (50, 99));
    }

    #[test]
    fn split_promotes_and_removes_separator_from_both_halves() {
        let mut node = InternalNode::new_empty();
        node.set_first_child(0);
        for i in 1..=CAPACITY as i32 {
            node.insert(i * 10, i).unwrap().expect_ok("room");
        }

        let mut sibling = InternalNode::new_empty();
        let promoted = node
            .insert_and_split(1215, 999, &mut sibling)
            .unwrap();

        // Middle entry (index 60) has key 610; it is promoted and must not
        // reappear as a separator in either half.
        assert_eq!(promoted, 610);
        for i in 0..node.key_count() as usize {
            assert_ne!(node.read_entry(i).0, 610);
        }
        for i in 0..sibling.key_count() as usize {
            assert_ne!(sibling.read_entry(i).0, 610);
        }
        assert_eq!(sibling.first_child(), 61);
    }
}
