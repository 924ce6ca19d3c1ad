//! Tree-level insertion protocol and cursor (C4): recursive descent,
//! overflow propagation from leaf to root, root-splitting, and the
//! forward scan cursor.

use std::path::Path;

use crate::error::{IndexError, IndexResult};
use crate::locator::TupleLocator;
use crate::node::{InternalNode, LeafNode, NodeResult};
use crate::page::{OpenMode, PageStore};

/// Outcome of a recursive insert: either the subtree absorbed the key, or
/// it split and is handing a promoted separator back up to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InsertOutcome {
    NoSplit,
    Split { key: i32, page_id: i32 },
}

/// Cursor into the leaf chain: a leaf page id plus an entry index, which
/// may be exactly `key_count` (meaning "advance to the sibling first").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub page_id: i32,
    pub entry_index: i32,
}

/// A disk-backed B+-tree index over signed 32-bit keys, generic over the
/// page-addressed backing store.
pub struct TreeIndex<S: PageStore> {
    store: S,
    root_page_id: i32,
    height: i32,
}

impl<S: PageStore> TreeIndex<S> {
    pub fn open(path: &Path, mode: OpenMode) -> IndexResult<Self> {
        let mut store = S::open(path, mode)?;

        let mut header = crate::page::empty_page();
        store.read(0, &mut header)?;
        let root_page_id = read_i32(&header, 0);
        let height = read_i32(&header, 4);

        tracing::debug!(root_page_id, height, "opened index");

        Ok(TreeIndex {
            store,
            root_page_id,
            height,
        })
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn root_page_id(&self) -> i32 {
        self.root_page_id
    }

    pub fn close(mut self) -> IndexResult<()> {
        let mut header = crate::page::empty_page();
        write_i32(&mut header, 0, self.root_page_id);
        write_i32(&mut header, 4, self.height);
        self.store.write(0, &header)?;
        tracing::debug!(
            root_page_id = self.root_page_id,
            height = self.height,
            "closing index"
        );
        self.store.close()
    }

    /// Inserts `(key, locator)`. `key` must not be `0`.
    pub fn insert(&mut self, key: i32, locator: TupleLocator) -> IndexResult<()> {
        if self.height == 0 {
            let mut leaf = LeafNode::new_empty();
            leaf.insert(key, locator)?.expect_ok("empty leaf always has room");
            let page_id = self.store.next_page_id_on_append();
            leaf.write(&mut self.store, page_id)?;
            self.root_page_id = page_id;
            self.height = 1;
            tracing::debug!(page_id, "created root leaf");
            return Ok(());
        }

        match self.descend_insert(key, locator, 1, self.root_page_id)? {
            InsertOutcome::NoSplit => Ok(()),
            InsertOutcome::Split { key: sep_key, page_id: sibling_page } => {
                let new_root = InternalNode::initialize_root(self.root_page_id, sep_key, sibling_page);
                let new_root_page = self.store.next_page_id_on_append();
                new_root.write(&mut self.store, new_root_page)?;
                self.root_page_id = new_root_page;
                self.height += 1;
                tracing::debug!(
                    new_root_page,
                    height = self.height,
                    separator = sep_key,
                    "root split, tree grew"
                );
                Ok(())
            }
        }
    }

    fn descend_insert(
        &mut self,
        key: i32,
        locator: TupleLocator,
        current_depth: i32,
        current_page: i32,
    ) -> IndexResult<InsertOutcome> {
        if current_depth == self.height {
            let mut leaf = LeafNode::read(&mut self.store, current_page)?;

            match leaf.insert(key, locator)? {
                NodeResult::Ok(()) => {
                    leaf.write(&mut self.store, current_page)?;
                    Ok(InsertOutcome::NoSplit)
                }
                NodeResult::NodeFull => {
                    let mut sibling = LeafNode::new_empty();
                    let promoted_key = leaf.insert_and_split(key, locator, &mut sibling)?;

                    let sibling_page = self.store.next_page_id_on_append();
                    sibling.set_next(leaf.get_next());
                    leaf.set_next(sibling_page);

                    leaf.write(&mut self.store, current_page)?;
                    sibling.write(&mut self.store, sibling_page)?;

                    tracing::debug!(
                        left_page = current_page,
                        sibling_page,
                        separator = promoted_key,
                        "leaf split"
                    );

                    Ok(InsertOutcome::Split {
                        key: promoted_key,
                        page_id: sibling_page,
                    })
                }
            }
        } else {
            let mut internal = InternalNode::read(&mut self.store, current_page)?;
            let child_page = internal.locate_child(key);

            match self.descend_insert(key, locator, current_depth + 1, child_page)? {
                InsertOutcome::NoSplit => Ok(InsertOutcome::NoSplit),
                InsertOutcome::Split { key: sep_key, page_id: sep_page } => {
                    match internal.insert(sep_key, sep_page)? {
                        NodeResult::Ok(()) => {
                            internal.write(&mut self.store, current_page)?;
                            Ok(InsertOutcome::NoSplit)
                        }
                        NodeResult::NodeFull => {
                            let mut sibling = InternalNode::new_empty();
                            let mid_key =
                                internal.insert_and_split(sep_key, sep_page, &mut sibling)?;

                            let sibling_page = self.store.next_page_id_on_append();
                            internal.write(&mut self.store, current_page)?;
                            sibling.write(&mut self.store, sibling_page)?;

                            tracing::debug!(
                                left_page = current_page,
                                sibling_page,
                                separator = mid_key,
                                "internal split"
                            );

                            Ok(InsertOutcome::Split {
                                key: mid_key,
                                page_id: sibling_page,
                            })
                        }
                    }
                }
            }
        }
    }

    /// Locates the smallest stored key `>= search_key`. Fails with
    /// [`IndexError::EmptyTree`] if the tree holds no entries.
    pub fn locate(&mut self, search_key: i32) -> IndexResult<Cursor> {
        if self.height == 0 {
            return Err(IndexError::EmptyTree);
        }

        let mut page_id = self.root_page_id;
        for _ in 1..self.height {
            let internal = InternalNode::read(&mut self.store, page_id)?;
            page_id = internal.locate_child(search_key);
        }

        let leaf = LeafNode::read(&mut self.store, page_id)?;
        let entry_index = leaf.locate(search_key);

        Ok(Cursor { page_id, entry_index })
    }

    /// Reads the entry at `cursor` and advances it. Returns `Ok(None)` at
    /// end of tree: the terminal entry of the last leaf is still returned
    /// once, with end-of-tree surfacing only on the *following* call, so a
    /// scan driver's predicate can examine the last tuple.
    ///
    /// `entry_index == key_count` is not itself invalid: it means "advance
    /// to the sibling leaf" and is resolved before any entry is read, so a
    /// cursor landing exactly on a leaf boundary still makes progress.
    pub fn read_forward(
        &mut self,
        cursor: &mut Cursor,
    ) -> IndexResult<Option<(i32, TupleLocator)>> {
        if cursor.page_id < 0 {
            return Ok(None);
        }

        let mut leaf = LeafNode::read(&mut self.store, cursor.page_id)?;
        let mut key_count = leaf.key_count();

        if cursor.entry_index < 0 || cursor.entry_index > key_count {
            return Err(IndexError::InvalidCursor);
        }

        if cursor.entry_index == key_count {
            let next = leaf.get_next();
            if next == -1 {
                return Ok(None);
            }
            cursor.page_id = next;
            cursor.entry_index = 0;
            leaf = LeafNode::read(&mut self.store, cursor.page_id)?;
            key_count = leaf.key_count();
        }

        let entry = leaf.read_entry(cursor.entry_index as usize);

        if cursor.entry_index < key_count - 1 {
            cursor.entry_index += 1;
        } else {
            cursor.page_id = leaf.get_next();
            cursor.entry_index = 0;
        }

        Ok(Some(entry))
    }
}

fn read_i32(buf: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap())
}

fn write_i32(buf: &mut [u8], offset: usize, value: i32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}
