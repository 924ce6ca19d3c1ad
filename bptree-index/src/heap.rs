//! Heap file (external collaborator, §6): append `(key, value)` tuples and
//! read them back by [`TupleLocator`]. The tree core never looks inside
//! this module — it only ever passes locators through unopened.
//!
//! [`FileHeapFile`] is a slotted-page reference implementation so the
//! [`crate::scan`] driver has something concrete to fetch tuples from in
//! tests and in the CLI demo.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{IndexError, IndexResult};
use crate::locator::TupleLocator;
use crate::page::{OpenMode, PAGE_SIZE};

const SLOT_ENTRY_SIZE: usize = 8;
const PAGE_HEADER_SIZE: usize = 8; // slot_count(4) + data_start(4)

/// Narrow interface the scan driver requires of a tuple store.
pub trait HeapFile: Sized {
    fn open(path: &Path, mode: OpenMode) -> IndexResult<Self>;
    fn append(&mut self, key: i32, value: &[u8]) -> IndexResult<TupleLocator>;
    fn read(&mut self, locator: TupleLocator) -> IndexResult<(i32, Vec<u8>)>;
    fn close(self) -> IndexResult<()>;
}

/// A single slotted page: a directory of `(offset, length)` pairs growing
/// from the header, with record bytes packed from the end of the page
/// growing backward.
struct SlottedPage {
    buf: [u8; PAGE_SIZE],
}

impl SlottedPage {
    fn new_empty() -> Self {
        let mut buf = [0u8; PAGE_SIZE];
        write_u32(&mut buf, 4, PAGE_SIZE as u32); // data_start
        SlottedPage { buf }
    }

    fn from_bytes(buf: [u8; PAGE_SIZE]) -> Self {
        SlottedPage { buf }
    }

    fn slot_count(&self) -> u32 {
        read_u32(&self.buf, 0)
    }

    fn data_start(&self) -> u32 {
        read_u32(&self.buf, 4)
    }

    fn free_space(&self) -> usize {
        let used_directory = PAGE_HEADER_SIZE + self.slot_count() as usize * SLOT_ENTRY_SIZE;
        self.data_start() as usize - used_directory
    }

    fn append(&mut self, record: &[u8]) -> Option<u32> {
        let needed = SLOT_ENTRY_SIZE + record.len();
        if self.free_space() < needed {
            return None;
        }

        let new_data_start = self.data_start() as usize - record.len();
        self.buf[new_data_start..new_data_start + record.len()].copy_from_slice(record);

        let slot_index = self.slot_count();
        let slot_offset = PAGE_HEADER_SIZE + slot_index as usize * SLOT_ENTRY_SIZE;
        write_u32(&mut self.buf, slot_offset, new_data_start as u32);
        write_u32(&mut self.buf, slot_offset + 4, record.len() as u32);

        write_u32(&mut self.buf, 0, slot_index + 1);
        write_u32(&mut self.buf, 4, new_data_start as u32);

        Some(slot_index)
    }

    fn record(&self, slot_id: u32) -> IndexResult<&[u8]> {
        if slot_id >= self.slot_count() {
            return Err(IndexError::InvalidCursor);
        }
        let slot_offset = PAGE_HEADER_SIZE + slot_id as usize * SLOT_ENTRY_SIZE;
        let offset = read_u32(&self.buf, slot_offset) as usize;
        let len = read_u32(&self.buf, slot_offset + 4) as usize;
        Ok(&self.buf[offset..offset + len])
    }
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap())
}

fn write_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Reference [`HeapFile`] implementation: one file of fixed-size slotted
/// pages, with the most recently appended-to page kept buffered until it
/// fills or the heap is closed.
pub struct FileHeapFile {
    file: File,
    current_page_id: i32,
    current_page: SlottedPage,
}

impl FileHeapFile {
    fn page_count(&self) -> IndexResult<i32> {
        let len = self
            .file
            .metadata()
            .map_err(|e| IndexError::FileReadFailed {
                page_id: -1,
                source: e,
            })?
            .len();
        Ok((len / PAGE_SIZE as u64) as i32)
    }

    fn flush_current(&mut self) -> IndexResult<()> {
        let offset = self.current_page_id as u64 * PAGE_SIZE as u64;
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| IndexError::FileSeekFailed {
                page_id: self.current_page_id,
                source: e,
            })?;
        self.file
            .write_all(&self.current_page.buf)
            .map_err(|e| IndexError::FileWriteFailed {
                page_id: self.current_page_id,
                source: e,
            })
    }

    fn load_page(&mut self, page_id: i32) -> IndexResult<SlottedPage> {
        if page_id == self.current_page_id {
            return Ok(SlottedPage::from_bytes(self.current_page.buf));
        }
        let mut buf = [0u8; PAGE_SIZE];
        self.file
            .seek(SeekFrom::Start(page_id as u64 * PAGE_SIZE as u64))
            .map_err(|e| IndexError::FileSeekFailed { page_id, source: e })?;
        self.file
            .read_exact(&mut buf)
            .map_err(|e| IndexError::FileReadFailed { page_id, source: e })?;
        Ok(SlottedPage::from_bytes(buf))
    }
}

impl HeapFile for FileHeapFile {
    fn open(path: &Path, mode: OpenMode) -> IndexResult<Self> {
        let mut options = OpenOptions::new();
        options.read(true).write(true);
        if mode == OpenMode::Write {
            options.create(true);
        }
        let file = options.open(path).map_err(IndexError::FileOpenFailed)?;

        let mut heap = FileHeapFile {
            file,
            current_page_id: -1,
            current_page: SlottedPage::new_empty(),
        };

        let pages = heap.page_count()?;
        if pages == 0 {
            heap.current_page_id = 0;
            heap.flush_current()?;
        } else {
            let last_page_id = pages - 1;
            heap.current_page = heap.load_page(last_page_id)?;
            heap.current_page_id = last_page_id;
        }

        Ok(heap)
    }

    fn append(&mut self, key: i32, value: &[u8]) -> IndexResult<TupleLocator> {
        let mut record = Vec::with_capacity(4 + value.len());
        record.extend_from_slice(&key.to_le_bytes());
        record.extend_from_slice(value);

        if self.current_page.append(&record).is_none() {
            self.flush_current()?;
            self.current_page_id += 1;
            self.current_page = SlottedPage::new_empty();
            let slot = self
                .current_page
                .append(&record)
                .ok_or_else(|| IndexError::InvalidFileFormat("record too large for a page".into()))?;
            self.flush_current()?;
            return Ok(TupleLocator::new(self.current_page_id, slot as i32));
        }

        self.flush_current()?;
        let slot = self.current_page.slot_count() - 1;
        Ok(TupleLocator::new(self.current_page_id, slot as i32))
    }

    fn read(&mut self, locator: TupleLocator) -> IndexResult<(i32, Vec<u8>)> {
        let page = self.load_page(locator.page_id)?;
        let record = page.record(locator.slot_id as u32)?;
        let key = i32::from_le_bytes(record[0..4].try_into().unwrap());
        Ok((key, record[4..].to_vec()))
    }

    fn close(mut self) -> IndexResult<()> {
        self.flush_current()
    }
}

/// A linear, page-then-slot cursor over every record in a heap file,
/// independent of any index. `next` returns `None` once it passes the
/// last allocated page.
pub struct HeapCursor {
    page_id: i32,
    slot_id: i32,
}

impl HeapCursor {
    pub fn at_start() -> Self {
        HeapCursor {
            page_id: 0,
            slot_id: 0,
        }
    }

    pub fn next(&mut self, heap: &mut FileHeapFile) -> IndexResult<Option<(TupleLocator, i32, Vec<u8>)>> {
        let end_page = heap.page_count()?;
        loop {
            if self.page_id >= end_page {
                return Ok(None);
            }
            let page = heap.load_page(self.page_id)?;
            if (self.slot_id as u32) >= page.slot_count() {
                self.page_id += 1;
                self.slot_id = 0;
                continue;
            }
            let locator = TupleLocator::new(self.page_id, self.slot_id);
            let (key, value) = heap.read(locator)?;
            self.slot_id += 1;
            return Ok(Some((locator, key, value)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn append_then_read_roundtrips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("heap.dat");
        let mut heap = FileHeapFile::open(&path, OpenMode::Write).unwrap();

        let loc = heap.append(42, b"hello").unwrap();
        let (key, value) = heap.read(loc).unwrap();
        assert_eq!(key, 42);
        assert_eq!(value, b"hello");
    }

    #[test]
    fn appends_spill_into_a_new_page_once_full() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("heap.dat");
        let mut heap = FileHeapFile::open(&path, OpenMode::Write).unwrap();

        let mut locators = Vec::new();
        for i in 0..200 {
            locators.push(heap.append(i, b"0123456789").unwrap());
        }

        assert!(locators.iter().any(|l| l.page_id > 0));

        for (i, loc) in locators.into_iter().enumerate() {
            let (key, value) = heap.read(loc).unwrap();
            assert_eq!(key, i as i32);
            assert_eq!(value, b"0123456789");
        }
    }

    #[test]
    fn cursor_visits_every_record_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("heap.dat");
        let mut heap = FileHeapFile::open(&path, OpenMode::Write).unwrap();
        for i in 0..50 {
            heap.append(i, b"x").unwrap();
        }

        let mut cursor = HeapCursor::at_start();
        let mut seen = Vec::new();
        while let Some((_, key, _)) = cursor.next(&mut heap).unwrap() {
            seen.push(key);
        }
        assert_eq!(seen, (0..50).collect::<Vec<_>>());
    }
}
