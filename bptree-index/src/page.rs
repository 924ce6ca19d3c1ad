//! Fixed-size page I/O.
//!
//! The tree core only ever talks to pages through the [`PageStore`] trait —
//! it never opens a file itself. [`FilePageStore`] is the reference
//! implementation: one page-aligned file, page 0 reserved for the tree
//! header, appends placed at the current end of file.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{IndexError, IndexResult};

/// Size of every page on disk, in bytes.
pub const PAGE_SIZE: usize = 1024;

/// A raw, fixed-size page buffer.
pub type PageBuf = [u8; PAGE_SIZE];

pub fn empty_page() -> PageBuf {
    [0u8; PAGE_SIZE]
}

/// Mode an index file is opened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Open an existing file for reading and writing; fail if absent.
    Read,
    /// Open for reading and writing, creating the file if it does not exist.
    Write,
}

/// Narrow interface the tree core requires of a page-addressed backing
/// store. Read/write/seek failures are mapped to the stable [`IndexError`]
/// ordinals before they cross this boundary.
pub trait PageStore: Sized {
    fn open(path: &Path, mode: OpenMode) -> IndexResult<Self>;
    fn read(&mut self, page_id: i32, buf: &mut PageBuf) -> IndexResult<()>;
    fn write(&mut self, page_id: i32, buf: &PageBuf) -> IndexResult<()>;
    /// The page id the next `write` to a freshly allocated page will occupy.
    /// Must be queried *before* issuing that write, so the caller can record
    /// the id in parents and sibling pointers.
    fn next_page_id_on_append(&self) -> i32;
    fn close(self) -> IndexResult<()>;
}

/// Single-file, page-aligned [`PageStore`] implementation.
pub struct FilePageStore {
    file: File,
}

impl FilePageStore {
    fn offset_of(page_id: i32) -> u64 {
        page_id as u64 * PAGE_SIZE as u64
    }
}

impl PageStore for FilePageStore {
    fn open(path: &Path, mode: OpenMode) -> IndexResult<Self> {
        let mut options = OpenOptions::new();
        options.read(true).write(true);
        if mode == OpenMode::Write {
            options.create(true);
        }

        let file = options.open(path).map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "failed to open index file");
            IndexError::FileOpenFailed(e)
        })?;

        let mut store = FilePageStore { file };

        // A freshly created file has no header page yet; materialize a
        // zeroed page 0 so reads of the header never hit EOF.
        if store.file.metadata().map(|m| m.len()).unwrap_or(0) == 0 {
            store.write(0, &empty_page())?;
        }

        Ok(store)
    }

    fn read(&mut self, page_id: i32, buf: &mut PageBuf) -> IndexResult<()> {
        self.file
            .seek(SeekFrom::Start(Self::offset_of(page_id)))
            .map_err(|e| {
                tracing::error!(page_id, error = %e, "seek failed");
                IndexError::FileSeekFailed { page_id, source: e }
            })?;
        self.file.read_exact(buf).map_err(|e| {
            tracing::error!(page_id, error = %e, "page read failed");
            IndexError::FileReadFailed { page_id, source: e }
        })
    }

    fn write(&mut self, page_id: i32, buf: &PageBuf) -> IndexResult<()> {
        self.file
            .seek(SeekFrom::Start(Self::offset_of(page_id)))
            .map_err(|e| {
                tracing::error!(page_id, error = %e, "seek failed");
                IndexError::FileSeekFailed { page_id, source: e }
            })?;
        self.file.write_all(buf).map_err(|e| {
            tracing::error!(page_id, error = %e, "page write failed");
            IndexError::FileWriteFailed { page_id, source: e }
        })
    }

    fn next_page_id_on_append(&self) -> i32 {
        let len = self.file.metadata().map(|m| m.len()).unwrap_or(0);
        (len / PAGE_SIZE as u64) as i32
    }

    fn close(mut self) -> IndexResult<()> {
        self.file.flush().map_err(|e| {
            IndexError::FileWriteFailed {
                page_id: -1,
                source: e,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn append_ids_advance_by_one_page() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("idx.dat");
        let mut store = FilePageStore::open(&path, OpenMode::Write).unwrap();

        assert_eq!(store.next_page_id_on_append(), 1);
        store.write(1, &empty_page()).unwrap();
        assert_eq!(store.next_page_id_on_append(), 2);
    }

    #[test]
    fn write_then_read_roundtrips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("idx.dat");
        let mut store = FilePageStore::open(&path, OpenMode::Write).unwrap();

        let mut page = empty_page();
        page[0] = 0xAB;
        store.write(1, &page).unwrap();

        let mut out = empty_page();
        store.read(1, &mut out).unwrap();
        assert_eq!(out, page);
    }

    #[test]
    fn reopening_preserves_header_page() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("idx.dat");
        {
            let mut store = FilePageStore::open(&path, OpenMode::Write).unwrap();
            let mut header = empty_page();
            header[0..4].copy_from_slice(&42i32.to_le_bytes());
            store.write(0, &header).unwrap();
            store.close().unwrap();
        }
        {
            let mut store = FilePageStore::open(&path, OpenMode::Read).unwrap();
            let mut header = empty_page();
            store.read(0, &mut header).unwrap();
            assert_eq!(i32::from_le_bytes(header[0..4].try_into().unwrap()), 42);
        }
    }
}
