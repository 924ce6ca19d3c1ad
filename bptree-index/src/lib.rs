//! Disk-backed B+-tree index over signed 32-bit keys.
//!
//! Maps each key to a [`TupleLocator`] `(page, slot)` in a separate heap
//! file. The tree itself never interprets the locator or the heap file's
//! contents — see [`scan`] for the driver that glues key lookups to
//! predicate evaluation over stored tuples.

pub mod error;
pub mod heap;
pub mod locator;
pub mod node;
pub mod page;
pub mod scan;
pub mod tree;

pub use error::{ErrorCode, IndexError, IndexResult};
pub use locator::TupleLocator;
pub use page::{FilePageStore, OpenMode, PageStore, PAGE_SIZE};
pub use tree::{Cursor, TreeIndex};
