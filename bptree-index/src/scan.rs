//! Scan driver (C5): glues [`crate::tree::TreeIndex::read_forward`] to a
//! list of predicates over `{key, value}`, deriving a starting key from the
//! predicate set and stopping as soon as the key column's predicates can no
//! longer be satisfied by any later entry.

use crate::error::IndexResult;
use crate::heap::HeapFile;
use crate::locator::TupleLocator;
use crate::page::PageStore;
use crate::tree::{Cursor, TreeIndex};

/// Which column a predicate constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Key,
    Value,
}

/// Comparators available to a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparator {
    fn matches(self, actual: i32, bound: i32) -> bool {
        match self {
            Comparator::Eq => actual == bound,
            Comparator::Ne => actual != bound,
            Comparator::Lt => actual < bound,
            Comparator::Le => actual <= bound,
            Comparator::Gt => actual > bound,
            Comparator::Ge => actual >= bound,
        }
    }
}

/// A single `column comparator value` condition. `value` is interpreted as
/// a signed 32-bit integer: for the [`Column::Value`] column this reads the
/// tuple's first four bytes, matching the (key, value) integer pairs the
/// heap file stores by default.
#[derive(Debug, Clone, Copy)]
pub struct Predicate {
    pub column: Column,
    pub comparator: Comparator,
    pub operand: i32,
}

impl Predicate {
    pub fn new(column: Column, comparator: Comparator, operand: i32) -> Self {
        Predicate {
            column,
            comparator,
            operand,
        }
    }

    fn value_of(self, key: i32, value_bytes: &[u8]) -> Option<i32> {
        match self.column {
            Column::Key => Some(key),
            Column::Value => {
                let bytes: [u8; 4] = value_bytes.get(0..4)?.try_into().ok()?;
                Some(i32::from_le_bytes(bytes))
            }
        }
    }

    fn evaluate(self, key: i32, value_bytes: &[u8]) -> bool {
        match self.value_of(key, value_bytes) {
            Some(actual) => self.comparator.matches(actual, self.operand),
            None => false,
        }
    }
}

/// Tightest `[min_key, max_key]` range implied by the key-column predicates:
/// lower bounds take the max (the tightest is the one that matters), upper
/// bounds take the min, strict comparators are tightened by one, and an
/// equality predicate collapses the range to a single key.
fn derive_key_bounds(predicates: &[Predicate]) -> (i32, Option<i32>) {
    let mut min_key = i32::MIN;
    let mut max_key: Option<i32> = None;

    for p in predicates {
        if p.column != Column::Key {
            continue;
        }
        match p.comparator {
            Comparator::Eq => {
                min_key = min_key.max(p.operand);
                max_key = Some(max_key.map_or(p.operand, |m| m.min(p.operand)));
            }
            Comparator::Ge => min_key = min_key.max(p.operand),
            Comparator::Gt => min_key = min_key.max(p.operand.saturating_add(1)),
            Comparator::Le => max_key = Some(max_key.map_or(p.operand, |m| m.min(p.operand))),
            Comparator::Lt => {
                let tightened = p.operand.saturating_sub(1);
                max_key = Some(max_key.map_or(tightened, |m| m.min(tightened)));
            }
            Comparator::Ne => {}
        }
    }

    (min_key, max_key)
}

/// Drives a key-ordered scan of the index, fetching each candidate tuple
/// from `heap` and filtering it against `predicates`. Stops as soon as the
/// key exceeds the derived upper bound — it does not rely on the heap file
/// or the tree to tell it the scan is done.
pub struct ScanDriver<'a, S: PageStore, H: HeapFile> {
    tree: &'a mut TreeIndex<S>,
    heap: &'a mut H,
    predicates: Vec<Predicate>,
    cursor: Cursor,
    max_key: Option<i32>,
    done: bool,
}

impl<'a, S: PageStore, H: HeapFile> ScanDriver<'a, S, H> {
    pub fn new(
        tree: &'a mut TreeIndex<S>,
        heap: &'a mut H,
        predicates: Vec<Predicate>,
    ) -> IndexResult<Self> {
        let (min_key, max_key) = derive_key_bounds(&predicates);
        let cursor = tree.locate(min_key)?;
        Ok(ScanDriver {
            tree,
            heap,
            predicates,
            cursor,
            max_key,
            done: false,
        })
    }

    /// Returns the next `(key, value, locator)` tuple satisfying every
    /// predicate, or `None` once the scan is exhausted.
    pub fn next(&mut self) -> IndexResult<Option<(i32, Vec<u8>, TupleLocator)>> {
        if self.done {
            return Ok(None);
        }

        loop {
            let Some((key, locator)) = self.tree.read_forward(&mut self.cursor)? else {
                self.done = true;
                return Ok(None);
            };

            if let Some(max) = self.max_key {
                if key > max {
                    self.done = true;
                    return Ok(None);
                }
            }

            let (_, value_bytes) = self.heap.read(locator)?;

            if self
                .predicates
                .iter()
                .all(|p| p.evaluate(key, &value_bytes))
            {
                return Ok(Some((key, value_bytes, locator)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::FileHeapFile;
    use crate::page::{FilePageStore, OpenMode};
    use tempfile::tempdir;

    fn build_fixture(dir: &std::path::Path) -> (TreeIndex<FilePageStore>, FileHeapFile) {
        let mut tree =
            TreeIndex::<FilePageStore>::open(&dir.join("idx.dat"), OpenMode::Write).unwrap();
        let mut heap = FileHeapFile::open(&dir.join("heap.dat"), OpenMode::Write).unwrap();

        for key in 1..=200 {
            let value = (key * 10).to_le_bytes();
            let locator = heap.append(key, &value).unwrap();
            tree.insert(key, locator).unwrap();
        }

        (tree, heap)
    }

    #[test]
    fn early_termination_stops_at_the_upper_bound() {
        let dir = tempdir().unwrap();
        let (mut tree, mut heap) = build_fixture(dir.path());

        let predicates = vec![Predicate::new(Column::Key, Comparator::Le, 100)];
        let mut scan = ScanDriver::new(&mut tree, &mut heap, predicates).unwrap();

        let mut seen = Vec::new();
        while let Some((key, _, _)) = scan.next().unwrap() {
            seen.push(key);
        }

        assert_eq!(seen, (1..=100).collect::<Vec<_>>());
    }

    #[test]
    fn range_predicate_on_key_narrows_both_ends() {
        let dir = tempdir().unwrap();
        let (mut tree, mut heap) = build_fixture(dir.path());

        let predicates = vec![
            Predicate::new(Column::Key, Comparator::Gt, 50),
            Predicate::new(Column::Key, Comparator::Le, 55),
        ];
        let mut scan = ScanDriver::new(&mut tree, &mut heap, predicates).unwrap();

        let mut seen = Vec::new();
        while let Some((key, _, _)) = scan.next().unwrap() {
            seen.push(key);
        }

        assert_eq!(seen, vec![51, 52, 53, 54, 55]);
    }

    #[test]
    fn value_predicate_filters_without_affecting_the_key_range() {
        let dir = tempdir().unwrap();
        let (mut tree, mut heap) = build_fixture(dir.path());

        let predicates = vec![
            Predicate::new(Column::Key, Comparator::Le, 20),
            Predicate::new(Column::Value, Comparator::Eq, 100),
        ];
        let mut scan = ScanDriver::new(&mut tree, &mut heap, predicates).unwrap();

        let mut seen = Vec::new();
        while let Some((key, _, _)) = scan.next().unwrap() {
            seen.push(key);
        }

        assert_eq!(seen, vec![10]);
    }

    #[test]
    fn equality_predicate_collapses_the_range_to_one_key() {
        let dir = tempdir().unwrap();
        let (mut tree, mut heap) = build_fixture(dir.path());

        let predicates = vec![Predicate::new(Column::Key, Comparator::Eq, 77)];
        let mut scan = ScanDriver::new(&mut tree, &mut heap, predicates).unwrap();

        let first = scan.next().unwrap();
        assert_eq!(first.map(|(k, _, _)| k), Some(77));
        assert_eq!(scan.next().unwrap(), None);
    }
}
