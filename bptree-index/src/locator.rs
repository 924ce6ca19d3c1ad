//! Tuple locators — the opaque `(page, slot)` addresses the index stores
//! alongside each key.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Cursor};

/// Physical address of a tuple in the heap file. Opaque to the tree: it is
/// read and written as eight raw bytes and never interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TupleLocator {
    pub page_id: i32,
    pub slot_id: i32,
}

impl TupleLocator {
    pub const SIZE: usize = 8;

    pub fn new(page_id: i32, slot_id: i32) -> Self {
        TupleLocator { page_id, slot_id }
    }

    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        {
            let mut cursor = Cursor::new(&mut buf[..]);
            cursor.write_i32::<LittleEndian>(self.page_id).unwrap();
            cursor.write_i32::<LittleEndian>(self.slot_id).unwrap();
        }
        buf
    }

    pub fn from_bytes(data: &[u8]) -> io::Result<Self> {
        let mut cursor = Cursor::new(data);
        let page_id = cursor.read_i32::<LittleEndian>()?;
        let slot_id = cursor.read_i32::<LittleEndian>()?;
        Ok(TupleLocator { page_id, slot_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let loc = TupleLocator::new(7, 3);
        let bytes = loc.to_bytes();
        assert_eq!(TupleLocator::from_bytes(&bytes).unwrap(), loc);
    }
}
