//! Object id allocation and the offset table behind the xref section.

use crate::error::{Error, Result};
use std::io::Write;

const UNWRITTEN: u64 = u64::MAX;

/// Dense table of object offsets indexed by object id.
///
/// Ids start at 1 and are handed out in increasing order. Each id receives
/// its file offset exactly once, right before its `id 0 obj` header.
#[derive(Debug, Clone, Default)]
pub struct ObjectAllocator {
    offsets: Vec<u64>,
}

impl ObjectAllocator {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next object id.
    pub fn create_object(&mut self) -> u32 {
        self.offsets.push(UNWRITTEN);
        self.offsets.len() as u32
    }

    /// Number of ids handed out so far.
    pub fn count(&self) -> u32 {
        self.offsets.len() as u32
    }

    /// Record where object `id` starts.
    pub fn update_object(&mut self, id: u32, offset: u64) -> Result<()> {
        let slot = id
            .checked_sub(1)
            .and_then(|i| self.offsets.get_mut(i as usize))
            .ok_or(Error::UnknownObject(id))?;
        if *slot != UNWRITTEN {
            return Err(Error::ObjectRewritten(id));
        }
        *slot = offset;
        Ok(())
    }

    /// Offset of a written object.
    pub fn offset(&self, id: u32) -> Option<u64> {
        id.checked_sub(1)
            .and_then(|i| self.offsets.get(i as usize))
            .copied()
            .filter(|&o| o != UNWRITTEN)
    }

    /// Whether `id` has been written.
    pub fn is_written(&self, id: u32) -> bool {
        self.offset(id).is_some()
    }

    /// First allocated id that never received an offset.
    pub fn first_unwritten(&self) -> Option<u32> {
        self.offsets
            .iter()
            .position(|&o| o == UNWRITTEN)
            .map(|i| i as u32 + 1)
    }

    /// Render the classic cross-reference section.
    ///
    /// Every entry is exactly 20 bytes. Fails when an allocated id was never
    /// written, since its entry would point at garbage.
    pub fn write_xref(&self) -> Result<Vec<u8>> {
        if let Some(id) = self.first_unwritten() {
            return Err(Error::ObjectNotWritten(id));
        }
        let mut buf = Vec::with_capacity(32 + 20 * (self.offsets.len() + 1));
        write!(buf, "xref\n0 {}\n", self.offsets.len() + 1)?;
        buf.extend_from_slice(b"0000000000 65535 f \n");
        for offset in &self.offsets {
            write!(buf, "{:010} 00000 n \n", offset)?;
        }
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_dense_and_increasing() {
        let mut alloc = ObjectAllocator::new();
        assert_eq!(alloc.create_object(), 1);
        assert_eq!(alloc.create_object(), 2);
        assert_eq!(alloc.create_object(), 3);
        assert_eq!(alloc.count(), 3);
    }

    #[test]
    fn test_write_once() {
        let mut alloc = ObjectAllocator::new();
        let id = alloc.create_object();
        alloc.update_object(id, 15).unwrap();
        assert_eq!(alloc.offset(id), Some(15));
        assert!(matches!(alloc.update_object(id, 30), Err(Error::ObjectRewritten(1))));
        assert!(matches!(alloc.update_object(0, 30), Err(Error::UnknownObject(0))));
        assert!(matches!(alloc.update_object(9, 30), Err(Error::UnknownObject(9))));
    }

    #[test]
    fn test_xref_requires_all_written() {
        let mut alloc = ObjectAllocator::new();
        let a = alloc.create_object();
        let _b = alloc.create_object();
        alloc.update_object(a, 9).unwrap();
        assert!(matches!(alloc.write_xref(), Err(Error::ObjectNotWritten(2))));
    }

    #[test]
    fn test_xref_entries_are_20_bytes() {
        let mut alloc = ObjectAllocator::new();
        let a = alloc.create_object();
        let b = alloc.create_object();
        alloc.update_object(a, 15).unwrap();
        alloc.update_object(b, 1234).unwrap();
        let xref = String::from_utf8(alloc.write_xref().unwrap()).unwrap();
        let lines: Vec<&str> = xref.split_inclusive('\n').collect();
        assert_eq!(lines[0], "xref\n");
        assert_eq!(lines[1], "0 3\n");
        assert_eq!(lines[2], "0000000000 65535 f \n");
        assert_eq!(lines[3], "0000000015 00000 n \n");
        assert_eq!(lines[4], "0000001234 00000 n \n");
        assert!(lines[2..].iter().all(|l| l.len() == 20));
    }
}
