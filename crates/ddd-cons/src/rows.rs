//! CONS_INFO rows: the wire projection of coupling records.
//!
//! Both row kinds are fixed 16-byte little-endian entries, so they travel as
//! LowComm table entries.
//!
//! ```text
//! coupling row: gid:u64 | typ:u16 | sender_prio:u8 | dest_prio:u8 | 0:u32
//! holder row:   gid:u64 | typ:u16 | prio:u8        | 0:u8         | holder:u32
//! ```

use ddd_core::{Gid, ObjType, Priority, Rank};

/// Size of one encoded row.
pub const ROW_SIZE: usize = 16;

fn gid_at(entry: &[u8]) -> Gid {
    let mut word = [0u8; 8];
    word.copy_from_slice(&entry[0..8]);
    Gid(u64::from_le_bytes(word))
}

fn typ_at(entry: &[u8]) -> ObjType {
    ObjType(u16::from_le_bytes([entry[8], entry[9]]))
}

/// The sender's view of one of its couplings to the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CplRow {
    pub gid: Gid,
    pub typ: ObjType,
    /// Priority of the sender's own copy.
    pub sender_prio: Priority,
    /// Priority the sender records for the receiver's copy.
    pub dest_prio: Priority,
}

impl CplRow {
    pub fn encode(&self) -> [u8; ROW_SIZE] {
        let mut row = [0u8; ROW_SIZE];
        row[0..8].copy_from_slice(&self.gid.0.to_le_bytes());
        row[8..10].copy_from_slice(&self.typ.0.to_le_bytes());
        row[10] = self.sender_prio.0;
        row[11] = self.dest_prio.0;
        row
    }

    /// Decode one table entry. `entry` must be [`ROW_SIZE`] bytes.
    pub fn decode(entry: &[u8]) -> Self {
        Self {
            gid: gid_at(entry),
            typ: typ_at(entry),
            sender_prio: Priority(entry[10]),
            dest_prio: Priority(entry[11]),
        }
    }
}

/// One holder of an object, as the sender sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HolderRow {
    pub gid: Gid,
    pub typ: ObjType,
    pub holder: Rank,
    pub prio: Priority,
}

impl HolderRow {
    pub fn encode(&self) -> [u8; ROW_SIZE] {
        let mut row = [0u8; ROW_SIZE];
        row[0..8].copy_from_slice(&self.gid.0.to_le_bytes());
        row[8..10].copy_from_slice(&self.typ.0.to_le_bytes());
        row[10] = self.prio.0;
        row[12..16].copy_from_slice(&self.holder.0.to_le_bytes());
        row
    }

    /// Decode one table entry. `entry` must be [`ROW_SIZE`] bytes.
    pub fn decode(entry: &[u8]) -> Self {
        Self {
            gid: gid_at(entry),
            typ: typ_at(entry),
            holder: Rank(u32::from_le_bytes([entry[12], entry[13], entry[14], entry[15]])),
            prio: Priority(entry[10]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpl_row_bytes() {
        let row = CplRow {
            gid: Gid(0x0102_0304_0506_0708),
            typ: ObjType(0x0a0b),
            sender_prio: Priority(1),
            dest_prio: Priority(2),
        };
        let bytes = row.encode();
        assert_eq!(
            bytes,
            [8, 7, 6, 5, 4, 3, 2, 1, 0x0b, 0x0a, 1, 2, 0, 0, 0, 0]
        );
        assert_eq!(CplRow::decode(&bytes), row);
    }

    #[test]
    fn test_holder_row_bytes() {
        let row = HolderRow {
            gid: Gid(42),
            typ: ObjType(3),
            holder: Rank(0x0102_0304),
            prio: Priority(5),
        };
        let bytes = row.encode();
        assert_eq!(&bytes[12..16], &[4, 3, 2, 1]);
        assert_eq!(bytes[10], 5);
        assert_eq!(HolderRow::decode(&bytes), row);
    }
}
