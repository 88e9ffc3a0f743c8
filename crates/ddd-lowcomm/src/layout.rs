//! Byte layout of a message buffer.
//!
//! ```text
//! magic:u32 | count:u32 | (offset:u32, size:u32, entries:u32) x count | payload...
//! ```
//!
//! All integers are little-endian. Offsets count from the start of the buffer
//! and are aligned to [`ALIGN`] bytes; payloads follow in declaration order.

use crate::error::LayoutError;

/// Alignment of every component payload.
pub const ALIGN: usize = 8;

const FIXED_HEADER: usize = 8;
const SLOT_HEADER: usize = 12;

fn align(n: usize) -> usize {
    (n + ALIGN - 1) & !(ALIGN - 1)
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&buf[at..at + 4]);
    u32::from_le_bytes(word)
}

fn write_u32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

fn wire(value: usize, what: &str) -> u32 {
    u32::try_from(value).unwrap_or_else(|_| panic!("{what} {value} exceeds the wire format"))
}

/// Position of one component inside a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub offset: usize,
    pub size: usize,
    pub entries: usize,
}

impl Slot {
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.size
    }
}

/// Frozen layout of a whole message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    slots: Vec<Slot>,
    total: usize,
}

impl Layout {
    /// Size of the header for `count` components.
    pub fn header_size(count: usize) -> usize {
        FIXED_HEADER + SLOT_HEADER * count
    }

    /// Compute offsets for components of the given `(size, entries)`.
    pub fn freeze(sizes: &[(usize, usize)]) -> Self {
        let mut offset = align(Self::header_size(sizes.len()));
        let mut slots = Vec::with_capacity(sizes.len());
        for &(size, entries) in sizes {
            slots.push(Slot {
                offset,
                size,
                entries,
            });
            offset = align(offset + size);
        }
        let total = offset;
        wire(total, "message size");
        Self { slots, total }
    }

    /// Total buffer size in bytes.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> &Slot {
        &self.slots[index]
    }

    /// Write the header into the front of `buf`.
    pub fn write_header(&self, magic: u32, buf: &mut [u8]) {
        write_u32(buf, 0, magic);
        write_u32(buf, 4, wire(self.slots.len(), "component count"));
        for (i, slot) in self.slots.iter().enumerate() {
            let at = FIXED_HEADER + i * SLOT_HEADER;
            write_u32(buf, at, wire(slot.offset, "offset"));
            write_u32(buf, at + 4, wire(slot.size, "component size"));
            write_u32(buf, at + 8, wire(slot.entries, "entry count"));
        }
    }

    /// Decode and validate the header of a received buffer.
    pub fn parse(buf: &[u8], magic: u32, components: usize) -> Result<Self, LayoutError> {
        if buf.len() < FIXED_HEADER {
            return Err(LayoutError::Truncated(buf.len()));
        }
        let found = read_u32(buf, 0);
        if found != magic {
            return Err(LayoutError::BadMagic {
                expected: magic,
                found,
            });
        }
        let count = read_u32(buf, 4) as usize;
        if count != components {
            return Err(LayoutError::ComponentCount {
                expected: components,
                found: count,
            });
        }
        let header = Self::header_size(count);
        if buf.len() < header {
            return Err(LayoutError::Truncated(buf.len()));
        }

        let mut slots = Vec::with_capacity(count);
        for index in 0..count {
            let at = FIXED_HEADER + index * SLOT_HEADER;
            let slot = Slot {
                offset: read_u32(buf, at) as usize,
                size: read_u32(buf, at + 4) as usize,
                entries: read_u32(buf, at + 8) as usize,
            };
            if slot.offset < header || slot.offset + slot.size > buf.len() {
                return Err(LayoutError::OutOfBounds {
                    index,
                    len: buf.len(),
                });
            }
            slots.push(slot);
        }

        Ok(Self {
            slots,
            total: buf.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_offsets_are_aligned_and_ordered() {
        let layout = Layout::freeze(&[(80, 10), (3, 3), (0, 0), (100, 100)]);
        let header = Layout::header_size(4);
        assert_eq!(header, 56);

        let slots = layout.slots();
        assert_eq!(slots[0].offset, 56);
        assert_eq!(slots[1].offset, 136);
        assert_eq!(slots[2].offset, 144);
        assert_eq!(slots[3].offset, 144);
        assert_eq!(layout.total(), 248);
        assert!(slots.iter().all(|s| s.offset % ALIGN == 0));
    }

    #[test]
    fn test_header_bytes() {
        let layout = Layout::freeze(&[(16, 2)]);
        let mut buf = vec![0u8; layout.total()];
        layout.write_header(0xdead_beef, &mut buf);

        assert_eq!(&buf[0..4], &0xdead_beefu32.to_le_bytes());
        assert_eq!(&buf[4..8], &1u32.to_le_bytes());
        assert_eq!(&buf[8..12], &24u32.to_le_bytes());
        assert_eq!(&buf[12..16], &16u32.to_le_bytes());
        assert_eq!(&buf[16..20], &2u32.to_le_bytes());
    }

    #[test]
    fn test_parse_rejects_bad_magic() {
        let layout = Layout::freeze(&[(8, 1)]);
        let mut buf = vec![0u8; layout.total()];
        layout.write_header(1, &mut buf);
        assert_eq!(
            Layout::parse(&buf, 2, 1),
            Err(LayoutError::BadMagic {
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn test_parse_rejects_component_count() {
        let layout = Layout::freeze(&[(8, 1), (8, 8)]);
        let mut buf = vec![0u8; layout.total()];
        layout.write_header(7, &mut buf);
        assert_eq!(
            Layout::parse(&buf, 7, 3),
            Err(LayoutError::ComponentCount {
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn test_parse_rejects_truncated() {
        assert_eq!(Layout::parse(&[1, 2, 3], 0, 0), Err(LayoutError::Truncated(3)));

        let layout = Layout::freeze(&[(64, 8)]);
        let mut buf = vec![0u8; layout.total()];
        layout.write_header(9, &mut buf);
        assert!(matches!(
            Layout::parse(&buf[..40], 9, 1),
            Err(LayoutError::OutOfBounds { index: 0, .. })
        ));
    }

    proptest! {
        #[test]
        fn parse_inverts_write(sizes in prop::collection::vec((0usize..512, 0usize..64), 0..8)) {
            let layout = Layout::freeze(&sizes);
            let mut buf = vec![0u8; layout.total()];
            layout.write_header(0x4c43_4d31, &mut buf);
            prop_assert_eq!(Layout::parse(&buf, 0x4c43_4d31, sizes.len()).unwrap(), layout);
        }
    }
}
