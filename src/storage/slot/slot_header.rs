//! Slot header and type definitions.
//!
//! Every slot of a [`FileStore`](crate::storage::FileStore) starts with a
//! [`SlotHeader`] containing metadata:
//! - [`SlotType`] discriminator
//! - CRC32 checksum for integrity
//! - Length of the record payload that follows the header

/// State of a slot on disk.
///
/// Uses `#[repr(u8)]` to guarantee a 1-byte representation for serialization.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SlotType {
    /// Never written (a zeroed slot left behind by an interrupted allocation).
    #[default]
    Invalid = 0,
    /// Holds a live record.
    Record = 1,
    /// Deleted; available for reuse.
    Free = 2,
}

impl SlotType {
    /// Convert from u8, returning Invalid for unknown values.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => SlotType::Record,
            2 => SlotType::Free,
            _ => SlotType::Invalid,
        }
    }

    /// Whether a slot of this type can be handed out by `insert`.
    #[inline]
    pub fn is_reusable(self) -> bool {
        self != SlotType::Record
    }
}

/// Metadata stored at the beginning of every slot.
///
/// # Layout (9 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       1     slot_type (SlotType as u8)
/// 1       4     checksum (CRC32, little-endian)
/// 5       4     len (payload length, little-endian)
/// ```
///
/// # Checksum
/// The checksum is computed over the entire slot with the checksum field
/// itself set to zero. This allows verification without special handling.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SlotHeader {
    /// State of this slot.
    pub slot_type: SlotType,
    /// CRC32 checksum of the slot contents.
    pub checksum: u32,
    /// Number of payload bytes after the header.
    pub len: u32,
}

impl SlotHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = 9;

    /// Offset of each field within the header.
    pub const OFFSET_SLOT_TYPE: usize = 0;
    pub const OFFSET_CHECKSUM: usize = 1;
    pub const OFFSET_LEN: usize = 5;

    /// Create a new header with the given slot type and payload length.
    ///
    /// The checksum is initialized to zero.
    pub fn new(slot_type: SlotType, len: u32) -> Self {
        Self {
            slot_type,
            checksum: 0,
            len,
        }
    }

    /// Read a header from the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < SlotHeader::SIZE`.
    pub fn from_bytes(data: &[u8]) -> Self {
        assert!(data.len() >= Self::SIZE, "buffer too small for SlotHeader");

        let slot_type = SlotType::from_u8(data[Self::OFFSET_SLOT_TYPE]);

        let mut checksum = [0u8; 4];
        checksum.copy_from_slice(&data[Self::OFFSET_CHECKSUM..Self::OFFSET_CHECKSUM + 4]);

        let mut len = [0u8; 4];
        len.copy_from_slice(&data[Self::OFFSET_LEN..Self::OFFSET_LEN + 4]);

        Self {
            slot_type,
            checksum: u32::from_le_bytes(checksum),
            len: u32::from_le_bytes(len),
        }
    }

    /// Write this header to the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < SlotHeader::SIZE`.
    pub fn write_to(&self, data: &mut [u8]) {
        assert!(data.len() >= Self::SIZE, "buffer too small for SlotHeader");

        data[Self::OFFSET_SLOT_TYPE] = self.slot_type as u8;
        data[Self::OFFSET_CHECKSUM..Self::OFFSET_CHECKSUM + 4]
            .copy_from_slice(&self.checksum.to_le_bytes());
        data[Self::OFFSET_LEN..Self::OFFSET_LEN + 4].copy_from_slice(&self.len.to_le_bytes());
    }

    /// Compute CRC32 checksum of a slot.
    ///
    /// The checksum is computed with the checksum field (bytes 1-4) zeroed out,
    /// so the checksum doesn't include itself.
    pub fn compute_checksum(slot_data: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();

        hasher.update(&slot_data[..Self::OFFSET_CHECKSUM]);
        hasher.update(&[0u8; 4]);
        hasher.update(&slot_data[Self::OFFSET_CHECKSUM + 4..]);

        hasher.finalize()
    }

    /// Verify that the stored checksum matches the computed checksum.
    pub fn verify_checksum(&self, slot_data: &[u8]) -> bool {
        self.checksum == Self::compute_checksum(slot_data)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::SLOT_SIZE;

    #[test]
    fn test_slot_type_from_u8() {
        assert_eq!(SlotType::from_u8(0), SlotType::Invalid);
        assert_eq!(SlotType::from_u8(1), SlotType::Record);
        assert_eq!(SlotType::from_u8(2), SlotType::Free);
        assert_eq!(SlotType::from_u8(255), SlotType::Invalid);
    }

    #[test]
    fn test_slot_type_reusable() {
        assert!(SlotType::Free.is_reusable());
        assert!(SlotType::Invalid.is_reusable());
        assert!(!SlotType::Record.is_reusable());
    }

    #[test]
    fn test_slot_header_roundtrip() {
        let original = SlotHeader {
            slot_type: SlotType::Record,
            checksum: 0xDEADBEEF,
            len: 1234,
        };

        let mut buffer = [0u8; SlotHeader::SIZE];
        original.write_to(&mut buffer);

        assert_eq!(SlotHeader::from_bytes(&buffer), original);
    }

    #[test]
    fn test_slot_header_byte_layout() {
        let header = SlotHeader {
            slot_type: SlotType::Free,
            checksum: 0x04030201,
            len: 0x08070605,
        };

        let mut buffer = [0u8; SlotHeader::SIZE];
        header.write_to(&mut buffer);

        assert_eq!(buffer[0], 2); // SlotType::Free
        assert_eq!(buffer[1], 0x01); // checksum LSB
        assert_eq!(buffer[4], 0x04); // checksum MSB
        assert_eq!(buffer[5], 0x05); // len LSB
        assert_eq!(buffer[8], 0x08); // len MSB
    }

    #[test]
    fn test_checksum_ignores_checksum_field() {
        let mut slot_data = [0u8; SLOT_SIZE];
        slot_data[100] = 0xAB;

        let checksum1 = SlotHeader::compute_checksum(&slot_data);
        slot_data[1..5].copy_from_slice(&[0xFF; 4]);
        let checksum2 = SlotHeader::compute_checksum(&slot_data);

        assert_eq!(checksum1, checksum2);
    }

    #[test]
    fn test_checksum_detects_corruption() {
        let mut slot_data = [0u8; SLOT_SIZE];
        slot_data[100] = 0xAB;

        let header = SlotHeader {
            slot_type: SlotType::Record,
            checksum: SlotHeader::compute_checksum(&slot_data),
            len: 0,
        };
        assert!(header.verify_checksum(&slot_data));

        slot_data[100] = 0xFF;
        assert!(!header.verify_checksum(&slot_data));
    }
}
