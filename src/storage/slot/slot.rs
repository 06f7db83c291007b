//! Slot - the fixed 4KB unit a [`FileStore`](crate::storage::FileStore)
//! reads and writes.
//!
//! A [`Slot`] holds one record: a [`SlotHeader`] followed by up to
//! [`Slot::MAX_PAYLOAD`] payload bytes.

use crate::common::config::SLOT_SIZE;
use crate::common::{Error, Result};

use super::slot_header::{SlotHeader, SlotType};

/// A slot of data (4KB, 4KB-aligned).
///
/// # Memory Layout
/// ```text
/// ┌──────────────┬──────────────────────────────┬───────────┐
/// │ SlotHeader   │ payload (header.len bytes)   │ zero fill │
/// │ (9 bytes)    │                              │           │
/// └──────────────┴──────────────────────────────┴───────────┘
/// ```
///
/// # Clone Implementation
/// `Slot` does NOT implement `Clone` in production code (copying 4KB should
/// be explicit). A `#[cfg(test)]` Clone is provided for tests.
#[repr(align(4096))]
pub struct Slot {
    data: [u8; SLOT_SIZE],
}

impl Slot {
    /// Largest record payload a slot can hold.
    pub const MAX_PAYLOAD: usize = SLOT_SIZE - SlotHeader::SIZE;

    /// Create a new zeroed slot.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0u8; SLOT_SIZE],
        }
    }

    /// Build a sealed slot holding `payload`.
    ///
    /// # Errors
    /// `Error::RecordTooLarge` if `payload` exceeds [`Slot::MAX_PAYLOAD`].
    pub fn with_record(payload: &[u8]) -> Result<Self> {
        if payload.len() > Self::MAX_PAYLOAD {
            return Err(Error::RecordTooLarge {
                len: payload.len(),
                max: Self::MAX_PAYLOAD,
            });
        }

        let mut slot = Slot::new();
        slot.set_header(&SlotHeader::new(SlotType::Record, payload.len() as u32));
        slot.data[SlotHeader::SIZE..SlotHeader::SIZE + payload.len()].copy_from_slice(payload);
        slot.update_checksum();
        Ok(slot)
    }

    /// Build a sealed, empty slot marked free.
    pub fn free() -> Self {
        let mut slot = Slot::new();
        slot.set_header(&SlotHeader::new(SlotType::Free, 0));
        slot.update_checksum();
        slot
    }

    /// Get immutable slice of slot data.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get mutable slice of slot data.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Read the slot header.
    pub fn header(&self) -> SlotHeader {
        SlotHeader::from_bytes(&self.data)
    }

    /// Write a slot header.
    pub fn set_header(&mut self, header: &SlotHeader) {
        header.write_to(&mut self.data);
    }

    /// Record payload, as delimited by the header.
    ///
    /// # Errors
    /// `Error::Corrupted` if the header claims more bytes than a slot holds.
    pub fn payload(&self) -> Result<&[u8]> {
        let len = self.header().len as usize;
        if len > Self::MAX_PAYLOAD {
            return Err(Error::Corrupted(format!(
                "slot payload length {} exceeds {}",
                len,
                Self::MAX_PAYLOAD
            )));
        }
        Ok(&self.data[SlotHeader::SIZE..SlotHeader::SIZE + len])
    }

    /// Compute and store checksum in the header.
    ///
    /// Call this after all modifications to the slot are complete.
    pub fn update_checksum(&mut self) {
        let checksum = SlotHeader::compute_checksum(&self.data);
        self.data[SlotHeader::OFFSET_CHECKSUM..SlotHeader::OFFSET_CHECKSUM + 4]
            .copy_from_slice(&checksum.to_le_bytes());
    }

    /// Verify the slot checksum is valid.
    pub fn verify_checksum(&self) -> bool {
        self.header().verify_checksum(&self.data)
    }
}

impl Default for Slot {
    fn default() -> Self {
        Self::new()
    }
}

// Clone only available in tests - forces explicit copying in production
#[cfg(test)]
impl Clone for Slot {
    fn clone(&self) -> Self {
        let mut new_slot = Slot::new();
        new_slot.data.copy_from_slice(&self.data);
        new_slot
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_size_and_alignment() {
        assert_eq!(std::mem::size_of::<Slot>(), SLOT_SIZE);
        assert_eq!(std::mem::align_of::<Slot>(), 4096);
    }

    #[test]
    fn test_with_record() {
        let slot = Slot::with_record(b"hello").unwrap();
        let header = slot.header();

        assert_eq!(header.slot_type, SlotType::Record);
        assert_eq!(header.len, 5);
        assert_eq!(slot.payload().unwrap(), b"hello");
        assert!(slot.verify_checksum());
    }

    #[test]
    fn test_with_record_max_payload() {
        let payload = vec![0x5Au8; Slot::MAX_PAYLOAD];
        let slot = Slot::with_record(&payload).unwrap();
        assert_eq!(slot.payload().unwrap().len(), Slot::MAX_PAYLOAD);

        let too_big = vec![0u8; Slot::MAX_PAYLOAD + 1];
        assert!(matches!(
            Slot::with_record(&too_big),
            Err(Error::RecordTooLarge { .. })
        ));
    }

    #[test]
    fn test_free_slot() {
        let slot = Slot::free();
        assert_eq!(slot.header().slot_type, SlotType::Free);
        assert!(slot.payload().unwrap().is_empty());
        assert!(slot.verify_checksum());
    }

    #[test]
    fn test_corruption_detected() {
        let mut slot = Slot::with_record(b"payload").unwrap();
        let cloned = slot.clone();
        slot.as_mut_slice()[SlotHeader::SIZE] ^= 0xFF;

        assert!(cloned.verify_checksum());
        assert!(!slot.verify_checksum());
    }

    #[test]
    fn test_bogus_length_rejected() {
        let mut slot = Slot::new();
        slot.set_header(&SlotHeader::new(SlotType::Record, u32::MAX));
        assert!(matches!(slot.payload(), Err(Error::Corrupted(_))));
    }
}
