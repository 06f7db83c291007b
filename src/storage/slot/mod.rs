//! On-disk slot layout used by the file store.
//!
//! This module contains:
//! - [`Slot`] - The raw 4KB record container
//! - [`SlotHeader`] - Metadata at the start of every slot
//! - [`SlotType`] - Discriminator for live and free slots

#[allow(clippy::module_inception)]
mod slot;
mod slot_header;

pub use slot::Slot;
pub use slot_header::{SlotHeader, SlotType};
