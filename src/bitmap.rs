//! Slot allocation for the two pools, backed by the bitmap block at the
//! head of every segment.
//!
//! Allocation is deterministic: always the lowest free slot of the
//! lowest-indexed segment, with bits scanned least-significant-first inside
//! each byte. When every existing segment is full a fresh one is appended.

use log::warn;

use crate::config::*;
use crate::error::FsError;
use crate::segment::{join_number, split_number, SegmentKind, SegmentStore};
use crate::Result;

fn bit_is_set(bitmap: &[u8; BLOCK_SIZE], bit: u32) -> bool {
    bitmap[bit as usize / 8] & (1 << (bit % 8)) != 0
}

fn set_bit(bitmap: &mut [u8; BLOCK_SIZE], bit: u32) {
    bitmap[bit as usize / 8] |= 1 << (bit % 8);
}

fn clear_bit(bitmap: &mut [u8; BLOCK_SIZE], bit: u32) {
    bitmap[bit as usize / 8] &= !(1 << (bit % 8));
}

/// Lowest clear bit below `SLOTS_PER_SEGMENT`, scanning each byte from its
/// least significant bit up.
fn find_first_zero(bitmap: &[u8; BLOCK_SIZE]) -> Option<u32> {
    (0..SLOTS_PER_SEGMENT).find(|&bit| !bit_is_set(bitmap, bit))
}

/// Grants the lowest free slot of the pool, growing it by one segment when
/// every existing segment is full. Returns the pool-wide object number.
pub fn allocate(store: &SegmentStore, kind: SegmentKind) -> Result<u32> {
    let mut bitmap = Box::new([0u8; BLOCK_SIZE]);
    for segment in 0u32.. {
        if !store.segment_exists(kind, segment) {
            // Every earlier segment is full; append a new one and hand out
            // its first slot.
            store.create_segment(kind, segment).map_err(|e| {
                warn!("segment creation failed: {e}");
                FsError::OutOfSpace
            })?;
            bitmap.fill(0);
            set_bit(&mut bitmap, 0);
            store.write_bitmap(kind, segment, &bitmap)?;
            return Ok(join_number(segment, 0));
        }
        store.read_bitmap(kind, segment, &mut bitmap)?;
        if let Some(slot) = find_first_zero(&bitmap) {
            set_bit(&mut bitmap, slot);
            store.write_bitmap(kind, segment, &bitmap)?;
            return Ok(join_number(segment, slot));
        }
    }
    Err(FsError::OutOfSpace)
}

/// Returns a slot to the pool. Object number 0 is reserved for the root
/// directory in both pools and is never returned. Clearing a bit that was
/// already clear is logged and otherwise ignored.
pub fn free(store: &SegmentStore, kind: SegmentKind, number: u32) -> Result<()> {
    if number == 0 {
        return Err(FsError::Corruption(format!(
            "attempt to free reserved {kind:?} slot 0"
        )));
    }
    if number == NULL_BLOCK {
        return Err(FsError::Corruption(format!(
            "attempt to free the null {kind:?} sentinel"
        )));
    }
    let (segment, slot) = split_number(number);
    let mut bitmap = Box::new([0u8; BLOCK_SIZE]);
    store.read_bitmap(kind, segment, &mut bitmap)?;
    if !bit_is_set(&bitmap, slot) {
        warn!("{kind:?} slot {number} was already free");
        return Ok(());
    }
    clear_bit(&mut bitmap, slot);
    store.write_bitmap(kind, segment, &bitmap)
}

/// Whether the slot of a pool-wide object number is currently allocated.
pub fn is_allocated(store: &SegmentStore, kind: SegmentKind, number: u32) -> Result<bool> {
    let (segment, slot) = split_number(number);
    let mut bitmap = Box::new([0u8; BLOCK_SIZE]);
    store.read_bitmap(kind, segment, &mut bitmap)?;
    Ok(bit_is_set(&bitmap, slot))
}
