//! Layout constants of the on-disk format.

/// Size of one object slot (inode record, data block, indirect block).
pub const BLOCK_SIZE: usize = 4096;
/// Size of one segment file on the host.
pub const SEGMENT_SIZE: usize = 1024 * 1024;
/// Object slots per segment. The first block of a segment is its bitmap,
/// the remaining blocks are slots.
pub const SLOTS_PER_SEGMENT: u32 = (SEGMENT_SIZE / BLOCK_SIZE - 1) as u32;

/// File name prefixes of the two segment pools.
pub const INODE_SEGMENT_PREFIX: &str = "inode_segment_";
pub const DATA_SEGMENT_PREFIX: &str = "data_segment_";

/// "No block here" / "no inode here". Distinct from block 0, which is a
/// valid block number reserved for the root directory's first data block.
pub const NULL_BLOCK: u32 = u32::MAX;
pub const NULL_INODE: u32 = u32::MAX;

/// The root directory lives in inode 0 and seeds data block 0.
pub const ROOT_INODE_ID: u32 = 0;
pub const ROOT_DIR_BLOCK: u32 = 0;

pub const NUM_DIRECT_PTRS: usize = 10;
/// Block numbers per indirect block (32-bit entries).
pub const PTRS_PER_BLOCK: usize = BLOCK_SIZE / 4;

pub const MAX_NAME_LEN: usize = 255;
/// Name field of a directory entry: 255 name bytes plus a terminating zero.
pub const NAME_FIELD_LEN: usize = MAX_NAME_LEN + 1;
/// Inode number (4 bytes) followed by the name field.
pub const DIR_ENTRY_SIZE: usize = 4 + NAME_FIELD_LEN;
pub const ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / DIR_ENTRY_SIZE;

pub const DOT_NAME: &str = ".";
pub const DOTDOT_NAME: &str = "..";

/// Logical block counts addressable at each indirection depth.
pub const DIRECT_CAP: u64 = NUM_DIRECT_PTRS as u64;
pub const SINGLE_CAP: u64 = DIRECT_CAP + PTRS_PER_BLOCK as u64;
pub const DOUBLE_CAP: u64 = SINGLE_CAP + (PTRS_PER_BLOCK * PTRS_PER_BLOCK) as u64;
pub const TRIPLE_CAP: u64 =
    DOUBLE_CAP + (PTRS_PER_BLOCK as u64 * PTRS_PER_BLOCK as u64 * PTRS_PER_BLOCK as u64);
