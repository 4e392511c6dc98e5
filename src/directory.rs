//! Directory contents: fixed-size entry records packed into data blocks
//! reached through the block map.
//!
//! An entry is a child inode number followed by a 256-byte null-terminated
//! name field. Unused entries hold `NULL_INODE`; freed slots are reused in
//! place and blocks are never compacted. Every directory carries "." and
//! ".." from creation, so those names resolve like any other entry.

use crate::bmap::{block_for_read, block_for_write};
use crate::config::*;
use crate::error::FsError;
use crate::inode::{write_inode, Inode};
use crate::segment::{SegmentKind, SegmentStore};
use crate::Result;

/// A live directory entry, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub inode: u32,
}

fn entry_inode(buf: &[u8; BLOCK_SIZE], slot: usize) -> u32 {
    let offset = slot * DIR_ENTRY_SIZE;
    u32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap())
}

fn entry_name(buf: &[u8; BLOCK_SIZE], slot: usize) -> &[u8] {
    let start = slot * DIR_ENTRY_SIZE + 4;
    let field = &buf[start..start + NAME_FIELD_LEN];
    let len = field.iter().position(|&b| b == 0).unwrap_or(MAX_NAME_LEN);
    &field[..len]
}

pub(crate) fn encode_entry(buf: &mut [u8; BLOCK_SIZE], slot: usize, inode: u32, name: &str) {
    let offset = slot * DIR_ENTRY_SIZE;
    buf[offset..offset + 4].copy_from_slice(&inode.to_le_bytes());
    let field = &mut buf[offset + 4..offset + 4 + NAME_FIELD_LEN];
    field.fill(0);
    field[..name.len()].copy_from_slice(name.as_bytes());
}

fn clear_entry(buf: &mut [u8; BLOCK_SIZE], slot: usize) {
    let offset = slot * DIR_ENTRY_SIZE;
    buf[offset..offset + 4].copy_from_slice(&NULL_INODE.to_le_bytes());
    buf[offset + 4..offset + 4 + NAME_FIELD_LEN].fill(0);
}

/// Formats a freshly allocated block: every entry unused, tail zeroed.
pub(crate) fn format_block(buf: &mut [u8; BLOCK_SIZE]) {
    buf.fill(0);
    for slot in 0..ENTRIES_PER_BLOCK {
        clear_entry(buf, slot);
    }
}

/// Reads directory block `index` (logical) into `buf`. Returns false when
/// the directory has no block at that index, which terminates every scan.
fn read_dir_block(
    store: &SegmentStore,
    dir: &Inode,
    index: u64,
    buf: &mut [u8; BLOCK_SIZE],
) -> Result<Option<u32>> {
    match block_for_read(store, dir, index)? {
        Some(block) => {
            store.read_object(SegmentKind::Data, block, buf)?;
            Ok(Some(block))
        }
        None => Ok(None),
    }
}

/// Finds `name` in the directory. Returns the child inode number, or `None`.
pub fn lookup(store: &SegmentStore, dir: &Inode, name: &str) -> Result<Option<u32>> {
    if !dir.is_directory() {
        return Err(FsError::NotADirectory(name.into()));
    }
    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    for index in 0u64.. {
        if read_dir_block(store, dir, index, &mut buf)?.is_none() {
            return Ok(None);
        }
        for slot in 0..ENTRIES_PER_BLOCK {
            let inode = entry_inode(&buf, slot);
            if inode == NULL_INODE {
                continue;
            }
            let entry = entry_name(&buf, slot);
            if entry.is_empty() {
                return Err(FsError::Corruption(
                    "live directory entry with empty name".into(),
                ));
            }
            if entry == name.as_bytes() {
                return Ok(Some(inode));
            }
        }
    }
    unreachable!()
}

/// Adds an entry for `name`, reusing the first unused slot or spilling into
/// a freshly allocated block. Duplicate names are refused.
pub fn add_entry(
    store: &SegmentStore,
    dir_number: u32,
    dir: &mut Inode,
    name: &str,
    child: u32,
) -> Result<()> {
    if lookup(store, dir, name)?.is_some() {
        return Err(FsError::AlreadyExists(name.into()));
    }

    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    let mut blocks = 0u64;
    let mut target: Option<(u32, usize)> = None;
    'scan: for index in 0u64.. {
        match read_dir_block(store, dir, index, &mut buf)? {
            None => break 'scan,
            Some(block) => {
                blocks = index + 1;
                for slot in 0..ENTRIES_PER_BLOCK {
                    if entry_inode(&buf, slot) == NULL_INODE {
                        target = Some((block, slot));
                        break 'scan;
                    }
                }
            }
        }
    }

    let (block, slot) = match target {
        // The scan stopped on this block, so `buf` still holds it.
        Some(found) => found,
        None => {
            // Every existing block is packed; append one.
            let block = block_for_write(store, dir_number, dir, blocks)?;
            format_block(&mut buf);
            (block, 0)
        }
    };
    encode_entry(&mut buf, slot, child, name);
    store.write_object(SegmentKind::Data, block, &buf)?;

    dir.size += DIR_ENTRY_SIZE as u64;
    write_inode(store, dir_number, dir)
}

/// Nulls the entry for `name` and returns the child inode number it held.
/// The self-entries "." and ".." are never removable.
pub fn remove_entry(
    store: &SegmentStore,
    dir_number: u32,
    dir: &mut Inode,
    name: &str,
) -> Result<u32> {
    if name == DOT_NAME || name == DOTDOT_NAME {
        return Err(FsError::InvalidName(name.into()));
    }
    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    for index in 0u64.. {
        let Some(block) = read_dir_block(store, dir, index, &mut buf)? else {
            break;
        };
        for slot in 0..ENTRIES_PER_BLOCK {
            let inode = entry_inode(&buf, slot);
            if inode == NULL_INODE || entry_name(&buf, slot) != name.as_bytes() {
                continue;
            }
            clear_entry(&mut buf, slot);
            store.write_object(SegmentKind::Data, block, &buf)?;
            dir.size -= DIR_ENTRY_SIZE as u64;
            write_inode(store, dir_number, dir)?;
            return Ok(inode);
        }
    }
    Err(FsError::NotFound(name.into()))
}

/// Every live entry of the directory, in block order.
pub fn live_entries(store: &SegmentStore, dir: &Inode) -> Result<Vec<DirEntry>> {
    let mut entries = Vec::new();
    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    for index in 0u64.. {
        if read_dir_block(store, dir, index, &mut buf)?.is_none() {
            break;
        }
        for slot in 0..ENTRIES_PER_BLOCK {
            let inode = entry_inode(&buf, slot);
            if inode == NULL_INODE {
                continue;
            }
            let name = entry_name(&buf, slot);
            if name.is_empty() {
                return Err(FsError::Corruption(
                    "live directory entry with empty name".into(),
                ));
            }
            let name = String::from_utf8(name.to_vec()).map_err(|_| {
                FsError::Corruption("directory entry name is not valid utf-8".into())
            })?;
            entries.push(DirEntry { name, inode });
        }
    }
    Ok(entries)
}

/// Gives a brand-new directory inode its first block, seeded with the "."
/// and ".." self-entries.
pub fn init_directory(
    store: &SegmentStore,
    dir_number: u32,
    dir: &mut Inode,
    parent_number: u32,
) -> Result<()> {
    let block = block_for_write(store, dir_number, dir, 0)?;
    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    format_block(&mut buf);
    encode_entry(&mut buf, 0, dir_number, DOT_NAME);
    encode_entry(&mut buf, 1, parent_number, DOTDOT_NAME);
    store.write_object(SegmentKind::Data, block, &buf)?;
    dir.size = 2 * DIR_ENTRY_SIZE as u64;
    write_inode(store, dir_number, dir)
}
