//! Logical-to-physical block translation through the inode's direct slots
//! and up to three levels of indirect blocks.
//!
//! An indirect block is an array of `PTRS_PER_BLOCK` little-endian u32
//! block numbers; empty slots hold `NULL_BLOCK`. A slot holding 0 is
//! corruption, since block 0 can only be owned by the root directory's
//! first direct slot.

use crate::bitmap;
use crate::config::*;
use crate::error::FsError;
use crate::inode::{write_inode, Inode};
use crate::segment::{SegmentKind, SegmentStore};
use crate::Result;

/// Where a logical block index lands in the pointer hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockPath {
    Direct(usize),
    Single(usize),
    Double(usize, usize),
    Triple(usize, usize, usize),
}

/// Decomposes a logical block index. Indices past the triple-indirect
/// ceiling fail with `FileTooLarge`.
pub fn classify(index: u64) -> Result<BlockPath> {
    const P: u64 = PTRS_PER_BLOCK as u64;
    if index < DIRECT_CAP {
        Ok(BlockPath::Direct(index as usize))
    } else if index < SINGLE_CAP {
        Ok(BlockPath::Single((index - DIRECT_CAP) as usize))
    } else if index < DOUBLE_CAP {
        let rest = index - SINGLE_CAP;
        Ok(BlockPath::Double((rest / P) as usize, (rest % P) as usize))
    } else if index < TRIPLE_CAP {
        let rest = index - DOUBLE_CAP;
        Ok(BlockPath::Triple(
            (rest / (P * P)) as usize,
            ((rest / P) % P) as usize,
            (rest % P) as usize,
        ))
    } else {
        Err(FsError::FileTooLarge(index))
    }
}

fn ptr_at(buf: &[u8; BLOCK_SIZE], slot: usize) -> u32 {
    u32::from_le_bytes(buf[slot * 4..slot * 4 + 4].try_into().unwrap())
}

fn set_ptr(buf: &mut [u8; BLOCK_SIZE], slot: usize, value: u32) {
    buf[slot * 4..slot * 4 + 4].copy_from_slice(&value.to_le_bytes());
}

fn check_owned(block: u32) -> Result<u32> {
    if block == 0 {
        return Err(FsError::Corruption(
            "indirect pointer points to block 0".into(),
        ));
    }
    Ok(block)
}

/// Resolves a logical block index without allocating. Returns `None` when
/// any pointer along the chain is null.
pub fn block_for_read(store: &SegmentStore, inode: &Inode, index: u64) -> Result<Option<u32>> {
    let (mut current, indices): (u32, Vec<usize>) = match classify(index)? {
        BlockPath::Direct(i) => {
            let block = inode.direct[i];
            return Ok((block != NULL_BLOCK).then_some(block));
        }
        BlockPath::Single(i) => (inode.single_indirect, vec![i]),
        BlockPath::Double(i, j) => (inode.double_indirect, vec![i, j]),
        BlockPath::Triple(i, j, k) => (inode.triple_indirect, vec![i, j, k]),
    };
    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    for &slot in &indices {
        if current == NULL_BLOCK {
            return Ok(None);
        }
        check_owned(current)?;
        store.read_object(SegmentKind::Data, current, &mut buf)?;
        current = ptr_at(&buf, slot);
    }
    if current == NULL_BLOCK {
        return Ok(None);
    }
    check_owned(current)?;
    Ok(Some(current))
}

/// Where the first block allocated by a write-path walk was attached, so a
/// failed walk can detach it again.
enum Attachment {
    None,
    InodeField,
    ParentSlot(u32, usize),
}

/// Resolves a logical block index for writing, allocating any missing
/// indirect blocks and the leaf data block. Newly minted pointers are
/// committed to their parent (inode or indirect block) before the walk
/// descends, so a crash-free reader always sees a consistent chain. If an
/// allocation fails partway, everything allocated by this call is detached
/// and returned to the pool before the error surfaces.
pub fn block_for_write(
    store: &SegmentStore,
    inode_number: u32,
    inode: &mut Inode,
    index: u64,
) -> Result<u32> {
    let path = classify(index)?;
    if let BlockPath::Direct(i) = path {
        if inode.direct[i] != NULL_BLOCK {
            return Ok(inode.direct[i]);
        }
        let block = bitmap::allocate(store, SegmentKind::Data)?;
        inode.direct[i] = block;
        if let Err(e) = write_inode(store, inode_number, inode) {
            inode.direct[i] = NULL_BLOCK;
            let _ = bitmap::free(store, SegmentKind::Data, block);
            return Err(e);
        }
        return Ok(block);
    }

    let mut allocated: Vec<u32> = Vec::new();
    let mut attachment = Attachment::None;
    match walk_write(store, inode_number, inode, path, &mut allocated, &mut attachment) {
        Ok(block) => Ok(block),
        Err(e) => {
            rollback(store, inode_number, inode, path, allocated, attachment);
            Err(e)
        }
    }
}

fn walk_write(
    store: &SegmentStore,
    inode_number: u32,
    inode: &mut Inode,
    path: BlockPath,
    allocated: &mut Vec<u32>,
    attachment: &mut Attachment,
) -> Result<u32> {
    let (top, indices): (u32, Vec<usize>) = match path {
        BlockPath::Single(i) => (inode.single_indirect, vec![i]),
        BlockPath::Double(i, j) => (inode.double_indirect, vec![i, j]),
        BlockPath::Triple(i, j, k) => (inode.triple_indirect, vec![i, j, k]),
        BlockPath::Direct(_) => unreachable!(),
    };

    let mut current = if top == NULL_BLOCK {
        let block = alloc_indirect(store, allocated)?;
        match path {
            BlockPath::Single(_) => inode.single_indirect = block,
            BlockPath::Double(..) => inode.double_indirect = block,
            BlockPath::Triple(..) => inode.triple_indirect = block,
            BlockPath::Direct(_) => unreachable!(),
        }
        *attachment = Attachment::InodeField;
        write_inode(store, inode_number, inode)?;
        block
    } else {
        check_owned(top)?
    };

    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    for (depth, &slot) in indices.iter().enumerate() {
        store.read_object(SegmentKind::Data, current, &mut buf)?;
        let mut next = ptr_at(&buf, slot);
        if next == NULL_BLOCK {
            let leaf = depth == indices.len() - 1;
            next = if leaf {
                let block = bitmap::allocate(store, SegmentKind::Data)?;
                allocated.push(block);
                block
            } else {
                alloc_indirect(store, allocated)?
            };
            set_ptr(&mut buf, slot, next);
            store.write_object(SegmentKind::Data, current, &buf)?;
            if matches!(attachment, Attachment::None) {
                *attachment = Attachment::ParentSlot(current, slot);
            }
        } else {
            check_owned(next)?;
        }
        current = next;
    }
    Ok(current)
}

/// Allocates a data block and formats it as an empty indirect block (every
/// slot nulled).
fn alloc_indirect(store: &SegmentStore, allocated: &mut Vec<u32>) -> Result<u32> {
    let block = bitmap::allocate(store, SegmentKind::Data)?;
    allocated.push(block);
    let buf = Box::new([0xFFu8; BLOCK_SIZE]);
    store.write_object(SegmentKind::Data, block, &buf)?;
    Ok(block)
}

fn rollback(
    store: &SegmentStore,
    inode_number: u32,
    inode: &mut Inode,
    path: BlockPath,
    allocated: Vec<u32>,
    attachment: Attachment,
) {
    match attachment {
        Attachment::None => {}
        Attachment::InodeField => {
            // The first new block hangs off the inode; detach the whole
            // chain by nulling the field the failed walk had just set.
            match path {
                BlockPath::Single(_) => inode.single_indirect = NULL_BLOCK,
                BlockPath::Double(..) => inode.double_indirect = NULL_BLOCK,
                BlockPath::Triple(..) => inode.triple_indirect = NULL_BLOCK,
                BlockPath::Direct(_) => {}
            }
            let _ = write_inode(store, inode_number, inode);
        }
        Attachment::ParentSlot(parent, slot) => {
            let mut buf = Box::new([0u8; BLOCK_SIZE]);
            if store.read_object(SegmentKind::Data, parent, &mut buf).is_ok() {
                set_ptr(&mut buf, slot, NULL_BLOCK);
                let _ = store.write_object(SegmentKind::Data, parent, &buf);
            }
        }
    }
    for block in allocated.into_iter().rev() {
        let _ = bitmap::free(store, SegmentKind::Data, block);
    }
}

/// Every block owned by the inode, indirect blocks included, in post-order:
/// leaves come before the indirect block that points to them. Used by the
/// removal path to return a whole file to the pool.
pub fn collect_blocks(store: &SegmentStore, inode: &Inode) -> Result<Vec<u32>> {
    let mut blocks = Vec::new();
    for &block in &inode.direct {
        if block != NULL_BLOCK {
            blocks.push(block);
        }
    }
    for (pointer, depth) in [
        (inode.single_indirect, 1),
        (inode.double_indirect, 2),
        (inode.triple_indirect, 3),
    ] {
        if pointer != NULL_BLOCK {
            check_owned(pointer)?;
            collect_indirect(store, pointer, depth, &mut blocks)?;
        }
    }
    Ok(blocks)
}

fn collect_indirect(
    store: &SegmentStore,
    block: u32,
    depth: u32,
    out: &mut Vec<u32>,
) -> Result<()> {
    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    store.read_object(SegmentKind::Data, block, &mut buf)?;
    for slot in 0..PTRS_PER_BLOCK {
        let child = ptr_at(&buf, slot);
        if child == NULL_BLOCK {
            continue;
        }
        check_owned(child)?;
        if depth == 1 {
            out.push(child);
        } else {
            collect_indirect(store, child, depth - 1, out)?;
        }
    }
    out.push(block);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn classify_direct_range() {
        assert_eq!(classify(0).unwrap(), BlockPath::Direct(0));
        assert_eq!(classify(9).unwrap(), BlockPath::Direct(9));
    }

    #[test]
    fn classify_single_range() {
        assert_eq!(classify(10).unwrap(), BlockPath::Single(0));
        assert_eq!(classify(10 + 1023).unwrap(), BlockPath::Single(1023));
    }

    #[test]
    fn classify_double_range() {
        assert_eq!(classify(SINGLE_CAP).unwrap(), BlockPath::Double(0, 0));
        assert_eq!(classify(SINGLE_CAP + 1024).unwrap(), BlockPath::Double(1, 0));
        assert_eq!(
            classify(DOUBLE_CAP - 1).unwrap(),
            BlockPath::Double(1023, 1023)
        );
    }

    #[test]
    fn classify_triple_range() {
        assert_eq!(classify(DOUBLE_CAP).unwrap(), BlockPath::Triple(0, 0, 0));
        assert_eq!(
            classify(DOUBLE_CAP + 1024 * 1024 + 1024 + 1).unwrap(),
            BlockPath::Triple(1, 1, 1)
        );
        assert_eq!(
            classify(TRIPLE_CAP - 1).unwrap(),
            BlockPath::Triple(1023, 1023, 1023)
        );
    }

    #[test]
    fn classify_beyond_capacity() {
        assert!(matches!(
            classify(TRIPLE_CAP),
            Err(FsError::FileTooLarge(_))
        ));
    }
}
