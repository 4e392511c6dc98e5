//! Fixed-size inode records and their slots in the inode segments.
//!
//! A record occupies a full block. Fields are serialised one by one in
//! little-endian order; the layout never depends on compiler padding.

use crate::bitmap;
use crate::config::*;
use crate::error::FsError;
use crate::segment::{SegmentKind, SegmentStore};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Free,
    Regular,
    Directory,
}

impl FileType {
    fn from_raw(raw: u32) -> Result<Self> {
        match raw {
            0 => Ok(FileType::Free),
            1 => Ok(FileType::Regular),
            2 => Ok(FileType::Directory),
            other => Err(FsError::Corruption(format!(
                "inode type {other} is out of range"
            ))),
        }
    }

    fn as_raw(self) -> u32 {
        match self {
            FileType::Free => 0,
            FileType::Regular => 1,
            FileType::Directory => 2,
        }
    }
}

/// In-memory form of an inode record. Pointer fields hold `NULL_BLOCK` when
/// unused; block 0 is only ever valid in the root directory's first slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inode {
    pub ftype: FileType,
    pub size: u64,
    pub direct: [u32; NUM_DIRECT_PTRS],
    pub single_indirect: u32,
    pub double_indirect: u32,
    pub triple_indirect: u32,
}

impl Inode {
    /// A record with no blocks: size 0, every pointer null.
    pub fn empty(ftype: FileType) -> Self {
        Inode {
            ftype,
            size: 0,
            direct: [NULL_BLOCK; NUM_DIRECT_PTRS],
            single_indirect: NULL_BLOCK,
            double_indirect: NULL_BLOCK,
            triple_indirect: NULL_BLOCK,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.ftype == FileType::Directory
    }

    pub fn is_regular(&self) -> bool {
        self.ftype == FileType::Regular
    }

    fn decode(buf: &[u8; BLOCK_SIZE]) -> Result<Inode> {
        let ftype = FileType::from_raw(u32_at(buf, 0))?;
        let size = u64::from_le_bytes(buf[4..12].try_into().unwrap());
        let mut direct = [NULL_BLOCK; NUM_DIRECT_PTRS];
        for (i, slot) in direct.iter_mut().enumerate() {
            *slot = u32_at(buf, 12 + i * 4);
        }
        Ok(Inode {
            ftype,
            size,
            direct,
            single_indirect: u32_at(buf, 52),
            double_indirect: u32_at(buf, 56),
            triple_indirect: u32_at(buf, 60),
        })
    }

    fn encode(&self, buf: &mut [u8; BLOCK_SIZE]) {
        buf.fill(0);
        buf[0..4].copy_from_slice(&self.ftype.as_raw().to_le_bytes());
        buf[4..12].copy_from_slice(&self.size.to_le_bytes());
        for (i, slot) in self.direct.iter().enumerate() {
            buf[12 + i * 4..16 + i * 4].copy_from_slice(&slot.to_le_bytes());
        }
        buf[52..56].copy_from_slice(&self.single_indirect.to_le_bytes());
        buf[56..60].copy_from_slice(&self.double_indirect.to_le_bytes());
        buf[60..64].copy_from_slice(&self.triple_indirect.to_le_bytes());
    }
}

fn u32_at(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap())
}

pub fn read_inode(store: &SegmentStore, number: u32) -> Result<Inode> {
    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    store.read_object(SegmentKind::Inode, number, &mut buf)?;
    Inode::decode(&buf)
}

pub fn write_inode(store: &SegmentStore, number: u32, inode: &Inode) -> Result<()> {
    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    inode.encode(&mut buf);
    store.write_object(SegmentKind::Inode, number, &buf)
}

/// Draws a fresh inode number and initialises its record to the empty state
/// of the given type.
pub fn alloc_inode(store: &SegmentStore, ftype: FileType) -> Result<u32> {
    let number = bitmap::allocate(store, SegmentKind::Inode)?;
    write_inode(store, number, &Inode::empty(ftype))?;
    Ok(number)
}

/// Clears the record and returns the number to the allocator. Freeing the
/// blocks the inode owned is the caller's responsibility.
pub fn free_inode(store: &SegmentStore, number: u32) -> Result<()> {
    write_inode(store, number, &Inode::empty(FileType::Free))?;
    bitmap::free(store, SegmentKind::Inode, number)
}
