//! Chunked transfer of file contents between host byte streams and data
//! blocks, one block per chunk.

use std::io::{Read, Write};

use crate::bmap::{block_for_read, block_for_write};
use crate::config::*;
use crate::error::FsError;
use crate::inode::{write_inode, Inode};
use crate::segment::{SegmentKind, SegmentStore};
use crate::Result;

/// Reads from `source` until the chunk is full or the stream ends; the
/// unfilled tail is zeroed.
fn fill_chunk(source: &mut impl Read, buf: &mut [u8; BLOCK_SIZE]) -> Result<usize> {
    let mut filled = 0;
    while filled < BLOCK_SIZE {
        let n = source.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buf[filled..].fill(0);
    Ok(filled)
}

/// Streams `source` into the file in block-sized chunks, growing the block
/// chain through the write path as it goes. The inode's size is updated by
/// the actual byte count of every chunk and the record is written once the
/// stream ends. Returns the final size.
pub fn write_stream(
    store: &SegmentStore,
    inode_number: u32,
    inode: &mut Inode,
    source: &mut impl Read,
) -> Result<u64> {
    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    let mut index = 0u64;
    loop {
        let len = fill_chunk(source, &mut buf)?;
        if len == 0 {
            break;
        }
        let block = block_for_write(store, inode_number, inode, index)?;
        store.write_object(SegmentKind::Data, block, &buf)?;
        inode.size += len as u64;
        index += 1;
        if len < BLOCK_SIZE {
            break;
        }
    }
    write_inode(store, inode_number, inode)?;
    Ok(inode.size)
}

/// Emits the file's bytes to `sink`, block by block, the last block
/// truncated to the remaining count. A missing block before `size` bytes
/// have been emitted is corruption.
pub fn read_stream(store: &SegmentStore, inode: &Inode, sink: &mut impl Write) -> Result<u64> {
    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    let mut remaining = inode.size;
    let mut index = 0u64;
    while remaining > 0 {
        let block = block_for_read(store, inode, index)?.ok_or_else(|| {
            FsError::Corruption(format!(
                "file block {index} is missing before the recorded size"
            ))
        })?;
        store.read_object(SegmentKind::Data, block, &mut buf)?;
        let take = remaining.min(BLOCK_SIZE as u64) as usize;
        sink.write_all(&buf[..take])?;
        remaining -= take as u64;
        index += 1;
    }
    Ok(inode.size)
}
