//! ExFS2 is a persistent, userspace, inode-based file store that keeps its
//! entire state in ordinary host files called segments.
//!
//! A segment is 1 MiB: one bitmap block followed by 255 object slots of
//! 4 KiB. Two parallel pools of segments exist, one for inode records and
//! one for data blocks, each growing lazily one segment at a time.
//!
//! The layers, bottom to top:
//! 1. Segment store: (kind, segment, slot) → bytes in host files.
//! 2. Bitmap allocator: lowest-free-slot allocation over each pool.
//! 3. Inode table: fixed-size records at offsets derived from the number.
//! 4. Block map: logical block index → data block, through up to three
//!    levels of indirect blocks.
//! 5. Directory store: fixed-size name entries packed into data blocks.
//! 6. Path resolver: absolute paths walked from the root inode.
//! 7. `FileSystem`: the list / add / extract / remove / debug façade.

mod bitmap;
mod bmap;
mod config;
mod directory;
mod error;
mod file;
mod fs;
mod inode;
mod path;
mod segment;

pub use bitmap::is_allocated;
pub use bmap::{block_for_read, classify, BlockPath};
pub use config::*;
pub use directory::DirEntry;
pub use error::FsError as Error;
pub use error::Result;
pub use fs::FileSystem;
pub use inode::{read_inode, FileType, Inode};
pub use path::{resolve, split};
pub use segment::{join_number, split_number, SegmentKind, SegmentStore};
