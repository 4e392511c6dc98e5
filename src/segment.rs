//! The segment store: maps (kind, segment index, slot index) to byte ranges
//! of host files, creating segment files on demand.
//!
//! A segment file is exactly `SEGMENT_SIZE` bytes: one bitmap block followed
//! by `SLOTS_PER_SEGMENT` object slots. Slot `j` of segment `i` has the
//! pool-wide number `i * SLOTS_PER_SEGMENT + j`.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::{info, trace};

use crate::config::*;
use crate::error::FsError;
use crate::Result;

/// The two object pools. Each has its own run of segment files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Inode,
    Data,
}

impl SegmentKind {
    fn prefix(self) -> &'static str {
        match self {
            SegmentKind::Inode => INODE_SEGMENT_PREFIX,
            SegmentKind::Data => DATA_SEGMENT_PREFIX,
        }
    }
}

/// Handle over the directory holding the segment files. File handles are
/// opened per call and dropped before the call returns; the store itself
/// carries no open descriptors and no mutable counters.
#[derive(Debug)]
pub struct SegmentStore {
    dir: PathBuf,
}

/// Splits a pool-wide object number into (segment index, slot index).
pub fn split_number(number: u32) -> (u32, u32) {
    (number / SLOTS_PER_SEGMENT, number % SLOTS_PER_SEGMENT)
}

/// Inverse of `split_number`.
pub fn join_number(segment: u32, slot: u32) -> u32 {
    segment * SLOTS_PER_SEGMENT + slot
}

impl SegmentStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        SegmentStore {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn segment_path(&self, kind: SegmentKind, segment: u32) -> PathBuf {
        self.dir.join(format!("{}{}", kind.prefix(), segment))
    }

    /// Whether the segment file exists. The first missing segment of a kind
    /// terminates every scan over that pool.
    pub fn segment_exists(&self, kind: SegmentKind, segment: u32) -> bool {
        self.segment_path(kind, segment).is_file()
    }

    /// Creates a segment file of exactly `SEGMENT_SIZE` zeroed bytes.
    pub fn create_segment(&self, kind: SegmentKind, segment: u32) -> Result<()> {
        let path = self.segment_path(kind, segment);
        let file = File::create(&path)?;
        file.set_len(SEGMENT_SIZE as u64)?;
        info!("created segment {}", path.display());
        Ok(())
    }

    /// Reads object slot `slot` of a segment. The segment file must exist.
    pub fn read_slot(
        &self,
        kind: SegmentKind,
        segment: u32,
        slot: u32,
        buf: &mut [u8; BLOCK_SIZE],
    ) -> Result<()> {
        debug_assert!(slot < SLOTS_PER_SEGMENT);
        self.read_at(kind, segment, (1 + slot as u64) * BLOCK_SIZE as u64, buf)
    }

    /// Writes object slot `slot` of a segment, creating the segment file
    /// (zero-filled to full size) if it does not exist yet.
    pub fn write_slot(
        &self,
        kind: SegmentKind,
        segment: u32,
        slot: u32,
        buf: &[u8; BLOCK_SIZE],
    ) -> Result<()> {
        debug_assert!(slot < SLOTS_PER_SEGMENT);
        self.write_at(kind, segment, (1 + slot as u64) * BLOCK_SIZE as u64, buf)
    }

    /// Shorthand for the bitmap block (block 0) of a segment.
    pub fn read_bitmap(
        &self,
        kind: SegmentKind,
        segment: u32,
        buf: &mut [u8; BLOCK_SIZE],
    ) -> Result<()> {
        self.read_at(kind, segment, 0, buf)
    }

    pub fn write_bitmap(
        &self,
        kind: SegmentKind,
        segment: u32,
        buf: &[u8; BLOCK_SIZE],
    ) -> Result<()> {
        self.write_at(kind, segment, 0, buf)
    }

    /// Reads the slot addressed by a pool-wide object number.
    pub fn read_object(
        &self,
        kind: SegmentKind,
        number: u32,
        buf: &mut [u8; BLOCK_SIZE],
    ) -> Result<()> {
        let (segment, slot) = split_number(number);
        self.read_slot(kind, segment, slot, buf)
    }

    /// Writes the slot addressed by a pool-wide object number.
    pub fn write_object(
        &self,
        kind: SegmentKind,
        number: u32,
        buf: &[u8; BLOCK_SIZE],
    ) -> Result<()> {
        let (segment, slot) = split_number(number);
        self.write_slot(kind, segment, slot, buf)
    }

    fn read_at(
        &self,
        kind: SegmentKind,
        segment: u32,
        offset: u64,
        buf: &mut [u8; BLOCK_SIZE],
    ) -> Result<()> {
        let path = self.segment_path(kind, segment);
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(FsError::MissingSegment { path });
            }
            Err(e) => return Err(e.into()),
        };
        let len = file.metadata()?.len();
        let required = offset + BLOCK_SIZE as u64;
        if len < required {
            return Err(FsError::ShortRead {
                path,
                missing: required - len,
            });
        }
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)?;
        trace!("read {}+{offset:#x}", path.display());
        Ok(())
    }

    fn write_at(
        &self,
        kind: SegmentKind,
        segment: u32,
        offset: u64,
        buf: &[u8; BLOCK_SIZE],
    ) -> Result<()> {
        if !self.segment_exists(kind, segment) {
            self.create_segment(kind, segment)?;
        }
        let path = self.segment_path(kind, segment);
        let mut file = OpenOptions::new().write(true).open(&path)?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(buf)?;
        trace!("wrote {}+{offset:#x}", path.display());
        Ok(())
    }
}
