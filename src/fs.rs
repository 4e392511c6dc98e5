//! The file-operations façade: list, add, extract, remove, debug, composed
//! from the lower layers.

use std::io::{Read, Write};
use std::path::Path;

use log::{debug, info};

use crate::bitmap;
use crate::bmap;
use crate::config::*;
use crate::directory;
use crate::error::FsError;
use crate::file;
use crate::inode::{alloc_inode, free_inode, read_inode, write_inode, FileType, Inode};
use crate::path::{self, resolve, resolve_parent, validate_leaf};
use crate::segment::{SegmentKind, SegmentStore};
use crate::Result;

/// A mounted store. One instance assumes exclusive access to the segment
/// files in its directory for the duration of each operation.
#[derive(Debug)]
pub struct FileSystem {
    store: SegmentStore,
}

impl FileSystem {
    /// Opens the store rooted at `dir`. A directory with no inode segment 0
    /// is empty and gets its first-ever initialization: segment 0 of both
    /// pools, the root inode, and the root directory block with its "."
    /// and ".." entries.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let store = SegmentStore::new(dir);
        if !store.segment_exists(SegmentKind::Inode, 0) {
            bootstrap(&store)?;
        }
        Ok(FileSystem { store })
    }

    pub fn store(&self) -> &SegmentStore {
        &self.store
    }

    /// Emits a recursive tree for a directory, or the bare name for a
    /// regular file. Directories carry a trailing "/".
    pub fn list(&self, pathname: &str, out: &mut impl Write) -> Result<()> {
        let number = resolve(&self.store, pathname)?;
        let inode = read_live_inode(&self.store, number)?;
        if !inode.is_directory() {
            let (_, leaf) = path::split(pathname)?;
            writeln!(out, "{leaf}")?;
            return Ok(());
        }

        // Depth-first over an explicit stack; children pushed in reverse so
        // they print in directory order.
        let mut stack: Vec<(u32, String, usize)> = Vec::new();
        push_children(&self.store, &inode, 0, &mut stack)?;
        while let Some((child, name, depth)) = stack.pop() {
            let child_inode = read_live_inode(&self.store, child)?;
            let marker = if child_inode.is_directory() { "/" } else { "" };
            writeln!(out, "{:indent$}{name}{marker}", "", indent = depth * 2)?;
            if child_inode.is_directory() {
                push_children(&self.store, &child_inode, depth + 1, &mut stack)?;
            }
        }
        Ok(())
    }

    /// Ingests `source` as a new regular file at `pathname`, creating
    /// missing intermediate directories. Fails if the name is already
    /// taken; on any later failure everything allocated here is released.
    pub fn add(&mut self, pathname: &str, source: &mut impl Read) -> Result<()> {
        let (_, leaf) = path::split(pathname)?;
        validate_leaf(leaf)?;
        let (parent_number, leaf) = resolve_parent(&self.store, pathname, true)?;
        let mut parent = read_live_inode(&self.store, parent_number)?;
        if !parent.is_directory() {
            return Err(FsError::NotADirectory(pathname.into()));
        }
        if directory::lookup(&self.store, &parent, leaf)?.is_some() {
            return Err(FsError::AlreadyExists(pathname.into()));
        }

        let number = alloc_inode(&self.store, FileType::Regular)?;
        let mut inode = Inode::empty(FileType::Regular);
        let outcome = file::write_stream(&self.store, number, &mut inode, source).and_then(|_| {
            directory::add_entry(&self.store, parent_number, &mut parent, leaf, number)
        });
        if let Err(e) = outcome {
            release_blocks(&self.store, &inode);
            let _ = free_inode(&self.store, number);
            return Err(e);
        }
        debug!("added {pathname:?} as inode {number}, {} bytes", inode.size);
        Ok(())
    }

    /// Emits the bytes of the regular file at `pathname` to `sink`.
    pub fn extract(&self, pathname: &str, sink: &mut impl Write) -> Result<u64> {
        let number = resolve(&self.store, pathname)?;
        let inode = read_live_inode(&self.store, number)?;
        if inode.is_directory() {
            return Err(FsError::IsADirectory(pathname.into()));
        }
        file::read_stream(&self.store, &inode, sink)
    }

    /// Deletes the file or subtree at `pathname`. The parent's entry goes
    /// first, then every inode and block of the subtree returns to its
    /// pool. The root cannot be removed; an intermediate directory emptied
    /// by a removal stays in place.
    pub fn remove(&mut self, pathname: &str) -> Result<()> {
        let (_, leaf) = path::split(pathname)?;
        validate_leaf(leaf)?;
        let (parent_number, leaf) = resolve_parent(&self.store, pathname, false)?;
        let mut parent = read_live_inode(&self.store, parent_number)?;
        if !parent.is_directory() {
            return Err(FsError::NotADirectory(pathname.into()));
        }
        if directory::lookup(&self.store, &parent, leaf)?.is_none() {
            return Err(FsError::NotFound(pathname.into()));
        }
        let target = directory::remove_entry(&self.store, parent_number, &mut parent, leaf)?;
        self.free_subtree(target)?;
        debug!("removed {pathname:?}");
        Ok(())
    }

    /// Walks the path component by component, dumping each step's inode.
    /// Never mutates.
    pub fn debug(&self, pathname: &str, out: &mut impl Write) -> Result<()> {
        let root = read_live_inode(&self.store, ROOT_INODE_ID)?;
        dump_inode(out, "/", ROOT_INODE_ID, &root)?;
        let mut current = ROOT_INODE_ID;
        for component in path::components(pathname)? {
            let inode = read_live_inode(&self.store, current)?;
            if !inode.is_directory() {
                return Err(FsError::NotADirectory(component.into()));
            }
            current = directory::lookup(&self.store, &inode, component)?
                .ok_or_else(|| FsError::NotFound(pathname.into()))?;
            let inode = read_live_inode(&self.store, current)?;
            dump_inode(out, component, current, &inode)?;
        }
        Ok(())
    }

    /// Frees every inode and block reachable from `number`. Two phases
    /// over an explicit worklist; recursion depth never tracks tree depth.
    fn free_subtree(&self, number: u32) -> Result<()> {
        let mut gathered = Vec::new();
        let mut worklist = vec![number];
        while let Some(n) = worklist.pop() {
            gathered.push(n);
            let inode = read_live_inode(&self.store, n)?;
            if inode.is_directory() {
                for entry in directory::live_entries(&self.store, &inode)? {
                    if entry.name != DOT_NAME && entry.name != DOTDOT_NAME {
                        worklist.push(entry.inode);
                    }
                }
            }
        }
        info!("freeing {} inode(s) under inode {number}", gathered.len());
        for n in gathered {
            let inode = read_live_inode(&self.store, n)?;
            for block in bmap::collect_blocks(&self.store, &inode)? {
                bitmap::free(&self.store, SegmentKind::Data, block)?;
            }
            free_inode(&self.store, n)?;
        }
        Ok(())
    }
}

/// First-ever initialization. The allocator hands out slot 0 of a brand-new
/// segment in each pool, which pins the root inode to 0 and its directory
/// block to 0.
fn bootstrap(store: &SegmentStore) -> Result<()> {
    let root = bitmap::allocate(store, SegmentKind::Inode)?;
    let block = bitmap::allocate(store, SegmentKind::Data)?;
    debug_assert_eq!(root, ROOT_INODE_ID);
    debug_assert_eq!(block, ROOT_DIR_BLOCK);

    let mut buf = Box::new([0u8; BLOCK_SIZE]);
    directory::format_block(&mut buf);
    directory::encode_entry(&mut buf, 0, ROOT_INODE_ID, DOT_NAME);
    directory::encode_entry(&mut buf, 1, ROOT_INODE_ID, DOTDOT_NAME);
    store.write_object(SegmentKind::Data, block, &buf)?;

    let mut root_inode = Inode::empty(FileType::Directory);
    root_inode.direct[0] = block;
    root_inode.size = 2 * DIR_ENTRY_SIZE as u64;
    write_inode(store, ROOT_INODE_ID, &root_inode)?;
    info!("initialised empty store");
    Ok(())
}

/// Reads an inode that a directory entry claims is live.
fn read_live_inode(store: &SegmentStore, number: u32) -> Result<Inode> {
    let inode = read_inode(store, number)?;
    if inode.ftype == FileType::Free {
        return Err(FsError::Corruption(format!(
            "inode {number} is free but still referenced"
        )));
    }
    Ok(inode)
}

fn push_children(
    store: &SegmentStore,
    dir: &Inode,
    depth: usize,
    stack: &mut Vec<(u32, String, usize)>,
) -> Result<()> {
    let mut entries = directory::live_entries(store, dir)?;
    entries.retain(|e| e.name != DOT_NAME && e.name != DOTDOT_NAME);
    for entry in entries.into_iter().rev() {
        stack.push((entry.inode, entry.name, depth));
    }
    Ok(())
}

fn release_blocks(store: &SegmentStore, inode: &Inode) {
    if let Ok(blocks) = bmap::collect_blocks(store, inode) {
        for block in blocks {
            let _ = bitmap::free(store, SegmentKind::Data, block);
        }
    }
}

fn dump_inode(out: &mut impl Write, name: &str, number: u32, inode: &Inode) -> Result<()> {
    let kind = match inode.ftype {
        FileType::Directory => "directory",
        FileType::Regular => "regular",
        FileType::Free => "free",
    };
    writeln!(out, "{name} [inode {number}]")?;
    writeln!(out, "  type: {kind}")?;
    writeln!(out, "  size: {} bytes", inode.size)?;
    write!(out, "  direct:")?;
    for &block in inode.direct.iter().filter(|&&b| b != NULL_BLOCK) {
        write!(out, " {block}")?;
    }
    writeln!(out)?;
    if inode.single_indirect != NULL_BLOCK {
        writeln!(out, "  single indirect: {}", inode.single_indirect)?;
    }
    if inode.double_indirect != NULL_BLOCK {
        writeln!(out, "  double indirect: {}", inode.double_indirect)?;
    }
    if inode.triple_indirect != NULL_BLOCK {
        writeln!(out, "  triple indirect: {}", inode.triple_indirect)?;
    }
    Ok(())
}
