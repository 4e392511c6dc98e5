//! Path resolution and manipulation utilities.
//!
//! Paths are absolute, slash-separated, and walked component by component
//! from the root inode. Components are borrowed sub-slices of the input;
//! "." and ".." are ordinary lookups against the directory's self-entries,
//! which is what makes ".." in the root resolve back to the root.

use log::debug;

use crate::bitmap;
use crate::bmap;
use crate::config::*;
use crate::directory;
use crate::error::FsError;
use crate::inode::{alloc_inode, free_inode, read_inode, FileType, Inode};
use crate::segment::{SegmentKind, SegmentStore};
use crate::Result;

/// The non-empty components of an absolute path, in order.
pub fn components(path: &str) -> Result<impl Iterator<Item = &str>> {
    if !path.starts_with('/') {
        return Err(FsError::InvalidName(path.into()));
    }
    Ok(path.split('/').filter(|c| !c.is_empty()))
}

/// Splits an absolute path into its parent path and leaf name.
/// Consecutive slashes count as one separator; trailing slashes are
/// ignored. The root itself splits into ("/", "").
pub fn split(path: &str) -> Result<(&str, &str)> {
    if !path.starts_with('/') {
        return Err(FsError::InvalidName(path.into()));
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(("/", ""));
    }
    let Some(cut) = trimmed.rfind('/') else {
        return Err(FsError::InvalidName(path.into()));
    };
    let parent = trimmed[..cut].trim_end_matches('/');
    let parent = if parent.is_empty() { "/" } else { parent };
    Ok((parent, &trimmed[cut + 1..]))
}

/// Checks a name about to become a directory entry.
pub fn validate_leaf(name: &str) -> Result<()> {
    if name.is_empty()
        || name == DOT_NAME
        || name == DOTDOT_NAME
        || name.len() > MAX_NAME_LEN
        || name.contains('/')
    {
        return Err(FsError::InvalidName(name.into()));
    }
    Ok(())
}

/// Strict resolution: every component must exist, every intermediate must
/// be a directory. Returns the inode number of the final component.
pub fn resolve(store: &SegmentStore, path: &str) -> Result<u32> {
    let mut current = ROOT_INODE_ID;
    for component in components(path)? {
        let inode = read_inode(store, current)?;
        if !inode.is_directory() {
            return Err(FsError::NotADirectory(component.into()));
        }
        current = directory::lookup(store, &inode, component)?
            .ok_or_else(|| FsError::NotFound(path.into()))?;
    }
    Ok(current)
}

/// Resolves the parent of the path's leaf, creating missing intermediate
/// directories when `create` is set. The leaf itself is never created;
/// the caller receives the parent inode number and the leaf name.
pub fn resolve_parent<'p>(
    store: &SegmentStore,
    path: &'p str,
    create: bool,
) -> Result<(u32, &'p str)> {
    let (parent_path, leaf) = split(path)?;
    let mut current = ROOT_INODE_ID;
    for component in components(parent_path)? {
        let inode = read_inode(store, current)?;
        if !inode.is_directory() {
            return Err(FsError::NotADirectory(component.into()));
        }
        current = match directory::lookup(store, &inode, component)? {
            Some(next) => next,
            None if create => create_child_directory(store, current, component)?,
            None => return Err(FsError::NotFound(path.into())),
        };
    }
    Ok((current, leaf))
}

/// Allocates a directory inode with its "." / ".." block and links it into
/// the parent. On failure everything allocated here is released again.
fn create_child_directory(store: &SegmentStore, parent_number: u32, name: &str) -> Result<u32> {
    validate_leaf(name)?;
    let mut parent = read_inode(store, parent_number)?;
    let number = alloc_inode(store, FileType::Directory)?;
    let mut dir = Inode::empty(FileType::Directory);
    let seeded = directory::init_directory(store, number, &mut dir, parent_number).and_then(|_| {
        directory::add_entry(store, parent_number, &mut parent, name, number)
    });
    if let Err(e) = seeded {
        if let Ok(blocks) = bmap::collect_blocks(store, &dir) {
            for block in blocks {
                let _ = bitmap::free(store, SegmentKind::Data, block);
            }
        }
        let _ = free_inode(store, number);
        return Err(e);
    }
    debug!("created directory {name:?} as inode {number}");
    Ok(number)
}
