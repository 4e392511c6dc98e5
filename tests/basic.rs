#![allow(unused)]

mod common;

use std::io::Cursor;

use common::{add_bytes, extract_to_vec, list_to_string, open_store};
use exfs2::*;

#[test]
fn test_fresh_store() {
    let fx = open_store();
    assert!(fx.fs.store().segment_exists(SegmentKind::Inode, 0));
    assert!(fx.fs.store().segment_exists(SegmentKind::Data, 0));

    let root = read_inode(fx.fs.store(), ROOT_INODE_ID).unwrap();
    assert_eq!(root.ftype, FileType::Directory);
    // "." and ".."
    assert_eq!(root.size, 2 * DIR_ENTRY_SIZE as u64);
    assert_eq!(root.direct[0], ROOT_DIR_BLOCK);

    let listing = list_to_string(&fx.fs, "/").unwrap();
    assert_eq!(listing, "", "a fresh root lists nothing but its self-entries");
}

#[test]
fn test_hello_world_round_trip() {
    let mut fx = open_store();
    let data = b"hello, world!";
    add_bytes(&mut fx.fs, "/docs/readme", data).unwrap();

    // Both intermediate directories were created on the way.
    let docs = resolve(fx.fs.store(), "/docs").unwrap();
    let docs_inode = read_inode(fx.fs.store(), docs).unwrap();
    assert_eq!(docs_inode.ftype, FileType::Directory);

    let readme = resolve(fx.fs.store(), "/docs/readme").unwrap();
    let readme_inode = read_inode(fx.fs.store(), readme).unwrap();
    assert_eq!(readme_inode.ftype, FileType::Regular);
    assert_eq!(readme_inode.size, data.len() as u64);

    assert_eq!(extract_to_vec(&fx.fs, "/docs/readme").unwrap(), data);
    log!("round-tripped {} bytes through /docs/readme", data.len());
}

#[test]
fn test_add_duplicate_fails() {
    let mut fx = open_store();
    add_bytes(&mut fx.fs, "/a", b"first").unwrap();
    let err = add_bytes(&mut fx.fs, "/a", b"second").unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(_)), "got {err:?}");
    // The failed call left the original untouched.
    assert_eq!(extract_to_vec(&fx.fs, "/a").unwrap(), b"first");
}

#[test]
fn test_empty_file() {
    let mut fx = open_store();
    add_bytes(&mut fx.fs, "/empty", b"").unwrap();
    let number = resolve(fx.fs.store(), "/empty").unwrap();
    let inode = read_inode(fx.fs.store(), number).unwrap();
    assert_eq!(inode.size, 0);
    assert_eq!(inode.direct[0], NULL_BLOCK, "no block for zero bytes");
    assert_eq!(extract_to_vec(&fx.fs, "/empty").unwrap(), b"");
}

#[test]
fn test_exactly_one_block() {
    let mut fx = open_store();
    let data = vec![0xA5u8; BLOCK_SIZE];
    add_bytes(&mut fx.fs, "/one_block", &data).unwrap();
    let number = resolve(fx.fs.store(), "/one_block").unwrap();
    let inode = read_inode(fx.fs.store(), number).unwrap();
    assert_eq!(inode.size, BLOCK_SIZE as u64);
    assert_ne!(inode.direct[0], NULL_BLOCK);
    assert_eq!(inode.direct[1], NULL_BLOCK, "one block holds it exactly");
    assert_eq!(extract_to_vec(&fx.fs, "/one_block").unwrap(), data);
}

#[test]
fn test_remove_then_readd_reuses_slots() {
    let mut fx = open_store();
    add_bytes(&mut fx.fs, "/a", b"payload").unwrap();
    let number = resolve(fx.fs.store(), "/a").unwrap();
    let first_block = read_inode(fx.fs.store(), number).unwrap().direct[0];

    fx.fs.remove("/a").unwrap();
    assert!(!is_allocated(fx.fs.store(), SegmentKind::Inode, number).unwrap());
    assert!(!is_allocated(fx.fs.store(), SegmentKind::Data, first_block).unwrap());

    // Dense, deterministic allocation hands the same slots back.
    add_bytes(&mut fx.fs, "/b", b"payload").unwrap();
    let number2 = resolve(fx.fs.store(), "/b").unwrap();
    assert_eq!(number2, number);
    assert_eq!(read_inode(fx.fs.store(), number2).unwrap().direct[0], first_block);
}

#[test]
fn test_remove_subtree_leaves_intermediate() {
    let mut fx = open_store();
    add_bytes(&mut fx.fs, "/x/y", b"zzz").unwrap();
    fx.fs.remove("/x/y").unwrap();

    // /x stays behind, now empty. The choice is stable across reopen.
    let listing = list_to_string(&fx.fs, "/").unwrap();
    assert_eq!(listing, "x/\n");
    fx.reopen();
    assert_eq!(list_to_string(&fx.fs, "/").unwrap(), "x/\n");
    assert!(matches!(
        extract_to_vec(&fx.fs, "/x/y").unwrap_err(),
        Error::NotFound(_)
    ));
}

#[test]
fn test_remove_whole_tree() {
    let mut fx = open_store();
    add_bytes(&mut fx.fs, "/tree/a/one", b"1").unwrap();
    add_bytes(&mut fx.fs, "/tree/a/two", b"2").unwrap();
    add_bytes(&mut fx.fs, "/tree/b/deep/three", b"3").unwrap();
    add_bytes(&mut fx.fs, "/keep", b"4").unwrap();

    fx.fs.remove("/tree").unwrap();
    assert_eq!(list_to_string(&fx.fs, "/").unwrap(), "keep\n");

    // Every slot of the removed subtree is reusable again: the next
    // allocations fill the gap left behind.
    add_bytes(&mut fx.fs, "/fresh", b"5").unwrap();
    let fresh = resolve(fx.fs.store(), "/fresh").unwrap();
    assert!(fresh < 8, "slots of the removed subtree were not reused");
}

#[test]
fn test_remove_root_refused() {
    let mut fx = open_store();
    assert!(matches!(fx.fs.remove("/").unwrap_err(), Error::InvalidName(_)));
    assert!(matches!(fx.fs.remove("///").unwrap_err(), Error::InvalidName(_)));
}

#[test]
fn test_self_entries_are_protected() {
    let mut fx = open_store();
    add_bytes(&mut fx.fs, "/dir/file", b"x").unwrap();
    assert!(matches!(fx.fs.remove("/dir/.").unwrap_err(), Error::InvalidName(_)));
    assert!(matches!(fx.fs.remove("/dir/..").unwrap_err(), Error::InvalidName(_)));
}

#[test]
fn test_dotdot_resolves_to_parent() {
    let mut fx = open_store();
    add_bytes(&mut fx.fs, "/x/y/file", b"x").unwrap();

    let x = resolve(fx.fs.store(), "/x").unwrap();
    assert_eq!(resolve(fx.fs.store(), "/x/y/..").unwrap(), x);
    assert_eq!(resolve(fx.fs.store(), "/x/.").unwrap(), x);
    // In the root, ".." loops back to the root itself.
    assert_eq!(resolve(fx.fs.store(), "/..").unwrap(), ROOT_INODE_ID);
    assert_eq!(resolve(fx.fs.store(), "/x/../..").unwrap(), ROOT_INODE_ID);
}

#[test]
fn test_list_regular_file_prints_name_alone() {
    let mut fx = open_store();
    add_bytes(&mut fx.fs, "/docs/readme", b"hi").unwrap();
    assert_eq!(list_to_string(&fx.fs, "/docs/readme").unwrap(), "readme\n");
}

#[test]
fn test_list_tree_shape() {
    let mut fx = open_store();
    add_bytes(&mut fx.fs, "/docs/readme", b"hi").unwrap();
    add_bytes(&mut fx.fs, "/docs/nested/note", b"hi").unwrap();
    add_bytes(&mut fx.fs, "/top", b"hi").unwrap();

    let listing = list_to_string(&fx.fs, "/").unwrap();
    assert_eq!(listing, "docs/\n  readme\n  nested/\n    note\ntop\n");
}

#[test]
fn test_wrong_type_errors() {
    let mut fx = open_store();
    add_bytes(&mut fx.fs, "/file", b"x").unwrap();

    assert!(matches!(
        fx.fs.extract("/", &mut Vec::new()).unwrap_err(),
        Error::IsADirectory(_)
    ));
    assert!(matches!(
        extract_to_vec(&fx.fs, "/missing").unwrap_err(),
        Error::NotFound(_)
    ));
    // A regular file cannot be walked through.
    assert!(matches!(
        add_bytes(&mut fx.fs, "/file/under", b"x").unwrap_err(),
        Error::NotADirectory(_)
    ));
    assert!(matches!(
        extract_to_vec(&fx.fs, "/file/under").unwrap_err(),
        Error::NotADirectory(_)
    ));
}

#[test]
fn test_invalid_target_names() {
    let mut fx = open_store();
    let long = format!("/{}", "n".repeat(256));
    assert!(matches!(
        add_bytes(&mut fx.fs, &long, b"x").unwrap_err(),
        Error::InvalidName(_)
    ));
    assert!(matches!(
        add_bytes(&mut fx.fs, "/dir/.", b"x").unwrap_err(),
        Error::InvalidName(_)
    ));
    assert!(matches!(
        add_bytes(&mut fx.fs, "relative", b"x").unwrap_err(),
        Error::InvalidName(_)
    ));
}

#[test]
fn test_directory_spills_into_second_block() {
    let mut fx = open_store();
    // "." and ".." occupy two slots, so this overflows the first block.
    let count = ENTRIES_PER_BLOCK;
    for i in 0..count {
        add_bytes(&mut fx.fs, &format!("/dir/f{i:02}"), b"x").unwrap();
    }
    let dir = resolve(fx.fs.store(), "/dir").unwrap();
    let dir_inode = read_inode(fx.fs.store(), dir).unwrap();
    assert_eq!(dir_inode.size, ((count + 2) * DIR_ENTRY_SIZE) as u64);
    assert_ne!(dir_inode.direct[1], NULL_BLOCK, "second directory block");

    let listing = list_to_string(&fx.fs, "/dir").unwrap();
    for i in 0..count {
        assert_eq!(listing.matches(&format!("f{i:02}")).count(), 1);
    }
}

#[test]
fn test_freed_entry_slot_is_reused_in_place() {
    let mut fx = open_store();
    for name in ["/d/a", "/d/b", "/d/c"] {
        add_bytes(&mut fx.fs, name, b"x").unwrap();
    }
    let dir = resolve(fx.fs.store(), "/d").unwrap();
    let before = read_inode(fx.fs.store(), dir).unwrap();

    fx.fs.remove("/d/b").unwrap();
    add_bytes(&mut fx.fs, "/d/b2", b"x").unwrap();

    let after = read_inode(fx.fs.store(), dir).unwrap();
    assert_eq!(after.size, before.size, "slot was reused, not appended");
    let listing = list_to_string(&fx.fs, "/d").unwrap();
    assert_eq!(listing, "a\nb2\nc\n");
}

#[test]
fn test_debug_walk() {
    let mut fx = open_store();
    add_bytes(&mut fx.fs, "/docs/readme", b"hello").unwrap();

    let mut out = Vec::new();
    fx.fs.debug("/docs/readme", &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    log!("debug output:\n{text}");
    assert!(text.contains("/ [inode 0]"));
    assert!(text.contains("docs [inode"));
    assert!(text.contains("readme [inode"));
    assert!(text.contains("type: regular"));
    assert!(text.contains("size: 5 bytes"));

    // Debugging a missing path reports the failure without mutating.
    assert!(fx.fs.debug("/docs/nope", &mut Vec::new()).is_err());
}
