//! Common utilities for tests
#![allow(unused)]

use std::io::Cursor;

use exfs2::*;
use tempfile::TempDir;

pub const ORANGE: &str = "\x1b[38;5;214m";
pub const RESET: &str = "\x1b[0m";

/// Colored progress line, e.g. log!("added {} bytes", n).
#[macro_export]
macro_rules! log {
    ($($arg:tt)*) => {
        println!("{}[test] {}{}", crate::common::ORANGE, format!($($arg)*), crate::common::RESET)
    };
}

/// A store in a throwaway directory. The directory lives as long as the
/// fixture, so segment files survive across reopen().
pub struct Fixture {
    pub dir: TempDir,
    pub fs: FileSystem,
}

pub fn open_store() -> Fixture {
    let dir = TempDir::new().unwrap();
    let fs = FileSystem::open(dir.path()).unwrap();
    Fixture { dir, fs }
}

impl Fixture {
    /// Reopens the store over the same segment files, as a fresh process
    /// invocation would.
    pub fn reopen(&mut self) {
        self.fs = FileSystem::open(self.dir.path()).unwrap();
    }
}

pub fn add_bytes(fs: &mut FileSystem, path: &str, bytes: &[u8]) -> Result<()> {
    fs.add(path, &mut Cursor::new(bytes))
}

pub fn extract_to_vec(fs: &FileSystem, path: &str) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    fs.extract(path, &mut out)?;
    Ok(out)
}

pub fn list_to_string(fs: &FileSystem, path: &str) -> Result<String> {
    let mut out = Vec::new();
    fs.list(path, &mut out)?;
    Ok(String::from_utf8(out).unwrap())
}
