use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Segmented, inode-based userspace file store.
#[derive(Parser)]
pub struct Cli {
    /// Directory holding the segment files
    #[arg(long, short = 'd', default_value = ".")]
    pub store_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Recursively list a directory, or print a file's bare name
    List { path: String },
    /// Ingest a host file at the given store path
    Add { path: String, source: PathBuf },
    /// Write a file's bytes to stdout
    Extract { path: String },
    /// Delete a file or a whole subtree
    Remove { path: String },
    /// Show inode details for every component of the path
    Debug { path: String },
}
