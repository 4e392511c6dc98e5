mod cli;

use std::error::Error;
use std::fs::File;
use std::io;
use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, Command};
use exfs2::FileSystem;

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut fs = FileSystem::open(&cli.store_dir)?;
    let stdout = io::stdout();
    match cli.command {
        Command::List { path } => fs.list(&path, &mut stdout.lock())?,
        Command::Add { path, source } => {
            let mut host_file = File::open(&source)?;
            fs.add(&path, &mut host_file)?;
        }
        Command::Extract { path } => {
            fs.extract(&path, &mut stdout.lock())?;
        }
        Command::Remove { path } => fs.remove(&path)?,
        Command::Debug { path } => fs.debug(&path, &mut stdout.lock())?,
    }
    Ok(())
}
