// src/cli.rs

use clap::Parser;
use std::path::PathBuf;

/// shellpick: resolve a declared shell-command input to a value.
///
/// Loads invocation records from one or more scope files, executes the
/// record named by ID (or taskId), and prints the resolved value on
/// stdout. Scope files are TOML or JSON; their order is priority order,
/// with records from later files overriding earlier ones.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Id or taskId of the invocation record to execute.
    pub input: String,

    /// Configuration scope files (TOML or JSON), lowest priority first.
    #[arg(short, long = "scope", value_name = "FILE", required = true)]
    pub scopes: Vec<PathBuf>,

    /// Workspace folders, in index order. Defaults to the current directory.
    #[arg(short = 'w', long = "folder", value_name = "DIR")]
    pub folders: Vec<PathBuf>,

    /// Persistent state file for remembered selections and prompt values.
    #[arg(long, value_name = "FILE")]
    pub state_file: Option<PathBuf>,
}
