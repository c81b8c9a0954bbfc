use std::path::PathBuf;

use chainkv_store::Backend;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "chainkv",
    about = "chainkv: tamper-evident block ledger over an ordered key-value store",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML config file (defaults to ./chainkv.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Data directory, overrides `store.path`
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Storage backend, overrides `store.backend`
    #[arg(long, global = true)]
    pub backend: Option<Backend>,

    /// Debug-level logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the genesis block if the ledger is empty
    Init,
    /// Append a block with the given body
    Add(AddArgs),
    /// Print the current height
    Height,
    /// Show the block at a height
    Show(HeightArgs),
    /// Check one block's hash
    VerifyBlock(HeightArgs),
    /// Validate the whole chain
    Verify,
    /// Print the chain
    Log(LogArgs),
    /// Overwrite a block's body without re-hashing
    #[cfg(feature = "fault-injection")]
    Tamper(TamperArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    pub body: String,
}

#[derive(Args, Debug)]
pub struct HeightArgs {
    pub height: u64,
}

#[derive(Args, Debug)]
pub struct LogArgs {
    /// Only the last N blocks
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
    #[arg(long)]
    pub oneline: bool,
}

#[cfg(feature = "fault-injection")]
#[derive(Args, Debug)]
pub struct TamperArgs {
    pub height: u64,
    pub body: String,
}
