use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "pnet",
    about = "Persistence network: route dotted keys to backing stores",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Filter definition file
    #[arg(long, global = true)]
    pub filter: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Base directory for file stores (overrides the config)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compile the filter and list its rules by specificity
    Check,
    /// Show the best and all connections for a key
    Route(KeyArgs),
    /// Read a value
    Get(KeyArgs),
    /// Write a value
    Set(SetArgs),
    /// Remove a value
    Rm(KeyArgs),
    /// List every stored pair under a prefix
    Namespace(NamespaceArgs),
}

#[derive(Args)]
pub struct KeyArgs {
    /// Dotted key, e.g. players.alice.score
    pub key: String,
}

#[derive(Args)]
pub struct SetArgs {
    pub key: String,
    pub value: String,
}

#[derive(Args)]
pub struct NamespaceArgs {
    /// Dotted key prefix
    pub prefix: String,
}
