use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Top-level CLI entry point for the resource manager.
#[derive(Parser, Debug)]
#[command(
    name = "rsm",
    about = "Declarative manager for game-server resource trees",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone)]
pub struct GlobalOpts {
    /// Override the project root directory
    #[arg(long, global = true, env = "RSM_ROOT")]
    pub root: Option<PathBuf>,

    /// Definition file, relative to the project root
    #[arg(long, global = true)]
    pub definition: Option<PathBuf>,

    /// Resources directory, relative to the project root
    #[arg(long, global = true)]
    pub resources: Option<PathBuf>,

    /// Disable parallel installation and pruning (parallel is enabled by default)
    #[arg(long = "no-parallel", global = true, action = clap::ArgAction::SetFalse)]
    pub parallel: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an empty resource definition
    Init(InitOpts),
    /// Install declared resources, or declare and install one reference
    Install(InstallOpts),
    /// Undeclare a resource and remove it from disk
    Remove(RemoveOpts),
    /// Print version information
    Version,
}

/// Options for the `init` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct InitOpts {
    /// Replace an existing definition file
    #[arg(short, long)]
    pub force: bool,
}

/// Options for the `install` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct InstallOpts {
    /// Git URL or tarball URL to declare before installing
    pub reference: Option<String>,

    /// Destination path below the resources directory (derived from the
    /// reference when omitted)
    #[arg(requires = "reference")]
    pub path: Option<String>,
}

/// Options for the `remove` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct RemoveOpts {
    /// Declared path of the resource to remove
    pub path: String,
}
