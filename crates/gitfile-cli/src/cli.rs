use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "gitfile",
    about = "Manage individual files in a git-style repository, one commit per change",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Remote repository directory (falls back to GIT_REPOSITORY_URL)
    #[arg(long, global = true)]
    pub repository_url: Option<String>,

    #[arg(long, global = true)]
    pub branch: Option<String>,

    /// Directory for the local clone (in memory when omitted)
    #[arg(long, global = true)]
    pub work_dir: Option<PathBuf>,

    #[arg(long, global = true)]
    pub author_name: Option<String>,

    #[arg(long, global = true)]
    pub author_email: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create an empty repository directory
    Init(InitArgs),
    /// Write a file, commit it, and publish the commit
    Write(WriteArgs),
    /// Print a file from the branch head
    Read(PathArgs),
    /// Delete a file, commit it, and publish the commit
    Delete(PathArgs),
    /// Show commit history
    Log(LogArgs),
    /// Publish local commits that have not reached the remote
    Push,
}

#[derive(Args)]
pub struct InitArgs {
    /// Directory to initialize
    pub path: PathBuf,
}

#[derive(Args)]
pub struct WriteArgs {
    /// Repository-relative path, e.g. `docs/readme.md`
    pub path: String,
    /// File contents
    #[arg(long, conflicts_with = "from_file", required_unless_present = "from_file")]
    pub contents: Option<String>,
    /// Read contents from a local file
    #[arg(long = "from-file")]
    pub from_file: Option<PathBuf>,
}

#[derive(Args)]
pub struct PathArgs {
    /// Repository-relative path
    pub path: String,
}

#[derive(Args)]
pub struct LogArgs {
    /// Maximum number of commits to show
    #[arg(short = 'n', long, default_value_t = 10)]
    pub limit: usize,
    #[arg(long)]
    pub oneline: bool,
}
