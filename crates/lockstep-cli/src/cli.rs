//! CLI argument definitions for lockstep.
//!
//! Uses `clap` derive macros. Each command corresponds to a handler in the
//! [`super::commands`] module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use lockstep_core::config::UpdateStrategy;

#[derive(Parser, Debug)]
#[command(
    name = "lockstep",
    version,
    about = "Update one dependency and everything that has to move with it",
    long_about = "lockstep pins a dependency to a new version, asks a resolver helper to solve \
                  the project, and unlocks exactly the transitive dependencies the solver \
                  blames until the update fits or no safe progress remains."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Move a dependency to a new version
    Update {
        /// Dependency name
        name: String,
        /// Version to move it to
        version: String,
        /// Project directory (defaults to the current directory)
        #[arg(long)]
        path: Option<PathBuf>,
        /// Requirement rewrite strategy: bump-minimum, pin-exact, widen-range, leave-as-is
        #[arg(long)]
        strategy: Option<UpdateStrategy>,
        /// Fail on any version conflict instead of unlocking more dependencies
        #[arg(long)]
        single: bool,
        /// Print changes as JSON
        #[arg(long)]
        json: bool,
        /// Resolver helper command (overrides [resolver] command)
        #[arg(long, env = "LOCKSTEP_HELPER")]
        helper: Option<String>,
        /// Extra argument for the helper command (repeatable)
        #[arg(long = "helper-arg", allow_hyphen_values = true)]
        helper_args: Vec<String>,
    },

    /// List the project's dependencies as read from its manifests and lockfile
    Deps {
        /// Project directory (defaults to the current directory)
        #[arg(long)]
        path: Option<PathBuf>,
        /// Print dependencies as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}
