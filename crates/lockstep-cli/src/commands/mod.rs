//! Command dispatch and handler modules.

mod deps;
mod update;

use std::path::{Path, PathBuf};

use miette::Result;

use lockstep_util::errors::LockstepError;

use crate::cli::{Cli, Command};

/// Route a parsed CLI invocation to the appropriate command handler.
pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Update {
            name,
            version,
            path,
            strategy,
            single,
            json,
            helper,
            helper_args,
        } => update::exec(update::Args {
            name,
            version,
            path,
            strategy,
            single,
            json,
            helper,
            helper_args,
        }),
        Command::Deps { path, json } => deps::exec(path.as_deref(), json),
    }
}

/// The project root at or above `path`, or the current directory.
fn locate_project(path: Option<&Path>) -> Result<PathBuf> {
    let start = match path {
        Some(p) => p.to_path_buf(),
        None => std::env::current_dir().map_err(LockstepError::Io)?,
    };
    Ok(lockstep_ops::project_root(&start)?)
}
