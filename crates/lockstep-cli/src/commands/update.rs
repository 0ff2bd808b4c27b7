//! Handler for `lockstep update`.

use std::path::PathBuf;

use miette::{IntoDiagnostic, Result};

use lockstep_core::config::UpdateStrategy;
use lockstep_core::dependency::DependencyChange;
use lockstep_ops::ops_update::{self, UpdateOptions};
use lockstep_util::progress;

pub struct Args {
    pub name: String,
    pub version: String,
    pub path: Option<PathBuf>,
    pub strategy: Option<UpdateStrategy>,
    pub single: bool,
    pub json: bool,
    pub helper: Option<String>,
    pub helper_args: Vec<String>,
}

pub fn exec(args: Args) -> Result<()> {
    let project_root = super::locate_project(args.path.as_deref())?;

    let opts = UpdateOptions {
        name: args.name,
        version: args.version,
        strategy: args.strategy,
        single: args.single,
        helper: args.helper,
        helper_args: args.helper_args,
    };
    let report = ops_update::update(&project_root, &opts)?;

    if args.json {
        let out = serde_json::to_string_pretty(&report.changes).into_diagnostic()?;
        println!("{out}");
        return Ok(());
    }

    for change in &report.changes {
        print_change(change);
    }
    progress::status(
        "Resolved",
        &format!(
            "{} change{} after {} resolver attempt{}",
            report.changes.len(),
            plural(report.changes.len()),
            report.attempts,
            plural(report.attempts)
        ),
    );
    Ok(())
}

fn print_change(change: &DependencyChange) {
    println!("{change}");
    for (before, after) in change
        .previous_requirements
        .iter()
        .zip(&change.updated_requirements)
    {
        if before.constraint != after.constraint {
            println!(
                "    {}: {:?} -> {:?}",
                after.source_file, before.constraint, after.constraint
            );
        }
    }
    for skipped in &change.skipped_requirements {
        progress::status_warn(
            "Skipped",
            &format!(
                "{} in {}: {}",
                skipped.constraint, skipped.source_file, skipped.reason
            ),
        );
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
