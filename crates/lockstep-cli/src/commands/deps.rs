//! Handler for `lockstep deps`.

use std::path::Path;

use console::Style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use lockstep_core::dependency::Dependency;
use lockstep_ops::ops_deps;
use lockstep_util::progress;

#[derive(Serialize)]
struct DepRow<'a> {
    name: &'a str,
    version: Option<&'a str>,
    top_level: bool,
    production: bool,
    requirements: Vec<&'a str>,
}

impl<'a> From<&'a Dependency> for DepRow<'a> {
    fn from(dep: &'a Dependency) -> Self {
        Self {
            name: &dep.name,
            version: dep.resolved_version.as_deref(),
            top_level: dep.top_level(),
            production: dep.production,
            requirements: dep
                .requirements
                .iter()
                .map(|r| r.constraint.as_str())
                .collect(),
        }
    }
}

pub fn exec(path: Option<&Path>, json: bool) -> Result<()> {
    let project_root = super::locate_project(path)?;
    let set = ops_deps::deps(&project_root)?;
    let rows: Vec<DepRow<'_>> = set.all().iter().map(DepRow::from).collect();

    if json {
        let out = serde_json::to_string_pretty(&rows).into_diagnostic()?;
        println!("{out}");
        return Ok(());
    }

    let dim = Style::new().dim();
    for row in &rows {
        let mut flags = Vec::new();
        if row.top_level {
            flags.push("top-level");
        }
        if !row.production {
            flags.push("dev");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" {}", dim.apply_to(format!("({})", flags.join(", "))))
        };
        println!(
            "{} {}{flags}",
            row.name,
            row.version.unwrap_or("(unlocked)"),
        );
    }
    progress::status_info(
        "Found",
        &format!(
            "{} dependencies, {} top-level",
            rows.len(),
            rows.iter().filter(|r| r.top_level).count()
        ),
    );
    Ok(())
}
