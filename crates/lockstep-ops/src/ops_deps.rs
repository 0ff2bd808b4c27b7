//! Operation: read the project's baseline dependency set.

use std::path::Path;

use lockstep_core::dependency_set::DependencySet;
use lockstep_core::files::DependencyFiles;
use lockstep_core::parser::LockstepParser;

/// Parse every manifest and the lockfile under `project_root`.
pub fn deps(project_root: &Path) -> miette::Result<DependencySet> {
    let files = DependencyFiles::load(project_root, &LockstepParser)?;
    tracing::debug!(
        "read {} files, {} dependencies",
        files.files().len(),
        files.baseline().len()
    );
    Ok(files.baseline().clone())
}
