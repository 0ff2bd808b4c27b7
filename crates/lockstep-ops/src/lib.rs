pub mod ops_deps;
pub mod ops_update;

use std::path::{Path, PathBuf};

use lockstep_core::manifest::MANIFEST_FILE;
use lockstep_util::errors::LockstepError;

/// Walk up from `start` to the directory holding the root manifest.
pub fn project_root(start: &Path) -> Result<PathBuf, LockstepError> {
    lockstep_util::fs::find_ancestor_with(start, MANIFEST_FILE).ok_or_else(|| {
        LockstepError::Manifest {
            message: format!(
                "could not find {MANIFEST_FILE} in {} or any parent directory",
                start.display()
            ),
        }
    })
}
