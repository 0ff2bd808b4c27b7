//! Dependency files handed to the engine and the baseline derived from them.

use std::path::Path;

use serde::{Deserialize, Serialize};

use lockstep_util::errors::LockstepError;

use crate::dependency_set::DependencySet;
use crate::lockfile::LOCKFILE;
use crate::manifest::MANIFEST_FILE;

/// One manifest or lockfile, addressed by its path relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyFile {
    pub name: String,
    pub content: String,
}

impl DependencyFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Final path component of [`Self::name`].
    pub fn file_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// Directory part of [`Self::name`], `""` at the root.
    pub fn directory(&self) -> &str {
        self.name.rsplit_once('/').map(|(d, _)| d).unwrap_or("")
    }
}

/// Turns ecosystem files into a [`DependencySet`].
pub trait FileParser {
    fn parse(&self, files: &[DependencyFile]) -> Result<DependencySet, LockstepError>;

    /// File names this parser reads, used when loading files from disk.
    fn file_names(&self) -> &[&str];
}

/// Read-only view of the project files plus the baseline dependency set,
/// computed once per invocation.
#[derive(Debug, Clone)]
pub struct DependencyFiles {
    files: Vec<DependencyFile>,
    baseline: DependencySet,
}

impl DependencyFiles {
    pub fn new(files: Vec<DependencyFile>, baseline: DependencySet) -> Self {
        Self { files, baseline }
    }

    /// Parse `files` once and keep the result as the baseline.
    pub fn parse(
        files: Vec<DependencyFile>,
        parser: &dyn FileParser,
    ) -> Result<Self, LockstepError> {
        let baseline = parser.parse(&files)?;
        tracing::debug!(
            "parsed {} dependencies from {} files",
            baseline.len(),
            files.len()
        );
        Ok(Self::new(files, baseline))
    }

    /// Load every file the parser understands below `root`.
    pub fn load(root: &Path, parser: &dyn FileParser) -> Result<Self, LockstepError> {
        let mut files = Vec::new();
        for rel in lockstep_util::fs::collect_named_files(root, parser.file_names())? {
            let content = std::fs::read_to_string(root.join(&rel))?;
            let name = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            if name != LOCKFILE && name.ends_with(&format!("/{LOCKFILE}")) {
                tracing::debug!("ignoring nested lockfile {name}");
                continue;
            }
            files.push(DependencyFile::new(name, content));
        }
        if files.is_empty() {
            return Err(LockstepError::Manifest {
                message: format!("No dependency files found in {}", root.display()),
            });
        }
        Self::parse(files, parser)
    }

    pub fn files(&self) -> &[DependencyFile] {
        &self.files
    }

    pub fn get(&self, name: &str) -> Option<&DependencyFile> {
        self.files.iter().find(|f| f.name == name)
    }

    /// Every `Lockstep.toml`, root first.
    pub fn manifests(&self) -> Vec<&DependencyFile> {
        let mut manifests: Vec<&DependencyFile> = self
            .files
            .iter()
            .filter(|f| f.file_name() == MANIFEST_FILE)
            .collect();
        manifests.sort_by(|a, b| manifest_order(a).cmp(&manifest_order(b)));
        manifests
    }

    pub fn lockfile(&self) -> Option<&DependencyFile> {
        self.get(LOCKFILE)
    }

    pub fn baseline(&self) -> &DependencySet {
        &self.baseline
    }

    /// Every name pinned by the lockfile.
    pub fn locked_names(&self) -> Vec<String> {
        self.baseline.locked_names()
    }

    /// Names declared in a manifest, never in the lockfile alone.
    pub fn top_level_names(&self) -> Vec<String> {
        self.baseline.top_level_names()
    }
}

/// Sort key placing the root manifest before nested ones.
pub(crate) fn manifest_order(file: &DependencyFile) -> (usize, &str) {
    (file.name.matches('/').count(), file.name.as_str())
}
