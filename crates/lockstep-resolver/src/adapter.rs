//! The boundary between the engine and an ecosystem's native solver.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use lockstep_core::files::{DependencyFile, DependencyFiles};
use lockstep_util::errors::LockstepError;

use crate::conflict::Conflict;

/// How one dependency's constraint is replaced for a single resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequirementOverride {
    /// Force exactly this version. `strip_git_source` drops any git pin.
    Exact {
        version: String,
        strip_git_source: bool,
    },
    /// Free to move, but never below the currently locked version.
    AtLeast { version: String },
}

/// The forced pin for the update target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinnedOverride {
    pub name: String,
    pub version: String,
    pub strip_git_source: bool,
}

/// Caller-owned description of one solver run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionRequest {
    pub files: Vec<DependencyFile>,
    /// Names the solver may re-version, in unlock order.
    pub unlock: Vec<String>,
    pub overrides: BTreeMap<String, RequirementOverride>,
}

/// A dependency with the concrete version the solver picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDependency {
    pub name: String,
    pub version: String,
}

impl ResolvedDependency {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Every outcome a solver run can have.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolutionResult {
    Success {
        dependencies: Vec<ResolvedDependency>,
    },
    /// A locked version no longer exists upstream.
    MissingPinnedVersion { name: String, message: String },
    VersionConflict {
        conflicts: Vec<Conflict>,
        message: String,
    },
    /// Network trouble and the like; worth one retry.
    Transient { message: String },
    Fatal { message: String },
}

/// Wraps one ecosystem's native solver.
///
/// Implementations must classify every failure into a [`ResolutionResult`]
/// variant and must not mutate caller-owned data.
pub trait ResolverAdapter {
    /// Build the request for one attempt.
    ///
    /// The pinned target gets an [`RequirementOverride::Exact`]; every other
    /// unlocked name with a locked version may move up but not down.
    fn build(
        &self,
        files: &DependencyFiles,
        unlock: &[String],
        pin: &PinnedOverride,
    ) -> Result<ResolutionRequest, LockstepError> {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            pin.name.clone(),
            RequirementOverride::Exact {
                version: pin.version.clone(),
                strip_git_source: pin.strip_git_source,
            },
        );
        for name in unlock.iter().filter(|n| **n != pin.name) {
            if let Some(version) = files
                .baseline()
                .get(name)
                .and_then(|d| d.resolved_version.clone())
            {
                overrides.insert(name.clone(), RequirementOverride::AtLeast { version });
            }
        }
        Ok(ResolutionRequest {
            files: files.files().to_vec(),
            unlock: unlock.to_vec(),
            overrides,
        })
    }

    fn resolve(&self, request: &ResolutionRequest) -> ResolutionResult;
}
