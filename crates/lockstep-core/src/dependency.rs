use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Branch assumed for git sources that do not name one.
pub const DEFAULT_GIT_BRANCH: &str = "master";

/// Groups that mark a declaration as production.
const PRODUCTION_GROUPS: &[&str] = &["runtime", "default"];

/// Where a dependency is fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SourceDescriptor {
    DefaultRegistry,
    Git {
        url: String,
        branch: String,
        #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
        reference: Option<String>,
    },
    Path {
        path: String,
    },
    PrivateRegistry {
        url: String,
    },
}

impl SourceDescriptor {
    /// A git source, defaulting the branch when none is given.
    pub fn git(url: impl Into<String>, branch: Option<String>, reference: Option<String>) -> Self {
        Self::Git {
            url: url.into(),
            branch: branch.unwrap_or_else(|| DEFAULT_GIT_BRANCH.to_string()),
            reference,
        }
    }

    pub fn is_git(&self) -> bool {
        matches!(self, Self::Git { .. })
    }

    pub fn is_path(&self) -> bool {
        matches!(self, Self::Path { .. })
    }
}

/// One declaration of a dependency in one manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub source_file: String,
    /// Ecosystem constraint expression, kept verbatim.
    pub constraint: String,
    #[serde(default)]
    pub groups: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceDescriptor>,
}

impl Requirement {
    pub fn new(source_file: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            constraint: constraint.into(),
            groups: BTreeSet::new(),
            source: None,
        }
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.extend(groups.into_iter().map(Into::into));
        self
    }

    pub fn with_source(mut self, source: SourceDescriptor) -> Self {
        self.source = Some(source);
        self
    }

    /// Whether the declared groups mark this requirement as production.
    ///
    /// Ungrouped declarations count as production.
    pub fn is_production(&self) -> bool {
        self.groups.is_empty()
            || self.groups.iter().any(|g| {
                PRODUCTION_GROUPS.contains(&g.as_str()) || g.contains("prod")
            })
    }
}

/// A dependency as seen across every manifest and the lockfile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    /// Locked version, or a git revision for git-sourced entries.
    #[serde(default)]
    pub resolved_version: Option<String>,
    #[serde(default)]
    pub previous_version: Option<String>,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    #[serde(default)]
    pub previous_requirements: Vec<Requirement>,
    /// Set by production classification over the sub-dependency graph.
    #[serde(default)]
    pub production: bool,
}

impl Dependency {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resolved_version: None,
            previous_version: None,
            requirements: Vec::new(),
            previous_requirements: Vec::new(),
            production: false,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.resolved_version = Some(version.into());
        self
    }

    pub fn with_requirement(mut self, requirement: Requirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    /// Declared with an explicit constraint in some manifest.
    pub fn top_level(&self) -> bool {
        self.requirements
            .iter()
            .any(|r| !r.constraint.trim().is_empty())
    }

    /// Production according to this dependency's own declarations only.
    pub fn declared_production(&self) -> bool {
        !self.requirements.is_empty() && self.requirements.iter().any(Requirement::is_production)
    }

    /// First source declared by any requirement.
    pub fn source(&self) -> Option<&SourceDescriptor> {
        self.requirements.iter().find_map(|r| r.source.as_ref())
    }
}

/// A requirement left untouched because it could not be rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRequirement {
    pub source_file: String,
    pub constraint: String,
    pub reason: String,
}

/// One dependency whose version moves as part of an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyChange {
    pub name: String,
    pub previous_version: Option<String>,
    pub new_version: String,
    pub previous_requirements: Vec<Requirement>,
    pub updated_requirements: Vec<Requirement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_requirements: Vec<SkippedRequirement>,
}

impl DependencyChange {
    /// Whether any manifest text needs editing for this change.
    pub fn requirements_changed(&self) -> bool {
        self.previous_requirements != self.updated_requirements
    }
}

impl fmt::Display for DependencyChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {}",
            self.name,
            self.previous_version.as_deref().unwrap_or("(none)"),
            self.new_version
        )
    }
}
