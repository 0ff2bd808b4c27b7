use serde::Deserialize;

use lockstep_util::errors::LockstepError;

use crate::dependency::SourceDescriptor;

/// File name of the lockfile at the project root.
pub const LOCKFILE: &str = "Lockstep.lock";

/// Deterministic lockfile recording exact resolved dependency versions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Lockfile {
    #[serde(default)]
    pub package: Vec<LockedPackage>,
}

/// A single locked dependency.
#[derive(Debug, Clone, Deserialize)]
pub struct LockedPackage {
    pub name: String,
    pub version: String,
    /// `registry`, `registry+URL`, `git+URL?branch=B#REV` or `path+DIR`.
    #[serde(default)]
    pub source: Option<String>,
    /// Git revision; overrides the fragment of a `git+` source.
    #[serde(default)]
    pub rev: Option<String>,
    /// Names of direct sub-dependencies.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl LockedPackage {
    pub fn source_descriptor(&self) -> Option<SourceDescriptor> {
        self.source.as_deref().and_then(parse_source)
    }

    /// The version callers compare against: the revision for git packages.
    pub fn resolved_version(&self) -> String {
        if let Some(SourceDescriptor::Git { reference, .. }) = self.source_descriptor() {
            if let Some(rev) = self.rev.clone().or(reference) {
                return rev;
            }
        }
        self.version.clone()
    }

    pub fn is_path(&self) -> bool {
        self.source_descriptor()
            .is_some_and(|s| s.is_path())
    }
}

impl Lockfile {
    pub fn parse_toml(content: &str) -> Result<Self, LockstepError> {
        toml::from_str(content).map_err(|e| LockstepError::Manifest {
            message: format!("Failed to parse lockfile: {e}"),
        })
    }

    pub fn package(&self, name: &str) -> Option<&LockedPackage> {
        self.package.iter().find(|p| p.name == name)
    }
}

/// Parse a lockfile source string.
///
/// A bare `registry` (the default public registry) yields
/// [`SourceDescriptor::DefaultRegistry`]; unknown schemes yield `None`.
pub fn parse_source(source: &str) -> Option<SourceDescriptor> {
    let source = source.trim();
    if source == "registry" {
        return Some(SourceDescriptor::DefaultRegistry);
    }
    let (scheme, rest) = source.split_once('+')?;
    match scheme {
        "registry" => Some(SourceDescriptor::PrivateRegistry {
            url: rest.to_string(),
        }),
        "path" => Some(SourceDescriptor::Path {
            path: rest.to_string(),
        }),
        "git" => {
            let (rest, reference) = match rest.split_once('#') {
                Some((r, f)) => (r, Some(f.to_string())),
                None => (rest, None),
            };
            let (url, branch) = match rest.split_once('?') {
                Some((u, query)) => {
                    let branch = query
                        .split('&')
                        .find_map(|kv| kv.strip_prefix("branch="))
                        .map(str::to_string);
                    (u, branch)
                }
                None => (rest, None),
            };
            Some(SourceDescriptor::git(url, branch, reference))
        }
        _ => None,
    }
}
