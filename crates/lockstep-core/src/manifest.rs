use serde::Deserialize;
use std::collections::BTreeMap;

use lockstep_util::errors::LockstepError;

/// File name of a manifest, at the project root or in a sub-directory.
pub const MANIFEST_FILE: &str = "Lockstep.toml";

/// Constraint recorded for declarations that do not give one.
pub const UNCONSTRAINED: &str = ">= 0";

/// The parsed representation of a `Lockstep.toml` file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub dependencies: BTreeMap<String, ManifestDependency>,

    #[serde(default, rename = "dev-dependencies")]
    pub dev_dependencies: BTreeMap<String, ManifestDependency>,

    /// Named groups: `[groups.test]`, `[groups.production]`, ...
    #[serde(default)]
    pub groups: BTreeMap<String, BTreeMap<String, ManifestDependency>>,
}

/// A dependency declaration: a bare constraint or a detailed table.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ManifestDependency {
    Short(String),
    Detailed(DetailedDependency),
}

/// A declaration with an explicit source and/or groups.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetailedDependency {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub git: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default, rename = "ref")]
    pub reference: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub registry: Option<String>,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl ManifestDependency {
    /// The constraint expression, or [`UNCONSTRAINED`] when none is declared.
    pub fn constraint(&self) -> &str {
        match self {
            ManifestDependency::Short(s) => s,
            ManifestDependency::Detailed(d) => d.version.as_deref().unwrap_or(UNCONSTRAINED),
        }
    }

    /// Groups listed on the declaration itself.
    pub fn groups(&self) -> &[String] {
        match self {
            ManifestDependency::Short(_) => &[],
            ManifestDependency::Detailed(d) => &d.groups,
        }
    }
}

impl Manifest {
    /// Parse the manifest stored at `file_name` (used in error messages).
    pub fn parse_toml(file_name: &str, content: &str) -> Result<Self, LockstepError> {
        toml::from_str(content).map_err(|e| LockstepError::Manifest {
            message: format!("Failed to parse {file_name}: {e}"),
        })
    }

    /// Every declaration with the groups it belongs to, section by section.
    pub fn declarations(&self) -> Vec<(&str, &ManifestDependency, Vec<String>)> {
        let mut out = Vec::new();
        for (name, dep) in &self.dependencies {
            out.push((name.as_str(), dep, dep.groups().to_vec()));
        }
        for (name, dep) in &self.dev_dependencies {
            let mut groups = vec!["development".to_string()];
            groups.extend(dep.groups().iter().cloned());
            out.push((name.as_str(), dep, groups));
        }
        for (group, deps) in &self.groups {
            for (name, dep) in deps {
                let mut groups = vec![group.clone()];
                groups.extend(dep.groups().iter().cloned());
                out.push((name.as_str(), dep, groups));
            }
        }
        out
    }
}
