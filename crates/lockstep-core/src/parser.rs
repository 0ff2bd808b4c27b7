//! Reads `Lockstep.toml` manifests and the `Lockstep.lock` lockfile into a
//! [`DependencySet`].

use lockstep_util::errors::LockstepError;

use crate::dependency::{Dependency, Requirement, SourceDescriptor};
use crate::dependency_set::DependencySet;
use crate::files::{manifest_order, DependencyFile, FileParser};
use crate::graph::SubdependencyGraph;
use crate::lockfile::{Lockfile, LOCKFILE};
use crate::manifest::{DetailedDependency, Manifest, ManifestDependency, MANIFEST_FILE};

/// Parser for the lockstep manifest/lockfile pair.
#[derive(Debug, Default, Clone, Copy)]
pub struct LockstepParser;

impl FileParser for LockstepParser {
    fn parse(&self, files: &[DependencyFile]) -> Result<DependencySet, LockstepError> {
        let mut manifests: Vec<&DependencyFile> = files
            .iter()
            .filter(|f| f.file_name() == MANIFEST_FILE)
            .collect();
        if manifests.is_empty() {
            return Err(LockstepError::Manifest {
                message: format!("A {MANIFEST_FILE} must be provided"),
            });
        }
        // Root manifest first, then sub-manifests by path.
        manifests.sort_by(|a, b| manifest_order(a).cmp(&manifest_order(b)));

        let lockfile = match files.iter().find(|f| f.name == LOCKFILE) {
            Some(f) => Some(Lockfile::parse_toml(&f.content)?),
            None => None,
        };

        let mut set = DependencySet::new();
        for file in manifests {
            let manifest = Manifest::parse_toml(&file.name, &file.content)?;
            for (name, decl, groups) in manifest.declarations() {
                let mut req = Requirement::new(&file.name, decl.constraint()).with_groups(groups);
                req.source =
                    declared_source(decl).or_else(|| locked_source(lockfile.as_ref(), name));

                let mut dep = Dependency::new(name).with_requirement(req);
                dep.resolved_version = lockfile
                    .as_ref()
                    .and_then(|lf| lf.package(name))
                    .map(|p| p.resolved_version());
                set.add(dep)?;
            }
        }

        let mut graph = SubdependencyGraph::new();
        if let Some(ref lf) = lockfile {
            for pkg in &lf.package {
                graph.add_node(&pkg.name);
                for child in &pkg.dependencies {
                    graph.add_edge(&pkg.name, child);
                }
                if pkg.is_path() {
                    continue;
                }
                set.add(Dependency::new(&pkg.name).with_version(pkg.resolved_version()))?;
            }
        }

        set.classify_production(&graph);
        Ok(set)
    }

    fn file_names(&self) -> &[&str] {
        &[MANIFEST_FILE, LOCKFILE]
    }
}

fn declared_source(decl: &ManifestDependency) -> Option<SourceDescriptor> {
    let ManifestDependency::Detailed(DetailedDependency {
        git,
        branch,
        reference,
        path,
        registry,
        ..
    }) = decl
    else {
        return None;
    };
    if let Some(url) = git {
        return Some(SourceDescriptor::git(url, branch.clone(), reference.clone()));
    }
    if let Some(path) = path {
        return Some(SourceDescriptor::Path { path: path.clone() });
    }
    registry
        .as_ref()
        .map(|url| SourceDescriptor::PrivateRegistry { url: url.clone() })
}

/// The lockfile's source for `name`, unless it is the default registry.
fn locked_source(lockfile: Option<&Lockfile>, name: &str) -> Option<SourceDescriptor> {
    lockfile?
        .package(name)?
        .source_descriptor()
        .filter(|s| *s != SourceDescriptor::DefaultRegistry)
}
