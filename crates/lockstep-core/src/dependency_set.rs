//! Merge-aware collection of dependencies from several declaration sources.

use std::collections::HashMap;

use lockstep_util::errors::LockstepError;

use crate::dependency::Dependency;
use crate::graph::SubdependencyGraph;

/// One canonical record per dependency name, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct DependencySet {
    dependencies: Vec<Dependency>,
    index: HashMap<String, usize>,
}

impl DependencySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dependency, merging it into any existing record of the same name.
    ///
    /// Requirements are appended in order (exact duplicates dropped) and the
    /// production flag is OR-ed. Two different non-empty resolved versions
    /// mean the manifest and lockfile disagree, which is reported rather than
    /// resolved.
    pub fn add(&mut self, dependency: Dependency) -> Result<(), LockstepError> {
        let Some(&pos) = self.index.get(&dependency.name) else {
            self.index
                .insert(dependency.name.clone(), self.dependencies.len());
            self.dependencies.push(dependency);
            return Ok(());
        };

        let existing = &mut self.dependencies[pos];
        match (&existing.resolved_version, &dependency.resolved_version) {
            (Some(left), Some(right)) if left != right => {
                return Err(LockstepError::DataInconsistency {
                    name: dependency.name,
                    left: left.clone(),
                    right: right.clone(),
                });
            }
            (None, Some(right)) => existing.resolved_version = Some(right.clone()),
            _ => {}
        }
        if existing.previous_version.is_none() {
            existing.previous_version = dependency.previous_version;
        }
        for req in dependency.requirements {
            if !existing.requirements.contains(&req) {
                existing.requirements.push(req);
            }
        }
        for req in dependency.previous_requirements {
            if !existing.previous_requirements.contains(&req) {
                existing.previous_requirements.push(req);
            }
        }
        existing.production |= dependency.production;
        Ok(())
    }

    /// Merge every record of `other` into this set.
    pub fn merge(&mut self, other: DependencySet) -> Result<(), LockstepError> {
        for dep in other.dependencies {
            self.add(dep)?;
        }
        Ok(())
    }

    /// All dependencies in first-seen order.
    pub fn all(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn get(&self, name: &str) -> Option<&Dependency> {
        self.index.get(name).map(|&i| &self.dependencies[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Names declared with a constraint in some manifest.
    pub fn top_level_names(&self) -> Vec<String> {
        self.dependencies
            .iter()
            .filter(|d| d.top_level())
            .map(|d| d.name.clone())
            .collect()
    }

    /// Names pinned to a version by the lockfile. Path sources never count.
    pub fn locked_names(&self) -> Vec<String> {
        self.dependencies
            .iter()
            .filter(|d| d.resolved_version.is_some() && !d.source().is_some_and(|s| s.is_path()))
            .map(|d| d.name.clone())
            .collect()
    }

    /// Mark production dependencies.
    ///
    /// A dependency is production if its own declarations say so, or if it is
    /// reachable in `graph` from a production declaration.
    pub fn classify_production(&mut self, graph: &SubdependencyGraph) {
        let roots: Vec<&str> = self
            .dependencies
            .iter()
            .filter(|d| d.production || d.declared_production())
            .map(|d| d.name.as_str())
            .collect();
        let production = graph.closure(roots);
        for dep in &mut self.dependencies {
            dep.production = production.contains(&dep.name);
        }
    }
}

impl IntoIterator for DependencySet {
    type Item = Dependency;
    type IntoIter = std::vec::IntoIter<Dependency>;

    fn into_iter(self) -> Self::IntoIter {
        self.dependencies.into_iter()
    }
}
