//! Sub-dependency graph recorded in the lockfile.

use std::collections::{HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

/// Directed `parent -> child` edges between locked dependency names.
///
/// Lock data can contain cycles, so every traversal tracks visited names.
#[derive(Debug, Default, Clone)]
pub struct SubdependencyGraph {
    graph: DiGraph<String, ()>,
    index: HashMap<String, NodeIndex>,
}

impl SubdependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or retrieve the node for `name`.
    pub fn add_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.index.insert(name.to_string(), idx);
        idx
    }

    /// Record that `parent` depends on `child`. Duplicate edges are ignored.
    pub fn add_edge(&mut self, parent: &str, child: &str) {
        let from = self.add_node(parent);
        let to = self.add_node(child);
        if !self.graph.edges(from).any(|e| e.target() == to) {
            self.graph.add_edge(from, to, ());
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Direct sub-dependencies of `name`.
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        self.neighbors(name, Direction::Outgoing)
    }

    /// Names that directly depend on `name`.
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        self.neighbors(name, Direction::Incoming)
    }

    fn neighbors(&self, name: &str, dir: Direction) -> Vec<&str> {
        let Some(&idx) = self.index.get(name) else {
            return Vec::new();
        };
        let mut names: Vec<&str> = self
            .graph
            .edges_directed(idx, dir)
            .map(|e| {
                let other = if dir == Direction::Outgoing {
                    e.target()
                } else {
                    e.source()
                };
                self.graph[other].as_str()
            })
            .collect();
        names.sort_unstable();
        names
    }

    /// Every name reachable from `roots`, roots included.
    ///
    /// Roots absent from the graph are still part of the result.
    pub fn closure<'a, I>(&self, roots: I) -> HashSet<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut visited: HashSet<String> = HashSet::new();
        let mut worklist: Vec<String> = roots.into_iter().map(str::to_string).collect();

        while let Some(name) = worklist.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }
            for child in self.dependencies_of(&name) {
                if !visited.contains(child) {
                    worklist.push(child.to_string());
                }
            }
        }

        visited
    }

    /// Number of distinct names in the graph.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
