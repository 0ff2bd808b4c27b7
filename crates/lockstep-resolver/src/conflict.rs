//! Solver-reported conflict explanations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One requirement in a conflict chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    pub constraint: String,
}

impl TreeNode {
    pub fn new(name: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraint: constraint.into(),
        }
    }
}

/// A chain from a top-level declaring requirement down to the deepest
/// blocking requirement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementTree {
    pub nodes: Vec<TreeNode>,
}

impl RequirementTree {
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        Self { nodes }
    }

    pub fn first(&self) -> Option<&TreeNode> {
        self.nodes.first()
    }

    pub fn last(&self) -> Option<&TreeNode> {
        self.nodes.last()
    }
}

/// Why no version satisfies every constraint at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub requirement_trees: Vec<RequirementTree>,
}

impl Conflict {
    pub fn new(requirement_trees: Vec<RequirementTree>) -> Self {
        Self { requirement_trees }
    }

    /// Whether any tree starts or ends at a name accepted by `moving`.
    pub fn touches(&self, moving: impl Fn(&str) -> bool) -> bool {
        self.requirement_trees.iter().any(|tree| {
            tree.first().is_some_and(|n| moving(&n.name))
                || tree.last().is_some_and(|n| moving(&n.name))
        })
    }

    /// Every name mentioned, first occurrence order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for node in self.requirement_trees.iter().flat_map(|t| &t.nodes) {
            if !names.contains(&node.name.as_str()) {
                names.push(&node.name);
            }
        }
        names
    }
}

impl fmt::Display for RequirementTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{} ({})", node.name, node.constraint)?;
        }
        Ok(())
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.requirement_trees.is_empty() {
            return write!(f, "Conflict with no requirement trees.");
        }
        writeln!(f, "Conflicting requirements ({}):", self.requirement_trees.len())?;
        for tree in &self.requirement_trees {
            writeln!(f, "  {tree}")?;
        }
        Ok(())
    }
}
