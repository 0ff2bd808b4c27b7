//! Constrained upgrade resolution.
//!
//! The [`engine::UnlockExpansionEngine`] drives an external solver through a
//! [`adapter::ResolverAdapter`], growing the set of dependencies allowed to
//! move until resolution succeeds, then rewrites the affected requirements
//! with [`rewriter::RequirementRewriter`].

pub mod adapter;
pub mod conflict;
pub mod constraint;
pub mod engine;
pub mod helper;
pub mod rewriter;
pub mod version;

pub use engine::{resolve, Resolution, UnlockExpansionEngine, UpdatePolicy};
