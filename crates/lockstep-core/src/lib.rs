//! Core data types for lockstep.
//!
//! This crate defines the dependency model shared by the resolver and the
//! operations layer: dependencies and their requirements, the merge-aware
//! [`dependency_set::DependencySet`], the lockfile sub-dependency graph used
//! for production classification, the files collaborator, the reference
//! `Lockstep.toml`/`Lockstep.lock` reader, and global configuration.
//!
//! This crate is intentionally free of network I/O.

pub mod config;
pub mod dependency;
pub mod dependency_set;
pub mod files;
pub mod graph;
pub mod lockfile;
pub mod manifest;
pub mod parser;
