//! Shared utilities for lockstep.
//!
//! This crate provides cross-cutting concerns used by all other lockstep crates:
//! the error taxonomy, project discovery, helper process spawning, and
//! terminal status output.

pub mod errors;
pub mod fs;
pub mod process;
pub mod progress;
