//! The unlock expansion engine.
//!
//! Repeatedly asks a [`ResolverAdapter`] to resolve the project with the
//! target pinned, reading each failure to decide which further dependencies
//! may move. The unlock set only grows, transient failures are retried once,
//! and top-level dependencies other than the target are never unlocked.
//!
//! Control flow is an explicit state machine:
//!
//! ```text
//! BuildingDefinition -> Resolving -> HandlingResult -> BuildingDefinition
//!                                                   -> Success
//!                                                   -> Fatal
//! ```

use std::collections::HashSet;
use std::time::{Duration, Instant};

use rand::Rng;

use lockstep_core::config::{FallbackPolicy, GlobalConfig, UpdateStrategy};
use lockstep_core::dependency::{DependencyChange, SkippedRequirement};
use lockstep_core::files::DependencyFiles;
use lockstep_util::errors::LockstepError;

use crate::adapter::{
    PinnedOverride, ResolutionRequest, ResolutionResult, ResolvedDependency, ResolverAdapter,
};
use crate::constraint;
use crate::conflict::Conflict;
use crate::rewriter::RequirementRewriter;
use crate::version::Version;

/// Knobs for one engine invocation.
#[derive(Debug, Clone)]
pub struct UpdatePolicy {
    /// When false, any version conflict is fatal.
    pub allow_multi_unlock: bool,
    pub strategy: UpdateStrategy,
    /// What to do when a conflict names no usable culprit.
    pub fallback: FallbackPolicy,
    /// Pseudo-dependencies injected by some solvers; never unlocked.
    pub sentinel_names: Vec<String>,
    /// Bounds of the randomized sleep before the single transient retry.
    pub backoff: (Duration, Duration),
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        Self {
            allow_multi_unlock: true,
            strategy: UpdateStrategy::default(),
            fallback: FallbackPolicy::default(),
            sentinel_names: Vec::new(),
            backoff: (Duration::from_secs(1), Duration::from_secs(5)),
        }
    }
}

impl UpdatePolicy {
    pub fn from_config(config: &GlobalConfig) -> Self {
        Self {
            allow_multi_unlock: config.update.allow_multi_unlock,
            strategy: config.update.strategy,
            fallback: config.update.fallback,
            sentinel_names: config.update.sentinel_names.clone(),
            backoff: config.retry.backoff(),
        }
    }
}

/// Outcome of a successful invocation.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Target first, then every other moved dependency in unlock order.
    pub changes: Vec<DependencyChange>,
    /// The unlock set sent with each resolver call, in call order.
    pub attempts: Vec<Vec<String>>,
}

/// Resolve `target_name` to `target_version` with default policy.
pub fn resolve(
    target_name: &str,
    target_version: &str,
    files: &DependencyFiles,
    allow_multi_unlock: bool,
    adapter: &dyn ResolverAdapter,
) -> Result<Vec<DependencyChange>, LockstepError> {
    let policy = UpdatePolicy {
        allow_multi_unlock,
        ..UpdatePolicy::default()
    };
    UnlockExpansionEngine::new(adapter, policy)
        .run(target_name, target_version, files)
        .map(|r| r.changes)
}

enum State {
    BuildingDefinition,
    Resolving(ResolutionRequest),
    HandlingResult(ResolutionResult),
    Success(Vec<ResolvedDependency>),
    Fatal(LockstepError),
}

/// Mutable state of one invocation.
struct Run<'f> {
    target: String,
    target_version: String,
    files: &'f DependencyFiles,
    pin: PinnedOverride,
    /// The target; names unlocked along the way go to `other_updates`.
    unlocked: Vec<String>,
    other_updates: Vec<String>,
    transient_retry_used: bool,
    attempts: Vec<Vec<String>>,
    started: Instant,
}

impl Run<'_> {
    fn unlock_names(&self) -> Vec<String> {
        let mut names = self.unlocked.clone();
        names.extend(self.other_updates.iter().cloned());
        names
    }

    fn is_unlocked(&self, name: &str) -> bool {
        self.unlocked.iter().any(|n| n == name) || self.other_updates.iter().any(|n| n == name)
    }

    fn unlock(&mut self, names: impl IntoIterator<Item = String>) {
        for name in names {
            if !self.is_unlocked(&name) {
                self.other_updates.push(name);
            }
        }
    }
}

pub struct UnlockExpansionEngine<'a> {
    adapter: &'a dyn ResolverAdapter,
    policy: UpdatePolicy,
}

impl<'a> UnlockExpansionEngine<'a> {
    pub fn new(adapter: &'a dyn ResolverAdapter, policy: UpdatePolicy) -> Self {
        Self { adapter, policy }
    }

    pub fn policy(&self) -> &UpdatePolicy {
        &self.policy
    }

    /// Drive the resolver until it succeeds or no safe progress remains.
    pub fn run(
        &self,
        target_name: &str,
        target_version: &str,
        files: &DependencyFiles,
    ) -> Result<Resolution, LockstepError> {
        let mut run = Run {
            target: target_name.to_string(),
            target_version: target_version.to_string(),
            files,
            pin: PinnedOverride {
                name: target_name.to_string(),
                version: target_version.to_string(),
                strip_git_source: moves_off_git(files, target_name, target_version),
            },
            unlocked: vec![target_name.to_string()],
            other_updates: Vec::new(),
            transient_retry_used: false,
            attempts: Vec::new(),
            started: Instant::now(),
        };

        let mut state = State::BuildingDefinition;
        loop {
            state = match state {
                State::BuildingDefinition => {
                    let unlock = run.unlock_names();
                    tracing::debug!(
                        "resolver attempt {} for {} {}, unlocking [{}]",
                        run.attempts.len() + 1,
                        run.target,
                        run.target_version,
                        unlock.join(", ")
                    );
                    let built = self.adapter.build(run.files, &unlock, &run.pin);
                    run.attempts.push(unlock);
                    match built {
                        Ok(request) => State::Resolving(request),
                        Err(e) => State::Fatal(e),
                    }
                }
                State::Resolving(request) => {
                    State::HandlingResult(self.adapter.resolve(&request))
                }
                State::HandlingResult(result) => self.handle_result(&mut run, result),
                State::Success(resolved) => {
                    let changes = self.change_set(&run, &resolved)?;
                    tracing::debug!(
                        "resolved {} after {} attempt(s) in {:.1}s",
                        run.target,
                        run.attempts.len(),
                        run.started.elapsed().as_secs_f64()
                    );
                    return Ok(Resolution {
                        changes,
                        attempts: run.attempts,
                    });
                }
                State::Fatal(err) => return Err(err),
            };
        }
    }

    fn handle_result(&self, run: &mut Run<'_>, result: ResolutionResult) -> State {
        match result {
            ResolutionResult::Success { dependencies } => State::Success(dependencies),
            ResolutionResult::MissingPinnedVersion { name, message } => {
                self.handle_missing(run, name, message)
            }
            ResolutionResult::VersionConflict { conflicts, message } => {
                self.handle_conflict(run, &conflicts, message)
            }
            ResolutionResult::Transient { message } => {
                if run.transient_retry_used {
                    return State::Fatal(LockstepError::TransientExhausted {
                        message,
                        elapsed: run.started.elapsed(),
                    });
                }
                run.transient_retry_used = true;
                let pause = self.backoff();
                tracing::warn!(
                    "transient resolver failure, retrying in {}ms: {message}",
                    pause.as_millis()
                );
                std::thread::sleep(pause);
                State::BuildingDefinition
            }
            ResolutionResult::Fatal { message } => State::Fatal(LockstepError::Unresolvable {
                message,
                elapsed: run.started.elapsed(),
            }),
        }
    }

    fn handle_missing(&self, run: &mut Run<'_>, name: String, message: String) -> State {
        let files = run.files;
        let top_level = name != run.target
            && files
                .baseline()
                .get(&name)
                .is_some_and(|d| d.top_level());
        if run.is_unlocked(&name) || top_level {
            return State::Fatal(LockstepError::MissingPinnedVersionUnrecoverable {
                name,
                message,
                elapsed: run.started.elapsed(),
            });
        }
        tracing::info!("{name} is no longer available at its locked version, unlocking it");
        run.unlock([name]);
        State::BuildingDefinition
    }

    fn handle_conflict(
        &self,
        run: &mut Run<'_>,
        conflicts: &[Conflict],
        message: String,
    ) -> State {
        let fatal = |run: &Run<'_>, message: String| {
            State::Fatal(LockstepError::VersionConflictUnrecoverable {
                names: conflict_names(&run.target, conflicts),
                message,
                elapsed: run.started.elapsed(),
            })
        };

        if !self.policy.allow_multi_unlock {
            return fatal(&*run, message);
        }

        let files = run.files;
        let baseline = files.baseline();
        let top_level: HashSet<String> = baseline.top_level_names().into_iter().collect();
        let eligible: Vec<String> = baseline
            .locked_names()
            .into_iter()
            .filter(|n| !top_level.contains(n) && !run.is_unlocked(n))
            .collect();
        if eligible.is_empty() {
            return fatal(&*run, message);
        }

        let candidates = self.candidates(run, conflicts, &eligible);
        if !candidates.is_empty() {
            tracing::info!("unlocking {} to resolve conflict", candidates.join(", "));
            run.unlock(candidates);
            return State::BuildingDefinition;
        }

        match self.policy.fallback {
            FallbackPolicy::UnlockAllEligible => {
                tracing::warn!(
                    "conflict names no unlockable culprit, unlocking all {} eligible sub-dependencies",
                    eligible.len()
                );
                run.unlock(eligible);
                State::BuildingDefinition
            }
            FallbackPolicy::Fail => fatal(&*run, message),
        }
    }

    /// Sub-dependencies named by relevant conflict trees.
    fn candidates(
        &self,
        run: &Run<'_>,
        conflicts: &[Conflict],
        eligible: &[String],
    ) -> Vec<String> {
        let target_version = Version::parse(&run.target_version);
        let mut candidates: Vec<String> = Vec::new();
        let relevant = conflicts
            .iter()
            .filter(|c| c.touches(|name| name == run.target || run.is_unlocked(name)));
        for tree in relevant.flat_map(|c| &c.requirement_trees) {
            let Some(last) = tree.last() else { continue };
            if constraint::is_universal(&last.constraint) {
                continue;
            }
            if last.name == run.target
                && constraint::Constraint::parse(&last.constraint)
                    .is_ok_and(|c| c.matches(&target_version))
            {
                continue;
            }
            let Some(node) = tree.nodes.iter().find(|n| eligible.contains(&n.name)) else {
                continue;
            };
            if node.name == run.target
                || self.policy.sentinel_names.contains(&node.name)
                || candidates.contains(&node.name)
            {
                continue;
            }
            candidates.push(node.name.clone());
        }
        candidates
    }

    fn backoff(&self) -> Duration {
        let (lo, hi) = self.policy.backoff;
        let lo = lo.as_millis() as u64;
        let hi = hi.as_millis() as u64;
        if hi <= lo {
            return Duration::from_millis(lo);
        }
        Duration::from_millis(rand::rng().random_range(lo..=hi))
    }

    fn change_set(
        &self,
        run: &Run<'_>,
        resolved: &[ResolvedDependency],
    ) -> Result<Vec<DependencyChange>, LockstepError> {
        let rewriter = RequirementRewriter::new(self.policy.strategy);
        let baseline = run.files.baseline();
        let mut changes = Vec::new();

        for name in std::iter::once(&run.target).chain(&run.other_updates) {
            let Some(new) = resolved.iter().find(|d| d.name == *name) else {
                if *name == run.target {
                    return Err(LockstepError::Unresolvable {
                        message: format!("{name} is missing from the resolved dependencies"),
                        elapsed: run.started.elapsed(),
                    });
                }
                tracing::debug!("{name} was unlocked but is no longer required");
                continue;
            };
            let previous = baseline.get(name);
            let previous_version = previous.and_then(|d| d.resolved_version.clone());
            if previous_version.as_deref() == Some(new.version.as_str()) {
                continue;
            }

            let previous_requirements = previous
                .map(|d| d.requirements.clone())
                .unwrap_or_default();
            let strip_git = *name == run.target && run.pin.strip_git_source;
            let mut updated_requirements = Vec::with_capacity(previous_requirements.len());
            let mut skipped_requirements = Vec::new();
            for req in &previous_requirements {
                let mut updated = match rewriter.rewrite(req, &new.version) {
                    Ok(updated) => updated,
                    Err(err) => {
                        tracing::warn!(
                            "leaving {name} requirement in {} as is: {err}",
                            req.source_file
                        );
                        skipped_requirements.push(SkippedRequirement {
                            source_file: req.source_file.clone(),
                            constraint: req.constraint.clone(),
                            reason: err.to_string(),
                        });
                        req.clone()
                    }
                };
                if strip_git && updated.source.as_ref().is_some_and(|s| s.is_git()) {
                    updated.source = None;
                }
                updated_requirements.push(updated);
            }

            changes.push(DependencyChange {
                name: name.clone(),
                previous_version,
                new_version: new.version.clone(),
                previous_requirements,
                updated_requirements,
                skipped_requirements,
            });
        }
        Ok(changes)
    }
}

/// The target is git-sourced and is being moved to a released version.
fn moves_off_git(files: &DependencyFiles, name: &str, version: &str) -> bool {
    files
        .baseline()
        .get(name)
        .and_then(|d| d.source())
        .is_some_and(|s| s.is_git())
        && Version::try_parse(version).is_some()
}

fn conflict_names(target: &str, conflicts: &[Conflict]) -> Vec<String> {
    let mut names = vec![target.to_string()];
    for name in conflicts.iter().flat_map(|c| c.names()) {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}
