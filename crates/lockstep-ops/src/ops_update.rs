//! Operation: move one dependency to a new version, unlocking whatever else
//! has to move with it.

use std::path::Path;

use lockstep_core::config::{GlobalConfig, UpdateStrategy};
use lockstep_core::dependency::DependencyChange;
use lockstep_core::files::DependencyFiles;
use lockstep_core::parser::LockstepParser;
use lockstep_resolver::adapter::ResolverAdapter;
use lockstep_resolver::helper::SubprocessResolver;
use lockstep_resolver::{UnlockExpansionEngine, UpdatePolicy};
use lockstep_util::errors::LockstepError;

/// Options for `lockstep update`.
#[derive(Debug, Default, Clone)]
pub struct UpdateOptions {
    /// Dependency to move.
    pub name: String,
    /// Version it should end up at.
    pub version: String,
    /// Requirement rewrite strategy; the configured one when `None`.
    pub strategy: Option<UpdateStrategy>,
    /// Treat any version conflict as fatal instead of unlocking more names.
    pub single: bool,
    /// Helper command overriding `[resolver] command`.
    pub helper: Option<String>,
    /// Extra arguments for `helper`.
    pub helper_args: Vec<String>,
}

/// Result of a successful update.
#[derive(Debug, Clone)]
pub struct UpdateReport {
    pub changes: Vec<DependencyChange>,
    /// Number of resolver calls the engine made.
    pub attempts: usize,
}

/// Resolve the update for the project at `project_root` with the helper
/// selected by `opts` or the global config.
pub fn update(project_root: &Path, opts: &UpdateOptions) -> miette::Result<UpdateReport> {
    let config = GlobalConfig::load()?;
    let helper = helper_for(opts, &config)?;
    tracing::debug!("using resolver helper `{}`", helper.command());
    update_with(project_root, opts, &config, &helper)
}

/// Same as [`update`] with an explicit config and adapter.
pub fn update_with(
    project_root: &Path,
    opts: &UpdateOptions,
    config: &GlobalConfig,
    adapter: &dyn ResolverAdapter,
) -> miette::Result<UpdateReport> {
    let files = DependencyFiles::load(project_root, &LockstepParser)?;
    if !files.baseline().contains(&opts.name) {
        return Err(LockstepError::Manifest {
            message: format!("`{}` is not a dependency of this project", opts.name),
        }
        .into());
    }

    let policy = policy_for(opts, config);
    let engine = UnlockExpansionEngine::new(adapter, policy);

    let sp = lockstep_util::progress::spinner(&format!(
        "Resolving {} {}...",
        opts.name, opts.version
    ));
    let outcome = engine.run(&opts.name, &opts.version, &files);
    sp.finish_and_clear();

    let resolution = outcome?;
    Ok(UpdateReport {
        attempts: resolution.attempts.len(),
        changes: resolution.changes,
    })
}

fn helper_for(
    opts: &UpdateOptions,
    config: &GlobalConfig,
) -> Result<SubprocessResolver, LockstepError> {
    if let Some(command) = &opts.helper {
        return Ok(SubprocessResolver::new(command).with_args(opts.helper_args.iter().cloned()));
    }
    SubprocessResolver::from_config(&config.resolver).ok_or_else(|| LockstepError::Config {
        message: format!(
            "no resolver helper configured; pass --helper or set [resolver] command in {}",
            GlobalConfig::default_path().display()
        ),
    })
}

fn policy_for(opts: &UpdateOptions, config: &GlobalConfig) -> UpdatePolicy {
    let mut policy = UpdatePolicy::from_config(config);
    if let Some(strategy) = opts.strategy {
        policy.strategy = strategy;
    }
    if opts.single {
        policy.allow_multi_unlock = false;
    }
    policy
}
