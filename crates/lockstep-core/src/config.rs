use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use lockstep_util::errors::LockstepError;

/// Global user configuration loaded from `~/.lockstep/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub update: UpdateConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,
}

/// How updated requirements are written back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateStrategy {
    /// Replace the constraint with the exact new version.
    PinExact,
    /// Raise lower bounds to the new version, keeping operators.
    #[default]
    BumpMinimum,
    /// Leave constraints that already admit the new version; otherwise widen.
    WidenRange,
    /// Never touch the constraint text.
    LeaveAsIs,
}

impl UpdateStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateStrategy::PinExact => "pin-exact",
            UpdateStrategy::BumpMinimum => "bump-minimum",
            UpdateStrategy::WidenRange => "widen-range",
            UpdateStrategy::LeaveAsIs => "leave-as-is",
        }
    }
}

impl fmt::Display for UpdateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpdateStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pin-exact" => Ok(UpdateStrategy::PinExact),
            "bump-minimum" => Ok(UpdateStrategy::BumpMinimum),
            "widen-range" => Ok(UpdateStrategy::WidenRange),
            "leave-as-is" => Ok(UpdateStrategy::LeaveAsIs),
            other => Err(format!(
                "unknown update strategy `{other}` (expected pin-exact, bump-minimum, widen-range or leave-as-is)"
            )),
        }
    }
}

/// What to do when the solver reports a conflict but names no culprit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackPolicy {
    /// Unlock every eligible sub-dependency and retry.
    #[default]
    UnlockAllEligible,
    /// Give up with a version conflict error.
    Fail,
}

/// Update behaviour from `[update]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateConfig {
    #[serde(default)]
    pub strategy: UpdateStrategy,
    #[serde(default = "default_true", rename = "allow-multi-unlock")]
    pub allow_multi_unlock: bool,
    #[serde(default)]
    pub fallback: FallbackPolicy,
    /// Pseudo-dependencies a solver may inject (runtime placeholders).
    #[serde(default, rename = "sentinel-names")]
    pub sentinel_names: Vec<String>,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            strategy: UpdateStrategy::default(),
            allow_multi_unlock: true,
            fallback: FallbackPolicy::default(),
            sentinel_names: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Transient-failure backoff from `[retry]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_backoff_min", rename = "backoff-min-ms")]
    pub backoff_min_ms: u64,
    #[serde(default = "default_backoff_max", rename = "backoff-max-ms")]
    pub backoff_max_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff_min_ms: default_backoff_min(),
            backoff_max_ms: default_backoff_max(),
        }
    }
}

fn default_backoff_min() -> u64 {
    1_000
}

fn default_backoff_max() -> u64 {
    5_000
}

impl RetryConfig {
    /// The backoff window, with the bounds swapped if given in the wrong order.
    pub fn backoff(&self) -> (Duration, Duration) {
        let lo = self.backoff_min_ms.min(self.backoff_max_ms);
        let hi = self.backoff_min_ms.max(self.backoff_max_ms);
        (Duration::from_millis(lo), Duration::from_millis(hi))
    }
}

/// Resolver helper process from `[resolver]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl GlobalConfig {
    /// Load the global configuration, or return defaults if the file doesn't exist.
    pub fn load() -> Result<Self, LockstepError> {
        Self::load_from(&Self::default_path())
    }

    /// Load configuration from an explicit path, or defaults if it is missing.
    pub fn load_from(path: &Path) -> Result<Self, LockstepError> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| LockstepError::Config {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        toml::from_str(&content).map_err(|e| LockstepError::Config {
            message: format!("Failed to parse {}: {e}", path.display()),
        })
    }

    /// Returns the default path to the global config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }
}

/// Returns the path to the lockstep data directory (`~/.lockstep/`).
pub fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".lockstep")
}
