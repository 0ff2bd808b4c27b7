//! A [`ResolverAdapter`] that runs the native solver as a helper process.
//!
//! Files are staged into a scratch directory and the request is written to
//! the helper's stdin as a versioned envelope:
//!
//! ```json
//! { "protocol": 1, "function": "resolve", "args": { "files": [...], "unlock": [...], "overrides": {...} } }
//! ```
//!
//! The helper answers on stdout with the same `protocol` and a `status` of
//! `success`, `missing_pinned_version`, `version_conflict`, `transient` or
//! `fatal` (the fields of [`ResolutionResult`]). Helpers that can only report
//! prose answer `{"status": "error", "error_class": ..., "error_message": ...}`
//! and the message is classified here:
//!
//! - `error_message` matching `locked to NAME (`, `not find NAME-<digit>` or
//!   `has NAME locked at` is a missing pinned version; the named capture
//!   group `name` carries the dependency
//! - `error_class` naming HTTP, timeouts, connections or networks is transient
//! - `error_class` naming a conflict is a version conflict with no trees
//! - anything else is fatal

use std::collections::BTreeMap;
use std::path::{Component, Path};
use std::sync::LazyLock;
use std::time::Instant;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use lockstep_core::config::ResolverConfig;
use lockstep_core::files::DependencyFile;
use lockstep_util::errors::LockstepError;
use lockstep_util::process::CommandBuilder;

use crate::adapter::{ResolutionRequest, ResolutionResult, ResolverAdapter};

/// Envelope version spoken in both directions.
pub const PROTOCOL_VERSION: u64 = 1;

/// Environment variable pointing the helper at the staged files.
pub const SCRATCH_ENV: &str = "LOCKSTEP_SCRATCH_DIR";

static MISSING_VERSION_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"locked\sto\s(?<name>[^\s]+)\s\(",
        r"not\sfind\s(?<name>[^\s]+)-\d",
        r"has\s(?<name>[^\s]+)\slocked\sat",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("missing version pattern is valid"))
    .collect()
});

static TRANSIENT_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)http|time[d_\s]?out|connection|network|socket")
        .expect("transient class pattern is valid")
});

static CONFLICT_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)conflict|solve[_\s]?failure").expect("conflict class pattern is valid")
});

#[derive(Serialize)]
struct RequestEnvelope<'a> {
    protocol: u64,
    function: &'a str,
    args: &'a ResolutionRequest,
}

/// Runs a helper command per resolution attempt.
#[derive(Debug, Clone)]
pub struct SubprocessResolver {
    command: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
}

impl SubprocessResolver {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// The helper configured under `[resolver]`, if any.
    pub fn from_config(config: &ResolverConfig) -> Option<Self> {
        let command = config.command.as_ref()?;
        let mut resolver = Self::new(command).with_args(config.args.iter().cloned());
        for (k, v) in &config.env {
            resolver = resolver.with_env(k, v);
        }
        Some(resolver)
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    fn run(&self, request: &ResolutionRequest) -> Result<ResolutionResult, LockstepError> {
        let scratch = tempfile::Builder::new().prefix("lockstep-").tempdir()?;
        stage_files(scratch.path(), &request.files)?;

        let envelope = serde_json::to_string(&RequestEnvelope {
            protocol: PROTOCOL_VERSION,
            function: "resolve",
            args: request,
        })
        .map_err(|e| LockstepError::Helper {
            message: format!("failed to encode request: {e}"),
        })?;

        let mut cmd = CommandBuilder::new(&self.command)
            .args(self.args.iter().cloned())
            .env(SCRATCH_ENV, scratch.path().to_string_lossy())
            .cwd(scratch.path())
            .stdin(envelope);
        for (k, v) in &self.env {
            cmd = cmd.env(k, v);
        }

        let started = Instant::now();
        let output = cmd.exec()?;
        tracing::debug!(
            "{} exited with {} after {:.1}s",
            self.command,
            output.status,
            started.elapsed().as_secs_f64()
        );

        let stdout = String::from_utf8_lossy(&output.stdout);
        match parse_response(&stdout) {
            Ok(result) => Ok(result),
            Err(err) if output.status.success() => Err(err),
            Err(_) => Err(LockstepError::Helper {
                message: format!(
                    "{} failed ({}): {}",
                    self.command,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            }),
        }
    }
}

impl ResolverAdapter for SubprocessResolver {
    fn resolve(&self, request: &ResolutionRequest) -> ResolutionResult {
        self.run(request).unwrap_or_else(|err| ResolutionResult::Fatal {
            message: err.to_string(),
        })
    }
}

/// Write every file below `root`, refusing paths that escape it.
fn stage_files(root: &Path, files: &[DependencyFile]) -> Result<(), LockstepError> {
    for file in files {
        let rel = Path::new(&file.name);
        if !rel.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(LockstepError::Helper {
                message: format!("refusing to stage file outside the project: {}", file.name),
            });
        }
        let dest = root.join(rel);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&dest, &file.content)?;
    }
    Ok(())
}

/// Decode a helper's response envelope.
pub fn parse_response(stdout: &str) -> Result<ResolutionResult, LockstepError> {
    let value: Value = serde_json::from_str(stdout.trim()).map_err(|e| LockstepError::Helper {
        message: format!("unreadable helper response: {e}"),
    })?;

    let protocol = value.get("protocol").and_then(Value::as_u64);
    if protocol != Some(PROTOCOL_VERSION) {
        return Err(LockstepError::Helper {
            message: format!(
                "helper protocol mismatch: expected {PROTOCOL_VERSION}, got {}",
                protocol.map_or_else(|| "none".to_string(), |p| p.to_string())
            ),
        });
    }
    if let Some(secs) = value.get("time_taken").and_then(Value::as_f64) {
        tracing::debug!("helper reported {secs:.1}s of solver time");
    }

    if value.get("status").and_then(Value::as_str) == Some("error") {
        let field = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        return Ok(classify_error(&field("error_class"), &field("error_message")));
    }

    serde_json::from_value(value).map_err(|e| LockstepError::Helper {
        message: format!("malformed helper response: {e}"),
    })
}

/// Map a prose solver error onto a typed result.
pub fn classify_error(error_class: &str, message: &str) -> ResolutionResult {
    let missing = MISSING_VERSION_RES
        .iter()
        .find_map(|re| re.captures(message))
        .and_then(|caps| caps.name("name"))
        .map(|m| m.as_str().to_string());
    if let Some(name) = missing {
        return ResolutionResult::MissingPinnedVersion {
            name,
            message: message.to_string(),
        };
    }
    if TRANSIENT_CLASS_RE.is_match(error_class) {
        return ResolutionResult::Transient {
            message: message.to_string(),
        };
    }
    if CONFLICT_CLASS_RE.is_match(error_class) {
        return ResolutionResult::VersionConflict {
            conflicts: Vec::new(),
            message: message.to_string(),
        };
    }
    ResolutionResult::Fatal {
        message: if error_class.is_empty() {
            message.to_string()
        } else {
            format!("{error_class}: {message}")
        },
    }
}
