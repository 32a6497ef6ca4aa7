//! Convergence step model
//!
//! A step is data: an optional idempotency predicate, an action, and a
//! failure policy. The orchestrator interprets it against a runner.

use std::fmt;

use crate::errors::ProvisionError;
use crate::models::outcome::FailurePolicy;
use crate::models::parameters::VersionTag;
use crate::remote::runner::{ExitResult, RemoteFile};
use crate::render::TemplateId;

/// Side-effect-free check deciding whether a step's desired state holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Holds when the command exits zero
    Succeeds(String),

    /// Holds when the command prints `version`; a failing query is a check error
    ReportsVersion { command: String, version: VersionTag },
}

impl Predicate {
    /// Command run to evaluate the predicate
    pub fn command(&self) -> &str {
        match self {
            Predicate::Succeeds(command) => command,
            Predicate::ReportsVersion { command, .. } => command,
        }
    }

    /// Interpret the check command's result
    pub fn evaluate(&self, result: &ExitResult) -> Result<bool, ProvisionError> {
        match self {
            Predicate::Succeeds(_) => Ok(result.success()),
            Predicate::ReportsVersion { version, .. } => {
                if !result.success() {
                    return Err(ProvisionError::PreconditionCheckError(format!(
                        "version query failed: {}",
                        result.summary()
                    )));
                }
                Ok(version.matches_reported(&result.stdout))
            }
        }
    }
}

/// One remote command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    pub line: String,

    /// Non-zero exits whose stderr contains this text count as success
    pub accept_stderr: Option<String>,
}

impl RemoteCommand {
    pub fn new(line: impl Into<String>) -> Self {
        Self {
            line: line.into(),
            accept_stderr: None,
        }
    }

    pub fn accepting(mut self, stderr_marker: impl Into<String>) -> Self {
        self.accept_stderr = Some(stderr_marker.into());
        self
    }

    pub fn accepts(&self, result: &ExitResult) -> bool {
        result.success()
            || self
                .accept_stderr
                .as_deref()
                .is_some_and(|marker| result.stderr.contains(marker))
    }
}

/// Content placed on the host by an upload action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    /// Rendered from the run's parameters
    Template(TemplateId),

    /// The caller-supplied stack definition, copied verbatim
    StackDefinition,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::Template(id) => write!(f, "{}", id),
            Artifact::StackDefinition => f.write_str("stack definition"),
        }
    }
}

/// A command run once per independent target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetCommand {
    pub target: String,
    pub command: RemoteCommand,
}

/// What a step does when its predicate does not hold
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Run commands in order; the first failure fails the step
    Commands(Vec<RemoteCommand>),

    /// Produce an artifact and write it to the host
    Upload { artifact: Artifact, target: RemoteFile },

    /// Attempt every target independently, then run `finally` once
    PerTarget {
        attempts: Vec<TargetCommand>,
        finally: Vec<RemoteCommand>,
    },
}

/// A named, ordered unit of host configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvergenceStep {
    pub name: String,
    pub check: Option<Predicate>,
    pub action: Action,
    pub policy: FailurePolicy,
}

impl ConvergenceStep {
    pub fn new(name: impl Into<String>, action: Action) -> Self {
        Self {
            name: name.into(),
            check: None,
            action,
            policy: FailurePolicy::Fatal,
        }
    }

    pub fn checked_by(mut self, predicate: Predicate) -> Self {
        self.check = Some(predicate);
        self
    }

    pub fn tolerated(mut self) -> Self {
        self.policy = FailurePolicy::Tolerated;
        self
    }
}
