//! Run outcome models

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::converge::fsm::RunState;

/// What happens to the run when a step fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// The run stops at this step
    Fatal,

    /// The failure is recorded and the run continues
    Tolerated,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Fatal => f.pad("fatal"),
            FailurePolicy::Tolerated => f.pad("tolerated"),
        }
    }
}

/// Terminal state of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// The idempotency check held; nothing was changed
    Skipped,

    /// The action ran to completion
    Executed,

    /// The check or the action failed
    Failed,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::Skipped => f.pad("skipped"),
            StepStatus::Executed => f.pad("executed"),
            StepStatus::Failed => f.pad("failed"),
        }
    }
}

/// Result of one independent sub-action, e.g. a certificate for one host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetResult {
    pub target: String,
    pub succeeded: bool,
    pub detail: String,
}

/// Record of one step, in run order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    /// 1-based position in the plan
    pub index: usize,
    pub name: String,
    pub policy: FailurePolicy,
    pub status: StepStatus,

    /// Whether this failure stopped the run
    pub fatal: bool,

    /// Sanitized exit detail
    pub detail: String,

    /// Per-target sub-results, for steps that fan out
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<TargetResult>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl StepRecord {
    /// Sub-targets whose action failed
    pub fn failed_targets(&self) -> impl Iterator<Item = &TargetResult> {
        self.targets.iter().filter(|t| !t.succeeded)
    }
}

/// Ordered record of every step a run reached
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub host: String,
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub steps: Vec<StepRecord>,
}

impl RunOutcome {
    /// A run is acceptable when no failure stopped it
    pub fn is_acceptable(&self) -> bool {
        self.fatal_failure().is_none()
    }

    /// The step that stopped the run, if any
    pub fn fatal_failure(&self) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.fatal)
    }

    /// Failures that were recorded without stopping the run
    pub fn tolerated_failures(&self) -> Vec<&StepRecord> {
        self.steps
            .iter()
            .filter(|s| !s.fatal && (s.status == StepStatus::Failed || s.failed_targets().next().is_some()))
            .collect()
    }

    /// Targets that did not complete, across every step
    pub fn failed_targets(&self) -> Vec<&TargetResult> {
        self.steps.iter().flat_map(|s| s.failed_targets()).collect()
    }

    pub fn count(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }

    pub fn step(&self, name: &str) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.name == name)
    }
}
