//! Finite state machine for one provisioning run

use serde::{Deserialize, Serialize};

/// Run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Not started
    Pending,

    /// Steps are executing
    Running,

    /// Every step reached its desired state
    Converged,

    /// Finished, with tolerated failures recorded
    ConvergedWithGaps,

    /// Stopped by a fatal failure
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Converged | RunState::ConvergedWithGaps | RunState::Failed
        )
    }
}

/// Run event
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// First step is about to run
    Start,

    /// Last step finished; `gaps` tolerated failures were recorded
    Complete { gaps: usize },

    /// A fatal failure stopped the run
    Abort(String),
}

/// Run FSM
#[derive(Debug, Clone)]
pub struct RunFsm {
    state: RunState,
    error: Option<String>,
}

impl RunFsm {
    /// Create a new FSM in pending state
    pub fn new() -> Self {
        Self {
            state: RunState::Pending,
            error: None,
        }
    }

    /// Get current state
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Get error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: RunEvent) -> Result<(), String> {
        let new_state = match (&self.state, &event) {
            (RunState::Pending, RunEvent::Start) => RunState::Running,

            (RunState::Running, RunEvent::Complete { gaps: 0 }) => RunState::Converged,
            (RunState::Running, RunEvent::Complete { .. }) => RunState::ConvergedWithGaps,
            (RunState::Pending | RunState::Running, RunEvent::Abort(err)) => {
                self.error = Some(err.clone());
                RunState::Failed
            }

            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.state = new_state;
        Ok(())
    }
}

impl Default for RunFsm {
    fn default() -> Self {
        Self::new()
    }
}
