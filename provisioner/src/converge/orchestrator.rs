//! Sequential convergence of one host

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::converge::fsm::{RunEvent, RunFsm};
use crate::converge::plan::{build_plan, PlanOptions};
use crate::converge::redact::Redactor;
use crate::converge::step::{Action, Artifact, ConvergenceStep, Predicate, RemoteCommand};
use crate::errors::ProvisionError;
use crate::models::outcome::{FailurePolicy, RunOutcome, StepRecord, StepStatus, TargetResult};
use crate::models::parameters::DeploymentParameters;
use crate::models::vhost::VirtualHostSpec;
use crate::remote::runner::{CommandRunner, ExitResult};
use crate::render::{render, RenderContext};
use crate::utils::fingerprint;

/// Everything a run needs besides the connection
#[derive(Debug)]
pub struct RunInputs {
    pub params: DeploymentParameters,

    /// Proxied services; one server block and one certificate each, in order
    pub virtual_hosts: Vec<VirtualHostSpec>,

    /// Stack definition copied verbatim to the host
    pub stack_definition: Vec<u8>,
}

/// Terminal result of a step that did not fail
struct StepResult {
    status: StepStatus,
    detail: String,
    targets: Vec<TargetResult>,
}

/// A failed step, with whatever per-target results were gathered first
struct StepFailure {
    error: ProvisionError,
    targets: Vec<TargetResult>,
}

impl From<ProvisionError> for StepFailure {
    fn from(error: ProvisionError) -> Self {
        Self {
            error,
            targets: Vec::new(),
        }
    }
}

/// Owns the ordered plan and runs it against one host
pub struct Orchestrator {
    runner: Arc<dyn CommandRunner>,
    inputs: RunInputs,
    static_root: String,
    steps: Vec<ConvergenceStep>,
    redactor: Redactor,
}

impl Orchestrator {
    /// Validate the inputs and build the plan.
    ///
    /// Nothing is sent to the host here.
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        inputs: RunInputs,
        options: PlanOptions,
    ) -> Result<Self, ProvisionError> {
        inputs.params.validate()?;
        for spec in &inputs.virtual_hosts {
            spec.validate()?;
        }

        let fqdns: Vec<String> = inputs
            .virtual_hosts
            .iter()
            .map(|spec| spec.fqdn(&inputs.params.base_domain))
            .collect();
        let steps = build_plan(&options, &inputs.params.compose_version, &fqdns);
        let redactor = Redactor::for_parameters(&inputs.params);

        Ok(Self {
            runner,
            static_root: options.layout.static_dir(),
            inputs,
            steps,
            redactor,
        })
    }

    /// The ordered plan
    pub fn steps(&self) -> &[ConvergenceStep] {
        &self.steps
    }

    /// Render the artifact `artifact` names, before any remote action
    pub fn artifact_bytes(&self, artifact: Artifact) -> Result<Vec<u8>, ProvisionError> {
        match artifact {
            Artifact::Template(template) => {
                let ctx = RenderContext {
                    params: &self.inputs.params,
                    virtual_hosts: &self.inputs.virtual_hosts,
                    static_root: &self.static_root,
                };
                render(template, &ctx)
            }
            Artifact::StackDefinition => {
                if self.inputs.stack_definition.is_empty() {
                    return Err(ProvisionError::ValidationError(
                        "Stack definition is empty".to_string(),
                    ));
                }
                Ok(self.inputs.stack_definition.clone())
            }
        }
    }

    /// Run every step in order.
    ///
    /// A fatal failure ends the run; the failing step is the last record.
    pub async fn run(&self) -> RunOutcome {
        let run_id = Uuid::new_v4();
        let host = self.runner.describe();
        let started_at = Utc::now();
        let mut fsm = RunFsm::new();
        let mut records: Vec<StepRecord> = Vec::with_capacity(self.steps.len());

        info!("Run {} against {}: {} steps", run_id, host, self.steps.len());
        // Pending -> Running is always valid.
        let _ = fsm.process(RunEvent::Start);

        let total = self.steps.len();
        let mut aborted = false;
        for (i, step) in self.steps.iter().enumerate() {
            let index = i + 1;
            info!("[{}/{}] {}", index, total, step.name);
            let step_started = Utc::now();

            let (status, fatal, detail, targets) = match self.execute(step).await {
                Ok(result) => {
                    info!("[{}/{}] {} {}", index, total, step.name, result.status);
                    (result.status, false, result.detail, result.targets)
                }
                Err(StepFailure { error, targets }) => {
                    let fatal = step.policy == FailurePolicy::Fatal || error.aborts_run();
                    let detail = self.redactor.redact(&error.to_string());
                    if fatal {
                        error!("[{}/{}] {} failed: {}", index, total, step.name, detail);
                    } else {
                        warn!("[{}/{}] {} failed (tolerated): {}", index, total, step.name, detail);
                    }
                    (StepStatus::Failed, fatal, detail, targets)
                }
            };

            records.push(StepRecord {
                index,
                name: step.name.clone(),
                policy: step.policy,
                status,
                fatal,
                detail,
                targets,
                started_at: step_started,
                finished_at: Utc::now(),
            });

            if fatal {
                let _ = fsm.process(RunEvent::Abort(step.name.clone()));
                aborted = true;
                break;
            }
        }

        if !aborted {
            let gaps = records
                .iter()
                .map(|r| {
                    usize::from(r.status == StepStatus::Failed) + r.failed_targets().count()
                })
                .sum();
            let _ = fsm.process(RunEvent::Complete { gaps });
        }

        let outcome = RunOutcome {
            run_id,
            host,
            state: fsm.state(),
            started_at,
            finished_at: Utc::now(),
            steps: records,
        };
        info!(
            "Run {} finished as {:?}: {} executed, {} skipped, {} failed",
            run_id,
            outcome.state,
            outcome.count(StepStatus::Executed),
            outcome.count(StepStatus::Skipped),
            outcome.count(StepStatus::Failed)
        );
        outcome
    }

    async fn execute(&self, step: &ConvergenceStep) -> Result<StepResult, StepFailure> {
        let mut notes = Vec::new();

        if let Some(check) = &step.check {
            match self.holds(check).await {
                Ok(true) => {
                    return Ok(StepResult {
                        status: StepStatus::Skipped,
                        detail: "already in desired state".to_string(),
                        targets: Vec::new(),
                    })
                }
                Ok(false) => debug!("{}: desired state not present", step.name),
                Err(e) if e.aborts_run() => return Err(e.into()),
                Err(e) => {
                    let reason = self.redactor.redact(&e.to_string());
                    warn!("{}: check not evaluated, proceeding: {}", step.name, reason);
                    notes.push(format!("check not evaluated ({})", reason));
                }
            }
        }

        let mut targets = Vec::new();
        match &step.action {
            Action::Commands(commands) => {
                for command in commands {
                    self.run_command(command).await?;
                }
                notes.push(format!("{} command(s) succeeded", commands.len()));
            }
            Action::Upload { artifact, target } => {
                let bytes = self.artifact_bytes(*artifact)?;
                let result = self.runner.upload(&bytes, target).await?;
                if !result.success() {
                    return Err(ProvisionError::ActionFailure(format!(
                        "upload of {} to {}: {}",
                        artifact,
                        target.path,
                        self.redactor.redact(&result.summary())
                    ))
                    .into());
                }
                notes.push(format!("{} -> {} ({})", artifact, target.path, fingerprint(&bytes)));
            }
            Action::PerTarget { attempts, finally } => {
                for attempt in attempts {
                    match self.run_command(&attempt.command).await {
                        Ok(_) => targets.push(TargetResult {
                            target: attempt.target.clone(),
                            succeeded: true,
                            detail: "ok".to_string(),
                        }),
                        Err(error) if error.aborts_run() => {
                            return Err(StepFailure { error, targets })
                        }
                        Err(e) => {
                            let detail = self.redactor.redact(&e.to_string());
                            warn!("{}: {} not completed: {}", step.name, attempt.target, detail);
                            targets.push(TargetResult {
                                target: attempt.target.clone(),
                                succeeded: false,
                                detail,
                            });
                        }
                    }
                }
                // Results already gathered are kept if the closing commands fail.
                for command in finally {
                    if let Err(error) = self.run_command(command).await {
                        return Err(StepFailure { error, targets });
                    }
                }
                let done = targets.iter().filter(|t| t.succeeded).count();
                notes.push(format!("{}/{} targets completed", done, targets.len()));
            }
        }

        Ok(StepResult {
            status: StepStatus::Executed,
            detail: notes.join("; "),
            targets,
        })
    }

    async fn holds(&self, check: &Predicate) -> Result<bool, ProvisionError> {
        let result = self.runner.run(check.command()).await?;
        check.evaluate(&result)
    }

    async fn run_command(&self, command: &RemoteCommand) -> Result<ExitResult, ProvisionError> {
        let result = self.runner.run(&command.line).await?;
        if command.accepts(&result) {
            if !result.success() {
                debug!("accepted exit {} from `{}`", result.status, command.line);
            }
            Ok(result)
        } else {
            Err(ProvisionError::ActionFailure(format!(
                "`{}` {}",
                command.line,
                self.redactor.redact(&result.summary())
            )))
        }
    }
}
