//! Human-readable run report

use std::fmt::Write;

use colored::Colorize;

use crate::converge::fsm::RunState;
use crate::converge::step::ConvergenceStep;
use crate::models::outcome::{RunOutcome, StepStatus};

/// Render the outcome of a run for the terminal
pub fn render_report(outcome: &RunOutcome) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_report(&mut out, outcome);
    out
}

fn write_report(out: &mut String, outcome: &RunOutcome) -> std::fmt::Result {
    let verdict = match outcome.state {
        RunState::Converged => "CONVERGED".green().bold(),
        RunState::ConvergedWithGaps => "CONVERGED WITH GAPS".yellow().bold(),
        RunState::Failed => "FAILED".red().bold(),
        RunState::Pending | RunState::Running => "INCOMPLETE".red().bold(),
    };
    let elapsed = (outcome.finished_at - outcome.started_at).num_seconds();
    writeln!(
        out,
        "Run {} on {}: {} ({}s)",
        outcome.run_id, outcome.host, verdict, elapsed
    )?;

    for step in &outcome.steps {
        let status = match step.status {
            StepStatus::Skipped => format!("{:<8}", step.status).as_str().dimmed(),
            StepStatus::Executed => format!("{:<8}", step.status).as_str().green(),
            StepStatus::Failed if step.fatal => format!("{:<8}", step.status).as_str().red(),
            StepStatus::Failed => format!("{:<8}", step.status).as_str().yellow(),
        };
        writeln!(
            out,
            "  [{:>2}] {:<28} {} {}",
            step.index, step.name, status, step.detail
        )?;
    }

    if let Some(failed) = outcome.fatal_failure() {
        writeln!(out)?;
        writeln!(
            out,
            "{} step {} ({}): {}",
            "Stopped at".red().bold(),
            failed.index,
            failed.name,
            failed.detail
        )?;
        return Ok(());
    }

    let tolerated = outcome.tolerated_failures();
    if tolerated.is_empty() {
        return Ok(());
    }
    writeln!(out)?;
    for step in tolerated {
        if step.status == StepStatus::Failed {
            writeln!(out, "{} {}: {}", "Not completed:".yellow().bold(), step.name, step.detail)?;
        }
        let missing: Vec<_> = step.failed_targets().collect();
        if !missing.is_empty() {
            writeln!(out, "{} ({}):", "Not completed".yellow().bold(), step.name)?;
            for target in missing {
                writeln!(out, "  - {}: {}", target.target, target.detail)?;
            }
        }
    }
    Ok(())
}

/// List the plan without running it
pub fn render_plan(steps: &[ConvergenceStep]) -> String {
    steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let check = if step.check.is_some() { "checked" } else { "always" };
            format!("{:>2}. {:<28} {:<9} {}\n", i + 1, step.name, step.policy, check)
        })
        .collect()
}
