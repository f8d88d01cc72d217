//! Shell execution of generated commands and multi-step plans.
//!
//! Commands run through `sh -c` with stdout and stderr captured and echoed
//! back to the user. There is no sandbox, no dry-run and no undo: every
//! execution is preceded by an explicit confirmation through a
//! [`Prompter`].

use crate::error::PlanError;
use crate::interaction::Prompter;
use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output};
use tracing::{error, info, warn};

// =============================================================================
// Process runner
// =============================================================================

/// Trait for running shell command lines.
///
/// This abstraction enables testing without spawning real processes.
pub trait ProcessRunner: Send + Sync {
    /// Runs `command` through the shell and returns its captured output.
    fn run_shell(&self, command: &str) -> Result<Output>;
}

/// Runs commands with the system `sh`.
pub struct SystemProcessRunner {
    shell: PathBuf,
}

impl SystemProcessRunner {
    pub fn new() -> Self {
        let shell = which::which("sh").unwrap_or_else(|_| PathBuf::from("/bin/sh"));
        Self { shell }
    }
}

impl Default for SystemProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRunner for SystemProcessRunner {
    fn run_shell(&self, command: &str) -> Result<Output> {
        info!("Executing via {}: {}", self.shell.display(), command);
        Ok(Command::new(&self.shell).arg("-c").arg(command).output()?)
    }
}

// =============================================================================
// Single command execution
// =============================================================================

/// How a single shell execution ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Succeeded,
    /// Non-zero exit. `None` when the process was killed by a signal.
    Failed { exit_code: Option<i32> },
    /// The shell could not be started.
    SpawnFailed(String),
}

/// Runs one command and writes its output, errors and exit code to `out`.
pub fn run_command<P, W>(runner: &P, command: &str, out: &mut W) -> Result<CommandOutcome>
where
    P: ProcessRunner + ?Sized,
    W: Write,
{
    let output = match runner.run_shell(command) {
        Ok(output) => output,
        Err(e) => {
            error!("Failed to start command '{}': {}", command, e);
            writeln!(out, "❌ Error executing command: {}", e)?;
            return Ok(CommandOutcome::SpawnFailed(e.to_string()));
        }
    };

    if !output.stdout.is_empty() {
        writeln!(out, "📤 Output: {}", String::from_utf8_lossy(&output.stdout))?;
    }
    if !output.stderr.is_empty() {
        writeln!(out, "⚠️ Errors: {}", String::from_utf8_lossy(&output.stderr))?;
    }

    if output.status.success() {
        return Ok(CommandOutcome::Succeeded);
    }

    let exit_code = output.status.code();
    match exit_code {
        Some(code) => writeln!(out, "❌ Command failed with exit code {}", code)?,
        None => writeln!(out, "❌ Command was terminated by a signal")?,
    }
    warn!("Command '{}' failed with status {}", command, output.status);
    Ok(CommandOutcome::Failed { exit_code })
}

// =============================================================================
// Plans
// =============================================================================

/// One step of a generated plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub command: String,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// Models emit `null` for informational steps; treat it like a missing field.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl PlanStep {
    fn title(&self) -> &str {
        if self.description.trim().is_empty() {
            "Unknown"
        } else {
            &self.description
        }
    }
}

/// Parses model output into plan steps.
///
/// Accepts the JSON array bare or wrapped in a Markdown code fence. Each
/// element must be an object; strings and numbers are rejected.
pub fn parse_plan(text: &str) -> Result<Vec<PlanStep>, PlanError> {
    let value: Value = serde_json::from_str(strip_code_fence(text))?;
    let Value::Array(items) = value else {
        return Err(PlanError::NotAnArray);
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            if !item.is_object() {
                return Err(PlanError::InvalidStep {
                    index: i + 1,
                    reason: format!("expected an object, found {}", json_kind(&item)),
                });
            }
            serde_json::from_value(item).map_err(|e| PlanError::InvalidStep {
                index: i + 1,
                reason: e.to_string(),
            })
        })
        .collect()
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening line.
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Tally of what happened while walking a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanReport {
    /// Shell executions, retries included.
    pub executed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Walks plan steps, asking before each execution.
pub struct PlanExecutor<P: ProcessRunner = SystemProcessRunner> {
    runner: P,
}

impl PlanExecutor<SystemProcessRunner> {
    pub fn new() -> Self {
        Self::with_runner(SystemProcessRunner::new())
    }
}

impl Default for PlanExecutor<SystemProcessRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ProcessRunner> PlanExecutor<P> {
    pub fn with_runner(runner: P) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &P {
        &self.runner
    }

    /// Parses `plan_text` and executes it.
    ///
    /// A malformed plan is reported to `out` and nothing runs; the return
    /// value is then `None`.
    pub fn run_plan_text<W: Write>(
        &self,
        plan_text: &str,
        prompter: &mut dyn Prompter,
        out: &mut W,
    ) -> Result<Option<PlanReport>> {
        match parse_plan(plan_text) {
            Ok(steps) => self.execute(&steps, prompter, out).map(Some),
            Err(e) => {
                warn!("Rejected plan: {}", e);
                writeln!(out, "❌ {}", e)?;
                Ok(None)
            }
        }
    }

    /// Executes `steps` in order.
    ///
    /// A step is executed only on an explicit `y`. When an executed command
    /// fails and the user asks to retry, the same step is offered again; this
    /// repeats for as long as the user keeps retrying.
    pub fn execute<W: Write>(
        &self,
        steps: &[PlanStep],
        prompter: &mut dyn Prompter,
        out: &mut W,
    ) -> Result<PlanReport> {
        let mut report = PlanReport::default();
        writeln!(out, "\n📋 Executing {} steps:", steps.len())?;

        let mut index = 0;
        while index < steps.len() {
            let step = &steps[index];
            writeln!(out, "\n--- Step {}: {} ---", index + 1, step.title())?;
            if let Some(explanation) = step.explanation.as_deref().filter(|e| !e.trim().is_empty()) {
                writeln!(out, "💡 {}", explanation)?;
            }

            if step.command.trim().is_empty() {
                writeln!(out, "❌ No command specified for this step")?;
                report.skipped += 1;
                index += 1;
                continue;
            }

            writeln!(out, "🤖 Command: {}", step.command)?;
            out.flush()?;
            let answer = prompter.ask("🚀 Execute this step? [y/N/s] (s=skip): ")?;
            if answer != "y" {
                writeln!(out, "⏭️ Skipping step")?;
                report.skipped += 1;
                index += 1;
                continue;
            }

            report.executed += 1;
            match run_command(&self.runner, &step.command, out)? {
                CommandOutcome::Succeeded => {}
                CommandOutcome::Failed { .. } => {
                    report.failed += 1;
                    out.flush()?;
                    if prompter.confirm("🔄 Retry this step? [y/N]: ")? {
                        info!("Retrying step {}", index + 1);
                        continue;
                    }
                }
                CommandOutcome::SpawnFailed(_) => {
                    report.failed += 1;
                }
            }
            index += 1;
        }

        Ok(report)
    }
}
