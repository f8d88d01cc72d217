//! Routes a parsed query through context gathering, prompt building, the
//! completion call and finally printing or executing the result.

use crate::context::ContextCollector;
use crate::executor::{run_command, PlanExecutor, ProcessRunner, SystemProcessRunner};
use crate::interaction::Prompter;
use crate::interaction_log::InteractionLog;
use crate::llm_client::{Completer, CompletionRequest};
use crate::prompt::{build_direct_prompt, build_prompt, Mode};
use anyhow::Result;
use std::env;
use std::io::Write;
use tracing::{debug, info};

/// Words hinting that a request needs more than one command.
pub const COMPLEXITY_KEYWORDS: [&str; 19] = [
    "multiple",
    "several",
    "steps",
    "first",
    "then",
    "after",
    "before",
    "complex",
    "complicated",
    "setup",
    "install",
    "configure",
    "build",
    "deploy",
    "migrate",
    "backup",
    "restore",
    "analyze",
    "process",
];

/// More keyword hits than this marks a query as complex.
const COMPLEXITY_THRESHOLD: usize = 2;

/// Counts keyword occurrences (as substrings, case-insensitive).
pub fn complexity_score(query: &str) -> usize {
    let query = query.to_lowercase();
    COMPLEXITY_KEYWORDS
        .iter()
        .filter(|keyword| query.contains(*keyword))
        .count()
}

pub fn is_complex(query: &str) -> bool {
    complexity_score(query) > COMPLEXITY_THRESHOLD
}

/// Per-invocation switches from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryOptions {
    /// Skip context gathering and use the direct prompt.
    pub direct: bool,
    /// Offer to run the command produced in `command` mode.
    pub execute: bool,
}

pub struct Dispatcher<C: Completer, P: ProcessRunner = SystemProcessRunner> {
    completer: C,
    collector: ContextCollector,
    log: Option<InteractionLog>,
    executor: PlanExecutor<P>,
}

impl<C: Completer> Dispatcher<C, SystemProcessRunner> {
    pub fn new(completer: C, collector: ContextCollector) -> Self {
        Self {
            completer,
            collector,
            log: None,
            executor: PlanExecutor::new(),
        }
    }
}

impl<C: Completer, P: ProcessRunner> Dispatcher<C, P> {
    pub fn with_log(mut self, log: Option<InteractionLog>) -> Self {
        self.log = log;
        self
    }

    /// Replaces the shell runner used for plans and `--execute`.
    pub fn with_runner<Q: ProcessRunner>(self, runner: Q) -> Dispatcher<C, Q> {
        Dispatcher {
            completer: self.completer,
            collector: self.collector,
            log: self.log,
            executor: PlanExecutor::with_runner(runner),
        }
    }

    pub fn completer(&self) -> &C {
        &self.completer
    }

    pub fn runner(&self) -> &P {
        self.executor.runner()
    }

    /// Handles one query end to end.
    ///
    /// # Errors
    ///
    /// Completion failures are returned after being logged; the caller
    /// reports them and exits non-zero. A malformed plan is not an error.
    pub async fn handle_query<W: Write>(
        &self,
        query: &str,
        mode: Mode,
        options: QueryOptions,
        prompter: &mut dyn Prompter,
        out: &mut W,
    ) -> Result<()> {
        let mut mode = mode;
        if mode == Mode::Command && is_complex(query) {
            info!("Query scored {} on complexity", complexity_score(query));
            writeln!(
                out,
                "🤔 This appears to be a complex task. Consider using 'plan' mode for multi-step execution."
            )?;
            out.flush()?;
            if prompter.confirm("🔄 Generate a plan instead? [y/N]: ")? {
                mode = Mode::Plan;
            }
        }

        match mode {
            Mode::Plan => writeln!(out, "📋 Generating step-by-step plan...")?,
            Mode::Explain => writeln!(out, "💡 Analyzing request...")?,
            Mode::Command => {}
        }

        let prompt = if options.direct {
            build_direct_prompt(env::consts::OS, self.collector.shell(), query, mode)
        } else {
            let context = self.collector.collect();
            build_prompt(&context, query, mode)
        };
        debug!("Prompt is {} bytes", prompt.len());

        let request = CompletionRequest::new(prompt, mode, options.direct);
        let response = match self.completer.complete(&request).await {
            Ok(text) => {
                self.record(query, &text, true);
                text
            }
            Err(e) => {
                self.record(query, &e.to_string(), false);
                return Err(e.into());
            }
        };

        match mode {
            Mode::Command => {
                writeln!(out, "{}", response)?;
                if options.execute {
                    out.flush()?;
                    if prompter.confirm("▶️ Run this command? [y/N]: ")? {
                        run_command(self.executor.runner(), &response, out)?;
                    }
                }
            }
            Mode::Plan => {
                writeln!(out, "\n📋 Plan:\n{}", response)?;
                out.flush()?;
                if prompter.confirm("\n🚀 Execute this plan? [y/N]: ")? {
                    if let Some(report) = self.executor.run_plan_text(&response, prompter, out)? {
                        info!(
                            "Plan finished: {} executed, {} skipped, {} failed",
                            report.executed, report.skipped, report.failed
                        );
                    }
                }
            }
            Mode::Explain => {
                writeln!(out, "\n💡 Analysis:\n{}", response)?;
            }
        }

        Ok(())
    }

    fn record(&self, query: &str, response: &str, success: bool) {
        if let Some(log) = &self.log {
            log.record(query, response, success);
        }
    }
}
