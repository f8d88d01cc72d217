//! Prompt construction.

use crate::context::SystemContext;
use std::fmt;
use std::str::FromStr;

const PROMPT_HISTORY_LINES: usize = 5;
const PROMPT_COMMANDS: usize = 20;

/// What the model is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// A single shell command.
    #[default]
    Command,
    /// A JSON array of steps.
    Plan,
    /// A prose explanation.
    Explain,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Command, Mode::Plan, Mode::Explain];

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Command => "command",
            Mode::Plan => "plan",
            Mode::Explain => "explain",
        }
    }

    /// Token ceiling for the completion request.
    pub fn max_tokens(self) -> u32 {
        match self {
            Mode::Command => 500,
            Mode::Plan | Mode::Explain => 1000,
        }
    }

    fn instructions(self) -> &'static str {
        match self {
            Mode::Command => {
                "TASK: Generate a single, valid shell command that accomplishes the user's request.
- Return ONLY the command, no explanations
- Ensure it's compatible with the current OS and shell
- Use available commands when possible
- Consider recent command patterns
"
            }
            Mode::Plan => {
                "TASK: Break down this complex task into a step-by-step plan.
- Return a JSON array of steps
- Each step should have: \"description\", \"command\", \"explanation\"
- Ensure commands are compatible with the current system
"
            }
            Mode::Explain => {
                "TASK: Explain what the user is trying to accomplish and suggest the best approach.
- Provide a clear explanation
- Suggest alternative approaches if applicable
- Include any warnings or considerations
"
            }
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| format!("unknown mode '{}'", s))
    }
}

/// Builds the context-aware prompt for `query`.
pub fn build_prompt(context: &SystemContext, query: &str, mode: Mode) -> String {
    let history_start = context
        .recent_commands
        .len()
        .saturating_sub(PROMPT_HISTORY_LINES);
    let recent = context.recent_commands[history_start..].join("\n");
    let commands: Vec<&str> = context
        .available_commands
        .iter()
        .take(PROMPT_COMMANDS)
        .map(String::as_str)
        .collect();

    format!(
        "You are an advanced terminal assistant for {os} systems.

SYSTEM CONTEXT:
- OS: {os} {os_version}
- Shell: {shell}
- Current directory: {cwd}
- User: {user}
- Home: {home}

RECENT COMMANDS:
{recent}

AVAILABLE COMMANDS (partial list):
{commands}

DIRECTORY STRUCTURE:
{listing}

USER REQUEST: {query}

{instructions}",
        os = context.os,
        os_version = context.os_version,
        shell = context.shell,
        cwd = context.current_dir,
        user = context.user,
        home = context.home,
        recent = recent,
        commands = commands.join(", "),
        listing = context.directory_structure,
        query = query,
        instructions = mode.instructions(),
    )
}

/// Builds a prompt without gathered context, for direct translation.
pub fn build_direct_prompt(os: &str, shell: &str, query: &str, mode: Mode) -> String {
    format!(
        "You are a terminal assistant for {os} systems using {shell}.

USER REQUEST: {query}

{instructions}",
        instructions = mode.instructions(),
    )
}
