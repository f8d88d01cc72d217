//! Interactive questions to the user.
//!
//! Business logic never reads stdin directly. It asks a [`Prompter`], which
//! the binary backs with the terminal and tests back with in-memory buffers.

use anyhow::Result;
use dialoguer::Password;
use std::io::{self, BufRead, IsTerminal, Write};
use tracing::debug;

/// Port for yes/no style questions.
pub trait Prompter {
    /// Shows `question` and returns the answer, trimmed and lowercased.
    ///
    /// End of input yields an empty answer, which every caller treats as
    /// the default (no).
    fn ask(&mut self, question: &str) -> Result<String>;

    /// Asks for a secret such as an API key. The answer keeps its case and
    /// is not echoed when a terminal is attached.
    fn ask_secret(&mut self, question: &str) -> Result<String>;

    /// `true` only when the answer is `y`.
    fn confirm(&mut self, question: &str) -> Result<bool> {
        Ok(self.ask(question)? == "y")
    }
}

/// Prompter over any reader/writer pair.
pub struct ConsolePrompter<R, W> {
    input: R,
    output: W,
    hide_secrets: bool,
}

impl<R: BufRead, W: Write> ConsolePrompter<R, W> {
    /// Secrets are read from `input` like any other answer.
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            hide_secrets: false,
        }
    }

    /// Consumes the prompter, returning the writer (for inspecting output in tests).
    pub fn into_output(self) -> W {
        self.output
    }

    fn read_answer(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        let read = self.input.read_line(&mut line)?;
        if read == 0 {
            // Keep the terminal tidy when input is closed.
            writeln!(self.output)?;
        }
        Ok(line.trim().to_string())
    }
}

impl ConsolePrompter<io::StdinLock<'static>, io::Stdout> {
    /// Prompter bound to the process terminal. Secrets are read with echo
    /// off when stdin is a TTY, and from the pipe otherwise.
    pub fn stdio() -> Self {
        let stdin = io::stdin();
        let hide_secrets = stdin.is_terminal();
        Self {
            input: stdin.lock(),
            output: io::stdout(),
            hide_secrets,
        }
    }
}

impl<R: BufRead, W: Write> Prompter for ConsolePrompter<R, W> {
    fn ask(&mut self, question: &str) -> Result<String> {
        let answer = self.read_answer(question)?.to_lowercase();
        debug!("Answer to {:?}: {:?}", question.trim(), answer);
        Ok(answer)
    }

    fn ask_secret(&mut self, question: &str) -> Result<String> {
        if !self.hide_secrets {
            return self.read_answer(question);
        }
        let secret = Password::new()
            .with_prompt(question.trim_end().trim_end_matches(':'))
            .allow_empty_password(true)
            .interact()?;
        Ok(secret.trim().to_string())
    }
}
