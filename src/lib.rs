//! SudoThink - natural-language shell assistant library.
//!
//! This library turns a request such as "find files larger than 100MB" into
//! a shell command, a multi-step plan, or an explanation by asking an OpenAI
//! chat model. It supports:
//!
//! - **Context-aware prompts** built from the OS, shell, working directory,
//!   available commands and recent shell history
//! - **Plan execution** with a confirmation before every step and a retry
//!   path for failed steps
//! - **Key management** with a permission-restricted config file
//!
//! # Architecture
//!
//! - [`cli`] - Argument parsing into an [`cli::Invocation`]
//! - [`dispatcher`] - Runs one query end to end
//! - [`config`] - API key storage
//! - [`context`] - Local system context gathering
//! - [`prompt`] - Prompt templates per [`prompt::Mode`]
//! - [`llm_client`] - Chat-completion client
//! - [`http_client`] - HTTP client abstraction
//! - [`executor`] - Shell execution of commands and plans
//! - [`interaction`] - User confirmation port
//! - [`interaction_log`] - Append-only query log
//! - [`setup`] - The `setup` subcommand
//! - [`providers`] - Shared dependency injection traits
//! - [`error`] - Typed errors
//!
//! # Example
//!
//! ```ignore
//! use sudothink::context::ContextCollector;
//! use sudothink::dispatcher::{Dispatcher, QueryOptions};
//! use sudothink::interaction::ConsolePrompter;
//! use sudothink::llm_client::OpenAiClient;
//! use sudothink::prompt::Mode;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let dispatcher = Dispatcher::new(OpenAiClient::new("sk-..."), ContextCollector::from_env());
//!     let mut prompter = ConsolePrompter::stdio();
//!
//!     dispatcher
//!         .handle_query("compress the logs folder", Mode::Command, QueryOptions::default(), &mut prompter, &mut std::io::stdout())
//!         .await
//! }
//! ```

pub mod cli;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod http_client;
pub mod interaction;
pub mod interaction_log;
pub mod llm_client;
pub mod prompt;
pub mod providers;
pub mod setup;
