use std::io;
use std::process::ExitCode;

use sudothink::cli::{self, Invocation, USAGE};
use sudothink::config::ConfigStore;
use sudothink::context::ContextCollector;
use sudothink::dispatcher::{Dispatcher, QueryOptions};
use sudothink::interaction::ConsolePrompter;
use sudothink::interaction_log::InteractionLog;
use sudothink::llm_client::{Completer, MockCompleter, OpenAiClient};
use sudothink::setup;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Diagnostics go to stderr; stdout carries the generated command.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let invocation = match cli::parse_invocation(std::env::args_os()) {
        Ok(invocation) => invocation,
        // Usage errors exit with 1; help and version keep clap's 0.
        Err(e) if e.use_stderr() => {
            e.print()?;
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => e.exit(),
    };

    let store = ConfigStore::load()?;

    match invocation {
        Invocation::Setup(action) => {
            let mut prompter = ConsolePrompter::stdio();
            let ok = setup::run_setup(&store, action, &mut prompter, &mut io::stdout())?;
            Ok(exit_code(ok))
        }
        Invocation::MissingQuery => {
            println!("❌ {}", USAGE);
            Ok(ExitCode::FAILURE)
        }
        Invocation::Query {
            query,
            mode,
            direct,
            execute,
        } => {
            let completer: Box<dyn Completer> = if MockCompleter::is_enabled() {
                Box::new(MockCompleter::new())
            } else if let Some(api_key) = store.get_api_key() {
                Box::new(OpenAiClient::new(api_key))
            } else {
                println!("❌ OpenAI API key not configured.");
                println!(
                    "💡 Run 'sudothink setup' to configure your API key once, or set OPENAI_API_KEY environment variable."
                );
                return Ok(ExitCode::FAILURE);
            };

            let log = match InteractionLog::open_default() {
                Ok(log) => Some(log),
                Err(e) => {
                    warn!("Interaction log disabled: {}", e);
                    None
                }
            };

            info!("Processing query {:?} in {} mode", query, mode);
            let dispatcher = Dispatcher::new(completer, ContextCollector::from_env()).with_log(log);
            let mut prompter = ConsolePrompter::stdio();
            let options = QueryOptions { direct, execute };

            match dispatcher
                .handle_query(&query, mode, options, &mut prompter, &mut io::stdout())
                .await
            {
                Ok(()) => Ok(ExitCode::SUCCESS),
                Err(e) => {
                    println!("❌ {}", e);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
