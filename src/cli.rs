//! Command-line parsing.
//!
//! `setup` and `--help`/`-h` are handled by clap before the query words are
//! looked at. The query is every remaining word; a trailing mode literal
//! (`command`, `plan`, `explain`) selects the mode when at least two words
//! were given.

use crate::prompt::Mode;
use crate::setup::SetupAction;
use clap::{Arg, ArgAction, ArgGroup, ArgMatches, Command};
use std::ffi::OsString;

pub const USAGE: &str = "Usage: sudothink <query> [mode]\nModes: command (default), plan, explain";

/// What the user asked this process to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Setup(SetupAction),
    Query {
        query: String,
        mode: Mode,
        direct: bool,
        execute: bool,
    },
    MissingQuery,
}

pub fn build_cli() -> Command {
    Command::new("sudothink")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Turn natural-language requests into shell commands")
        .long_about(
            "sudothink sends your request, together with a snapshot of the local system, \
             to an OpenAI chat model and prints the shell command it suggests. \
             End the request with 'plan' for a step-by-step plan you can execute, \
             or with 'explain' for an explanation.",
        )
        .override_usage("sudothink [OPTIONS] <QUERY>... [command|plan|explain]\n       sudothink setup [--api-key <KEY> | --remove | --status]")
        .args_conflicts_with_subcommands(true)
        .arg(
            Arg::new("direct")
                .long("direct")
                .help("Skip gathering local context and translate the request directly")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("execute")
                .long("execute")
                .short('x')
                .help("Offer to run the generated command")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("query")
                .help("The request, optionally followed by a mode")
                .num_args(1..)
                .trailing_var_arg(true)
                .allow_hyphen_values(true),
        )
        .subcommand(
            Command::new("setup")
                .about("Configure the OpenAI API key")
                .arg(
                    Arg::new("api-key")
                        .long("api-key")
                        .help("OpenAI API key (prompted for when omitted)")
                        .value_name("KEY")
                        .num_args(1),
                )
                .arg(
                    Arg::new("remove")
                        .long("remove")
                        .help("Remove the stored API key")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("status")
                        .long("status")
                        .help("Show configuration status")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    // `sudothink setup a cron job` is a query, not the subcommand.
                    Arg::new("words")
                        .num_args(1..)
                        .trailing_var_arg(true)
                        .conflicts_with("action")
                        .hide(true),
                )
                .group(
                    ArgGroup::new("action")
                        .args(["api-key", "remove", "status"])
                        .multiple(false),
                ),
        )
}

/// Parses argv (program name included).
///
/// Help and version requests come back as a `clap::Error` whose `exit()`
/// prints the text and exits with status 0.
pub fn parse_invocation<I, T>(args: I) -> Result<Invocation, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = build_cli().try_get_matches_from(args)?;
    Ok(invocation_from_matches(&matches))
}

fn invocation_from_matches(matches: &ArgMatches) -> Invocation {
    if let Some(setup) = matches.subcommand_matches("setup") {
        if let Some(rest) = setup.get_many::<String>("words") {
            let words: Vec<String> = std::iter::once("setup".to_string())
                .chain(rest.cloned())
                .collect();
            return query_invocation(matches, &words);
        }

        let action = if setup.get_flag("status") {
            SetupAction::Status
        } else if setup.get_flag("remove") {
            SetupAction::Remove
        } else {
            SetupAction::Configure(setup.get_one::<String>("api-key").cloned())
        };
        return Invocation::Setup(action);
    }

    let words: Vec<String> = matches
        .get_many::<String>("query")
        .unwrap_or_default()
        .cloned()
        .collect();
    query_invocation(matches, &words)
}

fn query_invocation(matches: &ArgMatches, words: &[String]) -> Invocation {
    match split_query(words) {
        Some((query, mode)) => Invocation::Query {
            query,
            mode,
            direct: matches.get_flag("direct"),
            execute: matches.get_flag("execute"),
        },
        None => Invocation::MissingQuery,
    }
}

/// Splits query words into the request text and its mode.
pub fn split_query(words: &[String]) -> Option<(String, Mode)> {
    let (last, rest) = words.split_last()?;

    if !rest.is_empty() {
        if let Ok(mode) = last.parse::<Mode>() {
            return Some((rest.join(" "), mode));
        }
    }

    let query = words.join(" ");
    if query.trim().is_empty() {
        None
    } else {
        Some((query, Mode::Command))
    }
}
