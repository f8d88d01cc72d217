//! The `setup` subcommand: store, remove or inspect the API key.

use crate::config::ConfigStore;
use crate::interaction::Prompter;
use anyhow::Result;
use std::io::Write;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupAction {
    /// Store the given key, or prompt for one when `None`.
    Configure(Option<String>),
    Remove,
    Status,
}

/// Runs a setup action. Returns `false` when the key failed validation.
pub fn run_setup<W: Write>(
    store: &ConfigStore,
    action: SetupAction,
    prompter: &mut dyn Prompter,
    out: &mut W,
) -> Result<bool> {
    match action {
        SetupAction::Status => {
            match store.masked_api_key() {
                Some(masked) => {
                    writeln!(out, "✅ API key is configured")?;
                    writeln!(out, "🔑 API Key: {}", masked)?;
                }
                None => {
                    writeln!(out, "❌ API key is not configured")?;
                    writeln!(out, "💡 Run 'sudothink setup' to configure your API key")?;
                }
            }
            Ok(true)
        }
        SetupAction::Remove => {
            if store.remove_api_key()? {
                writeln!(out, "✅ API key removed from configuration")?;
            } else {
                writeln!(out, "ℹ️ No API key was stored in configuration")?;
            }
            Ok(true)
        }
        SetupAction::Configure(api_key) => {
            let api_key = match api_key {
                Some(key) => key,
                None => prompter.ask_secret("Enter your OpenAI API key: ")?,
            };

            match store.set_api_key(&api_key) {
                Ok(()) => {
                    writeln!(out, "✅ API key configured successfully!")?;
                    writeln!(
                        out,
                        "💡 You can now use sudothink without setting OPENAI_API_KEY each time"
                    )?;
                    writeln!(out, "🔒 Your API key is stored in {}", store.config_path().display())?;
                    Ok(true)
                }
                Err(e) if e.is_validation() => {
                    info!("Rejected API key: {}", e);
                    writeln!(out, "❌ Configuration failed: {}", e)?;
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        }
    }
}
