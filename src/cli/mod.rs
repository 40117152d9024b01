//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod context;
pub mod model_list;
pub mod say;
pub mod settings;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::cli::context::ChatContext;
use crate::cli::model_list::list_models;
use crate::cli::say::run_say;
use crate::cli::settings::{SetContext, SettingError, SettingRegistry};
use crate::core::config::{path_display, Config};
use crate::core::transport::event_channel;
use crate::logging::{self, LogTarget};
use crate::ui::chat_loop::{run_chat, ChatExit, ChatHandles};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_DESCRIBE"),
    ", built ",
    env!("VERGEN_BUILD_DATE"),
    " with rustc ",
    env!("VERGEN_RUSTC_SEMVER"),
    ")"
);

#[derive(Parser)]
#[command(name = "causerie")]
#[command(version, long_version = LONG_VERSION)]
#[command(about = "A full-screen terminal client for a self-hosted chat server")]
#[command(
    long_about = "Causerie is a full-screen terminal chat client for a self-hosted chat server. \
Replies stream over a WebSocket when the server offers one and fall back to a single \
HTTP request otherwise.\n\n\
Authentication:\n\
  Use 'causerie login --remember' to keep your password in the system keyring.\n\n\
Controls:\n\
  Enter             Send the message\n\
  Ctrl+J            Insert a new line\n\
  Tab/Shift+Tab     Cycle through the server's models\n\
  Up/Down/PgUp/PgDn Scroll through the conversation\n\
  Ctrl+L            Log out\n\
  Ctrl+C/Esc        Quit\n\n\
Environment Variables:\n\
  CAUSERIE_LOG      Log filter (e.g. 'causerie=debug')"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Chat server base URL (overrides the config file)
    #[arg(short = 's', long, global = true, value_name = "URL")]
    pub server: Option<String>,

    /// Model to select once the server's catalog is loaded
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Write diagnostic logs to this file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Never use the streaming channel; send each message as one HTTP request
    #[arg(long, global = true)]
    pub one_shot: bool,

    /// Log debug output (to stderr for commands without the full-screen UI)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// Send a single prompt and print the reply without the full-screen UI
    Say {
        /// Prompt text
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// List the models offered by the server
    Models,
    /// Log in to the server
    Login {
        /// Store the password in the system keyring
        #[arg(long)]
        remember: bool,
    },
    /// Log out and forget any stored password
    Logout,
    /// Set configuration values, or list them when no key is given
    Set {
        /// Configuration key to set
        key: Option<String>,
        /// Value to set for the key (can be multiple words)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
        /// Value to unset for the key (optional)
        value: Option<String>,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let command = args.command.clone().unwrap_or(Commands::Chat);

    match command {
        Commands::Set { key, value } => return run_set(key, value),
        Commands::Unset { key, value } => return run_unset(&key, value.as_deref()),
        _ => {}
    }

    let ctx = ChatContext::resolve(&args)?;
    let target = match command {
        Commands::Chat => ctx.log_target(&args),
        _ if args.verbose => LogTarget::Stderr,
        _ => ctx.log_target(&args),
    };
    let _log_guard = match logging::init(&target, args.verbose) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("⚠️  Logging disabled: {err}");
            None
        }
    };

    match command {
        Commands::Chat => run_interactive(&ctx).await,
        Commands::Say { prompt } => run_say(&ctx, prompt).await,
        Commands::Models => list_models(&ctx).await,
        Commands::Login { remember } => {
            let logged = ctx.login(remember).await?;
            let name = logged.username.unwrap_or_default();
            println!("✅ Logged in to {} as {name}", ctx.server_url);
            Ok(())
        }
        Commands::Logout => {
            ctx.logout(true).await?;
            println!("👋 Logged out of {}", ctx.server_url);
            Ok(())
        }
        Commands::Set { .. } | Commands::Unset { .. } => Ok(()),
    }
}

async fn run_interactive(ctx: &ChatContext) -> Result<(), Box<dyn Error>> {
    ctx.ensure_session().await?;

    loop {
        let (transport_tx, transport_rx) = event_channel();
        let handles = ChatHandles {
            session: ctx.build_session(transport_tx.clone()),
            client: ctx.client().clone(),
            one_shot: ctx.one_shot_channel(),
            transport_tx,
            transport_rx,
        };

        match run_chat(handles).await? {
            ChatExit::Quit => return Ok(()),
            ChatExit::LoggedOut => {
                ctx.logout(false).await?;
                println!("👋 Logged out of {}", ctx.server_url);
                return Ok(());
            }
            ChatExit::AuthenticationLost => {
                warn!("server rejected the session; logging in again");
                eprintln!("⚠️  The server ended your session. Please log in again.");
                ctx.login(false).await?;
                info!("session restored");
            }
        }
    }
}

fn run_set(key: Option<String>, value: Vec<String>) -> Result<(), Box<dyn Error>> {
    let config_path = Config::config_path()?;
    let registry = SettingRegistry::new();

    let Some(key) = key else {
        let config = Config::load_from_path(&config_path)?;
        println!("📋 Current configuration ({}):", path_display(&config_path));
        for line in registry.format_all(&config) {
            println!("{line}");
        }
        return Ok(());
    };

    let ctx = SetContext {
        config_path: &config_path,
    };
    let result = match registry.get(&key) {
        Some(handler) => handler.set(&value, &ctx),
        None => Err(SettingError::UnknownKey(key)),
    };
    report(result)
}

fn run_unset(key: &str, value: Option<&str>) -> Result<(), Box<dyn Error>> {
    let config_path = Config::config_path()?;
    let registry = SettingRegistry::new();
    let ctx = SetContext {
        config_path: &config_path,
    };
    let result = match registry.get(key) {
        Some(handler) => handler.unset(value, &ctx),
        None => Err(SettingError::UnknownKey(key.to_string())),
    };
    report(result)
}

fn report(result: Result<String, SettingError>) -> Result<(), Box<dyn Error>> {
    match result {
        Ok(message) => {
            println!("{message}");
            Ok(())
        }
        Err(err) => {
            err.print();
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_chat() {
        let args = Args::parse_from(["causerie"]);
        assert!(matches!(args.command.unwrap_or(Commands::Chat), Commands::Chat));
    }

    #[test]
    fn say_collects_the_whole_prompt() {
        let args = Args::parse_from(["causerie", "say", "what", "is", "-2+2?"]);
        match args.command.unwrap_or(Commands::Chat) {
            Commands::Say { prompt } => assert_eq!(prompt.join(" "), "what is -2+2?"),
            _ => panic!("expected say"),
        }
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let args = Args::parse_from(["causerie", "models", "--server", "http://h:1", "--one-shot"]);
        assert_eq!(args.server.as_deref(), Some("http://h:1"));
        assert!(args.one_shot);
    }

    #[test]
    fn set_without_key_lists() {
        let args = Args::parse_from(["causerie", "set"]);
        match args.command.unwrap_or(Commands::Chat) {
            Commands::Set { key, value } => {
                assert!(key.is_none());
                assert!(value.is_empty());
            }
            _ => panic!("expected set"),
        }
    }

    #[test]
    fn login_remember_flag() {
        let args = Args::parse_from(["causerie", "login", "--remember"]);
        assert!(matches!(
            args.command.unwrap_or(Commands::Chat),
            Commands::Login { remember: true }
        ));
    }
}
