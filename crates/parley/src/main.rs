// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parley - a chat-to-LLM conversational bridge.
//!
//! This is the binary entry point.

mod inspect;
mod models;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use parley_config::ParleyConfig;
use parley_core::ParleyError;

/// Parley - a chat-to-LLM conversational bridge.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the bridge: long-poll Telegram and answer messages.
    Serve,
    /// List stored conversation threads.
    Threads {
        /// Only threads of this chat.
        #[arg(long)]
        chat: Option<i64>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Print the most recent messages of a thread, oldest first.
    History {
        #[arg(long)]
        chat: i64,
        /// Topic to read; defaults to the chat's current topic.
        #[arg(long)]
        topic: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Case-insensitive search over a chat's messages, newest first.
    Search {
        keyword: String,
        #[arg(long)]
        chat: i64,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Inspect or refresh the model catalog.
    Models {
        #[command(subcommand)]
        action: ModelsCommand,
    },
    /// Manage Parley configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ModelsCommand {
    /// Print the catalog.
    List,
    /// Probe the seed models and replace the catalog with those that answer.
    Sync,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate the configuration and print a summary.
    Check,
}

#[derive(clap::Args, Debug, Clone, Copy)]
struct OutputArgs {
    /// Print JSON instead of text.
    #[arg(long)]
    json: bool,
    /// Disable colors.
    #[arg(long)]
    plain: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => parley_config::load_and_validate_path(path),
        None => parley_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            parley_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.agent.log_level);

    if let Err(e) = run(cli.command, config).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Option<Commands>, config: ParleyConfig) -> Result<(), ParleyError> {
    match command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Threads { chat, output }) => {
            inspect::run_threads(&config, chat, output.json, output.plain).await
        }
        Some(Commands::History {
            chat,
            topic,
            limit,
            output,
        }) => inspect::run_history(&config, chat, topic, limit, output.json, output.plain).await,
        Some(Commands::Search {
            keyword,
            chat,
            limit,
            output,
        }) => inspect::run_search(&config, chat, &keyword, limit, output.json, output.plain).await,
        Some(Commands::Models { action }) => match action {
            ModelsCommand::List => models::run_list(&config).await,
            ModelsCommand::Sync => models::run_sync(&config).await,
        },
        Some(Commands::Config {
            action: ConfigCommand::Check,
        }) => {
            print!("{}", config_summary(&config));
            Ok(())
        }
        None => {
            println!("parley: use --help for available commands");
            Ok(())
        }
    }
}

/// Logs go to stderr so that listing commands keep stdout clean.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("parley={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Human-readable summary of a validated configuration. Secrets are never printed.
fn config_summary(config: &ParleyConfig) -> String {
    let credentials = [&config.completion.api_key, &config.completion.fallback_api_key]
        .into_iter()
        .flatten()
        .filter(|k| !k.trim().is_empty())
        .count();
    let allowed = if config.telegram.allowed_chats.is_empty() {
        "all".to_string()
    } else {
        config
            .telegram
            .allowed_chats
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };
    let agents = if config.agents.is_empty() {
        config.agent.default_agent.clone()
    } else {
        config
            .agents
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "config OK\n\
         \x20 telegram token:   {}\n\
         \x20 allowed chats:    {allowed}\n\
         \x20 credentials:      {credentials}{}\n\
         \x20 endpoint:         {}\n\
         \x20 default model:    {}\n\
         \x20 agents:           {agents}\n\
         \x20 languages:        {}\n\
         \x20 database:         {}\n\
         \x20 usage log:        {}\n\
         \x20 model catalog:    {}\n",
        if config.telegram.bot_token.is_some() { "set" } else { "missing" },
        if credentials == 0 { " (auto-replies disabled)" } else { "" },
        config.completion.base_url,
        config.completion.default_model,
        config.agent.languages.join(", "),
        config.storage.database_path,
        config.cost.usage_log_path,
        config.completion.model_catalog_path,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["parley", "search", "borrow", "--chat", "42", "--json"]).unwrap();
        match cli.command {
            Some(Commands::Search {
                keyword,
                chat,
                limit,
                output,
            }) => {
                assert_eq!(keyword, "borrow");
                assert_eq!(chat, 42);
                assert_eq!(limit, 20);
                assert!(output.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::try_parse_from(["parley", "--config", "/tmp/p.toml", "models", "sync"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/p.toml")));
        assert!(matches!(
            cli.command,
            Some(Commands::Models {
                action: ModelsCommand::Sync
            })
        ));
    }

    #[test]
    fn history_requires_chat() {
        assert!(Cli::try_parse_from(["parley", "history"]).is_err());
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = parley_config::load_and_validate_str("").expect("default config should be valid");
        assert_eq!(config.agent.name, "parley");
    }

    #[test]
    fn config_summary_hides_secrets() {
        let mut config = ParleyConfig::default();
        config.telegram.bot_token = Some("123:secret-token".into());
        config.completion.api_key = Some("sk-very-secret".into());
        config.telegram.allowed_chats = vec![7, 9];

        let summary = config_summary(&config);
        assert!(summary.starts_with("config OK"));
        assert!(summary.contains("telegram token:   set"));
        assert!(summary.contains("allowed chats:    7, 9"));
        assert!(summary.contains("credentials:      1\n"));
        assert!(!summary.contains("secret"));
    }

    #[test]
    fn config_summary_flags_missing_credentials() {
        let summary = config_summary(&ParleyConfig::default());
        assert!(summary.contains("telegram token:   missing"));
        assert!(summary.contains("(auto-replies disabled)"));
    }
}
