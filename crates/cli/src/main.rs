//! kbchat CLI — the main entry point.
//!
//! Commands:
//! - `chat`    — Interactive conversation with the knowledge-base assistant
//! - `ask`     — Answer a single question and exit
//! - `config`  — Show or validate the effective configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "kbchat",
    about = "kbchat — knowledge-base grounded support assistant",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Abort when a configuration layer exists but fails to parse
    #[arg(long, global = true)]
    strict_config: bool,

    /// Environment name (overrides APP_ENV)
    #[arg(long = "env", global = true)]
    environment: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive conversation
    Chat,

    /// Ask a single question
    Ask {
        /// The question to answer
        question: String,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (secrets redacted) and layer report
    Show,
    /// Check that the configuration yields valid settings
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let opts = commands::GlobalOpts {
        strict_config: cli.strict_config,
        environment: cli.environment,
    };

    match cli.command {
        Commands::Chat => commands::chat::run(&opts).await?,
        Commands::Ask { question } => commands::ask::run(&opts, &question).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(&opts)?,
            ConfigAction::Validate => commands::config_cmd::validate(&opts)?,
        },
    }

    Ok(())
}
