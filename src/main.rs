use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use shipquote::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for shipquote::AppCommand {
    fn from(cmd: Commands) -> shipquote::AppCommand {
        match cmd {
            Commands::Bot => shipquote::AppCommand::Bot,
            Commands::Quote { amount } => shipquote::AppCommand::Quote(amount),
            Commands::Rates => shipquote::AppCommand::Rates,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Run the Telegram bot
    Bot,
    /// Estimate the delivered price of an item
    Quote {
        /// Item price in the source currency, `.` or `,` as decimal separator
        #[arg(allow_hyphen_values = true)]
        amount: String,
    },
    /// Show today's exchange rates
    Rates,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => shipquote::cli::setup::setup(),
        Some(cmd) => shipquote::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
