use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use lahan::cli::distribution::DistributionCommand;
use lahan::cli::expense::ExpenseCommand;
use lahan::cli::funding::FundingCommand;
use lahan::cli::ownership::OwnershipCommand;
use lahan::cli::records::RecordsCommand;
use lahan::cli::settings::SettingsCommand;
use lahan::core::log::init_logging;
use lahan::core::model::Id;

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

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Sign in and remember the session
    Login {
        username: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account
    Register {
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign out and forget the session
    Logout,
    /// Show the signed in account
    Whoami,
    /// Display how many shares are left in the pool
    Stock {
        /// Funding being edited; its own shares count as available
        #[arg(long)]
        funding: Option<Id>,
    },
    /// Manage fundings
    #[command(subcommand)]
    Funding(FundingCommand),
    /// Manage ownership stakes
    #[command(subcommand)]
    Ownership(OwnershipCommand),
    /// Manage expenses
    #[command(subcommand)]
    Expense(ExpenseCommand),
    /// Manage profit distributions
    #[command(subcommand)]
    Distribution(DistributionCommand),
    /// Manage the share pool settings
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// Work with any backend collection as raw records
    #[command(subcommand)]
    Records(RecordsCommand),
    /// Display a backend report
    Report { name: String },
}

impl From<Commands> for lahan::AppCommand {
    fn from(cmd: Commands) -> lahan::AppCommand {
        match cmd {
            Commands::Login { username, password } => {
                lahan::AppCommand::Login { username, password }
            }
            Commands::Register {
                username,
                email,
                password,
            } => lahan::AppCommand::Register {
                username,
                email,
                password,
            },
            Commands::Logout => lahan::AppCommand::Logout,
            Commands::Whoami => lahan::AppCommand::Whoami,
            Commands::Stock { funding } => lahan::AppCommand::Stock { funding },
            Commands::Funding(cmd) => lahan::AppCommand::Funding(cmd),
            Commands::Ownership(cmd) => lahan::AppCommand::Ownership(cmd),
            Commands::Expense(cmd) => lahan::AppCommand::Expense(cmd),
            Commands::Distribution(cmd) => lahan::AppCommand::Distribution(cmd),
            Commands::Settings(cmd) => lahan::AppCommand::Settings(cmd),
            Commands::Records(cmd) => lahan::AppCommand::Records(cmd),
            Commands::Report { name } => lahan::AppCommand::Report { name },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => lahan::cli::setup::setup(cli.config_path.as_deref()).map(|path| {
            println!("Created configuration at {}", path.display());
        }),
        Some(cmd) => lahan::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Command failed");
    }
    result
}
