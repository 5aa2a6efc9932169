use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use xrate::core::log::init_logging;

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

impl From<Commands> for xrate::AppCommand {
    fn from(cmd: Commands) -> xrate::AppCommand {
        match cmd {
            Commands::Convert { amount, from, to } => {
                xrate::AppCommand::Convert { amount, from, to }
            }
            Commands::Rates { base } => xrate::AppCommand::Rates { base },
            Commands::Trend { from, to, days } => xrate::AppCommand::Trend { from, to, days },
            Commands::Currencies => xrate::AppCommand::Currencies,
            Commands::Signup {
                email,
                name,
                password,
            } => xrate::AppCommand::SignUp {
                email,
                name,
                password,
            },
            Commands::Login { email, password } => xrate::AppCommand::Login { email, password },
            Commands::Logout => xrate::AppCommand::Logout,
            Commands::Whoami => xrate::AppCommand::WhoAmI,
            Commands::Profile { name, avatar_url } => {
                xrate::AppCommand::Profile { name, avatar_url }
            }
            Commands::History { limit } => xrate::AppCommand::History { limit },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Convert an amount between two currencies
    Convert {
        /// Amount to convert (defaults to the configured amount)
        amount: Option<f64>,
        /// Source currency code
        #[arg(short, long)]
        from: Option<String>,
        /// Target currency code
        #[arg(short, long)]
        to: Option<String>,
    },
    /// Show rates from a base currency to the popular currencies
    Rates {
        /// Base currency code
        #[arg(short, long)]
        base: Option<String>,
    },
    /// Show a simulated rate trend for a currency pair
    Trend {
        #[arg(short, long)]
        from: Option<String>,
        #[arg(short, long)]
        to: Option<String>,
        /// Number of days to show
        #[arg(short, long)]
        days: Option<u32>,
    },
    /// List supported currencies
    Currencies,
    /// Create an account
    Signup {
        #[arg(short, long)]
        email: String,
        /// Display name stored with the account
        #[arg(short, long)]
        name: String,
        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign in to an existing account
    Login {
        #[arg(short, long)]
        email: String,
        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Update the profile of the signed-in account
    Profile {
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        avatar_url: Option<String>,
    },
    /// Show recent conversions of the signed-in account
    History {
        /// Maximum number of entries
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => xrate::cli::setup::setup(),
        Some(cmd) => xrate::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
