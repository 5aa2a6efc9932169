pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::cli::{AppContext, parse_code};
use crate::core::config::AppConfig;
use crate::core::profile::ProfileUpdate;
use crate::core::trend::DEFAULT_TREND_DAYS;
use anyhow::Result;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Convert {
        amount: Option<f64>,
        from: Option<String>,
        to: Option<String>,
    },
    Rates {
        base: Option<String>,
    },
    Trend {
        from: Option<String>,
        to: Option<String>,
        days: Option<u32>,
    },
    Currencies,
    SignUp {
        email: String,
        name: String,
        password: Option<String>,
    },
    Login {
        email: String,
        password: Option<String>,
    },
    Logout,
    WhoAmI,
    Profile {
        name: Option<String>,
        avatar_url: Option<String>,
    },
    History {
        limit: Option<usize>,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("xrate starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let context = AppContext::build(config).await?;
    let defaults = context.config.defaults.clone();

    match command {
        AppCommand::Convert { amount, from, to } => {
            let from = parse_code(from.as_deref().unwrap_or(&defaults.from))?;
            let to = parse_code(to.as_deref().unwrap_or(&defaults.to))?;
            let amount = amount.unwrap_or(defaults.amount);
            cli::convert::run(&context, amount, &from, &to).await
        }
        AppCommand::Rates { base } => {
            let base = parse_code(base.as_deref().unwrap_or(&defaults.from))?;
            cli::rates::run(&context, &base).await
        }
        AppCommand::Trend { from, to, days } => {
            let from = parse_code(from.as_deref().unwrap_or(&defaults.from))?;
            let to = parse_code(to.as_deref().unwrap_or(&defaults.to))?;
            cli::trend::run(&context, &from, &to, days.unwrap_or(DEFAULT_TREND_DAYS)).await
        }
        AppCommand::Currencies => {
            cli::currencies::run();
            Ok(())
        }
        AppCommand::SignUp {
            email,
            name,
            password,
        } => cli::account::sign_up(&context, &email, &name, password).await,
        AppCommand::Login { email, password } => {
            cli::account::login(&context, &email, password).await
        }
        AppCommand::Logout => cli::account::logout(&context).await,
        AppCommand::WhoAmI => cli::account::whoami(&context).await,
        AppCommand::Profile { name, avatar_url } => {
            cli::account::update_profile(&context, ProfileUpdate { name, avatar_url }).await
        }
        AppCommand::History { limit } => {
            cli::history::run(
                &context,
                limit.unwrap_or(cli::history::DEFAULT_HISTORY_LIMIT),
            )
            .await
        }
    }
}
