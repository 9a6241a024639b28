pub mod bot;
pub mod cli;
pub mod core;
pub mod providers;

use crate::core::config::AppConfig;
use crate::core::pricing::{Estimator, parse_amount};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Bot,
    Quote(String),
    Rates,
}

pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load_or_default()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

pub fn build_estimator(config: &AppConfig) -> Estimator {
    let provider = providers::CbrRateProvider::new(config.feed.clone());
    Estimator::new(Arc::new(provider), config.pricing)
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;
    let estimator = build_estimator(&config);

    match command {
        AppCommand::Bot => {
            let token = config.bot_token()?;
            info!("Delivery estimate bot starting...");
            let bot = bot::TelegramBot::new(
                &token,
                estimator,
                &config.feed.reference_currency,
                config.bot.clone(),
            );
            bot.run().await
        }
        AppCommand::Quote(amount) => {
            let amount = parse_amount(&amount)
                .with_context(|| format!("Invalid amount: {amount:?}"))?;
            cli::quote::run_quote(&estimator, amount, &config.feed).await
        }
        AppCommand::Rates => cli::quote::run_rates(&estimator, &config.feed).await,
    }
}
