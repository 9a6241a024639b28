use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{env, fs, path::PathBuf};
use tracing::debug;

/// Environment variable that overrides `bot.token` from the config file.
pub const TOKEN_ENV_VAR: &str = "SHIPQUOTE_BOT_TOKEN";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct FeedConfig {
    pub url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Currency the customer quotes prices in (rate A).
    pub source_currency: String,
    /// Currency the tax threshold is expressed in (rate B).
    pub reference_currency: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig {
            url: "https://www.cbr.ru/scripts/XML_daily.asp".to_string(),
            timeout_secs: 10,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
            source_currency: "CNY".to_string(),
            reference_currency: "EUR".to_string(),
        }
    }
}

impl FeedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct PricingConfig {
    /// Flat delivery fee in the domestic currency.
    pub fixed_fee: f64,
    /// Multiplier applied to the converted price, 1.20 is a 20% markup.
    pub markup_factor: f64,
    /// Reference-currency value above which the extra tax is charged.
    pub tax_threshold: f64,
    /// Fraction of the excess over `tax_threshold` charged as tax.
    pub tax_rate: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        PricingConfig {
            fixed_fee: 1500.0,
            markup_factor: 1.20,
            tax_threshold: 200.0,
            tax_rate: 0.15,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct BotConfig {
    pub token: Option<String>,
    pub operator_username: String,
    pub guide_url: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        BotConfig {
            token: None,
            operator_username: "POIZONDPR".to_string(),
            guide_url: "https://t.me/poizondn/5".to_string(),
        }
    }
}

impl BotConfig {
    pub fn operator_url(&self) -> String {
        format!("https://t.me/{}", self.operator_username)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub feed: FeedConfig,
    pub pricing: PricingConfig,
    pub bot: BotConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Loads the default config file, or the built-in defaults when none exists yet.
    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(path = %config_path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "shipquote", "shipquote")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config = Self::from_yaml(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // serde_yaml treats an empty document as null rather than an empty map
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Bot token from the environment, falling back to the config file.
    pub fn bot_token(&self) -> Result<String> {
        env::var(TOKEN_ENV_VAR)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.bot.token.clone().filter(|t| !t.trim().is_empty()))
            .with_context(|| {
                format!("Bot token is not set. Set {TOKEN_ENV_VAR} or `bot.token` in the config file")
            })
    }
}
