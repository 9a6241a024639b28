//! Daily exchange rates published by the Central Bank of Russia.

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{error, info, instrument};

use crate::core::config::FeedConfig;
use crate::core::rates::{RateLookup, RateProvider, RateSnapshot};

const MONTHS: [&str; 12] = [
    "января",
    "февраля",
    "марта",
    "апреля",
    "мая",
    "июня",
    "июля",
    "августа",
    "сентября",
    "октября",
    "ноября",
    "декабря",
];

#[derive(Debug, Deserialize)]
struct ValCurs {
    #[serde(rename = "@Date")]
    date: Option<String>,
    #[serde(rename = "Valute", default)]
    valutes: Vec<Valute>,
}

#[derive(Debug, Deserialize)]
struct Valute {
    #[serde(rename = "CharCode")]
    char_code: String,
    #[serde(rename = "Nominal")]
    nominal: String,
    #[serde(rename = "Value")]
    value: String,
}

impl Valute {
    fn rate(&self) -> Result<f64> {
        let nominal: u32 = self
            .nominal
            .trim()
            .parse()
            .with_context(|| format!("Invalid nominal for {}: {}", self.char_code, self.nominal))?;
        if nominal == 0 {
            bail!("Zero nominal for {}", self.char_code);
        }
        let value: f64 = self
            .value
            .trim()
            .replace(',', ".")
            .parse()
            .with_context(|| format!("Invalid value for {}: {}", self.char_code, self.value))?;

        let rate = value / f64::from(nominal);
        if !rate.is_finite() || rate <= 0.0 {
            bail!("Non-positive rate for {}: {}", self.char_code, rate);
        }
        Ok(rate)
    }
}

/// Turns `DD.MM.YYYY` into `D <month> YYYY`.
///
/// An unknown month keeps its number. Anything that is not three dot separated
/// parts with a numeric day is rejected.
pub fn format_published_date(raw: &str) -> Result<String> {
    let parts: Vec<&str> = raw.trim().split('.').collect();
    let [day, month, year] = parts.as_slice() else {
        bail!("Invalid publication date: {}", raw);
    };

    let day: u32 = day
        .trim()
        .parse()
        .with_context(|| format!("Invalid day in publication date: {raw}"))?;
    let month = month
        .parse::<usize>()
        .ok()
        .filter(|m| month.len() == 2 && (1..=12).contains(m))
        .map_or_else(|| month.to_string(), |m| MONTHS[m - 1].to_string());

    Ok(format!("{day} {month} {year}"))
}

/// The feed is served as windows-1251 regardless of what the response headers say.
pub fn decode_feed(bytes: &[u8]) -> String {
    // Every byte maps to a character in windows-1251, so decoding cannot fail
    encoding_rs::WINDOWS_1251
        .decode_without_bom_handling(bytes)
        .0
        .into_owned()
}

/// Extracts the rates of `source` and `reference` currencies from a feed document.
pub fn parse_feed(xml: &str, source: &str, reference: &str) -> Result<RateSnapshot> {
    let doc: ValCurs =
        quick_xml::de::from_str(xml).map_err(|e| anyhow!("Failed to parse rate feed: {}", e))?;

    let mut source_rate = None;
    let mut reference_rate = None;
    for valute in &doc.valutes {
        let code = valute.char_code.trim();
        if code == source {
            source_rate = Some(valute.rate()?);
        } else if code == reference {
            reference_rate = Some(valute.rate()?);
        }
    }

    let raw_date = doc
        .date
        .as_deref()
        .ok_or_else(|| anyhow!("Rate feed has no publication date"))?;
    let published = format_published_date(raw_date)?;

    match (source_rate, reference_rate) {
        (Some(source_rate), Some(reference_rate)) => Ok(RateSnapshot {
            source_rate,
            reference_rate,
            published,
        }),
        (None, _) => Err(anyhow!("Currency {} not found in rate feed", source)),
        (_, None) => Err(anyhow!("Currency {} not found in rate feed", reference)),
    }
}

pub struct CbrRateProvider {
    config: FeedConfig,
}

impl CbrRateProvider {
    pub fn new(config: FeedConfig) -> Self {
        CbrRateProvider { config }
    }

    async fn download(&self) -> Result<String> {
        let client = reqwest::Client::builder()
            .user_agent(self.config.user_agent.as_str())
            .timeout(self.config.timeout())
            .build()?;

        let response = client
            .get(&self.config.url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} URL: {}", e, self.config.url))?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {} URL: {}", response.status(), self.config.url));
        }

        let bytes = response.bytes().await?;
        Ok(decode_feed(&bytes))
    }

    async fn try_fetch(&self) -> Result<RateSnapshot> {
        let text = self.download().await?;
        parse_feed(
            &text,
            &self.config.source_currency,
            &self.config.reference_currency,
        )
    }
}

#[async_trait]
impl RateProvider for CbrRateProvider {
    #[instrument(name = "CbrRateFetch", skip(self), fields(url = %self.config.url))]
    async fn fetch_rates(&self) -> RateLookup {
        match self.try_fetch().await {
            Ok(snapshot) => {
                info!(
                    published = %snapshot.published,
                    "Rates fetched: {} {:.4}, {} {:.4}",
                    self.config.source_currency,
                    snapshot.source_rate,
                    self.config.reference_currency,
                    snapshot.reference_rate
                );
                RateLookup::Available(snapshot)
            }
            Err(e) => {
                error!(error = %e, "Failed to fetch exchange rates");
                RateLookup::Unavailable
            }
        }
    }
}
