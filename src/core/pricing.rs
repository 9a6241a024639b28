//! Delivery price calculation

use crate::core::config::PricingConfig;
use crate::core::rates::{RateLookup, RateProvider, RateSnapshot};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("not a number")]
    NotANumber,
    #[error("amount must be greater than zero")]
    NotPositive,
}

/// Parses a user supplied price. Both `.` and `,` are accepted as decimal separator.
pub fn parse_amount(text: &str) -> Result<f64, AmountError> {
    let normalized = text.trim().replace(',', ".");
    let amount: f64 = normalized.parse().map_err(|_| AmountError::NotANumber)?;
    if !amount.is_finite() {
        return Err(AmountError::NotANumber);
    }
    if amount <= 0.0 {
        return Err(AmountError::NotPositive);
    }
    Ok(amount)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingResult {
    /// Source amount converted to the domestic currency.
    pub base: f64,
    pub with_markup: f64,
    /// Marked up price expressed in the reference currency.
    pub reference_amount: f64,
    /// Extra tax in the domestic currency, zero when under the threshold.
    pub extra_tax: f64,
    pub total: f64,
    pub tax_applied: bool,
}

/// Computes the delivered price of `amount` source-currency units.
///
/// Returns `None` when rates are unavailable.
pub fn compute_price(
    amount: f64,
    rates: &RateLookup,
    pricing: &PricingConfig,
) -> Option<PricingResult> {
    let snapshot = rates.snapshot()?;
    Some(price_with_snapshot(amount, snapshot, pricing))
}

fn price_with_snapshot(amount: f64, rates: &RateSnapshot, pricing: &PricingConfig) -> PricingResult {
    let base = amount * rates.source_rate;
    let with_markup = base * pricing.markup_factor;
    let reference_amount = with_markup / rates.reference_rate;

    let tax_applied = reference_amount > pricing.tax_threshold;
    let extra_tax = if tax_applied {
        (reference_amount - pricing.tax_threshold) * pricing.tax_rate * rates.reference_rate
    } else {
        0.0
    };

    PricingResult {
        base,
        with_markup,
        reference_amount,
        extra_tax,
        total: with_markup + pricing.fixed_fee + extra_tax,
        tax_applied,
    }
}

/// Rounds to whole units and groups thousands with spaces, e.g. `33 151`.
///
/// Rounding is the same as `{:.0}`, ties go to the even unit.
pub fn format_grouped(value: f64) -> String {
    let digits = format!("{:.0}", value.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }
    if value < 0.0 && digits != "0" {
        format!("-{grouped}")
    } else {
        grouped
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Estimate {
    Priced {
        snapshot: RateSnapshot,
        result: PricingResult,
    },
    RatesUnavailable,
}

/// Prices requests against freshly fetched rates, one fetch per estimate.
#[derive(Clone)]
pub struct Estimator {
    provider: Arc<dyn RateProvider>,
    pricing: PricingConfig,
}

impl Estimator {
    pub fn new(provider: Arc<dyn RateProvider>, pricing: PricingConfig) -> Self {
        Estimator { provider, pricing }
    }

    pub fn pricing(&self) -> &PricingConfig {
        &self.pricing
    }

    pub async fn rates(&self) -> RateLookup {
        self.provider.fetch_rates().await
    }

    #[instrument(name = "Estimate", skip(self))]
    pub async fn estimate(&self, amount: f64) -> Estimate {
        let rates = self.provider.fetch_rates().await;
        match rates {
            RateLookup::Available(snapshot) => {
                let result = price_with_snapshot(amount, &snapshot, &self.pricing);
                debug!(total = result.total, tax = result.tax_applied, "Priced request");
                Estimate::Priced { snapshot, result }
            }
            RateLookup::Unavailable => Estimate::RatesUnavailable,
        }
    }
}
