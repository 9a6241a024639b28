//! Exchange rate abstractions

use async_trait::async_trait;

/// Rates from one feed publication, in domestic currency per one foreign unit.
#[derive(Debug, Clone, PartialEq)]
pub struct RateSnapshot {
    /// Rate of the currency prices are quoted in.
    pub source_rate: f64,
    /// Rate of the currency the tax threshold is expressed in.
    pub reference_rate: f64,
    /// Human readable publication date, e.g. "17 октября 2026".
    pub published: String,
}

/// Outcome of a rate fetch. Either both rates are known or none is.
#[derive(Debug, Clone, PartialEq)]
pub enum RateLookup {
    Available(RateSnapshot),
    Unavailable,
}

impl RateLookup {
    pub fn snapshot(&self) -> Option<&RateSnapshot> {
        match self {
            RateLookup::Available(snapshot) => Some(snapshot),
            RateLookup::Unavailable => None,
        }
    }
}

/// Source of daily exchange rates.
///
/// Implementations never fail: transport and parse problems are logged and
/// reported as [`RateLookup::Unavailable`].
#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn fetch_rates(&self) -> RateLookup;
}
