//! Core business logic abstractions

pub mod config;
pub mod log;
pub mod pricing;
pub mod rates;

// Re-export main types for cleaner imports
pub use pricing::{Estimate, Estimator, PricingResult, compute_price, parse_amount};
pub use rates::{RateLookup, RateProvider, RateSnapshot};
