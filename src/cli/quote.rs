use super::ui::{self, StyleType};
use crate::core::config::{FeedConfig, PricingConfig};
use crate::core::pricing::{Estimate, Estimator, PricingResult, format_grouped};
use crate::core::rates::{RateLookup, RateSnapshot};
use anyhow::Result;
use comfy_table::{Cell, Table};

const UNAVAILABLE: &str = "Exchange rates are unavailable right now, try again later.";

fn rates_table(snapshot: &RateSnapshot, feed: &FeedConfig) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Currency"), ui::header_cell("RUB per unit")]);
    table.add_row(vec![
        Cell::new(&feed.source_currency),
        ui::amount_cell(format!("{:.4}", snapshot.source_rate)),
    ]);
    table.add_row(vec![
        Cell::new(&feed.reference_currency),
        ui::amount_cell(format!("{:.4}", snapshot.reference_rate)),
    ]);
    table
}

fn quote_table(
    amount: f64,
    result: &PricingResult,
    pricing: &PricingConfig,
    feed: &FeedConfig,
) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Step"), ui::header_cell("Amount")]);

    let rows = [
        (
            format!("Price, {}", feed.source_currency),
            format!("{amount:.2}"),
        ),
        ("Converted, RUB".to_string(), format_grouped(result.base)),
        (
            format!("With markup x{}, RUB", pricing.markup_factor),
            format_grouped(result.with_markup),
        ),
        (
            format!("In {}", feed.reference_currency),
            format!("{:.0}", result.reference_amount),
        ),
        ("Delivery fee, RUB".to_string(), format_grouped(pricing.fixed_fee)),
        ("Extra tax, RUB".to_string(), format_grouped(result.extra_tax)),
    ];
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), ui::amount_cell(value)]);
    }
    table
}

/// Prints the current rates of the configured currencies.
pub async fn run_rates(estimator: &Estimator, feed: &FeedConfig) -> Result<()> {
    let pb = ui::new_spinner("Fetching exchange rates...");
    let rates = estimator.rates().await;
    pb.finish_and_clear();

    match rates {
        RateLookup::Available(snapshot) => {
            println!(
                "{}",
                ui::style_text(&format!("Rates on {}", snapshot.published), StyleType::Title)
            );
            println!("{}", rates_table(&snapshot, feed));
        }
        RateLookup::Unavailable => {
            println!("{}", ui::style_text(UNAVAILABLE, StyleType::Error));
        }
    }
    Ok(())
}

/// Prints the delivery estimate for `amount` with every pricing step.
pub async fn run_quote(estimator: &Estimator, amount: f64, feed: &FeedConfig) -> Result<()> {
    let pb = ui::new_spinner("Fetching exchange rates...");
    let estimate = estimator.estimate(amount).await;
    pb.finish_and_clear();

    let (snapshot, result) = match estimate {
        Estimate::Priced { snapshot, result } => (snapshot, result),
        Estimate::RatesUnavailable => {
            println!("{}", ui::style_text(UNAVAILABLE, StyleType::Error));
            return Ok(());
        }
    };

    println!(
        "{}",
        ui::style_text(&format!("Rates on {}", snapshot.published), StyleType::Subtle)
    );
    println!("{}", quote_table(amount, &result, estimator.pricing(), feed));
    println!(
        "{} {}",
        ui::style_text("Total:", StyleType::TotalLabel),
        ui::style_text(&format!("{} RUB", format_grouped(result.total)), StyleType::TotalValue)
    );
    if result.tax_applied {
        println!(
            "{}",
            ui::style_text(
                &format!(
                    "Includes {:.0}% tax on the part above {:.0} {}",
                    estimator.pricing().tax_rate * 100.0,
                    estimator.pricing().tax_threshold,
                    feed.reference_currency
                ),
                StyleType::Subtle
            )
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::compute_price;

    fn snapshot() -> RateSnapshot {
        RateSnapshot {
            source_rate: 12.5,
            reference_rate: 95.0,
            published: "17 октября 2026".to_string(),
        }
    }

    #[test]
    fn test_rates_table_lists_both_currencies() {
        let rendered = rates_table(&snapshot(), &FeedConfig::default()).to_string();
        assert!(rendered.contains("CNY"));
        assert!(rendered.contains("12.5000"));
        assert!(rendered.contains("EUR"));
        assert!(rendered.contains("95.0000"));
    }

    #[test]
    fn test_quote_table_shows_breakdown() {
        let pricing = PricingConfig::default();
        let rates = RateLookup::Available(snapshot());
        let result = compute_price(2000.0, &rates, &pricing).unwrap();

        let rendered = quote_table(2000.0, &result, &pricing, &FeedConfig::default()).to_string();
        assert!(rendered.contains("Price, CNY"));
        assert!(rendered.contains("25 000"));
        assert!(rendered.contains("30 000"));
        assert!(rendered.contains("316"));
        assert!(rendered.contains("1 500"));
        assert!(rendered.contains("1 650"));
    }
}
