use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::core::report::{ChargingRecommendation, DailyPriceSummary};

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.enforce_styling();
    table
}

/// Hourly prices, colored against the daily average.
#[must_use]
pub fn build_prices_table(summary: &DailyPriceSummary) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Hour", "Price"]);
    for report in &summary.hourly_prices {
        let color = if report.price_eur_kwh == summary.min_price {
            Color::Green
        } else if report.price_eur_kwh == summary.max_price {
            Color::Red
        } else if report.price_eur_kwh <= summary.average_price {
            Color::DarkGreen
        } else {
            Color::DarkYellow
        };
        table.add_row(vec![
            Cell::new(&report.hour),
            Cell::new(report.price_eur_kwh).set_alignment(CellAlignment::Right).fg(color),
        ]);
    }
    table.add_row(vec![
        Cell::new("Average").add_attribute(Attribute::Dim),
        Cell::new(summary.average_price)
            .set_alignment(CellAlignment::Right)
            .add_attribute(Attribute::Dim),
    ]);
    table
}

#[must_use]
pub fn build_recommendation_table(recommendation: &ChargingRecommendation) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Date", "Hours", "Average price", "Total cost"]);
    table.add_row(vec![
        Cell::new(recommendation.query_date),
        Cell::new(recommendation.recommended_hours.join(", ")).fg(Color::Green),
        Cell::new(recommendation.average_price_eur_kwh).set_alignment(CellAlignment::Right),
        Cell::new(recommendation.total_cost_eur).set_alignment(CellAlignment::Right),
    ]);
    table
}
