//! Plain-text rendering of results for the terminal

use std::fmt::Write;

use nestegg_core::model::{MarketPreset, SimulationResult};
use nestegg_core::{CashflowProjection, ClaimingAgePoint, PresetComparison, RothConversionAnalysis};

/// Years between rows of the balance table
const TABLE_STEP: usize = 5;

/// Format a currency value without cents
pub fn format_currency(value: f64) -> String {
    let dollars = value.abs().round() as i64;

    let digits = dollars.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if value < 0.0 && dollars > 0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

/// Format a currency value in compact form (e.g., $2.1M, $450K, $50)
pub fn format_compact_currency(value: f64) -> String {
    let abs_value = value.abs();
    let sign = if value < 0.0 { "-" } else { "" };

    if abs_value >= 1_000_000.0 {
        format!("{}${:.1}M", sign, abs_value / 1_000_000.0)
    } else if abs_value >= 1_000.0 {
        format!("{}${:.0}K", sign, abs_value / 1_000.0)
    } else {
        format!("{}${:.0}", sign, abs_value)
    }
}

pub fn format_percentage(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

/// Year indices shown in the balance table: every `TABLE_STEP` years plus
/// the final one
fn table_years(horizon: usize) -> Vec<usize> {
    let mut years: Vec<usize> = (0..horizon).step_by(TABLE_STEP).collect();
    if horizon > 0 && years.last() != Some(&(horizon - 1)) {
        years.push(horizon - 1);
    }
    years
}

/// Summary of one Monte Carlo run
pub fn render_summary(result: &SimulationResult) -> String {
    let mut out = String::new();
    let stats = &result.summary;

    let span = match (result.calendar_years.first(), result.calendar_years.last()) {
        (Some(first), Some(last)) => format!(" ({first}-{last})"),
        _ => String::new(),
    };
    let _ = writeln!(
        out,
        "{} paths over {} years{}, seed {}",
        result.num_paths_completed, result.horizon_years, span, result.seed
    );
    if result.incomplete {
        let _ = writeln!(
            out,
            "Stopped early: {} of {} paths completed",
            result.num_paths_completed, result.num_paths_requested
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Starting portfolio:   {}", format_currency(stats.starting_portfolio));
    let _ = writeln!(out, "Success rate:         {}", format_percentage(result.success_rate));
    let _ = writeln!(
        out,
        "Median final balance: {} ({} in today's dollars)",
        format_currency(stats.median_final_balance),
        format_currency(stats.median_final_balance_real)
    );
    let _ = writeln!(
        out,
        "10th / 90th:          {} / {}",
        format_currency(stats.p10_final_balance),
        format_currency(stats.p90_final_balance)
    );
    match stats.median_depletion_year {
        Some(year) => {
            let _ = writeln!(
                out,
                "Depleted paths:       {} (median year {:.0})",
                stats.depleted_paths,
                year + 1.0
            );
        }
        None => {
            let _ = writeln!(out, "Depleted paths:       0");
        }
    }

    if !result.percentiles.is_empty() {
        let _ = writeln!(out);
        let _ = write!(out, "{:>6} {:>5}", "Year", "Age");
        for series in &result.percentiles {
            let _ = write!(out, " {:>10}", format!("P{:.0}", series.percentile));
        }
        let _ = writeln!(out);

        for year in table_years(result.horizon_years) {
            let calendar = result.calendar_years.get(year).copied().unwrap_or_default();
            let age = result.primary_ages.get(year).copied().unwrap_or_default();
            let _ = write!(out, "{calendar:>6} {age:>5}");
            for series in &result.percentiles {
                let balance = series.balances.get(year).copied().unwrap_or_default();
                let _ = write!(out, " {:>10}", format_compact_currency(balance));
            }
            let _ = writeln!(out);
        }
    }

    if !result.warnings.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Warnings:");
        for warning in &result.warnings {
            let _ = writeln!(out, "  {} ({} path-years)", warning.message, warning.occurrences);
        }
    }

    out
}

/// Table of preset comparison outcomes
pub fn render_comparison(comparisons: &[PresetComparison]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<14} {:>6} {:>8} {:>8} {:>8} {:>14}",
        "Preset", "Stock", "Return", "StdDev", "Success", "Median final"
    );
    for c in comparisons {
        let _ = writeln!(
            out,
            "{:<14} {:>6} {:>8} {:>8} {:>8} {:>14}",
            c.preset.name(),
            format_percentage(c.allocation.stock),
            format_percentage(c.expected_return),
            format_percentage(c.volatility),
            format_percentage(c.result.success_rate),
            format_currency(c.result.summary.median_final_balance),
        );
    }
    out
}

/// Table of every market preset with its portfolio statistics
pub fn render_presets() -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<14} {:>8} {:>8} {:>10}  {}",
        "Preset", "Return", "StdDev", "Naive SD", "Allocation"
    );
    for preset in MarketPreset::ALL {
        let market = preset.assumptions();
        let _ = writeln!(
            out,
            "{:<14} {:>8} {:>8} {:>10}  {}",
            preset.name(),
            format_percentage(market.portfolio_mean()),
            format_percentage(market.portfolio_std_dev()),
            format_percentage(market.naive_std_dev()),
            preset.description(),
        );
    }
    out
}

/// Table of claiming-age outcomes, one row per person and age
pub fn render_claiming(points: &[ClaimingAgePoint]) -> String {
    let mut out = String::new();
    if points.is_empty() {
        let _ = writeln!(out, "No one in the household draws Social Security");
        return out;
    }
    let _ = writeln!(
        out,
        "{:<12} {:>4} {:>10} {:>8} {:>14}",
        "Person", "Age", "Monthly", "Success", "Median final"
    );
    for p in points {
        let _ = writeln!(
            out,
            "{:<12} {:>4} {:>10} {:>8} {:>14}",
            p.person,
            p.claiming_age,
            format_currency(p.monthly_benefit),
            format_percentage(p.success_rate),
            format_currency(p.median_final_balance),
        );
    }
    out
}

/// Baseline and converted outcomes side by side
pub fn render_roth_conversion(analysis: &RothConversionAnalysis) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Converting {} a year for {} retired years",
        format_currency(analysis.conversion.annual_amount),
        analysis.conversion.years
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "{:<12} {:>8} {:>14}", "", "Success", "Median final");
    for (label, result) in [("Baseline", &analysis.baseline), ("Converted", &analysis.converted)] {
        let _ = writeln!(
            out,
            "{:<12} {:>8} {:>14}",
            label,
            format_percentage(result.success_rate),
            format_currency(result.summary.median_final_balance),
        );
    }
    let _ = writeln!(
        out,
        "{:<12} {:>8} {:>14}",
        "Change",
        format_percentage(analysis.success_rate_change()),
        format_currency(analysis.median_final_balance_change()),
    );
    out
}

/// Every year of a deterministic projection
pub fn render_cashflow(projection: &CashflowProjection) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>6} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "Year", "Income", "Spending", "Tax", "Withdrawn", "Converted", "Balance"
    );
    for y in &projection.ledger {
        let _ = writeln!(
            out,
            "{:>6} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
            y.calendar_year,
            format_compact_currency(y.wages + y.social_security + y.pension),
            format_compact_currency(y.living_expenses),
            format_compact_currency(y.total_tax + y.medicare_surcharge),
            format_compact_currency(y.total_withdrawal),
            format_compact_currency(y.roth_conversion),
            format_compact_currency(y.ending_total),
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Final balance: {} ({} in today's dollars)",
        format_currency(projection.final_balance),
        format_currency(projection.final_real_balance)
    );
    let _ = writeln!(out, "Lifetime tax:  {}", format_currency(projection.total_tax));
    if let Some(year) = projection.depletion_year {
        let _ = writeln!(out, "Depleted in year {}", year + 1);
    }
    out
}
