//! Percentile timelines and summary statistics across completed paths
//!
//! Percentiles use linear interpolation between closest ranks:
//! `rank = p / 100 * (n - 1)`, everywhere.

use crate::model::{PercentileSeries, SummaryStats};
use crate::simulation::PathOutcome;

/// Paths whose ledgers are regenerated for the result, by label
pub const REPRESENTATIVE_PERCENTILES: [(&str, f64); 3] = [("p10", 10.0), ("p50", 50.0), ("p90", 90.0)];

/// Compact per-path output kept after a path finishes
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathSummary {
    pub path_index: usize,
    pub nominal_totals: Vec<f64>,
    pub real_totals: Vec<f64>,
    pub depletion_year: Option<usize>,
}

impl PathSummary {
    pub fn new(path_index: usize, outcome: PathOutcome) -> Self {
        Self {
            path_index,
            nominal_totals: outcome.nominal_totals,
            real_totals: outcome.real_totals,
            depletion_year: outcome.depletion_year,
        }
    }

    pub fn final_balance(&self) -> f64 {
        self.nominal_totals.last().copied().unwrap_or(0.0)
    }

    pub fn final_balance_real(&self) -> f64 {
        self.real_totals.last().copied().unwrap_or(0.0)
    }
}

/// Path chosen to stand for a percentile outcome
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepresentativeChoice {
    pub label: &'static str,
    pub percentile: f64,
    pub path_index: usize,
    pub final_balance: f64,
}

/// Everything aggregation derives from the summaries
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Aggregate {
    pub percentiles: Vec<PercentileSeries>,
    pub median_real_balances: Vec<f64>,
    pub success_rate: f64,
    pub summary: SummaryStats,
    pub representatives: Vec<RepresentativeChoice>,
}

/// Value at percentile `p` (0..=100) of an ascending slice; 0 when empty
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (p / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let weight = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * weight
        }
    }
}

fn sorted(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(f64::total_cmp);
    values
}

/// Aggregate completed paths over `horizon` years
pub fn aggregate(
    summaries: &[PathSummary],
    horizon: usize,
    requested: &[f64],
    starting_portfolio: f64,
) -> Aggregate {
    let n = summaries.len();
    let mut series: Vec<PercentileSeries> = requested
        .iter()
        .map(|&p| PercentileSeries {
            percentile: p,
            balances: Vec::with_capacity(horizon),
        })
        .collect();
    let mut median_real_balances = Vec::with_capacity(horizon);

    let mut column = Vec::with_capacity(n);
    for year in 0..horizon {
        column.clear();
        column.extend(summaries.iter().map(|s| s.nominal_totals.get(year).copied().unwrap_or(0.0)));
        column.sort_by(f64::total_cmp);
        for s in &mut series {
            s.balances.push(percentile(&column, s.percentile));
        }

        column.clear();
        column.extend(summaries.iter().map(|s| s.real_totals.get(year).copied().unwrap_or(0.0)));
        column.sort_by(f64::total_cmp);
        median_real_balances.push(percentile(&column, 50.0));
    }

    let finals = sorted(summaries.iter().map(PathSummary::final_balance).collect());
    let finals_real = sorted(summaries.iter().map(PathSummary::final_balance_real).collect());
    let survivors = finals.iter().filter(|b| **b > 0.0).count();
    let success_rate = if n > 0 {
        survivors as f64 / n as f64
    } else {
        0.0
    };

    let depletion_years = sorted(
        summaries
            .iter()
            .filter_map(|s| s.depletion_year.map(|y| y as f64))
            .collect(),
    );

    let summary = SummaryStats {
        starting_portfolio,
        median_final_balance: percentile(&finals, 50.0),
        mean_final_balance: if n > 0 {
            finals.iter().sum::<f64>() / n as f64
        } else {
            0.0
        },
        p10_final_balance: percentile(&finals, 10.0),
        p90_final_balance: percentile(&finals, 90.0),
        median_final_balance_real: percentile(&finals_real, 50.0),
        depleted_paths: depletion_years.len(),
        median_depletion_year: (!depletion_years.is_empty()).then(|| percentile(&depletion_years, 50.0)),
    };

    let representatives = REPRESENTATIVE_PERCENTILES
        .iter()
        .filter_map(|&(label, p)| {
            let target = percentile(&finals, p);
            closest_to(summaries, target).map(|s| RepresentativeChoice {
                label,
                percentile: p,
                path_index: s.path_index,
                final_balance: s.final_balance(),
            })
        })
        .collect();

    Aggregate {
        percentiles: series,
        median_real_balances,
        success_rate,
        summary,
        representatives,
    }
}

/// Path whose final balance is nearest `target`; ties go to the lowest index
fn closest_to(summaries: &[PathSummary], target: f64) -> Option<&PathSummary> {
    summaries.iter().min_by(|a, b| {
        let da = (a.final_balance() - target).abs();
        let db = (b.final_balance() - target).abs();
        da.total_cmp(&db).then(a.path_index.cmp(&b.path_index))
    })
}
