//! Simulation results
//!
//! Per-year ledger records for individual paths, warning tallies, and the
//! aggregated output of a Monte Carlo run.

use serde::{Deserialize, Serialize};

use super::accounts::AccountBucket;

/// State of one simulated path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathPhase {
    /// Before the primary person retires: contributions, no withdrawals
    #[default]
    Accumulating,
    /// Withdrawals cover any shortfall
    Retired,
    /// Portfolio exhausted; balance stays at zero
    Depleted,
}

/// One year of one path
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct YearRecord {
    pub year_index: usize,
    pub calendar_year: i16,
    /// Age of each person during this year
    pub ages: Vec<i16>,
    pub phase: PathPhase,

    // Income
    pub wages: f64,
    pub social_security: f64,
    pub pension: f64,

    // Spending
    pub living_expenses: f64,
    pub medicare_surcharge: f64,

    // Taxes
    pub taxable_income: f64,
    pub taxable_social_security: f64,
    pub magi: f64,
    pub federal_tax: f64,
    /// Long-term capital gains part of `federal_tax`
    pub capital_gains_tax: f64,
    pub state_tax: f64,
    pub fica_tax: f64,
    pub total_tax: f64,
    pub marginal_rate: f64,
    pub effective_rate: f64,

    // Portfolio flows
    pub contributions: f64,
    pub required_distribution: f64,
    /// Moved from tax-deferred to Roth; taxed as ordinary income
    pub roth_conversion: f64,
    pub withdrawal_taxable: f64,
    pub withdrawal_tax_deferred: f64,
    pub withdrawal_roth: f64,
    pub total_withdrawal: f64,
    pub realized_gain: f64,
    /// Surplus cash and excess distributions moved into taxable
    pub reinvested: f64,
    /// Growth lost to tax drag in the taxable bucket
    pub tax_drag: f64,
    pub unmet_spending: f64,

    // Market
    pub portfolio_return: f64,
    pub inflation: f64,

    // End-of-year balances
    pub ending_taxable: f64,
    pub ending_tax_deferred: f64,
    pub ending_roth: f64,
    pub ending_total: f64,
}

/// Category of a non-fatal problem seen during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum WarningKind {
    /// A bucket under the stability floor was treated as exhausted
    NumericInstability { bucket: AccountBucket },
    /// Tax and withdrawal amounts did not settle within the round limit
    GrossUpNotConverged,
}

/// A warning deduplicated by kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationWarning {
    #[serde(flatten)]
    pub kind: WarningKind,
    /// Number of path-years in which it happened
    pub occurrences: u64,
    pub message: String,
}

/// Per-kind warning counters, merged across paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WarningTally {
    pub floored: [u64; 3],
    pub gross_up_not_converged: u64,
}

impl WarningTally {
    pub fn merge(&mut self, other: &WarningTally) {
        for (mine, theirs) in self.floored.iter_mut().zip(other.floored) {
            *mine += theirs;
        }
        self.gross_up_not_converged += other.gross_up_not_converged;
    }

    pub fn is_empty(&self) -> bool {
        self.floored.iter().all(|n| *n == 0) && self.gross_up_not_converged == 0
    }

    pub fn to_warnings(&self) -> Vec<SimulationWarning> {
        let mut warnings: Vec<SimulationWarning> = AccountBucket::WITHDRAWAL_ORDER
            .into_iter()
            .filter(|b| self.floored[b.index()] > 0)
            .map(|bucket| SimulationWarning {
                kind: WarningKind::NumericInstability { bucket },
                occurrences: self.floored[bucket.index()],
                message: format!(
                    "{} balance below the stability floor was treated as exhausted",
                    bucket.label()
                ),
            })
            .collect();
        if self.gross_up_not_converged > 0 {
            warnings.push(SimulationWarning {
                kind: WarningKind::GrossUpNotConverged,
                occurrences: self.gross_up_not_converged,
                message: "tax gross-up did not converge within the round limit".to_string(),
            });
        }
        warnings
    }
}

/// Balance at one percentile for every simulated year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileSeries {
    pub percentile: f64,
    pub balances: Vec<f64>,
}

/// Scalar statistics across completed paths
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SummaryStats {
    pub starting_portfolio: f64,
    pub median_final_balance: f64,
    pub mean_final_balance: f64,
    pub p10_final_balance: f64,
    pub p90_final_balance: f64,
    /// Median final balance in start-year dollars
    pub median_final_balance_real: f64,
    pub depleted_paths: usize,
    /// Median year index of depletion among depleted paths
    pub median_depletion_year: Option<f64>,
}

/// Full ledger of the path closest to a percentile outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepresentativePath {
    pub label: String,
    pub percentile: f64,
    pub path_index: usize,
    pub final_balance: f64,
    pub ledger: Vec<YearRecord>,
}

/// Aggregated output of a Monte Carlo run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Seed used, whether supplied or drawn
    pub seed: u64,
    pub num_paths_requested: usize,
    pub num_paths_completed: usize,
    /// Some batches were skipped by cancellation or the time budget
    pub incomplete: bool,
    pub horizon_years: usize,
    pub calendar_years: Vec<i16>,
    /// Primary person's age in each simulated year
    pub primary_ages: Vec<i16>,
    /// End-of-year total balance at each requested percentile
    pub percentiles: Vec<PercentileSeries>,
    /// Median end-of-year balance in start-year dollars
    pub median_real_balances: Vec<f64>,
    /// Fraction of paths with a positive balance after the final year
    pub success_rate: f64,
    pub summary: SummaryStats,
    pub representative_paths: Vec<RepresentativePath>,
    pub warnings: Vec<SimulationWarning>,
}

impl SimulationResult {
    /// Balances at percentile `p`, if it was requested
    pub fn percentile_series(&self, p: f64) -> Option<&[f64]> {
        self.percentiles
            .iter()
            .find(|s| (s.percentile - p).abs() < 1e-9)
            .map(|s| s.balances.as_slice())
    }

    pub fn median_balances(&self) -> Option<&[f64]> {
        self.percentile_series(50.0)
    }

    pub fn representative(&self, label: &str) -> Option<&RepresentativePath> {
        self.representative_paths.iter().find(|p| p.label == label)
    }
}
