use crate::model::{Balances, PathPhase, SpendingModel, WarningTally, YearRecord};
use crate::taxes::apply_tax_drag;

/// Retirement spending carried from year to year
#[derive(Debug, Clone, Copy)]
pub struct SpendingState {
    pub model: SpendingModel,
    /// Nominal spending for the current year
    pub annual: f64,
    /// Withdrawal rate in the first retirement year
    pub initial_rate: f64,
    started: bool,
}

impl SpendingState {
    pub fn new(model: SpendingModel) -> Self {
        Self {
            model,
            annual: 0.0,
            initial_rate: 0.0,
            started: false,
        }
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Spending for the first retirement year.
    ///
    /// `baseline` is the profile's expenses in current dollars; a withdrawal
    /// rate, when given, replaces it with a share of `portfolio`.
    pub fn start(&mut self, baseline: f64, withdrawal_rate: Option<f64>, portfolio: f64) -> f64 {
        self.started = true;
        self.annual = match withdrawal_rate {
            Some(rate) => rate * portfolio,
            None => baseline,
        };
        self.initial_rate = if portfolio > 0.0 {
            self.annual / portfolio
        } else {
            0.0
        };
        self.annual
    }

    /// Spending for each later retirement year
    pub fn advance(&mut self, prior_inflation: f64, portfolio: f64) -> f64 {
        match self.model {
            SpendingModel::ConstantReal => {
                self.annual *= 1.0 + prior_inflation;
            }
            SpendingModel::FixedPercentage => {
                self.annual = self.initial_rate * portfolio.max(0.0);
            }
            SpendingModel::Guardrails {
                upper,
                lower,
                adjustment,
            } => {
                self.annual *= 1.0 + prior_inflation;
                if portfolio > 0.0 && self.initial_rate > 0.0 {
                    let rate = self.annual / portfolio;
                    if rate > self.initial_rate * (1.0 + upper) {
                        self.annual *= 1.0 - adjustment;
                    } else if rate < self.initial_rate * (1.0 - lower) {
                        self.annual *= 1.0 + adjustment;
                    }
                }
            }
        }
        self.annual = self.annual.max(0.0);
        self.annual
    }
}

/// Mutable state of one simulated path
#[derive(Debug, Clone)]
pub struct SimulationPath {
    pub balances: Balances,
    pub phase: PathPhase,
    pub spending: SpendingState,
    /// Retired years simulated so far
    pub retired_years: usize,
    /// Cumulative inflation from the start date to the start of this year
    pub price_index: f64,
    /// Inflation of the year just finished
    pub prior_inflation: f64,
    /// Price index when each person's pension began
    pub pension_base_index: [Option<f64>; 2],
    pub depletion_year: Option<usize>,
    pub warnings: WarningTally,
    /// End-of-year total balance, nominal
    pub nominal_totals: Vec<f64>,
    /// End-of-year total balance in start-year dollars
    pub real_totals: Vec<f64>,
    pub ledger: Option<Vec<YearRecord>>,
}

impl SimulationPath {
    pub fn new(
        balances: Balances,
        spending_model: SpendingModel,
        horizon: usize,
        record_ledger: bool,
    ) -> Self {
        Self {
            balances,
            phase: PathPhase::Accumulating,
            spending: SpendingState::new(spending_model),
            retired_years: 0,
            price_index: 1.0,
            prior_inflation: 0.0,
            pension_base_index: [None; 2],
            depletion_year: None,
            warnings: WarningTally::default(),
            nominal_totals: Vec::with_capacity(horizon),
            real_totals: Vec::with_capacity(horizon),
            ledger: record_ledger.then(|| Vec::with_capacity(horizon)),
        }
    }

    #[inline]
    pub fn is_depleted(&self) -> bool {
        self.phase == PathPhase::Depleted
    }

    /// Enter the absorbing zero state
    pub fn mark_depleted(&mut self, year: usize) {
        self.phase = PathPhase::Depleted;
        self.balances.clear();
        self.depletion_year.get_or_insert(year);
    }

    /// Grow every bucket by `annual_return`, with tax drag on the taxable
    /// bucket. Returns the growth lost to drag.
    pub fn apply_growth(&mut self, annual_return: f64, drag_rate: f64) -> f64 {
        let taxable_return = apply_tax_drag(annual_return, drag_rate);
        let drag = self.balances.taxable * (annual_return - taxable_return);
        self.balances.taxable *= (1.0 + taxable_return).max(0.0);
        self.balances.tax_deferred *= (1.0 + annual_return).max(0.0);
        self.balances.roth *= (1.0 + annual_return).max(0.0);
        self.balances.floor_at_zero();
        drag
    }

    /// Record the year's closing totals and roll inflation forward
    pub fn close_year(&mut self, inflation: f64) {
        let total = if self.is_depleted() {
            0.0
        } else {
            self.balances.total()
        };
        self.price_index *= (1.0 + inflation).max(0.0);
        self.prior_inflation = inflation;
        self.nominal_totals.push(total);
        self.real_totals.push(if self.price_index > 0.0 {
            total / self.price_index
        } else {
            0.0
        });
    }

    pub fn push_record(&mut self, record: impl FnOnce() -> YearRecord) {
        if let Some(ledger) = self.ledger.as_mut() {
            ledger.push(record());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_real_spending_tracks_inflation() {
        let mut s = SpendingState::new(SpendingModel::ConstantReal);
        assert_eq!(s.start(40_000.0, None, 1_000_000.0), 40_000.0);
        assert!((s.initial_rate - 0.04).abs() < 1e-12);
        let next = s.advance(0.03, 500_000.0);
        assert!((next - 41_200.0).abs() < 1e-9);
    }

    #[test]
    fn test_withdrawal_rate_sets_initial_spending() {
        let mut s = SpendingState::new(SpendingModel::ConstantReal);
        assert!((s.start(40_000.0, Some(0.05), 1_000_000.0) - 50_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_fixed_percentage_follows_portfolio() {
        let mut s = SpendingState::new(SpendingModel::FixedPercentage);
        s.start(40_000.0, Some(0.04), 1_000_000.0);
        assert!((s.advance(0.10, 800_000.0) - 32_000.0).abs() < 1e-9);
        assert_eq!(s.advance(0.10, 0.0), 0.0);
    }

    #[test]
    fn test_guardrails_cut_and_raise() {
        let mut s = SpendingState::new(SpendingModel::DEFAULT_GUARDRAILS);
        s.start(40_000.0, None, 1_000_000.0);
        // 40,000 / 600,000 = 6.7% > 4.8%: cut 10%
        assert!((s.advance(0.0, 600_000.0) - 36_000.0).abs() < 1e-9);
        // 36,000 / 2,000,000 = 1.8% < 3.2%: raise 10%
        assert!((s.advance(0.0, 2_000_000.0) - 39_600.0).abs() < 1e-9);
        // Inside the band: unchanged
        assert!((s.advance(0.0, 1_000_000.0) - 39_600.0).abs() < 1e-9);
    }

    #[test]
    fn test_growth_with_tax_drag() {
        let balances = Balances {
            taxable: 100_000.0,
            taxable_basis: 100_000.0,
            tax_deferred: 100_000.0,
            roth: 100_000.0,
        };
        let mut path = SimulationPath::new(balances, SpendingModel::ConstantReal, 1, false);
        let drag = path.apply_growth(0.10, 0.10);
        assert!((drag - 1_000.0).abs() < 1e-9);
        assert!((path.balances.taxable - 109_000.0).abs() < 1e-9);
        assert!((path.balances.tax_deferred - 110_000.0).abs() < 1e-9);
        assert!((path.balances.roth - 110_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_losses_are_not_dragged() {
        let balances = Balances {
            taxable: 100_000.0,
            taxable_basis: 100_000.0,
            ..Default::default()
        };
        let mut path = SimulationPath::new(balances, SpendingModel::ConstantReal, 1, false);
        assert_eq!(path.apply_growth(-0.20, 0.10), 0.0);
        assert!((path.balances.taxable - 80_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_growth_below_minus_one_floors_at_zero() {
        let balances = Balances {
            roth: 50_000.0,
            ..Default::default()
        };
        let mut path = SimulationPath::new(balances, SpendingModel::ConstantReal, 1, false);
        path.apply_growth(-1.5, 0.10);
        assert_eq!(path.balances.roth, 0.0);
    }

    #[test]
    fn test_depleted_path_closes_at_zero() {
        let balances = Balances {
            taxable: 10.0,
            taxable_basis: 10.0,
            ..Default::default()
        };
        let mut path = SimulationPath::new(balances, SpendingModel::ConstantReal, 3, false);
        path.mark_depleted(1);
        path.mark_depleted(2);
        path.close_year(0.03);
        assert_eq!(path.depletion_year, Some(1));
        assert_eq!(path.nominal_totals, vec![0.0]);
        assert!((path.price_index - 1.03).abs() < 1e-12);
    }

    #[test]
    fn test_price_index_never_negative() {
        let mut path = SimulationPath::new(Balances::default(), SpendingModel::ConstantReal, 2, false);
        path.close_year(-1.5);
        assert_eq!(path.price_index, 0.0);
        assert_eq!(path.real_totals, vec![0.0]);
        path.close_year(0.03);
        assert_eq!(path.price_index, 0.0);
    }
}
