//! Simulation Builder
//!
//! The SimulationBuilder provides a fluent API for assembling a household
//! and run settings into a validated `SimulationRequest`.
//!
//! # Example
//!
//! ```ignore
//! use nestegg_core::config::{PersonBuilder, SimulationBuilder};
//! use nestegg_core::model::{FilingStatus, MarketPreset};
//!
//! let request = SimulationBuilder::new()
//!     .start(2025, 1, 1)
//!     .years(30)
//!     .filing_status(FilingStatus::MarriedFilingJointly)
//!     .person(PersonBuilder::new("Alex").born(1960, 1, 1).retires(2025, 1, 1))
//!     .person(PersonBuilder::new("Sam").born(1962, 6, 1).retires(2027, 1, 1))
//!     .taxable(600_000.0)
//!     .tax_deferred(400_000.0)
//!     .annual_expenses(40_000.0)
//!     .preset(MarketPreset::Moderate)
//!     .build()?;
//! ```

use jiff::civil::{Date, date};

use super::SimulationRequest;
use crate::error::ValidationError;
use crate::model::{
    AccountBalances, AnnualSavings, FilingStatus, HouseholdProfile, MarketAssumptions,
    MarketPeriods, MarketPreset, MarketSelection, Person, RothConversion, SpendingModel, StateTax,
    TaxConfig,
};

/// Builder for simulation requests
pub struct SimulationBuilder {
    request: SimulationRequest,
}

impl Default for SimulationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationBuilder {
    /// Create a new simulation builder with an empty single-filer household
    #[must_use]
    pub fn new() -> Self {
        let profile = HouseholdProfile {
            persons: Vec::new(),
            filing_status: FilingStatus::Single,
            annual_expenses: 0.0,
            withdrawal_rate: None,
            spending_model: SpendingModel::ConstantReal,
            annual_savings: AnnualSavings::default(),
            accounts: AccountBalances::default(),
            roth_conversion: None,
        };
        Self {
            request: SimulationRequest::new(profile, date(2025, 1, 1)),
        }
    }

    // =========================================================================
    // Basic Configuration
    // =========================================================================

    /// Set the simulation start date
    #[must_use]
    pub fn start_date(mut self, date: Date) -> Self {
        self.request.start_date = date;
        self
    }

    /// Set the simulation start date (convenience method)
    #[must_use]
    pub fn start(self, year: i16, month: i8, day: i8) -> Self {
        self.start_date(date(year, month, day))
    }

    /// Set the simulated horizon in years
    #[must_use]
    pub fn years(mut self, years: usize) -> Self {
        self.request.horizon_years = Some(years);
        self
    }

    #[must_use]
    pub fn paths(mut self, num_paths: usize) -> Self {
        self.request.num_paths = num_paths;
        self
    }

    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.request.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn percentiles(mut self, percentiles: &[f64]) -> Self {
        self.request.percentiles = percentiles.to_vec();
        self
    }

    #[must_use]
    pub fn representative_paths(mut self, enabled: bool) -> Self {
        self.request.representative_paths = enabled;
        self
    }

    // =========================================================================
    // Household
    // =========================================================================

    /// Add a person; the first one added is the primary earner
    #[must_use]
    pub fn person(mut self, person: impl Into<Person>) -> Self {
        self.request.profile.persons.push(person.into());
        self
    }

    #[must_use]
    pub fn filing_status(mut self, status: FilingStatus) -> Self {
        self.request.profile.filing_status = status;
        self
    }

    /// Living expenses in today's dollars
    #[must_use]
    pub fn annual_expenses(mut self, amount: f64) -> Self {
        self.request.profile.annual_expenses = amount;
        self
    }

    #[must_use]
    pub fn withdrawal_rate(mut self, rate: f64) -> Self {
        self.request.profile.withdrawal_rate = Some(rate);
        self
    }

    #[must_use]
    pub fn spending_model(mut self, model: SpendingModel) -> Self {
        self.request.profile.spending_model = model;
        self
    }

    #[must_use]
    pub fn annual_savings(mut self, taxable: f64, roth: f64) -> Self {
        self.request.profile.annual_savings = AnnualSavings { taxable, roth };
        self
    }

    /// Convert `annual_amount` (today's dollars) to Roth in each of the
    /// first `years` retired years
    #[must_use]
    pub fn roth_conversion(mut self, annual_amount: f64, years: u32) -> Self {
        self.request.profile.roth_conversion = Some(RothConversion {
            annual_amount,
            years,
        });
        self
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Taxable balance held at full cost basis
    #[must_use]
    pub fn taxable(mut self, balance: f64) -> Self {
        self.request.profile.accounts.taxable = balance;
        self
    }

    #[must_use]
    pub fn taxable_with_basis(mut self, balance: f64, cost_basis: f64) -> Self {
        self.request.profile.accounts.taxable = balance;
        self.request.profile.accounts.taxable_cost_basis = Some(cost_basis);
        self
    }

    #[must_use]
    pub fn tax_deferred(mut self, balance: f64) -> Self {
        self.request.profile.accounts.tax_deferred = balance;
        self
    }

    #[must_use]
    pub fn roth(mut self, balance: f64) -> Self {
        self.request.profile.accounts.roth = balance;
        self
    }

    // =========================================================================
    // Market and taxes
    // =========================================================================

    #[must_use]
    pub fn preset(mut self, preset: MarketPreset) -> Self {
        self.request.market = MarketSelection::Preset(preset);
        self
    }

    #[must_use]
    pub fn market(mut self, assumptions: MarketAssumptions) -> Self {
        self.request.market = MarketSelection::Custom(assumptions);
        self
    }

    #[must_use]
    pub fn market_periods(mut self, periods: MarketPeriods) -> Self {
        self.request.market_periods = Some(periods);
        self
    }

    #[must_use]
    pub fn tax_config(mut self, config: TaxConfig) -> Self {
        self.request.tax_config = config;
        self
    }

    #[must_use]
    pub fn state_tax(mut self, state: StateTax) -> Self {
        self.request.tax_config.state = state;
        self
    }

    #[must_use]
    pub fn rmd_start_age(mut self, age: u8) -> Self {
        self.request.rmd_start_age = age;
        self
    }

    // =========================================================================
    // Build
    // =========================================================================

    /// Validate and return the request
    pub fn build(self) -> Result<SimulationRequest, ValidationError> {
        self.request.validate()?;
        Ok(self.request)
    }

    /// Return the request without validation
    #[must_use]
    pub fn build_unchecked(self) -> SimulationRequest {
        self.request
    }
}
