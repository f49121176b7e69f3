//! Retirement Monte Carlo engine
//!
//! This crate projects a household's portfolio under market uncertainty and
//! US tax law and estimates the probability that savings last. It covers:
//! - Correlated stock/bond returns with covariance-aware portfolio volatility
//! - Federal, state, capital gains and payroll tax, Social Security
//!   taxability and the Medicare income surcharge
//! - Required minimum distributions from the IRS Uniform Lifetime Table
//! - A taxable, tax-deferred, Roth withdrawal waterfall with tax gross-up
//! - Batched, cancellable Monte Carlo runs aggregated into percentiles
//! - Preset, withdrawal-rate, claiming-age and Roth conversion comparisons,
//!   plus a deterministic cashflow projection
//!
//! # Builder DSL
//!
//! ```ignore
//! use nestegg_core::config::{PersonBuilder, SimulationBuilder};
//! use nestegg_core::run_simulation;
//!
//! let request = SimulationBuilder::new()
//!     .person(PersonBuilder::new("Alex").born(1960, 4, 1).retires(2025, 1, 1))
//!     .taxable(600_000.0)
//!     .tax_deferred(400_000.0)
//!     .annual_expenses(40_000.0)
//!     .years(30)
//!     .seed(42)
//!     .build()?;
//! let result = run_simulation(&request)?;
//! println!("success rate: {:.1}%", result.success_rate * 100.0);
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod aggregation;
pub mod analysis;
pub mod date_math;
pub mod error;
pub mod monte_carlo;
pub mod returns;
pub mod simulation;
pub mod simulation_state;
pub mod taxes;
pub mod withdrawal;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod config;
pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use analysis::{
    CLAIMING_AGES, CashflowProjection, ClaimingAgePoint, DEFAULT_COMPARISON, PresetComparison,
    RothConversionAnalysis, WithdrawalRatePoint, analyze_roth_conversion,
    analyze_social_security_strategies, compare_presets, project_cashflows,
    sweep_withdrawal_rates,
};
pub use config::{PersonBuilder, SimulationBuilder, SimulationRequest};
pub use error::{SimulationError, ValidationError};
pub use model::{
    FilingStatus, HouseholdProfile, MarketAssumptions, MarketPreset, RothConversion,
    SimulationResult, SpendingModel, TaxConfig,
};
pub use monte_carlo::{
    MAX_BATCH_SIZE, MonteCarloProgress, RunOptions, run_simulation, run_simulation_with_options,
};
pub use returns::{MIN_INFLATION, ReturnPathGenerator, YearReturns};
pub use taxes::{TaxBreakdown, TaxInputs, compute_taxes};
pub use withdrawal::{STABILITY_FLOOR, WithdrawalBreakdown, withdraw};
