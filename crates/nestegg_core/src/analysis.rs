//! Side-by-side runs of one household under varied assumptions
//!
//! Every comparison fixes one seed for all of its runs, so differences come
//! from the varied input and not from the market draws. The cashflow
//! projection is the exception: it replays a single path at mean returns.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::config::SimulationRequest;
use crate::error::SimulationError;
use crate::model::{
    AssetAllocation, MarketPreset, MarketSelection, RothConversion, SimulationResult,
    SocialSecurity, YearRecord,
};
use crate::monte_carlo::{RunOptions, run_simulation_with_options};
use crate::returns::ReturnPathGenerator;
use crate::simulation::{SimulationContext, simulate_path};

/// Presets compared when the caller names none
pub const DEFAULT_COMPARISON: [MarketPreset; 3] = [
    MarketPreset::Conservative,
    MarketPreset::Moderate,
    MarketPreset::Aggressive,
];

/// Outcome of one preset in a comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetComparison {
    pub preset: MarketPreset,
    pub allocation: AssetAllocation,
    pub expected_return: f64,
    pub volatility: f64,
    pub result: SimulationResult,
}

/// Run `request` once per preset.
///
/// Capital-market assumptions stay those of the request; each preset
/// contributes only its stock weight, with bonds and cash rescaled in their
/// existing proportion. Every run shares one seed, and any regime schedule is
/// dropped so the allocation is what differs.
pub fn compare_presets(
    request: &SimulationRequest,
    presets: &[MarketPreset],
    options: &RunOptions,
) -> Result<Vec<PresetComparison>, SimulationError> {
    let base = request.market_assumptions();
    let seed = request.seed.unwrap_or_else(rand::random);

    presets
        .iter()
        .map(|&preset| -> Result<PresetComparison, SimulationError> {
            let allocation = base
                .allocation
                .with_stock_weight(preset.assumptions().allocation.stock)?;
            let market = base.with_allocation(allocation);

            let mut variant = request.clone();
            variant.market = MarketSelection::Custom(market);
            variant.market_periods = None;
            variant.seed = Some(seed);

            tracing::debug!(%preset, stock = allocation.stock, "comparing preset");
            let result = run_simulation_with_options(&variant, options)?;
            Ok(PresetComparison {
                preset,
                allocation,
                expected_return: market.portfolio_mean(),
                volatility: market.portfolio_std_dev(),
                result,
            })
        })
        .collect()
}

/// Success rate and median outcome at one withdrawal rate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalRatePoint {
    pub withdrawal_rate: f64,
    pub success_rate: f64,
    pub median_final_balance: f64,
}

/// Run `request` at each withdrawal rate with a shared seed
pub fn sweep_withdrawal_rates(
    request: &SimulationRequest,
    rates: &[f64],
    options: &RunOptions,
) -> Result<Vec<WithdrawalRatePoint>, SimulationError> {
    let seed = request.seed.unwrap_or_else(rand::random);

    rates
        .iter()
        .map(|&rate| -> Result<WithdrawalRatePoint, SimulationError> {
            let mut variant = request.clone();
            variant.profile.withdrawal_rate = Some(rate);
            variant.seed = Some(seed);
            variant.representative_paths = false;

            let result = run_simulation_with_options(&variant, options)?;
            Ok(WithdrawalRatePoint {
                withdrawal_rate: rate,
                success_rate: result.success_rate,
                median_final_balance: result.summary.median_final_balance,
            })
        })
        .collect()
}

// =============================================================================
// Social Security claiming age
// =============================================================================

/// Age the configured adjustment factors are measured from
pub const FULL_RETIREMENT_AGE: u8 = 67;
pub const CLAIMING_AGES: RangeInclusive<u8> = 62..=70;

/// Benefit claimed at `age` as a fraction of the full-retirement-age benefit.
///
/// Early claims lose 5/9% a month for the first 36 months and 5/12% a month
/// beyond that; delayed claims earn 2/3% a month.
pub fn claiming_adjustment(age: u8) -> f64 {
    let months = (i32::from(age) - i32::from(FULL_RETIREMENT_AGE)) * 12;
    if months >= 0 {
        1.0 + f64::from(months) * (2.0 / 3.0) / 100.0
    } else {
        let early = -months;
        let first = early.min(36);
        1.0 - f64::from(first) * (5.0 / 9.0) / 100.0
            - f64::from(early - first) * (5.0 / 12.0) / 100.0
    }
}

/// Outcome of one person claiming at one age
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimingAgePoint {
    pub person: String,
    pub claiming_age: u8,
    /// Benefit at this claiming age, in today's dollars
    pub monthly_benefit: f64,
    pub success_rate: f64,
    pub median_final_balance: f64,
}

/// Sweep each benefit-drawing person's claiming age over `CLAIMING_AGES`.
///
/// The configured benefit is read as the amount at the configured claiming
/// age and rescaled with `claiming_adjustment`. Everyone else keeps their
/// configured claim.
pub fn analyze_social_security_strategies(
    request: &SimulationRequest,
    options: &RunOptions,
) -> Result<Vec<ClaimingAgePoint>, SimulationError> {
    request.validate()?;
    let seed = request.seed.unwrap_or_else(rand::random);
    let mut points = Vec::new();

    for (index, person) in request.profile.persons.iter().enumerate() {
        let Some(ss) = person.social_security else {
            continue;
        };
        let full_benefit = ss.monthly_benefit / claiming_adjustment(ss.claiming_age);

        for claiming_age in CLAIMING_AGES {
            let monthly_benefit = full_benefit * claiming_adjustment(claiming_age);
            let mut variant = request.clone();
            variant.profile.persons[index].social_security = Some(SocialSecurity {
                monthly_benefit,
                claiming_age,
            });
            variant.seed = Some(seed);
            variant.representative_paths = false;

            tracing::debug!(person = %person.name, claiming_age, "claiming age run");
            let result = run_simulation_with_options(&variant, options)?;
            points.push(ClaimingAgePoint {
                person: person.name.clone(),
                claiming_age,
                monthly_benefit,
                success_rate: result.success_rate,
                median_final_balance: result.summary.median_final_balance,
            });
        }
    }
    Ok(points)
}

// =============================================================================
// Roth conversion
// =============================================================================

/// One household run with and without a conversion plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RothConversionAnalysis {
    pub conversion: RothConversion,
    pub baseline: SimulationResult,
    pub converted: SimulationResult,
}

impl RothConversionAnalysis {
    pub fn success_rate_change(&self) -> f64 {
        self.converted.success_rate - self.baseline.success_rate
    }

    pub fn median_final_balance_change(&self) -> f64 {
        self.converted.summary.median_final_balance - self.baseline.summary.median_final_balance
    }
}

/// Run `request` without any conversion and again with `conversion`
pub fn analyze_roth_conversion(
    request: &SimulationRequest,
    conversion: RothConversion,
    options: &RunOptions,
) -> Result<RothConversionAnalysis, SimulationError> {
    conversion.validate()?;
    let seed = request.seed.unwrap_or_else(rand::random);

    let run = |plan: Option<RothConversion>| -> Result<SimulationResult, SimulationError> {
        let mut variant = request.clone();
        variant.profile.roth_conversion = plan;
        variant.seed = Some(seed);
        run_simulation_with_options(&variant, options)
    };

    tracing::debug!(amount = conversion.annual_amount, years = conversion.years, "roth conversion runs");
    Ok(RothConversionAnalysis {
        conversion,
        baseline: run(None)?,
        converted: run(Some(conversion))?,
    })
}

// =============================================================================
// Deterministic cashflows
// =============================================================================

/// Year-by-year ledger of one path earning mean returns every year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashflowProjection {
    pub ledger: Vec<YearRecord>,
    pub depletion_year: Option<usize>,
    pub final_balance: f64,
    /// Final balance in start-year dollars
    pub final_real_balance: f64,
    pub total_tax: f64,
    pub total_withdrawals: f64,
}

/// Project `request` along its expected market path.
///
/// Regime schedules are honoured year by year; the seed is ignored.
pub fn project_cashflows(request: &SimulationRequest) -> Result<CashflowProjection, SimulationError> {
    request.validate()?;
    let horizon = request.resolved_horizon();
    let generator = ReturnPathGenerator::new(
        &request.market_assumptions(),
        request.market_periods.as_ref(),
        0,
    )?;
    let returns = generator.expected_path(horizon);

    let ctx = SimulationContext::new(request);
    let outcome = simulate_path(&ctx, &returns, true)?;
    let final_balance = outcome.final_balance();
    let final_real_balance = outcome.real_totals.last().copied().unwrap_or(0.0);
    let ledger = outcome.ledger.unwrap_or_default();

    Ok(CashflowProjection {
        total_tax: ledger.iter().map(|y| y.total_tax + y.medicare_surcharge).sum(),
        total_withdrawals: ledger.iter().map(|y| y.total_withdrawal).sum(),
        depletion_year: outcome.depletion_year,
        final_balance,
        final_real_balance,
        ledger,
    })
}
