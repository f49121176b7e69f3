//! Year-by-year simulation of a single path
//!
//! A path starts `Accumulating` (contributions, no withdrawals), turns
//! `Retired` on the primary person's retirement date and becomes `Depleted`
//! the first retired year a shortfall cannot be covered or the balance
//! reaches zero. `Depleted` is absorbing.
//!
//! Each retired year runs a small fixed-point loop: withdrawals raise taxable
//! income, which raises the tax to be withdrawn for. The loop stops once the
//! tax estimate moves by less than `GROSS_UP_TOLERANCE`. A planned Roth
//! conversion is moved before the loop and taxed inside it.

use jiff::civil::Date;

use crate::config::SimulationRequest;
use crate::date_math::{add_years, age_on};
use crate::error::SimulationError;
use crate::model::{
    AccountBucket, Balances, HouseholdProfile, PathPhase, PensionStart, Person, RmdTable,
    TaxConfig, WarningTally, YearRecord,
};
use crate::returns::YearReturns;
use crate::simulation_state::SimulationPath;
use crate::taxes::{TaxBreakdown, TaxInputs, compute_taxes};
use crate::withdrawal::{WithdrawalBreakdown, withdraw};

pub const MAX_GROSS_UP_ROUNDS: usize = 8;
pub const GROSS_UP_TOLERANCE: f64 = 1.0;
/// Unmet spending above this marks the path depleted
pub const DEPLETION_TOLERANCE: f64 = 1.0;

/// Age at which people count as Medicare enrollees and seniors for the
/// additional standard deduction
const MEDICARE_AGE: i16 = 65;

// =============================================================================
// Context
// =============================================================================

/// Calendar facts for one simulated year, shared by every path
#[derive(Debug, Clone)]
pub struct YearContext {
    pub date: Date,
    pub calendar_year: i16,
    /// Age of each person on `date`; unused slots are zero
    pub ages: [i16; 2],
    /// Whether each person is still drawing a salary
    pub working: [bool; 2],
    pub household_retired: bool,
    pub seniors: u8,
}

/// Everything a path needs that does not depend on market draws
#[derive(Debug, Clone)]
pub struct SimulationContext<'a> {
    pub profile: &'a HouseholdProfile,
    pub tax_config: &'a TaxConfig,
    pub rmd_table: RmdTable,
    pub rmd_start_age: u8,
    pub starting_balances: Balances,
    pub years: Vec<YearContext>,
}

impl<'a> SimulationContext<'a> {
    /// Precompute the calendar for a validated request
    pub fn new(request: &'a SimulationRequest) -> Self {
        let profile = &request.profile;
        let horizon = request.resolved_horizon();
        let primary_retirement = profile.primary().map(|p| p.retirement_date);

        let years = (0..horizon)
            .map(|t| {
                let date = add_years(request.start_date, t as i16);
                let mut ages = [0i16; 2];
                let mut working = [false; 2];
                for (i, person) in profile.persons.iter().take(2).enumerate() {
                    ages[i] = age_on(person.birth_date, date);
                    working[i] = !person.is_retired_on(date);
                }
                let seniors = ages
                    .iter()
                    .take(profile.persons.len())
                    .filter(|a| **a >= MEDICARE_AGE)
                    .count() as u8;
                YearContext {
                    date,
                    calendar_year: date.year(),
                    ages,
                    working,
                    household_retired: primary_retirement.is_some_and(|r| r <= date),
                    seniors,
                }
            })
            .collect();

        Self {
            profile,
            tax_config: &request.tax_config,
            rmd_table: RmdTable::default(),
            rmd_start_age: request.rmd_start_age,
            starting_balances: profile.accounts.to_balances(),
            years,
        }
    }

    pub fn horizon(&self) -> usize {
        self.years.len()
    }

    fn persons(&self) -> &[Person] {
        &self.profile.persons
    }

    /// Ages of the people actually in the household
    fn ages<'y>(&self, year: &'y YearContext) -> &'y [i16] {
        &year.ages[..self.persons().len().min(2)]
    }
}

// =============================================================================
// Path outcome
// =============================================================================

/// What a path leaves behind for aggregation
#[derive(Debug, Clone, Default)]
pub struct PathOutcome {
    pub nominal_totals: Vec<f64>,
    pub real_totals: Vec<f64>,
    pub depletion_year: Option<usize>,
    pub warnings: WarningTally,
    pub ledger: Option<Vec<YearRecord>>,
}

impl PathOutcome {
    pub fn final_balance(&self) -> f64 {
        self.nominal_totals.last().copied().unwrap_or(0.0)
    }
}

impl From<SimulationPath> for PathOutcome {
    fn from(path: SimulationPath) -> Self {
        Self {
            nominal_totals: path.nominal_totals,
            real_totals: path.real_totals,
            depletion_year: path.depletion_year,
            warnings: path.warnings,
            ledger: path.ledger,
        }
    }
}

// =============================================================================
// Year loop
// =============================================================================

/// Income received by the household in one year
#[derive(Debug, Clone, Copy, Default)]
struct YearIncome {
    wages: [f64; 2],
    deferrals: f64,
    employer_match: f64,
    social_security: f64,
    pension: f64,
}

impl YearIncome {
    fn total_wages(&self) -> f64 {
        self.wages.iter().sum()
    }

    /// Income that reaches the household's pocket before tax
    fn cash(&self) -> f64 {
        self.total_wages() - self.deferrals + self.social_security + self.pension
    }
}

/// Simulate one path over `returns`, which must cover the context horizon.
///
/// With `record_ledger` every year is written to a `YearRecord`; without it
/// depleted years are skipped entirely.
pub fn simulate_path(
    ctx: &SimulationContext<'_>,
    returns: &[YearReturns],
    record_ledger: bool,
) -> Result<PathOutcome, SimulationError> {
    let profile = ctx.profile;
    let mut path = SimulationPath::new(
        ctx.starting_balances,
        profile.spending_model,
        ctx.horizon(),
        record_ledger,
    );

    for (t, (year, market)) in ctx.years.iter().zip(returns).enumerate() {
        if path.is_depleted() {
            if record_ledger {
                let record = depleted_record(ctx, t, year, market);
                path.push_record(|| record);
            }
            path.close_year(market.inflation);
            continue;
        }

        if path.phase == PathPhase::Accumulating && year.household_retired {
            path.phase = PathPhase::Retired;
        }

        let income = accrue_income(ctx, &mut path, year);
        let mut record = YearRecord {
            year_index: t,
            calendar_year: year.calendar_year,
            ages: if record_ledger {
                ctx.ages(year).to_vec()
            } else {
                Vec::new()
            },
            wages: income.total_wages(),
            social_security: income.social_security,
            pension: income.pension,
            portfolio_return: market.portfolio,
            inflation: market.inflation,
            ..Default::default()
        };

        match path.phase {
            PathPhase::Accumulating => accumulate_year(ctx, &mut path, year, &income, &mut record)?,
            PathPhase::Retired => retire_year(ctx, &mut path, t, year, &income, &mut record)?,
            PathPhase::Depleted => {}
        }

        if !path.is_depleted() {
            record.tax_drag = path.apply_growth(market.portfolio, ctx.tax_config.tax_drag_rate);
            if path.phase == PathPhase::Retired && path.balances.total() <= 0.0 {
                path.mark_depleted(t);
            }
        }

        record.phase = path.phase;
        fill_balances(&mut record, &path);
        path.push_record(|| record);
        path.close_year(market.inflation);
    }

    Ok(path.into())
}

/// Wages, Social Security and pension for the year, in nominal dollars
fn accrue_income(ctx: &SimulationContext<'_>, path: &mut SimulationPath, year: &YearContext) -> YearIncome {
    let mut income = YearIncome::default();
    let index = path.price_index;

    for (i, person) in ctx.persons().iter().take(2).enumerate() {
        let age = year.ages[i];

        if year.working[i] {
            let wage = person.salary * index;
            income.wages[i] = wage;
            income.deferrals += wage * person.deferral_rate;
            income.employer_match += wage * person.employer_match_rate;
        }

        if let Some(ss) = person.social_security {
            if age >= i16::from(ss.claiming_age) {
                income.social_security += ss.monthly_benefit * 12.0 * index;
            }
        }

        if let Some(pension) = person.pension {
            let triggered = !year.working[i]
                && match pension.start {
                    PensionStart::AtRetirement => true,
                    PensionStart::AtAge(start_age) => age >= i16::from(start_age),
                };
            if triggered {
                let base = *path.pension_base_index[i].get_or_insert(index);
                income.pension += if pension.cost_of_living_adjustment && base > 0.0 {
                    pension.annual_amount * index / base
                } else {
                    pension.annual_amount
                };
            }
        }
    }

    income
}

fn tax_inputs(ctx: &SimulationContext<'_>, year: &YearContext, income: &YearIncome) -> TaxInputs {
    TaxInputs {
        social_security: income.social_security,
        pension: income.pension,
        wages: income.wages,
        pretax_deferrals: income.deferrals,
        filers_65_or_older: year.seniors,
        medicare_enrollees: year.seniors,
        ..TaxInputs::new(ctx.profile.filing_status)
    }
}

/// Pre-retirement year: taxes are paid from pay; savings go into the buckets
fn accumulate_year(
    ctx: &SimulationContext<'_>,
    path: &mut SimulationPath,
    year: &YearContext,
    income: &YearIncome,
    record: &mut YearRecord,
) -> Result<(), SimulationError> {
    let savings = ctx.profile.annual_savings;
    let index = path.price_index;
    let to_tax_deferred = income.deferrals + income.employer_match;
    let to_taxable = savings.taxable * index;
    let to_roth = savings.roth * index;

    path.balances.tax_deferred += to_tax_deferred;
    path.balances.deposit_taxable(to_taxable);
    path.balances.roth += to_roth;

    let taxes = compute_taxes(&tax_inputs(ctx, year, income), ctx.tax_config)?;
    record.living_expenses = ctx.profile.annual_expenses * index;
    record.contributions = to_tax_deferred + to_taxable + to_roth;
    fill_taxes(record, &taxes);
    Ok(())
}

/// Retired year: spend, gross up withdrawals for tax, reinvest any surplus.
///
/// Required distributions are only taken here, once the primary person has
/// retired. An older spouse past the start age owes none while the primary
/// is still accumulating.
fn retire_year(
    ctx: &SimulationContext<'_>,
    path: &mut SimulationPath,
    t: usize,
    year: &YearContext,
    income: &YearIncome,
    record: &mut YearRecord,
) -> Result<(), SimulationError> {
    let profile = ctx.profile;
    let portfolio = path.balances.total();

    let expenses = if path.spending.is_started() {
        path.spending.advance(path.prior_inflation, portfolio)
    } else {
        path.spending.start(
            profile.annual_expenses * path.price_index,
            profile.withdrawal_rate,
            portfolio,
        )
    };

    let rmd = ctx.rmd_table.required_distribution(
        path.balances.tax_deferred,
        ctx.ages(year),
        ctx.rmd_start_age,
    );

    // A spouse still working keeps deferring into the tax-deferred bucket
    let to_tax_deferred = income.deferrals + income.employer_match;
    path.balances.tax_deferred += to_tax_deferred;

    // Conversions leave enough behind to cover the required distribution
    let conversion = match profile.roth_conversion {
        Some(plan) if plan.is_active(path.retired_years) => {
            let amount = (plan.annual_amount * path.price_index)
                .min(path.balances.tax_deferred - rmd)
                .max(0.0);
            path.balances.tax_deferred -= amount;
            path.balances.roth += amount;
            amount
        }
        _ => 0.0,
    };
    path.retired_years += 1;

    let base_inputs = tax_inputs(ctx, year, income);
    let cash_income = income.cash();
    let mut tax_estimate = 0.0;
    let mut converged = false;
    let mut withdrawal = WithdrawalBreakdown::default();
    let mut taxes = TaxBreakdown::default();

    let mut owed = 0.0;

    for _ in 0..MAX_GROSS_UP_ROUNDS {
        let shortfall = expenses + tax_estimate - cash_income;
        withdrawal = withdraw(shortfall, &path.balances, rmd);
        let inputs = TaxInputs {
            ordinary_income: withdrawal.from_tax_deferred + conversion,
            capital_gains: withdrawal.realized_gain,
            ..base_inputs
        };
        taxes = compute_taxes(&inputs, ctx.tax_config)?;
        owed = taxes.total_tax + taxes.irmaa_surcharge;
        let delta = owed - tax_estimate;
        if delta.abs() <= GROSS_UP_TOLERANCE {
            converged = true;
            break;
        }
        // Each extra dollar withdrawn costs the marginal rate again
        let marginal = taxes.marginal_rate.clamp(0.0, 0.9);
        tax_estimate = owed + delta * marginal / (1.0 - marginal);
    }

    if !converged {
        path.warnings.gross_up_not_converged += 1;
        tracing::debug!(year = t, tax = owed, "tax gross-up did not converge");
    }
    for bucket in withdrawal.floored_buckets() {
        path.warnings.floored[bucket.index()] += 1;
        tracing::debug!(year = t, bucket = bucket.label(), "bucket below stability floor");
    }

    path.balances = withdrawal.balances;
    let surplus = cash_income + withdrawal.spendable() - expenses - owed;
    let mut reinvested = withdrawal.reinvested;
    let unmet = (-surplus).max(0.0);
    if surplus > 0.0 {
        path.balances.deposit_taxable(surplus);
        reinvested += surplus;
    }

    record.living_expenses = expenses;
    record.medicare_surcharge = taxes.irmaa_surcharge;
    record.contributions = to_tax_deferred;
    record.required_distribution = withdrawal.required_distribution;
    record.roth_conversion = conversion;
    record.withdrawal_taxable = withdrawal.from_taxable;
    record.withdrawal_tax_deferred = withdrawal.from_tax_deferred;
    record.withdrawal_roth = withdrawal.from_roth;
    record.total_withdrawal = withdrawal.total();
    record.realized_gain = withdrawal.realized_gain;
    record.reinvested = reinvested;
    record.unmet_spending = unmet;
    fill_taxes(record, &taxes);

    if unmet > DEPLETION_TOLERANCE {
        path.mark_depleted(t);
    }
    Ok(())
}

fn fill_taxes(record: &mut YearRecord, taxes: &TaxBreakdown) {
    record.taxable_income = taxes.taxable_income;
    record.taxable_social_security = taxes.taxable_social_security;
    record.magi = taxes.magi;
    record.federal_tax = taxes.federal_tax;
    record.capital_gains_tax = taxes.capital_gains_tax;
    record.state_tax = taxes.state_tax;
    record.fica_tax = taxes.fica_tax;
    record.total_tax = taxes.total_tax;
    record.marginal_rate = taxes.marginal_rate;
    record.effective_rate = taxes.effective_rate;
}

fn fill_balances(record: &mut YearRecord, path: &SimulationPath) {
    let b = &path.balances;
    record.ending_taxable = b.get(AccountBucket::Taxable);
    record.ending_tax_deferred = b.get(AccountBucket::TaxDeferred);
    record.ending_roth = b.get(AccountBucket::Roth);
    record.ending_total = b.total();
}

fn depleted_record(
    ctx: &SimulationContext<'_>,
    t: usize,
    year: &YearContext,
    market: &YearReturns,
) -> YearRecord {
    YearRecord {
        year_index: t,
        calendar_year: year.calendar_year,
        ages: ctx.ages(year).to_vec(),
        phase: PathPhase::Depleted,
        portfolio_return: market.portfolio,
        inflation: market.inflation,
        ..Default::default()
    }
}
