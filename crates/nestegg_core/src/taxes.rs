//! Tax calculation for one household-year
//!
//! All functions are pure. Tables come from a `TaxConfig` passed in by the
//! caller; nothing here reads global state.

use crate::error::ValidationError;
use crate::model::{FilingStatus, IrmaaTier, SocialSecurityThresholds, StateTax, TaxBracket, TaxConfig};

/// Income for one tax year
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaxInputs {
    pub filing_status: FilingStatus,
    /// Ordinary income other than wages and pension: tax-deferred
    /// withdrawals, interest
    pub ordinary_income: f64,
    /// Realized long-term capital gains
    pub capital_gains: f64,
    /// Gross Social Security benefits
    pub social_security: f64,
    pub pension: f64,
    /// Gross wages per earner, used for FICA
    pub wages: [f64; 2],
    /// Pre-tax 401(k) deferrals excluded from income tax but not FICA
    pub pretax_deferrals: f64,
    /// Filers aged 65 or older, for the additional standard deduction
    pub filers_65_or_older: u8,
    /// People enrolled in Medicare, for the income-related surcharge
    pub medicare_enrollees: u8,
}

impl TaxInputs {
    pub fn new(filing_status: FilingStatus) -> Self {
        Self {
            filing_status,
            ordinary_income: 0.0,
            capital_gains: 0.0,
            social_security: 0.0,
            pension: 0.0,
            wages: [0.0; 2],
            pretax_deferrals: 0.0,
            filers_65_or_older: 0,
            medicare_enrollees: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        ValidationError::check_amount("ordinary_income", self.ordinary_income)?;
        ValidationError::check_amount("capital_gains", self.capital_gains)?;
        ValidationError::check_amount("social_security", self.social_security)?;
        ValidationError::check_amount("pension", self.pension)?;
        for wage in self.wages {
            ValidationError::check_amount("wages", wage)?;
        }
        ValidationError::check_amount("pretax_deferrals", self.pretax_deferrals)?;
        ValidationError::check_range("filers_65_or_older", f64::from(self.filers_65_or_older), 0.0, 2.0)?;
        ValidationError::check_range("medicare_enrollees", f64::from(self.medicare_enrollees), 0.0, 2.0)
    }

    pub fn total_wages(&self) -> f64 {
        self.wages.iter().sum()
    }

    /// Everything received before tax
    pub fn gross_income(&self) -> f64 {
        self.total_wages()
            + self.ordinary_income
            + self.pension
            + self.social_security
            + self.capital_gains
    }
}

/// Result of a full-year tax calculation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TaxBreakdown {
    pub gross_income: f64,
    pub taxable_social_security: f64,
    pub adjusted_gross_income: f64,
    /// Standard deduction including the 65+ additions
    pub deduction: f64,
    /// Ordinary income after the deduction
    pub ordinary_taxable_income: f64,
    /// Ordinary plus capital gains after the deduction
    pub taxable_income: f64,
    pub federal_ordinary_tax: f64,
    pub capital_gains_tax: f64,
    /// Ordinary plus capital gains federal tax
    pub federal_tax: f64,
    pub state_tax: f64,
    pub fica_tax: f64,
    /// Federal, state and FICA
    pub total_tax: f64,
    /// Income figure for the Medicare surcharge
    pub magi: f64,
    /// Annual Medicare surcharge for all enrollees
    pub irmaa_surcharge: f64,
    /// Combined federal and state rate on the next dollar of ordinary income
    pub marginal_rate: f64,
    /// Total tax over gross income, 0 without income
    pub effective_rate: f64,
}

/// Calculate tax using progressive brackets
/// Returns the total tax owed on the given income
pub fn calculate_bracket_tax(income: f64, brackets: &[TaxBracket]) -> f64 {
    if income <= 0.0 || brackets.is_empty() {
        return 0.0;
    }

    let mut tax = 0.0;

    for (i, bracket) in brackets.iter().enumerate() {
        if income <= bracket.threshold {
            break;
        }
        let next_threshold = brackets
            .get(i + 1)
            .map(|b| b.threshold)
            .unwrap_or(f64::INFINITY);

        let taxable_in_bracket = income.min(next_threshold) - bracket.threshold;
        tax += taxable_in_bracket * bracket.rate;
    }

    tax
}

/// Rate applied to the next dollar above `income`
pub fn marginal_rate(income: f64, brackets: &[TaxBracket]) -> f64 {
    brackets
        .iter()
        .take_while(|b| b.threshold <= income.max(0.0))
        .last()
        .map(|b| b.rate)
        .unwrap_or(0.0)
}

/// Taxable part of Social Security benefits.
///
/// `other_income` is everything in provisional income except the half of
/// benefits this function adds itself.
pub fn taxable_social_security(
    other_income: f64,
    benefits: f64,
    thresholds: &SocialSecurityThresholds,
) -> f64 {
    if benefits <= 0.0 {
        return 0.0;
    }
    let provisional = other_income + 0.5 * benefits;
    let half = 0.5 * benefits;

    if provisional <= thresholds.first {
        0.0
    } else if provisional <= thresholds.second {
        half.min(0.5 * (provisional - thresholds.first))
    } else {
        let gap = 0.5 * (thresholds.second - thresholds.first);
        (0.85 * (provisional - thresholds.second) + half.min(gap)).min(0.85 * benefits)
    }
}

/// Long-term capital gains tax with gains stacked on top of ordinary
/// taxable income
pub fn calculate_capital_gains_tax(
    gains: f64,
    ordinary_taxable_income: f64,
    brackets: &[TaxBracket],
) -> f64 {
    if gains <= 0.0 {
        return 0.0;
    }
    let base = ordinary_taxable_income.max(0.0);
    calculate_bracket_tax(base + gains, brackets) - calculate_bracket_tax(base, brackets)
}

/// Employee-side Social Security and Medicare tax
pub fn calculate_fica(wages: &[f64], filing_status: FilingStatus, config: &TaxConfig) -> f64 {
    let total: f64 = wages.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let social_security: f64 = wages
        .iter()
        .map(|w| w.min(config.social_security_wage_base) * config.social_security_tax_rate)
        .sum();
    let medicare = total * config.medicare_tax_rate;
    let threshold = *config.additional_medicare_threshold.get(filing_status);
    let additional = (total - threshold).max(0.0) * config.additional_medicare_tax_rate;
    social_security + medicare + additional
}

/// Medicare surcharge from the highest tier whose threshold MAGI exceeds
pub fn irmaa_surcharge(magi: f64, tiers: &[IrmaaTier], enrollees: u8) -> f64 {
    if enrollees == 0 {
        return 0.0;
    }
    tiers
        .iter()
        .filter(|t| magi > t.magi_threshold)
        .map(|t| t.annual_surcharge)
        .last()
        .map_or(0.0, |per_person| per_person * f64::from(enrollees))
}

/// Return left after tax on dividends and distributions in a taxable
/// account. Losses are not taxed.
#[inline]
pub fn apply_tax_drag(annual_return: f64, drag_rate: f64) -> f64 {
    if annual_return > 0.0 {
        annual_return * (1.0 - drag_rate)
    } else {
        annual_return
    }
}

fn state_tax(base: f64, state: &StateTax) -> (f64, f64) {
    match state {
        StateTax::None => (0.0, 0.0),
        StateTax::Flat { rate } => (base.max(0.0) * rate, *rate),
        StateTax::Brackets {
            brackets,
            standard_deduction,
        } => {
            let taxable = (base - standard_deduction).max(0.0);
            let marginal = if base > *standard_deduction {
                marginal_rate(taxable, brackets)
            } else {
                0.0
            };
            (calculate_bracket_tax(taxable, brackets), marginal)
        }
    }
}

/// Full federal, state and payroll tax for one year
pub fn compute_taxes(inputs: &TaxInputs, config: &TaxConfig) -> Result<TaxBreakdown, ValidationError> {
    inputs.validate()?;
    let status = inputs.filing_status;

    let earned = (inputs.total_wages() - inputs.pretax_deferrals).max(0.0);
    let other_ordinary = earned + inputs.ordinary_income + inputs.pension;
    let taxable_ss = taxable_social_security(
        other_ordinary + inputs.capital_gains,
        inputs.social_security,
        config.social_security_thresholds.get(status),
    );

    let ordinary_agi = other_ordinary + taxable_ss;
    let adjusted_gross_income = ordinary_agi + inputs.capital_gains;

    let deduction = config.standard_deduction.get(status)
        + config.senior_additional_deduction.get(status) * f64::from(inputs.filers_65_or_older);
    let ordinary_taxable_income = (ordinary_agi - deduction).max(0.0);
    // Deduction left over after ordinary income shelters gains
    let unused_deduction = (deduction - ordinary_agi).max(0.0);
    let taxable_gains = (inputs.capital_gains - unused_deduction).max(0.0);

    let federal_brackets = config.federal_brackets.get(status);
    let federal_ordinary_tax = calculate_bracket_tax(ordinary_taxable_income, federal_brackets);
    let capital_gains_tax = calculate_capital_gains_tax(
        taxable_gains,
        ordinary_taxable_income,
        config.capital_gains_brackets.get(status),
    );
    let federal_tax = federal_ordinary_tax + capital_gains_tax;

    let state_ss = if config.state_taxes_social_security {
        taxable_ss
    } else {
        0.0
    };
    let (state_tax, state_marginal) = state_tax(
        other_ordinary + state_ss + inputs.capital_gains,
        &config.state,
    );

    let fica_tax = calculate_fica(&inputs.wages, status, config);

    let magi = ordinary_taxable_income + inputs.capital_gains;
    let irmaa_surcharge = irmaa_surcharge(
        magi,
        config.irmaa_tiers.get(status),
        inputs.medicare_enrollees,
    );

    let federal_marginal = if ordinary_agi >= deduction {
        marginal_rate(ordinary_taxable_income, federal_brackets)
    } else {
        0.0
    };

    let total_tax = federal_tax + state_tax + fica_tax;
    let gross_income = inputs.gross_income();
    let effective_rate = if gross_income > 0.0 {
        total_tax / gross_income
    } else {
        0.0
    };

    Ok(TaxBreakdown {
        gross_income,
        taxable_social_security: taxable_ss,
        adjusted_gross_income,
        deduction,
        ordinary_taxable_income,
        taxable_income: ordinary_taxable_income + taxable_gains,
        federal_ordinary_tax,
        capital_gains_tax,
        federal_tax,
        state_tax,
        fica_tax,
        total_tax,
        magi,
        irmaa_surcharge,
        marginal_rate: federal_marginal + state_marginal,
        effective_rate,
    })
}
