//! Tax tables
//!
//! Every figure the tax calculator uses lives in an explicit `TaxConfig`
//! value passed into each calculation. Tables that differ by filing status
//! are held in a `FilingTable`.

use serde::{Deserialize, Serialize};

use super::profile::FilingStatus;
use crate::error::ValidationError;

/// A marginal bracket: income above `threshold` is taxed at `rate`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaxBracket {
    pub threshold: f64,
    pub rate: f64,
}

impl TaxBracket {
    pub const fn new(threshold: f64, rate: f64) -> Self {
        Self { threshold, rate }
    }
}

fn brackets(table: &[(f64, f64)]) -> Vec<TaxBracket> {
    table
        .iter()
        .map(|&(threshold, rate)| TaxBracket { threshold, rate })
        .collect()
}

/// One value per filing status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilingTable<T> {
    pub single: T,
    pub married_filing_jointly: T,
    pub married_filing_separately: T,
    pub head_of_household: T,
}

impl<T> FilingTable<T> {
    #[inline]
    pub fn get(&self, status: FilingStatus) -> &T {
        match status {
            FilingStatus::Single => &self.single,
            FilingStatus::MarriedFilingJointly => &self.married_filing_jointly,
            FilingStatus::MarriedFilingSeparately => &self.married_filing_separately,
            FilingStatus::HeadOfHousehold => &self.head_of_household,
        }
    }

    fn iter(&self) -> impl Iterator<Item = &T> {
        [
            &self.single,
            &self.married_filing_jointly,
            &self.married_filing_separately,
            &self.head_of_household,
        ]
        .into_iter()
    }
}

/// Provisional-income thresholds for taxing Social Security benefits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SocialSecurityThresholds {
    /// Up to 50% of benefits taxable above this
    pub first: f64,
    /// Up to 85% of benefits taxable above this
    pub second: f64,
}

/// Income-related Medicare surcharge tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IrmaaTier {
    /// Surcharge applies when MAGI exceeds this
    pub magi_threshold: f64,
    /// Annual surcharge per enrollee
    pub annual_surcharge: f64,
}

/// State income tax model
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateTax {
    #[default]
    None,
    /// Flat rate on adjusted gross income
    Flat { rate: f64 },
    /// Progressive brackets after a state standard deduction
    Brackets {
        brackets: Vec<TaxBracket>,
        #[serde(default)]
        standard_deduction: f64,
    },
}

impl StateTax {
    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            StateTax::None => Ok(()),
            StateTax::Flat { rate } => ValidationError::check_range("state.rate", *rate, 0.0, 1.0),
            StateTax::Brackets {
                brackets,
                standard_deduction,
            } => {
                ValidationError::check_amount("state.standard_deduction", *standard_deduction)?;
                validate_brackets("state.brackets", brackets)
            }
        }
    }
}

fn validate_brackets(field: &'static str, brackets: &[TaxBracket]) -> Result<(), ValidationError> {
    let mut prev = f64::NEG_INFINITY;
    for bracket in brackets {
        ValidationError::check_amount(field, bracket.threshold)?;
        ValidationError::check_range(field, bracket.rate, 0.0, 1.0)?;
        if bracket.threshold <= prev {
            return Err(ValidationError::OutOfRange {
                field,
                value: bracket.threshold,
                min: prev,
                max: f64::MAX,
            });
        }
        prev = bracket.threshold;
    }
    Ok(())
}

/// Complete tax tables for one tax year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxConfig {
    pub federal_brackets: FilingTable<Vec<TaxBracket>>,
    pub standard_deduction: FilingTable<f64>,
    /// Additional standard deduction per filer aged 65 or older
    pub senior_additional_deduction: FilingTable<f64>,
    /// Long-term capital gains brackets (0/15/20%)
    pub capital_gains_brackets: FilingTable<Vec<TaxBracket>>,
    pub social_security_thresholds: FilingTable<SocialSecurityThresholds>,
    pub social_security_wage_base: f64,
    pub social_security_tax_rate: f64,
    pub medicare_tax_rate: f64,
    pub additional_medicare_tax_rate: f64,
    pub additional_medicare_threshold: FilingTable<f64>,
    pub irmaa_tiers: FilingTable<Vec<IrmaaTier>>,
    #[serde(default)]
    pub state: StateTax,
    /// Whether the state taxes the federally taxable part of Social Security
    #[serde(default)]
    pub state_taxes_social_security: bool,
    /// Fraction of positive taxable-account returns lost to tax each year
    pub tax_drag_rate: f64,
}

impl TaxConfig {
    /// 2024 federal figures, no state tax
    pub fn us_2024() -> Self {
        let single_brackets = [
            (0.0, 0.10),
            (11_600.0, 0.12),
            (47_150.0, 0.22),
            (100_525.0, 0.24),
            (191_950.0, 0.32),
            (243_725.0, 0.35),
            (609_350.0, 0.37),
        ];
        let mut separate_brackets = single_brackets;
        separate_brackets[6].0 = 365_600.0;

        let irmaa_surcharges = [839.40, 2_096.40, 3_354.00, 4_611.60, 5_030.40];
        let irmaa = |thresholds: [f64; 5]| -> Vec<IrmaaTier> {
            thresholds
                .iter()
                .zip(irmaa_surcharges)
                .map(|(&magi_threshold, annual_surcharge)| IrmaaTier {
                    magi_threshold,
                    annual_surcharge,
                })
                .collect()
        };
        let irmaa_individual = irmaa([103_000.0, 129_000.0, 161_000.0, 193_000.0, 500_000.0]);

        TaxConfig {
            federal_brackets: FilingTable {
                single: brackets(&single_brackets),
                married_filing_jointly: brackets(&[
                    (0.0, 0.10),
                    (23_200.0, 0.12),
                    (94_300.0, 0.22),
                    (201_050.0, 0.24),
                    (383_900.0, 0.32),
                    (487_450.0, 0.35),
                    (731_200.0, 0.37),
                ]),
                married_filing_separately: brackets(&separate_brackets),
                head_of_household: brackets(&[
                    (0.0, 0.10),
                    (16_550.0, 0.12),
                    (63_100.0, 0.22),
                    (100_500.0, 0.24),
                    (191_950.0, 0.32),
                    (243_700.0, 0.35),
                    (609_350.0, 0.37),
                ]),
            },
            standard_deduction: FilingTable {
                single: 14_600.0,
                married_filing_jointly: 29_200.0,
                married_filing_separately: 14_600.0,
                head_of_household: 21_900.0,
            },
            senior_additional_deduction: FilingTable {
                single: 1_950.0,
                married_filing_jointly: 1_550.0,
                married_filing_separately: 1_550.0,
                head_of_household: 1_950.0,
            },
            capital_gains_brackets: FilingTable {
                single: brackets(&[(0.0, 0.0), (47_025.0, 0.15), (518_900.0, 0.20)]),
                married_filing_jointly: brackets(&[
                    (0.0, 0.0),
                    (94_050.0, 0.15),
                    (583_750.0, 0.20),
                ]),
                married_filing_separately: brackets(&[
                    (0.0, 0.0),
                    (47_025.0, 0.15),
                    (291_850.0, 0.20),
                ]),
                head_of_household: brackets(&[(0.0, 0.0), (63_000.0, 0.15), (551_350.0, 0.20)]),
            },
            social_security_thresholds: FilingTable {
                single: SocialSecurityThresholds {
                    first: 25_000.0,
                    second: 34_000.0,
                },
                married_filing_jointly: SocialSecurityThresholds {
                    first: 32_000.0,
                    second: 44_000.0,
                },
                // Spouses living together: benefits taxable from the first dollar
                married_filing_separately: SocialSecurityThresholds {
                    first: 0.0,
                    second: 0.0,
                },
                head_of_household: SocialSecurityThresholds {
                    first: 25_000.0,
                    second: 34_000.0,
                },
            },
            social_security_wage_base: 168_600.0,
            social_security_tax_rate: 0.062,
            medicare_tax_rate: 0.0145,
            additional_medicare_tax_rate: 0.009,
            additional_medicare_threshold: FilingTable {
                single: 200_000.0,
                married_filing_jointly: 250_000.0,
                married_filing_separately: 125_000.0,
                head_of_household: 200_000.0,
            },
            irmaa_tiers: FilingTable {
                single: irmaa_individual.clone(),
                married_filing_jointly: irmaa([
                    206_000.0, 258_000.0, 322_000.0, 386_000.0, 750_000.0,
                ]),
                married_filing_separately: irmaa_individual.clone(),
                head_of_household: irmaa_individual,
            },
            state: StateTax::None,
            state_taxes_social_security: false,
            tax_drag_rate: 0.10,
        }
    }

    #[must_use]
    pub fn with_state(mut self, state: StateTax) -> Self {
        self.state = state;
        self
    }

    #[must_use]
    pub fn with_tax_drag(mut self, rate: f64) -> Self {
        self.tax_drag_rate = rate;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for table in self.federal_brackets.iter() {
            validate_brackets("federal_brackets", table)?;
        }
        for table in self.capital_gains_brackets.iter() {
            validate_brackets("capital_gains_brackets", table)?;
        }
        for deduction in self
            .standard_deduction
            .iter()
            .chain(self.senior_additional_deduction.iter())
        {
            ValidationError::check_amount("standard_deduction", *deduction)?;
        }
        for tiers in self.irmaa_tiers.iter() {
            for tier in tiers {
                ValidationError::check_amount("irmaa.magi_threshold", tier.magi_threshold)?;
                ValidationError::check_amount("irmaa.annual_surcharge", tier.annual_surcharge)?;
            }
        }
        ValidationError::check_amount("social_security_wage_base", self.social_security_wage_base)?;
        ValidationError::check_range("tax_drag_rate", self.tax_drag_rate, 0.0, 1.0)?;
        self.state.validate()
    }
}

impl Default for TaxConfig {
    fn default() -> Self {
        Self::us_2024()
    }
}
