//! Household profile: the people, their income streams and their savings.

use std::fmt;
use std::str::FromStr;

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use super::accounts::AccountBalances;
use crate::date_math::{age_on, years_until_age};
use crate::error::ValidationError;

pub const DEFAULT_LIFE_EXPECTANCY: u8 = 95;
pub const DEFAULT_CLAIMING_AGE: u8 = 67;

/// Federal filing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilingStatus {
    Single,
    #[default]
    #[serde(alias = "mfj", alias = "married")]
    MarriedFilingJointly,
    #[serde(alias = "mfs")]
    MarriedFilingSeparately,
    #[serde(alias = "hoh")]
    HeadOfHousehold,
}

impl FilingStatus {
    pub fn name(self) -> &'static str {
        match self {
            FilingStatus::Single => "single",
            FilingStatus::MarriedFilingJointly => "married_filing_jointly",
            FilingStatus::MarriedFilingSeparately => "married_filing_separately",
            FilingStatus::HeadOfHousehold => "head_of_household",
        }
    }
}

impl fmt::Display for FilingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilingStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "single" => Ok(FilingStatus::Single),
            "married_filing_jointly" | "married" | "mfj" | "joint" => {
                Ok(FilingStatus::MarriedFilingJointly)
            }
            "married_filing_separately" | "mfs" | "separate" => {
                Ok(FilingStatus::MarriedFilingSeparately)
            }
            "head_of_household" | "hoh" => Ok(FilingStatus::HeadOfHousehold),
            _ => Err(ValidationError::UnknownFilingStatus(s.to_string())),
        }
    }
}

/// Social Security benefit in today's dollars, paid from the claiming age
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SocialSecurity {
    pub monthly_benefit: f64,
    #[serde(default = "default_claiming_age")]
    pub claiming_age: u8,
}

fn default_claiming_age() -> u8 {
    DEFAULT_CLAIMING_AGE
}

/// When pension payments begin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PensionStart {
    #[default]
    AtRetirement,
    /// At this age, but never before the person retires
    AtAge(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pension {
    /// Nominal annual amount in the first payment year
    pub annual_amount: f64,
    #[serde(default)]
    pub start: PensionStart,
    /// Index payments to inflation after they begin
    #[serde(default)]
    pub cost_of_living_adjustment: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub birth_date: Date,
    pub retirement_date: Date,
    #[serde(default = "default_life_expectancy")]
    pub life_expectancy: u8,
    /// Annual salary in today's dollars until retirement
    #[serde(default)]
    pub salary: f64,
    /// Employee 401(k) deferral as a fraction of salary
    #[serde(default)]
    pub deferral_rate: f64,
    /// Employer match as a fraction of salary
    #[serde(default)]
    pub employer_match_rate: f64,
    #[serde(default)]
    pub social_security: Option<SocialSecurity>,
    #[serde(default)]
    pub pension: Option<Pension>,
}

fn default_life_expectancy() -> u8 {
    DEFAULT_LIFE_EXPECTANCY
}

impl Person {
    pub fn new(name: impl Into<String>, birth_date: Date, retirement_date: Date) -> Self {
        Self {
            name: name.into(),
            birth_date,
            retirement_date,
            life_expectancy: DEFAULT_LIFE_EXPECTANCY,
            salary: 0.0,
            deferral_rate: 0.0,
            employer_match_rate: 0.0,
            social_security: None,
            pension: None,
        }
    }

    #[inline]
    pub fn age_on(&self, date: Date) -> i16 {
        age_on(self.birth_date, date)
    }

    #[inline]
    pub fn is_retired_on(&self, date: Date) -> bool {
        date >= self.retirement_date
    }

    fn invalid(&self, reason: &'static str) -> ValidationError {
        ValidationError::InvalidPerson {
            name: self.name.clone(),
            reason,
        }
    }

    pub fn validate(&self, start_date: Date) -> Result<(), ValidationError> {
        if self.birth_date > start_date {
            return Err(self.invalid("birth date is after the simulation start"));
        }
        if self.retirement_date < self.birth_date {
            return Err(self.invalid("retirement date precedes birth date"));
        }
        ValidationError::check_amount("salary", self.salary)?;
        ValidationError::check_range("deferral_rate", self.deferral_rate, 0.0, 1.0)?;
        ValidationError::check_range("employer_match_rate", self.employer_match_rate, 0.0, 1.0)?;
        if let Some(ss) = &self.social_security {
            ValidationError::check_amount("monthly_benefit", ss.monthly_benefit)?;
            ValidationError::check_range("claiming_age", f64::from(ss.claiming_age), 62.0, 70.0)?;
        }
        if let Some(pension) = &self.pension {
            ValidationError::check_amount("pension", pension.annual_amount)?;
        }
        Ok(())
    }
}

/// How retirement spending evolves year to year
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpendingModel {
    /// Same purchasing power every year
    #[default]
    ConstantReal,
    /// Spend the withdrawal rate times the start-of-year portfolio
    FixedPercentage,
    /// Constant real spending with Guyton-Klinger style guardrails
    Guardrails {
        /// Relative rise of the withdrawal rate that triggers a cut
        upper: f64,
        /// Relative fall of the withdrawal rate that triggers a raise
        lower: f64,
        /// Fractional spending change when a guardrail is hit
        adjustment: f64,
    },
}

impl SpendingModel {
    pub const DEFAULT_GUARDRAILS: SpendingModel = SpendingModel::Guardrails {
        upper: 0.20,
        lower: 0.20,
        adjustment: 0.10,
    };

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let SpendingModel::Guardrails {
            upper,
            lower,
            adjustment,
        } = *self
        {
            ValidationError::check_range("guardrails.upper", upper, 0.0, 10.0)?;
            ValidationError::check_range("guardrails.lower", lower, 0.0, 1.0)?;
            ValidationError::check_range("guardrails.adjustment", adjustment, 0.0, 1.0)?;
        }
        Ok(())
    }
}

impl FromStr for SpendingModel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "constant_real" | "constant" => Ok(SpendingModel::ConstantReal),
            "fixed_percentage" | "percentage" | "variable" => Ok(SpendingModel::FixedPercentage),
            "guardrails" => Ok(SpendingModel::DEFAULT_GUARDRAILS),
            _ => Err(ValidationError::UnknownSpendingModel(s.to_string())),
        }
    }
}

/// Annual savings while the primary person works, in today's dollars
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AnnualSavings {
    #[serde(default)]
    pub taxable: f64,
    #[serde(default)]
    pub roth: f64,
}

/// Yearly move from the tax-deferred bucket to Roth during early retirement.
///
/// The converted amount is ordinary income in the year it moves; the tax is
/// withdrawn along with spending.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RothConversion {
    /// Amount converted each year, in today's dollars
    pub annual_amount: f64,
    /// Number of retired years to convert, starting with the first
    pub years: u32,
}

impl RothConversion {
    pub fn validate(&self) -> Result<(), ValidationError> {
        ValidationError::check_amount("roth_conversion.annual_amount", self.annual_amount)?;
        if self.years == 0 {
            return Err(ValidationError::OutOfRange {
                field: "roth_conversion.years",
                value: 0.0,
                min: 1.0,
                max: f64::from(u32::MAX),
            });
        }
        Ok(())
    }

    /// Whether the conversion runs in the `retired_year`-th retired year
    /// (zero-based)
    pub fn is_active(&self, retired_year: usize) -> bool {
        retired_year < self.years as usize
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseholdProfile {
    /// One or two people; the first is the primary earner whose retirement
    /// date starts household withdrawals
    pub persons: Vec<Person>,
    #[serde(default)]
    pub filing_status: FilingStatus,
    /// Living expenses in today's dollars
    pub annual_expenses: f64,
    /// Initial withdrawal rate; when set, retirement spending is this
    /// fraction of the portfolio at retirement
    #[serde(default)]
    pub withdrawal_rate: Option<f64>,
    #[serde(default)]
    pub spending_model: SpendingModel,
    #[serde(default)]
    pub annual_savings: AnnualSavings,
    pub accounts: AccountBalances,
    #[serde(default)]
    pub roth_conversion: Option<RothConversion>,
}

impl HouseholdProfile {
    /// The primary person. Callers must have validated the profile.
    pub fn primary(&self) -> Option<&Person> {
        self.persons.first()
    }

    pub fn validate(&self, start_date: Date) -> Result<(), ValidationError> {
        match self.persons.len() {
            0 => return Err(ValidationError::InvalidHousehold("no persons")),
            1 | 2 => {}
            _ => return Err(ValidationError::InvalidHousehold("more than two persons")),
        }
        for person in &self.persons {
            person.validate(start_date)?;
        }
        ValidationError::check_amount("annual_expenses", self.annual_expenses)?;
        if let Some(rate) = self.withdrawal_rate {
            ValidationError::check_range("withdrawal_rate", rate, 0.0, 1.0)?;
        }
        self.spending_model.validate()?;
        ValidationError::check_amount("annual_savings.taxable", self.annual_savings.taxable)?;
        ValidationError::check_amount("annual_savings.roth", self.annual_savings.roth)?;
        if let Some(conversion) = &self.roth_conversion {
            conversion.validate()?;
        }
        self.accounts.validate()
    }

    /// Years until the last person reaches their life expectancy
    pub fn horizon_years(&self, start_date: Date) -> usize {
        self.persons
            .iter()
            .map(|p| years_until_age(p.birth_date, start_date, p.life_expectancy))
            .max()
            .unwrap_or(0)
    }
}
