//! Scenario files
//!
//! A scenario is a YAML description of one household and its run settings.
//! The `*Data` types mirror the file layout and are converted into a core
//! `SimulationRequest`, after which command-line overrides are applied.
//!
//! ```yaml
//! start_date: 2025-01-01
//! filing_status: married_filing_jointly
//! people:
//!   - name: Alex
//!     birth_date: 1960-04-01
//!     retirement_date: 2025-01-01
//!     social_security: { monthly_benefit: 2400, claiming_age: 67 }
//! accounts:
//!   taxable: 600000
//!   tax_deferred: 400000
//! annual_expenses: 40000
//! market:
//!   preset: moderate
//! simulation:
//!   paths: 1000
//!   seed: 42
//! ```

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr, bail};
use jiff::civil::Date;
use nestegg_core::config::SimulationRequest;
use nestegg_core::model::{
    AccountBalances, AnnualSavings, FilingStatus, HouseholdProfile, MarketAssumptions,
    MarketPeriod, MarketPeriods, MarketPreset, MarketSelection, Pension, PensionStart,
    PeriodSchedule, Person, RothConversion, SocialSecurity, SpendingModel, StateTax, TaxBracket,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioFile {
    /// First simulated day (YYYY-MM-DD); January 1st of the current year
    /// when absent
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub filing_status: Option<String>,
    pub people: Vec<PersonData>,
    #[serde(default)]
    pub accounts: AccountBalances,
    pub annual_expenses: f64,
    #[serde(default)]
    pub withdrawal_rate: Option<f64>,
    #[serde(default)]
    pub spending: SpendingData,
    #[serde(default)]
    pub savings: SavingsData,
    #[serde(default)]
    pub roth_conversion: Option<RothConversion>,
    #[serde(default)]
    pub market: MarketData,
    #[serde(default)]
    pub taxes: TaxData,
    #[serde(default)]
    pub simulation: RunData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonData {
    pub name: String,
    /// YYYY-MM-DD
    pub birth_date: String,
    /// YYYY-MM-DD
    pub retirement_date: String,
    #[serde(default)]
    pub life_expectancy: Option<u8>,
    #[serde(default)]
    pub salary: f64,
    #[serde(default)]
    pub deferral_rate: f64,
    #[serde(default)]
    pub employer_match_rate: f64,
    #[serde(default)]
    pub social_security: Option<SocialSecurity>,
    #[serde(default)]
    pub pension: Option<PensionData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PensionData {
    pub annual_amount: f64,
    /// Age payments begin; at retirement when absent
    #[serde(default)]
    pub start_age: Option<u8>,
    #[serde(default)]
    pub cola: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpendingData {
    /// `constant_real`, `fixed_percentage` or `guardrails`
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub upper: Option<f64>,
    #[serde(default)]
    pub lower: Option<f64>,
    #[serde(default)]
    pub adjustment: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SavingsData {
    #[serde(default)]
    pub taxable: f64,
    #[serde(default)]
    pub roth: f64,
}

/// Market assumptions: a named preset or custom parameters, never both
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketData {
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub custom: Option<MarketAssumptions>,
    /// Regime schedule overriding the base assumptions year by year
    #[serde(default)]
    pub periods: Vec<PeriodData>,
    /// Repeat `periods` instead of holding the last one
    #[serde(default)]
    pub cycle: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodData {
    pub years: usize,
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub custom: Option<MarketAssumptions>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxData {
    /// Flat state income tax rate
    #[serde(default)]
    pub state_rate: Option<f64>,
    /// Progressive state brackets; takes precedence over `state_rate`
    #[serde(default)]
    pub state_brackets: Vec<TaxBracket>,
    #[serde(default)]
    pub state_standard_deduction: f64,
    #[serde(default)]
    pub tax_drag_rate: Option<f64>,
    #[serde(default)]
    pub rmd_start_age: Option<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunData {
    #[serde(default)]
    pub paths: Option<usize>,
    #[serde(default)]
    pub years: Option<usize>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub percentiles: Option<Vec<f64>>,
    #[serde(default)]
    pub representative_paths: Option<bool>,
}

/// Command-line values that win over the scenario file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub paths: Option<usize>,
    pub years: Option<usize>,
    pub preset: Option<MarketPreset>,
    pub seed: Option<u64>,
}

impl ScenarioFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read scenario {}", path.display()))?;
        Self::parse(&content).wrap_err_with(|| format!("invalid scenario {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let scenario: ScenarioFile =
            serde_saphyr::from_str(content).wrap_err("failed to parse scenario YAML")?;
        Ok(scenario)
    }

    /// Convert into a validated request
    pub fn into_request(self, overrides: &Overrides) -> Result<SimulationRequest> {
        let start_date = match &self.start_date {
            Some(text) => parse_date(text, "start_date")?,
            None => Date::new(jiff::Zoned::now().year(), 1, 1)?,
        };

        let filing_status = match &self.filing_status {
            Some(status) => status.parse()?,
            None if self.people.len() > 1 => FilingStatus::MarriedFilingJointly,
            None => FilingStatus::Single,
        };

        let profile = HouseholdProfile {
            persons: self
                .people
                .into_iter()
                .map(PersonData::into_person)
                .collect::<Result<_>>()?,
            filing_status,
            annual_expenses: self.annual_expenses,
            withdrawal_rate: self.withdrawal_rate,
            spending_model: self.spending.into_model()?,
            annual_savings: AnnualSavings {
                taxable: self.savings.taxable,
                roth: self.savings.roth,
            },
            accounts: self.accounts,
            roth_conversion: self.roth_conversion,
        };

        let mut request = SimulationRequest::new(profile, start_date);
        request.market = selection(self.market.preset.as_deref(), self.market.custom)?;
        if !self.market.periods.is_empty() {
            let periods = self
                .market
                .periods
                .into_iter()
                .map(|period| -> Result<MarketPeriod> {
                    Ok(MarketPeriod {
                        duration_years: period.years,
                        market: selection(period.preset.as_deref(), period.custom)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            request.market_periods = Some(MarketPeriods {
                schedule: if self.market.cycle {
                    PeriodSchedule::Cycle
                } else {
                    PeriodSchedule::Timeline
                },
                periods,
            });
        }

        self.taxes.apply(&mut request);

        let run = self.simulation;
        if let Some(paths) = run.paths {
            request.num_paths = paths;
        }
        request.horizon_years = run.years;
        request.seed = run.seed;
        if let Some(percentiles) = run.percentiles {
            request.percentiles = percentiles;
        }
        if let Some(enabled) = run.representative_paths {
            request.representative_paths = enabled;
        }

        overrides.apply(&mut request);
        request.validate().wrap_err("scenario failed validation")?;
        Ok(request)
    }
}

impl PersonData {
    fn into_person(self) -> Result<Person> {
        let birth_date = parse_date(&self.birth_date, "birth_date")
            .wrap_err_with(|| format!("person {}", self.name))?;
        let retirement_date = parse_date(&self.retirement_date, "retirement_date")
            .wrap_err_with(|| format!("person {}", self.name))?;

        let mut person = Person::new(self.name, birth_date, retirement_date);
        if let Some(age) = self.life_expectancy {
            person.life_expectancy = age;
        }
        person.salary = self.salary;
        person.deferral_rate = self.deferral_rate;
        person.employer_match_rate = self.employer_match_rate;
        person.social_security = self.social_security;
        person.pension = self.pension.map(|p| Pension {
            annual_amount: p.annual_amount,
            start: p.start_age.map_or(PensionStart::AtRetirement, PensionStart::AtAge),
            cost_of_living_adjustment: p.cola,
        });
        Ok(person)
    }
}

impl SpendingData {
    fn into_model(self) -> Result<SpendingModel> {
        let model = match self.model.as_deref() {
            Some(name) => name.parse()?,
            None => SpendingModel::default(),
        };
        Ok(match model {
            SpendingModel::Guardrails {
                upper,
                lower,
                adjustment,
            } => SpendingModel::Guardrails {
                upper: self.upper.unwrap_or(upper),
                lower: self.lower.unwrap_or(lower),
                adjustment: self.adjustment.unwrap_or(adjustment),
            },
            other => other,
        })
    }
}

impl TaxData {
    fn apply(self, request: &mut SimulationRequest) {
        let tax = &mut request.tax_config;
        if !self.state_brackets.is_empty() {
            tax.state = StateTax::Brackets {
                brackets: self.state_brackets,
                standard_deduction: self.state_standard_deduction,
            };
        } else if let Some(rate) = self.state_rate {
            tax.state = StateTax::Flat { rate };
        }
        if let Some(rate) = self.tax_drag_rate {
            tax.tax_drag_rate = rate;
        }
        if let Some(age) = self.rmd_start_age {
            request.rmd_start_age = age;
        }
    }
}

impl Overrides {
    pub fn apply(&self, request: &mut SimulationRequest) {
        if let Some(paths) = self.paths {
            request.num_paths = paths;
        }
        if let Some(years) = self.years {
            request.horizon_years = Some(years);
        }
        if let Some(preset) = self.preset {
            request.market = MarketSelection::Preset(preset);
            request.market_periods = None;
        }
        if let Some(seed) = self.seed {
            request.seed = Some(seed);
        }
    }
}

fn selection(preset: Option<&str>, custom: Option<MarketAssumptions>) -> Result<MarketSelection> {
    match (preset, custom) {
        (Some(_), Some(_)) => bail!("market takes either `preset` or `custom`, not both"),
        (Some(name), None) => Ok(MarketSelection::Preset(name.parse()?)),
        (None, Some(custom)) => Ok(MarketSelection::Custom(custom)),
        (None, None) => Ok(MarketSelection::default()),
    }
}

fn parse_date(text: &str, field: &str) -> Result<Date> {
    text.trim()
        .parse::<Date>()
        .wrap_err_with(|| format!("{field}: invalid date {text:?}, expected YYYY-MM-DD"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nestegg_core::model::AssetClassParams;
    use std::io::Write;

    const COUPLE: &str = r#"
start_date: 2025-01-01
people:
  - name: Alex
    birth_date: 1961-03-15
    retirement_date: 2026-01-01
    salary: 120000
    deferral_rate: 0.10
    employer_match_rate: 0.04
    social_security:
      monthly_benefit: 2600
      claiming_age: 67
  - name: Sam
    birth_date: 1963-08-01
    retirement_date: 2027-01-01
    pension:
      annual_amount: 18000
      start_age: 65
      cola: true
accounts:
  taxable: 400000
  taxable_cost_basis: 250000
  tax_deferred: 700000
  roth: 100000
annual_expenses: 85000
roth_conversion:
  annual_amount: 30000
  years: 4
spending:
  model: guardrails
  adjustment: 0.05
market:
  preset: aggressive
taxes:
  state_rate: 0.05
simulation:
  paths: 800
  years: 35
  seed: 9
"#;

    #[test]
    fn test_parse_couple() {
        let request = ScenarioFile::parse(COUPLE)
            .unwrap()
            .into_request(&Overrides::default())
            .unwrap();

        assert_eq!(request.profile.persons.len(), 2);
        assert_eq!(request.profile.filing_status, FilingStatus::MarriedFilingJointly);
        assert_eq!(request.profile.accounts.taxable_cost_basis, Some(250_000.0));
        assert_eq!(request.market, MarketSelection::Preset(MarketPreset::Aggressive));
        assert_eq!(request.tax_config.state, StateTax::Flat { rate: 0.05 });
        assert_eq!(request.num_paths, 800);
        assert_eq!(request.horizon_years, Some(35));
        assert_eq!(request.seed, Some(9));
        assert_eq!(
            request.profile.roth_conversion,
            Some(RothConversion {
                annual_amount: 30_000.0,
                years: 4
            })
        );

        let sam = &request.profile.persons[1];
        let pension = sam.pension.unwrap();
        assert_eq!(pension.start, PensionStart::AtAge(65));
        assert!(pension.cost_of_living_adjustment);

        assert_eq!(
            request.profile.spending_model,
            SpendingModel::Guardrails {
                upper: 0.20,
                lower: 0.20,
                adjustment: 0.05
            }
        );
    }

    #[test]
    fn test_overrides_win() {
        let overrides = Overrides {
            paths: Some(200),
            years: Some(20),
            preset: Some(MarketPreset::Conservative),
            seed: Some(1),
        };
        let request = ScenarioFile::parse(COUPLE)
            .unwrap()
            .into_request(&overrides)
            .unwrap();

        assert_eq!(request.num_paths, 200);
        assert_eq!(request.horizon_years, Some(20));
        assert_eq!(request.market, MarketSelection::Preset(MarketPreset::Conservative));
        assert_eq!(request.seed, Some(1));
    }

    #[test]
    fn test_custom_market_and_periods() {
        let yaml = r#"
start_date: 2025-01-01
people:
  - name: Ray
    birth_date: 1958-01-01
    retirement_date: 2024-01-01
accounts:
  roth: 300000
annual_expenses: 20000
market:
  custom:
    stock: { mean: 0.07, std_dev: 0.15 }
    bond: { mean: 0.03, std_dev: 0.05 }
    cash: { mean: 0.02, std_dev: 0.01 }
    inflation: { mean: 0.025, std_dev: 0.01 }
    stock_bond_correlation: 0.1
    allocation: { stock: 0.5, bond: 0.5, cash: 0.0 }
  periods:
    - years: 10
      preset: lost_decade
    - years: 5
      preset: moderate
  cycle: true
"#;
        let request = ScenarioFile::parse(yaml)
            .unwrap()
            .into_request(&Overrides::default())
            .unwrap();

        let MarketSelection::Custom(custom) = request.market else {
            panic!("expected custom market");
        };
        assert_eq!(custom.stock, AssetClassParams::new(0.07, 0.15));
        assert_eq!(request.profile.filing_status, FilingStatus::Single);

        let periods = request.market_periods.unwrap();
        assert_eq!(periods.schedule, PeriodSchedule::Cycle);
        assert_eq!(periods.periods.len(), 2);
        assert_eq!(
            periods.periods[0].market,
            MarketSelection::Preset(MarketPreset::LostDecade)
        );
    }

    #[test]
    fn test_preset_override_drops_periods() {
        let yaml = r#"
start_date: 2025-01-01
people:
  - name: Ray
    birth_date: 1958-01-01
    retirement_date: 2024-01-01
accounts: { taxable: 100000 }
annual_expenses: 5000
market:
  periods:
    - years: 3
      preset: stagflation
"#;
        let overrides = Overrides {
            preset: Some(MarketPreset::Moderate),
            ..Overrides::default()
        };
        let request = ScenarioFile::parse(yaml).unwrap().into_request(&overrides).unwrap();
        assert!(request.market_periods.is_none());
    }

    #[test]
    fn test_rejects_bad_input() {
        let both = r#"
people:
  - name: Ray
    birth_date: 1958-01-01
    retirement_date: 2024-01-01
annual_expenses: 5000
market:
  preset: moderate
  custom:
    stock: { mean: 0.07, std_dev: 0.15 }
    bond: { mean: 0.03, std_dev: 0.05 }
    cash: { mean: 0.02, std_dev: 0.01 }
    inflation: { mean: 0.025, std_dev: 0.01 }
    stock_bond_correlation: 0.1
    allocation: { stock: 0.5, bond: 0.5, cash: 0.0 }
"#;
        assert!(ScenarioFile::parse(both).unwrap().into_request(&Overrides::default()).is_err());

        let unknown = COUPLE.replace("preset: aggressive", "preset: moonshot");
        let err = ScenarioFile::parse(&unknown)
            .unwrap()
            .into_request(&Overrides::default())
            .unwrap_err();
        assert!(format!("{err:#}").contains("moonshot"));

        let negative = COUPLE.replace("annual_expenses: 85000", "annual_expenses: -1");
        assert!(ScenarioFile::parse(&negative).unwrap().into_request(&Overrides::default()).is_err());

        assert!(ScenarioFile::parse("people: [").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(COUPLE.as_bytes()).unwrap();

        let scenario = ScenarioFile::load(file.path()).unwrap();
        assert_eq!(scenario.people.len(), 2);
        assert_eq!(scenario.annual_expenses, 85_000.0);

        let missing = file.path().with_extension("missing");
        let err = ScenarioFile::load(&missing).unwrap_err();
        assert!(format!("{err}").contains("failed to read scenario"));
    }

    #[test]
    fn test_rejects_malformed_dates() {
        let bad = COUPLE.replace("birth_date: 1961-03-15", "birth_date: 15/03/1961");
        let err = ScenarioFile::parse(&bad)
            .unwrap()
            .into_request(&Overrides::default())
            .unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("Alex"));
        assert!(message.contains("birth_date"));
    }
}
