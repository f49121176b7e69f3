//! Simulation request
//!
//! `SimulationRequest` carries everything a Monte Carlo run needs: the
//! household, market assumptions, tax tables and run settings.
//!
//! # Builder DSL
//!
//! ```ignore
//! use nestegg_core::config::{PersonBuilder, SimulationBuilder};
//! use nestegg_core::model::MarketPreset;
//!
//! let request = SimulationBuilder::new()
//!     .start(2025, 1, 1)
//!     .person(PersonBuilder::new("Alex")
//!         .born(1960, 4, 1)
//!         .retires(2025, 1, 1)
//!         .social_security(2_400.0, 67))
//!     .taxable(600_000.0)
//!     .tax_deferred(400_000.0)
//!     .annual_expenses(40_000.0)
//!     .preset(MarketPreset::Moderate)
//!     .paths(1_000)
//!     .seed(42)
//!     .build()?;
//! ```

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::model::{
    DEFAULT_RMD_START_AGE, HouseholdProfile, MarketAssumptions, MarketPeriods, MarketSelection,
    TaxConfig,
};

pub mod builder;
pub mod person_builder;

pub use builder::SimulationBuilder;
pub use person_builder::PersonBuilder;

pub const DEFAULT_NUM_PATHS: usize = 5_000;
pub const MAX_NUM_PATHS: usize = 50_000;
pub const MAX_HORIZON_YEARS: usize = 100;
pub const DEFAULT_PERCENTILES: [f64; 5] = [10.0, 25.0, 50.0, 75.0, 90.0];
/// Always reported, whatever the request asks for
pub const REQUIRED_PERCENTILES: [f64; 3] = [10.0, 50.0, 90.0];
/// Last calendar year a date can fall in
pub const MAX_CALENDAR_YEAR: i16 = 9999;

fn default_num_paths() -> usize {
    DEFAULT_NUM_PATHS
}

fn default_percentiles() -> Vec<f64> {
    DEFAULT_PERCENTILES.to_vec()
}

fn default_true() -> bool {
    true
}

fn default_rmd_start_age() -> u8 {
    DEFAULT_RMD_START_AGE
}

/// Complete input for one Monte Carlo run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub profile: HouseholdProfile,

    // === Market ===
    #[serde(default)]
    pub market: MarketSelection,
    /// Regime schedule overriding `market` year by year
    #[serde(default)]
    pub market_periods: Option<MarketPeriods>,

    // === Run settings ===
    #[serde(default = "default_num_paths")]
    pub num_paths: usize,
    /// Years to simulate; defaults to the household's life expectancy
    #[serde(default)]
    pub horizon_years: Option<usize>,
    pub start_date: Date,
    /// Fixed seed for reproducible runs; drawn from OS entropy when absent
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_percentiles")]
    pub percentiles: Vec<f64>,
    /// Re-simulate the paths nearest the 10th/50th/90th percentile with
    /// full ledgers
    #[serde(default = "default_true")]
    pub representative_paths: bool,

    // === Tax law ===
    #[serde(default)]
    pub tax_config: TaxConfig,
    #[serde(default = "default_rmd_start_age")]
    pub rmd_start_age: u8,
}

impl SimulationRequest {
    pub fn new(profile: HouseholdProfile, start_date: Date) -> Self {
        Self {
            profile,
            market: MarketSelection::default(),
            market_periods: None,
            num_paths: DEFAULT_NUM_PATHS,
            horizon_years: None,
            start_date,
            seed: None,
            percentiles: default_percentiles(),
            representative_paths: true,
            tax_config: TaxConfig::default(),
            rmd_start_age: DEFAULT_RMD_START_AGE,
        }
    }

    /// Base market assumptions (before any regime schedule)
    pub fn market_assumptions(&self) -> MarketAssumptions {
        self.market.assumptions()
    }

    /// Explicit horizon, or years until the last person reaches their life
    /// expectancy
    pub fn resolved_horizon(&self) -> usize {
        self.horizon_years
            .unwrap_or_else(|| self.profile.horizon_years(self.start_date))
    }

    /// Requested percentiles plus `REQUIRED_PERCENTILES`, sorted and
    /// without duplicates
    pub fn resolved_percentiles(&self) -> Vec<f64> {
        let mut all: Vec<f64> = self
            .percentiles
            .iter()
            .chain(REQUIRED_PERCENTILES.iter())
            .copied()
            .collect();
        all.sort_by(f64::total_cmp);
        all.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
        all
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.profile.validate(self.start_date)?;
        self.market.validate()?;
        if let Some(periods) = &self.market_periods {
            periods.validate()?;
        }

        if self.num_paths == 0 {
            return Err(ValidationError::ZeroPaths);
        }
        if self.num_paths > MAX_NUM_PATHS {
            return Err(ValidationError::OutOfRange {
                field: "num_paths",
                value: self.num_paths as f64,
                min: 1.0,
                max: MAX_NUM_PATHS as f64,
            });
        }

        let horizon = self.resolved_horizon();
        if horizon == 0 {
            return Err(ValidationError::ZeroHorizon);
        }
        if horizon > MAX_HORIZON_YEARS {
            return Err(ValidationError::OutOfRange {
                field: "horizon_years",
                value: horizon as f64,
                min: 1.0,
                max: MAX_HORIZON_YEARS as f64,
            });
        }
        // The final simulated year must still be a valid calendar date
        let max_horizon = i64::from(MAX_CALENDAR_YEAR) - i64::from(self.start_date.year()) + 1;
        if horizon as i64 > max_horizon {
            return Err(ValidationError::OutOfRange {
                field: "horizon_years",
                value: horizon as f64,
                min: 1.0,
                max: max_horizon.max(0) as f64,
            });
        }

        for &p in &self.percentiles {
            if !p.is_finite() || !(0.0..=100.0).contains(&p) {
                return Err(ValidationError::InvalidPercentile(p));
            }
        }

        ValidationError::check_range("rmd_start_age", f64::from(self.rmd_start_age), 70.0, 80.0)?;
        self.tax_config.validate()
    }
}
