//! Capital-market assumptions: per-class return parameters, allocation,
//! named presets and optional regime schedules.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Tolerance for allocation weights summing to 1
pub const ALLOCATION_TOLERANCE: f64 = 1e-6;

/// Annual mean and volatility of one asset class (or inflation)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssetClassParams {
    pub mean: f64,
    pub std_dev: f64,
}

impl AssetClassParams {
    pub const fn new(mean: f64, std_dev: f64) -> Self {
        Self { mean, std_dev }
    }

    fn validate(&self, field: &'static str) -> Result<(), ValidationError> {
        if !self.mean.is_finite() {
            return Err(ValidationError::NonFinite {
                field,
                value: self.mean,
            });
        }
        ValidationError::check_amount(field, self.std_dev)
    }
}

/// Portfolio weights across stock, bond and cash
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssetAllocation {
    pub stock: f64,
    pub bond: f64,
    pub cash: f64,
}

impl AssetAllocation {
    pub const fn new(stock: f64, bond: f64, cash: f64) -> Self {
        Self { stock, bond, cash }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let weights = [self.stock, self.bond, self.cash];
        let total: f64 = weights.iter().sum();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0)
            || (total - 1.0).abs() > ALLOCATION_TOLERANCE
        {
            return Err(ValidationError::InvalidAllocation {
                stock: self.stock,
                bond: self.bond,
                cash: self.cash,
            });
        }
        Ok(())
    }

    /// Replace the stock weight and rescale bond and cash so their ratio is
    /// preserved and the weights still sum to 1.
    ///
    /// With no bond or cash weight to scale, the remainder goes to bonds.
    pub fn with_stock_weight(&self, stock: f64) -> Result<Self, ValidationError> {
        ValidationError::check_range("stock_weight", stock, 0.0, 1.0)?;
        let remainder = 1.0 - stock;
        let non_stock = self.bond + self.cash;
        let (bond, cash) = if non_stock > 0.0 {
            (
                remainder * self.bond / non_stock,
                remainder * self.cash / non_stock,
            )
        } else {
            (remainder, 0.0)
        };
        Ok(Self { stock, bond, cash })
    }
}

/// Immutable parameter bundle for one market regime
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketAssumptions {
    pub stock: AssetClassParams,
    pub bond: AssetClassParams,
    pub cash: AssetClassParams,
    pub inflation: AssetClassParams,
    /// Correlation coefficient between stock and bond returns
    pub stock_bond_correlation: f64,
    pub allocation: AssetAllocation,
}

impl MarketAssumptions {
    // Forward-looking capital-market defaults used by the allocation presets
    pub const DEFAULT_STOCK: AssetClassParams = AssetClassParams::new(0.10, 0.18);
    pub const DEFAULT_BOND: AssetClassParams = AssetClassParams::new(0.04, 0.06);
    pub const DEFAULT_CASH: AssetClassParams = AssetClassParams::new(0.015, 0.005);
    pub const DEFAULT_INFLATION: AssetClassParams = AssetClassParams::new(0.03, 0.01);
    // Long-run US stock/bond correlation of annual returns, 1928-2023
    pub const DEFAULT_CORRELATION: f64 = 0.1;

    /// Build and validate a custom set of assumptions
    pub fn new(
        stock: AssetClassParams,
        bond: AssetClassParams,
        cash: AssetClassParams,
        inflation: AssetClassParams,
        stock_bond_correlation: f64,
        allocation: AssetAllocation,
    ) -> Result<Self, ValidationError> {
        let assumptions = Self {
            stock,
            bond,
            cash,
            inflation,
            stock_bond_correlation,
            allocation,
        };
        assumptions.validate()?;
        Ok(assumptions)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.stock.validate("stock")?;
        self.bond.validate("bond")?;
        self.cash.validate("cash")?;
        self.inflation.validate("inflation")?;
        let rho = self.stock_bond_correlation;
        if !rho.is_finite() || !(-1.0..=1.0).contains(&rho) {
            return Err(ValidationError::InvalidCorrelation(rho));
        }
        self.allocation.validate()
    }

    #[must_use]
    pub fn with_allocation(mut self, allocation: AssetAllocation) -> Self {
        self.allocation = allocation;
        self
    }

    /// Expected annual portfolio return
    pub fn portfolio_mean(&self) -> f64 {
        let w = &self.allocation;
        w.stock * self.stock.mean + w.bond * self.bond.mean + w.cash * self.cash.mean
    }

    /// Portfolio variance including the stock/bond covariance term.
    /// Cash is independent of both.
    pub fn portfolio_variance(&self) -> f64 {
        let w = &self.allocation;
        let s = w.stock * self.stock.std_dev;
        let b = w.bond * self.bond.std_dev;
        let c = w.cash * self.cash.std_dev;
        s * s + b * b + 2.0 * self.stock_bond_correlation * s * b + c * c
    }

    pub fn portfolio_std_dev(&self) -> f64 {
        self.portfolio_variance().max(0.0).sqrt()
    }

    /// Weighted average of the class volatilities. Only equals the true
    /// portfolio volatility when every correlation is 1.
    pub fn naive_std_dev(&self) -> f64 {
        let w = &self.allocation;
        w.stock * self.stock.std_dev + w.bond * self.bond.std_dev + w.cash * self.cash.std_dev
    }
}

impl Default for MarketAssumptions {
    fn default() -> Self {
        MarketPreset::Moderate.assumptions()
    }
}

// ============================================================================
// Presets
// ============================================================================

/// Named market scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketPreset {
    Conservative,
    #[default]
    #[serde(alias = "balanced")]
    Moderate,
    Aggressive,
    HistoricalUs,
    Stagflation,
    LostDecade,
}

impl MarketPreset {
    pub const ALL: [MarketPreset; 6] = [
        MarketPreset::Conservative,
        MarketPreset::Moderate,
        MarketPreset::Aggressive,
        MarketPreset::HistoricalUs,
        MarketPreset::Stagflation,
        MarketPreset::LostDecade,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MarketPreset::Conservative => "conservative",
            MarketPreset::Moderate => "moderate",
            MarketPreset::Aggressive => "aggressive",
            MarketPreset::HistoricalUs => "historical_us",
            MarketPreset::Stagflation => "stagflation",
            MarketPreset::LostDecade => "lost_decade",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            MarketPreset::Conservative => "30% stock / 60% bond / 10% cash",
            MarketPreset::Moderate => "60% stock / 35% bond / 5% cash",
            MarketPreset::Aggressive => "80% stock / 20% bond",
            MarketPreset::HistoricalUs => "long-run US means and volatilities, 60/35/5",
            MarketPreset::Stagflation => "low real returns with high, volatile inflation",
            MarketPreset::LostDecade => "flat equities with elevated volatility",
        }
    }

    pub fn assumptions(self) -> MarketAssumptions {
        let defaults = |allocation| MarketAssumptions {
            stock: MarketAssumptions::DEFAULT_STOCK,
            bond: MarketAssumptions::DEFAULT_BOND,
            cash: MarketAssumptions::DEFAULT_CASH,
            inflation: MarketAssumptions::DEFAULT_INFLATION,
            stock_bond_correlation: MarketAssumptions::DEFAULT_CORRELATION,
            allocation,
        };
        let balanced = AssetAllocation::new(0.60, 0.35, 0.05);

        match self {
            MarketPreset::Conservative => defaults(AssetAllocation::new(0.30, 0.60, 0.10)),
            MarketPreset::Moderate => defaults(balanced),
            MarketPreset::Aggressive => defaults(AssetAllocation::new(0.80, 0.20, 0.0)),
            // S&P 500 total return 1927-2023 (Shiller), US long government
            // bonds and T-bills (Damodaran), CPI-U 1948-2025 (FRED)
            MarketPreset::HistoricalUs => MarketAssumptions {
                stock: AssetClassParams::new(0.11471, 0.18146),
                bond: AssetClassParams::new(0.047717, 0.0700793),
                cash: AssetClassParams::new(0.0341782, 0.0305423),
                inflation: AssetClassParams::new(0.0347068, 0.0279436),
                stock_bond_correlation: 0.1,
                allocation: balanced,
            },
            // Roughly 1966-1981: stocks and bonds move together under
            // inflation shocks
            MarketPreset::Stagflation => MarketAssumptions {
                stock: AssetClassParams::new(0.05, 0.22),
                bond: AssetClassParams::new(0.02, 0.09),
                cash: AssetClassParams::new(0.04, 0.01),
                inflation: AssetClassParams::new(0.06, 0.025),
                stock_bond_correlation: 0.4,
                allocation: balanced,
            },
            // Roughly 2000-2009
            MarketPreset::LostDecade => MarketAssumptions {
                stock: AssetClassParams::new(0.01, 0.22),
                bond: AssetClassParams::new(0.045, 0.07),
                cash: AssetClassParams::new(0.02, 0.005),
                inflation: AssetClassParams::new(0.025, 0.012),
                stock_bond_correlation: -0.2,
                allocation: balanced,
            },
        }
    }
}

impl fmt::Display for MarketPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MarketPreset {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "conservative" => Ok(MarketPreset::Conservative),
            "moderate" | "balanced" => Ok(MarketPreset::Moderate),
            "aggressive" => Ok(MarketPreset::Aggressive),
            "historical_us" | "historical" => Ok(MarketPreset::HistoricalUs),
            "stagflation" => Ok(MarketPreset::Stagflation),
            "lost_decade" => Ok(MarketPreset::LostDecade),
            _ => Err(ValidationError::UnknownPreset(s.to_string())),
        }
    }
}

/// Either a named preset or fully custom assumptions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketSelection {
    Preset(MarketPreset),
    Custom(MarketAssumptions),
}

impl MarketSelection {
    pub fn assumptions(&self) -> MarketAssumptions {
        match self {
            MarketSelection::Preset(preset) => preset.assumptions(),
            MarketSelection::Custom(custom) => *custom,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.assumptions().validate()
    }
}

impl Default for MarketSelection {
    fn default() -> Self {
        MarketSelection::Preset(MarketPreset::default())
    }
}

impl From<MarketPreset> for MarketSelection {
    fn from(preset: MarketPreset) -> Self {
        MarketSelection::Preset(preset)
    }
}

// ============================================================================
// Regime schedules
// ============================================================================

/// How a list of market periods maps onto simulated years
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodSchedule {
    /// Each period once, in order; the last one persists
    #[default]
    Timeline,
    /// The whole list repeats
    Cycle,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketPeriod {
    pub duration_years: usize,
    pub market: MarketSelection,
}

/// Ordered market regimes replacing the base assumptions year by year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketPeriods {
    #[serde(default)]
    pub schedule: PeriodSchedule,
    pub periods: Vec<MarketPeriod>,
}

impl MarketPeriods {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.periods.is_empty() {
            return Err(ValidationError::EmptyMarketPeriods);
        }
        for period in &self.periods {
            if period.duration_years == 0 {
                return Err(ValidationError::OutOfRange {
                    field: "duration_years",
                    value: 0.0,
                    min: 1.0,
                    max: f64::MAX,
                });
            }
            period.market.validate()?;
        }
        Ok(())
    }

    fn total_years(&self) -> usize {
        self.periods.iter().map(|p| p.duration_years).sum()
    }

    /// Index of the period governing simulated year `year` (0-based)
    pub fn period_index(&self, year: usize) -> usize {
        let total = self.total_years();
        let mut remaining = match self.schedule {
            PeriodSchedule::Cycle if total > 0 => year % total,
            _ => year,
        };
        for (idx, period) in self.periods.iter().enumerate() {
            if remaining < period.duration_years {
                return idx;
            }
            remaining -= period.duration_years;
        }
        self.periods.len().saturating_sub(1)
    }
}
