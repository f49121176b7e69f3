//! Correlated annual return paths
//!
//! Stock and bond draws share a common factor so their correlation matches
//! the configured coefficient:
//!
//! ```text
//! z_stock = z1
//! z_bond  = rho * z1 + sqrt(1 - rho^2) * z2
//! ```
//!
//! The blended portfolio return is the weighted sum of the class draws,
//! which is normal with the portfolio mean and the covariance-aware
//! standard deviation from `MarketAssumptions::portfolio_std_dev`. Cash and
//! inflation are drawn independently; inflation is floored at
//! `MIN_INFLATION` so the price level stays positive.
//!
//! Every path has its own RNG derived from `(seed, path_index)`, so any
//! path can be regenerated alone and results do not depend on which worker
//! ran it.

use rand::{Rng, SeedableRng, rngs::SmallRng};
use rand_distr::{Distribution, Normal, StandardNormal};

use crate::error::SimulationError;
use crate::model::{AssetAllocation, AssetClassParams, MarketAssumptions, MarketPeriods};

// 2^64 / golden ratio, spreads consecutive path indices across the seed space
const PATH_SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Lowest annual inflation a draw can produce
pub const MIN_INFLATION: f64 = -0.95;

/// One simulated year of market outcomes
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct YearReturns {
    pub stock: f64,
    pub bond: f64,
    pub cash: f64,
    pub inflation: f64,
    /// Allocation-weighted blend of the class returns
    pub portfolio: f64,
}

fn normal(profile_type: &'static str, params: AssetClassParams) -> Result<Normal<f64>, SimulationError> {
    Normal::new(params.mean, params.std_dev).map_err(|_| {
        SimulationError::InvalidDistributionParameters {
            profile_type,
            mean: params.mean,
            std_dev: params.std_dev,
            reason: "std_dev must be finite and non-negative",
        }
    })
}

/// Pre-built distributions for one market regime
#[derive(Debug, Clone)]
struct RegimeSampler {
    stock: AssetClassParams,
    bond: AssetClassParams,
    cash: Normal<f64>,
    inflation: Normal<f64>,
    rho: f64,
    rho_complement: f64,
    allocation: AssetAllocation,
}

impl RegimeSampler {
    fn new(assumptions: &MarketAssumptions) -> Result<Self, SimulationError> {
        assumptions.validate()?;
        let rho = assumptions.stock_bond_correlation;
        Ok(Self {
            stock: assumptions.stock,
            bond: assumptions.bond,
            cash: normal("cash", assumptions.cash)?,
            inflation: normal("inflation", assumptions.inflation)?,
            rho,
            rho_complement: (1.0 - rho * rho).max(0.0).sqrt(),
            allocation: assumptions.allocation,
        })
    }

    #[inline]
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> YearReturns {
        let z1: f64 = StandardNormal.sample(rng);
        let z2: f64 = StandardNormal.sample(rng);
        let stock = self.stock.mean + self.stock.std_dev * z1;
        let bond = self.bond.mean + self.bond.std_dev * (self.rho * z1 + self.rho_complement * z2);
        let cash = self.cash.sample(rng);
        let inflation = self.inflation.sample(rng).max(MIN_INFLATION);
        let w = &self.allocation;
        YearReturns {
            stock,
            bond,
            cash,
            inflation,
            portfolio: w.stock * stock + w.bond * bond + w.cash * cash,
        }
    }

    /// Every class at its mean
    fn expected(&self) -> YearReturns {
        let cash = self.cash.mean();
        let w = &self.allocation;
        YearReturns {
            stock: self.stock.mean,
            bond: self.bond.mean,
            cash,
            inflation: self.inflation.mean().max(MIN_INFLATION),
            portfolio: w.stock * self.stock.mean + w.bond * self.bond.mean + w.cash * cash,
        }
    }
}

/// Draws return paths for a request
#[derive(Debug, Clone)]
pub struct ReturnPathGenerator {
    regimes: Vec<RegimeSampler>,
    periods: Option<MarketPeriods>,
    seed: u64,
}

impl ReturnPathGenerator {
    /// Build a generator for `base`, or for each regime of `periods` when
    /// given
    pub fn new(
        base: &MarketAssumptions,
        periods: Option<&MarketPeriods>,
        seed: u64,
    ) -> Result<Self, SimulationError> {
        let regimes = match periods {
            Some(periods) => {
                periods.validate()?;
                periods
                    .periods
                    .iter()
                    .map(|p| RegimeSampler::new(&p.market.assumptions()))
                    .collect::<Result<Vec<_>, _>>()?
            }
            None => vec![RegimeSampler::new(base)?],
        };
        Ok(Self {
            regimes,
            periods: periods.cloned(),
            seed,
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// RNG for one path; identical for every call with the same index
    pub fn path_rng(&self, path_index: usize) -> SmallRng {
        SmallRng::seed_from_u64(
            self.seed
                .wrapping_add((path_index as u64).wrapping_mul(PATH_SEED_STRIDE)),
        )
    }

    #[inline]
    fn regime_for_year(&self, year: usize) -> &RegimeSampler {
        let idx = self
            .periods
            .as_ref()
            .map_or(0, |periods| periods.period_index(year));
        &self.regimes[idx.min(self.regimes.len() - 1)]
    }

    /// Fill `out` with `num_years` of returns for `path_index`
    pub fn sample_path_into(&self, path_index: usize, num_years: usize, out: &mut Vec<YearReturns>) {
        let mut rng = self.path_rng(path_index);
        out.clear();
        out.extend((0..num_years).map(|year| self.regime_for_year(year).sample(&mut rng)));
    }

    pub fn sample_path(&self, path_index: usize, num_years: usize) -> Vec<YearReturns> {
        let mut out = Vec::with_capacity(num_years);
        self.sample_path_into(path_index, num_years, &mut out);
        out
    }

    /// Deterministic path where every year earns its regime's mean returns
    pub fn expected_path(&self, num_years: usize) -> Vec<YearReturns> {
        (0..num_years)
            .map(|year| self.regime_for_year(year).expected())
            .collect()
    }

    /// Draw every path up front as N x T arrays
    pub fn generate(&self, num_paths: usize, num_years: usize) -> ReturnPaths {
        let mut paths = ReturnPaths::with_capacity(num_paths, num_years);
        let mut buf = Vec::with_capacity(num_years);
        for path in 0..num_paths {
            self.sample_path_into(path, num_years, &mut buf);
            for year in &buf {
                paths.stock.push(year.stock);
                paths.bond.push(year.bond);
                paths.cash.push(year.cash);
                paths.inflation.push(year.inflation);
                paths.portfolio.push(year.portfolio);
            }
        }
        paths
    }
}

/// Return draws for many paths, stored path-major
#[derive(Debug, Clone, Default)]
pub struct ReturnPaths {
    pub num_paths: usize,
    pub num_years: usize,
    pub stock: Vec<f64>,
    pub bond: Vec<f64>,
    pub cash: Vec<f64>,
    pub inflation: Vec<f64>,
    pub portfolio: Vec<f64>,
}

impl ReturnPaths {
    fn with_capacity(num_paths: usize, num_years: usize) -> Self {
        let len = num_paths * num_years;
        Self {
            num_paths,
            num_years,
            stock: Vec::with_capacity(len),
            bond: Vec::with_capacity(len),
            cash: Vec::with_capacity(len),
            inflation: Vec::with_capacity(len),
            portfolio: Vec::with_capacity(len),
        }
    }

    #[inline]
    fn offset(&self, path: usize, year: usize) -> usize {
        path * self.num_years + year
    }

    pub fn get(&self, path: usize, year: usize) -> Option<YearReturns> {
        if path >= self.num_paths || year >= self.num_years {
            return None;
        }
        let i = self.offset(path, year);
        Some(YearReturns {
            stock: self.stock[i],
            bond: self.bond[i],
            cash: self.cash[i],
            inflation: self.inflation[i],
            portfolio: self.portfolio[i],
        })
    }

    /// Portfolio returns of one path
    pub fn portfolio_path(&self, path: usize) -> &[f64] {
        let start = self.offset(path, 0);
        &self.portfolio[start..start + self.num_years]
    }
}
