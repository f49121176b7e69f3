//! Tests for correlated return paths
//!
//! These tests verify that:
//! - Stock and bond draws show the configured correlation
//! - Portfolio draws match the covariance-aware mean and volatility
//! - Paths are reproducible from `(seed, path_index)` alone
//! - Inflation draws never fall below `MIN_INFLATION`
//! - Regime schedules switch assumptions on the right years

use crate::model::{
    AssetAllocation, AssetClassParams, MarketAssumptions, MarketPeriod, MarketPeriods,
    MarketPreset, MarketSelection, PeriodSchedule,
};
use crate::returns::{MIN_INFLATION, ReturnPathGenerator};

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

fn correlation(a: &[f64], b: &[f64]) -> f64 {
    let (ma, mb) = (mean(a), mean(b));
    let cov = a.iter().zip(b).map(|(x, y)| (x - ma) * (y - mb)).sum::<f64>();
    let va = a.iter().map(|x| (x - ma).powi(2)).sum::<f64>();
    let vb = b.iter().map(|y| (y - mb).powi(2)).sum::<f64>();
    cov / (va * vb).sqrt()
}

/// Constant returns: every class and inflation fixed at one value
fn fixed(rate: f64, inflation: f64) -> MarketAssumptions {
    MarketAssumptions::new(
        AssetClassParams::new(rate, 0.0),
        AssetClassParams::new(rate, 0.0),
        AssetClassParams::new(rate, 0.0),
        AssetClassParams::new(inflation, 0.0),
        0.0,
        AssetAllocation::new(0.6, 0.4, 0.0),
    )
    .unwrap()
}

// ============================================================================
// Distribution
// ============================================================================

#[test]
fn test_empirical_stock_bond_correlation() {
    let market = MarketPreset::Moderate
        .assumptions()
        .with_allocation(AssetAllocation::new(0.6, 0.4, 0.0));
    let market = MarketAssumptions {
        stock_bond_correlation: 0.5,
        ..market
    };
    let paths = ReturnPathGenerator::new(&market, None, 2024)
        .unwrap()
        .generate(2_000, 10);

    let rho = correlation(&paths.stock, &paths.bond);
    assert!((rho - 0.5).abs() < 0.03, "Empirical correlation {rho:.4} should be near 0.5");

    let infl_rho = correlation(&paths.stock, &paths.inflation);
    assert!(infl_rho.abs() < 0.03, "Inflation should be independent, got {infl_rho:.4}");
}

#[test]
fn test_portfolio_moments_match_assumptions() {
    let market = MarketPreset::Moderate.assumptions();
    let paths = ReturnPathGenerator::new(&market, None, 99)
        .unwrap()
        .generate(4_000, 10);

    let m = mean(&paths.portfolio);
    let s = std_dev(&paths.portfolio);
    assert!(
        (m - market.portfolio_mean()).abs() < 0.005,
        "Sample mean {m:.4} vs {:.4}",
        market.portfolio_mean()
    );
    assert!(
        (s - market.portfolio_std_dev()).abs() < 0.005,
        "Sample std {s:.4} vs {:.4}",
        market.portfolio_std_dev()
    );
    assert!(market.portfolio_std_dev() < market.naive_std_dev());
}

#[test]
fn test_inflation_draws_are_floored() {
    let market = MarketAssumptions {
        inflation: AssetClassParams::new(0.03, 0.6),
        ..MarketPreset::Moderate.assumptions()
    };
    let paths = ReturnPathGenerator::new(&market, None, 5)
        .unwrap()
        .generate(500, 20);

    assert!(paths.inflation.iter().all(|i| *i >= MIN_INFLATION));
    assert!(paths.inflation.iter().any(|i| *i == MIN_INFLATION));
}

#[test]
fn test_expected_path_uses_regime_means() {
    let market = MarketPreset::Moderate.assumptions();
    let generator = ReturnPathGenerator::new(&market, None, 5).unwrap();
    let path = generator.expected_path(4);

    assert_eq!(path.len(), 4);
    for year in &path {
        assert_eq!(year.stock, market.stock.mean);
        assert_eq!(year.inflation, market.inflation.mean);
        assert!((year.portfolio - market.portfolio_mean()).abs() < 1e-12);
    }
}

// ============================================================================
// Reproducibility
// ============================================================================

#[test]
fn test_same_seed_same_paths() {
    let market = MarketPreset::Aggressive.assumptions();
    let a = ReturnPathGenerator::new(&market, None, 7).unwrap().generate(50, 20);
    let b = ReturnPathGenerator::new(&market, None, 7).unwrap().generate(50, 20);
    assert_eq!(a.portfolio, b.portfolio);
    assert_eq!(a.inflation, b.inflation);
}

#[test]
fn test_different_seed_different_paths() {
    let market = MarketPreset::Aggressive.assumptions();
    let a = ReturnPathGenerator::new(&market, None, 7).unwrap().generate(5, 5);
    let b = ReturnPathGenerator::new(&market, None, 8).unwrap().generate(5, 5);
    assert_ne!(a.portfolio, b.portfolio);
}

#[test]
fn test_single_path_regenerates_in_isolation() {
    let market = MarketPreset::HistoricalUs.assumptions();
    let generator = ReturnPathGenerator::new(&market, None, 123).unwrap();
    let all = generator.generate(30, 15);

    let alone = generator.sample_path(17, 15);
    let from_grid: Vec<f64> = all.portfolio_path(17).to_vec();
    let regenerated: Vec<f64> = alone.iter().map(|y| y.portfolio).collect();
    assert_eq!(from_grid, regenerated);
    assert_eq!(all.get(17, 3), Some(alone[3]));
    assert_eq!(all.get(30, 0), None);
}

// ============================================================================
// Regime schedules
// ============================================================================

#[test]
fn test_timeline_last_period_persists() {
    let periods = MarketPeriods {
        schedule: PeriodSchedule::Timeline,
        periods: vec![
            MarketPeriod {
                duration_years: 3,
                market: MarketSelection::Custom(fixed(0.05, 0.02)),
            },
            MarketPeriod {
                duration_years: 2,
                market: MarketSelection::Custom(fixed(0.01, 0.04)),
            },
        ],
    };
    let generator =
        ReturnPathGenerator::new(&MarketAssumptions::default(), Some(&periods), 1).unwrap();
    let path = generator.sample_path(0, 8);

    for year in &path[..3] {
        assert!((year.portfolio - 0.05).abs() < 1e-12);
        assert!((year.inflation - 0.02).abs() < 1e-12);
    }
    for year in &path[3..] {
        assert!((year.portfolio - 0.01).abs() < 1e-12);
        assert!((year.inflation - 0.04).abs() < 1e-12);
    }
}

#[test]
fn test_cycle_repeats_pattern() {
    let periods = MarketPeriods {
        schedule: PeriodSchedule::Cycle,
        periods: vec![
            MarketPeriod {
                duration_years: 1,
                market: MarketSelection::Custom(fixed(0.08, 0.0)),
            },
            MarketPeriod {
                duration_years: 1,
                market: MarketSelection::Custom(fixed(-0.02, 0.0)),
            },
        ],
    };
    let generator =
        ReturnPathGenerator::new(&MarketAssumptions::default(), Some(&periods), 1).unwrap();
    let returns: Vec<f64> = generator.sample_path(0, 6).iter().map(|y| y.portfolio).collect();

    for (year, r) in returns.iter().enumerate() {
        let expected = if year % 2 == 0 { 0.08 } else { -0.02 };
        assert!((r - expected).abs() < 1e-12, "year {year}: {r}");
    }
}

#[test]
fn test_empty_schedule_rejected() {
    let periods = MarketPeriods {
        schedule: PeriodSchedule::Timeline,
        periods: vec![],
    };
    assert!(ReturnPathGenerator::new(&MarketAssumptions::default(), Some(&periods), 1).is_err());
}
