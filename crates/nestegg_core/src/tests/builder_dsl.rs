//! Tests for the Builder DSL
//!
//! These tests demonstrate and verify the fluent builder API for creating
//! simulation requests.

use crate::config::{
    DEFAULT_NUM_PATHS, DEFAULT_PERCENTILES, PersonBuilder, SimulationBuilder, SimulationRequest,
};
use crate::error::ValidationError;
use crate::model::{
    DEFAULT_RMD_START_AGE, FilingStatus, MarketPreset, MarketSelection, PensionStart,
    SpendingModel, StateTax,
};
use crate::monte_carlo::run_simulation;

/// Test basic SimulationBuilder usage
#[test]
fn test_simulation_builder_basic() {
    let request = SimulationBuilder::new()
        .start(2025, 1, 1)
        .years(5)
        .person(PersonBuilder::new("Alex").born(1980, 6, 15).retires(2045, 1, 1))
        .build()
        .unwrap();

    assert_eq!(request.start_date, jiff::civil::date(2025, 1, 1));
    assert_eq!(request.horizon_years, Some(5));
    assert_eq!(request.num_paths, DEFAULT_NUM_PATHS);
    assert_eq!(request.percentiles, DEFAULT_PERCENTILES.to_vec());
    assert_eq!(request.rmd_start_age, DEFAULT_RMD_START_AGE);
    assert!(request.representative_paths);
    assert_eq!(request.seed, None);
    assert_eq!(request.market, MarketSelection::Preset(MarketPreset::Moderate));
}

/// Test the horizon defaults to each person's life expectancy
#[test]
fn test_default_horizon_from_life_expectancy() {
    let request = SimulationBuilder::new()
        .start(2025, 1, 1)
        .person(PersonBuilder::new("Alex").born(1960, 1, 1).retires(2025, 1, 1))
        .person(
            PersonBuilder::new("Sam")
                .born(1966, 1, 1)
                .retires(2030, 1, 1)
                .life_expectancy(90),
        )
        .build()
        .unwrap();

    // Alex: 65 -> 95 is 30 years; Sam: 59 -> 90 is 31 years
    assert_eq!(request.resolved_horizon(), 31);
}

/// Test a couple with every income source
#[test]
fn test_couple_with_income_sources() {
    let request = SimulationBuilder::new()
        .filing_status(FilingStatus::MarriedFilingJointly)
        .person(
            PersonBuilder::new("Alex")
                .born(1965, 3, 14)
                .retires(2030, 1, 1)
                .salary(120_000.0)
                .deferral(0.10)
                .employer_match(0.04)
                .social_security(2_800.0, 67)
                .pension(24_000.0, true),
        )
        .person(
            PersonBuilder::new("Sam")
                .born(1967, 8, 2)
                .retires(2032, 1, 1)
                .salary(80_000.0)
                .social_security(1_900.0, 70)
                .pension_at_age(12_000.0, 65, false),
        )
        .taxable_with_basis(250_000.0, 150_000.0)
        .tax_deferred(600_000.0)
        .roth(100_000.0)
        .annual_savings(10_000.0, 7_000.0)
        .annual_expenses(85_000.0)
        .state_tax(StateTax::Flat { rate: 0.05 })
        .years(40)
        .build()
        .unwrap();

    let profile = &request.profile;
    assert_eq!(profile.persons.len(), 2);
    assert_eq!(profile.primary().map(|p| p.name.as_str()), Some("Alex"));
    assert_eq!(profile.persons[1].pension.map(|p| p.start), Some(PensionStart::AtAge(65)));
    assert_eq!(profile.accounts.taxable_cost_basis, Some(150_000.0));
    assert_eq!(request.tax_config.state, StateTax::Flat { rate: 0.05 });
}

/// Test that the builder validates on build
#[test]
fn test_builder_rejects_invalid_input() {
    let no_person = SimulationBuilder::new().years(10).build();
    assert!(matches!(no_person, Err(ValidationError::InvalidHousehold(_))));

    let bad_rate = SimulationBuilder::new()
        .person(PersonBuilder::new("Alex"))
        .withdrawal_rate(1.5)
        .years(10)
        .build();
    assert!(matches!(bad_rate, Err(ValidationError::OutOfRange { .. })));

    let bad_claim = SimulationBuilder::new()
        .person(PersonBuilder::new("Alex").social_security(2_000.0, 75))
        .years(10)
        .build();
    assert!(bad_claim.is_err());

    let unborn = SimulationBuilder::new()
        .start(2025, 1, 1)
        .person(PersonBuilder::new("Alex").born(2026, 1, 1).retires(2090, 1, 1))
        .years(10)
        .build();
    assert!(matches!(unborn, Err(ValidationError::InvalidPerson { .. })));

    let too_long = SimulationBuilder::new()
        .person(PersonBuilder::new("Alex"))
        .years(101)
        .build();
    assert!(matches!(too_long, Err(ValidationError::OutOfRange { .. })));
}

/// Test the final simulated year must stay within the calendar range
#[test]
fn test_horizon_past_last_calendar_year_rejected() {
    let builder = || {
        SimulationBuilder::new()
            .start(9990, 1, 1)
            .person(PersonBuilder::new("Alex").born(9930, 1, 1).retires(9990, 1, 1))
    };

    // 9990..=9999 is exactly ten years
    assert!(builder().years(10).build().is_ok());

    let err = builder().years(20).build().unwrap_err();
    match err {
        ValidationError::OutOfRange { field, max, .. } => {
            assert_eq!(field, "horizon_years");
            assert_eq!(max, 10.0);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

/// Test build_unchecked skips validation
#[test]
fn test_build_unchecked() {
    let request = SimulationBuilder::new().paths(0).build_unchecked();
    assert_eq!(request.num_paths, 0);
    assert!(request.validate().is_err());
}

/// Test a built request round-trips through JSON and runs
#[test]
fn test_builder_request_runs() {
    let request = SimulationBuilder::new()
        .person(PersonBuilder::new("Alex").born(1958, 2, 1).retires(2024, 1, 1))
        .taxable(400_000.0)
        .roth(200_000.0)
        .annual_expenses(30_000.0)
        .spending_model(SpendingModel::DEFAULT_GUARDRAILS)
        .preset(MarketPreset::Conservative)
        .years(20)
        .paths(150)
        .seed(3)
        .build()
        .unwrap();

    let json = serde_json::to_string(&request).unwrap();
    let parsed: SimulationRequest = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, request);

    let result = run_simulation(&parsed).unwrap();
    assert_eq!(result.num_paths_completed, 150);
}
