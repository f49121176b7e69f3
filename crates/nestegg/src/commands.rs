//! Subcommand implementations
//!
//! Each command returns the text it would print so it can be tested
//! without capturing stdout.

use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::eyre::{Result, WrapErr};
use nestegg_core::{
    DEFAULT_COMPARISON, RothConversion, RunOptions, analyze_roth_conversion,
    analyze_social_security_strategies, compare_presets, project_cashflows,
    run_simulation_with_options,
};

use crate::report::{
    render_cashflow, render_claiming, render_comparison, render_presets, render_roth_conversion,
    render_summary,
};
use crate::scenario::{Overrides, ScenarioFile};

/// Options of the `run` command
#[derive(Debug, Clone, Default)]
pub struct RunCommand {
    pub scenario: PathBuf,
    pub overrides: Overrides,
    pub timeout: Option<Duration>,
    /// Write the full result as JSON here
    pub output: Option<PathBuf>,
}

pub fn run(command: &RunCommand) -> Result<String> {
    let request = ScenarioFile::load(&command.scenario)?.into_request(&command.overrides)?;
    tracing::info!(
        scenario = %command.scenario.display(),
        paths = request.num_paths,
        horizon = request.resolved_horizon(),
        "running simulation"
    );

    let mut options = RunOptions::default();
    if let Some(timeout) = command.timeout {
        options = options.with_time_budget(timeout);
    }
    let result = run_simulation_with_options(&request, &options)?;

    if let Some(path) = &command.output {
        write_json(path, &result)?;
        tracing::info!(output = %path.display(), "wrote result");
    }
    Ok(render_summary(&result))
}

pub fn compare(scenario: &Path, overrides: &Overrides) -> Result<String> {
    let request = ScenarioFile::load(scenario)?.into_request(overrides)?;
    tracing::info!(scenario = %scenario.display(), "comparing presets");
    let comparisons = compare_presets(&request, &DEFAULT_COMPARISON, &RunOptions::default())?;
    Ok(render_comparison(&comparisons))
}

pub fn claiming(scenario: &Path, overrides: &Overrides) -> Result<String> {
    let request = ScenarioFile::load(scenario)?.into_request(overrides)?;
    tracing::info!(scenario = %scenario.display(), "sweeping claiming ages");
    let points = analyze_social_security_strategies(&request, &RunOptions::default())?;
    Ok(render_claiming(&points))
}

pub fn roth(scenario: &Path, overrides: &Overrides, conversion: RothConversion) -> Result<String> {
    let request = ScenarioFile::load(scenario)?.into_request(overrides)?;
    tracing::info!(
        scenario = %scenario.display(),
        amount = conversion.annual_amount,
        years = conversion.years,
        "comparing roth conversion"
    );
    let analysis = analyze_roth_conversion(&request, conversion, &RunOptions::default())?;
    Ok(render_roth_conversion(&analysis))
}

/// Deterministic projection; `output` receives the full ledger as JSON
pub fn cashflow(scenario: &Path, overrides: &Overrides, output: Option<&Path>) -> Result<String> {
    let request = ScenarioFile::load(scenario)?.into_request(overrides)?;
    let projection = project_cashflows(&request)?;
    if let Some(path) = output {
        write_json(path, &projection)?;
        tracing::info!(output = %path.display(), "wrote projection");
    }
    Ok(render_cashflow(&projection))
}

pub fn presets() -> String {
    render_presets()
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).wrap_err("failed to serialize result")?;
    std::fs::write(path, json).wrap_err_with(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nestegg_core::{MarketPreset, SimulationResult};

    const SCENARIO: &str = r#"
start_date: 2025-01-01
people:
  - name: Alex
    birth_date: 1960-01-01
    retirement_date: 2025-01-01
    social_security: { monthly_benefit: 2000, claiming_age: 67 }
accounts:
  taxable: 500000
  tax_deferred: 300000
annual_expenses: 35000
simulation:
  paths: 300
  years: 20
  seed: 5
"#;

    fn scenario_file(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("household.yaml");
        std::fs::write(&path, SCENARIO).unwrap();
        path
    }

    #[test]
    fn test_run_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("result.json");
        let command = RunCommand {
            scenario: scenario_file(&dir),
            output: Some(output.clone()),
            ..RunCommand::default()
        };

        let text = run(&command).unwrap();
        assert!(text.contains("300 paths over 20 years"));

        let json = std::fs::read_to_string(&output).unwrap();
        let result: SimulationResult = serde_json::from_str(&json).unwrap();
        assert_eq!(result.seed, 5);
        assert_eq!(result.num_paths_completed, 300);
        assert_eq!(result.horizon_years, 20);
    }

    #[test]
    fn test_run_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let command = RunCommand {
            scenario: scenario_file(&dir),
            overrides: Overrides {
                paths: Some(100),
                years: Some(10),
                seed: Some(77),
                preset: Some(MarketPreset::Conservative),
            },
            ..RunCommand::default()
        };

        let text = run(&command).unwrap();
        assert!(text.starts_with("100 paths over 10 years (2025-2034), seed 77"));
    }

    #[test]
    fn test_run_zero_timeout_fails() {
        let dir = tempfile::tempdir().unwrap();
        let command = RunCommand {
            scenario: scenario_file(&dir),
            timeout: Some(Duration::ZERO),
            ..RunCommand::default()
        };
        assert!(run(&command).is_err());
    }

    #[test]
    fn test_missing_scenario() {
        let command = RunCommand {
            scenario: PathBuf::from("/nonexistent/household.yaml"),
            ..RunCommand::default()
        };
        let err = run(&command).unwrap_err();
        assert!(format!("{err}").contains("failed to read scenario"));
    }

    #[test]
    fn test_compare_default_presets() {
        let dir = tempfile::tempdir().unwrap();
        let text = compare(&scenario_file(&dir), &Overrides::default()).unwrap();

        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("conservative"));
        assert!(lines[2].starts_with("moderate"));
        assert!(lines[3].starts_with("aggressive"));
    }

    #[test]
    fn test_claiming_sweeps_nine_ages() {
        let dir = tempfile::tempdir().unwrap();
        let overrides = Overrides {
            paths: Some(100),
            ..Overrides::default()
        };
        let text = claiming(&scenario_file(&dir), &overrides).unwrap();

        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 10);
        assert!(lines[1].starts_with("Alex") && lines[1].contains(" 62 "));
        assert!(lines[6].contains("$2,000"));
        assert!(lines[9].contains(" 70 "));
    }

    #[test]
    fn test_roth_reports_both_runs() {
        let dir = tempfile::tempdir().unwrap();
        let overrides = Overrides {
            paths: Some(100),
            ..Overrides::default()
        };
        let conversion = RothConversion {
            annual_amount: 25_000.0,
            years: 3,
        };
        let text = roth(&scenario_file(&dir), &overrides, conversion).unwrap();
        assert!(text.starts_with("Converting $25,000 a year for 3 retired years"));
        assert!(text.contains("Baseline"));
        assert!(text.contains("Converted"));
        assert!(text.contains("Change"));
    }

    #[test]
    fn test_cashflow_writes_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("cashflow.json");
        let text = cashflow(&scenario_file(&dir), &Overrides::default(), Some(&output)).unwrap();
        assert!(text.contains("Final balance:"));

        let json = std::fs::read_to_string(&output).unwrap();
        let projection: nestegg_core::CashflowProjection = serde_json::from_str(&json).unwrap();
        assert_eq!(projection.ledger.len(), 20);
        assert_eq!(projection.ledger[0].calendar_year, 2025);
    }

    #[test]
    fn test_presets_lists_historical() {
        assert!(presets().contains("historical_us"));
    }
}
