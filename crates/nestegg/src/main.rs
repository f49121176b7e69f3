use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use nestegg::commands::{self, RunCommand};
use nestegg::{Overrides, init_logging};
use nestegg_core::{MarketPreset, RothConversion};

#[derive(Parser, Debug)]
#[command(name = "nestegg")]
#[command(about = "Monte Carlo retirement planner with a tax-aware withdrawal engine")]
struct Args {
    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Also append logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Simulate a scenario and print a summary
    Run {
        scenario: PathBuf,

        #[command(flatten)]
        overrides: OverrideArgs,

        /// Stop starting new batches after this many seconds
        #[arg(long)]
        timeout_secs: Option<f64>,

        /// Write the full result as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run a scenario under the conservative, moderate and aggressive allocations
    Compare {
        scenario: PathBuf,

        #[command(flatten)]
        overrides: OverrideArgs,
    },
    /// Sweep each person's Social Security claiming age from 62 to 70
    Claiming {
        scenario: PathBuf,

        #[command(flatten)]
        overrides: OverrideArgs,
    },
    /// Compare the scenario with and without yearly Roth conversions
    Roth {
        scenario: PathBuf,

        #[command(flatten)]
        overrides: OverrideArgs,

        /// Amount converted each year, in today's dollars
        #[arg(long)]
        amount: f64,

        /// Number of retired years to convert
        #[arg(long, default_value_t = 5)]
        conversion_years: u32,
    },
    /// Project one path at mean returns and print every year
    Cashflow {
        scenario: PathBuf,

        #[command(flatten)]
        overrides: OverrideArgs,

        /// Write the full ledger as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List market presets
    Presets,
}

#[derive(clap::Args, Debug)]
struct OverrideArgs {
    /// Number of paths
    #[arg(long)]
    paths: Option<usize>,

    /// Years to simulate
    #[arg(long)]
    years: Option<usize>,

    /// Market preset replacing the scenario's assumptions
    #[arg(long)]
    preset: Option<MarketPreset>,

    #[arg(long)]
    seed: Option<u64>,
}

impl From<OverrideArgs> for Overrides {
    fn from(args: OverrideArgs) -> Self {
        Overrides {
            paths: args.paths,
            years: args.years,
            preset: args.preset,
            seed: args.seed,
        }
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    init_logging(&args.log_level, args.log_file.as_deref())?;

    let output = match args.command {
        Command::Run {
            scenario,
            overrides,
            timeout_secs,
            output,
        } => {
            let timeout = timeout_secs.map(Duration::try_from_secs_f64).transpose()?;
            commands::run(&RunCommand {
                scenario,
                overrides: overrides.into(),
                timeout,
                output,
            })?
        }
        Command::Compare {
            scenario,
            overrides,
        } => commands::compare(&scenario, &overrides.into())?,
        Command::Claiming {
            scenario,
            overrides,
        } => commands::claiming(&scenario, &overrides.into())?,
        Command::Roth {
            scenario,
            overrides,
            amount,
            conversion_years,
        } => commands::roth(
            &scenario,
            &overrides.into(),
            RothConversion {
                annual_amount: amount,
                years: conversion_years,
            },
        )?,
        Command::Cashflow {
            scenario,
            overrides,
            output,
        } => commands::cashflow(&scenario, &overrides.into(), output.as_deref())?,
        Command::Presets => commands::presets(),
    };

    print!("{output}");
    Ok(())
}
