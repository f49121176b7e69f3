//! Monte Carlo runner
//!
//! Paths are split into batches of `MAX_BATCH_SIZE`. Cancellation and the
//! time budget are checked before each batch starts, so a stopped run keeps
//! every batch that already began.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

#[cfg(feature = "parallel")]
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::aggregation::{PathSummary, aggregate};
use crate::config::SimulationRequest;
use crate::error::SimulationError;
use crate::model::{RepresentativePath, SimulationResult, WarningTally};
use crate::returns::ReturnPathGenerator;
use crate::simulation::{SimulationContext, simulate_path};

pub const MAX_BATCH_SIZE: usize = 100;

/// Shared progress counter and cancellation flag for a running simulation
#[derive(Debug, Clone)]
pub struct MonteCarloProgress {
    /// Completed paths
    completed: Arc<AtomicUsize>,
    /// Paths requested
    total: Arc<AtomicUsize>,
    cancelled: Arc<AtomicBool>,
}

impl MonteCarloProgress {
    #[must_use]
    pub fn new() -> Self {
        Self {
            completed: Arc::new(AtomicUsize::new(0)),
            total: Arc::new(AtomicUsize::new(0)),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share a caller-owned counter and flag
    pub fn from_atomics(completed: Arc<AtomicUsize>, cancelled: Arc<AtomicBool>) -> Self {
        Self {
            completed,
            total: Arc::new(AtomicUsize::new(0)),
            cancelled,
        }
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    /// Completed fraction in [0, 1]
    #[must_use]
    pub fn fraction(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => (self.completed() as f64 / total as f64).min(1.0),
        }
    }

    pub fn add(&self, paths: usize) {
        self.completed.fetch_add(paths, Ordering::Relaxed);
    }

    pub fn reset(&self, total: usize) {
        self.completed.store(0, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
    }

    /// Ask the run to stop before its next batch
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

impl Default for MonteCarloProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-call controls that are not part of the request itself
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub progress: Option<MonteCarloProgress>,
    /// Wall-clock limit, checked before each batch
    pub time_budget: Option<Duration>,
}

impl RunOptions {
    pub fn with_progress(mut self, progress: MonteCarloProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum StopReason {
    Cancelled,
    Timeout(Duration),
}

impl From<StopReason> for SimulationError {
    fn from(reason: StopReason) -> Self {
        match reason {
            StopReason::Cancelled => SimulationError::Cancelled,
            StopReason::Timeout(budget) => SimulationError::Timeout { budget },
        }
    }
}

enum BatchOutcome {
    Done {
        summaries: Vec<PathSummary>,
        warnings: WarningTally,
    },
    Skipped(StopReason),
}

/// Run a request with default options
pub fn run_simulation(request: &SimulationRequest) -> Result<SimulationResult, SimulationError> {
    run_simulation_with_options(request, &RunOptions::default())
}

/// Run a request, honouring cancellation and a time budget.
///
/// Returns a partial result flagged `incomplete` when some batches were
/// skipped, and an error when none ran.
pub fn run_simulation_with_options(
    request: &SimulationRequest,
    options: &RunOptions,
) -> Result<SimulationResult, SimulationError> {
    let deadline = options.time_budget.map(|budget| (Instant::now() + budget, budget));
    let progress = options.progress.as_ref();
    let should_stop = || {
        if progress.is_some_and(MonteCarloProgress::is_cancelled) {
            return Some(StopReason::Cancelled);
        }
        match deadline {
            Some((at, budget)) if Instant::now() >= at => Some(StopReason::Timeout(budget)),
            _ => None,
        }
    };
    run_until(request, progress, &should_stop)
}

fn run_until(
    request: &SimulationRequest,
    progress: Option<&MonteCarloProgress>,
    should_stop: &(dyn Fn() -> Option<StopReason> + Sync),
) -> Result<SimulationResult, SimulationError> {
    request.validate()?;

    let seed = request.seed.unwrap_or_else(rand::random);
    let horizon = request.resolved_horizon();
    let num_paths = request.num_paths;
    let generator = ReturnPathGenerator::new(
        &request.market_assumptions(),
        request.market_periods.as_ref(),
        seed,
    )?;
    let ctx = SimulationContext::new(request);

    if let Some(p) = progress {
        p.reset(num_paths);
    }
    tracing::debug!(num_paths, horizon, seed, "starting monte carlo run");
    let started = Instant::now();

    let run_batch = |batch: usize| -> Result<BatchOutcome, SimulationError> {
        if let Some(reason) = should_stop() {
            return Ok(BatchOutcome::Skipped(reason));
        }
        let start = batch * MAX_BATCH_SIZE;
        let end = (start + MAX_BATCH_SIZE).min(num_paths);

        let mut returns = Vec::with_capacity(horizon);
        let mut summaries = Vec::with_capacity(end - start);
        let mut warnings = WarningTally::default();
        for path_index in start..end {
            generator.sample_path_into(path_index, horizon, &mut returns);
            let outcome = simulate_path(&ctx, &returns, false)?;
            warnings.merge(&outcome.warnings);
            summaries.push(PathSummary::new(path_index, outcome));
        }

        if let Some(p) = progress {
            p.add(end - start);
        }
        Ok(BatchOutcome::Done {
            summaries,
            warnings,
        })
    };

    let num_batches = num_paths.div_ceil(MAX_BATCH_SIZE);

    #[cfg(feature = "parallel")]
    let batches: Vec<BatchOutcome> = (0..num_batches)
        .into_par_iter()
        .map(run_batch)
        .collect::<Result<_, _>>()?;

    #[cfg(not(feature = "parallel"))]
    let batches: Vec<BatchOutcome> = (0..num_batches)
        .map(run_batch)
        .collect::<Result<_, _>>()?;

    let mut summaries = Vec::with_capacity(num_paths);
    let mut warnings = WarningTally::default();
    let mut stopped = None;
    for batch in batches {
        match batch {
            BatchOutcome::Done {
                summaries: batch_summaries,
                warnings: batch_warnings,
            } => {
                summaries.extend(batch_summaries);
                warnings.merge(&batch_warnings);
            }
            BatchOutcome::Skipped(reason) => {
                stopped.get_or_insert(reason);
            }
        }
    }

    if summaries.is_empty() {
        let reason = stopped.unwrap_or(StopReason::Cancelled);
        tracing::warn!(?reason, "monte carlo run stopped before any path completed");
        return Err(reason.into());
    }

    let incomplete = stopped.is_some();
    if incomplete {
        tracing::warn!(
            completed = summaries.len(),
            requested = num_paths,
            "monte carlo run stopped early"
        );
    }

    let agg = aggregate(
        &summaries,
        horizon,
        &request.resolved_percentiles(),
        ctx.starting_balances.total(),
    );

    let representative_paths = if request.representative_paths {
        agg.representatives
            .iter()
            .map(|choice| -> Result<RepresentativePath, SimulationError> {
                let returns = generator.sample_path(choice.path_index, horizon);
                let outcome = simulate_path(&ctx, &returns, true)?;
                Ok(RepresentativePath {
                    label: choice.label.to_string(),
                    percentile: choice.percentile,
                    path_index: choice.path_index,
                    final_balance: choice.final_balance,
                    ledger: outcome.ledger.unwrap_or_default(),
                })
            })
            .collect::<Result<Vec<_>, SimulationError>>()?
    } else {
        Vec::new()
    };

    let warnings = warnings.to_warnings();
    for warning in &warnings {
        tracing::debug!(occurrences = warning.occurrences, "{}", warning.message);
    }

    tracing::debug!(
        completed = summaries.len(),
        success_rate = agg.success_rate,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "monte carlo run finished"
    );

    Ok(SimulationResult {
        seed,
        num_paths_requested: num_paths,
        num_paths_completed: summaries.len(),
        incomplete,
        horizon_years: horizon,
        calendar_years: ctx.years.iter().map(|y| y.calendar_year).collect(),
        primary_ages: ctx.years.iter().map(|y| y.ages[0]).collect(),
        percentiles: agg.percentiles,
        median_real_balances: agg.median_real_balances,
        success_rate: agg.success_rate,
        summary: agg.summary,
        representative_paths,
        warnings,
    })
}
