//! Integration tests for the nestegg simulation engine
//!
//! Tests are organized by topic:
//! - `returns` - Correlated return draws, determinism and regime schedules
//! - `rmd` - Required minimum distributions for single and joint owners
//! - `paths` - Per-path invariants: non-negative balances, absorbing zero
//! - `monte_carlo` - End-to-end runs, seeds, cancellation and budgets
//! - `builder_dsl` - Builder DSL for fluent request setup

mod builder_dsl;
mod paths;
mod returns;
