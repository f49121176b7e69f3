//! nestegg command-line front end
//!
//! Loads household scenarios from YAML, runs them through `nestegg_core` and
//! renders the results as text or JSON.

pub mod commands;
pub mod logging;
pub mod report;
pub mod scenario;

pub use logging::init_logging;
pub use scenario::{Overrides, ScenarioFile};
