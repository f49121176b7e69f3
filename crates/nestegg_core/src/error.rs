use std::fmt;
use std::time::Duration;

/// Malformed or out-of-domain input, reported before any path is simulated
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    NegativeAmount {
        field: &'static str,
        value: f64,
    },
    NonFinite {
        field: &'static str,
        value: f64,
    },
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    UnknownFilingStatus(String),
    UnknownPreset(String),
    UnknownSpendingModel(String),
    /// Allocation weights are negative or do not sum to 1
    InvalidAllocation {
        stock: f64,
        bond: f64,
        cash: f64,
    },
    InvalidCorrelation(f64),
    /// A person's dates are inconsistent with each other or the start date
    InvalidPerson {
        name: String,
        reason: &'static str,
    },
    /// Household must have one or two persons
    InvalidHousehold(&'static str),
    InvalidPercentile(f64),
    EmptyMarketPeriods,
    ZeroPaths,
    ZeroHorizon,
}

impl ValidationError {
    /// Check that `value` is finite and not negative
    pub fn check_amount(field: &'static str, value: f64) -> Result<(), ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::NonFinite { field, value });
        }
        if value < 0.0 {
            return Err(ValidationError::NegativeAmount { field, value });
        }
        Ok(())
    }

    /// Check that `value` is finite and within `[min, max]`
    pub fn check_range(
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    ) -> Result<(), ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::NonFinite { field, value });
        }
        if value < min || value > max {
            return Err(ValidationError::OutOfRange {
                field,
                value,
                min,
                max,
            });
        }
        Ok(())
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::NegativeAmount { field, value } => {
                write!(f, "{field} must not be negative (got {value})")
            }
            ValidationError::NonFinite { field, value } => {
                write!(f, "{field} must be a finite number (got {value})")
            }
            ValidationError::OutOfRange {
                field,
                value,
                min,
                max,
            } => write!(f, "{field} must be between {min} and {max} (got {value})"),
            ValidationError::UnknownFilingStatus(s) => write!(f, "unknown filing status '{s}'"),
            ValidationError::UnknownPreset(s) => write!(f, "unknown market preset '{s}'"),
            ValidationError::UnknownSpendingModel(s) => {
                write!(f, "unknown spending model '{s}'")
            }
            ValidationError::InvalidAllocation { stock, bond, cash } => write!(
                f,
                "allocation weights must be non-negative and sum to 1 \
                 (stock={stock}, bond={bond}, cash={cash})"
            ),
            ValidationError::InvalidCorrelation(rho) => {
                write!(f, "correlation must be within [-1, 1] (got {rho})")
            }
            ValidationError::InvalidPerson { name, reason } => write!(f, "{name}: {reason}"),
            ValidationError::InvalidHousehold(reason) => write!(f, "invalid household: {reason}"),
            ValidationError::InvalidPercentile(p) => {
                write!(f, "percentile must be within [0, 100] (got {p})")
            }
            ValidationError::EmptyMarketPeriods => {
                write!(f, "market periods must contain at least one period")
            }
            ValidationError::ZeroPaths => write!(f, "number of paths must be at least 1"),
            ValidationError::ZeroHorizon => write!(f, "simulation horizon must be at least 1 year"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors that abort a simulation run
#[derive(Debug, Clone)]
pub enum SimulationError {
    Validation(ValidationError),
    InvalidDistributionParameters {
        profile_type: &'static str,
        mean: f64,
        std_dev: f64,
        reason: &'static str,
    },
    /// Cancelled before any batch completed
    Cancelled,
    /// Wall-clock budget ran out before any batch completed
    Timeout { budget: Duration },
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::Validation(e) => write!(f, "invalid input: {e}"),
            SimulationError::InvalidDistributionParameters {
                profile_type,
                mean,
                std_dev,
                reason,
            } => {
                write!(
                    f,
                    "invalid {profile_type} parameters (mean={mean}, std_dev={std_dev}): {reason}"
                )
            }
            SimulationError::Cancelled => write!(f, "simulation cancelled"),
            SimulationError::Timeout { budget } => {
                write!(f, "simulation exceeded its time budget of {budget:?}")
            }
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::Validation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ValidationError> for SimulationError {
    fn from(e: ValidationError) -> Self {
        SimulationError::Validation(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_amount() {
        assert!(ValidationError::check_amount("balance", 0.0).is_ok());
        assert!(ValidationError::check_amount("balance", 10.0).is_ok());
        assert_eq!(
            ValidationError::check_amount("balance", -1.0),
            Err(ValidationError::NegativeAmount {
                field: "balance",
                value: -1.0
            })
        );
        assert!(matches!(
            ValidationError::check_amount("balance", f64::NAN),
            Err(ValidationError::NonFinite { .. })
        ));
        assert!(matches!(
            ValidationError::check_amount("balance", f64::INFINITY),
            Err(ValidationError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_check_range() {
        assert!(ValidationError::check_range("rho", 1.0, -1.0, 1.0).is_ok());
        assert!(matches!(
            ValidationError::check_range("rho", 1.5, -1.0, 1.0),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_simulation_error_source() {
        use std::error::Error;
        let err = SimulationError::from(ValidationError::ZeroPaths);
        assert!(err.source().is_some());
        assert!(err.to_string().contains("at least 1"));
        assert!(SimulationError::Cancelled.source().is_none());
    }
}
