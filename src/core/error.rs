use thiserror::Error;

use super::assumptions::MAX_PLAN_YEARS;
use super::types::{MAX_RETIREMENT_AGE, MIN_CURRENT_AGE};

/// A `PlanInput` that the engine refuses to project.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error(
        "ages must satisfy {min} <= current age ({current_age}) < retirement age ({retirement_age}) <= {max}",
        min = MIN_CURRENT_AGE,
        max = MAX_RETIREMENT_AGE
    )]
    InvalidAgeRange {
        current_age: u32,
        retirement_age: u32,
    },

    #[error("{field} must be in [0, 1), got {value}")]
    RateOutOfRange { field: &'static str, value: f64 },

    #[error("{field} must be >= 0, got {value}")]
    NegativeAmount { field: &'static str, value: f64 },

    #[error("{field} must be finite")]
    NonFinite { field: &'static str },

    #[error("{field} must be between 1 and {max} years", max = MAX_PLAN_YEARS)]
    InvalidHorizon { field: &'static str },

    #[error("invalid assumptions: {reason}")]
    InvalidAssumptions { reason: String },
}
