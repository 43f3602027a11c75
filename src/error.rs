use thiserror::Error;

use crate::model::ConstraintFamily;
use crate::search::SweepStep;
use crate::solver::SolverError;

/// Errors raised while building or searching an energy hub model
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown {kind} identifier: {id}")]
    UnknownIdentifier { kind: &'static str, id: String },

    #[error("Unsound big-M in {family} for {label}: bound {bound} is below the declared upper bound {upper}")]
    UnsoundBigM {
        family: ConstraintFamily,
        label: String,
        bound: f64,
        upper: f64,
    },

    #[error("Model infeasible at {step}")]
    Infeasible { step: SweepStep },

    #[error("Model unbounded at {step}")]
    Unbounded { step: SweepStep },

    #[error("Time limit reached at {step} without an incumbent solution")]
    NoIncumbent { step: SweepStep },

    #[error("Solver failed at {step}: {source}")]
    Solver {
        step: SweepStep,
        #[source]
        source: SolverError,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type HubResult<T> = std::result::Result<T, HubError>;

impl HubError {
    pub fn invalid(message: impl Into<String>) -> Self {
        HubError::InvalidInput(message.into())
    }

    pub fn unknown(kind: &'static str, id: impl Into<String>) -> Self {
        HubError::UnknownIdentifier {
            kind,
            id: id.into(),
        }
    }

    /// The search step at which a solve failed, if the error came from one
    pub fn step(&self) -> Option<&SweepStep> {
        match self {
            HubError::Infeasible { step }
            | HubError::Unbounded { step }
            | HubError::NoIncumbent { step }
            | HubError::Solver { step, .. } => Some(step),
            _ => None,
        }
    }

    /// Whether the error was raised before any solve was attempted
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            HubError::InvalidInput(_)
                | HubError::Validation(_)
                | HubError::UnknownIdentifier { .. }
                | HubError::UnsoundBigM { .. }
                | HubError::Config(_)
        )
    }
}

impl From<validator::ValidationErrors> for HubError {
    fn from(errors: validator::ValidationErrors) -> Self {
        HubError::Validation(errors.to_string())
    }
}

impl From<figment::Error> for HubError {
    fn from(error: figment::Error) -> Self {
        HubError::Config(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HubError::unknown("carrier", "Steam");
        assert_eq!(err.to_string(), "Unknown carrier identifier: Steam");

        let err = HubError::Infeasible {
            step: SweepStep::CarbonAnchor,
        };
        assert_eq!(err.to_string(), "Model infeasible at carbon anchor");
    }

    #[test]
    fn test_failed_step_is_reported() {
        let err = HubError::Solver {
            step: SweepStep::Epsilon {
                index: 2,
                bound: 12.5,
            },
            source: SolverError::Backend("numerical trouble".to_string()),
        };
        assert_eq!(
            err.step(),
            Some(&SweepStep::Epsilon {
                index: 2,
                bound: 12.5
            })
        );
        assert!(!err.is_input_error());
        assert!(err.to_string().contains("numerical trouble"));
    }

    #[test]
    fn test_input_errors_have_no_step() {
        let err = HubError::invalid("negative demand");
        assert!(err.step().is_none());
        assert!(err.is_input_error());
    }
}
