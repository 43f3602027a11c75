//! Solver seam
//!
//! The model is handed to a [`Solver`] as a complete [`ModelSnapshot`]; the
//! solver returns a status and, when it has one, a dense assignment indexed
//! by variable position. Backends never see domain types.

#[cfg(feature = "optimization")]
pub mod backend;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SolverConfig;
use crate::model::{ModelSnapshot, VarId};

#[cfg(feature = "optimization")]
pub use backend::GoodLpSolver;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SolveOptions {
    /// Relative MIP gap at which the search may stop
    pub gap_tolerance: f64,
    pub time_limit: Option<Duration>,
}

impl From<&SolverConfig> for SolveOptions {
    fn from(config: &SolverConfig) -> Self {
        Self {
            gap_tolerance: config.mip_gap,
            time_limit: config.time_limit(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Unbounded,
    /// Stopped at the time limit; an incumbent may or may not exist
    TimeLimitReached,
}

/// Dense variable values of one solution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignments(Vec<f64>);

impl Assignments {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn value(&self, var: VarId) -> f64 {
        self.0[var.index()]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    pub assignments: Option<Assignments>,
}

impl SolveOutcome {
    pub fn optimal(assignments: Assignments) -> Self {
        Self {
            status: SolveStatus::Optimal,
            assignments: Some(assignments),
        }
    }

    pub fn infeasible() -> Self {
        Self {
            status: SolveStatus::Infeasible,
            assignments: None,
        }
    }

    pub fn unbounded() -> Self {
        Self {
            status: SolveStatus::Unbounded,
            assignments: None,
        }
    }

    pub fn time_limited(assignments: Option<Assignments>) -> Self {
        Self {
            status: SolveStatus::TimeLimitReached,
            assignments,
        }
    }
}

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("Solver backend error: {0}")]
    Backend(String),

    #[error("Snapshot rejected by solver: {0}")]
    Rejected(String),
}

/// A MILP solver
#[cfg_attr(test, mockall::automock)]
pub trait Solver {
    /// Minimise the snapshot's active objective subject to its active rows
    fn solve(&self, snapshot: &ModelSnapshot, options: &SolveOptions) -> Result<SolveOutcome, SolverError>;
}

impl<S: Solver + ?Sized> Solver for &S {
    fn solve(&self, snapshot: &ModelSnapshot, options: &SolveOptions) -> Result<SolveOutcome, SolverError> {
        (**self).solve(snapshot, options)
    }
}

impl<S: Solver + ?Sized> Solver for Box<S> {
    fn solve(&self, snapshot: &ModelSnapshot, options: &SolveOptions) -> Result<SolveOutcome, SolverError> {
        (**self).solve(snapshot, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_config() {
        let config = SolverConfig {
            mip_gap: 0.01,
            time_limit_seconds: Some(60.0),
        };
        let options = SolveOptions::from(&config);
        assert_eq!(options.gap_tolerance, 0.01);
        assert_eq!(options.time_limit, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_outcome_constructors() {
        assert!(SolveOutcome::infeasible().assignments.is_none());
        let outcome = SolveOutcome::optimal(Assignments::new(vec![1.0, 2.0]));
        assert_eq!(outcome.status, SolveStatus::Optimal);
        let values = outcome.assignments.unwrap();
        assert_eq!(values.value(VarId(1)), 2.0);
        assert_eq!(values.len(), 2);
    }
}
