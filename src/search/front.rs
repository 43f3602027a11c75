use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::driver::OptimizationMode;
use crate::report::{DesignReport, ResultSink};
use crate::solver::SolveStatus;

/// Position of a solve within a search run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SweepStep {
    CostAnchor,
    CarbonAnchor,
    /// Cost minimisation just above the minimum carbon, in carbon-only mode
    CarbonTieBreak,
    /// Cost minimisation under a carbon ceiling; the last index is the carbon end of the front
    Epsilon { index: usize, bound: f64 },
}

impl fmt::Display for SweepStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepStep::CostAnchor => write!(f, "cost anchor"),
            SweepStep::CarbonAnchor => write!(f, "carbon anchor"),
            SweepStep::CarbonTieBreak => write!(f, "carbon tie-break"),
            SweepStep::Epsilon { index, bound } => {
                write!(f, "epsilon step {index} (carbon <= {bound})")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParetoPoint {
    pub label: String,
    pub step: SweepStep,
    /// Carbon ceiling the point was solved under
    pub epsilon: Option<f64>,
    pub status: SolveStatus,
    pub report: DesignReport,
}

impl ParetoPoint {
    pub fn cost(&self) -> f64 {
        self.report.total_cost()
    }

    pub fn carbon(&self) -> f64 {
        self.report.total_carbon()
    }
}

/// Ordered result of one search run, from the cost end to the carbon end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParetoFront {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub mode: OptimizationMode,
    pub points: Vec<ParetoPoint>,
}

impl ParetoFront {
    pub fn new(mode: OptimizationMode, points: Vec<ParetoPoint>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            mode,
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn costs(&self) -> Vec<f64> {
        self.points.iter().map(ParetoPoint::cost).collect()
    }

    pub fn carbons(&self) -> Vec<f64> {
        self.points.iter().map(ParetoPoint::carbon).collect()
    }

    pub fn point(&self, label: &str) -> Option<&ParetoPoint> {
        self.points.iter().find(|p| p.label == label)
    }

    /// Cost never falls and carbon never rises along the front, within `tolerance`
    pub fn is_monotone(&self, tolerance: f64) -> bool {
        self.points.windows(2).all(|pair| {
            pair[1].cost() >= pair[0].cost() - tolerance
                && pair[1].carbon() <= pair[0].carbon() + tolerance
        })
    }

    /// Hand every point, then the whole front, to `sink`
    pub fn publish(&self, sink: &mut dyn ResultSink) -> anyhow::Result<()> {
        for (index, point) in self.points.iter().enumerate() {
            sink.accept(index, point)?;
        }
        sink.finish(self)
    }
}
