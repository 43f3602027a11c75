//! Epsilon-constraint search over cost and carbon
//!
//! A Pareto run solves, in order:
//! 1. the cost anchor (minimum cost, no ceiling), whose carbon is the upper end of the sweep;
//! 2. the carbon anchor (minimum carbon), which only fixes the lower end;
//! 3. one cost minimisation per carbon ceiling, loosest first, ending just above the
//!    minimum carbon so the carbon end of the front is also cost-optimal.
//!
//! Only the snapshot's [`SolveContext`] changes between solves.

use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::epsilon::{carbon_ceiling, epsilon_schedule};
use super::front::{ParetoFront, ParetoPoint, SweepStep};
use crate::config::{HubConfig, SearchConfig};
use crate::domain::DomainRegistry;
use crate::error::{HubError, HubResult};
use crate::model::{HubModel, ObjectiveKind, SolveContext};
use crate::report::{DesignReport, ResultSink};
use crate::solver::{Assignments, SolveOptions, SolveStatus, Solver, SolverError};

pub const COST_LABEL: &str = "min_cost";
pub const CARBON_LABEL: &str = "min_carbon";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum OptimizationMode {
    CostOnly,
    CarbonOnly,
    /// Both anchors plus `points` interior points
    Pareto { points: usize },
}

impl OptimizationMode {
    /// Number of points the run yields
    pub fn front_len(&self) -> usize {
        match self {
            OptimizationMode::CostOnly | OptimizationMode::CarbonOnly => 1,
            OptimizationMode::Pareto { points } => points + 2,
        }
    }
}

/// Parses `cost`, `carbon` or `pareto:<points>`
impl FromStr for OptimizationMode {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cost" => Ok(OptimizationMode::CostOnly),
            "carbon" => Ok(OptimizationMode::CarbonOnly),
            other => other
                .strip_prefix("pareto:")
                .and_then(|n| n.parse().ok())
                .map(|points| OptimizationMode::Pareto { points })
                .ok_or_else(|| HubError::invalid(format!("unknown optimization mode: {other}"))),
        }
    }
}

pub struct SearchDriver<'s, S: ?Sized> {
    solver: &'s S,
    options: SolveOptions,
    settings: SearchConfig,
}

impl<'s, S: Solver + ?Sized> SearchDriver<'s, S> {
    pub fn new(solver: &'s S, options: SolveOptions, settings: SearchConfig) -> Self {
        Self {
            solver,
            options,
            settings,
        }
    }

    pub fn from_config(solver: &'s S, config: &HubConfig) -> Self {
        Self::new(solver, SolveOptions::from(&config.solver), config.search.clone())
    }

    /// Run the search and return the front, cost end first.
    ///
    /// The first failing solve aborts the run; the error names its step.
    /// The model's solve context is reset afterwards either way.
    pub fn run(
        &self,
        registry: &DomainRegistry,
        model: &mut HubModel,
        mode: OptimizationMode,
    ) -> HubResult<ParetoFront> {
        let started = Instant::now();
        info!(?mode, "Starting search");

        let points = self.sweep(registry, model, mode);
        model.snapshot.set_context(SolveContext::default());
        let points = points?;

        let front = ParetoFront::new(mode, points);
        info!(
            run_id = %front.run_id,
            points = front.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Search completed"
        );
        Ok(front)
    }

    /// Run the search and publish the front to `sink`
    pub fn run_into(
        &self,
        registry: &DomainRegistry,
        model: &mut HubModel,
        mode: OptimizationMode,
        sink: &mut dyn ResultSink,
    ) -> anyhow::Result<ParetoFront> {
        let front = self.run(registry, model, mode)?;
        front.publish(sink)?;
        Ok(front)
    }

    fn sweep(
        &self,
        registry: &DomainRegistry,
        model: &mut HubModel,
        mode: OptimizationMode,
    ) -> HubResult<Vec<ParetoPoint>> {
        let mut points = Vec::with_capacity(mode.front_len());

        match mode {
            OptimizationMode::CostOnly => {
                let (status, values) = self.solve(model, SweepStep::CostAnchor, cost_context(None))?;
                points.push(point(registry, model, COST_LABEL, SweepStep::CostAnchor, None, status, &values));
            }
            OptimizationMode::CarbonOnly => {
                let ceiling = self.carbon_floor(model)?;
                let step = SweepStep::CarbonTieBreak;
                let (status, values) = self.solve(model, step.clone(), cost_context(Some(ceiling)))?;
                points.push(point(registry, model, CARBON_LABEL, step, Some(ceiling), status, &values));
            }
            OptimizationMode::Pareto { points: interior } => {
                let (status, values) = self.solve(model, SweepStep::CostAnchor, cost_context(None))?;
                let carbon_max = model.objectives.evaluate(values.as_slice()).total_carbon;
                points.push(point(registry, model, COST_LABEL, SweepStep::CostAnchor, None, status, &values));

                let floor = self.carbon_floor(model)?;
                let schedule = epsilon_schedule(floor, carbon_max, interior);
                debug!(carbon_max, floor, ?schedule, "Epsilon schedule");

                for (index, bound) in schedule.into_iter().enumerate() {
                    let step = SweepStep::Epsilon { index, bound };
                    let (status, values) = self.solve(model, step.clone(), cost_context(Some(bound)))?;
                    let label = if index == interior {
                        CARBON_LABEL.to_string()
                    } else {
                        format!("pareto_{}", index + 1)
                    };
                    points.push(point(registry, model, &label, step, Some(bound), status, &values));
                }
            }
        }

        Ok(points)
    }

    /// Solve the carbon anchor and return the slackened ceiling above it
    fn carbon_floor(&self, model: &mut HubModel) -> HubResult<f64> {
        let context = SolveContext {
            active: ObjectiveKind::Carbon,
            epsilon: None,
        };
        let (_, values) = self.solve(model, SweepStep::CarbonAnchor, context)?;
        let carbon_min = model.objectives.evaluate(values.as_slice()).total_carbon;
        let ceiling = carbon_ceiling(
            carbon_min,
            self.settings.carbon_slack,
            self.settings.absolute_tolerance,
        );
        debug!(carbon_min, ceiling, "Carbon anchor solved");
        Ok(ceiling)
    }

    fn solve(
        &self,
        model: &mut HubModel,
        step: SweepStep,
        context: SolveContext,
    ) -> HubResult<(SolveStatus, Assignments)> {
        model.snapshot.set_context(context);
        let started = Instant::now();
        let outcome = self
            .solver
            .solve(&model.snapshot, &self.options)
            .map_err(|source| HubError::Solver {
                step: step.clone(),
                source,
            })?;

        let values = match (outcome.status, outcome.assignments) {
            (SolveStatus::Optimal, Some(values)) => values,
            (SolveStatus::TimeLimitReached, Some(values)) => {
                warn!(%step, "Time limit reached, keeping incumbent");
                values
            }
            (SolveStatus::TimeLimitReached, None) => return Err(HubError::NoIncumbent { step }),
            (SolveStatus::Infeasible, _) => return Err(HubError::Infeasible { step }),
            (SolveStatus::Unbounded, _) => return Err(HubError::Unbounded { step }),
            (SolveStatus::Optimal, None) => {
                return Err(HubError::Solver {
                    step,
                    source: SolverError::Rejected("optimal status without assignments".into()),
                })
            }
        };

        let expected = model.snapshot.variables().len();
        if values.len() != expected {
            return Err(HubError::Solver {
                step,
                source: SolverError::Backend(format!(
                    "expected {expected} values, got {}",
                    values.len()
                )),
            });
        }

        let breakdown = model.objectives.evaluate(values.as_slice());
        info!(
            %step,
            status = ?outcome.status,
            cost = breakdown.total_cost,
            carbon = breakdown.total_carbon,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Step solved"
        );
        Ok((outcome.status, values))
    }
}

fn cost_context(epsilon: Option<f64>) -> SolveContext {
    SolveContext {
        active: ObjectiveKind::Cost,
        epsilon,
    }
}

fn point(
    registry: &DomainRegistry,
    model: &HubModel,
    label: &str,
    step: SweepStep,
    epsilon: Option<f64>,
    status: SolveStatus,
    values: &Assignments,
) -> ParetoPoint {
    ParetoPoint {
        label: label.to_string(),
        step,
        epsilon,
        status,
        report: DesignReport::extract(registry, model, values),
    }
}
