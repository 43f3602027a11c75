//! good_lp backend
//!
//! Translates a [`ModelSnapshot`] into a good_lp problem on the default
//! solver (the pure-Rust microlp engine):
//! - one good_lp variable per snapshot variable, bounds and integrality kept
//! - the active objective, minimised
//! - every static row plus the carbon ceiling when an epsilon is set
//!
//! microlp exposes neither a time limit nor a MIP gap; both options are
//! accepted and logged.

use std::time::Instant;

use good_lp::{
    constraint, default_solver, variable, Expression, ProblemVariables, ResolutionError,
    Solution, SolverModel, Variable,
};
use tracing::{debug, info, warn};

use super::{Assignments, SolveOptions, SolveOutcome, Solver, SolverError};
use crate::model::{Constraint, LinearExpr, ModelSnapshot, Sense, VariableDomain, VariableSpec};

#[derive(Debug, Clone, Copy, Default)]
pub struct GoodLpSolver;

impl GoodLpSolver {
    pub fn new() -> Self {
        Self
    }
}

fn declare(problem: &mut ProblemVariables, spec: &VariableSpec) -> Variable {
    let mut definition = variable().min(spec.lower);
    if let Some(upper) = spec.upper {
        definition = definition.max(upper);
    }
    definition = match spec.domain {
        VariableDomain::Continuous => definition,
        VariableDomain::Binary => definition.binary(),
        VariableDomain::Integer => definition.integer(),
    };
    problem.add(definition)
}

fn expression(expr: &LinearExpr, vars: &[Variable]) -> Expression {
    let mut result = Expression::with_capacity(expr.terms().len());
    for (var, coeff) in expr.terms() {
        result += *coeff * vars[var.index()];
    }
    result += expr.constant_value();
    result
}

fn row(c: &Constraint, vars: &[Variable]) -> good_lp::Constraint {
    let lhs = expression(&c.expr, vars);
    let rhs = c.rhs;
    match c.sense {
        Sense::LessEq => constraint!(lhs <= rhs),
        Sense::GreaterEq => constraint!(lhs >= rhs),
        Sense::Equal => constraint!(lhs == rhs),
    }
}

impl Solver for GoodLpSolver {
    fn solve(&self, snapshot: &ModelSnapshot, options: &SolveOptions) -> Result<SolveOutcome, SolverError> {
        if let Some(limit) = options.time_limit {
            warn!(?limit, "backend solves to optimality; time limit is not applied");
        }
        if options.gap_tolerance > 0.0 {
            debug!(gap = options.gap_tolerance, "backend solves to optimality; gap is not applied");
        }

        let mut problem = ProblemVariables::new();
        let vars: Vec<Variable> = snapshot
            .variables()
            .iter()
            .map(|spec| declare(&mut problem, spec))
            .collect();

        let objective = expression(snapshot.active_objective(), &vars);
        let mut model = problem.minimise(objective).using(default_solver);
        for c in snapshot.active_constraints() {
            model = model.with(row(&c, &vars));
        }

        let context = snapshot.context();
        let started = Instant::now();
        let result = model.solve();
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(solution) => {
                info!(
                    objective = %context.active,
                    epsilon = ?context.epsilon,
                    elapsed_ms,
                    "solve finished optimal"
                );
                let values = vars.iter().map(|v| solution.value(*v)).collect();
                Ok(SolveOutcome::optimal(Assignments::new(values)))
            }
            Err(ResolutionError::Infeasible) => {
                info!(objective = %context.active, epsilon = ?context.epsilon, elapsed_ms, "solve infeasible");
                Ok(SolveOutcome::infeasible())
            }
            Err(ResolutionError::Unbounded) => {
                info!(objective = %context.active, elapsed_ms, "solve unbounded");
                Ok(SolveOutcome::unbounded())
            }
            Err(other) => Err(SolverError::Backend(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConstraintFamily, ObjectiveKind, SolveContext, VarId};
    use crate::solver::SolveStatus;

    fn spec(name: &str, domain: VariableDomain, upper: Option<f64>) -> VariableSpec {
        VariableSpec {
            name: name.to_string(),
            domain,
            lower: 0.0,
            upper,
        }
    }

    #[test]
    fn test_small_milp() {
        // min x + 10 b  s.t.  x + 5 b >= 7,  x <= 4,  b binary
        let (x, b) = (VarId(0), VarId(1));
        let snapshot = ModelSnapshot::new(
            vec![
                spec("x", VariableDomain::Continuous, Some(4.0)),
                spec("b", VariableDomain::Binary, Some(1.0)),
            ],
            vec![Constraint::geq(ConstraintFamily::EnergyBalance, "demand", x + 5.0 * b, 7.0)],
            x + 10.0 * b,
            LinearExpr::from(x),
        );
        let outcome = GoodLpSolver::new()
            .solve(&snapshot, &SolveOptions::default())
            .unwrap();
        assert_eq!(outcome.status, SolveStatus::Optimal);
        let values = outcome.assignments.unwrap();
        assert!((values.value(b) - 1.0).abs() < 1e-6);
        assert!((values.value(x) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_infeasible_ceiling() {
        let x = VarId(0);
        let mut snapshot = ModelSnapshot::new(
            vec![spec("x", VariableDomain::Continuous, Some(10.0))],
            vec![Constraint::geq(ConstraintFamily::EnergyBalance, "demand", x, 3.0)],
            LinearExpr::from(x),
            2.0 * x,
        );
        snapshot.set_context(SolveContext {
            active: ObjectiveKind::Cost,
            epsilon: Some(4.0),
        });
        let outcome = GoodLpSolver::new()
            .solve(&snapshot, &SolveOptions::default())
            .unwrap();
        assert_eq!(outcome.status, SolveStatus::Infeasible);
        assert!(outcome.assignments.is_none());
    }
}
