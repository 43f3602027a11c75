use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum::Display;

use super::expr::{LinearExpr, VarId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableDomain {
    Continuous,
    Binary,
    Integer,
}

/// Declaration of one decision variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSpec {
    /// Readable name with its index tuple, e.g. `import[Elec,0,13]`
    pub name: String,
    pub domain: VariableDomain,
    pub lower: f64,
    /// `None` is unbounded above
    pub upper: Option<f64>,
}

impl VariableSpec {
    pub fn is_integral(&self) -> bool {
        !matches!(self.domain, VariableDomain::Continuous)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sense {
    LessEq,
    GreaterEq,
    Equal,
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Sense::LessEq => "<=",
            Sense::GreaterEq => ">=",
            Sense::Equal => "=",
        })
    }
}

/// Constraint family tag, used for grouping, logging and error messages
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[strum(serialize_all = "snake_case")]
pub enum ConstraintFamily {
    EnergyBalance,
    SolarExportSplit,
    DispatchCapacity,
    SolarYield,
    MinimumInstallation,
    InstallationGate,
    RoofArea,
    PartLoadUpper,
    PartLoadFloor,
    StorageBalance,
    StorageChargeRate,
    StorageDischargeRate,
    StorageStateLimit,
    ExclusiveCharging,
    RetrofitExclusivity,
    Linearization,
    CarbonCeiling,
}

/// Linear row `expr (sense) rhs` with every constant moved to the right-hand side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub family: ConstraintFamily,
    /// Index tuple the row was generated for
    pub label: String,
    pub expr: LinearExpr,
    pub sense: Sense,
    pub rhs: f64,
}

impl Constraint {
    pub fn new(
        family: ConstraintFamily,
        label: impl Into<String>,
        lhs: LinearExpr,
        sense: Sense,
        rhs: LinearExpr,
    ) -> Self {
        let (expr, constant) = (lhs - rhs).compact().split_constant();
        Self {
            family,
            label: label.into(),
            expr,
            sense,
            rhs: -constant,
        }
    }

    pub fn leq(
        family: ConstraintFamily,
        label: impl Into<String>,
        lhs: impl Into<LinearExpr>,
        rhs: impl Into<LinearExpr>,
    ) -> Self {
        Self::new(family, label, lhs.into(), Sense::LessEq, rhs.into())
    }

    pub fn geq(
        family: ConstraintFamily,
        label: impl Into<String>,
        lhs: impl Into<LinearExpr>,
        rhs: impl Into<LinearExpr>,
    ) -> Self {
        Self::new(family, label, lhs.into(), Sense::GreaterEq, rhs.into())
    }

    pub fn equal(
        family: ConstraintFamily,
        label: impl Into<String>,
        lhs: impl Into<LinearExpr>,
        rhs: impl Into<LinearExpr>,
    ) -> Self {
        Self::new(family, label, lhs.into(), Sense::Equal, rhs.into())
    }

    /// Signed violation under `values`; zero or negative means satisfied
    pub fn violation(&self, values: &[f64]) -> f64 {
        let lhs = self.expr.evaluate(values);
        match self.sense {
            Sense::LessEq => lhs - self.rhs,
            Sense::GreaterEq => self.rhs - lhs,
            Sense::Equal => (lhs - self.rhs).abs(),
        }
    }

    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        self.violation(values) <= tolerance
    }

    pub fn references(&self, var: VarId) -> bool {
        self.expr.terms().iter().any(|(v, _)| *v == var)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}]: {} {} {}",
            self.family, self.label, self.expr, self.sense, self.rhs
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ObjectiveKind {
    Cost,
    Carbon,
}

/// The only mutable part of a snapshot between solves
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolveContext {
    pub active: ObjectiveKind,
    /// Upper bound on total carbon; `None` leaves the ceiling row inactive
    pub epsilon: Option<f64>,
}

impl Default for SolveContext {
    fn default() -> Self {
        Self {
            active: ObjectiveKind::Cost,
            epsilon: None,
        }
    }
}

/// Complete solver-independent MILP: variables, rows, both objectives and the
/// solve context.
///
/// Variables, rows and objectives are fixed once built; re-solves change only
/// the context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSnapshot {
    variables: Vec<VariableSpec>,
    constraints: Vec<Constraint>,
    cost: LinearExpr,
    carbon: LinearExpr,
    context: SolveContext,
}

impl ModelSnapshot {
    pub fn new(
        variables: Vec<VariableSpec>,
        constraints: Vec<Constraint>,
        cost: LinearExpr,
        carbon: LinearExpr,
    ) -> Self {
        Self {
            variables,
            constraints,
            cost: cost.compact(),
            carbon: carbon.compact(),
            context: SolveContext::default(),
        }
    }

    pub fn variables(&self) -> &[VariableSpec] {
        &self.variables
    }

    pub fn variable(&self, var: VarId) -> &VariableSpec {
        &self.variables[var.index()]
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn objective(&self, kind: ObjectiveKind) -> &LinearExpr {
        match kind {
            ObjectiveKind::Cost => &self.cost,
            ObjectiveKind::Carbon => &self.carbon,
        }
    }

    pub fn active_objective(&self) -> &LinearExpr {
        self.objective(self.context.active)
    }

    pub fn context(&self) -> SolveContext {
        self.context
    }

    pub fn set_context(&mut self, context: SolveContext) {
        self.context = context;
    }

    /// The carbon ceiling row, present only while an epsilon is set
    pub fn carbon_ceiling(&self) -> Option<Constraint> {
        self.context.epsilon.map(|epsilon| {
            Constraint::leq(
                ConstraintFamily::CarbonCeiling,
                "total",
                self.carbon.clone(),
                epsilon,
            )
        })
    }

    /// Static rows followed by the carbon ceiling when active
    pub fn active_constraints(&self) -> impl Iterator<Item = Constraint> + '_ {
        self.constraints.iter().cloned().chain(self.carbon_ceiling())
    }

    pub fn family_counts(&self) -> BTreeMap<ConstraintFamily, usize> {
        let mut counts = BTreeMap::new();
        for c in &self.constraints {
            *counts.entry(c.family).or_insert(0) += 1;
        }
        counts
    }

    pub fn integer_count(&self) -> usize {
        self.variables.iter().filter(|v| v.is_integral()).count()
    }

    /// Every row and bound satisfied within `tolerance`
    pub fn is_feasible(&self, values: &[f64], tolerance: f64) -> bool {
        let bounds_ok = self.variables.iter().zip(values).all(|(spec, v)| {
            *v >= spec.lower - tolerance && spec.upper.map_or(true, |u| *v <= u + tolerance)
        });
        bounds_ok && self.active_constraints().all(|c| c.is_satisfied(values, tolerance))
    }
}
