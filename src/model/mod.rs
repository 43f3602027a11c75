//! Solver-independent MILP formulation of the energy hub
//!
//! - `bounds`: finite variable bounds that double as big-M constants
//! - `variables`: decision variables addressed by domain indices
//! - `linearize`: retrofit-scenario products
//! - `constraints`: row generators per constraint family
//! - `objective`: cost and carbon components
//! - `builder`: assembles all of the above into a [`ModelSnapshot`]

pub mod bounds;
pub mod builder;
pub mod constraints;
pub mod expr;
pub mod linearize;
pub mod objective;
pub mod snapshot;
pub mod variables;

pub use bounds::ModelBounds;
pub use builder::{HubModel, ModelBuilder};
pub use expr::{LinearExpr, VarId};
pub use linearize::RetrofitProducts;
pub use objective::{ObjectiveBreakdown, Objectives};
pub use snapshot::{
    Constraint, ConstraintFamily, ModelSnapshot, ObjectiveKind, Sense, SolveContext,
    VariableDomain, VariableSpec,
};
pub use variables::VariableSpace;
