//! Energy hub design as a mixed-integer linear program.
//!
//! Input data is validated into a [`DomainRegistry`], turned into a
//! solver-independent [`ModelSnapshot`] by the [`ModelBuilder`], and searched
//! for cost/carbon trade-offs by the [`SearchDriver`]. Solvers plug in through
//! the [`Solver`] trait; a pure-Rust backend ships behind the `optimization`
//! feature.

pub mod config;
pub mod domain;
pub mod error;
pub mod model;
pub mod report;
pub mod search;
pub mod solver;
pub mod telemetry;

pub use config::HubConfig;
pub use domain::{DomainRegistry, HubInput};
pub use error::{HubError, HubResult};
pub use model::{HubModel, ModelBuilder, ModelSnapshot};
pub use report::{DesignReport, JsonDirectorySink, MemorySink, ResultSink};
pub use search::{OptimizationMode, ParetoFront, ParetoPoint, SearchDriver, SweepStep};
pub use solver::{SolveOptions, SolveOutcome, SolveStatus, Solver};

#[cfg(feature = "optimization")]
pub use solver::GoodLpSolver;
