pub mod driver;
pub mod epsilon;
pub mod front;

pub use driver::{OptimizationMode, SearchDriver, CARBON_LABEL, COST_LABEL};
pub use epsilon::{carbon_ceiling, epsilon_schedule};
pub use front::{ParetoFront, ParetoPoint, SweepStep};
