use serde::{Deserialize, Serialize};
use validator::Validate;

/// A building-envelope retrofit option. Exactly one is selected per design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct RetrofitScenario {
    pub id: String,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub investment_cost: f64,
    /// Embodied emissions of the insulation work; may be negative for bio-based materials
    #[serde(default)]
    pub embodied_emissions: f64,
    #[validate(range(min = 0.0))]
    pub lifetime_years: f64,
}

impl RetrofitScenario {
    pub fn new(id: impl Into<String>, investment_cost: f64, lifetime_years: f64) -> Self {
        Self {
            id: id.into(),
            investment_cost,
            embodied_emissions: 0.0,
            lifetime_years,
        }
    }

    pub fn with_embodied_emissions(mut self, emissions: f64) -> Self {
        self.embodied_emissions = emissions;
        self
    }

    /// The implicit "leave the building as is" option used when none are given
    pub fn baseline() -> Self {
        Self::new("baseline", 0.0, 1.0)
    }
}
