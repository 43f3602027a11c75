use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::error::{HubError, HubResult};

/// A value over (retrofit scenario, day, time step).
///
/// Demands, tariffs and solar yield all vary with the retrofit scenario
/// because insulation changes the building's load shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Profile {
    /// Same value everywhere
    Constant(f64),
    /// Indexed `[scenario, day, step]`
    Series(Array3<f64>),
}

impl Default for Profile {
    fn default() -> Self {
        Profile::Constant(0.0)
    }
}

impl From<f64> for Profile {
    fn from(value: f64) -> Self {
        Profile::Constant(value)
    }
}

impl Profile {
    /// Build a series from a function of (scenario, day, step)
    pub fn from_fn(
        scenarios: usize,
        days: usize,
        steps: usize,
        f: impl FnMut((usize, usize, usize)) -> f64,
    ) -> Self {
        Profile::Series(Array3::from_shape_fn((scenarios, days, steps), f))
    }

    /// Repeat one daily shape for every scenario and day
    pub fn daily(scenarios: usize, days: usize, shape: &[f64]) -> Self {
        Self::from_fn(scenarios, days, shape.len(), |(_, _, t)| shape[t])
    }

    pub fn at(&self, scenario: usize, day: usize, step: usize) -> f64 {
        match self {
            Profile::Constant(value) => *value,
            Profile::Series(values) => values[[scenario, day, step]],
        }
    }

    pub fn max(&self) -> f64 {
        match self {
            Profile::Constant(value) => *value,
            Profile::Series(values) => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }

    pub fn min(&self) -> f64 {
        match self {
            Profile::Constant(value) => *value,
            Profile::Series(values) => values.iter().copied().fold(f64::INFINITY, f64::min),
        }
    }

    pub(crate) fn check(&self, name: &str, shape: (usize, usize, usize)) -> HubResult<()> {
        if let Profile::Series(values) = self {
            if values.dim() != shape {
                return Err(HubError::invalid(format!(
                    "{name}: expected shape {shape:?} (scenario, day, step), got {:?}",
                    values.dim()
                )));
            }
            if values.iter().any(|v| !v.is_finite()) {
                return Err(HubError::invalid(format!("{name}: non-finite value")));
            }
        } else if !self.max().is_finite() {
            return Err(HubError::invalid(format!("{name}: non-finite value")));
        }
        Ok(())
    }

    pub(crate) fn check_non_negative(&self, name: &str, shape: (usize, usize, usize)) -> HubResult<()> {
        self.check(name, shape)?;
        if self.min() < 0.0 {
            return Err(HubError::invalid(format!("{name}: negative value {}", self.min())));
        }
        Ok(())
    }
}
