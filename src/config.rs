use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{HubError, HubResult};

/// Tunables for model building and search.
///
/// Layered as built-in defaults, then `config/default.toml`, then
/// `EHUB__`-prefixed environment variables (`EHUB__SEARCH__CARBON_SLACK=0.02`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct HubConfig {
    #[validate(nested)]
    pub solver: SolverConfig,
    #[validate(nested)]
    pub big_m: BigMConfig,
    #[validate(nested)]
    pub search: SearchConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SolverConfig {
    /// Relative MIP gap handed to the backend
    #[validate(range(min = 0.0, max = 1.0))]
    pub mip_gap: f64,
    /// Wall-clock limit per solve
    #[validate(range(min = 0.0))]
    pub time_limit_seconds: Option<f64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            mip_gap: 0.001,
            time_limit_seconds: None,
        }
    }
}

impl SolverConfig {
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_seconds.map(Duration::from_secs_f64)
    }
}

/// Upper bounds used for capacities and as big-M constants
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct BigMConfig {
    #[validate(range(min = 0.0))]
    pub max_conversion_capacity: f64,
    #[validate(range(min = 0.0))]
    pub max_storage_capacity: f64,
    /// Bound for flows with no finite derivation from the data
    #[validate(range(min = 0.0))]
    pub fallback: f64,
    #[validate(range(min = 0.0))]
    pub min_installable_capacity: f64,
}

impl Default for BigMConfig {
    fn default() -> Self {
        Self {
            max_conversion_capacity: 1e4,
            max_storage_capacity: 1e4,
            fallback: 1e6,
            min_installable_capacity: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SearchConfig {
    /// Relative slack added to the minimum carbon before the tie-break solve
    #[validate(range(min = 0.0))]
    pub carbon_slack: f64,
    /// Absolute floor for that slack, used when the minimum carbon is near zero
    #[validate(range(min = 0.0))]
    pub absolute_tolerance: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            carbon_slack: 0.01,
            absolute_tolerance: 1e-6,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Forbid simultaneous charging and discharging with a binary per step
    pub exclusive_charging: bool,
}

impl HubConfig {
    pub fn load() -> HubResult<Self> {
        Self::from_figment(
            Figment::from(Serialized::defaults(HubConfig::default()))
                .merge(Toml::file("config/default.toml"))
                .merge(Env::prefixed("EHUB__").split("__")),
        )
    }

    pub fn from_figment(figment: Figment) -> HubResult<Self> {
        let config: HubConfig = figment.extract()?;
        config.check()?;
        Ok(config)
    }

    /// Range checks plus the cross-field rules the derive cannot express
    pub fn check(&self) -> HubResult<()> {
        self.validate()?;
        let m = &self.big_m;
        if m.min_installable_capacity >= m.max_conversion_capacity
            || m.min_installable_capacity >= m.max_storage_capacity
        {
            return Err(HubError::Config(format!(
                "min_installable_capacity {} must lie below every capacity bound ({} conversion, {} storage)",
                m.min_installable_capacity, m.max_conversion_capacity, m.max_storage_capacity
            )));
        }
        if m.fallback <= 0.0 {
            return Err(HubError::Config("big_m.fallback must be positive".into()));
        }
        Ok(())
    }
}
