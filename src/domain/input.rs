use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::carrier::EnergyCarrier;
use super::profile::Profile;
use super::retrofit::RetrofitScenario;
use super::technology::{ConversionTechnology, StorageTechnology};
use super::time::TimeInput;
use crate::error::{HubError, HubResult};

/// Roof area available to solar technologies
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoofArea {
    /// Shared roof for solar technologies without a building; `None` is unbounded
    #[serde(default)]
    pub site: Option<f64>,
    #[serde(default)]
    pub buildings: BTreeMap<String, f64>,
}

/// District network built alongside the hub; a fixed annualised cost
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct NetworkInvestment {
    #[validate(range(min = 0.0))]
    pub length_m: f64,
    #[validate(range(min = 0.0))]
    pub cost_per_m: f64,
    #[validate(range(min = 0.0))]
    pub lifetime_years: f64,
}

/// Purchasable CO2 certificates that offset carbon at a price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct CarbonMarket {
    #[validate(range(min = 0.0))]
    pub price_per_certificate: f64,
    #[validate(range(min = 0.0))]
    pub carbon_offset_per_certificate: f64,
    pub max_certificates: u32,
}

/// Everything the model is built from, as delivered by a data provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubInput {
    pub carriers: Vec<EnergyCarrier>,
    #[serde(default)]
    pub conversion: Vec<ConversionTechnology>,
    #[serde(default)]
    pub storage: Vec<StorageTechnology>,
    /// Empty means a single implicit baseline scenario
    #[serde(default)]
    pub retrofit: Vec<RetrofitScenario>,
    pub time: TimeInput,
    /// Solar yield per unit area, shared by all solar technologies
    #[serde(default)]
    pub solar_yield: Profile,
    #[serde(default)]
    pub roof: RoofArea,
    #[serde(default)]
    pub network: Option<NetworkInvestment>,
    #[serde(default)]
    pub carbon_market: Option<CarbonMarket>,
    #[serde(default)]
    pub discount_rate: f64,
}

impl HubInput {
    pub fn new(time: TimeInput) -> Self {
        Self {
            carriers: Vec::new(),
            conversion: Vec::new(),
            storage: Vec::new(),
            retrofit: Vec::new(),
            time,
            solar_yield: Profile::default(),
            roof: RoofArea::default(),
            network: None,
            carbon_market: None,
            discount_rate: 0.0,
        }
    }

    pub fn from_json_str(source: &str) -> HubResult<Self> {
        serde_json::from_str(source).map_err(|e| HubError::invalid(format!("hub input JSON: {e}")))
    }

    pub fn from_toml_str(source: &str) -> HubResult<Self> {
        toml::from_str(source).map_err(|e| HubError::invalid(format!("hub input TOML: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::time::TemporalMode;

    #[test]
    fn test_parse_json_input() {
        let json = r#"{
            "carriers": [
                {"id": "Elec", "import": {"price": 0.22, "carbon_intensity": 0.1}, "demand": 4.0}
            ],
            "conversion": [
                {"id": "PV", "kind": "solar", "photovoltaic": true,
                 "conversion_factors": {"Elec": 0.15}, "lifetime_years": 25.0}
            ],
            "time": {"mode": "typical_days", "days": 2, "steps": 24},
            "solar_yield": 0.3,
            "roof": {"site": 120.0},
            "discount_rate": 0.08
        }"#;
        let input = HubInput::from_json_str(json).unwrap();
        assert_eq!(input.carriers.len(), 1);
        assert!(input.conversion[0].is_photovoltaic());
        assert_eq!(input.time.mode, TemporalMode::TypicalDays);
        assert_eq!(input.roof.site, Some(120.0));
        assert!(input.retrofit.is_empty());
    }

    #[test]
    fn test_parse_toml_input() {
        let source = r#"
            discount_rate = 0.05

            [time]
            mode = "typical_days"
            days = 1
            steps = 4

            [[carriers]]
            id = "Heat"
            demand = 2.0

            [[retrofit]]
            id = "Wall"
            investment_cost = 5000.0
            embodied_emissions = 120.0
            lifetime_years = 40.0
        "#;
        let input = HubInput::from_toml_str(source).unwrap();
        assert_eq!(input.retrofit[0].id, "Wall");
        assert_eq!(input.carriers[0].demand, Some(Profile::Constant(2.0)));
    }

    #[test]
    fn test_malformed_input_is_invalid() {
        let err = HubInput::from_json_str("{\"carriers\": 3}").unwrap_err();
        assert!(err.is_input_error());
    }
}
