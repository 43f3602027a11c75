use serde::{Deserialize, Serialize};

use super::profile::Profile;

/// What the hub may do with a carrier at its boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CarrierCapabilities {
    pub importable: bool,
    pub exportable: bool,
    pub demanded: bool,
}

/// Prices and emissions for energy bought from outside the hub
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportTariff {
    pub price: Profile,
    #[serde(default)]
    pub carbon_intensity: Profile,
}

impl ImportTariff {
    pub fn constant(price: f64, carbon_intensity: f64) -> Self {
        Self {
            price: Profile::Constant(price),
            carbon_intensity: Profile::Constant(carbon_intensity),
        }
    }
}

/// Revenue and avoided emissions credited for energy sold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportTariff {
    pub price: Profile,
    #[serde(default)]
    pub carbon_credit: Profile,
}

impl ExportTariff {
    pub fn constant(price: f64, carbon_credit: f64) -> Self {
        Self {
            price: Profile::Constant(price),
            carbon_credit: Profile::Constant(carbon_credit),
        }
    }
}

fn unit() -> f64 {
    1.0
}

/// An energy carrier such as electricity, heat or natural gas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyCarrier {
    pub id: String,
    #[serde(default)]
    pub import: Option<ImportTariff>,
    #[serde(default)]
    pub export: Option<ExportTariff>,
    /// Building demand; absent means the carrier is not demanded
    #[serde(default)]
    pub demand: Option<Profile>,
    /// Distribution efficiency between hub and buildings, applied to demand
    #[serde(default = "unit")]
    pub network_efficiency: f64,
}

impl EnergyCarrier {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            import: None,
            export: None,
            demand: None,
            network_efficiency: 1.0,
        }
    }

    pub fn with_import(mut self, tariff: ImportTariff) -> Self {
        self.import = Some(tariff);
        self
    }

    pub fn with_export(mut self, tariff: ExportTariff) -> Self {
        self.export = Some(tariff);
        self
    }

    pub fn with_demand(mut self, demand: impl Into<Profile>) -> Self {
        self.demand = Some(demand.into());
        self
    }

    pub fn with_network_efficiency(mut self, efficiency: f64) -> Self {
        self.network_efficiency = efficiency;
        self
    }

    pub fn capabilities(&self) -> CarrierCapabilities {
        CarrierCapabilities {
            importable: self.import.is_some(),
            exportable: self.export.is_some(),
            demanded: self.demand.is_some(),
        }
    }

    pub fn is_importable(&self) -> bool {
        self.import.is_some()
    }

    pub fn is_exportable(&self) -> bool {
        self.export.is_some()
    }

    /// Demand at (scenario, day, step) as seen at the hub, network losses included
    pub fn hub_demand(&self, scenario: usize, day: usize, step: usize) -> f64 {
        self.demand
            .as_ref()
            .map_or(0.0, |d| d.at(scenario, day, step) / self.network_efficiency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_follow_tariffs() {
        let carrier = EnergyCarrier::new("Elec")
            .with_import(ImportTariff::constant(0.2, 0.1))
            .with_demand(5.0);
        let caps = carrier.capabilities();
        assert!(caps.importable);
        assert!(!caps.exportable);
        assert!(caps.demanded);
    }

    #[test]
    fn test_network_losses_raise_hub_demand() {
        let carrier = EnergyCarrier::new("Heat")
            .with_demand(9.0)
            .with_network_efficiency(0.9);
        assert!((carrier.hub_demand(0, 0, 0) - 10.0).abs() < 1e-12);
        assert_eq!(EnergyCarrier::new("Gas").hub_demand(0, 0, 0), 0.0);
    }

    #[test]
    fn test_deserialize_minimal_carrier() {
        let carrier: EnergyCarrier =
            serde_json::from_str(r#"{"id":"NatGas","import":{"price":0.1}}"#).unwrap();
        assert!(carrier.is_importable());
        assert_eq!(carrier.network_efficiency, 1.0);
        assert_eq!(carrier.import.unwrap().carbon_intensity, Profile::Constant(0.0));
    }
}
