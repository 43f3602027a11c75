use std::collections::BTreeMap;

use itertools::Itertools;
use ndarray::Array2;
use tracing::debug;
use validator::Validate;

use super::carrier::EnergyCarrier;
use super::input::{CarbonMarket, HubInput, NetworkInvestment, RoofArea};
use super::profile::Profile;
use super::retrofit::RetrofitScenario;
use super::technology::{ConversionTechnology, StorageTechnology};
use super::time::TimeGrid;
use crate::error::{HubError, HubResult};

/// Capital recovery factor: the annuity that repays one unit of capital
/// over `lifetime` years at `rate`.
pub fn capital_recovery_factor(rate: f64, lifetime: f64) -> f64 {
    if rate == 0.0 {
        return 1.0 / lifetime;
    }
    let growth = (1.0 + rate).powf(lifetime);
    rate * growth / (growth - 1.0)
}

/// Validated, index-addressed view of a [`HubInput`].
///
/// Carriers, technologies and scenarios are addressed by position; dense
/// factor tables replace the id-keyed maps of the input.
#[derive(Debug, Clone)]
pub struct DomainRegistry {
    carriers: Vec<EnergyCarrier>,
    conversion: Vec<ConversionTechnology>,
    storage: Vec<StorageTechnology>,
    scenarios: Vec<RetrofitScenario>,
    explicit_scenarios: bool,
    time: TimeGrid,
    conversion_factors: Array2<f64>,
    storage_coupling: Array2<f64>,
    solar_yield: Profile,
    roof: RoofArea,
    network: Option<NetworkInvestment>,
    carbon_market: Option<CarbonMarket>,
    discount_rate: f64,
    /// Exportable carriers produced by photovoltaics
    split_carriers: Vec<usize>,
}

fn unique_ids<'a>(kind: &str, ids: impl Iterator<Item = &'a str>) -> HubResult<()> {
    match ids.duplicates().next() {
        Some(id) => Err(HubError::invalid(format!("duplicate {kind} id '{id}'"))),
        None => Ok(()),
    }
}

impl DomainRegistry {
    pub fn build(input: HubInput) -> HubResult<Self> {
        let HubInput {
            carriers,
            conversion,
            storage,
            retrofit,
            time,
            solar_yield,
            roof,
            network,
            carbon_market,
            discount_rate,
        } = input;

        if carriers.is_empty() {
            return Err(HubError::invalid("at least one energy carrier is required"));
        }
        unique_ids("carrier", carriers.iter().map(|c| c.id.as_str()))?;
        unique_ids("conversion technology", conversion.iter().map(|t| t.id.as_str()))?;
        unique_ids("storage technology", storage.iter().map(|s| s.id.as_str()))?;
        unique_ids("retrofit scenario", retrofit.iter().map(|r| r.id.as_str()))?;

        let explicit_scenarios = !retrofit.is_empty();
        let scenarios = if explicit_scenarios {
            retrofit
        } else {
            vec![RetrofitScenario::baseline()]
        };
        for scenario in &scenarios {
            scenario.validate()?;
            if scenario.lifetime_years <= 0.0 {
                return Err(HubError::invalid(format!(
                    "retrofit scenario '{}' needs a positive lifetime",
                    scenario.id
                )));
            }
        }

        if !discount_rate.is_finite() || discount_rate < 0.0 {
            return Err(HubError::invalid(format!("discount rate {discount_rate} is negative")));
        }

        let time = TimeGrid::build(&time, scenarios.len())?;
        let shape = (scenarios.len(), time.days(), time.steps());

        let carrier_index: BTreeMap<&str, usize> = carriers
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.as_str(), i))
            .collect();
        let lookup = |id: &str| {
            carrier_index
                .get(id)
                .copied()
                .ok_or_else(|| HubError::unknown("carrier", id))
        };

        for carrier in &carriers {
            if !(carrier.network_efficiency > 0.0 && carrier.network_efficiency <= 1.0) {
                return Err(HubError::invalid(format!(
                    "carrier '{}': network efficiency must lie in (0, 1]",
                    carrier.id
                )));
            }
            if let Some(demand) = &carrier.demand {
                demand.check_non_negative(&format!("demand of '{}'", carrier.id), shape)?;
            }
            if let Some(import) = &carrier.import {
                import.price.check(&format!("import price of '{}'", carrier.id), shape)?;
                import
                    .carbon_intensity
                    .check(&format!("import carbon of '{}'", carrier.id), shape)?;
            }
            if let Some(export) = &carrier.export {
                export.price.check(&format!("export price of '{}'", carrier.id), shape)?;
                export
                    .carbon_credit
                    .check(&format!("export credit of '{}'", carrier.id), shape)?;
            }
        }

        let mut conversion_factors = Array2::zeros((conversion.len(), carriers.len()));
        for (t, tech) in conversion.iter().enumerate() {
            tech.validate()?;
            if tech.lifetime_years <= 0.0 {
                return Err(HubError::invalid(format!(
                    "technology '{}' needs a positive lifetime",
                    tech.id
                )));
            }
            for (carrier, factor) in &tech.conversion_factors {
                conversion_factors[[t, lookup(carrier)?]] = *factor;
            }
            let row = conversion_factors.row(t);
            let outputs = row.iter().filter(|f| **f > 0.0).count();
            if tech.is_solar() {
                if outputs == 0 || row.iter().any(|f| *f < 0.0) {
                    return Err(HubError::invalid(format!(
                        "solar technology '{}' must have positive output factors only",
                        tech.id
                    )));
                }
                if tech.is_photovoltaic() && outputs != 1 {
                    return Err(HubError::invalid(format!(
                        "photovoltaic technology '{}' must produce exactly one carrier",
                        tech.id
                    )));
                }
                if let Some(building) = tech.building() {
                    if !roof.buildings.contains_key(building) {
                        return Err(HubError::unknown("building", building));
                    }
                }
            } else {
                if row.iter().all(|f| *f == 0.0) {
                    return Err(HubError::invalid(format!(
                        "technology '{}' has no non-zero conversion factor",
                        tech.id
                    )));
                }
                let mpl = tech.min_part_load();
                if !(0.0..=1.0).contains(&mpl) {
                    return Err(HubError::invalid(format!(
                        "technology '{}': minimum part-load {mpl} outside [0, 1]",
                        tech.id
                    )));
                }
            }
        }

        let mut storage_coupling = Array2::zeros((storage.len(), carriers.len()));
        for (s, unit) in storage.iter().enumerate() {
            unit.validate()?;
            if unit.charge_efficiency <= 0.0 || unit.discharge_efficiency <= 0.0 {
                return Err(HubError::invalid(format!(
                    "storage '{}': efficiencies must be positive",
                    unit.id
                )));
            }
            if unit.standing_loss >= 1.0 || unit.lifetime_years <= 0.0 {
                return Err(HubError::invalid(format!(
                    "storage '{}': standing loss must be below 1 and lifetime positive",
                    unit.id
                )));
            }
            for (carrier, factor) in &unit.coupling {
                if *factor < 0.0 {
                    return Err(HubError::invalid(format!(
                        "storage '{}': negative coupling to '{carrier}'",
                        unit.id
                    )));
                }
                storage_coupling[[s, lookup(carrier)?]] = *factor;
            }
            if storage_coupling.row(s).iter().all(|f| *f == 0.0) {
                return Err(HubError::invalid(format!(
                    "storage '{}' is not coupled to any carrier",
                    unit.id
                )));
            }
        }

        if conversion.iter().any(|t| t.is_solar()) {
            solar_yield.check_non_negative("solar yield", shape)?;
        }
        if roof.site.is_some_and(|a| a < 0.0) || roof.buildings.values().any(|a| *a < 0.0) {
            return Err(HubError::invalid("roof areas must be non-negative"));
        }
        if let Some(network) = &network {
            network.validate()?;
            if network.lifetime_years <= 0.0 {
                return Err(HubError::invalid("network lifetime must be positive"));
            }
        }
        if let Some(market) = &carbon_market {
            market.validate()?;
        }

        let split_carriers = (0..carriers.len())
            .filter(|c| {
                carriers[*c].is_exportable()
                    && conversion
                        .iter()
                        .enumerate()
                        .any(|(t, tech)| tech.is_photovoltaic() && conversion_factors[[t, *c]] > 0.0)
            })
            .collect();

        debug!(
            carriers = carriers.len(),
            conversion = conversion.len(),
            storage = storage.len(),
            scenarios = scenarios.len(),
            mode = %time.mode(),
            "domain registry built"
        );

        Ok(Self {
            carriers,
            conversion,
            storage,
            scenarios,
            explicit_scenarios,
            time,
            conversion_factors,
            storage_coupling,
            solar_yield,
            roof,
            network,
            carbon_market,
            discount_rate,
            split_carriers,
        })
    }

    pub fn carriers(&self) -> &[EnergyCarrier] {
        &self.carriers
    }

    pub fn conversion(&self) -> &[ConversionTechnology] {
        &self.conversion
    }

    pub fn storage(&self) -> &[StorageTechnology] {
        &self.storage
    }

    pub fn scenarios(&self) -> &[RetrofitScenario] {
        &self.scenarios
    }

    /// Whether retrofit options were supplied rather than the implicit baseline
    pub fn has_retrofit_options(&self) -> bool {
        self.explicit_scenarios
    }

    pub fn time(&self) -> &TimeGrid {
        &self.time
    }

    pub fn solar_yield(&self) -> &Profile {
        &self.solar_yield
    }

    pub fn roof(&self) -> &RoofArea {
        &self.roof
    }

    pub fn network(&self) -> Option<&NetworkInvestment> {
        self.network.as_ref()
    }

    pub fn carbon_market(&self) -> Option<&CarbonMarket> {
        self.carbon_market.as_ref()
    }

    pub fn discount_rate(&self) -> f64 {
        self.discount_rate
    }

    pub fn crf(&self, lifetime: f64) -> f64 {
        capital_recovery_factor(self.discount_rate, lifetime)
    }

    /// Signed factor of technology `tech` on carrier `carrier`
    pub fn factor(&self, tech: usize, carrier: usize) -> f64 {
        self.conversion_factors[[tech, carrier]]
    }

    pub fn coupling(&self, storage: usize, carrier: usize) -> f64 {
        self.storage_coupling[[storage, carrier]]
    }

    /// Whether photovoltaic output of `carrier` is split into self-consumption and export
    pub fn is_split_carrier(&self, carrier: usize) -> bool {
        self.split_carriers.contains(&carrier)
    }

    pub fn split_carriers(&self) -> &[usize] {
        &self.split_carriers
    }

    /// Photovoltaic technologies feeding a split carrier, with that carrier
    pub fn split_producers(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.split_carriers.iter().flat_map(move |c| {
            (0..self.conversion.len())
                .filter(move |t| self.conversion[*t].is_photovoltaic() && self.factor(*t, *c) > 0.0)
                .map(move |t| (t, *c))
        })
    }

    pub fn carrier_index(&self, id: &str) -> HubResult<usize> {
        self.carriers
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| HubError::unknown("carrier", id))
    }

    pub fn conversion_index(&self, id: &str) -> HubResult<usize> {
        self.conversion
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| HubError::unknown("conversion technology", id))
    }

    pub fn storage_index(&self, id: &str) -> HubResult<usize> {
        self.storage
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| HubError::unknown("storage technology", id))
    }

    pub fn scenario_index(&self, id: &str) -> HubResult<usize> {
        self.scenarios
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| HubError::unknown("retrofit scenario", id))
    }

    /// Roof area limit for a solar technology, `None` when unbounded
    pub fn roof_limit(&self, tech: usize) -> Option<f64> {
        match self.conversion[tech].building() {
            Some(building) => self.roof.buildings.get(building).copied(),
            None => self.roof.site,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::carrier::{ExportTariff, ImportTariff};
    use crate::domain::time::TimeInput;

    fn base_input() -> HubInput {
        let mut input = HubInput::new(TimeInput::typical_days(1, 4));
        input.carriers = vec![
            EnergyCarrier::new("Elec")
                .with_import(ImportTariff::constant(0.2, 0.3))
                .with_export(ExportTariff::constant(0.05, 0.3))
                .with_demand(3.0),
            EnergyCarrier::new("Heat").with_demand(5.0),
            EnergyCarrier::new("NatGas").with_import(ImportTariff::constant(0.08, 0.2)),
        ];
        input.conversion = vec![
            ConversionTechnology::dispatchable("Boiler", 0.0)
                .with_factor("NatGas", -1.0)
                .with_factor("Heat", 0.9),
            ConversionTechnology::solar("PV", true).with_factor("Elec", 0.15),
        ];
        input.solar_yield = Profile::Constant(0.5);
        input
    }

    #[test]
    fn test_crf_values() {
        assert!((capital_recovery_factor(0.0, 20.0) - 0.05).abs() < 1e-12);
        let crf = capital_recovery_factor(0.08, 20.0);
        assert!((crf - 0.101_852_2).abs() < 1e-6);
    }

    #[test]
    fn test_factor_tables_are_dense() {
        let registry = DomainRegistry::build(base_input()).unwrap();
        let boiler = registry.conversion_index("Boiler").unwrap();
        let gas = registry.carrier_index("NatGas").unwrap();
        let heat = registry.carrier_index("Heat").unwrap();
        let elec = registry.carrier_index("Elec").unwrap();
        assert_eq!(registry.factor(boiler, gas), -1.0);
        assert_eq!(registry.factor(boiler, heat), 0.9);
        assert_eq!(registry.factor(boiler, elec), 0.0);
    }

    #[test]
    fn test_implicit_baseline_scenario() {
        let registry = DomainRegistry::build(base_input()).unwrap();
        assert_eq!(registry.scenarios().len(), 1);
        assert!(!registry.has_retrofit_options());
    }

    #[test]
    fn test_photovoltaic_split_carrier() {
        let registry = DomainRegistry::build(base_input()).unwrap();
        let elec = registry.carrier_index("Elec").unwrap();
        assert_eq!(registry.split_carriers(), &[elec]);
        let pv = registry.conversion_index("PV").unwrap();
        assert_eq!(registry.split_producers().collect::<Vec<_>>(), vec![(pv, elec)]);
    }

    #[test]
    fn test_unknown_carrier_rejected() {
        let mut input = base_input();
        input.conversion[0] = ConversionTechnology::dispatchable("Boiler", 0.0)
            .with_factor("Oil", -1.0)
            .with_factor("Heat", 0.9);
        let err = DomainRegistry::build(input).unwrap_err();
        assert!(matches!(err, HubError::UnknownIdentifier { kind: "carrier", .. }));
    }

    #[test]
    fn test_solar_with_input_factor_rejected() {
        let mut input = base_input();
        input.conversion[1] = ConversionTechnology::solar("PV", true)
            .with_factor("Elec", 0.15)
            .with_factor("NatGas", -0.1);
        assert!(DomainRegistry::build(input).is_err());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut input = base_input();
        input.carriers.push(EnergyCarrier::new("Heat"));
        assert!(DomainRegistry::build(input).is_err());
    }

    #[test]
    fn test_negative_demand_rejected() {
        let mut input = base_input();
        input.carriers[1].demand = Some(Profile::daily(1, 1, &[1.0, 2.0, -1.0, 0.0]));
        assert!(DomainRegistry::build(input).is_err());
    }

    #[test]
    fn test_unknown_building_rejected() {
        let mut input = base_input();
        input.conversion[1] = ConversionTechnology::solar("PV", true)
            .with_factor("Elec", 0.15)
            .on_building("B7");
        let err = DomainRegistry::build(input).unwrap_err();
        assert!(matches!(err, HubError::UnknownIdentifier { kind: "building", .. }));
    }

    #[test]
    fn test_profile_shape_follows_scenarios() {
        let mut input = base_input();
        input.retrofit = vec![
            RetrofitScenario::new("Noretrofit", 0.0, 40.0),
            RetrofitScenario::new("Wall", 1000.0, 40.0),
        ];
        input.carriers[1].demand = Some(Profile::daily(1, 1, &[5.0; 4]));
        assert!(DomainRegistry::build(input.clone()).is_err());

        input.carriers[1].demand = Some(Profile::daily(2, 1, &[5.0; 4]));
        let registry = DomainRegistry::build(input).unwrap();
        assert!(registry.has_retrofit_options());
        assert_eq!(registry.scenario_index("Wall").unwrap(), 1);
    }
}
