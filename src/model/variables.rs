use std::collections::BTreeMap;

use ndarray::{Array2, Array3};

use super::bounds::ModelBounds;
use super::expr::VarId;
use super::snapshot::{VariableDomain, VariableSpec};
use crate::domain::{DomainRegistry, TimeIndex};

/// Every decision variable of the hub model, addressed by domain indices.
///
/// Per-step tables are indexed `[day, step]`; per-technology tables add the
/// technology as leading axis. Storage state uses the storage-state days of
/// the time grid, which is 365 in continuous state mode.
#[derive(Debug, Clone)]
pub struct VariableSpace {
    specs: Vec<VariableSpec>,
    pub import: BTreeMap<usize, Array2<VarId>>,
    pub export: BTreeMap<usize, Array2<VarId>>,
    /// Input flow of each conversion technology `[tech, day, step]`
    pub conversion_flow: Array3<VarId>,
    /// On/off status of dispatchable technologies with a minimum part-load
    pub on: BTreeMap<usize, Array2<VarId>>,
    pub conversion_installed: Vec<VarId>,
    pub conversion_capacity: Vec<VarId>,
    /// Self-consumed output of photovoltaic technologies on split carriers
    pub self_consumption: BTreeMap<usize, Array2<VarId>>,
    pub charge: Array3<VarId>,
    pub discharge: Array3<VarId>,
    pub state_of_charge: Array3<VarId>,
    pub storage_installed: Vec<VarId>,
    pub storage_capacity: Vec<VarId>,
    /// Charging-mode binary, present with exclusive charging
    pub charging: Option<Array3<VarId>>,
    pub retrofit: Vec<VarId>,
    pub certificates: Option<VarId>,
}

impl VariableSpace {
    pub fn declare(registry: &DomainRegistry, bounds: &ModelBounds, exclusive_charging: bool) -> Self {
        let mut specs = Vec::new();
        let time = registry.time();
        let (days, steps) = time.shape();
        let state_days = time.state_days();
        let n_conv = registry.conversion().len();
        let n_stor = registry.storage().len();

        let mut add = |name: String, domain: VariableDomain, upper: Option<f64>| {
            let id = VarId(specs.len());
            specs.push(VariableSpec {
                name,
                domain,
                lower: 0.0,
                upper,
            });
            id
        };
        let continuous = VariableDomain::Continuous;
        let binary = VariableDomain::Binary;

        let mut import = BTreeMap::new();
        let mut export = BTreeMap::new();
        for (c, carrier) in registry.carriers().iter().enumerate() {
            if carrier.is_importable() {
                let table = Array2::from_shape_fn((days, steps), |(d, t)| {
                    add(format!("import[{},{d},{t}]", carrier.id), continuous, Some(bounds.import[c]))
                });
                import.insert(c, table);
            }
            if carrier.is_exportable() {
                let table = Array2::from_shape_fn((days, steps), |(d, t)| {
                    add(format!("export[{},{d},{t}]", carrier.id), continuous, Some(bounds.export[c]))
                });
                export.insert(c, table);
            }
        }

        let conversion_flow = Array3::from_shape_fn((n_conv, days, steps), |(k, d, t)| {
            let id = &registry.conversion()[k].id;
            add(format!("flow[{id},{d},{t}]"), continuous, Some(bounds.conversion_input[k]))
        });

        let mut on = BTreeMap::new();
        for (k, tech) in registry.conversion().iter().enumerate() {
            if tech.is_dispatchable() && tech.min_part_load() > 0.0 {
                let table = Array2::from_shape_fn((days, steps), |(d, t)| {
                    add(format!("on[{},{d},{t}]", tech.id), binary, Some(1.0))
                });
                on.insert(k, table);
            }
        }

        let conversion_installed = registry
            .conversion()
            .iter()
            .map(|tech| add(format!("installed[{}]", tech.id), binary, Some(1.0)))
            .collect();
        let conversion_capacity = registry
            .conversion()
            .iter()
            .enumerate()
            .map(|(k, tech)| {
                add(
                    format!("capacity[{}]", tech.id),
                    continuous,
                    Some(bounds.conversion_capacity[k]),
                )
            })
            .collect();

        let mut self_consumption = BTreeMap::new();
        for (k, c) in registry.split_producers() {
            let tech = &registry.conversion()[k];
            let upper = bounds.conversion_output(k, registry.factor(k, c));
            let table = Array2::from_shape_fn((days, steps), |(d, t)| {
                add(format!("self_consumption[{},{d},{t}]", tech.id), continuous, Some(upper))
            });
            self_consumption.insert(k, table);
        }

        let charge = Array3::from_shape_fn((n_stor, days, steps), |(s, d, t)| {
            let id = &registry.storage()[s].id;
            add(format!("charge[{id},{d},{t}]"), continuous, Some(bounds.storage_charge[s]))
        });
        let discharge = Array3::from_shape_fn((n_stor, days, steps), |(s, d, t)| {
            let id = &registry.storage()[s].id;
            add(format!("discharge[{id},{d},{t}]"), continuous, Some(bounds.storage_discharge[s]))
        });
        let state_of_charge = Array3::from_shape_fn((n_stor, state_days, steps), |(s, d, t)| {
            let id = &registry.storage()[s].id;
            add(format!("soc[{id},{d},{t}]"), continuous, Some(bounds.storage_capacity[s]))
        });
        let storage_installed = registry
            .storage()
            .iter()
            .map(|s| add(format!("storage_installed[{}]", s.id), binary, Some(1.0)))
            .collect();
        let storage_capacity = registry
            .storage()
            .iter()
            .enumerate()
            .map(|(k, s)| {
                add(
                    format!("storage_capacity[{}]", s.id),
                    continuous,
                    Some(bounds.storage_capacity[k]),
                )
            })
            .collect();
        let charging = exclusive_charging.then(|| {
            Array3::from_shape_fn((n_stor, days, steps), |(s, d, t)| {
                let id = &registry.storage()[s].id;
                add(format!("charging[{id},{d},{t}]"), binary, Some(1.0))
            })
        });

        let retrofit = registry
            .scenarios()
            .iter()
            .map(|r| add(format!("retrofit[{}]", r.id), binary, Some(1.0)))
            .collect();

        let certificates = registry.carbon_market().map(|market| {
            add(
                "certificates".to_string(),
                VariableDomain::Integer,
                Some(market.max_certificates as f64),
            )
        });

        Self {
            specs,
            import,
            export,
            conversion_flow,
            on,
            conversion_installed,
            conversion_capacity,
            self_consumption,
            charge,
            discharge,
            state_of_charge,
            storage_installed,
            storage_capacity,
            charging,
            retrofit,
            certificates,
        }
    }

    pub fn specs(&self) -> &[VariableSpec] {
        &self.specs
    }

    pub fn spec(&self, var: VarId) -> &VariableSpec {
        &self.specs[var.index()]
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Declare an auxiliary variable created while generating rows
    pub(crate) fn add_auxiliary(&mut self, name: String, upper: f64) -> VarId {
        let id = VarId(self.specs.len());
        self.specs.push(VariableSpec {
            name,
            domain: VariableDomain::Continuous,
            lower: 0.0,
            upper: Some(upper),
        });
        id
    }

    pub fn import_at(&self, carrier: usize, at: TimeIndex) -> Option<VarId> {
        self.import.get(&carrier).map(|t| t[[at.day, at.step]])
    }

    pub fn export_at(&self, carrier: usize, at: TimeIndex) -> Option<VarId> {
        self.export.get(&carrier).map(|t| t[[at.day, at.step]])
    }

    pub fn flow_at(&self, tech: usize, at: TimeIndex) -> VarId {
        self.conversion_flow[[tech, at.day, at.step]]
    }

    pub fn on_at(&self, tech: usize, at: TimeIndex) -> Option<VarId> {
        self.on.get(&tech).map(|t| t[[at.day, at.step]])
    }

    pub fn self_consumption_at(&self, tech: usize, at: TimeIndex) -> Option<VarId> {
        self.self_consumption.get(&tech).map(|t| t[[at.day, at.step]])
    }

    pub fn charge_at(&self, storage: usize, at: TimeIndex) -> VarId {
        self.charge[[storage, at.day, at.step]]
    }

    pub fn discharge_at(&self, storage: usize, at: TimeIndex) -> VarId {
        self.discharge[[storage, at.day, at.step]]
    }

    pub fn soc_at(&self, storage: usize, at: TimeIndex) -> VarId {
        self.state_of_charge[[storage, at.day, at.step]]
    }

    pub fn charging_at(&self, storage: usize, at: TimeIndex) -> Option<VarId> {
        self.charging.as_ref().map(|t| t[[storage, at.day, at.step]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BigMConfig;
    use crate::domain::{
        CarbonMarket, ConversionTechnology, EnergyCarrier, ExportTariff, HubInput, ImportTariff,
        Profile, StorageTechnology, TimeInput,
    };

    fn space(exclusive: bool) -> (DomainRegistry, VariableSpace) {
        let mut input = HubInput::new(TimeInput::typical_days(2, 3));
        input.carriers = vec![
            EnergyCarrier::new("Elec")
                .with_import(ImportTariff::constant(0.2, 0.0))
                .with_export(ExportTariff::constant(0.1, 0.0))
                .with_demand(1.0),
            EnergyCarrier::new("Heat").with_demand(2.0),
        ];
        input.conversion = vec![
            ConversionTechnology::dispatchable("ASHP", 0.3)
                .with_factor("Elec", -1.0)
                .with_factor("Heat", 3.0),
            ConversionTechnology::solar("PV", true).with_factor("Elec", 0.18),
        ];
        input.storage = vec![StorageTechnology::new("Tank", "Heat")];
        input.solar_yield = Profile::Constant(1.0);
        input.carbon_market = Some(CarbonMarket {
            price_per_certificate: 10.0,
            carbon_offset_per_certificate: 1.0,
            max_certificates: 150,
        });
        let registry = DomainRegistry::build(input).unwrap();
        let bounds = ModelBounds::compute(&registry, &BigMConfig::default());
        let space = VariableSpace::declare(&registry, &bounds, exclusive);
        (registry, space)
    }

    #[test]
    fn test_tables_follow_capabilities() {
        let (_, vars) = space(false);
        assert_eq!(vars.import.len(), 1);
        assert_eq!(vars.export.len(), 1);
        assert!(vars.import_at(1, TimeIndex::new(0, 0)).is_none());
        assert_eq!(vars.on.len(), 1);
        assert!(vars.on_at(1, TimeIndex::new(0, 0)).is_none());
        assert_eq!(vars.self_consumption.len(), 1);
        assert!(vars.charging.is_none());
    }

    #[test]
    fn test_variable_count() {
        let (_, vars) = space(true);
        let steps = 6;
        let expected = steps * 2 // import, export
            + steps * 2 // flows
            + steps // on
            + 4 // conversion installed + capacity
            + steps // self consumption
            + steps * 3 // charge, discharge, soc
            + 2 // storage installed + capacity
            + steps // charging
            + 1 // baseline retrofit
            + 1; // certificates
        assert_eq!(vars.len(), expected);
    }

    #[test]
    fn test_names_and_domains() {
        let (_, vars) = space(false);
        let flow = vars.flow_at(0, TimeIndex::new(1, 2));
        assert_eq!(vars.spec(flow).name, "flow[ASHP,1,2]");
        let on = vars.on_at(0, TimeIndex::new(0, 0)).unwrap();
        assert_eq!(vars.spec(on).domain, VariableDomain::Binary);
        let certs = vars.certificates.unwrap();
        assert_eq!(vars.spec(certs).domain, VariableDomain::Integer);
        assert_eq!(vars.spec(certs).upper, Some(150.0));
    }
}
