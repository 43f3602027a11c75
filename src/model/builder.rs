use tracing::{debug, info};

use super::bounds::ModelBounds;
use super::constraints::{self, RowContext};
use super::linearize::RetrofitProducts;
use super::objective::Objectives;
use super::snapshot::ModelSnapshot;
use super::variables::VariableSpace;
use crate::config::HubConfig;
use crate::domain::DomainRegistry;
use crate::error::HubResult;

/// A built model: the solver-facing snapshot plus the index maps needed to
/// read a solution back.
#[derive(Debug, Clone)]
pub struct HubModel {
    pub snapshot: ModelSnapshot,
    pub variables: VariableSpace,
    pub products: RetrofitProducts,
    pub objectives: Objectives,
    pub bounds: ModelBounds,
}

pub struct ModelBuilder<'a> {
    registry: &'a DomainRegistry,
    config: &'a HubConfig,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(registry: &'a DomainRegistry, config: &'a HubConfig) -> Self {
        Self { registry, config }
    }

    pub fn build(self) -> HubResult<HubModel> {
        self.config.check()?;
        let registry = self.registry;

        let bounds = ModelBounds::compute(registry, &self.config.big_m);
        let mut variables =
            VariableSpace::declare(registry, &bounds, self.config.storage.exclusive_charging);

        let mut rows = Vec::new();
        let products = RetrofitProducts::build(registry, &mut variables, &mut rows)?;
        let linearization_rows = rows.len();

        let ctx = RowContext {
            registry,
            vars: &variables,
            products: &products,
            bounds: &bounds,
            min_installable_capacity: self.config.big_m.min_installable_capacity,
        };
        rows.extend(constraints::generate(&ctx));

        let objectives = Objectives::assemble(registry, &variables, &products);
        let snapshot = ModelSnapshot::new(
            variables.specs().to_vec(),
            rows,
            objectives.cost.total(),
            objectives.carbon.total(),
        );

        for (family, count) in snapshot.family_counts() {
            debug!(%family, count, "constraint family");
        }
        info!(
            variables = snapshot.variables().len(),
            integers = snapshot.integer_count(),
            constraints = snapshot.constraints().len(),
            linearization_rows,
            bound_fallbacks = bounds.fallbacks,
            mode = %registry.time().mode(),
            "hub model built"
        );

        Ok(HubModel {
            snapshot,
            variables,
            products,
            objectives,
            bounds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ConversionTechnology, EnergyCarrier, ExportTariff, HubInput, ImportTariff, Profile,
        RetrofitScenario, StorageTechnology, TimeIndex, TimeInput, CALENDAR_DAYS,
    };
    use crate::model::snapshot::{Constraint, ConstraintFamily, Sense};
    use ndarray::Array2;
    use rstest::rstest;

    fn input(time: TimeInput, scenarios: usize) -> HubInput {
        let days = time.days;
        let steps = time.steps;
        let mut input = HubInput::new(time);
        input.carriers = vec![
            EnergyCarrier::new("Elec")
                .with_import(ImportTariff::constant(0.25, 0.4))
                .with_export(ExportTariff::constant(0.08, 0.4))
                .with_demand(Profile::from_fn(scenarios, days, steps, |(r, _, t)| {
                    1.0 + t as f64 - 0.1 * r as f64
                })),
            EnergyCarrier::new("Heat").with_demand(Profile::Constant(2.0)),
            EnergyCarrier::new("NatGas").with_import(ImportTariff::constant(0.09, 0.2)),
        ];
        input.conversion = vec![
            ConversionTechnology::dispatchable("CHP", 0.4)
                .with_factor("NatGas", -1.0)
                .with_factor("Elec", 0.3)
                .with_factor("Heat", 0.5)
                .with_cost(1500.0, 2000.0),
            ConversionTechnology::dispatchable("Boiler", 0.0)
                .with_factor("NatGas", -1.0)
                .with_factor("Heat", 0.9),
            ConversionTechnology::solar("PV", true)
                .with_factor("Elec", 0.15)
                .with_cost(300.0, 0.0),
        ];
        input.storage = vec![StorageTechnology::new("Battery", "Elec")
            .with_efficiencies(0.95, 0.95)
            .with_standing_loss(0.001)
            .with_rates(0.3, 0.3)];
        input.solar_yield = Profile::Constant(0.6);
        input.roof.site = Some(100.0);
        if scenarios > 1 {
            input.retrofit = (0..scenarios)
                .map(|r| RetrofitScenario::new(format!("R{r}"), 1000.0 * r as f64, 40.0))
                .collect();
        }
        input
    }

    fn build(input: HubInput) -> HubModel {
        build_with(input, &HubConfig::default())
    }

    fn build_with(input: HubInput, config: &HubConfig) -> HubModel {
        let registry = DomainRegistry::build(input).unwrap();
        ModelBuilder::new(&registry, config).build().unwrap()
    }

    fn rows<'m>(model: &'m HubModel, family: ConstraintFamily, label: &str) -> Vec<&'m Constraint> {
        model
            .snapshot
            .constraints()
            .iter()
            .filter(|c| c.family == family && c.label == label)
            .collect()
    }

    fn find<'m>(model: &'m HubModel, family: ConstraintFamily, label: &str) -> &'m Constraint {
        model
            .snapshot
            .constraints()
            .iter()
            .find(|c| c.family == family && c.label == label)
            .unwrap_or_else(|| panic!("no {family} row labelled {label}"))
    }

    #[test]
    fn test_balance_rows_per_carrier_and_step() {
        let model = build(input(TimeInput::typical_days(2, 3), 1));
        let counts = model.snapshot.family_counts();
        assert_eq!(counts[&ConstraintFamily::EnergyBalance], 3 * 6);
        assert_eq!(counts[&ConstraintFamily::RetrofitExclusivity], 1);
        assert!(!counts.contains_key(&ConstraintFamily::Linearization));
    }

    #[test]
    fn test_photovoltaic_excluded_from_split_carrier_balance() {
        let model = build(input(TimeInput::typical_days(1, 2), 1));
        let row = find(&model, ConstraintFamily::EnergyBalance, "Elec,0,1");
        let at = TimeIndex::new(0, 1);
        let pv_flow = model.variables.flow_at(2, at);
        let own_use = model.variables.self_consumption_at(2, at).unwrap();
        let export = model.variables.export_at(0, at).unwrap();
        assert!(!row.references(pv_flow));
        assert!(!row.references(export));
        assert_eq!(row.expr.coefficient(own_use), 1.0);

        let split = find(&model, ConstraintFamily::SolarExportSplit, "Elec,0,1");
        assert_eq!(split.expr.coefficient(pv_flow), 0.15);
        assert_eq!(split.expr.coefficient(export), -1.0);
    }

    #[test]
    fn test_part_load_rows_only_with_minimum() {
        let model = build(input(TimeInput::typical_days(1, 4), 1));
        let counts = model.snapshot.family_counts();
        // CHP produces two carriers over four steps; the boiler has no minimum
        assert_eq!(counts[&ConstraintFamily::PartLoadFloor], 8);
        assert_eq!(counts[&ConstraintFamily::PartLoadUpper], 8);
        assert_eq!(counts[&ConstraintFamily::DispatchCapacity], 12);
    }

    #[test]
    fn test_part_load_floor_released_when_off() {
        let model = build(input(TimeInput::typical_days(1, 4), 1));
        let at = TimeIndex::new(0, 2);
        let flow = model.variables.flow_at(0, at);
        let on = model.variables.on_at(0, at).unwrap();
        let capacity = model.variables.conversion_capacity[0];
        let big_m = 0.4 * model.bounds.conversion_capacity[0];

        // 0.3 * flow - M * on - 0.4 * capacity >= -M
        let floor = find(&model, ConstraintFamily::PartLoadFloor, "CHP,Elec,0,2");
        assert_eq!(floor.sense, Sense::GreaterEq);
        assert!((floor.expr.coefficient(flow) - 0.3).abs() < 1e-12);
        assert!((floor.expr.coefficient(on) + big_m).abs() < 1e-9);
        assert!((floor.expr.coefficient(capacity) + 0.4).abs() < 1e-12);
        assert!((floor.rhs + big_m).abs() < 1e-9);

        let upper = find(&model, ConstraintFamily::PartLoadUpper, "CHP,Heat,0,2");
        assert_eq!(upper.sense, Sense::LessEq);
        assert!((upper.expr.coefficient(flow) - 0.5).abs() < 1e-12);
        assert!(upper.expr.coefficient(on) < 0.0);
        assert_eq!(upper.rhs, 0.0);
        assert!(model.variables.on_at(1, at).is_none());
    }

    #[test]
    fn test_roof_rows_per_building_and_site() {
        let mut hub = input(TimeInput::typical_days(1, 2), 1);
        hub.conversion.push(
            ConversionTechnology::solar("ST1", false)
                .with_factor("Heat", 0.5)
                .on_building("B1"),
        );
        hub.conversion
            .push(ConversionTechnology::solar("ST2", false).with_factor("Heat", 0.5));
        hub.roof.site = Some(10.0);
        hub.roof.buildings.insert("B1".to_string(), 2.0);
        let model = build(hub);

        assert_eq!(model.snapshot.family_counts()[&ConstraintFamily::RoofArea], 2);
        let [pv, st1, st2] = [2, 3, 4].map(|k| model.variables.conversion_capacity[k]);

        let building = find(&model, ConstraintFamily::RoofArea, "B1");
        assert_eq!(building.sense, Sense::LessEq);
        assert_eq!(building.rhs, 2.0);
        assert_eq!(building.expr.coefficient(st1), 1.0);
        assert!(!building.references(st2));
        assert!(!building.references(pv));

        let site = find(&model, ConstraintFamily::RoofArea, "site");
        assert_eq!(site.rhs, 10.0);
        assert_eq!(site.expr.coefficient(pv), 1.0);
        assert_eq!(site.expr.coefficient(st2), 1.0);
        assert!(!site.references(st1));
    }

    #[test]
    fn test_minimum_installation_rows_follow_configuration() {
        let model = build(input(TimeInput::typical_days(1, 2), 1));
        assert!(!model
            .snapshot
            .family_counts()
            .contains_key(&ConstraintFamily::MinimumInstallation));

        let mut config = HubConfig::default();
        config.big_m.min_installable_capacity = 1.5;
        let model = build_with(input(TimeInput::typical_days(1, 2), 1), &config);
        // three conversion technologies and one storage unit
        assert_eq!(model.snapshot.family_counts()[&ConstraintFamily::MinimumInstallation], 4);

        let chp = find(&model, ConstraintFamily::MinimumInstallation, "CHP");
        assert_eq!(chp.sense, Sense::GreaterEq);
        assert_eq!(chp.expr.coefficient(model.variables.conversion_capacity[0]), 1.0);
        assert_eq!(chp.expr.coefficient(model.variables.conversion_installed[0]), -1.5);
        assert_eq!(chp.rhs, 0.0);

        let battery = find(&model, ConstraintFamily::MinimumInstallation, "Battery");
        assert_eq!(battery.expr.coefficient(model.variables.storage_capacity[0]), 1.0);
        assert_eq!(battery.expr.coefficient(model.variables.storage_installed[0]), -1.5);
    }

    #[test]
    fn test_exclusive_charging_rows_per_step() {
        let model = build(input(TimeInput::typical_days(2, 3), 1));
        assert!(model.variables.charging.is_none());
        assert!(!model
            .snapshot
            .family_counts()
            .contains_key(&ConstraintFamily::ExclusiveCharging));

        let mut config = HubConfig::default();
        config.storage.exclusive_charging = true;
        let model = build_with(input(TimeInput::typical_days(2, 3), 1), &config);
        assert_eq!(model.snapshot.family_counts()[&ConstraintFamily::ExclusiveCharging], 2 * 6);

        let at = TimeIndex::new(1, 2);
        let charging = model.variables.charging_at(0, at).unwrap();
        let charge = model.variables.charge_at(0, at);
        let discharge = model.variables.discharge_at(0, at);
        let charge_m = model.bounds.storage_charge[0];
        let discharge_m = model.bounds.storage_discharge[0];

        let pair = rows(&model, ConstraintFamily::ExclusiveCharging, "Battery,1,2");
        assert_eq!(pair.len(), 2);
        // charge - Mc * charging <= 0
        assert_eq!(pair[0].expr.coefficient(charge), 1.0);
        assert_eq!(pair[0].expr.coefficient(charging), -charge_m);
        assert_eq!(pair[0].rhs, 0.0);
        // discharge + Md * charging <= Md
        assert_eq!(pair[1].expr.coefficient(discharge), 1.0);
        assert_eq!(pair[1].expr.coefficient(charging), discharge_m);
        assert_eq!(pair[1].rhs, discharge_m);
        assert!(pair.iter().all(|row| row.sense == Sense::LessEq));
    }

    #[test]
    fn test_demand_weighted_by_scenario_binaries() {
        let model = build(input(TimeInput::typical_days(1, 2), 3));
        let row = find(&model, ConstraintFamily::EnergyBalance, "Elec,0,1");
        assert_eq!(row.sense, Sense::Equal);
        for (r, y) in model.variables.retrofit.iter().enumerate() {
            let expected = -(2.0 - 0.1 * r as f64);
            assert!((row.expr.coefficient(*y) - expected).abs() < 1e-12);
        }
        assert!(model.snapshot.family_counts()[&ConstraintFamily::Linearization] > 0);
    }

    #[rstest]
    #[case::typical(TimeInput::typical_days(2, 3), TimeIndex::new(1, 0), TimeIndex::new(1, 2))]
    #[case::full(TimeInput::full_horizon(2), TimeIndex::new(0, 0), TimeIndex::new(CALENDAR_DAYS - 1, 1))]
    #[case::continuous(
        TimeInput::continuous_state(2, 3, Array2::from_shape_fn((1, CALENDAR_DAYS), |(_, d)| d % 2)),
        TimeIndex::new(0, 0),
        TimeIndex::new(CALENDAR_DAYS - 1, 2)
    )]
    fn test_storage_recurrence_closes(
        #[case] time: TimeInput,
        #[case] at: TimeIndex,
        #[case] previous: TimeIndex,
    ) {
        let model = build(input(time, 1));
        let label = format!("Battery,{},{}", at.day, at.step);
        let row = find(&model, ConstraintFamily::StorageBalance, &label);
        let soc = model.variables.soc_at(0, at);
        let prior = model.variables.soc_at(0, previous);
        assert_eq!(row.expr.coefficient(soc), 1.0);
        assert!((row.expr.coefficient(prior) + 0.999).abs() < 1e-12);
    }

    #[test]
    fn test_continuous_state_reads_representative_flows() {
        let calendar = Array2::from_shape_fn((2, CALENDAR_DAYS), |(r, d)| (d + r) % 2);
        let mut hub = input(TimeInput::continuous_state(2, 2, calendar), 2);
        hub.time.replication = Some(Array2::from_elem((2, 2), 182.5));
        let model = build(hub);
        assert_eq!(model.variables.state_of_charge.dim(), (1, CALENDAR_DAYS, 2));
        let row = find(&model, ConstraintFamily::StorageBalance, "Battery,10,1");
        // day 10 maps to day 0 under R0 and day 1 under R1
        let z0 = model.products.charge[0][[0, 0, 1]];
        let z1 = model.products.charge[0][[1, 1, 1]];
        assert!((row.expr.coefficient(z0) + 0.95).abs() < 1e-12);
        assert!((row.expr.coefficient(z1) + 0.95).abs() < 1e-12);
        let charge = model.variables.charge_at(0, TimeIndex::new(0, 1));
        assert_eq!(model.variables.spec(z0).upper, model.variables.spec(charge).upper);
    }

    #[test]
    fn test_every_big_m_covers_its_variable() {
        let model = build(input(TimeInput::typical_days(1, 2), 2));
        let release_rows: Vec<_> = model
            .snapshot
            .constraints()
            .iter()
            .filter(|c| c.family == ConstraintFamily::Linearization && c.expr.terms().len() == 3)
            .collect();
        assert!(!release_rows.is_empty());
        // x - z + M * b <= M
        for row in release_rows {
            let (x, _) = row
                .expr
                .terms()
                .iter()
                .find(|(_, coeff)| *coeff == 1.0)
                .unwrap();
            let upper = model.snapshot.variable(*x).upper.unwrap();
            assert!(row.rhs + 1e-9 >= upper, "{row}");
        }
    }

    #[test]
    fn test_unsound_configuration_rejected_before_building() {
        let registry = DomainRegistry::build(input(TimeInput::typical_days(1, 1), 1)).unwrap();
        let mut config = HubConfig::default();
        config.big_m.min_installable_capacity = 5e4;
        assert!(ModelBuilder::new(&registry, &config).build().is_err());
    }
}
