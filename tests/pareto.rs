#![cfg(feature = "optimization")]

use energy_hub::domain::{
    ConversionTechnology, EnergyCarrier, ExportTariff, HubInput, ImportTariff, Profile, TimeInput,
};
use energy_hub::search::{CARBON_LABEL, COST_LABEL};
use energy_hub::{
    DomainRegistry, GoodLpSolver, HubConfig, HubModel, JsonDirectorySink, ModelBuilder,
    OptimizationMode, SearchDriver, SweepStep,
};

const ROOF: f64 = 0.8;

fn rooftop_pv() -> (DomainRegistry, HubModel) {
    let mut input = HubInput::new(TimeInput::typical_days(1, 4));
    input.carriers = vec![EnergyCarrier::new("Elec")
        .with_import(ImportTariff::constant(0.3, 0.5))
        .with_export(ExportTariff::constant(0.05, 0.0))
        .with_demand(5.0)];
    input.conversion = vec![ConversionTechnology::solar("PV", true)
        .with_factor("Elec", 1.0)
        .with_cost(100.0, 0.0)
        .with_lifetime(20.0)];
    input.solar_yield = Profile::daily(1, 1, &[0.0, 0.5, 1.0, 0.5]);
    input.roof.site = Some(ROOF);

    let registry = DomainRegistry::build(input).unwrap();
    let model = ModelBuilder::new(&registry, &HubConfig::default()).build().unwrap();
    (registry, model)
}

#[test]
fn front_trades_cost_for_carbon() {
    let (registry, mut model) = rooftop_pv();
    let mut config = HubConfig::default();
    config.search.carbon_slack = 0.0;
    let solver = GoodLpSolver::new();
    let front = SearchDriver::from_config(&solver, &config)
        .run(&registry, &mut model, OptimizationMode::Pareto { points: 2 })
        .unwrap();

    assert_eq!(front.len(), 4);
    assert!(front.is_monotone(1e-6), "costs {:?} carbons {:?}", front.costs(), front.carbons());

    let cheapest = front.point(COST_LABEL).unwrap();
    let cleanest = front.point(CARBON_LABEL).unwrap();
    assert!((cheapest.cost() - 6.0).abs() < 1e-6);
    assert!((cheapest.carbon() - 10.0).abs() < 1e-6);
    // full roof: 1.6 units of PV displace imports at 0.3, area costs 5 per m2 and year
    assert!((cleanest.carbon() - 9.2).abs() < 1e-4);
    assert!((cleanest.cost() - 9.52).abs() < 1e-4);

    for point in &front.points {
        let pv = point.report.conversion_unit("PV").unwrap();
        assert!(pv.capacity <= ROOF + 1e-6, "{} installs {}", point.label, pv.capacity);
    }
}

#[test]
fn epsilon_steps_tighten_in_order() {
    let (registry, mut model) = rooftop_pv();
    let solver = GoodLpSolver::new();
    let front = SearchDriver::from_config(&solver, &HubConfig::default())
        .run(&registry, &mut model, OptimizationMode::Pareto { points: 3 })
        .unwrap();

    let bounds: Vec<f64> = front.points.iter().filter_map(|p| p.epsilon).collect();
    assert_eq!(bounds.len(), 4);
    assert!(bounds.windows(2).all(|w| w[0] > w[1]));
    for point in &front.points[1..] {
        assert!(matches!(point.step, SweepStep::Epsilon { .. }));
        assert!(point.carbon() <= point.epsilon.unwrap() + 1e-6);
    }
}

#[test]
fn front_written_to_directory() {
    let (registry, mut model) = rooftop_pv();
    let dir = tempfile::tempdir().unwrap();
    let mut sink = JsonDirectorySink::new(dir.path()).unwrap();
    let solver = GoodLpSolver::new();

    let front = SearchDriver::from_config(&solver, &HubConfig::default())
        .run_into(&registry, &mut model, OptimizationMode::Pareto { points: 1 }, &mut sink)
        .unwrap();

    for index in 0..front.len() {
        assert!(dir.path().join(format!("point_{index}.json")).exists());
    }
    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("front.json")).unwrap())
            .unwrap();
    assert_eq!(summary["run_id"], front.run_id.to_string());
    assert_eq!(summary["points"].as_array().unwrap().len(), 3);
    assert_eq!(summary["points"][2]["label"], CARBON_LABEL);
}
