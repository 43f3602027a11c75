use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use energy_hub::{
    config::HubConfig, telemetry, DomainRegistry, GoodLpSolver, HubInput, JsonDirectorySink,
    ModelBuilder, OptimizationMode, SearchDriver,
};
use tracing::info;

const USAGE: &str = "usage: energy-hub <input.json|input.toml> [cost|carbon|pareto:<points>] [output-dir]";

fn read_input(path: &Path) -> Result<HubInput> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("reading hub input {}", path.display()))?;
    let input = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => HubInput::from_toml_str(&source)?,
        Some("json") => HubInput::from_json_str(&source)?,
        _ => bail!("unsupported input format: {}", path.display()),
    };
    Ok(input)
}

fn main() -> Result<()> {
    telemetry::init_tracing();

    let mut args = std::env::args().skip(1);
    let Some(input_path) = args.next().map(PathBuf::from) else {
        bail!(USAGE);
    };
    let mode: OptimizationMode = match args.next() {
        Some(arg) => arg.parse()?,
        None => OptimizationMode::Pareto { points: 3 },
    };
    let output = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("results"));

    let cfg = HubConfig::load()?;
    let registry = DomainRegistry::build(read_input(&input_path)?)?;
    let mut model = ModelBuilder::new(&registry, &cfg).build()?;

    let solver = GoodLpSolver::new();
    let mut sink = JsonDirectorySink::new(&output)?;
    let front = SearchDriver::from_config(&solver, &cfg).run_into(&registry, &mut model, mode, &mut sink)?;

    for point in &front.points {
        info!(
            label = %point.label,
            cost = point.cost(),
            carbon = point.carbon(),
            retrofit = ?point.report.retrofit,
            "Pareto point"
        );
    }
    info!(dir = %sink.dir().display(), run_id = %front.run_id, "results written");
    Ok(())
}
