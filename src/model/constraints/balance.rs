use super::RowContext;
use crate::domain::TimeIndex;
use crate::model::expr::LinearExpr;
use crate::model::snapshot::{Constraint, ConstraintFamily};

/// Supply equals demand for one carrier at one step.
///
/// Photovoltaic output of a split carrier enters through its self-consumed
/// part only, and that carrier's exports are settled by [`solar_export_split`].
pub fn energy_balance(ctx: &RowContext<'_>, carrier: usize, at: TimeIndex) -> Constraint {
    let registry = ctx.registry;
    let vars = ctx.vars;
    let split = registry.is_split_carrier(carrier);

    let mut supply = LinearExpr::new();
    if let Some(import) = vars.import_at(carrier, at) {
        supply += import;
    }
    for (k, tech) in registry.conversion().iter().enumerate() {
        let factor = registry.factor(k, carrier);
        if factor == 0.0 {
            continue;
        }
        if split && tech.is_photovoltaic() {
            if let Some(own_use) = vars.self_consumption_at(k, at) {
                supply += own_use;
            }
        } else {
            supply += factor * vars.flow_at(k, at);
        }
    }
    for s in 0..registry.storage().len() {
        let coupling = registry.coupling(s, carrier);
        if coupling != 0.0 {
            supply += coupling * vars.discharge_at(s, at);
            supply -= coupling * vars.charge_at(s, at);
        }
    }

    let hub_carrier = &registry.carriers()[carrier];
    let mut use_side: LinearExpr = vars
        .retrofit
        .iter()
        .enumerate()
        .map(|(r, y)| hub_carrier.hub_demand(r, at.day, at.step) * *y)
        .sum();
    if !split {
        if let Some(export) = vars.export_at(carrier, at) {
            use_side += export;
        }
    }

    Constraint::equal(
        ConstraintFamily::EnergyBalance,
        format!("{},{},{}", hub_carrier.id, at.day, at.step),
        supply,
        use_side,
    )
}

/// Photovoltaic output of a split carrier is self-consumed or exported
pub fn solar_export_split(ctx: &RowContext<'_>, carrier: usize, at: TimeIndex) -> Option<Constraint> {
    let registry = ctx.registry;
    let vars = ctx.vars;
    let export = vars.export_at(carrier, at)?;

    let mut output = LinearExpr::new();
    let mut own_use = LinearExpr::new();
    for (k, c) in registry.split_producers() {
        if c != carrier {
            continue;
        }
        output += registry.factor(k, c) * vars.flow_at(k, at);
        if let Some(v) = vars.self_consumption_at(k, at) {
            own_use += v;
        }
    }

    Some(Constraint::equal(
        ConstraintFamily::SolarExportSplit,
        format!("{},{},{}", registry.carriers()[carrier].id, at.day, at.step),
        output,
        own_use + export,
    ))
}

/// A panel cannot self-consume more than it produces
pub fn self_consumption_limit(
    ctx: &RowContext<'_>,
    tech: usize,
    carrier: usize,
    at: TimeIndex,
) -> Option<Constraint> {
    let own_use = ctx.vars.self_consumption_at(tech, at)?;
    Some(Constraint::leq(
        ConstraintFamily::SolarExportSplit,
        format!("{},{},{}", ctx.registry.conversion()[tech].id, at.day, at.step),
        own_use,
        ctx.registry.factor(tech, carrier) * ctx.vars.flow_at(tech, at),
    ))
}

pub fn rows(ctx: &RowContext<'_>) -> Vec<Constraint> {
    let registry = ctx.registry;
    let mut rows = Vec::new();
    for at in registry.time().indices() {
        for c in 0..registry.carriers().len() {
            rows.push(energy_balance(ctx, c, at));
        }
        for c in registry.split_carriers() {
            rows.extend(solar_export_split(ctx, *c, at));
        }
        for (k, c) in registry.split_producers() {
            rows.extend(self_consumption_limit(ctx, k, c, at));
        }
    }
    rows
}
