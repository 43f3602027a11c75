use super::RowContext;
use crate::domain::TimeIndex;
use crate::model::expr::LinearExpr;
use crate::model::snapshot::{Constraint, ConstraintFamily};

fn step_label(ctx: &RowContext<'_>, tech: usize, carrier: usize, at: TimeIndex) -> String {
    format!(
        "{},{},{},{}",
        ctx.registry.conversion()[tech].id,
        ctx.registry.carriers()[carrier].id,
        at.day,
        at.step
    )
}

/// Output on each produced carrier stays within installed capacity
pub fn dispatch_capacity(ctx: &RowContext<'_>, tech: usize, carrier: usize, at: TimeIndex) -> Constraint {
    let factor = ctx.registry.factor(tech, carrier);
    Constraint::leq(
        ConstraintFamily::DispatchCapacity,
        step_label(ctx, tech, carrier, at),
        factor * ctx.vars.flow_at(tech, at),
        ctx.vars.conversion_capacity[tech],
    )
}

/// Output is zero while the unit is off
pub fn part_load_upper(
    ctx: &RowContext<'_>,
    tech: usize,
    carrier: usize,
    at: TimeIndex,
) -> Option<Constraint> {
    let on = ctx.vars.on_at(tech, at)?;
    let factor = ctx.registry.factor(tech, carrier);
    let big_m = ctx.bounds.conversion_output(tech, factor);
    Some(Constraint::leq(
        ConstraintFamily::PartLoadUpper,
        step_label(ctx, tech, carrier, at),
        factor * ctx.vars.flow_at(tech, at),
        big_m * on,
    ))
}

/// Output reaches the minimum part-load share of capacity while the unit is on
pub fn part_load_floor(
    ctx: &RowContext<'_>,
    tech: usize,
    carrier: usize,
    at: TimeIndex,
) -> Option<Constraint> {
    let on = ctx.vars.on_at(tech, at)?;
    let factor = ctx.registry.factor(tech, carrier);
    let min_part_load = ctx.registry.conversion()[tech].min_part_load();
    let big_m = min_part_load * ctx.bounds.conversion_capacity[tech];
    Some(Constraint::geq(
        ConstraintFamily::PartLoadFloor,
        step_label(ctx, tech, carrier, at),
        factor * ctx.vars.flow_at(tech, at) + big_m - big_m * on,
        min_part_load * ctx.vars.conversion_capacity[tech],
    ))
}

/// Solar input equals irradiance on the installed area of the selected scenario
pub fn solar_yield(ctx: &RowContext<'_>, tech: usize, at: TimeIndex) -> Option<Constraint> {
    let registry = ctx.registry;
    let mut irradiated = LinearExpr::new();
    for r in 0..registry.scenarios().len() {
        let area = ctx.products.solar_capacity(tech, r)?;
        irradiated += registry.solar_yield().at(r, at.day, at.step) * area;
    }
    Some(Constraint::equal(
        ConstraintFamily::SolarYield,
        format!("{},{},{}", registry.conversion()[tech].id, at.day, at.step),
        ctx.vars.flow_at(tech, at),
        irradiated,
    ))
}

pub fn minimum_installation(ctx: &RowContext<'_>, tech: usize) -> Option<Constraint> {
    let minimum = ctx.min_installable_capacity;
    (minimum > 0.0).then(|| {
        Constraint::geq(
            ConstraintFamily::MinimumInstallation,
            ctx.registry.conversion()[tech].id.clone(),
            ctx.vars.conversion_capacity[tech],
            minimum * ctx.vars.conversion_installed[tech],
        )
    })
}

/// Capacity only where the technology is installed
pub fn installation_gate(ctx: &RowContext<'_>, tech: usize) -> Constraint {
    Constraint::leq(
        ConstraintFamily::InstallationGate,
        ctx.registry.conversion()[tech].id.clone(),
        ctx.vars.conversion_capacity[tech],
        ctx.bounds.conversion_capacity[tech] * ctx.vars.conversion_installed[tech],
    )
}

/// Shared site roof and per-building roofs bound total solar area
pub fn roof_area(ctx: &RowContext<'_>) -> Vec<Constraint> {
    let registry = ctx.registry;
    let area_on = |building: Option<&str>| -> LinearExpr {
        registry
            .conversion()
            .iter()
            .enumerate()
            .filter(|(_, tech)| tech.is_solar() && tech.building() == building)
            .map(|(k, _)| LinearExpr::from(ctx.vars.conversion_capacity[k]))
            .sum()
    };

    let mut rows = Vec::new();
    if let Some(site) = registry.roof().site {
        let area = area_on(None);
        if !area.is_constant() {
            rows.push(Constraint::leq(ConstraintFamily::RoofArea, "site", area, site));
        }
    }
    for (building, limit) in &registry.roof().buildings {
        let area = area_on(Some(building.as_str()));
        if !area.is_constant() {
            rows.push(Constraint::leq(
                ConstraintFamily::RoofArea,
                building.clone(),
                area,
                *limit,
            ));
        }
    }
    rows
}

pub fn rows(ctx: &RowContext<'_>) -> Vec<Constraint> {
    let registry = ctx.registry;
    let n_carriers = registry.carriers().len();
    let mut rows = Vec::new();

    for (k, tech) in registry.conversion().iter().enumerate() {
        rows.push(installation_gate(ctx, k));
        rows.extend(minimum_installation(ctx, k));

        for at in registry.time().indices() {
            if tech.is_solar() {
                rows.extend(solar_yield(ctx, k, at));
                continue;
            }
            for c in (0..n_carriers).filter(|c| registry.factor(k, *c) > 0.0) {
                rows.push(dispatch_capacity(ctx, k, c, at));
                rows.extend(part_load_upper(ctx, k, c, at));
                rows.extend(part_load_floor(ctx, k, c, at));
            }
        }
    }
    rows.extend(roof_area(ctx));
    rows
}
