use super::RowContext;
use crate::domain::{TemporalMode, TimeIndex};
use crate::model::expr::LinearExpr;
use crate::model::snapshot::{Constraint, ConstraintFamily};

fn label(ctx: &RowContext<'_>, storage: usize, at: TimeIndex) -> String {
    format!("{},{},{}", ctx.registry.storage()[storage].id, at.day, at.step)
}

/// Charge and discharge flows feeding the state at `at`.
///
/// In continuous state mode `at.day` is a calendar day; the flows are those
/// of the representative day that calendar day maps to under the selected
/// retrofit scenario.
fn state_flows(ctx: &RowContext<'_>, storage: usize, at: TimeIndex) -> (LinearExpr, LinearExpr) {
    let time = ctx.registry.time();
    if time.mode() != TemporalMode::ContinuousState {
        return (
            ctx.vars.charge_at(storage, at).into(),
            ctx.vars.discharge_at(storage, at).into(),
        );
    }
    let mut charge = LinearExpr::new();
    let mut discharge = LinearExpr::new();
    for r in 0..ctx.registry.scenarios().len() {
        let Some(day) = time.representative_day(r, at.day) else {
            continue;
        };
        charge += ctx.products.charge[storage][[r, day, at.step]];
        discharge += ctx.products.discharge[storage][[r, day, at.step]];
    }
    (charge, discharge)
}

/// State of charge follows decay, charging and discharging from its predecessor
pub fn storage_balance(ctx: &RowContext<'_>, storage: usize, at: TimeIndex) -> Constraint {
    let unit = &ctx.registry.storage()[storage];
    let previous = ctx.registry.time().predecessor(at);
    let (charge, discharge) = state_flows(ctx, storage, at);
    Constraint::equal(
        ConstraintFamily::StorageBalance,
        label(ctx, storage, at),
        ctx.vars.soc_at(storage, at),
        (1.0 - unit.standing_loss) * ctx.vars.soc_at(storage, previous)
            + unit.charge_efficiency * charge
            - (1.0 / unit.discharge_efficiency) * discharge,
    )
}

pub fn charge_rate(ctx: &RowContext<'_>, storage: usize, at: TimeIndex) -> Constraint {
    let unit = &ctx.registry.storage()[storage];
    Constraint::leq(
        ConstraintFamily::StorageChargeRate,
        label(ctx, storage, at),
        ctx.vars.charge_at(storage, at),
        unit.max_charge_rate * ctx.vars.storage_capacity[storage],
    )
}

pub fn discharge_rate(ctx: &RowContext<'_>, storage: usize, at: TimeIndex) -> Constraint {
    let unit = &ctx.registry.storage()[storage];
    Constraint::leq(
        ConstraintFamily::StorageDischargeRate,
        label(ctx, storage, at),
        ctx.vars.discharge_at(storage, at),
        unit.max_discharge_rate * ctx.vars.storage_capacity[storage],
    )
}

pub fn state_limit(ctx: &RowContext<'_>, storage: usize, at: TimeIndex) -> Constraint {
    Constraint::leq(
        ConstraintFamily::StorageStateLimit,
        label(ctx, storage, at),
        ctx.vars.soc_at(storage, at),
        ctx.vars.storage_capacity[storage],
    )
}

pub fn installation_gate(ctx: &RowContext<'_>, storage: usize) -> Constraint {
    Constraint::leq(
        ConstraintFamily::InstallationGate,
        ctx.registry.storage()[storage].id.clone(),
        ctx.vars.storage_capacity[storage],
        ctx.bounds.storage_capacity[storage] * ctx.vars.storage_installed[storage],
    )
}

pub fn minimum_installation(ctx: &RowContext<'_>, storage: usize) -> Option<Constraint> {
    let minimum = ctx.min_installable_capacity;
    (minimum > 0.0).then(|| {
        Constraint::geq(
            ConstraintFamily::MinimumInstallation,
            ctx.registry.storage()[storage].id.clone(),
            ctx.vars.storage_capacity[storage],
            minimum * ctx.vars.storage_installed[storage],
        )
    })
}

/// Charging and discharging in the same step are mutually exclusive
pub fn exclusive_charging(ctx: &RowContext<'_>, storage: usize, at: TimeIndex) -> Option<[Constraint; 2]> {
    let charging = ctx.vars.charging_at(storage, at)?;
    let charge_m = ctx.bounds.storage_charge[storage];
    let discharge_m = ctx.bounds.storage_discharge[storage];
    Some([
        Constraint::leq(
            ConstraintFamily::ExclusiveCharging,
            label(ctx, storage, at),
            ctx.vars.charge_at(storage, at),
            charge_m * charging,
        ),
        Constraint::leq(
            ConstraintFamily::ExclusiveCharging,
            label(ctx, storage, at),
            ctx.vars.discharge_at(storage, at) + discharge_m * charging,
            discharge_m,
        ),
    ])
}

pub fn rows(ctx: &RowContext<'_>) -> Vec<Constraint> {
    let time = ctx.registry.time();
    let mut rows = Vec::new();
    for s in 0..ctx.registry.storage().len() {
        rows.push(installation_gate(ctx, s));
        rows.extend(minimum_installation(ctx, s));
        for at in time.state_indices() {
            rows.push(storage_balance(ctx, s, at));
            rows.push(state_limit(ctx, s, at));
        }
        for at in time.indices() {
            rows.push(charge_rate(ctx, s, at));
            rows.push(discharge_rate(ctx, s, at));
            if let Some(pair) = exclusive_charging(ctx, s, at) {
                rows.extend(pair);
            }
        }
    }
    rows
}
