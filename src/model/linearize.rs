//! Exact linearization of binary-times-continuous products
//!
//! The retrofit choice multiplies demands, tariffs and solar yield, so every
//! flow that meets a scenario-indexed coefficient is multiplied by the
//! scenario binary. Each product `z = b * x` with `0 <= x <= M` becomes:
//! - `z <= x`
//! - `z <= M * b`
//! - `x - z <= M * (1 - b)`
//!
//! with `z >= 0` as a variable bound. With a single scenario the binary is
//! fixed to one and the product is the flow itself.

use std::collections::BTreeMap;

use ndarray::Array3;
use tracing::warn;

use super::expr::VarId;
use super::snapshot::{Constraint, ConstraintFamily};
use super::variables::VariableSpace;
use crate::domain::{DomainRegistry, TemporalMode, TimeIndex};
use crate::error::{HubError, HubResult};

const BOUND_TOLERANCE: f64 = 1e-9;

/// Declare `z = binary * continuous` and push its three rows.
///
/// `big_m` must be at least the declared upper bound of `continuous`.
pub fn linearize(
    space: &mut VariableSpace,
    rows: &mut Vec<Constraint>,
    label: &str,
    binary: VarId,
    continuous: VarId,
    big_m: f64,
) -> HubResult<VarId> {
    let upper = match space.spec(continuous).upper {
        Some(upper) => {
            if big_m < upper - BOUND_TOLERANCE * upper.abs().max(1.0) {
                return Err(HubError::UnsoundBigM {
                    family: ConstraintFamily::Linearization,
                    label: label.to_string(),
                    bound: big_m,
                    upper,
                });
            }
            upper.min(big_m)
        }
        None => {
            warn!(label, big_m, "linearizing an unbounded variable; big-M cannot be checked");
            big_m
        }
    };

    let product = space.add_auxiliary(format!("z[{label}]"), upper);
    rows.push(Constraint::leq(ConstraintFamily::Linearization, label, product, continuous));
    rows.push(Constraint::leq(
        ConstraintFamily::Linearization,
        label,
        product,
        big_m * binary,
    ));
    rows.push(Constraint::leq(
        ConstraintFamily::Linearization,
        label,
        continuous - product,
        big_m - big_m * binary,
    ));
    Ok(product)
}

/// Product of a flow table and the retrofit binaries.
///
/// Products over the declared bound of `flow`; a bound-less flow is an error
/// because the space declares every flow with a finite bound.
fn product_table(
    registry: &DomainRegistry,
    space: &mut VariableSpace,
    rows: &mut Vec<Constraint>,
    name: &str,
    flow: impl Fn(&VariableSpace, TimeIndex) -> VarId,
) -> HubResult<Array3<VarId>> {
    let scenarios = registry.scenarios().len();
    let (days, steps) = registry.time().shape();
    let mut table = Array3::from_elem((scenarios, days, steps), VarId(0));

    for at in registry.time().indices() {
        let x = flow(space, at);
        if scenarios == 1 {
            table[[0, at.day, at.step]] = x;
            continue;
        }
        let big_m = space
            .spec(x)
            .upper
            .ok_or_else(|| HubError::invalid(format!("flow {name} has no upper bound")))?;
        for (r, scenario) in registry.scenarios().iter().enumerate() {
            let label = format!("{name},{},{},{}", scenario.id, at.day, at.step);
            let binary = space.retrofit[r];
            table[[r, at.day, at.step]] = linearize(space, rows, &label, binary, x, big_m)?;
        }
    }
    Ok(table)
}

/// All scenario products the model needs
#[derive(Debug, Clone, Default)]
pub struct RetrofitProducts {
    /// Import times scenario, per importable carrier, `[scenario, day, step]`
    pub import: BTreeMap<usize, Array3<VarId>>,
    pub export: BTreeMap<usize, Array3<VarId>>,
    /// Solar capacity times scenario, per solar technology and scenario
    pub solar_capacity: BTreeMap<usize, Vec<VarId>>,
    /// Storage flows times scenario, continuous state mode only
    pub charge: Vec<Array3<VarId>>,
    pub discharge: Vec<Array3<VarId>>,
}

impl RetrofitProducts {
    pub fn build(
        registry: &DomainRegistry,
        space: &mut VariableSpace,
        rows: &mut Vec<Constraint>,
    ) -> HubResult<Self> {
        let mut products = Self::default();

        for (c, carrier) in registry.carriers().iter().enumerate() {
            if carrier.is_importable() {
                let name = format!("import,{}", carrier.id);
                let table = product_table(registry, space, rows, &name, |s, at| {
                    s.import[&c][[at.day, at.step]]
                })?;
                products.import.insert(c, table);
            }
            if carrier.is_exportable() {
                let name = format!("export,{}", carrier.id);
                let table = product_table(registry, space, rows, &name, |s, at| {
                    s.export[&c][[at.day, at.step]]
                })?;
                products.export.insert(c, table);
            }
        }

        for (k, tech) in registry.conversion().iter().enumerate() {
            if !tech.is_solar() {
                continue;
            }
            let capacity = space.conversion_capacity[k];
            let column = if registry.scenarios().len() == 1 {
                vec![capacity]
            } else {
                let big_m = space.spec(capacity).upper.unwrap_or(f64::INFINITY);
                let mut column = Vec::with_capacity(registry.scenarios().len());
                for (r, scenario) in registry.scenarios().iter().enumerate() {
                    let label = format!("capacity,{},{}", tech.id, scenario.id);
                    let binary = space.retrofit[r];
                    column.push(linearize(space, rows, &label, binary, capacity, big_m)?);
                }
                column
            };
            products.solar_capacity.insert(k, column);
        }

        if registry.time().mode() == TemporalMode::ContinuousState {
            for (s, unit) in registry.storage().iter().enumerate() {
                let name = format!("charge,{}", unit.id);
                products
                    .charge
                    .push(product_table(registry, space, rows, &name, |v, at| v.charge_at(s, at))?);
                let name = format!("discharge,{}", unit.id);
                products.discharge.push(product_table(registry, space, rows, &name, |v, at| {
                    v.discharge_at(s, at)
                })?);
            }
        }

        Ok(products)
    }

    pub fn import_at(&self, carrier: usize, scenario: usize, at: TimeIndex) -> Option<VarId> {
        self.import.get(&carrier).map(|t| t[[scenario, at.day, at.step]])
    }

    pub fn export_at(&self, carrier: usize, scenario: usize, at: TimeIndex) -> Option<VarId> {
        self.export.get(&carrier).map(|t| t[[scenario, at.day, at.step]])
    }

    pub fn solar_capacity(&self, tech: usize, scenario: usize) -> Option<VarId> {
        self.solar_capacity.get(&tech).map(|c| c[scenario])
    }
}
