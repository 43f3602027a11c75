//! Row generation, one module per constraint family group
//!
//! Every generator is a pure function of the registry, the variable space
//! and the retrofit products; [`generate`] assembles the complete set.

pub mod balance;
pub mod conversion;
pub mod retrofit;
pub mod storage;

use super::bounds::ModelBounds;
use super::linearize::RetrofitProducts;
use super::snapshot::Constraint;
use super::variables::VariableSpace;
use crate::domain::DomainRegistry;

/// Read-only inputs shared by all generators
#[derive(Clone, Copy)]
pub struct RowContext<'a> {
    pub registry: &'a DomainRegistry,
    pub vars: &'a VariableSpace,
    pub products: &'a RetrofitProducts,
    pub bounds: &'a ModelBounds,
    pub min_installable_capacity: f64,
}

pub fn generate(ctx: &RowContext<'_>) -> Vec<Constraint> {
    let mut rows = Vec::new();
    rows.extend(balance::rows(ctx));
    rows.extend(conversion::rows(ctx));
    rows.extend(storage::rows(ctx));
    rows.extend(retrofit::rows(ctx));
    rows
}
