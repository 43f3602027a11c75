use super::RowContext;
use crate::model::expr::LinearExpr;
use crate::model::snapshot::{Constraint, ConstraintFamily};

/// Exactly one retrofit scenario is selected
pub fn exclusivity(ctx: &RowContext<'_>) -> Constraint {
    let selected: LinearExpr = ctx.vars.retrofit.iter().map(|y| LinearExpr::from(*y)).sum();
    Constraint::equal(ConstraintFamily::RetrofitExclusivity, "scenarios", selected, 1.0)
}

pub fn rows(ctx: &RowContext<'_>) -> Vec<Constraint> {
    vec![exclusivity(ctx)]
}
