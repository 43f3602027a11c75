//! Cost and carbon objectives as named components
//!
//! Both totals are plain linear expressions over the decision variables, so
//! the report can evaluate each component on a solution without extra
//! accounting variables.

use serde::{Deserialize, Serialize};

use super::expr::{LinearExpr, VarId};
use super::linearize::RetrofitProducts;
use super::variables::VariableSpace;
use crate::domain::{DomainRegistry, Profile, TimeIndex};

/// Sum of `profile * day weight * product` over scenarios and steps
fn weighted_sum(
    registry: &DomainRegistry,
    profile: &Profile,
    product: impl Fn(usize, TimeIndex) -> Option<VarId>,
) -> LinearExpr {
    let time = registry.time();
    let mut expr = LinearExpr::new();
    for r in 0..registry.scenarios().len() {
        for at in time.indices() {
            if let Some(z) = product(r, at) {
                expr.add_term(z, profile.at(r, at.day, at.step) * time.weight(r, at.day));
            }
        }
    }
    expr
}

/// Annualised cost components
#[derive(Debug, Clone, Default)]
pub struct CostTerms {
    pub conversion_investment: LinearExpr,
    pub storage_investment: LinearExpr,
    pub retrofit_investment: LinearExpr,
    pub network_investment: LinearExpr,
    pub import_cost: LinearExpr,
    pub export_revenue: LinearExpr,
    pub certificate_cost: LinearExpr,
}

impl CostTerms {
    pub fn total(&self) -> LinearExpr {
        (self.conversion_investment.clone()
            + self.storage_investment.clone()
            + self.retrofit_investment.clone()
            + self.network_investment.clone()
            + self.import_cost.clone()
            - self.export_revenue.clone()
            + self.certificate_cost.clone())
        .compact()
    }
}

/// Annual carbon components
#[derive(Debug, Clone, Default)]
pub struct CarbonTerms {
    pub import_emissions: LinearExpr,
    pub export_credit: LinearExpr,
    pub embodied_conversion: LinearExpr,
    pub embodied_storage: LinearExpr,
    pub embodied_retrofit: LinearExpr,
    pub certificate_offset: LinearExpr,
}

impl CarbonTerms {
    pub fn total(&self) -> LinearExpr {
        (self.import_emissions.clone() - self.export_credit.clone()
            + self.embodied_conversion.clone()
            + self.embodied_storage.clone()
            + self.embodied_retrofit.clone()
            - self.certificate_offset.clone())
        .compact()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Objectives {
    pub cost: CostTerms,
    pub carbon: CarbonTerms,
}

/// Evaluated objective components of one solution
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjectiveBreakdown {
    pub conversion_investment: f64,
    pub storage_investment: f64,
    pub retrofit_investment: f64,
    pub network_investment: f64,
    pub import_cost: f64,
    pub export_revenue: f64,
    pub certificate_cost: f64,
    pub total_cost: f64,
    pub import_emissions: f64,
    pub export_credit: f64,
    pub embodied_emissions: f64,
    pub certificate_offset: f64,
    pub total_carbon: f64,
}

impl Objectives {
    pub fn assemble(
        registry: &DomainRegistry,
        vars: &VariableSpace,
        products: &RetrofitProducts,
    ) -> Self {
        let mut cost = CostTerms::default();
        let mut carbon = CarbonTerms::default();

        for (k, tech) in registry.conversion().iter().enumerate() {
            let crf = registry.crf(tech.lifetime_years);
            let installed = vars.conversion_installed[k];
            let capacity = vars.conversion_capacity[k];
            cost.conversion_investment += crf * tech.cost.fixed * installed;
            cost.conversion_investment += crf * tech.cost.linear * capacity;
            let per_year = 1.0 / tech.lifetime_years;
            carbon.embodied_conversion += per_year * tech.embodied.fixed * installed;
            carbon.embodied_conversion += per_year * tech.embodied.linear * capacity;
        }

        for (s, unit) in registry.storage().iter().enumerate() {
            let crf = registry.crf(unit.lifetime_years);
            let installed = vars.storage_installed[s];
            let capacity = vars.storage_capacity[s];
            cost.storage_investment += crf * unit.cost.fixed * installed;
            cost.storage_investment += crf * unit.cost.linear * capacity;
            let per_year = 1.0 / unit.lifetime_years;
            carbon.embodied_storage += per_year * unit.embodied.fixed * installed;
            carbon.embodied_storage += per_year * unit.embodied.linear * capacity;
        }

        for (r, scenario) in registry.scenarios().iter().enumerate() {
            let selected = vars.retrofit[r];
            cost.retrofit_investment +=
                registry.crf(scenario.lifetime_years) * scenario.investment_cost * selected;
            carbon.embodied_retrofit +=
                (scenario.embodied_emissions / scenario.lifetime_years) * selected;
        }

        if let Some(network) = registry.network() {
            cost.network_investment = LinearExpr::constant(
                registry.crf(network.lifetime_years) * network.cost_per_m * network.length_m,
            );
        }

        for (c, carrier) in registry.carriers().iter().enumerate() {
            if let Some(tariff) = &carrier.import {
                let product = |r, at| products.import_at(c, r, at);
                cost.import_cost += weighted_sum(registry, &tariff.price, product);
                carbon.import_emissions += weighted_sum(registry, &tariff.carbon_intensity, product);
            }
            if let Some(tariff) = &carrier.export {
                let product = |r, at| products.export_at(c, r, at);
                cost.export_revenue += weighted_sum(registry, &tariff.price, product);
                carbon.export_credit += weighted_sum(registry, &tariff.carbon_credit, product);
            }
        }

        if let (Some(market), Some(certificates)) = (registry.carbon_market(), vars.certificates) {
            cost.certificate_cost += market.price_per_certificate * certificates;
            carbon.certificate_offset += market.carbon_offset_per_certificate * certificates;
        }

        Self { cost, carbon }
    }

    pub fn evaluate(&self, values: &[f64]) -> ObjectiveBreakdown {
        let cost = &self.cost;
        let carbon = &self.carbon;
        ObjectiveBreakdown {
            conversion_investment: cost.conversion_investment.evaluate(values),
            storage_investment: cost.storage_investment.evaluate(values),
            retrofit_investment: cost.retrofit_investment.evaluate(values),
            network_investment: cost.network_investment.evaluate(values),
            import_cost: cost.import_cost.evaluate(values),
            export_revenue: cost.export_revenue.evaluate(values),
            certificate_cost: cost.certificate_cost.evaluate(values),
            total_cost: cost.total().evaluate(values),
            import_emissions: carbon.import_emissions.evaluate(values),
            export_credit: carbon.export_credit.evaluate(values),
            embodied_emissions: carbon.embodied_conversion.evaluate(values)
                + carbon.embodied_storage.evaluate(values)
                + carbon.embodied_retrofit.evaluate(values),
            certificate_offset: carbon.certificate_offset.evaluate(values),
            total_carbon: carbon.total().evaluate(values),
        }
    }
}
