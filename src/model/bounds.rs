use tracing::warn;

use crate::config::BigMConfig;
use crate::domain::DomainRegistry;

/// Finite upper bounds for every bounded variable family.
///
/// Each bound is declared on its variable and reused as the big-M constant of
/// the rows that switch that variable, so every big-M is no smaller than the
/// quantity it relaxes.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelBounds {
    pub conversion_capacity: Vec<f64>,
    /// Input flow of each conversion technology
    pub conversion_input: Vec<f64>,
    pub storage_capacity: Vec<f64>,
    pub storage_charge: Vec<f64>,
    pub storage_discharge: Vec<f64>,
    pub import: Vec<f64>,
    pub export: Vec<f64>,
    /// Number of flows that fell back to the configured bound
    pub fallbacks: usize,
}

impl ModelBounds {
    pub fn compute(registry: &DomainRegistry, config: &BigMConfig) -> Self {
        let mut fallbacks = 0;

        let conversion_capacity: Vec<f64> = (0..registry.conversion().len())
            .map(|t| {
                let roof = if registry.conversion()[t].is_solar() {
                    registry.roof_limit(t).unwrap_or(f64::INFINITY)
                } else {
                    f64::INFINITY
                };
                config.max_conversion_capacity.min(roof)
            })
            .collect();

        let peak_yield = registry.solar_yield().max().max(0.0);
        let conversion_input: Vec<f64> = registry
            .conversion()
            .iter()
            .enumerate()
            .map(|(t, tech)| {
                if tech.is_solar() {
                    return peak_yield * conversion_capacity[t];
                }
                let largest_output = (0..registry.carriers().len())
                    .map(|c| registry.factor(t, c))
                    .fold(0.0, f64::max);
                if largest_output > 0.0 {
                    conversion_capacity[t] / largest_output
                } else {
                    warn!(
                        technology = %tech.id,
                        bound = config.fallback,
                        "technology has no output factor, input flow uses the fallback bound"
                    );
                    fallbacks += 1;
                    config.fallback
                }
            })
            .collect();

        let storage_capacity: Vec<f64> = registry
            .storage()
            .iter()
            .map(|s| {
                s.max_capacity
                    .unwrap_or(f64::INFINITY)
                    .min(config.max_storage_capacity)
            })
            .collect();
        let storage_charge: Vec<f64> = registry
            .storage()
            .iter()
            .zip(&storage_capacity)
            .map(|(s, cap)| s.max_charge_rate * cap)
            .collect();
        let storage_discharge: Vec<f64> = registry
            .storage()
            .iter()
            .zip(&storage_capacity)
            .map(|(s, cap)| s.max_discharge_rate * cap)
            .collect();

        let mut import = Vec::with_capacity(registry.carriers().len());
        let mut export = Vec::with_capacity(registry.carriers().len());
        for (c, carrier) in registry.carriers().iter().enumerate() {
            let peak_demand = carrier
                .demand
                .as_ref()
                .map_or(0.0, |d| d.max() / carrier.network_efficiency);
            let mut sinks = peak_demand;
            let mut sources = 0.0;
            for (t, input) in conversion_input.iter().enumerate() {
                let factor = registry.factor(t, c);
                if factor < 0.0 {
                    sinks += -factor * input;
                } else {
                    sources += factor * input;
                }
            }
            for s in 0..registry.storage().len() {
                let coupling = registry.coupling(s, c);
                sinks += coupling * storage_charge[s];
                sources += coupling * storage_discharge[s];
            }

            let imports = match (carrier.is_importable(), carrier.is_exportable()) {
                (false, _) => 0.0,
                (true, false) => sinks,
                (true, true) => sinks + sources,
            };
            let exports = if carrier.is_exportable() {
                sources + imports
            } else {
                0.0
            };
            import.push(imports);
            export.push(exports);
        }

        Self {
            conversion_capacity,
            conversion_input,
            storage_capacity,
            storage_charge,
            storage_discharge,
            import,
            export,
            fallbacks,
        }
    }

    /// Output bound of technology `tech` on a carrier with `factor`
    pub fn conversion_output(&self, tech: usize, factor: f64) -> f64 {
        factor.max(0.0) * self.conversion_input[tech]
    }
}
