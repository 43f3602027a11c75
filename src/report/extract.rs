use std::collections::BTreeMap;

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::domain::DomainRegistry;
use crate::model::{HubModel, ObjectiveBreakdown};
use crate::solver::Assignments;

/// Installed size of one technology
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstalledUnit {
    pub technology: String,
    pub installed: bool,
    pub capacity: f64,
}

/// Hourly operation, each table indexed `[day, step]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationSchedule {
    pub imports: BTreeMap<String, Array2<f64>>,
    pub exports: BTreeMap<String, Array2<f64>>,
    pub conversion_input: BTreeMap<String, Array2<f64>>,
    pub self_consumption: BTreeMap<String, Array2<f64>>,
    pub charge: BTreeMap<String, Array2<f64>>,
    pub discharge: BTreeMap<String, Array2<f64>>,
    /// Indexed by storage-state day, which is the calendar day in continuous state mode
    pub state_of_charge: BTreeMap<String, Array2<f64>>,
}

/// Design and operation read back from one solution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignReport {
    pub objectives: ObjectiveBreakdown,
    pub conversion: Vec<InstalledUnit>,
    pub storage: Vec<InstalledUnit>,
    /// Selected retrofit scenario, when scenarios were supplied
    pub retrofit: Option<String>,
    pub certificates: Option<f64>,
    pub schedule: OperationSchedule,
}

const BINARY_THRESHOLD: f64 = 0.5;

impl DesignReport {
    pub fn extract(registry: &DomainRegistry, model: &HubModel, assignments: &Assignments) -> Self {
        let vars = &model.variables;
        let value = |v| assignments.value(v);

        let conversion = registry
            .conversion()
            .iter()
            .enumerate()
            .map(|(k, tech)| InstalledUnit {
                technology: tech.id.clone(),
                installed: value(vars.conversion_installed[k]) > BINARY_THRESHOLD,
                capacity: value(vars.conversion_capacity[k]),
            })
            .collect();
        let storage = registry
            .storage()
            .iter()
            .enumerate()
            .map(|(s, unit)| InstalledUnit {
                technology: unit.id.clone(),
                installed: value(vars.storage_installed[s]) > BINARY_THRESHOLD,
                capacity: value(vars.storage_capacity[s]),
            })
            .collect();

        let retrofit = if registry.has_retrofit_options() {
            vars.retrofit
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| value(**a).total_cmp(&value(**b)))
                .map(|(r, _)| registry.scenarios()[r].id.clone())
        } else {
            None
        };

        let carrier_id = |c: &usize| registry.carriers()[*c].id.clone();
        let mut schedule = OperationSchedule::default();
        for (c, table) in &vars.import {
            schedule.imports.insert(carrier_id(c), table.mapv(value));
        }
        for (c, table) in &vars.export {
            schedule.exports.insert(carrier_id(c), table.mapv(value));
        }
        for (k, tech) in registry.conversion().iter().enumerate() {
            let flows = vars.conversion_flow.index_axis(Axis(0), k).mapv(value);
            schedule.conversion_input.insert(tech.id.clone(), flows);
        }
        for (k, table) in &vars.self_consumption {
            schedule
                .self_consumption
                .insert(registry.conversion()[*k].id.clone(), table.mapv(value));
        }
        for (s, unit) in registry.storage().iter().enumerate() {
            schedule
                .charge
                .insert(unit.id.clone(), vars.charge.index_axis(Axis(0), s).mapv(value));
            schedule
                .discharge
                .insert(unit.id.clone(), vars.discharge.index_axis(Axis(0), s).mapv(value));
            schedule.state_of_charge.insert(
                unit.id.clone(),
                vars.state_of_charge.index_axis(Axis(0), s).mapv(value),
            );
        }

        Self {
            objectives: model.objectives.evaluate(assignments.as_slice()),
            conversion,
            storage,
            retrofit,
            certificates: vars.certificates.map(value),
            schedule,
        }
    }

    pub fn total_cost(&self) -> f64 {
        self.objectives.total_cost
    }

    pub fn total_carbon(&self) -> f64 {
        self.objectives.total_carbon
    }

    pub fn conversion_unit(&self, technology: &str) -> Option<&InstalledUnit> {
        self.conversion.iter().find(|u| u.technology == technology)
    }

    pub fn storage_unit(&self, technology: &str) -> Option<&InstalledUnit> {
        self.storage.iter().find(|u| u.technology == technology)
    }
}
