use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Annualised-cost inputs: `fixed` is charged when the unit is installed,
/// `linear` per unit of installed capacity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Validate)]
pub struct InvestmentCost {
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub linear: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub fixed: f64,
}

/// Embodied emissions, amortised over the technology lifetime
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EmbodiedEmissions {
    #[serde(default)]
    pub linear: f64,
    #[serde(default)]
    pub fixed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversionKind {
    /// Freely controlled unit with an optional minimum part-load
    Dispatchable {
        #[serde(default)]
        min_part_load: f64,
    },
    /// Output fixed by irradiance times installed area
    Solar {
        /// Photovoltaic output is split between self-consumption and export
        #[serde(default)]
        photovoltaic: bool,
        /// Building whose roof hosts the panels; `None` shares the site roof
        #[serde(default)]
        building: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ConversionTechnology {
    pub id: String,
    #[serde(flatten)]
    pub kind: ConversionKind,
    /// Signed carrier factors per unit of input: positive is output, negative is input
    pub conversion_factors: BTreeMap<String, f64>,
    #[serde(default)]
    #[validate(nested)]
    pub cost: InvestmentCost,
    #[validate(range(min = 0.0))]
    pub lifetime_years: f64,
    #[serde(default)]
    pub embodied: EmbodiedEmissions,
}

impl ConversionTechnology {
    pub fn dispatchable(id: impl Into<String>, min_part_load: f64) -> Self {
        Self::new(id, ConversionKind::Dispatchable { min_part_load })
    }

    pub fn solar(id: impl Into<String>, photovoltaic: bool) -> Self {
        Self::new(
            id,
            ConversionKind::Solar {
                photovoltaic,
                building: None,
            },
        )
    }

    fn new(id: impl Into<String>, kind: ConversionKind) -> Self {
        Self {
            id: id.into(),
            kind,
            conversion_factors: BTreeMap::new(),
            cost: InvestmentCost::default(),
            lifetime_years: 20.0,
            embodied: EmbodiedEmissions::default(),
        }
    }

    pub fn with_factor(mut self, carrier: impl Into<String>, factor: f64) -> Self {
        self.conversion_factors.insert(carrier.into(), factor);
        self
    }

    pub fn with_cost(mut self, linear: f64, fixed: f64) -> Self {
        self.cost = InvestmentCost { linear, fixed };
        self
    }

    pub fn with_lifetime(mut self, years: f64) -> Self {
        self.lifetime_years = years;
        self
    }

    pub fn with_embodied(mut self, linear: f64, fixed: f64) -> Self {
        self.embodied = EmbodiedEmissions { linear, fixed };
        self
    }

    pub fn on_building(mut self, building: impl Into<String>) -> Self {
        if let ConversionKind::Solar { building: slot, .. } = &mut self.kind {
            *slot = Some(building.into());
        }
        self
    }

    pub fn is_dispatchable(&self) -> bool {
        matches!(self.kind, ConversionKind::Dispatchable { .. })
    }

    pub fn is_solar(&self) -> bool {
        matches!(self.kind, ConversionKind::Solar { .. })
    }

    pub fn is_photovoltaic(&self) -> bool {
        matches!(
            self.kind,
            ConversionKind::Solar {
                photovoltaic: true,
                ..
            }
        )
    }

    pub fn min_part_load(&self) -> f64 {
        match self.kind {
            ConversionKind::Dispatchable { min_part_load } => min_part_load,
            ConversionKind::Solar { .. } => 0.0,
        }
    }

    pub fn building(&self) -> Option<&str> {
        match &self.kind {
            ConversionKind::Solar { building, .. } => building.as_deref(),
            ConversionKind::Dispatchable { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct StorageTechnology {
    pub id: String,
    /// Carrier factors; the storage exchanges energy with every carrier it couples to
    pub coupling: BTreeMap<String, f64>,
    #[validate(range(min = 0.0, max = 1.0))]
    pub charge_efficiency: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub discharge_efficiency: f64,
    /// Fraction of stored energy lost per time step
    #[serde(default)]
    #[validate(range(min = 0.0, max = 1.0))]
    pub standing_loss: f64,
    /// Charge per step as a fraction of capacity
    #[validate(range(min = 0.0))]
    pub max_charge_rate: f64,
    #[validate(range(min = 0.0))]
    pub max_discharge_rate: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub max_capacity: Option<f64>,
    #[serde(default)]
    #[validate(nested)]
    pub cost: InvestmentCost,
    #[validate(range(min = 0.0))]
    pub lifetime_years: f64,
    #[serde(default)]
    pub embodied: EmbodiedEmissions,
}

impl StorageTechnology {
    pub fn new(id: impl Into<String>, carrier: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            coupling: BTreeMap::from([(carrier.into(), 1.0)]),
            charge_efficiency: 1.0,
            discharge_efficiency: 1.0,
            standing_loss: 0.0,
            max_charge_rate: 1.0,
            max_discharge_rate: 1.0,
            max_capacity: None,
            cost: InvestmentCost::default(),
            lifetime_years: 20.0,
            embodied: EmbodiedEmissions::default(),
        }
    }

    pub fn with_efficiencies(mut self, charge: f64, discharge: f64) -> Self {
        self.charge_efficiency = charge;
        self.discharge_efficiency = discharge;
        self
    }

    pub fn with_standing_loss(mut self, loss: f64) -> Self {
        self.standing_loss = loss;
        self
    }

    pub fn with_rates(mut self, charge: f64, discharge: f64) -> Self {
        self.max_charge_rate = charge;
        self.max_discharge_rate = discharge;
        self
    }

    pub fn with_max_capacity(mut self, capacity: f64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    pub fn with_cost(mut self, linear: f64, fixed: f64) -> Self {
        self.cost = InvestmentCost { linear, fixed };
        self
    }

    pub fn with_lifetime(mut self, years: f64) -> Self {
        self.lifetime_years = years;
        self
    }

    pub fn with_embodied(mut self, linear: f64, fixed: f64) -> Self {
        self.embodied = EmbodiedEmissions { linear, fixed };
        self
    }
}
