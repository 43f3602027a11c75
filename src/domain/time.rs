//! Time structure of the model
//!
//! Three temporal modes share one operational grid of `days x steps`:
//! - **Typical days**: a few representative days, each weighted by how many
//!   calendar days it stands for; storage wraps within each day
//! - **Full horizon**: all 365 days with unit weight; storage chains across days
//! - **Continuous state**: representative days for operation, but storage state
//!   runs over the 365 calendar days through a calendar-to-typical-day map

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{HubError, HubResult};

pub const CALENDAR_DAYS: usize = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TemporalMode {
    TypicalDays,
    FullHorizon,
    ContinuousState,
}

/// How storage state of charge links to the previous step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageRecurrence {
    /// First step of a day follows the last step of the same day
    WrapWithinDay,
    /// First step of a day follows the last step of the previous day; day 0 follows the last day
    ChainAcrossDays,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeIndex {
    pub day: usize,
    pub step: usize,
}

impl TimeIndex {
    pub fn new(day: usize, step: usize) -> Self {
        Self { day, step }
    }
}

/// Time description as supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeInput {
    pub mode: TemporalMode,
    pub days: usize,
    pub steps: usize,
    /// `[scenario, day]` count of calendar days each day represents
    #[serde(default)]
    pub replication: Option<Array2<f64>>,
    /// `[scenario, calendar_day]` index of the representative day
    #[serde(default)]
    pub calendar: Option<Array2<usize>>,
}

impl TimeInput {
    pub fn typical_days(days: usize, steps: usize) -> Self {
        Self {
            mode: TemporalMode::TypicalDays,
            days,
            steps,
            replication: None,
            calendar: None,
        }
    }

    pub fn full_horizon(steps: usize) -> Self {
        Self {
            mode: TemporalMode::FullHorizon,
            days: CALENDAR_DAYS,
            steps,
            replication: None,
            calendar: None,
        }
    }

    pub fn continuous_state(days: usize, steps: usize, calendar: Array2<usize>) -> Self {
        Self {
            mode: TemporalMode::ContinuousState,
            days,
            steps,
            replication: None,
            calendar: Some(calendar),
        }
    }

    pub fn with_replication(mut self, replication: Array2<f64>) -> Self {
        self.replication = Some(replication);
        self
    }
}

/// Validated time structure for a given number of retrofit scenarios
#[derive(Debug, Clone)]
pub struct TimeGrid {
    mode: TemporalMode,
    days: usize,
    steps: usize,
    weights: Array2<f64>,
    calendar: Option<Array2<usize>>,
}

impl TimeGrid {
    pub fn build(input: &TimeInput, scenarios: usize) -> HubResult<Self> {
        if input.days == 0 || input.steps == 0 {
            return Err(HubError::invalid("time grid needs at least one day and one step"));
        }

        let weights = match (input.mode, &input.replication) {
            (TemporalMode::FullHorizon, _) => {
                if input.days != CALENDAR_DAYS {
                    return Err(HubError::invalid(format!(
                        "full horizon needs {CALENDAR_DAYS} days, got {}",
                        input.days
                    )));
                }
                if let Some(r) = &input.replication {
                    if r.iter().any(|w| *w != 1.0) {
                        return Err(HubError::invalid(
                            "full horizon days must each represent exactly one calendar day",
                        ));
                    }
                }
                Array2::ones((scenarios, input.days))
            }
            (_, Some(r)) => {
                if r.dim() != (scenarios, input.days) {
                    return Err(HubError::invalid(format!(
                        "replication: expected shape {:?} (scenario, day), got {:?}",
                        (scenarios, input.days),
                        r.dim()
                    )));
                }
                if r.iter().any(|w| !w.is_finite() || *w < 0.0) {
                    return Err(HubError::invalid("replication weights must be non-negative"));
                }
                r.clone()
            }
            (_, None) => Array2::ones((scenarios, input.days)),
        };

        let calendar = match input.mode {
            TemporalMode::ContinuousState => {
                let calendar = input.calendar.as_ref().ok_or_else(|| {
                    HubError::invalid("continuous state mode needs a calendar-to-typical-day map")
                })?;
                if calendar.dim() != (scenarios, CALENDAR_DAYS) {
                    return Err(HubError::invalid(format!(
                        "calendar: expected shape {:?} (scenario, calendar day), got {:?}",
                        (scenarios, CALENDAR_DAYS),
                        calendar.dim()
                    )));
                }
                if let Some(bad) = calendar.iter().find(|d| **d >= input.days) {
                    return Err(HubError::invalid(format!(
                        "calendar maps to day {bad}, but only {} days exist",
                        input.days
                    )));
                }
                Some(calendar.clone())
            }
            _ => None,
        };

        Ok(Self {
            mode: input.mode,
            days: input.days,
            steps: input.steps,
            weights,
            calendar,
        })
    }

    pub fn mode(&self) -> TemporalMode {
        self.mode
    }

    pub fn days(&self) -> usize {
        self.days
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.days, self.steps)
    }

    /// All operational (day, step) pairs in order
    pub fn indices(&self) -> impl Iterator<Item = TimeIndex> + '_ {
        (0..self.days).flat_map(move |day| (0..self.steps).map(move |step| TimeIndex { day, step }))
    }

    pub fn weight(&self, scenario: usize, day: usize) -> f64 {
        self.weights[[scenario, day]]
    }

    /// Number of days over which storage state is tracked
    pub fn state_days(&self) -> usize {
        match self.mode {
            TemporalMode::ContinuousState => CALENDAR_DAYS,
            _ => self.days,
        }
    }

    /// All storage-state (day, step) pairs in order
    pub fn state_indices(&self) -> impl Iterator<Item = TimeIndex> + '_ {
        (0..self.state_days())
            .flat_map(move |day| (0..self.steps).map(move |step| TimeIndex { day, step }))
    }

    /// Representative day for a calendar day in continuous state mode
    pub fn representative_day(&self, scenario: usize, calendar_day: usize) -> Option<usize> {
        self.calendar.as_ref().map(|c| c[[scenario, calendar_day]])
    }

    pub fn recurrence(&self) -> StorageRecurrence {
        match self.mode {
            TemporalMode::TypicalDays => StorageRecurrence::WrapWithinDay,
            TemporalMode::FullHorizon | TemporalMode::ContinuousState => {
                StorageRecurrence::ChainAcrossDays
            }
        }
    }

    /// State index that precedes `index` under this grid's recurrence
    pub fn predecessor(&self, index: TimeIndex) -> TimeIndex {
        if index.step > 0 {
            return TimeIndex::new(index.day, index.step - 1);
        }
        let last = self.steps - 1;
        match self.recurrence() {
            StorageRecurrence::WrapWithinDay => TimeIndex::new(index.day, last),
            StorageRecurrence::ChainAcrossDays => {
                let n = self.state_days();
                TimeIndex::new((index.day + n - 1) % n, last)
            }
        }
    }
}
