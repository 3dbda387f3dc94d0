use std::collections::BTreeMap;
use std::fmt;

use itertools::Itertools;
use thiserror::Error;

use crate::model::entity::{Arrival, Attr, Probability};
use crate::model::scenario::{check_unit, ConfigError};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum VenueError {
    #[error("venue is already at capacity ({capacity})")]
    Capacity { capacity: usize },
    #[error("arrival carries no value for constrained attribute `{attribute}`")]
    InvalidArrival { attribute: Attr },
}

/// Running count of admitted arrivals holding each constrained attribute.
#[derive(Debug, Clone, PartialEq)]
struct AttrCounter(BTreeMap<Attr, usize>);

impl AttrCounter {
    fn zeroed<'a>(attrs: impl Iterator<Item = &'a Attr>) -> AttrCounter {
        AttrCounter(attrs.map(|attr| (attr.clone(), 0)).collect())
    }

    fn record(&mut self, arrival: &Arrival) {
        self.0
            .iter_mut()
            .filter(|(attr, _)| arrival.has(attr))
            .for_each(|(_, count)| *count += 1);
    }
}

/// The venue during one run. Only counts are kept, never the admitted arrivals.
#[derive(Debug, Clone)]
pub struct VenueState {
    capacity: usize,
    constraints: BTreeMap<Attr, Probability>,
    admitted: usize,
    satisfied: AttrCounter,
}

impl VenueState {
    pub fn new(capacity: usize, constraints: BTreeMap<Attr, Probability>) -> Result<VenueState, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        for (attr, required) in &constraints {
            check_unit("required proportion", attr, *required)?;
        }
        let satisfied = AttrCounter::zeroed(constraints.keys());
        Ok(VenueState { capacity, constraints, admitted: 0, satisfied })
    }

    pub fn admit(&mut self, arrival: &Arrival) -> Result<(), VenueError> {
        if self.is_full() {
            return Err(VenueError::Capacity { capacity: self.capacity });
        }
        if let Some(attribute) = self.constraints.keys().find(|attr| arrival.get(attr).is_none()) {
            return Err(VenueError::InvalidArrival { attribute: attribute.clone() });
        }
        self.satisfied.record(arrival);
        self.admitted += 1;
        Ok(())
    }

    pub fn is_full(&self) -> bool {
        self.admitted >= self.capacity
    }

    pub fn get_admitted_count(&self) -> usize {
        self.admitted
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn constraints(&self) -> &BTreeMap<Attr, Probability> {
        &self.constraints
    }

    /// Admitted share of capacity, `1.0` or more once full.
    pub fn fullness(&self) -> f64 {
        self.admitted as f64 / self.capacity as f64
    }

    /// Proportion per constrained attribute; all zeros while empty.
    pub fn get_current_proportions(&self) -> BTreeMap<Attr, Probability> {
        self.satisfied
            .0
            .iter()
            .map(|(attr, count)| {
                let proportion = if self.admitted == 0 { 0.0 } else { *count as f64 / self.admitted as f64 };
                (attr.clone(), proportion)
            })
            .collect()
    }

    /// `required - current` per constrained attribute. Negative means slack.
    pub fn needs(&self) -> BTreeMap<Attr, f64> {
        let current = self.get_current_proportions();
        self.constraints
            .iter()
            .map(|(attr, required)| (attr.clone(), required - current[attr]))
            .collect()
    }

    pub fn check_constraints_met(&self) -> bool {
        if !self.is_full() {
            return false;
        }
        let current = self.get_current_proportions();
        self.constraints.iter().all(|(attr, required)| current[attr] >= *required)
    }
}

impl fmt::Display for VenueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Venue(admitted={}/{}, state={{{}}})",
            self.admitted,
            self.capacity,
            self.get_current_proportions()
                .iter()
                .map(|(attr, proportion)| format!("{attr}: {proportion:.3}"))
                .join(", ")
        )
    }
}
