use serde::{Deserialize, Serialize};

use crate::model::entity::Arrival;
use crate::model::scenario::ConfigError;
use crate::venue::VenueState;

pub type Score = f64;

pub const BASE_ATTRIBUTE_VALUE: Score = 0.01;

/// Asked once per arrival, before the venue changes. No memory between calls.
pub trait AdmissionPolicy: Send + Sync {
    fn decide(&self, arrival: &Arrival, venue: &VenueState) -> bool;

    fn name(&self) -> &'static str;
}

/// Admit whoever holds the attribute that is currently furthest behind.
///
/// Ties on the largest need go to the attribute whose name sorts first.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Greedy;

impl AdmissionPolicy for Greedy {
    fn decide(&self, arrival: &Arrival, venue: &VenueState) -> bool {
        // Nothing to go on yet.
        if venue.get_admitted_count() == 0 {
            return true;
        }
        let needs = venue.needs();
        if needs.values().all(|need| *need <= 0.0) {
            return true;
        }
        let most_needed = needs
            .iter()
            .fold(None::<(&str, f64)>, |best, (attr, need)| match best {
                Some((_, best_need)) if *need <= best_need => best,
                _ => Some((attr.as_str(), *need)),
            });
        match most_needed {
            Some((attr, _)) => arrival.has(attr),
            None => true,
        }
    }

    fn name(&self) -> &'static str {
        "Greedy"
    }
}

/// Score the arrival by how much it helps, admit if the score clears a bar
/// that rises linearly from `start_threshold` to `end_threshold` as the
/// venue fills.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdScore {
    pub start_threshold: Score,
    pub end_threshold: Score,
    pub base_attribute_value: Score,
}

impl Default for ThresholdScore {
    fn default() -> Self {
        ThresholdScore::new(0.0, 0.1)
    }
}

impl ThresholdScore {
    pub fn new(start_threshold: Score, end_threshold: Score) -> ThresholdScore {
        ThresholdScore { start_threshold, end_threshold, base_attribute_value: BASE_ATTRIBUTE_VALUE }
    }

    pub fn score(&self, arrival: &Arrival, venue: &VenueState) -> Score {
        if venue.get_admitted_count() == 0 {
            return 1.0;
        }
        let needs = venue.needs();
        arrival
            .present()
            .filter_map(|attr| needs.get(attr))
            .map(|need| need.max(0.0) + self.base_attribute_value)
            .sum()
    }

    /// Unreachable once the venue is full.
    pub fn threshold(&self, venue: &VenueState) -> Score {
        let fullness = venue.fullness();
        if fullness >= 1.0 {
            return Score::INFINITY;
        }
        self.start_threshold + (self.end_threshold - self.start_threshold) * fullness
    }
}

impl AdmissionPolicy for ThresholdScore {
    fn decide(&self, arrival: &Arrival, venue: &VenueState) -> bool {
        self.score(arrival, venue) >= self.threshold(venue)
    }

    fn name(&self) -> &'static str {
        "ThresholdScore"
    }
}

/// Serializable policy selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum PolicyConfig {
    Greedy,
    ThresholdScore {
        #[serde(default)]
        start_threshold: Score,
        #[serde(default = "default_end_threshold")]
        end_threshold: Score,
        #[serde(default = "default_base_attribute_value")]
        base_attribute_value: Score,
    },
}

fn default_end_threshold() -> Score {
    0.1
}

fn default_base_attribute_value() -> Score {
    BASE_ATTRIBUTE_VALUE
}

impl PolicyConfig {
    pub fn build(&self) -> Result<Box<dyn AdmissionPolicy>, ConfigError> {
        match self {
            PolicyConfig::Greedy => Ok(Box::new(Greedy)),
            PolicyConfig::ThresholdScore { start_threshold, end_threshold, base_attribute_value } => {
                for (name, value) in [
                    ("start_threshold", *start_threshold),
                    ("end_threshold", *end_threshold),
                    ("base_attribute_value", *base_attribute_value),
                ] {
                    if !value.is_finite() {
                        return Err(ConfigError::NonFiniteThreshold { name, value });
                    }
                }
                Ok(Box::new(ThresholdScore {
                    start_threshold: *start_threshold,
                    end_threshold: *end_threshold,
                    base_attribute_value: *base_attribute_value,
                }))
            }
        }
    }
}
