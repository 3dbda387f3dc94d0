pub mod entity {
    use std::collections::BTreeMap;
    use std::fmt;

    use itertools::Itertools;

    pub type Attr = String;
    pub type Probability = f64;

    /// One candidate at the door. Its attribute vector is fixed at creation.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Arrival {
        attributes: BTreeMap<Attr, bool>,
    }

    impl Arrival {
        pub fn new(attributes: BTreeMap<Attr, bool>) -> Arrival {
            Arrival { attributes }
        }

        /// `true` only if the attribute was sampled and came up true.
        pub fn has(&self, attr: &str) -> bool {
            self.attributes.get(attr).copied().unwrap_or(false)
        }

        pub fn get(&self, attr: &str) -> Option<bool> {
            self.attributes.get(attr).copied()
        }

        pub fn attributes(&self) -> &BTreeMap<Attr, bool> {
            &self.attributes
        }

        /// Attributes that came up true, in name order.
        pub fn present(&self) -> impl Iterator<Item = &str> {
            self.attributes
                .iter()
                .filter(|(_, value)| **value)
                .map(|(attr, _)| attr.as_str())
        }
    }

    impl<A: Into<Attr>> FromIterator<(A, bool)> for Arrival {
        fn from_iter<T: IntoIterator<Item = (A, bool)>>(iter: T) -> Self {
            Arrival::new(iter.into_iter().map(|(attr, value)| (attr.into(), value)).collect())
        }
    }

    impl fmt::Display for Arrival {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(
                f,
                "Arrival({})",
                self.attributes.iter().map(|(attr, value)| format!("{attr}={value}")).join(", ")
            )
        }
    }
}


pub mod scenario {
    use std::collections::{BTreeMap, BTreeSet};
    use std::path::Path;

    use serde::{Deserialize, Serialize};
    use thiserror::Error;

    use super::entity::{Attr, Probability};

    #[derive(Debug, Clone, Error, PartialEq)]
    pub enum ConfigError {
        #[error("venue capacity must be positive")]
        ZeroCapacity,
        #[error("rejection limit must be positive")]
        ZeroRejectionLimit,
        #[error("{what} for `{attr}` must lie in [0, 1], got {value}")]
        OutOfRange { what: &'static str, attr: Attr, value: f64 },
        #[error("constraint on `{0}` can never be met: attribute is never generated")]
        UnknownConstraint(Attr),
        #[error("conditional probability refers to unknown attribute `{0}`")]
        UnknownConditional(Attr),
        #[error("attribute `{0}` is conditioned on itself")]
        SelfConditioned(Attr),
        #[error("conditional probabilities form a cycle through {0:?}")]
        ConditionalCycle(Vec<Attr>),
        #[error("{name} must be a finite number, got {value}")]
        NonFiniteThreshold { name: &'static str, value: f64 },
    }

    /// `P(dependent = true | given = true)`.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct ConditionalProbability {
        pub dependent: Attr,
        pub given: Attr,
        pub probability: Probability,
    }

    impl ConditionalProbability {
        pub fn new(dependent: impl Into<Attr>, given: impl Into<Attr>, probability: Probability) -> Self {
            ConditionalProbability { dependent: dependent.into(), given: given.into(), probability }
        }
    }

    /// Static description of one night: the venue, its rules and the crowd.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Scenario {
        pub name: String,
        pub venue_capacity: usize,
        pub rejection_limit: usize,
        /// Required minimum proportion per attribute, checked once the venue is full.
        pub constraints: BTreeMap<Attr, Probability>,
        /// P(attribute = true) for an arrival.
        pub attribute_probabilities: BTreeMap<Attr, Probability>,
        /// Only the first entry listed for a dependent attribute applies.
        #[serde(default)]
        pub conditional_probabilities: Vec<ConditionalProbability>,
    }

    impl Scenario {
        pub fn from_json_str(json: &str) -> Result<Scenario, crate::Error> {
            let scenario: Scenario = serde_json::from_str(json)?;
            scenario.validate()?;
            Ok(scenario)
        }

        pub fn from_json_file(path: impl AsRef<Path>) -> Result<Scenario, crate::Error> {
            let json = std::fs::read_to_string(path)?;
            Scenario::from_json_str(&json)
        }

        pub fn validate(&self) -> Result<(), ConfigError> {
            if self.venue_capacity == 0 {
                return Err(ConfigError::ZeroCapacity);
            }
            if self.rejection_limit == 0 {
                return Err(ConfigError::ZeroRejectionLimit);
            }
            for (attr, value) in &self.attribute_probabilities {
                check_unit("probability", attr, *value)?;
            }
            for (attr, value) in &self.constraints {
                check_unit("required proportion", attr, *value)?;
                if !self.attribute_probabilities.contains_key(attr) {
                    return Err(ConfigError::UnknownConstraint(attr.clone()));
                }
            }
            for cond in &self.conditional_probabilities {
                check_unit("conditional probability", &cond.dependent, cond.probability)?;
                for attr in [&cond.dependent, &cond.given] {
                    if !self.attribute_probabilities.contains_key(attr) {
                        return Err(ConfigError::UnknownConditional(attr.clone()));
                    }
                }
                if cond.dependent == cond.given {
                    return Err(ConfigError::SelfConditioned(cond.dependent.clone()));
                }
            }
            self.sampling_order().map(|_| ())
        }

        /// Attributes in the order they are sampled: by name, except that an
        /// attribute is never sampled before any attribute it is conditioned on.
        pub fn sampling_order(&self) -> Result<Vec<Attr>, ConfigError> {
            let mut waiting_on: BTreeMap<&str, BTreeSet<&str>> = self
                .attribute_probabilities
                .keys()
                .map(|attr| (attr.as_str(), BTreeSet::new()))
                .collect();
            for cond in &self.conditional_probabilities {
                if let Some(givens) = waiting_on.get_mut(cond.dependent.as_str()) {
                    givens.insert(cond.given.as_str());
                }
            }

            let mut order = Vec::with_capacity(waiting_on.len());
            while !waiting_on.is_empty() {
                let ready = waiting_on
                    .iter()
                    .find(|(_, givens)| givens.iter().all(|given| !waiting_on.contains_key(given)))
                    .map(|(attr, _)| *attr);
                match ready {
                    Some(attr) => {
                        waiting_on.remove(attr);
                        order.push(attr.to_string());
                    }
                    None => {
                        return Err(ConfigError::ConditionalCycle(
                            waiting_on.keys().map(|attr| attr.to_string()).collect(),
                        ))
                    }
                }
            }
            Ok(order)
        }

        pub fn classic_berlin_night() -> Scenario {
            Scenario {
                name: "Classic Berlin Night".to_string(),
                venue_capacity: 1000,
                rejection_limit: 20000,
                constraints: BTreeMap::from([
                    ("local".to_string(), 0.40),
                    ("all_black".to_string(), 0.80),
                ]),
                attribute_probabilities: BTreeMap::from([
                    ("local".to_string(), 0.50),
                    ("all_black".to_string(), 0.70),
                    ("regular".to_string(), 0.20),
                ]),
                // Regulars are far more likely to wear all black.
                conditional_probabilities: vec![ConditionalProbability::new("all_black", "regular", 0.90)],
            }
        }
    }

    pub(crate) fn check_unit(what: &'static str, attr: &str, value: f64) -> Result<(), ConfigError> {
        if (0.0..=1.0).contains(&value) {
            Ok(())
        } else {
            Err(ConfigError::OutOfRange { what, attr: attr.to_string(), value })
        }
    }
}


pub mod outcome {
    use std::collections::BTreeMap;

    use serde::Serialize;

    use super::entity::{Attr, Probability};

    /// Summary of one finished night.
    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct SimulationResult {
        pub scenario: String,
        pub rejections: usize,
        pub admissions: usize,
        pub constraints_met: bool,
        /// Final proportion per constrained attribute.
        pub venue_state: BTreeMap<Attr, Probability>,
    }

    impl SimulationResult {
        pub fn arrivals(&self) -> usize {
            self.admissions + self.rejections
        }
    }

    /// Aggregate over independently seeded runs of the same policy.
    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct Evaluation {
        pub runs: usize,
        pub successes: usize,
        pub mean_admissions: f64,
        pub mean_rejections: f64,
    }

    impl Evaluation {
        pub fn from_results(results: &[SimulationResult]) -> Evaluation {
            let runs = results.len();
            let mean = |total: usize| if runs == 0 { 0.0 } else { total as f64 / runs as f64 };
            Evaluation {
                runs,
                successes: results.iter().filter(|r| r.constraints_met).count(),
                mean_admissions: mean(results.iter().map(|r| r.admissions).sum()),
                mean_rejections: mean(results.iter().map(|r| r.rejections).sum()),
            }
        }

        pub fn success_rate(&self) -> f64 {
            if self.runs == 0 {
                0.0
            } else {
                self.successes as f64 / self.runs as f64
            }
        }
    }
}
