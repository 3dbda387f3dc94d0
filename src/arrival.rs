use std::collections::BTreeMap;

use rand::Rng;
use tracing::debug;

use crate::model::entity::{Arrival, Attr, Probability};
use crate::model::scenario::{ConfigError, ConditionalProbability, Scenario};

struct Sampler {
    attr: Attr,
    base: Probability,
    /// First `(given, probability)` listed for this attribute, if any.
    conditional: Option<(Attr, Probability)>,
}

impl Sampler {
    /// `given` is always sampled before this attribute; a false `given` falls back to the base.
    fn effective_probability(&self, sampled: &BTreeMap<Attr, bool>) -> Probability {
        match &self.conditional {
            Some((given, probability)) if sampled.get(given).copied().unwrap_or(false) => *probability,
            _ => self.base,
        }
    }
}

/// Draws one arrival per call from a validated scenario.
pub struct ArrivalGenerator {
    samplers: Vec<Sampler>,
}

impl ArrivalGenerator {
    pub fn new(scenario: &Scenario) -> Result<ArrivalGenerator, ConfigError> {
        scenario.validate()?;
        let samplers = scenario
            .sampling_order()?
            .into_iter()
            .map(|attr| {
                let conditional = scenario
                    .conditional_probabilities
                    .iter()
                    .find(|cond| cond.dependent == attr)
                    .map(|ConditionalProbability { given, probability, .. }| (given.clone(), *probability));
                let base = scenario.attribute_probabilities[&attr];
                Sampler { attr, base, conditional }
            })
            .collect::<Vec<_>>();
        debug!(
            scenario = %scenario.name,
            order = ?samplers.iter().map(|s| s.attr.as_str()).collect::<Vec<_>>(),
            "arrival generator ready"
        );
        Ok(ArrivalGenerator { samplers })
    }

    /// Attribute names in sampling order.
    pub fn order(&self) -> impl Iterator<Item = &str> {
        self.samplers.iter().map(|s| s.attr.as_str())
    }

    pub fn generate<R: Rng>(&self, rng: &mut R) -> Arrival {
        let mut attributes = BTreeMap::new();
        for sampler in &self.samplers {
            let probability = sampler.effective_probability(&attributes);
            let value = rng.gen::<f64>() < probability;
            attributes.insert(sampler.attr.clone(), value);
        }
        Arrival::new(attributes)
    }
}
