use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{info, trace, warn};

use crate::arrival::ArrivalGenerator;
use crate::model::outcome::{Evaluation, SimulationResult};
use crate::model::scenario::Scenario;
use crate::policy::AdmissionPolicy;
use crate::venue::VenueState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Admitted,
    Rejected,
    /// Nothing was drawn: the venue is full or the rejection budget is spent.
    Done,
}

/// One night at the door. Owns its venue, generator and random source.
pub struct Simulation<'a, R: Rng> {
    scenario: &'a Scenario,
    policy: &'a dyn AdmissionPolicy,
    generator: ArrivalGenerator,
    venue: VenueState,
    rng: R,
    rejections: usize,
}

impl<'a, R: Rng> Simulation<'a, R> {
    pub fn new(scenario: &'a Scenario, policy: &'a dyn AdmissionPolicy, rng: R) -> Result<Self, crate::Error> {
        let generator = ArrivalGenerator::new(scenario)?;
        let venue = VenueState::new(scenario.venue_capacity, scenario.constraints.clone())?;
        Ok(Simulation { scenario, policy, generator, venue, rng, rejections: 0 })
    }

    pub fn phase(&self) -> Phase {
        if self.venue.is_full() || self.rejections >= self.scenario.rejection_limit {
            Phase::Terminated
        } else {
            Phase::Running
        }
    }

    pub fn venue(&self) -> &VenueState {
        &self.venue
    }

    pub fn rejections(&self) -> usize {
        self.rejections
    }

    pub fn step(&mut self) -> Result<Step, crate::Error> {
        if self.phase() == Phase::Terminated {
            return Ok(Step::Done);
        }
        let arrival = self.generator.generate(&mut self.rng);
        if self.policy.decide(&arrival, &self.venue) {
            self.venue.admit(&arrival)?;
            trace!(%arrival, admitted = self.venue.get_admitted_count(), "admit");
            Ok(Step::Admitted)
        } else {
            self.rejections += 1;
            trace!(%arrival, rejections = self.rejections, "reject");
            Ok(Step::Rejected)
        }
    }

    pub fn run(mut self) -> Result<SimulationResult, crate::Error> {
        while self.step()? != Step::Done {}
        Ok(self.finish())
    }

    fn finish(self) -> SimulationResult {
        let result = SimulationResult {
            scenario: self.scenario.name.clone(),
            rejections: self.rejections,
            admissions: self.venue.get_admitted_count(),
            constraints_met: self.venue.check_constraints_met(),
            venue_state: self.venue.get_current_proportions(),
        };
        if !self.venue.is_full() {
            warn!(
                scenario = %result.scenario,
                admissions = result.admissions,
                "rejection limit reached before the venue filled"
            );
        }
        info!(
            scenario = %result.scenario,
            policy = self.policy.name(),
            admissions = result.admissions,
            rejections = result.rejections,
            constraints_met = result.constraints_met,
            "night over"
        );
        result
    }
}

pub fn run_simulation<R: Rng>(
    scenario: &Scenario,
    policy: &dyn AdmissionPolicy,
    rng: R,
) -> Result<SimulationResult, crate::Error> {
    Simulation::new(scenario, policy, rng)?.run()
}

pub fn run_seeded(scenario: &Scenario, policy: &dyn AdmissionPolicy, seed: u64) -> Result<SimulationResult, crate::Error> {
    run_simulation(scenario, policy, SmallRng::seed_from_u64(seed))
}

/// Runs `runs` independent nights; night `i` is seeded with `base_seed + i`.
pub fn evaluate(
    scenario: &Scenario,
    policy: &dyn AdmissionPolicy,
    base_seed: u64,
    runs: usize,
) -> Result<Evaluation, crate::Error> {
    let results = (0..runs as u64)
        .map(|i| run_seeded(scenario, policy, base_seed.wrapping_add(i)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Evaluation::from_results(&results))
}


#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::policy::Greedy;

    fn single_attr(capacity: usize, limit: usize, required: f64, probability: f64) -> Scenario {
        Scenario {
            name: "single".to_string(),
            venue_capacity: capacity,
            rejection_limit: limit,
            constraints: BTreeMap::from([("a".to_string(), required)]),
            attribute_probabilities: BTreeMap::from([("a".to_string(), probability)]),
            conditional_probabilities: vec![],
        }
    }

    #[test]
    fn steps_until_done() {
        let scenario = single_attr(3, 5, 0.5, 1.0);
        let mut sim = Simulation::new(&scenario, &Greedy, SmallRng::seed_from_u64(0)).unwrap();
        assert_eq!(sim.phase(), Phase::Running);
        for _ in 0..3 {
            assert_eq!(sim.step().unwrap(), Step::Admitted);
        }
        assert_eq!(sim.phase(), Phase::Terminated);
        assert_eq!(sim.step().unwrap(), Step::Done);
        assert_eq!(sim.venue().get_admitted_count(), 3);
    }

    #[test]
    fn rejection_budget_stops_the_night() {
        let scenario = single_attr(10, 4, 0.9, 0.0);
        let mut sim = Simulation::new(&scenario, &Greedy, SmallRng::seed_from_u64(0)).unwrap();
        assert_eq!(sim.step().unwrap(), Step::Admitted);
        for _ in 0..4 {
            assert_eq!(sim.step().unwrap(), Step::Rejected);
        }
        assert_eq!(sim.step().unwrap(), Step::Done);
        assert_eq!(sim.rejections(), 4);
    }

    #[test]
    fn invalid_scenario_fails_before_running() {
        let mut scenario = single_attr(10, 4, 0.9, 0.0);
        scenario.constraints.insert("ghost".to_string(), 0.1);
        assert!(run_seeded(&scenario, &Greedy, 0).is_err());
    }

    #[test]
    fn evaluation_counts_every_run() {
        let scenario = single_attr(5, 5, 0.5, 1.0);
        let eval = evaluate(&scenario, &Greedy, 9, 4).unwrap();
        assert_eq!(eval.runs, 4);
        assert_eq!(eval.successes, 4);
        assert_eq!(eval.mean_admissions, 5.0);
        assert_eq!(eval.success_rate(), 1.0);
    }
}
