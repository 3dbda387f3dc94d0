use std::collections::BTreeMap;

use rand::rngs::SmallRng;
use rand::SeedableRng;

use venue_admission::simulation::Step;
use venue_admission::{
    run_seeded, AdmissionPolicy, Arrival, ArrivalGenerator, ConditionalProbability, Greedy, Scenario,
    Simulation, ThresholdScore, VenueState,
};

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

struct RejectAll;

impl AdmissionPolicy for RejectAll {
    fn decide(&self, _: &Arrival, _: &VenueState) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "RejectAll"
    }
}

#[test]
fn greedy_fills_venue_when_everyone_qualifies() {
    let scenario = single_attr(10, 5, 0.5, 1.0);
    let result = run_seeded(&scenario, &Greedy, 1).unwrap();
    assert_eq!(result.admissions, 10);
    assert_eq!(result.rejections, 0);
    assert!(result.constraints_met);
    assert_eq!(result.venue_state["a"], 1.0);
}

#[test]
fn impossible_constraint_exhausts_rejection_budget() {
    let scenario = single_attr(10, 5, 0.9, 0.0);

    let result = run_seeded(&scenario, &RejectAll, 1).unwrap();
    assert_eq!(result.rejections, 5);
    assert_eq!(result.admissions, 0);
    assert!(!result.constraints_met);
    assert_eq!(result.venue_state["a"], 0.0);

    // Greedy lets the first arrival in before it has anything to measure.
    let result = run_seeded(&scenario, &Greedy, 1).unwrap();
    assert_eq!(result.rejections, 5);
    assert_eq!(result.admissions, 1);
    assert!(!result.constraints_met);
}

#[test]
fn zero_threshold_admits_anyone_with_a_useful_attribute() {
    let scenario = single_attr(20, 5, 0.5, 1.0);
    let result = run_seeded(&scenario, &ThresholdScore::new(0.0, 0.0), 3).unwrap();
    assert_eq!(result.admissions, 20);
    assert_eq!(result.rejections, 0);
    assert!(result.constraints_met);
}

#[test]
fn draws_match_decisions() {
    let scenario = Scenario::classic_berlin_night();
    let mut sim = Simulation::new(&scenario, &Greedy, SmallRng::seed_from_u64(5)).unwrap();
    let mut drawn = 0;
    while sim.step().unwrap() != Step::Done {
        drawn += 1;
    }
    assert_eq!(drawn, sim.venue().get_admitted_count() + sim.rejections());
    assert!(drawn <= scenario.venue_capacity + scenario.rejection_limit);
}

#[test]
fn classic_night_terminates_with_both_policies() {
    let scenario = Scenario::classic_berlin_night();
    for policy in [&Greedy as &dyn AdmissionPolicy, &ThresholdScore::default()] {
        let result = run_seeded(&scenario, policy, 2024).unwrap();
        assert!(result.admissions == scenario.venue_capacity || result.rejections == scenario.rejection_limit);
        assert!(result.arrivals() <= scenario.venue_capacity + scenario.rejection_limit);
        assert_eq!(result.venue_state.len(), 2);
        if result.constraints_met {
            assert_eq!(result.admissions, scenario.venue_capacity);
        }
    }
}

#[test]
fn same_seed_same_night() {
    let scenario = Scenario::classic_berlin_night();
    let first = run_seeded(&scenario, &ThresholdScore::default(), 77).unwrap();
    let second = run_seeded(&scenario, &ThresholdScore::default(), 77).unwrap();
    assert_eq!(first, second);
}

#[test]
fn shipped_scenario_matches_builtin() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/scenarios/classic_berlin_night.json");
    assert_eq!(Scenario::from_json_file(path).unwrap(), Scenario::classic_berlin_night());
}

#[test]
fn conditional_probability_converges() {
    let scenario = Scenario {
        name: "correlated".to_string(),
        venue_capacity: 1,
        rejection_limit: 1,
        constraints: BTreeMap::new(),
        attribute_probabilities: BTreeMap::from([
            ("regular".to_string(), 0.2),
            ("all_black".to_string(), 0.7),
        ]),
        conditional_probabilities: vec![ConditionalProbability::new("all_black", "regular", 0.9)],
    };
    let generator = ArrivalGenerator::new(&scenario).unwrap();
    let mut rng = SmallRng::seed_from_u64(2718);

    let (mut regulars, mut regular_black, mut others, mut other_black) = (0u32, 0u32, 0u32, 0u32);
    for _ in 0..50_000 {
        let arrival = generator.generate(&mut rng);
        if arrival.has("regular") {
            regulars += 1;
            regular_black += arrival.has("all_black") as u32;
        } else {
            others += 1;
            other_black += arrival.has("all_black") as u32;
        }
    }
    let given_regular = regular_black as f64 / regulars as f64;
    let given_other = other_black as f64 / others as f64;
    assert!((given_regular - 0.9).abs() < 0.02, "P(all_black | regular) = {given_regular}");
    assert!((given_other - 0.7).abs() < 0.02, "P(all_black | !regular) = {given_other}");
    assert!((regulars as f64 / 50_000.0 - 0.2).abs() < 0.02);
}
