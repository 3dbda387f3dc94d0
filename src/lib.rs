use thiserror::Error;

pub mod arrival;
pub mod model;
pub mod policy;
pub mod simulation;
pub mod venue;

pub use arrival::ArrivalGenerator;
pub use model::entity::{Arrival, Attr};
pub use model::outcome::{Evaluation, SimulationResult};
pub use model::scenario::{ConditionalProbability, ConfigError, Scenario};
pub use policy::{AdmissionPolicy, Greedy, PolicyConfig, ThresholdScore};
pub use simulation::{evaluate, run_seeded, run_simulation, Simulation};
pub use venue::{VenueError, VenueState};

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid scenario: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Venue(#[from] VenueError),
    #[error("failed to read scenario: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse scenario: {0}")]
    Json(#[from] serde_json::Error),
}
