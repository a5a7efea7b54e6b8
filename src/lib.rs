pub mod colour;
pub mod disease;
pub mod engine;
pub mod pacing;
pub mod region;
pub mod registry;
pub mod rng;
pub mod scenario;
pub mod simulation;
pub mod snapshot;
pub mod web;

pub use engine::{Engine, EngineSettings};
pub use region::Region;
pub use simulation::{DiseaseRates, Simulation, SpreadTuning, StepReport, TickScale};
