pub mod clock;
pub mod components;
pub mod config;
pub mod engine;
pub mod geometry;
pub mod grid;
pub mod migration;
pub mod population;
pub mod roads;
pub mod satisfaction;
pub mod scenario;
pub mod rng;
pub mod snapshot;
pub mod systems;
pub mod world;

pub use engine::{Engine, EngineBuilder, EngineSettings};
pub use scenario::{Scenario, ScenarioLoader};
pub use world::World;
