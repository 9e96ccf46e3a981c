//! Island simulation engine.
//!
//! This crate implements the grid of terrain cells where herbivores and
//! carnivores feed, breed, migrate, age and die, one year at a time.

pub mod animal;
pub mod cell;
pub mod island;
pub mod simulation;

pub use animal::Animal;
pub use cell::{Cell, FeedingOutcome};
pub use island::{Island, YearReport};
pub use simulation::Simulation;
