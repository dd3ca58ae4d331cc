//! Pandemia Simulation Engine
//!
//! Platform-agnostic core logic for the Pandemia epidemic simulator: a
//! synthetic-population contact-graph builder and a stochastic daily
//! epidemic state machine, driven over independent Monte Carlo runs.
//! This crate carries no UI or I/O beyond structured logging; reporting
//! consumes the statistics arrays it produces.

pub mod config;
pub mod epidemic;
pub mod grid;
pub mod health;
pub mod population;
pub mod sim;
pub mod stats;

// Re-export commonly used types
pub use config::{
    AgeBracket, AgeRanges, AgeRateTable, ConfigError, CounterRange, CounterRanges,
    EnvironmentConfig, RunConfig, ShoppingSchedule, VirusConfig,
};
pub use epidemic::EpidemicStateMachine;
pub use grid::{Block, Position, staircase_walk, two_nearest};
pub use health::{HealthRecord, HealthState, InfectionProfile, draw_infection_profile};
pub use population::{
    ContactGraph, HouseId, IndividualId, StoreId, WorkplaceId, assign_blocks, assign_households,
    assign_stores, assign_workplaces, derive_commute_blocks, derive_transport_contacts, draw_ages,
    mark_adults,
};
pub use sim::Simulation;
pub use stats::{BatchSeries, BatchSummary, DayStats, RunSeries};
