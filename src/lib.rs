pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod model;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{Cli, Command};
pub use config::SimulationConfig;

pub use adapters::{HolofuelClient, LocalStorage, RestClient};
pub use core::{Engine, SimulationReport};
pub use utils::error::{HoloFuelError, Result};
