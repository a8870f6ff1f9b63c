pub mod engine;
pub mod world;

pub use crate::domain::model::{Need, Prices, Trade};
pub use crate::domain::ports::{LedgerApi, Storage};
pub use crate::utils::error::Result;
pub use engine::{Engine, SimulationReport};
pub use world::{bounded, format_offset, RealtimeWorld, SteppedWorld, World};
