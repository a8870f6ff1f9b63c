use crate::core::world::World;
use crate::domain::model::Trade;
use crate::model::trading::{Agent, Venue};
use crate::utils::error::Result;
use serde::Serialize;

/// What a simulation run produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulationReport {
    pub periods: usize,
    pub trades: Vec<Trade>,
}

/// Runs every agent, then the venue, once per period of the world's clock.
pub struct Engine<W: World, V: Venue> {
    pub world: W,
    pub venue: V,
    pub agents: Vec<Box<dyn Agent>>,
}

impl<W: World, V: Venue> Engine<W, V> {
    pub fn new(world: W, venue: V, agents: Vec<Box<dyn Agent>>) -> Self {
        Self {
            world,
            venue,
            agents,
        }
    }

    pub fn agent(&self, identity: &str) -> Option<&dyn Agent> {
        self.agents
            .iter()
            .find(|a| a.identity() == identity)
            .map(|a| a.as_ref())
    }

    /// Give every agent a chance to act each period, then let the venue
    /// match what they placed.
    pub fn run(&mut self) -> Result<SimulationReport> {
        tracing::info!("Simulating from {} with {} agents", self.world.start(), self.agents.len());
        let mut report = SimulationReport::default();
        let Self {
            world,
            venue,
            agents,
        } = self;

        for now in world.periods() {
            let mut acted = 0;
            for agent in agents.iter_mut() {
                if agent.run(&mut *venue, now)? {
                    acted += 1;
                }
            }
            let trades = venue.execute(now);
            tracing::debug!("period {}: {} agents acted, {} trades", now, acted, trades.len());
            Self::record_trades(agents, &trades);
            report.periods += 1;
            report.trades.extend(trades);
        }

        tracing::info!(
            "Simulated {} periods, {} trades",
            report.periods,
            report.trades.len()
        );
        Ok(report)
    }

    /// Deliver each executed trade to the agent it belongs to. Trades of
    /// agents not run by this engine (eg. a reserve's market maker) are
    /// booked by the venue itself.
    fn record_trades(agents: &mut [Box<dyn Agent>], trades: &[Trade]) {
        for trade in trades {
            match agents.iter_mut().find(|a| a.identity() == trade.agent) {
                Some(agent) => agent.record(trade),
                None => tracing::debug!("trade for unmanaged agent {}", trade.agent),
            }
        }
    }
}
