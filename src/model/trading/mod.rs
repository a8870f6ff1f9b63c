//! Market trading simulation framework.

pub mod actor;
pub mod agent;
pub mod exchange;
pub mod market;

pub use actor::{Actor, InflationPump, PortfolioPolicy, Producer};
pub use agent::{Account, Agent};
pub use exchange::Exchange;
pub use market::Market;

use crate::domain::model::{Prices, Trade};
use crate::utils::error::Result;
use std::fmt;

/// Somewhere agents place orders: a single market, an exchange or a reserve.
/// Displaying a venue shows its open order books.
pub trait Venue: fmt::Display {
    fn currency(&self) -> &str;
    fn price(&self, security: &str) -> Prices;
    fn open(&self, agent: &str) -> Vec<Trade>;
    fn close(&mut self, agent: &str, security: Option<&str>);
    fn enter(&mut self, order: Trade, update: bool) -> Result<()>;
    fn execute(&mut self, now: f64) -> Vec<Trade>;
}

impl<V: Venue + ?Sized> Venue for Box<V> {
    fn currency(&self) -> &str {
        (**self).currency()
    }

    fn price(&self, security: &str) -> Prices {
        (**self).price(security)
    }

    fn open(&self, agent: &str) -> Vec<Trade> {
        (**self).open(agent)
    }

    fn close(&mut self, agent: &str, security: Option<&str>) {
        (**self).close(agent, security)
    }

    fn enter(&mut self, order: Trade, update: bool) -> Result<()> {
        (**self).enter(order, update)
    }

    fn execute(&mut self, now: f64) -> Vec<Trade> {
        (**self).execute(now)
    }
}

/// A lone market answers for whatever security is asked of it.
impl Venue for Market {
    fn currency(&self) -> &str {
        &self.currency
    }

    fn price(&self, _security: &str) -> Prices {
        Market::price(self)
    }

    fn open(&self, agent: &str) -> Vec<Trade> {
        Market::open(self, Some(agent)).cloned().collect()
    }

    fn close(&mut self, agent: &str, _security: Option<&str>) {
        Market::close(self, agent)
    }

    fn enter(&mut self, order: Trade, update: bool) -> Result<()> {
        Market::enter(self, order, update);
        Ok(())
    }

    fn execute(&mut self, now: f64) -> Vec<Trade> {
        Market::execute(self, now)
    }
}
