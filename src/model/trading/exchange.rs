use super::market::{split_name, Market};
use super::Venue;
use crate::domain::model::{Prices, Trade};
use crate::utils::error::{HoloFuelError, Result};
use std::collections::BTreeMap;
use std::fmt;

/// Any number of security markets trading in one currency.
///
/// Markets are created on demand, the first time an order for a security is
/// entered.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub name: String,
    pub currency: String,
    markets: BTreeMap<String, Market>,
}

impl Exchange {
    pub fn new(name: &str, currency: Option<&str>) -> Self {
        let (_, currency) = split_name(name, currency);
        Self {
            name: name.to_string(),
            currency,
            markets: BTreeMap::new(),
        }
    }

    pub fn market(&self, security: &str) -> Option<&Market> {
        self.markets.get(security)
    }

    pub fn markets(&self) -> impl Iterator<Item = &Market> {
        self.markets.values()
    }

    fn market_mut(&mut self, security: &str) -> &mut Market {
        let currency = self.currency.clone();
        self.markets
            .entry(security.to_string())
            .or_insert_with(|| Market::new(&format!("{}/{}", security, currency), Some(&currency)))
    }

    pub fn buy(&mut self, security: &str, agent: &str, amount: f64, price: Option<f64>, now: f64) {
        self.market_mut(security).buy(agent, amount, price, now);
    }

    pub fn sell(&mut self, security: &str, agent: &str, amount: f64, price: Option<f64>, now: f64) {
        self.market_mut(security).sell(agent, amount, price, now);
    }

    /// Enter an order. A market may only be created in the exchange's currency.
    pub fn enter(&mut self, order: Trade, update: bool) -> Result<()> {
        if !self.markets.contains_key(&order.security) && order.currency != self.currency {
            return Err(HoloFuelError::CurrencyMismatchError {
                security: order.security,
                currency: order.currency,
                expected: self.currency.clone(),
            });
        }
        self.market_mut(&order.security).enter(order, update);
        Ok(())
    }

    pub fn open(&self, agent: &str) -> Vec<Trade> {
        self.markets
            .values()
            .flat_map(|m| m.open(Some(agent)))
            .cloned()
            .collect()
    }

    /// Close the agent's orders in one market, or in all of them.
    pub fn close(&mut self, agent: &str, security: Option<&str>) {
        match security {
            Some(security) => {
                if let Some(market) = self.markets.get_mut(security) {
                    market.close(agent);
                }
            }
            None => self.markets.values_mut().for_each(|m| m.close(agent)),
        }
    }

    pub fn price(&self, security: &str) -> Prices {
        self.markets
            .get(security)
            .map(Market::price)
            .unwrap_or_default()
    }

    pub fn execute(&mut self, now: f64) -> Vec<Trade> {
        self.markets
            .values_mut()
            .flat_map(|m| m.execute(now))
            .collect()
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let books: Vec<String> = self.markets.values().map(|m| m.to_string()).collect();
        f.write_str(&books.join("\n"))
    }
}

impl Venue for Exchange {
    fn currency(&self) -> &str {
        &self.currency
    }

    fn price(&self, security: &str) -> Prices {
        Exchange::price(self, security)
    }

    fn open(&self, agent: &str) -> Vec<Trade> {
        Exchange::open(self, agent)
    }

    fn close(&mut self, agent: &str, security: Option<&str>) {
        Exchange::close(self, agent, security)
    }

    fn enter(&mut self, order: Trade, update: bool) -> Result<()> {
        Exchange::enter(self, order, update)
    }

    fn execute(&mut self, now: f64) -> Vec<Trade> {
        Exchange::execute(self, now)
    }
}
