use super::Venue;
use crate::domain::model::Trade;
use crate::utils::error::{HoloFuelError, Result};
use std::collections::BTreeMap;

/// A trading agent's books: trade history, net asset holdings and currency
/// balances, plus its run schedule.
///
/// The preferred currency is deduced from the first trade unless given.
/// Selling short and buying on margin are both allowed.
#[derive(Debug, Clone)]
pub struct Account {
    pub identity: String,
    pub currency: Option<String>,
    pub trades: Vec<Trade>,
    pub assets: BTreeMap<String, f64>,
    pub balances: BTreeMap<String, f64>,
    /// Time of the last run; `None` until the first.
    pub now: Option<f64>,
    pub dt: f64,
    pub start: f64,
    pub quanta: f64,
}

impl Account {
    /// An account that runs whenever asked, from time 0.
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            currency: None,
            trades: Vec::new(),
            assets: BTreeMap::new(),
            balances: BTreeMap::new(),
            now: None,
            dt: 0.0,
            start: 0.0,
            quanta: 0.0,
        }
    }

    /// Run at most once per `quanta`, beginning at `start`. Without a start,
    /// a random point within the first quanta is chosen so agents sharing a
    /// quanta do not all run in lockstep.
    pub fn with_schedule(mut self, start: Option<f64>, quanta: f64) -> Self {
        self.quanta = quanta;
        self.start = start.unwrap_or_else(|| quanta * rand::random::<f64>());
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn with_assets<I, S>(mut self, assets: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        self.assets
            .extend(assets.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    /// Balance in the preferred currency; 0 until one is known.
    pub fn balance(&self) -> f64 {
        self.currency
            .as_ref()
            .and_then(|c| self.balances.get(c))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn set_balance(&mut self, value: f64) -> Result<()> {
        let Some(currency) = self.currency.clone() else {
            return Err(HoloFuelError::SimulationError {
                message: format!(
                    "{}: no currency defined or deduced; cannot change balance",
                    self.identity
                ),
            });
        };
        let balance = self.balance();
        if balance != 0.0 {
            tracing::warn!(
                "{:<20} balance adjusted from {}${:9.4} to {:9.4}",
                self.identity,
                currency,
                balance,
                value
            );
        }
        self.balances.insert(currency, value);
        Ok(())
    }

    pub fn holds(&self, security: &str) -> f64 {
        self.assets.get(security).copied().unwrap_or(0.0)
    }

    /// Whether the schedule allows a run at `now`. When it does, `now` and
    /// `dt` (time since the previous run, or since start) are updated.
    pub fn should_run(&mut self, now: f64) -> bool {
        if now < self.start {
            return false;
        }
        match self.now {
            Some(last) if now - last < self.quanta => false,
            previous => {
                self.dt = now - previous.unwrap_or(self.start);
                self.now = Some(now);
                true
            }
        }
    }

    /// Book a trade: adjusts the security holding and the currency balance.
    pub fn record(&mut self, order: &Trade, comment: Option<&str>) {
        self.trades.push(order.clone());
        if self.currency.is_none() {
            self.currency = Some(order.currency.clone());
        }
        let price = order.price_or_zero();
        tracing::info!(
            "{:<20} {:<5} {:6} {:>10} @ {:>3}${:9.4}{}",
            self.identity,
            if order.amount < 0.0 { "sells" } else { "buys" },
            order.amount.abs(),
            order.security,
            order.currency,
            price,
            comment.map(|c| format!(": {}", c)).unwrap_or_default()
        );
        *self.assets.entry(order.security.clone()).or_insert(0.0) += order.amount;
        *self.balances.entry(order.currency.clone()).or_insert(0.0) += -order.amount * price;
    }

    /// Total (buy, sell) volumes over the `period` ending at `now` (default:
    /// the last run), for one security or all of them.
    pub fn volume(&self, security: Option<&str>, period: Option<f64>, now: Option<f64>) -> (f64, f64) {
        let now = now.or(self.now);
        let (mut buy, mut sell) = (0.0, 0.0);
        for order in self.trades.iter().rev() {
            if let (Some(period), Some(now)) = (period, now) {
                if order.time < now - period {
                    break;
                }
            }
            if security.is_none_or(|s| order.security == s) {
                if order.amount < 0.0 {
                    sell -= order.amount;
                } else {
                    buy += order.amount;
                }
            }
        }
        (buy, sell)
    }
}

/// Something that trades through a [`Venue`] on the simulation clock.
pub trait Agent {
    fn account(&self) -> &Account;

    fn identity(&self) -> &str {
        &self.account().identity
    }

    /// Returns whether the agent acted at `now`.
    fn run(&mut self, venue: &mut dyn Venue, now: f64) -> Result<bool>;

    fn record(&mut self, trade: &Trade);
}

/// A bare account only keeps its books.
impl Agent for Account {
    fn account(&self) -> &Account {
        self
    }

    fn run(&mut self, _venue: &mut dyn Venue, now: f64) -> Result<bool> {
        Ok(self.should_run(now))
    }

    fn record(&mut self, trade: &Trade) {
        Account::record(self, trade, None)
    }
}
