use crate::model::non_value;
use serde::{Deserialize, Serialize};

/// An order, or an executed trade. A positive amount buys, a negative one
/// sells. An absent (or NaN) price is a market-price order; executed trades
/// always carry their price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub security: String,
    pub price: Option<f64>,
    pub currency: String,
    pub time: f64,
    pub amount: f64,
    pub agent: String,
}

impl Trade {
    pub fn new(
        security: impl Into<String>,
        price: Option<f64>,
        currency: impl Into<String>,
        time: f64,
        amount: f64,
        agent: impl Into<String>,
    ) -> Self {
        Self {
            security: security.into(),
            price,
            currency: currency.into(),
            time,
            amount,
            agent: agent.into(),
        }
    }

    pub fn is_buy(&self) -> bool {
        self.amount >= 0.0
    }

    pub fn is_market_price(&self) -> bool {
        non_value(self.price)
    }

    /// The price, or 0 for market-price orders.
    pub fn price_or_zero(&self) -> f64 {
        match self.price {
            Some(p) if !p.is_nan() => p,
            _ => 0.0,
        }
    }
}

/// The current spread of a market: best bid, best ask and the last trade.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Prices {
    pub bid: Option<Trade>,
    pub ask: Option<Trade>,
    pub last: Option<Trade>,
}

impl Prices {
    /// Greatest of bid, ask and last prices; 0 when there is no market.
    pub fn best(&self) -> f64 {
        [&self.bid, &self.ask, &self.last]
            .into_iter()
            .map(|t| t.as_ref().map(Trade::price_or_zero).unwrap_or(0.0))
            .fold(0.0, f64::max)
    }
}

/// An actor's recurring requirement for some amount of a security.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Need {
    pub priority: i32,
    /// Computed from the first run's time when absent.
    pub deadline: Option<f64>,
    pub security: String,
    pub cycle: f64,
    pub amount: f64,
}

impl Need {
    pub fn new(priority: i32, deadline: Option<f64>, security: impl Into<String>, cycle: f64, amount: f64) -> Self {
        Self {
            priority,
            deadline,
            security: security.into(),
            cycle,
            amount,
        }
    }
}
