use crate::domain::model::{Prices, Trade};
use crate::model::trading::{Account, Market, Venue};
use crate::model::{cmp_f64, near_within, AMOUNT_SIGNIFICANCE, HOUR};
use crate::utils::error::{HoloFuelError, Result};
use std::fmt;

/// An amount of Holo Fuel the reserve will buy back, at the price it was issued at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tranche {
    pub price: f64,
    pub amount: f64,
}

/// Supply issued per period at one price: the book value times a premium.
///
/// The premium (and book value) may be computed elsewhere, eg. by a PID
/// loop equalizing flows between markets; `ratio` is the target
/// Issue/Retire ratio such a controller works toward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Issuance {
    pub available: f64,
    pub period: f64,
    pub ratio: f64,
    pub factor: f64,
    pub premium: f64,
    pub book_value: f64,
}

impl Issuance {
    pub fn new(available: f64) -> Self {
        Self {
            available,
            period: HOUR,
            ratio: 1.0,
            factor: 1.0,
            premium: 1.0,
            book_value: 1.0,
        }
    }

    pub fn price(&self) -> f64 {
        self.book_value * self.premium
    }
}

/// A Holo Fuel market with its own market-maker agent.
///
/// The reserve bids for every tranche at its original price, so other
/// agents can sell (Retire) Holo Fuel for currency; with an [`Issuance`] it
/// also asks, so they can buy (Issue) new Holo Fuel, each sale creating a
/// new tranche. Agents may still trade with each other at any price; those
/// trades neither touch the reserves nor create or destroy Holo Fuel.
#[derive(Debug, Clone)]
pub struct Reserve {
    pub market: Market,
    pub account: Account,
    /// Sorted by ascending price.
    reserves: Vec<Tranche>,
    pub issuance: Option<Issuance>,
    now: f64,
}

impl Reserve {
    /// A reserve for a `"Security/Currency"` market; the market maker's
    /// identity defaults to `"<name> Reserve"`.
    pub fn new<I>(name: &str, identity: Option<&str>, reserves: I, now: f64) -> Result<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        if name.is_empty() {
            return Err(HoloFuelError::MissingConfigError {
                field: "reserve.name".to_string(),
            });
        }
        let identity = identity
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} Reserve", name));
        let market = Market::new(name, None);
        let account = Account::new(identity).with_currency(market.currency.clone());
        let mut reserve = Self {
            market,
            account,
            reserves: Vec::new(),
            issuance: None,
            now,
        };
        for (price, amount) in reserves {
            reserve.adjust(price, amount);
        }
        reserve.rebuild(now);
        Ok(reserve)
    }

    pub fn with_issuance(mut self, issuance: Issuance) -> Self {
        self.issuance = Some(issuance);
        self.rebuild(self.now);
        self
    }

    pub fn identity(&self) -> &str {
        &self.account.identity
    }

    pub fn reserves(&self) -> &[Tranche] {
        &self.reserves
    }

    /// Total Holo Fuel held in reserve tranches.
    pub fn total(&self) -> f64 {
        self.reserves.iter().map(|t| t.amount).sum()
    }

    /// Add `amount` to the tranche at `price`, creating or emptying it as
    /// needed. A tranche is never left holding a negative amount.
    fn adjust(&mut self, price: f64, amount: f64) {
        let idx = match self.reserves.iter().position(|t| t.price == price) {
            Some(idx) => idx,
            None => {
                self.reserves.push(Tranche { price, amount: 0.0 });
                self.reserves.sort_by(|a, b| cmp_f64(a.price, b.price));
                self.reserves
                    .iter()
                    .position(|t| t.price == price)
                    .unwrap_or(0)
            }
        };
        let held = self.reserves[idx].amount;
        let left = held + amount;
        let spent = near_within(held, -amount, AMOUNT_SIGNIFICANCE);
        if left < 0.0 && !spent {
            tracing::warn!(
                "{:<20} cannot take {} Fuel from a tranche of {} @ {}${:9.4}",
                self.account.identity,
                -amount,
                held,
                self.market.currency,
                price
            );
        }
        if spent || left <= 0.0 {
            tracing::info!(
                "{:<20} emptied Reserve tranche @ {}${:9.4}",
                self.account.identity,
                self.market.currency,
                price
            );
            self.reserves.remove(idx);
        } else {
            self.reserves[idx].amount = left;
        }
    }

    fn own_orders(&self) -> Vec<Trade> {
        self.market.open(Some(self.account.identity.as_str())).cloned().collect()
    }

    /// Move the tranches by what was filled of each order in `before`, at
    /// that order's own limit: a filled bid retires Fuel from the tranche it
    /// was entered for, and a filled ask issues a tranche at the issue price.
    fn settle(&mut self, before: &[Trade]) {
        let after = self.own_orders();
        for order in before {
            let remaining = after
                .iter()
                .find(|o| o.price == order.price && o.is_buy() == order.is_buy())
                .map_or(0.0, |o| o.amount);
            let filled = order.amount - remaining;
            if filled != 0.0 {
                self.adjust(order.price_or_zero(), -filled);
            }
        }
    }

    /// Close the reserve's orders and re-enter them: a bid per tranche and,
    /// when issuing, an ask for what remains of this period's supply.
    ///
    /// Tranches at or above the issue price are not bid, so the reserve is
    /// never matched against itself.
    pub fn rebuild(&mut self, now: f64) {
        self.now = now;
        let identity = self.account.identity.clone();
        self.market.close(&identity);

        let ask = self.issuance.map(|issuance| issuance.price());
        for tranche in &self.reserves {
            if ask.is_some_and(|ask| tranche.price >= ask) {
                continue;
            }
            let bid = Trade::new(
                &self.market.name,
                Some(tranche.price),
                &self.market.currency,
                now,
                tranche.amount,
                &identity,
            );
            self.market.enter(bid, false);
        }

        if let Some(issuance) = self.issuance {
            let (buy, sell) = self.account.volume(None, Some(issuance.period), Some(now));
            let sold = sell - buy;
            let supply = issuance.available * issuance.factor;
            if sold < supply {
                let offer = Trade::new(
                    &self.market.name,
                    Some(issuance.price()),
                    &self.market.currency,
                    now,
                    -(supply - sold),
                    &identity,
                );
                self.market.enter(offer, false);
            }
        }
    }

    /// The order book, then the reserve tranches.
    pub fn format_full_book(&self, width: usize) -> String {
        let mut lines = vec![self.market.format_book(width), "=".repeat(47)];
        lines.extend(self.reserves.iter().rev().map(|t| {
            format!(
                "Reserve: {} Fuel @ Price of {:.5} {}",
                t.amount, t.price, self.market.currency
            )
        }));
        lines.join("\n")
    }
}

impl fmt::Display for Reserve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_full_book(40))
    }
}

impl Venue for Reserve {
    fn currency(&self) -> &str {
        &self.market.currency
    }

    fn price(&self, security: &str) -> Prices {
        if security == self.market.name {
            self.market.price()
        } else {
            Prices::default()
        }
    }

    fn open(&self, agent: &str) -> Vec<Trade> {
        self.market.open(Some(agent)).cloned().collect()
    }

    fn close(&mut self, agent: &str, _security: Option<&str>) {
        self.market.close(agent);
    }

    fn enter(&mut self, order: Trade, update: bool) -> Result<()> {
        if order.currency != self.market.currency {
            return Err(HoloFuelError::CurrencyMismatchError {
                security: order.security,
                currency: order.currency,
                expected: self.market.currency.clone(),
            });
        }
        if order.security != self.market.name {
            return Err(HoloFuelError::SimulationError {
                message: format!("{} does not trade {}", self.account.identity, order.security),
            });
        }
        self.market.enter(order, update);
        Ok(())
    }

    /// Match everything available, book the reserve's share, then rebuild.
    ///
    /// The account is charged what each trade settled at, while the
    /// tranches move at the reserve's own limits.
    fn execute(&mut self, now: f64) -> Vec<Trade> {
        let before = self.own_orders();
        let trades = self.market.execute(now);
        for trade in &trades {
            if trade.agent == self.account.identity {
                self.account.record(trade, None);
            }
        }
        self.settle(&before);
        self.rebuild(now);
        trades
    }
}
