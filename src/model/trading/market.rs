use crate::domain::model::{Prices, Trade};
use crate::model::{cmp_f64, nan_first, nan_last, near_within, AMOUNT_SIGNIFICANCE};
use std::fmt;

/// Security and currency from a `"Security/Currency"` name; currency defaults to USD.
pub(crate) fn split_name(name: &str, currency: Option<&str>) -> (String, String) {
    let (base, suffix) = match name.split_once('/') {
        Some((base, suffix)) => (base, Some(suffix)),
        None => (name, None),
    };
    let currency = currency.or(suffix).unwrap_or("USD");
    (base.to_string(), currency.to_string())
}

fn limit(order: &Trade) -> Option<f64> {
    order.price.filter(|p| !p.is_nan())
}

/// A continuous order-driven market in one security.
///
/// Both books are kept in ascending price order. Selling is consumed from
/// the front (market-price asks sort first), buying from the back
/// (market-price bids sort last). Orders at equal prices are consumed
/// oldest first.
///
/// When a buyer and seller match, the trade takes the limit price of the
/// later order; the earlier one gets the better price. A market-price order
/// takes the limit of the order it matches. If both are market-price
/// orders, the older side takes the best limit price in its own book, and
/// failing that the last traded price.
#[derive(Debug, Clone)]
pub struct Market {
    pub name: String,
    pub currency: String,
    buying: Vec<Trade>,
    selling: Vec<Trade>,
    last: Option<Trade>,
    transaction: u64,
}

impl Market {
    pub fn new(name: &str, currency: Option<&str>) -> Self {
        let (name, currency) = split_name(name, currency);
        Self {
            name,
            currency,
            buying: Vec::new(),
            selling: Vec::new(),
            last: None,
            transaction: 0,
        }
    }

    pub fn buying(&self) -> &[Trade] {
        &self.buying
    }

    /// Sell orders; their amounts are negative.
    pub fn selling(&self) -> &[Trade] {
        &self.selling
    }

    pub fn last(&self) -> Option<&Trade> {
        self.last.as_ref()
    }

    pub fn transactions(&self) -> u64 {
        self.transaction
    }

    /// All open orders, optionally only those of `agent`.
    pub fn open<'a>(&'a self, agent: Option<&'a str>) -> impl Iterator<Item = &'a Trade> + 'a {
        self.buying
            .iter()
            .chain(self.selling.iter())
            .filter(move |order| agent.is_none_or(|a| order.agent == a))
    }

    pub fn close(&mut self, agent: &str) {
        self.buying.retain(|order| order.agent != agent);
        self.selling.retain(|order| order.agent != agent);
    }

    pub fn buy(&mut self, agent: &str, amount: f64, price: Option<f64>, now: f64) {
        let order = Trade::new(&self.name, price, &self.currency, now, amount, agent);
        self.enter(order, true);
    }

    pub fn sell(&mut self, agent: &str, amount: f64, price: Option<f64>, now: f64) {
        let order = Trade::new(&self.name, price, &self.currency, now, -amount, agent);
        self.enter(order, true);
    }

    /// Enter an order; with `update`, the agent's existing orders are closed first.
    pub fn enter(&mut self, order: Trade, update: bool) {
        if update {
            self.close(&order.agent);
        }
        if order.amount >= 0.0 {
            self.buying.push(order);
            self.buying.sort_by(|a, b| {
                cmp_f64(nan_last(a.price), nan_last(b.price)).then(cmp_f64(b.time, a.time))
            });
        } else {
            self.selling.push(order);
            self.selling.sort_by(|a, b| {
                cmp_f64(nan_first(a.price), nan_first(b.price)).then(cmp_f64(a.time, b.time))
            });
        }
    }

    fn best_bid(&self) -> Option<&Trade> {
        self.buying.iter().rev().find(|order| limit(order).is_some())
    }

    fn best_ask(&self) -> Option<&Trade> {
        self.selling.iter().find(|order| limit(order).is_some())
    }

    /// Current bid, ask and last trade, ignoring market-price orders.
    pub fn price(&self) -> Prices {
        Prices {
            bid: self.best_bid().cloned(),
            ask: self.best_ask().cloned(),
            last: self.last.clone(),
        }
    }

    /// Match all crossing orders, returning a buy and a sell trade per match.
    ///
    /// The caller records each trade with its agent.
    pub fn execute(&mut self, now: f64) -> Vec<Trade> {
        let mut trades = Vec::new();
        loop {
            let (Some(buyer), Some(seller)) = (self.buying.last(), self.selling.first()) else {
                break;
            };
            let (bid, ask) = (limit(buyer), limit(seller));
            let crosses = match (bid, ask) {
                (Some(bid), Some(ask)) => ask <= bid,
                _ => true,
            };
            if !crosses {
                break;
            }

            let amount = buyer.amount.min(-seller.amount);
            let buyer_first = buyer.time < seller.time;
            let price = if buyer_first { ask.or(bid) } else { bid.or(ask) }
                .or_else(|| {
                    let best = if buyer_first { self.best_bid() } else { self.best_ask() };
                    best.and_then(limit)
                })
                .or_else(|| self.last.as_ref().and_then(limit));
            let Some(price) = price else {
                // Market orders on both sides, and nothing has ever traded.
                break;
            };

            let buy = Trade::new(&self.name, Some(price), &self.currency, now, amount, &buyer.agent);
            let sell = Trade::new(&self.name, Some(price), &self.currency, now, -amount, &seller.agent);
            tracing::info!("market {} at {:7.2}", self.name, price);
            self.transaction += 1;
            self.last = Some(buy.clone());

            // Rounding residue of a partial fill is not left on the book.
            if let Some(order) = self.buying.last_mut() {
                if near_within(amount, order.amount, AMOUNT_SIGNIFICANCE) {
                    self.buying.pop();
                } else {
                    order.amount -= amount;
                }
            }
            if let Some(order) = self.selling.first_mut() {
                if near_within(amount, -order.amount, AMOUNT_SIGNIFICANCE) {
                    self.selling.remove(0);
                } else {
                    order.amount += amount;
                }
            }
            trades.push(buy);
            trades.push(sell);
        }
        trades
    }

    /// The open books with a depth chart of `width` columns.
    pub fn format_book(&self, width: usize) -> String {
        let open: Vec<&Trade> = self.open(None).collect();
        let biggest = open.iter().map(|o| o.amount.abs()).fold(0.0, f64::max);
        open.iter()
            .map(|order| {
                let bar = if biggest > 0.0 {
                    (width as f64 * order.amount.abs() / biggest) as usize
                } else {
                    0
                };
                format!(
                    "{:<20} {:4} {:9} @ {}${:7.4} {}",
                    order.agent,
                    if order.amount > 0.0 { "buy" } else { "sell" },
                    order.amount.abs(),
                    order.currency,
                    order.price.unwrap_or(f64::NAN),
                    "*".repeat(bar)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_book(40))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("grain", None), ("grain".into(), "USD".into()));
        assert_eq!(split_name("HoloFuel/EUR", None), ("HoloFuel".into(), "EUR".into()));
        assert_eq!(split_name("HoloFuel/EUR", Some("CAD")), ("HoloFuel".into(), "CAD".into()));
    }

    #[test]
    fn test_equal_prices_consume_oldest_first() {
        let mut m = Market::new("grain", None);
        m.sell("late", 10.0, Some(4.0), 2.0);
        m.sell("early", 10.0, Some(4.0), 1.0);
        m.buy("buyer", 10.0, Some(4.0), 3.0);
        let trades = m.execute(3.0);
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[1].agent, "early");
        assert_eq!(m.selling()[0].agent, "late");
    }

    #[test]
    fn test_partial_fills_leave_no_dust() {
        let mut m = Market::new("grain", None);
        m.buy("buyer", 0.3, Some(1.0), 1.0);
        m.sell("small", 0.1, Some(1.0), 2.0);
        m.sell("large", 0.2, Some(1.0), 3.0);
        let trades = m.execute(3.0);
        assert_eq!(trades.len(), 4);
        assert!(m.buying().is_empty(), "{:?}", m.buying());
        assert!(m.selling().is_empty(), "{:?}", m.selling());
    }

    #[test]
    fn test_market_orders_without_any_price_do_not_trade() {
        let mut m = Market::new("grain", None);
        m.buy("a", 5.0, None, 1.0);
        m.sell("b", 5.0, None, 2.0);
        assert!(m.execute(2.0).is_empty());
        assert_eq!(m.buying().len(), 1);
        assert_eq!(m.selling().len(), 1);
    }

    #[test]
    fn test_update_replaces_agents_orders() {
        let mut m = Market::new("grain", None);
        m.buy("a", 5.0, Some(1.0), 1.0);
        m.sell("a", 5.0, Some(2.0), 2.0);
        assert_eq!(m.open(Some("a")).count(), 1);
        m.enter(Trade::new("grain", Some(1.5), "USD", 3.0, 1.0, "a"), false);
        assert_eq!(m.open(Some("a")).count(), 2);
        m.close("a");
        assert_eq!(m.open(None).count(), 0);
    }

    #[test]
    fn test_format_book() {
        let mut m = Market::new("grain", None);
        m.buy("agent B", 500.0, Some(4.10), 2.0);
        m.sell("agent A", 250.0, Some(4.00), 1.0);
        let book = m.format_book(10);
        let lines: Vec<&str> = book.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("agent B"));
        assert!(lines[0].contains("buy"));
        assert!(lines[0].ends_with(&"*".repeat(10)));
        assert!(lines[1].contains("sell"));
        assert!(lines[1].ends_with(&"*".repeat(5)));
        assert!(lines[1].contains("USD$ 4.0000"));
    }
}
