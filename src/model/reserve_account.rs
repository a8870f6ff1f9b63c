use crate::model::reserve::Tranche;
use crate::utils::error::{HoloFuelError, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Holo Fuel in each issue tranche, per unit of supply factor.
pub const TRANCHE_VOLUME: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy Fuel from the reserve (Issue).
    Buy,
    /// Sell Fuel back to the reserve (Retire).
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReserveParams {
    pub supply_factor: f64,
    pub start_price: f64,
    pub reserve_price: f64,
    pub orderbook_len: usize,
}

impl Default for ReserveParams {
    fn default() -> Self {
        Self {
            supply_factor: 1.0,
            start_price: 0.0001,
            reserve_price: 0.00005,
            orderbook_len: 5,
        }
    }
}

/// A reserve account for one currency pair.
///
/// The issue order book holds `orderbook_len` tranches of
/// `supply_factor * TRANCHE_VOLUME` Fuel, prices rising 1% per tranche from
/// the current price; the cheapest sits at the back. The reserves are a
/// LIFO of bought tranches, newest at the front.
#[derive(Debug, Clone)]
pub struct ReserveAccount {
    pub currency_pair: String,
    pub supply_factor: f64,
    pub current_price: f64,
    pub orderbook_len: usize,
    order_book: VecDeque<Tranche>,
    reserves: VecDeque<Tranche>,
}

fn invalid(field: &str, value: f64, reason: &str) -> HoloFuelError {
    HoloFuelError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

impl ReserveAccount {
    pub fn new(currency_pair: impl Into<String>, params: ReserveParams) -> Result<Self> {
        if !(params.supply_factor > 0.0) {
            return Err(invalid("supply_factor", params.supply_factor, "must be positive"));
        }
        if !(params.start_price > 0.0) {
            return Err(invalid("start_price", params.start_price, "must be positive"));
        }
        if params.orderbook_len == 0 {
            return Err(invalid("orderbook_len", 0.0, "must hold at least one tranche"));
        }
        let mut account = Self {
            currency_pair: currency_pair.into(),
            supply_factor: params.supply_factor,
            current_price: params.start_price,
            orderbook_len: params.orderbook_len,
            order_book: VecDeque::with_capacity(params.orderbook_len),
            reserves: VecDeque::new(),
        };
        account.refresh();
        account.reserves.push_front(Tranche {
            price: params.reserve_price,
            amount: account.tranche_volume(),
        });
        Ok(account)
    }

    fn tranche_volume(&self) -> f64 {
        self.supply_factor * TRANCHE_VOLUME
    }

    /// Issue tranches, most expensive first.
    pub fn order_book(&self) -> &VecDeque<Tranche> {
        &self.order_book
    }

    /// Reserve tranches, newest first.
    pub fn reserves(&self) -> &VecDeque<Tranche> {
        &self.reserves
    }

    // The order book is bounded: adding at one end drops from the other.
    fn book_push_front(&mut self, tranche: Tranche) {
        if self.order_book.len() >= self.orderbook_len {
            self.order_book.pop_back();
        }
        self.order_book.push_front(tranche);
    }

    fn book_push_back(&mut self, tranche: Tranche) {
        if self.order_book.len() >= self.orderbook_len {
            self.order_book.pop_front();
        }
        self.order_book.push_back(tranche);
    }

    /// The marginal price and the volume available at it.
    pub fn quote(&self, side: Side) -> Result<(f64, f64)> {
        let (tranche, book) = match side {
            Side::Buy => (self.order_book.back(), "issue"),
            Side::Sell => (self.reserves.front(), "reserve"),
        };
        tranche
            .map(|t| (t.price, t.amount))
            .ok_or(HoloFuelError::EmptyBookError { book })
    }

    /// Rebuild the order book from the current price with a new supply
    /// factor. A partly bought tranche keeps its place at the current
    /// price, its remainder scaled by the change in factor.
    pub fn update_supply(&mut self, supply_factor: Option<f64>) -> Result<()> {
        let old = self.supply_factor;
        if let Some(factor) = supply_factor {
            if !(factor > 0.0) {
                return Err(invalid("supply_factor", factor, "must be positive"));
            }
            self.supply_factor = factor;
        }
        let (_, current) = self.quote(Side::Buy)?;
        self.order_book.clear();
        for ii in 0..self.orderbook_len {
            let amount = if ii == 0 {
                self.supply_factor / old * current
            } else {
                self.tranche_volume()
            };
            self.book_push_front(Tranche {
                price: self.current_price * (1.0 + ii as f64 / 100.0),
                amount,
            });
        }
        Ok(())
    }

    /// Sell `volume` Fuel from the order book into the reserves, then top
    /// the order book back up above the last price paid.
    pub fn issue(&mut self, volume: f64) -> Result<()> {
        let available: f64 = self.order_book.iter().map(|t| t.amount).sum();
        if volume > available {
            return Err(HoloFuelError::InsufficientVolumeError {
                book: "issue",
                requested: volume,
                available,
            });
        }

        let mut volume = volume;
        while volume > 0.0 {
            let (price, quoted) = self.quote(Side::Buy)?;
            self.current_price = price;
            let bought = quoted.min(volume);
            let remainder = quoted - bought;
            if remainder == 0.0 {
                self.order_book.pop_back();
            } else if let Some(back) = self.order_book.back_mut() {
                back.amount = remainder;
            }

            match self.reserves.front_mut() {
                Some(front) if front.price == price => front.amount += bought,
                _ => self.reserves.push_front(Tranche { price, amount: bought }),
            }
            volume -= bought;
        }

        for ii in self.order_book.len()..self.orderbook_len {
            self.book_push_front(Tranche {
                price: self.current_price * (1.0 + ii as f64 / 100.0),
                amount: self.tranche_volume(),
            });
        }
        tracing::debug!(
            "{} issued; now {:.5} with {} reserve tranches",
            self.currency_pair,
            self.current_price,
            self.reserves.len()
        );
        Ok(())
    }

    /// Buy back `volume` Fuel from the reserves, newest tranche first,
    /// returning it to the order book at the price it is retired at.
    pub fn retire(&mut self, volume: f64) -> Result<()> {
        let available: f64 = self.reserves.iter().map(|t| t.amount).sum();
        if volume > available {
            return Err(HoloFuelError::InsufficientVolumeError {
                book: "reserve",
                requested: volume,
                available,
            });
        }

        let mut volume = volume;
        while volume > 0.0 {
            let (price, quoted) = self.quote(Side::Sell)?;
            self.current_price = price;
            let sold = quoted.min(volume);
            let remainder = quoted - sold;
            if remainder == 0.0 {
                self.reserves.pop_front();
            } else if let Some(front) = self.reserves.front_mut() {
                front.amount = remainder;
            }

            match self.order_book.back_mut() {
                Some(back) if back.price == price => back.amount += sold,
                _ => self.book_push_back(Tranche { price, amount: sold }),
            }
            volume -= sold;
        }
        Ok(())
    }

    /// A fresh order book starting at the current price.
    pub fn refresh(&mut self) {
        self.order_book.clear();
        for ii in 0..self.orderbook_len {
            self.book_push_front(Tranche {
                price: self.current_price * (1.0 + ii as f64 / 100.0),
                amount: self.tranche_volume(),
            });
        }
    }

    pub fn format_full_book(&self) -> String {
        let issue = self.order_book.iter().map(|t| {
            format!(
                "Issue: {} Fuel @ Price of {:.5} {}",
                t.amount, t.price, self.currency_pair
            )
        });
        let buy_back = self.reserves.iter().map(|t| {
            format!(
                "Buy-Back: {} Fuel @ Price of {:.5} {}",
                t.amount, t.price, self.currency_pair
            )
        });
        issue
            .chain(std::iter::once("=".repeat(47)))
            .chain(buy_back)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::near;

    fn account() -> ReserveAccount {
        ReserveAccount::new("USD", ReserveParams::default()).unwrap()
    }

    #[test]
    fn test_initial_books() {
        let account = account();
        assert_eq!(account.order_book().len(), 5);
        assert_eq!(account.quote(Side::Buy).unwrap(), (0.0001, 1.0e6));
        assert!(near(account.order_book()[0].price, 0.0001 * 1.04));
        assert_eq!(account.quote(Side::Sell).unwrap(), (0.00005, 1.0e6));
    }

    #[test]
    fn test_issue_then_retire() {
        let mut account = account();
        account.issue(1.5e6).unwrap();
        let (price, volume) = account.quote(Side::Buy).unwrap();
        assert!(near(price, 0.0001 * 1.01));
        assert_eq!(volume, 5.0e5);
        assert_eq!(account.order_book().len(), 5);
        assert!(near(account.order_book()[0].price, 0.0001 * 1.01 * 1.04));
        let (price, volume) = account.quote(Side::Sell).unwrap();
        assert!(near(price, 0.0001 * 1.01));
        assert_eq!(volume, 5.0e5);
        assert_eq!(account.reserves().len(), 3);

        account.retire(7.0e5).unwrap();
        assert_eq!(account.quote(Side::Buy).unwrap(), (0.0001, 2.0e5));
        assert_eq!(account.reserves()[0], Tranche { price: 0.0001, amount: 8.0e5 });
        // The retired tranche at 1.01 merged back; the dearest tranche fell off.
        let book = account.order_book();
        assert_eq!(book.len(), 5);
        assert_eq!(book[3].amount, 1.0e6);
        assert!(near(book[0].price, 0.0001 * 1.04));
    }

    #[test]
    fn test_insufficient_volume() {
        let mut account = account();
        assert!(matches!(
            account.issue(5.0e6 + 1.0),
            Err(HoloFuelError::InsufficientVolumeError { book: "issue", .. })
        ));
        assert!(matches!(
            account.retire(2.0e6),
            Err(HoloFuelError::InsufficientVolumeError { book: "reserve", .. })
        ));
        account.retire(1.0e6).unwrap();
        assert!(matches!(
            account.quote(Side::Sell),
            Err(HoloFuelError::EmptyBookError { book: "reserve" })
        ));
    }

    #[test]
    fn test_update_supply_scales_partial_tranche() {
        let mut account = account();
        account.issue(2.5e5).unwrap();
        account.update_supply(Some(2.0)).unwrap();
        assert_eq!(account.quote(Side::Buy).unwrap(), (0.0001, 1.5e6));
        assert_eq!(account.order_book()[0].amount, 2.0e6);
        assert!(account.update_supply(Some(0.0)).is_err());
    }

    #[test]
    fn test_format_full_book() {
        let account = ReserveAccount::new(
            "EUR",
            ReserveParams {
                orderbook_len: 2,
                ..Default::default()
            },
        )
        .unwrap();
        let book = account.format_full_book();
        let lines: Vec<&str> = book.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Issue: 1000000 Fuel @ Price of 0.00010 EUR",
                "Issue: 1000000 Fuel @ Price of 0.00010 EUR",
                "===============================================",
                "Buy-Back: 1000000 Fuel @ Price of 0.00005 EUR",
            ]
        );
    }
}
