use holofuel::core::{Engine, SteppedWorld};
use holofuel::domain::model::Trade;
use holofuel::model::credit::{Basket, CreditController, CreditSystem};
use holofuel::model::near;
use holofuel::model::reserve::{Issuance, Reserve, Tranche};
use holofuel::model::trading::{Account, Actor, Agent, InflationPump, Venue};
use holofuel::Result;

/// Places one order on its first run, then sits still.
struct OneShot {
    account: Account,
    amount: f64,
    price: Option<f64>,
}

impl OneShot {
    fn new(identity: &str, start: f64, amount: f64, price: Option<f64>) -> Box<dyn Agent> {
        Box::new(Self {
            account: Account::new(identity).with_schedule(Some(start), f64::INFINITY),
            amount,
            price,
        })
    }
}

impl Agent for OneShot {
    fn account(&self) -> &Account {
        &self.account
    }

    fn run(&mut self, venue: &mut dyn Venue, now: f64) -> Result<bool> {
        if !self.account.should_run(now) {
            return Ok(false);
        }
        let order = Trade::new(
            "HoloFuel",
            self.price,
            venue.currency(),
            now,
            self.amount,
            &self.account.identity,
        );
        venue.enter(order, true)?;
        Ok(true)
    }

    fn record(&mut self, trade: &Trade) {
        self.account.record(trade, None);
    }
}

#[test]
fn test_issue_then_retire_through_reserve() {
    let issuance = Issuance {
        book_value: 0.001,
        ..Issuance::new(500.0)
    };
    let reserve = Reserve::new("HoloFuel/USD", None, [(0.0005, 1000.0)], 0.0)
        .unwrap()
        .with_issuance(issuance);
    let agents = vec![
        OneShot::new("issuer", 0.0, 200.0, Some(0.001)),
        OneShot::new("retirer", 1.0, -300.0, None),
    ];
    let world = SteppedWorld::new(0.0, Some(3.0), 1.0).unwrap();
    let mut engine = Engine::new(world, reserve, agents);

    let report = engine.run().unwrap();
    assert_eq!(report.periods, 3);
    assert_eq!(report.trades.len(), 4);

    let issuer = engine.agent("issuer").unwrap().account();
    assert_eq!(issuer.holds("HoloFuel"), 200.0);
    assert!(near(issuer.balance(), -0.2));
    let retirer = engine.agent("retirer").unwrap().account();
    assert_eq!(retirer.holds("HoloFuel"), -300.0);
    assert!(near(retirer.balance(), 0.15));

    // Issued fuel became a new tranche; retired fuel came out of the old one.
    let reserve = &engine.venue;
    assert_eq!(
        reserve.reserves(),
        &[
            Tranche {
                price: 0.0005,
                amount: 700.0
            },
            Tranche {
                price: 0.001,
                amount: 200.0
            },
        ]
    );
    assert_eq!(reserve.total(), 900.0);
    assert_eq!(reserve.account.holds("HoloFuel"), 100.0);
    assert!(near(reserve.account.balance(), 0.05));

    // Only the old tranche is bid; the rest of the period's supply is asked.
    let prices = Venue::price(reserve, "HoloFuel");
    let bid = prices.bid.unwrap();
    assert_eq!((bid.price, bid.amount), (Some(0.0005), 700.0));
    let ask = prices.ask.unwrap();
    assert_eq!((ask.price, ask.amount), (Some(0.001), -600.0));
    assert_eq!(reserve.open("issuer").len(), 0);
}

fn basket(items: &[(&str, f64)]) -> Basket {
    items.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

#[test]
fn test_inflation_pump_trades_with_reserve() {
    let credit = CreditSystem::new(
        1.0,
        basket(&[("cpu", 1.0), ("ram", 4.0)]),
        basket(&[("cpu", 20.0), ("ram", 20.0)]),
    );
    let mut control = CreditController::new(credit, None, 100.0, None, 0.0).unwrap();
    let index = control.index();
    control.price_feedback(120.0, 0.0, false).unwrap();
    assert!(near(index.get(), 1.2));

    let hodler = Actor::new("hodler")
        .with_schedule(Some(0.0), 0.0)
        .with_balance("USD", 0.0)
        .with_assets([("HoloFuel", 100.0)])
        .with_portfolio(Box::new(InflationPump::new(index.clone()).with_amount(10.0)));
    let reserve = Reserve::new("HoloFuel/USD", None, [(0.0005, 1000.0)], 0.0).unwrap();
    let world = SteppedWorld::new(0.0, Some(3.0), 1.0).unwrap();
    let mut engine = Engine::new(world, reserve, vec![Box::new(hodler) as Box<dyn Agent>]);

    let report = engine.run().unwrap();
    assert_eq!(report.trades.len(), 6);
    let hodler = engine.agent("hodler").unwrap().account();
    assert_eq!(hodler.holds("HoloFuel"), 70.0);
    assert!(near(hodler.balance(), 0.015));
    assert_eq!(engine.venue.total(), 970.0);

    // Deflated: the pump bids at market, but nobody is selling.
    control.price_feedback(80.0, 3.0, false).unwrap();
    assert!(index.get() < 1.0);
    engine.world = SteppedWorld::new(3.0, Some(1.0), 1.0).unwrap();
    let report = engine.run().unwrap();
    assert_eq!(report.periods, 1);
    assert!(report.trades.is_empty());
    let open = engine.venue.open("hodler");
    assert_eq!(open.len(), 1);
    assert!(open[0].is_market_price() && open[0].amount == 10.0);
}
