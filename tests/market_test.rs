use holofuel::domain::model::Trade;
use holofuel::model::near;
use holofuel::model::trading::{Account, Market};

fn agents_of(trades: &[Trade]) -> Vec<&str> {
    trades.iter().map(|t| t.agent.as_str()).collect()
}

#[test]
fn test_market_simple() {
    let mut m = Market::new("grain", None);
    m.sell("agent A", 250.0, Some(4.00), 1.0);
    m.buy("agent B", 500.0, Some(4.10), 2.0);
    m.sell("agent C", 200.0, Some(4.00), 2.0);
    m.sell("agent D", 200.0, Some(4.01), 3.0);
    m.sell("agent E", 100.0, Some(4.10), 5.0);
    m.buy("agent F", 10.0, Some(3.99), 6.0);

    assert_eq!(m.selling().len(), 4);
    assert!(near(4.00, m.selling()[0].price.unwrap()));
    assert_eq!(m.buying().len(), 2);
    assert!(near(4.10, m.buying().last().unwrap().price.unwrap()));

    let trades = m.execute(6.0);
    assert_eq!(trades.len(), 6);
    for order in &trades {
        match order.agent.as_str() {
            "agent A" | "agent C" => assert!(near(4.10, order.price.unwrap())),
            "agent D" => assert!(near(4.01, order.price.unwrap())),
            "agent B" => assert!(order.amount > 0.0),
            other => panic!("unexpected agent in trade: {}", other),
        }
    }

    assert_eq!(m.buying().len(), 1);
    assert_eq!(m.buying()[0].agent, "agent F");
    assert_eq!(m.buying()[0].amount, 10.0);
    assert_eq!(m.selling().len(), 2);
    assert_eq!(m.selling()[0].agent, "agent D");
    assert_eq!(m.selling()[0].amount, -150.0);
    assert_eq!(m.selling()[1].agent, "agent E");
    assert_eq!(m.selling()[1].amount, -100.0);

    // A market-price buy takes the best ask.
    m.buy("agent G", 20.0, None, 7.0);
    let trades = m.execute(7.0);
    assert_eq!(agents_of(&trades), ["agent G", "agent D"]);
    for order in &trades {
        assert!(near(4.01, order.price.unwrap()));
        assert!(near(20.0, order.amount.abs()));
    }

    // A market-price sell takes the best bid.
    m.sell("agent H", 2.0, None, 8.0);
    let trades = m.execute(8.0);
    assert_eq!(agents_of(&trades), ["agent F", "agent H"]);
    for order in &trades {
        assert!(near(3.99, order.price.unwrap()));
        assert!(near(2.0, order.amount.abs()));
    }

    // Both at market: the older buyer pays the lowest price on offer to buyers.
    m.buy("agent I", 3.0, None, 9.0);
    m.sell("agent J", 3.0, None, 10.0);
    let trades = m.execute(10.0);
    assert_eq!(agents_of(&trades), ["agent I", "agent J"]);
    for order in &trades {
        assert!(near(3.99, order.price.unwrap()));
        assert!(near(3.0, order.amount.abs()));
    }

    // Both at market: the older seller gets the best ask.
    m.sell("agent K", 3.0, None, 11.0);
    m.buy("agent L", 3.0, None, 12.0);
    let trades = m.execute(12.0);
    assert_eq!(agents_of(&trades), ["agent L", "agent K"]);
    for order in &trades {
        assert!(near(4.01, order.price.unwrap()));
        assert!(near(3.0, order.amount.abs()));
    }

    assert_eq!(m.transactions(), 7);
    assert_eq!(m.last().unwrap().agent, "agent L");
}

fn traders() -> (Account, Account) {
    let mut a = Account::new("a").with_currency("USD");
    a.set_balance(1000.0).unwrap();
    let b = Account::new("b").with_assets([("grain", 100.0)]);
    (a, b)
}

fn settle(trades: &[Trade], a: &mut Account, b: &mut Account) {
    for trade in trades {
        match trade.agent.as_str() {
            "a" => a.record(trade, None),
            "b" => b.record(trade, None),
            other => panic!("unexpected agent in trade: {}", other),
        }
    }
}

#[test]
fn test_simultaneous_seller_sets_price() {
    let (mut a, mut b) = traders();
    let mut m = Market::new("grain", None);
    m.sell("b", 100.0, Some(10.0), 1.0);
    m.buy("a", 90.0, Some(11.0), 1.0);
    let trades = m.execute(1.0);
    settle(&trades, &mut a, &mut b);

    // The buyer was not earlier, so pays its own limit.
    assert!(near(10.0, a.balance()));
    assert!(near(990.0, b.balance()));
    assert_eq!(b.currency.as_deref(), Some("USD"));
    assert_eq!(a.holds("grain"), 90.0);
    assert_eq!(b.holds("grain"), 10.0);
    assert_eq!(m.selling()[0].amount, -10.0);
}

#[test]
fn test_earlier_buyer_gets_ask() {
    let (mut a, mut b) = traders();
    let mut m = Market::new("grain", None);
    m.sell("b", 100.0, Some(10.0), 1.0);
    m.buy("a", 90.0, Some(11.0), 0.0);
    let trades = m.execute(1.0);
    settle(&trades, &mut a, &mut b);

    assert!(near(100.0, a.balance()));
    assert!(near(900.0, b.balance()));
    assert_eq!(a.holds("grain"), 90.0);
    assert_eq!(b.holds("grain"), 10.0);
    assert_eq!(a.trades.len(), 1);
    assert_eq!(b.trades.len(), 1);
}
