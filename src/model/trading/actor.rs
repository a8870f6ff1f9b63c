use super::agent::{Account, Agent};
use super::Venue;
use crate::domain::model::{Need, Trade};
use crate::model::credit::InflationIndex;
use crate::model::{cmp_f64, nan_first, near, scale, DAY};
use crate::utils::error::{HoloFuelError, Result};
use rand::Rng;
use std::collections::BTreeMap;

/// A hook run after an actor has covered its needs and its balance.
pub trait PortfolioPolicy {
    fn fix_portfolio(&mut self, actor: &Actor, venue: &mut dyn Venue) -> Result<()>;
}

/// An actor produces and requires certain amounts of commodities per time
/// period, and trades to meet those needs.
///
/// Each need has a deadline and a cycle. As a deadline approaches, the
/// actor bids ever closer to (and then above) the market price. When its
/// committed purchases exceed what its balance allows, it sells excess
/// holdings at market to raise capital.
pub struct Actor {
    pub account: Account,
    /// Base holdings to keep, per security; expired needs are added here.
    pub target: BTreeMap<String, f64>,
    pub needs: Vec<Need>,
    pub minimum: f64,
    portfolio: Option<Box<dyn PortfolioPolicy>>,
}

impl Actor {
    /// An actor running once a day, from a random time within the first day.
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            account: Account::new(identity).with_schedule(None, DAY),
            target: BTreeMap::new(),
            needs: Vec::new(),
            minimum: 0.0,
            portfolio: None,
        }
    }

    pub fn with_schedule(mut self, start: Option<f64>, quanta: f64) -> Self {
        self.account = self.account.with_schedule(start, quanta);
        self
    }

    pub fn with_balance(mut self, currency: impl Into<String>, balance: f64) -> Self {
        let currency = currency.into();
        self.account.balances.insert(currency.clone(), balance);
        self.account.currency = Some(currency);
        self
    }

    pub fn with_assets<I, S>(mut self, assets: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        self.account = self.account.with_assets(assets);
        self
    }

    pub fn with_target<I, S>(mut self, target: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        self.target
            .extend(target.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    pub fn with_needs(mut self, needs: Vec<Need>) -> Self {
        self.needs = needs;
        self
    }

    pub fn with_minimum(mut self, minimum: f64) -> Self {
        self.minimum = minimum;
        self
    }

    pub fn with_portfolio(mut self, policy: Box<dyn PortfolioPolicy>) -> Self {
        self.portfolio = Some(policy);
        self
    }

    fn now(&self) -> f64 {
        self.account.now.unwrap_or(self.account.start)
    }

    /// Work through needs by priority, then deadline.
    ///
    /// An expired need adds its amount to the target and is rescheduled one
    /// cycle on; a need without a deadline is first scheduled from now. For
    /// each need still short, bid from ~10% under to ~5% over the best of
    /// bid, ask and last, depending on how much of the cycle has elapsed.
    pub fn acquire_needs(&mut self, venue: &mut dyn Venue) -> Result<()> {
        let now = self.now();
        self.needs.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then(cmp_f64(nan_first(a.deadline), nan_first(b.deadline)))
                .then_with(|| a.security.cmp(&b.security))
        });

        for idx in 0..self.needs.len() {
            let need = &mut self.needs[idx];
            let deadline = match need.deadline {
                Some(deadline) if now < deadline => deadline,
                expired => {
                    if expired.is_some() {
                        let target = self.target.entry(need.security.clone()).or_insert(0.0);
                        *target += need.amount;
                        tracing::info!(
                            "{} increased target for {} to {:7.2}",
                            self.account.identity,
                            need.security,
                            *target
                        );
                    }
                    let next = expired.unwrap_or(now) + need.cycle;
                    need.deadline = Some(next);
                    next
                }
            };
            let need = self.needs[idx].clone();

            let wants = self.target.get(&need.security).copied().unwrap_or(0.0);
            let holds = self.account.holds(&need.security);
            let short = need.amount + wants - holds;
            if short <= 0.0 {
                tracing::info!(
                    "{} has full target {:5} of {}: {:5}/{:5}",
                    self.account.identity,
                    need.amount,
                    need.security,
                    holds,
                    wants
                );
                venue.close(&self.account.identity, Some(&need.security));
                continue;
            }

            let proportion = 1.0 - (deadline - now) / need.cycle;
            let factor = scale(proportion, (0.0, 1.0), (0.90, 1.05), false, 1.0)?;
            let price = venue.price(&need.security).best();
            let offer = factor * price;
            tracing::info!(
                "{:>15} needs {} {}; bidding ${:7.4} ({:7.4} of ${:7.4} price)",
                self.account.identity,
                short,
                need.security,
                offer,
                factor,
                if price != 0.0 { price } else { f64::NAN }
            );
            let order = Trade::new(
                &need.security,
                Some(offer),
                venue.currency(),
                now,
                short,
                &self.account.identity,
            );
            venue.enter(order, true)?;
        }
        Ok(())
    }

    /// Sell something if open orders commit more than the balance allows.
    pub fn cover_balance(&mut self, venue: &mut dyn Venue) -> Result<()> {
        let mut value = 0.0;
        let mut buying = Vec::new();
        for order in venue.open(&self.account.identity) {
            value += order.amount * order.price_or_zero();
            if order.amount > 0.0 {
                buying.push(order.security);
            }
        }
        let balance = self.account.balance();
        if balance - value < self.minimum {
            self.raise_capital(self.minimum - balance + value, venue, &buying)?;
        }
        Ok(())
    }

    /// Value of holdings beyond target, per security, skipping `exclude` and
    /// anything without a current market price.
    pub fn check_holdings(&self, venue: &dyn Venue, exclude: &[String]) -> BTreeMap<String, f64> {
        let mut excess = BTreeMap::new();
        for (security, held) in &self.account.assets {
            if exclude.contains(security) {
                continue;
            }
            let price = venue.price(security).best();
            if near(price, 0.0) {
                continue;
            }
            let target = self.target.get(security).copied().unwrap_or(0.0);
            excess.insert(security.clone(), price * (held - target));
        }
        excess
    }

    /// Raise `value` by selling, at market, the holdings with the greatest excess value.
    pub fn raise_capital(&mut self, value: f64, venue: &mut dyn Venue, exclude: &[String]) -> Result<()> {
        tracing::warn!(
            "{} wants to raise an additional ${:7.2}; presently has ${:7.2}",
            self.account.identity,
            value,
            self.account.balance()
        );
        let mut value = value;
        let mut excess: Vec<(String, f64)> = self.check_holdings(venue, exclude).into_iter().collect();
        excess.sort_by(|a, b| cmp_f64(b.1, a.1));

        let now = self.now();
        for (security, worth) in excess {
            let overage = self.account.holds(&security) - self.target.get(&security).copied().unwrap_or(0.0);
            if overage <= 0.0 || worth <= 0.0 {
                continue;
            }
            // We can only guess at units; the sale price is not known yet.
            let amount = ((value / worth).floor() + 1.0).min(overage);
            let estimate = amount * worth / overage;
            tracing::debug!(
                "{} sells {} of {} excess {} (worth ~{:7.2}) for about {:7.2}",
                self.account.identity,
                amount,
                overage,
                security,
                worth,
                estimate
            );
            let order = Trade::new(&security, None, venue.currency(), now, -amount, &self.account.identity);
            venue.enter(order, true)?;
            value -= estimate;
            if value <= 0.0 {
                break;
            }
        }
        Ok(())
    }

    fn fix_portfolio(&mut self, venue: &mut dyn Venue) -> Result<()> {
        if let Some(mut policy) = self.portfolio.take() {
            let result = policy.fix_portfolio(self, venue);
            self.portfolio = Some(policy);
            result?;
        }
        Ok(())
    }
}

impl Agent for Actor {
    fn account(&self) -> &Account {
        &self.account
    }

    fn run(&mut self, venue: &mut dyn Venue, now: f64) -> Result<bool> {
        if !self.account.should_run(now) {
            return Ok(false);
        }
        self.acquire_needs(venue)?;
        self.cover_balance(venue)?;
        self.fix_portfolio(venue)?;
        Ok(true)
    }

    fn record(&mut self, trade: &Trade) {
        self.account.record(trade, None);
    }
}

/// Leans against inflation: sells a little of every priced holding while
/// the currency is inflated, buys while it is deflated, and trusts the
/// credit system to do the rest.
#[derive(Debug, Clone)]
pub struct InflationPump {
    index: InflationIndex,
    amount: f64,
}

impl InflationPump {
    pub fn new(index: InflationIndex) -> Self {
        Self { index, amount: 1.0 }
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = amount;
        self
    }
}

impl PortfolioPolicy for InflationPump {
    fn fix_portfolio(&mut self, actor: &Actor, venue: &mut dyn Venue) -> Result<()> {
        let inflation = self.index.get();
        tracing::debug!("{}: inflation == {:7.2}", actor.account.identity, inflation);

        let mut holdings: Vec<(String, f64)> = actor.check_holdings(venue, &[]).into_iter().collect();
        holdings.sort_by(|a, b| cmp_f64(a.1, b.1));
        let amount = if inflation < 1.0 { self.amount } else { -self.amount };
        for (security, _) in holdings {
            let order = Trade::new(
                &security,
                None,
                venue.currency(),
                actor.now(),
                amount,
                &actor.account.identity,
            );
            venue.enter(order, true)?;
        }
        Ok(())
    }
}

/// An actor that also harvests a random amount of one security, within
/// `output`, every `cycle`.
pub struct Producer {
    pub actor: Actor,
    pub security: String,
    pub cycle: f64,
    pub output: (f64, f64),
    pub harvested: f64,
}

impl Producer {
    pub fn new(actor: Actor, security: impl Into<String>, cycle: f64, output: (f64, f64), now: f64) -> Result<Self> {
        if !(cycle > 0.0) {
            return Err(HoloFuelError::SimulationError {
                message: format!("production cycle must be positive, not {}", cycle),
            });
        }
        Ok(Self {
            actor,
            security: security.into(),
            cycle,
            output: (output.0.min(output.1), output.0.max(output.1)),
            harvested: now,
        })
    }

    fn harvest(&mut self, currency: &str) {
        let Some(now) = self.actor.account.now else {
            return;
        };
        let mut rng = rand::rng();
        while now >= self.harvested + self.cycle {
            self.harvested += self.cycle;
            let produced = rng.random_range(self.output.0..=self.output.1);
            let comment = format!("harvests {} {}", produced, self.security);
            let crop = Trade::new(
                &self.security,
                Some(0.0),
                currency,
                self.harvested,
                produced,
                &self.actor.account.identity,
            );
            self.actor.account.record(&crop, Some(&comment));
        }
    }
}

impl Agent for Producer {
    fn account(&self) -> &Account {
        &self.actor.account
    }

    fn run(&mut self, venue: &mut dyn Venue, now: f64) -> Result<bool> {
        let ran = self.actor.run(venue, now)?;
        let currency = venue.currency().to_string();
        self.harvest(&currency);
        Ok(ran)
    }

    fn record(&mut self, trade: &Trade) {
        self.actor.record(trade);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::trading::Market;

    #[test]
    fn test_producer_harvests_each_cycle() {
        let actor = Actor::new("farmer").with_schedule(Some(0.0), 0.0);
        let mut farmer = Producer::new(actor, "grain", 10.0, (10.0, 5.0), 0.0).unwrap();
        assert_eq!(farmer.output, (5.0, 10.0));

        let mut market = Market::new("grain", None);
        assert!(farmer.run(&mut market, 25.0).unwrap());
        assert_eq!(farmer.harvested, 20.0);
        let account = farmer.account();
        assert_eq!(account.trades.len(), 2);
        assert!((10.0..=20.0).contains(&account.holds("grain")));
        assert_eq!(account.balance(), 0.0);
        assert_eq!(account.currency.as_deref(), Some("USD"));

        assert!(Producer::new(Actor::new("idle"), "grain", 0.0, (1.0, 2.0), 0.0).is_err());
    }

    #[test]
    fn test_expired_need_raises_target() {
        let mut actor = Actor::new("baker")
            .with_schedule(Some(0.0), 0.0)
            .with_balance("USD", 100.0)
            .with_needs(vec![Need::new(0, Some(0.0), "grain", 10.0, 3.0)]);
        let mut market = Market::new("grain", None);
        market.sell("farmer", 50.0, Some(2.0), 0.0);

        assert!(actor.run(&mut market, 0.0).unwrap());
        assert_eq!(actor.target.get("grain"), Some(&3.0));
        assert_eq!(actor.needs[0].deadline, Some(10.0));
        // Fresh in its cycle, the bid is 10% under the ask.
        let bid = market.price().bid.unwrap();
        assert_eq!(bid.amount, 6.0);
        assert!(near(bid.price.unwrap(), 1.8));
        assert!(market.execute(0.0).is_empty());
    }
}
