use crate::model::control::pid::{Controller, Kpid, Lout};
use crate::utils::error::{HoloFuelError, Result};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Amounts (or prices) per commodity.
pub type Basket = BTreeMap<String, f64>;

/// A credit system with credit factor `K` over a basket of commodities.
///
/// `k` and `prices` are the base values; [`CreditSystem::k`] and
/// [`CreditSystem::prices`] apply any [`Modulation`].
#[derive(Debug, Clone)]
pub struct CreditSystem {
    pub k: f64,
    pub basket: Basket,
    pub prices: Basket,
    pub modulation: Option<Modulation>,
}

impl CreditSystem {
    pub fn new(k: f64, basket: Basket, prices: Basket) -> Self {
        Self {
            k,
            basket,
            prices,
            modulation: None,
        }
    }

    pub fn with_modulation(mut self, modulation: Modulation) -> Self {
        self.modulation = Some(modulation);
        self
    }

    pub fn k(&self) -> f64 {
        match self.modulation {
            Some(Modulation::K(sine)) => self.k * sine.scale(),
            _ => self.k,
        }
    }

    pub fn prices(&self) -> Basket {
        match self.modulation {
            Some(Modulation::Prices(sine)) => self
                .prices
                .iter()
                .map(|(commodity, price)| (commodity.clone(), price * sine.scale()))
                .collect(),
            _ => self.prices.clone(),
        }
    }

    /// Step the modulating sine, if any.
    pub fn advance(&mut self) {
        if let Some(Modulation::K(sine) | Modulation::Prices(sine)) = self.modulation.as_mut() {
            sine.advance();
        }
    }

    /// Restore the initial conditions.
    pub fn reset(&mut self) {
        if let Some(Modulation::K(sine) | Modulation::Prices(sine)) = self.modulation.as_mut() {
            sine.reset();
        }
    }

    /// Value of the system's basket at its (modulated) prices.
    pub fn value(&self) -> Result<f64> {
        self.value_of(None, None)
    }

    /// Value of a basket (default: ours) at some prices (default: ours, modulated).
    pub fn value_of(&self, prices: Option<&Basket>, basket: Option<&Basket>) -> Result<f64> {
        let modulated;
        let prices = match prices {
            Some(prices) => prices,
            None => {
                modulated = self.prices();
                &modulated
            }
        };
        let basket = basket.unwrap_or(&self.basket);
        basket.iter().try_fold(0.0, |total, (commodity, amount)| {
            let price = prices
                .get(commodity)
                .ok_or_else(|| HoloFuelError::SimulationError {
                    message: format!("no price for commodity {:?}", commodity),
                })?;
            Ok(total + price * amount)
        })
    }
}

/// What a [`Sine`] attached to a [`CreditSystem`] varies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Modulation {
    K(Sine),
    Prices(Sine),
}

/// A sine wave used to modulate credit factors or prices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sine {
    pub amp: f64,
    pub theta: f64,
    pub step: f64,
}

impl Sine {
    pub fn new(amp: f64, step: f64) -> Self {
        Self { amp, theta: 0.0, step }
    }

    pub fn advance(&mut self) {
        self.theta += self.step;
    }

    pub fn reset(&mut self) {
        self.theta = 0.0;
    }

    /// `1 + amp * sin(theta)`
    pub fn scale(&self) -> f64 {
        1.0 + self.amp * self.theta.sin()
    }
}

/// The current inflation, shared between the credit controller and any
/// agents reacting to it.
#[derive(Debug, Clone)]
pub struct InflationIndex(Arc<AtomicU64>);

impl InflationIndex {
    pub fn new(inflation: f64) -> Self {
        Self(Arc::new(AtomicU64::new(inflation.to_bits())))
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, inflation: f64) {
        self.0.store(inflation.to_bits(), Ordering::Relaxed);
    }
}

impl Default for InflationIndex {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Drives a credit system's `K` with a PID loop, targeting no inflation.
///
/// Inflation is the current basket price over the target price. Every
/// piece of feedback is kept in the trends, as `(now, value)` pairs.
#[derive(Debug, Clone)]
pub struct CreditController {
    pub credit: CreditSystem,
    pub price_target: f64,
    pub price_curr: f64,
    pub inflation: f64,
    pub now: f64,
    pub control: Controller,
    pub price_curr_trend: Vec<(f64, f64)>,
    pub inflation_trend: Vec<(f64, f64)>,
    pub k_trend: Vec<(f64, f64)>,
    pub pid_trend: Vec<(f64, (f64, f64, f64))>,
    pub price_trend: Vec<(f64, f64)>,
    index: InflationIndex,
}

impl CreditController {
    pub const DEFAULT_KPID: (f64, f64, f64) = (0.1, 0.1, 0.001);

    /// Start bumplessly from the present inflation, with `K` as the output.
    /// Without a current price, inflation is assumed to be neutral.
    pub fn new(
        credit: CreditSystem,
        kpid: Option<Kpid>,
        price_target: f64,
        price_curr: Option<f64>,
        now: f64,
    ) -> Result<Self> {
        if !(price_target > 0.0) {
            return Err(HoloFuelError::InvalidConfigValueError {
                field: "price_target".to_string(),
                value: price_target.to_string(),
                reason: "must be a positive price".to_string(),
            });
        }
        let price_curr = price_curr.unwrap_or(price_target);
        let inflation = price_curr / price_target;
        let control = Controller::new(
            kpid.unwrap_or_else(|| Self::DEFAULT_KPID.into()),
            Some(1.0),
            Some(inflation),
            Some(credit.k),
            Lout::default(),
            now,
        );
        let price = credit.value()?;
        Ok(Self {
            price_curr_trend: vec![(now, price_curr)],
            inflation_trend: vec![(now, inflation)],
            k_trend: vec![(now, credit.k)],
            pid_trend: vec![(now, (control.p, control.i, control.d))],
            price_trend: vec![(now, price)],
            credit,
            price_target,
            price_curr,
            inflation,
            now,
            control,
            index: InflationIndex::new(inflation),
        })
    }

    /// A handle on the inflation published by this controller.
    pub fn index(&self) -> InflationIndex {
        self.index.clone()
    }

    /// Reset the loop to proceed without a jump from the present state,
    /// eg. when assuming control after a period of inactivity.
    pub fn bumpless(&mut self, price_curr: f64, now: f64) {
        self.now = now;
        self.price_curr = price_curr;
        self.inflation = price_curr / self.price_target;
        self.index.set(self.inflation);
        self.control
            .bumpless(Some(1.0), Some(self.inflation), Some(self.credit.k), now);
    }

    /// Supply a computed basket price at `now` and recompute `K`.
    pub fn price_feedback(&mut self, price: f64, now: f64, bumpless: bool) -> Result<f64> {
        self.now = now;
        self.price_curr = price;
        self.price_curr_trend.push((now, price));
        self.inflation = price / self.price_target;
        self.inflation_trend.push((now, self.inflation));
        self.index.set(self.inflation);
        if bumpless {
            self.bumpless(price, now);
        } else {
            self.credit.k = self.control.update(None, Some(self.inflation), now);
        }
        tracing::debug!("credit control {}", self.control);
        self.k_trend.push((now, self.credit.k));
        self.pid_trend
            .push((now, (self.control.p, self.control.i, self.control.d)));
        self.price_trend.push((now, self.credit.value()?));
        Ok(self.credit.k)
    }
}
