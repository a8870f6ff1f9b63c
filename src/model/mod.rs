//! Modelling and testing the Holo Fuel system's dynamics.
//!
//! The numeric helpers here are shared by the controller, the markets and
//! the credit model.

pub mod control;
pub mod credit;
pub mod reserve;
pub mod reserve_account;
pub mod trading;

use crate::utils::error::{HoloFuelError, Result};
use std::cmp::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};

pub const SECOND: f64 = 1.0;
pub const MINUTE: f64 = 60.0 * SECOND;
pub const HOUR: f64 = 60.0 * MINUTE;
pub const DAY: f64 = 24.0 * HOUR;

/// Default relative significance used by [`near`]: four decimal places.
pub const NEAR_SIGNIFICANCE: f64 = 1.0e-4;

/// Relative residue under which an order or tranche counts as used up.
pub const AMOUNT_SIGNIFICANCE: f64 = 1.0e-9;

/// Wall-clock seconds since the UNIX epoch.
pub fn timer() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// True iff `a` and `b` differ by no more than [`NEAR_SIGNIFICANCE`] of the larger.
pub fn near(a: f64, b: f64) -> bool {
    near_within(a, b, NEAR_SIGNIFICANCE)
}

pub fn near_within(a: f64, b: f64, significance: f64) -> bool {
    (a - b).abs() <= significance * a.abs().max(b.abs())
}

/// Limit `val` to `[lo, hi]`; an absent or NaN limit is ignored.
pub fn clamp(val: f64, lo: Option<f64>, hi: Option<f64>) -> f64 {
    if let Some(lo) = lo {
        if val < lo {
            return lo;
        }
    }
    if let Some(hi) = hi {
        if val > hi {
            return hi;
        }
    }
    val
}

/// An absent or NaN price means "at market".
pub fn non_value(number: Option<f64>) -> bool {
    number.is_none_or(f64::is_nan)
}

pub fn nan_first(number: Option<f64>) -> f64 {
    match number {
        Some(n) if !n.is_nan() => n,
        _ => f64::NEG_INFINITY,
    }
}

pub fn nan_last(number: Option<f64>) -> f64 {
    match number {
        Some(n) if !n.is_nan() => n,
        _ => f64::INFINITY,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum NaturalPart {
    Number(u64),
    Text(char),
}

/// Sort key placing "agent 2" before "agent 10"; letters compare case-insensitively.
pub fn natural(string: &str) -> Vec<NaturalPart> {
    let mut key: Vec<NaturalPart> = Vec::new();
    for c in string.chars() {
        match c.to_digit(10) {
            Some(d) => match key.last_mut() {
                Some(NaturalPart::Number(n)) => *n = n.saturating_mul(10).saturating_add(d as u64),
                _ => key.push(NaturalPart::Number(d as u64)),
            },
            None => key.extend(c.to_lowercase().map(NaturalPart::Text)),
        }
    }
    key
}

/// Total order over `f64`, for sorting order books and trend keys.
pub(crate) fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.total_cmp(&b)
}

/// Map `val` from domain `dom` into range `rng`, optionally along `x^exponent`.
///
/// A non-unity exponent needs an ordered domain, and the value must lie
/// within it unless `clamped` (raising negative values to arbitrary powers
/// is rarely what anyone wants). At unity either ordering is accepted, but
/// the domain must not be empty. With `clamped`, the result is limited to
/// the range.
pub fn scale(val: f64, dom: (f64, f64), rng: (f64, f64), clamped: bool, exponent: f64) -> Result<f64> {
    let mut val = val;
    if exponent != 1.0 {
        if !(dom.1 > dom.0) {
            return Err(HoloFuelError::ScalingError {
                message: format!(
                    "Scaling {} non-linearly requires an ordered domain: {:?}",
                    val, dom
                ),
            });
        }
        if clamped {
            val = clamp(val, Some(dom.0.min(dom.1)), Some(dom.0.max(dom.1)));
        } else if !(dom.0 <= val && val <= dom.1) {
            return Err(HoloFuelError::ScalingError {
                message: format!(
                    "Scaling {} non-linearly requires value in domain: {:?}",
                    val, dom
                ),
            });
        }
    } else if dom.1 == dom.0 {
        return Err(HoloFuelError::ScalingError {
            message: format!("Scaling {} requires a non-zero domain: {:?}", val, dom),
        });
    }

    let mut result = rng.0
        + (val - dom.0).powf(exponent) * (rng.1 - rng.0) / (dom.1 - dom.0).powf(exponent);
    if clamped {
        result = clamp(result, Some(rng.0.min(rng.1)), Some(rng.0.max(rng.1)));
    }
    Ok(result)
}
