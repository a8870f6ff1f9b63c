use crate::model::{timer, DAY, HOUR, MINUTE};
use crate::utils::error::{HoloFuelError, Result};
use chrono::{DateTime, Utc};
use std::fmt;

/// `dt` seconds as `" 1d  1:01:01.250"`; without `ms`, whole seconds.
pub fn format_offset(dt: f64, ms: bool) -> String {
    let dt = dt.abs();
    let days = (dt / DAY).floor();
    let hours = (dt % DAY / HOUR).floor();
    let minutes = (dt % HOUR / MINUTE).floor();
    let seconds = dt % MINUTE;
    if ms {
        format!("{:2}d {:2}:{:02}:{:06.3}", days, hours, minutes, seconds)
    } else {
        format!("{:2}d {:2}:{:02}:{:02}", days, hours, minutes, seconds.floor())
    }
}

/// A simulation clock.
pub trait World {
    fn start(&self) -> f64;
    fn now(&self) -> f64;
    fn done(&self) -> bool;
    fn reset(&mut self);
    fn advance(&mut self);

    fn format_now(&self, now: f64, ms: bool) -> String {
        format_offset(now, ms)
    }

    /// Every period's `now`, beginning with the current one, until done.
    fn periods(&mut self) -> Periods<'_, Self>
    where
        Self: Sized,
    {
        Periods {
            world: self,
            started: false,
            finished: false,
        }
    }
}

impl<W: World + ?Sized> World for Box<W> {
    fn start(&self) -> f64 {
        (**self).start()
    }

    fn now(&self) -> f64 {
        (**self).now()
    }

    fn done(&self) -> bool {
        (**self).done()
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn advance(&mut self) {
        (**self).advance()
    }

    fn format_now(&self, now: f64, ms: bool) -> String {
        (**self).format_now(now, ms)
    }
}

/// Iterator over a world's periods; see [`World::periods`].
pub struct Periods<'a, W: ?Sized> {
    world: &'a mut W,
    started: bool,
    finished: bool,
}

impl<W: World + ?Sized> Iterator for Periods<'_, W> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.finished {
            return None;
        }
        if self.started {
            self.world.advance();
        }
        self.started = true;
        if self.world.done() {
            self.finished = true;
            return None;
        }
        Some(self.world.now())
    }
}

impl<W: World + ?Sized> std::iter::FusedIterator for Periods<'_, W> {}

/// A configured duration: absent takes `default`, and zero runs forever.
pub fn bounded(duration: Option<f64>, default: f64) -> Option<f64> {
    match duration {
        None => Some(default),
        Some(duration) if duration == 0.0 => None,
        some => some,
    }
}

/// A world that steps its clock by a fixed quanta, with no delay.
#[derive(Debug, Clone, PartialEq)]
pub struct SteppedWorld {
    pub start: f64,
    /// `None` runs forever.
    pub duration: Option<f64>,
    pub quanta: f64,
    now: f64,
}

impl SteppedWorld {
    pub fn new(start: f64, duration: Option<f64>, quanta: f64) -> Result<Self> {
        if !(quanta > 0.0) {
            return Err(HoloFuelError::InvalidConfigValueError {
                field: "world.quanta".to_string(),
                value: quanta.to_string(),
                reason: "a stepped world must advance by a positive quanta".to_string(),
            });
        }
        Ok(Self {
            start,
            duration,
            quanta,
            now: start,
        })
    }
}

impl Default for SteppedWorld {
    /// One day, by the minute.
    fn default() -> Self {
        Self {
            start: 0.0,
            duration: Some(DAY),
            quanta: MINUTE,
            now: 0.0,
        }
    }
}

impl World for SteppedWorld {
    fn start(&self) -> f64 {
        self.start
    }

    fn now(&self) -> f64 {
        self.now
    }

    fn done(&self) -> bool {
        self.duration
            .is_some_and(|duration| self.now >= self.start + duration)
    }

    fn reset(&mut self) {
        self.now = self.start;
    }

    fn advance(&mut self) {
        self.now += self.quanta;
    }
}

impl fmt::Display for SteppedWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "World starting @ {} w/ duration {:?}, quanta {}: {}",
            self.start, self.duration, self.quanta, self.now
        )
    }
}

/// A world advancing at `scale` times wall-clock time.
///
/// Changing the scale re-anchors the clock at the present, so simulated
/// time stays continuous.
#[derive(Debug, Clone, PartialEq)]
pub struct RealtimeWorld {
    pub start: f64,
    pub duration: Option<f64>,
    scale: f64,
    now: f64,
    anchor_real: f64,
    anchor_sim: f64,
}

impl RealtimeWorld {
    /// Defaults: start now (wall-clock), run for a minute, at real time. A
    /// zero duration runs until the caller stops advancing.
    pub fn new(start: Option<f64>, duration: Option<f64>, scale: Option<f64>) -> Self {
        let real = timer();
        let start = start.unwrap_or(real);
        Self {
            start,
            duration: bounded(duration, MINUTE),
            scale: scale.filter(|s| *s > 0.0).unwrap_or(1.0),
            now: start,
            anchor_real: real,
            anchor_sim: start,
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f64) {
        if scale > 0.0 && scale != self.scale {
            self.anchor_sim = self.now;
            self.anchor_real = timer();
            self.scale = scale;
        }
    }
}

impl World for RealtimeWorld {
    fn start(&self) -> f64 {
        self.start
    }

    fn now(&self) -> f64 {
        self.now
    }

    fn done(&self) -> bool {
        self.duration
            .is_some_and(|duration| self.now >= self.start + duration)
    }

    fn reset(&mut self) {
        self.now = self.start;
        self.anchor_sim = self.start;
        self.anchor_real = timer();
    }

    fn advance(&mut self) {
        self.now = self.anchor_sim + (timer() - self.anchor_real) * self.scale;
    }

    /// The UTC start time, plus the offset of `now` from it.
    fn format_now(&self, now: f64, ms: bool) -> String {
        let secs = self.start.floor();
        let nanos = ((self.start - secs) * 1.0e9) as u32;
        let started = DateTime::<Utc>::from_timestamp(secs as i64, nanos)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| self.start.to_string());
        format!("{} + {}", started, format_offset(now - self.start, ms))
    }
}

impl fmt::Display for RealtimeWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "real-time x {} World starting @ {} w/ duration {:?}: {}",
            self.scale, self.start, self.duration, self.now
        )
    }
}
