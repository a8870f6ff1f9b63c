use crate::model::clamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Proportional, integral and derivative gains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kpid {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl Kpid {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd }
    }
}

impl Default for Kpid {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }
}

impl From<(f64, f64, f64)> for Kpid {
    fn from((kp, ki, kd): (f64, f64, f64)) -> Self {
        Self::new(kp, ki, kd)
    }
}

/// Output saturation limits; `None` leaves that side unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Lout {
    pub lo: Option<f64>,
    pub hi: Option<f64>,
}

impl Lout {
    pub fn new(lo: Option<f64>, hi: Option<f64>) -> Self {
        Self {
            lo: lo.filter(|v| !v.is_nan()),
            hi: hi.filter(|v| !v.is_nan()),
        }
    }

    fn below(&self, value: f64) -> bool {
        self.lo.is_some_and(|lo| value < lo)
    }

    fn above(&self, value: f64) -> bool {
        self.hi.is_some_and(|hi| value > hi)
    }
}

/// Simple PID loop with integral anti-windup and bumpless transfer.
#[derive(Debug, Clone)]
pub struct Controller {
    pub kpid: Kpid,
    pub lout: Lout,
    pub setpoint: f64,
    pub process: f64,
    pub output: f64,
    pub now: f64,
    pub p: f64,
    pub i: f64,
    pub d: f64,
}

impl Controller {
    pub fn new(
        kpid: Kpid,
        setpoint: Option<f64>,
        process: Option<f64>,
        output: Option<f64>,
        lout: Lout,
        now: f64,
    ) -> Self {
        let mut controller = Self {
            kpid,
            lout,
            setpoint: setpoint.unwrap_or(0.0),
            process: process.unwrap_or(0.0),
            output: output.unwrap_or(0.0),
            now,
            p: 0.0,
            i: 0.0,
            d: 0.0,
        };
        controller.bumpless(setpoint, process, output, now);
        controller
    }

    /// Take over control without a jump in output: I is chosen so the
    /// current output is sustained, and P so an identical next sample
    /// produces no derivative term.
    pub fn bumpless(
        &mut self,
        setpoint: Option<f64>,
        process: Option<f64>,
        output: Option<f64>,
        now: f64,
    ) {
        if let Some(setpoint) = setpoint {
            self.setpoint = setpoint;
        }
        if let Some(process) = process {
            self.process = process;
        }
        if let Some(output) = output {
            self.output = output;
        }
        self.now = now;

        self.p = self.setpoint - self.process;
        self.i = 0.0;
        if self.kpid.ki != 0.0 {
            self.i = (self.output - self.p * self.kpid.kp) / self.kpid.ki;
        }
        self.d = 0.0;
    }

    /// Run one iteration of the loop and return the new drive.
    ///
    /// A setpoint move is cancelled out of the derivative term. Samples
    /// that do not advance time leave the output unchanged.
    pub fn update(&mut self, setpoint: Option<f64>, process: Option<f64>, now: f64) -> f64 {
        let mut ds = 0.0;
        if let Some(setpoint) = setpoint {
            ds = setpoint - self.setpoint;
            self.setpoint = setpoint;
        }
        if let Some(process) = process {
            self.process = process;
        }
        if now > self.now {
            let dt = now - self.now;
            self.now = now;
            let p = self.setpoint - self.process;
            let i = self.i + p * dt;
            let d = (p - self.p - ds) / dt;
            self.output = p * self.kpid.kp + i * self.kpid.ki + d * self.kpid.kd;
            self.p = p;
            // Anti-windup: hold I while saturated and still winding further.
            if !(self.lout.below(self.output) && i < self.i)
                && !(self.lout.above(self.output) && i > self.i)
            {
                self.i = i;
            }
            self.d = d;
        }
        self.drive()
    }

    /// The raw output, clamped to the saturation limits.
    pub fn drive(&self) -> f64 {
        clamp(self.output, self.lout.lo, self.lout.hi)
    }
}

impl fmt::Display for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let relation = if self.process > self.setpoint {
            '>'
        } else if self.process < self.setpoint {
            '<'
        } else {
            '='
        };
        write!(
            f,
            "<{}: {:+8.6} {} {:+8.6} --> {:+8.6} ({:+8.6}) P: {:+8.6} * {:+8.6}, I: {:+8.6} * {:+8.6}, D: {:+8.6} * {:+8.6}>",
            self.now,
            self.process,
            relation,
            self.setpoint,
            self.drive(),
            self.output,
            self.p,
            self.kpid.kp,
            self.i,
            self.kpid.ki,
            self.d,
            self.kpid.kd
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::near;

    fn near_or_zero(a: f64, b: f64) -> bool {
        near(a, b) || (a.abs() < 1.0e-12 && b.abs() < 1.0e-12)
    }

    #[test]
    fn test_pid_simple() {
        let mut control = Controller::new(
            Kpid::new(2.0, 1.0, 2.0),
            Some(1.0),
            Some(1.0),
            None,
            Lout::default(),
            0.0,
        );
        let steps = [
            (1.0, 1.0, 1.0, 0.0000),
            (1.0, 1.0, 2.0, 0.0000),
            (1.0, 1.1, 3.0, -0.5000),
            (1.0, 1.1, 4.0, -0.4000),
            (1.0, 1.1, 5.0, -0.5000),
            (1.0, 1.05, 6.0, -0.3500),
            (1.0, 1.05, 7.0, -0.5000),
            (1.0, 1.01, 8.0, -0.3500),
            (1.0, 1.0, 9.0, -0.3900),
            (1.0, 1.0, 10.0, -0.4100),
            (1.0, 1.0, 11.0, -0.4100),
        ];
        for (setpoint, process, now, expected) in steps {
            let drive = control.update(Some(setpoint), Some(process), now);
            assert!(
                near_or_zero(drive, expected),
                "at {}: drive {} != {} ({})",
                now,
                drive,
                expected,
                control
            );
        }
    }

    #[test]
    fn test_bumpless_holds_output() {
        let mut control = Controller::new(
            Kpid::new(0.5, 0.25, 0.0),
            Some(1.0),
            Some(0.8),
            Some(3.0),
            Lout::default(),
            10.0,
        );
        // Same setpoint and process value: the output is sustained.
        let drive = control.update(None, None, 11.0);
        assert!(near(drive, 3.0 + 0.2 * 0.25));
        assert!(near(control.i, (3.0 - 0.2 * 0.5) / 0.25 + 0.2));
    }

    #[test]
    fn test_no_progress_without_positive_dt() {
        let mut control = Controller::new(Kpid::default(), Some(1.0), Some(0.0), None, Lout::default(), 5.0);
        let before = control.output;
        assert_eq!(control.update(None, Some(0.5), 5.0), before);
        assert_eq!(control.update(None, Some(0.5), 4.0), before);
    }

    #[test]
    fn test_saturation_and_anti_windup() {
        let mut control = Controller::new(
            Kpid::new(1.0, 1.0, 0.0),
            Some(10.0),
            Some(0.0),
            Some(0.0),
            Lout::new(Some(-1.0), Some(1.0)),
            0.0,
        );
        let i0 = control.i;
        let drive = control.update(None, None, 1.0);
        assert_eq!(drive, 1.0);
        assert!(control.output > 1.0);
        // Saturated high and the integral would grow: it is held.
        assert_eq!(control.i, i0);

        // Saturated low and winding further down: held as well.
        let drive = control.update(None, Some(11.0), 2.0);
        assert_eq!(drive, -1.0);
        assert!(control.output < -1.0);
        assert_eq!(control.i, i0);
    }

    #[test]
    fn test_display_shows_relation() {
        let control = Controller::new(Kpid::default(), Some(1.0), Some(2.0), None, Lout::default(), 0.0);
        let text = control.to_string();
        assert!(text.contains(" > "));
        assert!(text.starts_with("<0:"));
    }
}
