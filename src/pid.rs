//! Two-zone temperature controller suitable for no_std embedded use.
//!
//! - Far below the setpoint the heater is simply full on, above the window
//!   it is off (bang-bang); the PID only runs inside the window
//! - Integral anti-windup via accumulator clamping to `±i_max`
//! - Derivative on measurement, averaged over the last four samples
//! - Output is a heater demand in `0.0..=1.0`
//!
//! Sign convention: `error = setpoint - measurement`, so a positive error
//! (too cold) raises demand and a rising measurement lowers it.
//!
//! Example
//! ```ignore
//! let mut controller = TempController::new(PidConfig::DEFAULT);
//! let demand = controller.demand(350.0, current_temp_f);
//! ```

use crate::config::PidConfig;
use crate::log::*;

const HISTORY: usize = 4;

/// Where a measurement sits relative to the PID window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2040", derive(defmt::Format))]
pub enum Zone {
    /// Below `setpoint - range_min`: full heat.
    BelowRange,
    InRange,
    /// Above `setpoint + range_max`: heater off.
    AboveRange,
}

impl Zone {
    pub fn classify(config: &PidConfig, setpoint: f32, measurement: f32) -> Self {
        if measurement < setpoint - config.range_min {
            Zone::BelowRange
        } else if measurement > setpoint + config.range_max {
            Zone::AboveRange
        } else {
            Zone::InRange
        }
    }
}

#[derive(Debug, Clone)]
pub struct TempController {
    config: PidConfig,

    // State
    accumulator: f32,
    history: [f32; HISTORY],
    primed: bool,
    last_zone: Option<Zone>,
}

impl TempController {
    pub fn new(config: PidConfig) -> Self {
        Self {
            config,
            accumulator: 0.0,
            history: [0.0; HISTORY],
            primed: false,
            last_zone: None,
        }
    }

    /// Clear the integral and the derivative history.
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
        self.history = [0.0; HISTORY];
        self.primed = false;
        self.last_zone = None;
    }

    /// True while `measurement` lies inside the PID window, bounds included.
    pub fn in_range(&self, setpoint: f32, measurement: f32) -> bool {
        Zone::classify(&self.config, setpoint, measurement) == Zone::InRange
    }

    /// Heater demand for one control cycle.
    pub fn demand(&mut self, setpoint: f32, measurement: f32) -> f32 {
        // Every sample enters the history so the derivative is meaningful
        // on the first cycle after entering the window.
        self.record(measurement);

        let zone = Zone::classify(&self.config, setpoint, measurement);
        if self.last_zone != Some(zone) {
            debug!("Controller zone {:?} at {}", zone, measurement);
            self.last_zone = Some(zone);
        }

        match zone {
            Zone::BelowRange => 1.0,
            Zone::AboveRange => 0.0,
            Zone::InRange => self.pid(setpoint, measurement),
        }
    }

    fn pid(&mut self, setpoint: f32, measurement: f32) -> f32 {
        let error = setpoint - measurement;

        // Integral with anti-windup (clamp)
        self.accumulator = clamp(
            self.accumulator + error * self.config.i,
            -self.config.i_max,
            self.config.i_max,
        );

        // Rising measurement -> negative contribution
        let d = -self.config.d * self.mean_slope();

        let p = error * self.config.p;

        let sum = p + self.accumulator + d;
        let demand = if sum.is_nan() {
            warn!("Demand is NaN (P: {}, I: {}, D: {}), heater off", p, self.accumulator, d);
            0.0
        } else {
            clamp(sum, 0.0, 1.0)
        };
        debug!(
            "Demand {} (P: {}, I: {}, D: {})",
            demand, p, self.accumulator, d
        );
        demand
    }

    fn record(&mut self, measurement: f32) {
        if !self.primed {
            // Start from a flat history instead of a jump from zero.
            self.history = [measurement; HISTORY];
            self.primed = true;
            return;
        }
        self.history.rotate_left(1);
        self.history[HISTORY - 1] = measurement;
    }

    /// Mean of consecutive differences, oldest to newest.
    fn mean_slope(&self) -> f32 {
        let sum: f32 = self.history.windows(2).map(|w| w[1] - w[0]).sum();
        sum / (HISTORY - 1) as f32
    }

    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }
}

#[inline]
fn clamp(x: f32, min: f32, max: f32) -> f32 {
    if x < min {
        min
    } else if x > max {
        max
    } else {
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn controller() -> TempController {
        TempController::new(PidConfig::DEFAULT)
    }

    #[test]
    fn far_below_window_is_full_heat() {
        let mut c = controller();
        assert_eq!(c.demand(350.0, 200.0), 1.0);
        assert_eq!(c.demand(350.0, 329.9), 1.0);
        assert_eq!(c.accumulator(), 0.0);
    }

    #[test]
    fn above_window_is_off() {
        let mut c = controller();
        assert_eq!(c.demand(350.0, 360.1), 0.0);
        assert_eq!(c.accumulator(), 0.0);
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let c = controller();
        assert!(c.in_range(350.0, 330.0));
        assert!(c.in_range(350.0, 360.0));
        assert!(!c.in_range(350.0, 329.99));
        assert!(!c.in_range(350.0, 360.01));
    }

    #[test]
    fn below_setpoint_in_window_heats() {
        let mut c = controller();
        let demand = c.demand(350.0, 340.0);
        // p = 1.2 on a flat history, integral = 0.1
        assert_eq!(demand, 1.0);
        assert!((c.accumulator() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn above_setpoint_in_window_cools() {
        let mut c = controller();
        assert_eq!(c.demand(350.0, 355.0), 0.0);
        assert!(c.accumulator() < 0.0);
    }

    #[test]
    fn rising_measurement_reduces_demand() {
        let config = PidConfig {
            p: 0.1,
            i: 0.0,
            ..PidConfig::DEFAULT
        };
        let mut flat = TempController::new(config);
        for _ in 0..4 {
            flat.demand(350.0, 345.0);
        }
        let steady = flat.demand(350.0, 345.0);

        let mut rising = TempController::new(config);
        for pv in [342.0, 343.0, 344.0] {
            rising.demand(350.0, pv);
        }
        let climbing = rising.demand(350.0, 345.0);

        // One degree per cycle costs D * 1.0 of demand.
        assert!((steady - 0.5).abs() < 1e-5);
        assert!((climbing - 0.1).abs() < 1e-5);
    }

    #[test]
    fn integral_saturates_at_limit() {
        let config = PidConfig {
            p: 0.0,
            d: 0.0,
            ..PidConfig::DEFAULT
        };
        let mut c = TempController::new(config);
        for _ in 0..100 {
            c.demand(350.0, 331.0);
        }
        assert_eq!(c.accumulator(), 0.3);
        assert!((c.demand(350.0, 331.0) - 0.3).abs() < 1e-6);
    }

    #[test]
    fn reset_clears_state() {
        let mut c = controller();
        c.demand(350.0, 340.0);
        c.reset();
        assert_eq!(c.accumulator(), 0.0);
        assert_eq!(c.history, [0.0; HISTORY]);
        assert!(!c.primed);
    }

    #[test]
    fn history_keeps_last_four_samples() {
        let mut c = controller();
        for pv in [1.0, 2.0, 3.0, 4.0, 5.0] {
            c.demand(350.0, pv);
        }
        assert_eq!(c.history, [2.0, 3.0, 4.0, 5.0]);
        assert_eq!(c.mean_slope(), 1.0);
    }

    #[test]
    fn nan_output_is_no_heat() {
        let config = PidConfig {
            p: f32::INFINITY,
            ..PidConfig::DEFAULT
        };
        let mut c = TempController::new(config);
        assert_eq!(c.demand(350.0, 350.0), 0.0);
    }

    #[test]
    fn closed_loop_converges_towards_setpoint() {
        // Crude first-order plant: full heat adds 4 degrees per cycle,
        // losses take 0.5% of the excess over ambient.
        let mut c = controller();
        let mut pv = 300.0;
        for _ in 0..400 {
            let demand = c.demand(350.0, pv);
            pv += demand * 4.0 - (pv - 70.0) * 0.005;
        }
        assert!((pv - 350.0).abs() < 2.0, "settled at {}", pv);
    }

    proptest! {
        #[test]
        fn demand_and_accumulator_stay_bounded(
            samples in proptest::collection::vec((100.0f32..500.0, 140.0f32..375.0), 1..64)
        ) {
            let mut c = controller();
            for (pv, sp) in samples {
                let demand = c.demand(sp, pv);
                prop_assert!((0.0..=1.0).contains(&demand));
                prop_assert!(c.accumulator().abs() <= 0.3);
            }
        }

        #[test]
        fn bypass_zones_freeze_the_accumulator(
            warmup in proptest::collection::vec(-30.0f32..30.0, 0..8),
            offset in 0.01f32..200.0,
            above in any::<bool>(),
        ) {
            let mut c = controller();
            for e in warmup {
                c.demand(350.0, 350.0 + e);
            }
            let before = c.accumulator();
            let (pv, expected) = if above {
                (360.0 + offset, 0.0)
            } else {
                (330.0 - offset, 1.0)
            };
            prop_assert_eq!(c.demand(350.0, pv), expected);
            prop_assert_eq!(c.accumulator(), before);
        }

        #[test]
        fn in_range_matches_window(sp in 140.0f32..375.0, pv in 0.0f32..500.0) {
            let c = controller();
            prop_assert_eq!(c.in_range(sp, pv), sp - 20.0 <= pv && pv <= sp + 10.0);
        }
    }
}
