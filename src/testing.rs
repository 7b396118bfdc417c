//! Hardware doubles shared by the unit tests.

use core::convert::Infallible;
use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use embassy_futures::yield_now;
use embedded_hal::digital::{self, ErrorKind, ErrorType, OutputPin};
use embedded_hal::pwm::{self, SetDutyCycle};
use embedded_hal_async::delay::DelayNs;

use crate::display::DisplayPins;
use crate::outputs::{FryerOutputs, IndicatorPins};
use crate::temperature_sensor::{Calibration, ProbeAdc};
use crate::Fault;

#[derive(Debug, Default)]
pub struct MockPin {
    high: bool,
    writes: usize,
    fail_after: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockPinError;

impl digital::Error for MockPinError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

impl MockPin {
    /// Accepts `writes` writes, then rejects every later one and keeps its level.
    pub fn failing_after(writes: usize) -> Self {
        Self {
            fail_after: Some(writes),
            ..Self::default()
        }
    }

    fn write(&mut self, high: bool) -> Result<(), MockPinError> {
        if self.fail_after.is_some_and(|limit| self.writes >= limit) {
            return Err(MockPinError);
        }
        self.high = high;
        self.writes += 1;
        Ok(())
    }

    pub fn is_high(&self) -> bool {
        self.high
    }

    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl ErrorType for MockPin {
    type Error = MockPinError;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true)
    }
}

pub fn mock_display_pins() -> DisplayPins<MockPin> {
    DisplayPins {
        segments: Default::default(),
        digits: Default::default(),
        enable: MockPin::default(),
    }
}

/// PWM channel with a 16-bit range that remembers every duty it was given.
#[derive(Debug, Default)]
pub struct MockPwm {
    duty: u16,
    history: Vec<u16>,
}

impl MockPwm {
    pub const MAX: u16 = u16::MAX;

    pub fn duty(&self) -> u16 {
        self.duty
    }

    pub fn is_on(&self) -> bool {
        self.duty > 0
    }

    /// Number of off → on transitions.
    pub fn pulses(&self) -> usize {
        let mut previous = 0;
        let mut pulses = 0;
        for &duty in &self.history {
            if previous == 0 && duty > 0 {
                pulses += 1;
            }
            previous = duty;
        }
        pulses
    }
}

impl pwm::ErrorType for MockPwm {
    type Error = Infallible;
}

impl SetDutyCycle for MockPwm {
    fn max_duty_cycle(&self) -> u16 {
        Self::MAX
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.duty = duty;
        self.history.push(duty);
        Ok(())
    }
}

pub type MockOutputs = FryerOutputs<MockPin, MockPwm>;

pub fn mock_outputs() -> MockOutputs {
    FryerOutputs::new(
        MockPwm::default(),
        MockPwm::default(),
        IndicatorPins {
            in_range: MockPin::default(),
            out_of_range: MockPin::default(),
        },
        50,
    )
}

/// ADC fed from a script of averaged readings. Each cycle consumes one
/// entry and returns it for all of its oversamples; the last entry repeats.
#[derive(Debug, Clone, Default)]
pub struct ScriptedAdc {
    readings: Rc<std::cell::RefCell<VecDeque<u16>>>,
    current: Rc<Cell<u16>>,
    reads: Rc<Cell<usize>>,
}

impl ScriptedAdc {
    pub fn new(readings: &[u16]) -> Self {
        let adc = Self::default();
        adc.readings.borrow_mut().extend(readings.iter().copied());
        adc
    }

    pub fn reads(&self) -> usize {
        self.reads.get()
    }
}

impl ProbeAdc for ScriptedAdc {
    async fn read_raw(&mut self) -> Result<u16, Fault> {
        let n = self.reads.get();
        if n % crate::config::OVERSAMPLE_COUNT == 0 {
            if let Some(next) = self.readings.borrow_mut().pop_front() {
                self.current.set(next);
            }
        }
        self.reads.set(n + 1);
        Ok(self.current.get())
    }
}

/// Maps raw counts straight to degrees: `raw / 10` in Fahrenheit.
#[derive(Debug, Clone, Copy, Default)]
pub struct TenthFahrenheit;

impl Calibration for TenthFahrenheit {
    fn raw_to_celsius(&self, raw: u16) -> f32 {
        (f32::from(raw) / 10.0 - 32.0) * 5.0 / 9.0
    }
}

/// Virtual-time delay. Every call yields once so concurrently joined
/// futures get polled, and the requested time is added to a clock shared
/// by all clones.
#[derive(Debug, Clone, Default)]
pub struct MockDelay {
    elapsed_ns: Rc<Cell<u64>>,
}

impl MockDelay {
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ns.get() / 1_000_000
    }
}

impl DelayNs for MockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns.set(self.elapsed_ns.get() + u64::from(ns));
        yield_now().await;
    }

    async fn delay_us(&mut self, us: u32) {
        self.elapsed_ns.set(self.elapsed_ns.get() + u64::from(us) * 1_000);
        yield_now().await;
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.elapsed_ns
            .set(self.elapsed_ns.get() + u64::from(ms) * 1_000_000);
        yield_now().await;
    }
}
