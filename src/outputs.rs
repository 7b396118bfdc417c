//! Relay, beeper and knob indicator outputs.

use embedded_hal::digital::{OutputPin, PinState};
use embedded_hal::pwm::SetDutyCycle;
use embedded_hal_async::delay::DelayNs;

use crate::config::FryerConfig;
use crate::Fault;

/// The two knob LEDs.
pub struct IndicatorPins<P> {
    /// Orange: process value inside the PID window.
    pub in_range: P,
    /// Blue: outside the window.
    pub out_of_range: P,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2040", derive(defmt::Format))]
pub enum Indicator {
    Off,
    InRange,
    OutOfRange,
}

pub struct FryerOutputs<P, W> {
    pub(crate) relay: W,
    pub(crate) beeper: W,
    pub(crate) indicators: IndicatorPins<P>,
    drive_percent: u8,
}

impl<P: OutputPin, W: SetDutyCycle> FryerOutputs<P, W> {
    pub fn new(relay: W, beeper: W, indicators: IndicatorPins<P>, drive_percent: u8) -> Self {
        Self {
            relay,
            beeper,
            indicators,
            drive_percent,
        }
    }

    fn set_drive(pwm: &mut W, on: bool, percent: u8) -> Result<(), Fault> {
        let percent = if on { percent } else { 0 };
        pwm.set_duty_cycle_percent(percent)
            .map_err(|_| Fault::OutputPwm)
    }

    pub fn relay_on(&mut self) -> Result<(), Fault> {
        Self::set_drive(&mut self.relay, true, self.drive_percent)
    }

    pub fn relay_off(&mut self) -> Result<(), Fault> {
        Self::set_drive(&mut self.relay, false, self.drive_percent)
    }

    pub fn beep_on(&mut self) -> Result<(), Fault> {
        Self::set_drive(&mut self.beeper, true, self.drive_percent)
    }

    pub fn beep_off(&mut self) -> Result<(), Fault> {
        Self::set_drive(&mut self.beeper, false, self.drive_percent)
    }

    pub fn set_indicator(&mut self, indicator: Indicator) -> Result<(), Fault> {
        let (orange, blue) = match indicator {
            Indicator::Off => (false, false),
            Indicator::InRange => (true, false),
            Indicator::OutOfRange => (false, true),
        };
        self.indicators
            .in_range
            .set_state(PinState::from(orange))
            .map_err(|_| Fault::OutputPin)?;
        self.indicators
            .out_of_range
            .set_state(PinState::from(blue))
            .map_err(|_| Fault::OutputPin)
    }

    /// Single tone of `ms` milliseconds.
    pub async fn tone<D: DelayNs>(&mut self, delay: &mut D, ms: u32) -> Result<(), Fault> {
        self.beep_on()?;
        delay.delay_ms(ms).await;
        self.beep_off()
    }

    pub async fn beep<D: DelayNs>(&mut self, delay: &mut D, config: &FryerConfig) -> Result<(), Fault> {
        self.tone(delay, config.beep_ms).await
    }

    /// Several short beeps.
    pub async fn alert<D: DelayNs>(&mut self, delay: &mut D, config: &FryerConfig) -> Result<(), Fault> {
        for _ in 0..config.alert_beeps {
            self.beep(delay, config).await?;
            delay.delay_ms(config.alert_gap_ms).await;
        }
        Ok(())
    }

    /// Heater, beeper and indicators off. Attempts every output even if an
    /// earlier one fails, and reports the first failure.
    pub fn safe_state(&mut self) -> Result<(), Fault> {
        let relay = self.relay_off();
        let beeper = self.beep_off();
        let indicators = self.set_indicator(Indicator::Off);
        relay.and(beeper).and(indicators)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{mock_outputs, MockDelay, MockPwm};
    use embassy_futures::block_on;

    #[test]
    fn relay_is_driven_at_half_duty() {
        let mut outputs = mock_outputs();
        outputs.relay_on().unwrap();
        assert_eq!(outputs.relay.duty(), MockPwm::MAX / 2);
        outputs.relay_off().unwrap();
        assert_eq!(outputs.relay.duty(), 0);
    }

    #[test]
    fn indicator_lights_one_led_at_a_time() {
        let mut outputs = mock_outputs();
        outputs.set_indicator(Indicator::InRange).unwrap();
        assert!(outputs.indicators.in_range.is_high());
        assert!(!outputs.indicators.out_of_range.is_high());
        outputs.set_indicator(Indicator::OutOfRange).unwrap();
        assert!(!outputs.indicators.in_range.is_high());
        assert!(outputs.indicators.out_of_range.is_high());
    }

    #[test]
    fn alert_sounds_three_beeps() {
        let mut outputs = mock_outputs();
        let mut delay = MockDelay::default();
        let config = FryerConfig::DEFAULT;
        block_on(outputs.alert(&mut delay, &config)).unwrap();
        assert_eq!(outputs.beeper.pulses(), 3);
        assert!(!outputs.beeper.is_on());
        assert_eq!(delay.elapsed_ms(), 3 * (75 + 50));
    }

    #[test]
    fn safe_state_turns_everything_off() {
        let mut outputs = mock_outputs();
        outputs.relay_on().unwrap();
        outputs.beep_on().unwrap();
        outputs.set_indicator(Indicator::InRange).unwrap();
        outputs.safe_state().unwrap();
        assert!(!outputs.relay.is_on());
        assert!(!outputs.beeper.is_on());
        assert!(!outputs.indicators.in_range.is_high());
        assert!(!outputs.indicators.out_of_range.is_high());
    }
}
