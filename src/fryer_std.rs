use core::convert::Infallible;

use embassy_time::Delay;
use embedded_hal::digital::{ErrorType, OutputPin};
use embedded_hal::pwm::{self, SetDutyCycle};
use portable_atomic::{AtomicBool, Ordering};

use crate::config::FryerConfig;
use crate::display::{DisplayPins, SevenSegmentDisplay};
use crate::log::*;
use crate::outputs::{FryerOutputs, IndicatorPins};
use crate::power::PowerStateMachine;
use crate::temperature_sensor::SteinhartHart;
use crate::temperature_sensor_sim::{OilBath, SimProbe, HEATER_ON};
use crate::FryerShared;

/// Output pin that only logs changes on named (non display) lines.
pub struct SimPin {
    name: Option<&'static str>,
    high: bool,
}

impl SimPin {
    pub fn named(name: &'static str) -> Self {
        Self {
            name: Some(name),
            high: false,
        }
    }

    pub fn silent() -> Self {
        Self {
            name: None,
            high: false,
        }
    }

    fn set(&mut self, high: bool) {
        if let Some(name) = self.name {
            if high != self.high {
                debug!("{} -> {}", name, if high { "on" } else { "off" });
            }
        }
        self.high = high;
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set(true);
        Ok(())
    }
}

/// PWM channel that mirrors its on/off state into a flag.
pub struct SimPwm {
    name: &'static str,
    duty: u16,
    on: &'static AtomicBool,
}

static BEEPER_ON: AtomicBool = AtomicBool::new(false);

impl SimPwm {
    pub fn new(name: &'static str, on: &'static AtomicBool) -> Self {
        Self { name, duty: 0, on }
    }
}

impl pwm::ErrorType for SimPwm {
    type Error = Infallible;
}

impl SetDutyCycle for SimPwm {
    fn max_duty_cycle(&self) -> u16 {
        u16::MAX
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        if (duty > 0) != (self.duty > 0) {
            debug!("{} duty {}", self.name, duty);
        }
        self.duty = duty;
        self.on.store(duty > 0, Ordering::Relaxed);
        Ok(())
    }
}

pub type SimShared = FryerShared<SimPin>;

pub fn build_display() -> SevenSegmentDisplay<SimPin> {
    SevenSegmentDisplay::new(DisplayPins {
        segments: core::array::from_fn(|_| SimPin::silent()),
        digits: core::array::from_fn(|_| SimPin::silent()),
        enable: SimPin::silent(),
    })
}

fn build_outputs(drive_percent: u8) -> FryerOutputs<SimPin, SimPwm> {
    FryerOutputs::new(
        SimPwm::new("relay", &HEATER_ON),
        SimPwm::new("beeper", &BEEPER_ON),
        IndicatorPins {
            in_range: SimPin::named("orange led"),
            out_of_range: SimPin::named("blue led"),
        },
        drive_percent,
    )
}

#[embassy_executor::task]
pub async fn power_task(config: &'static FryerConfig, shared: &'static SimShared, time_scale: f32) {
    let probe = SimProbe::new(OilBath::new(), SteinhartHart::FRYER_PROBE, time_scale);
    let mut machine = PowerStateMachine::new(
        config,
        shared,
        build_outputs(config.drive_percent),
        probe,
        SteinhartHart::FRYER_PROBE,
        Delay,
    );
    info!("Fryer simulator ready");
    match machine.run().await {}
}
