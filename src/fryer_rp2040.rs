use defmt::*;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::pwm::{Config as PwmConfig, Pwm, PwmOutput};
use embassy_time::Delay;
use fixed::types::U12F4;

use crate::config::FryerConfig;
use crate::display::{DisplayPins, SevenSegmentDisplay};
use crate::outputs::{FryerOutputs, IndicatorPins};
use crate::power::PowerStateMachine;
use crate::resources::{DisplayResources, OutputResources, ProbeResources};
use crate::temperature_sensor::SteinhartHart;
use crate::temperature_sensor_rp2040::RpProbe;
use crate::FryerShared;

pub type BoardPin = Output<'static>;
pub type BoardShared = FryerShared<BoardPin>;
type BoardOutputs = FryerOutputs<BoardPin, PwmOutput<'static>>;

// 125 MHz / (2 * 62500) = 1 kHz
const PWM_TOP: u16 = 62_499;
const PWM_DIVIDER: u8 = 2;

fn out(pin: embassy_rp::Peri<'static, impl embassy_rp::gpio::Pin>) -> BoardPin {
    Output::new(pin, Level::Low)
}

pub fn build_display(r: DisplayResources) -> SevenSegmentDisplay<BoardPin> {
    SevenSegmentDisplay::new(DisplayPins {
        segments: [
            out(r.seg_a),
            out(r.seg_b),
            out(r.seg_c),
            out(r.seg_d),
            out(r.seg_e),
            out(r.seg_f),
            out(r.seg_g),
            out(r.seg_dp),
        ],
        digits: [out(r.digit_0), out(r.digit_1), out(r.digit_2)],
        enable: out(r.enable),
    })
}

fn pwm_config() -> PwmConfig {
    let mut config = PwmConfig::default();
    config.top = PWM_TOP;
    config.divider = U12F4::from_num(PWM_DIVIDER);
    config.compare_a = 0;
    config
}

fn build_outputs(r: OutputResources, drive_percent: u8) -> Option<BoardOutputs> {
    let (relay, _) = Pwm::new_output_a(r.relay_pwm, r.relay, pwm_config()).split();
    let (beeper, _) = Pwm::new_output_a(r.beeper_pwm, r.beeper, pwm_config()).split();
    Some(FryerOutputs::new(
        relay?,
        beeper?,
        IndicatorPins {
            in_range: out(r.led_orange),
            out_of_range: out(r.led_blue),
        },
        drive_percent,
    ))
}

#[embassy_executor::task]
pub async fn power_task(
    config: &'static FryerConfig,
    shared: &'static BoardShared,
    outputs: OutputResources,
    probe: ProbeResources,
) {
    let Some(outputs) = build_outputs(outputs, config.drive_percent) else {
        error!("PWM channels unavailable");
        return;
    };
    let probe = RpProbe::new(probe);
    let mut machine = PowerStateMachine::new(
        config,
        shared,
        outputs,
        probe,
        SteinhartHart::FRYER_PROBE,
        Delay,
    );
    info!("Fryer ready");
    match machine.run().await {}
}
