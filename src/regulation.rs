//! Regulation duty: one probe reading, one controller step and one relay
//! on/off window per cycle.

use core::convert::Infallible;

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::watch::Watch;
use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use embedded_hal_async::delay::DelayNs;

use crate::config::FryerConfig;
use crate::display::SharedDisplay;
use crate::log::*;
use crate::outputs::{FryerOutputs, Indicator};
use crate::pid::TempController;
use crate::status::FryerStatus;
use crate::temperature_sensor::{oversample, Calibration, ProbeAdc};
use crate::{Fault, PowerState, Setpoint, STATUS_RECEIVERS};

const ERROR_GLYPH: &str = "---";
const LOW_GLYPH: &str = "lo";

/// Relay on-time for one cycle. Pulses too short to be worth switching are
/// dropped and gaps too short to matter are filled.
pub fn relay_on_time(demand: f32, loop_ms: u32, snap_ms: u32) -> u32 {
    let demand = demand.clamp(0.0, 1.0);
    let on_time = (demand * loop_ms as f32) as u32;
    if on_time < snap_ms {
        0
    } else if on_time > loop_ms.saturating_sub(snap_ms) {
        loop_ms
    } else {
        on_time
    }
}

pub struct Regulator<'a, P: OutputPin, W, A, C> {
    config: &'a FryerConfig,
    controller: TempController,
    reached_setpoint: bool,
    probe: &'a mut A,
    calibration: &'a C,
    outputs: &'a mut FryerOutputs<P, W>,
    setpoint: &'a Setpoint,
    display: &'a SharedDisplay<P>,
    status: &'a Watch<NoopRawMutex, FryerStatus, STATUS_RECEIVERS>,
}

impl<'a, P, W, A, C> Regulator<'a, P, W, A, C>
where
    P: OutputPin,
    W: SetDutyCycle,
    A: ProbeAdc,
    C: Calibration,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &'a FryerConfig,
        probe: &'a mut A,
        calibration: &'a C,
        outputs: &'a mut FryerOutputs<P, W>,
        setpoint: &'a Setpoint,
        display: &'a SharedDisplay<P>,
        status: &'a Watch<NoopRawMutex, FryerStatus, STATUS_RECEIVERS>,
    ) -> Self {
        Self {
            config,
            controller: TempController::new(config.pid),
            reached_setpoint: false,
            probe,
            calibration,
            outputs,
            setpoint,
            display,
            status,
        }
    }

    /// Regulate until a fault. The controller and the setpoint alert start
    /// fresh on every call.
    pub async fn run<D: DelayNs>(&mut self, delay: &mut D) -> Result<Infallible, Fault> {
        self.controller.reset();
        self.reached_setpoint = false;
        info!("Regulation started, setpoint {}", self.setpoint.get());
        loop {
            self.cycle(delay).await?;
        }
    }

    /// One full cycle, `loop_ms` long unless the setpoint alert sounds.
    pub async fn cycle<D: DelayNs>(&mut self, delay: &mut D) -> Result<FryerStatus, Fault> {
        let raw = match oversample(&mut *self.probe).await {
            Ok(raw) if raw >= self.config.fault_threshold_raw => raw,
            Ok(raw) => return Err(self.fail(delay, Fault::SensorOpen { raw }).await),
            Err(fault) => return Err(self.fail(delay, fault).await),
        };

        let celsius = self.calibration.raw_to_celsius(raw);
        let pv = self.config.unit.from_celsius(celsius);
        if pv < self.config.min_display_temp {
            self.display.set_pv(LOW_GLYPH);
        } else {
            self.display.set_pv(pv as i32);
        }

        let setpoint = self.setpoint.get();
        let sp = f32::from(setpoint);
        let demand = self.controller.demand(sp, pv);
        let in_range = self.controller.in_range(sp, pv);
        self.outputs.set_indicator(if in_range {
            Indicator::InRange
        } else {
            Indicator::OutOfRange
        })?;
        debug!("PV: {}, SV: {}, raw: {}, demand: {}", pv, setpoint, raw, demand);

        if !self.reached_setpoint && pv >= sp {
            info!("Setpoint {} reached", setpoint);
            self.reached_setpoint = true;
            self.outputs.alert(delay, self.config).await?;
        }

        let loop_ms = self.config.loop_ms;
        let on_time = relay_on_time(demand, loop_ms, self.config.duty_snap_ms);
        let status = FryerStatus {
            power: PowerState::On,
            setpoint,
            process_value: Some(pv),
            raw,
            demand,
            in_range,
            heater_on_ms: on_time,
            fault: None,
        };
        self.status.sender().send(status.clone());

        if on_time > 0 {
            self.outputs.relay_on()?;
            delay.delay_ms(on_time).await;
        }
        // Only full demand keeps the relay closed across cycles.
        if demand != 1.0 {
            self.outputs.relay_off()?;
        }
        if on_time < loop_ms {
            delay.delay_ms(loop_ms - on_time).await;
        }
        Ok(status)
    }

    /// Fail safe: heater off, alert, error glyph on both panels, then a
    /// settle pause before the fault is reported.
    async fn fail<D: DelayNs>(&mut self, delay: &mut D, fault: Fault) -> Fault {
        error!("Regulation stopped: {:?}", fault);
        if let Err(e) = self.outputs.relay_off() {
            error!("Relay off failed: {:?}", e);
        }
        if let Err(e) = self.outputs.alert(delay, self.config).await {
            error!("Alert failed: {:?}", e);
        }
        self.display.set_sv(ERROR_GLYPH);
        self.display.set_pv(ERROR_GLYPH);
        delay.delay_ms(self.config.fault_settle_ms).await;
        fault
    }
}
