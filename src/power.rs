//! OFF/ON power state machine.
//!
//! While OFF only a short press is acted on. Powering on runs three duties
//! concurrently: display refresh, knob handling and regulation. A long
//! press or a duty fault drops all of them and the outputs are forced to a
//! safe state before anything else happens.

use core::convert::Infallible;

use embassy_futures::select::{select4, Either4};
use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use embedded_hal_async::delay::DelayNs;

use crate::config::FryerConfig;
use crate::display;
use crate::knob::knob_handler;
use crate::log::*;
use crate::outputs::FryerOutputs;
use crate::regulation::Regulator;
use crate::status::FryerStatus;
use crate::temperature_sensor::{Calibration, ProbeAdc};
use crate::{Fault, FryerShared, PowerState};

const FAULT_TONE_MS: u32 = 200;
const IDLE_PV: &str = "lo";

/// Why an ON session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2040", derive(defmt::Format))]
pub enum PowerDown {
    LongPress,
    Fault(Fault),
}

pub struct PowerStateMachine<'a, P: OutputPin, W, A, C, D> {
    config: &'a FryerConfig,
    shared: &'a FryerShared<P>,
    outputs: FryerOutputs<P, W>,
    probe: A,
    calibration: C,
    delay: D,
    state: PowerState,
}

impl<'a, P, W, A, C, D> PowerStateMachine<'a, P, W, A, C, D>
where
    P: OutputPin,
    W: SetDutyCycle,
    A: ProbeAdc,
    C: Calibration,
    D: DelayNs + Clone,
{
    pub fn new(
        config: &'a FryerConfig,
        shared: &'a FryerShared<P>,
        outputs: FryerOutputs<P, W>,
        probe: A,
        calibration: C,
        delay: D,
    ) -> Self {
        Self {
            config,
            shared,
            outputs,
            probe,
            calibration,
            delay,
            state: PowerState::Off,
        }
    }

    pub fn state(&self) -> PowerState {
        self.state
    }

    pub fn outputs(&self) -> &FryerOutputs<P, W> {
        &self.outputs
    }

    pub async fn run(&mut self) -> Infallible {
        self.enter_off(None);
        loop {
            let reason = self.run_session().await;
            info!("Session ended: {:?}", reason);
        }
    }

    /// Wait for a press, run one ON session and power down again.
    pub async fn run_session(&mut self) -> PowerDown {
        self.shared.buttons.press.wait().await;
        info!("Powering up...");
        self.state = PowerState::On;

        let reason = self.session().await;

        info!("Powering down...");
        self.power_down(reason).await;
        reason
    }

    async fn session(&mut self) -> PowerDown {
        if let Err(fault) = self.outputs.beep(&mut self.delay, self.config).await {
            return PowerDown::Fault(fault);
        }

        let shared = self.shared;
        let step = self.config.setpoint_step;
        let setpoint = shared.knob.setpoint(step);
        shared.setpoint.set(setpoint);
        shared.display.set_sv(setpoint);

        let mut refresh_delay = self.delay.clone();
        let mut regulation_delay = self.delay.clone();
        let mut regulator = Regulator::new(
            self.config,
            &mut self.probe,
            &self.calibration,
            &mut self.outputs,
            &shared.setpoint,
            &shared.display,
            &shared.status,
        );

        match select4(
            display::refresh(
                &shared.display,
                &mut refresh_delay,
                self.config.display_refresh_ms,
            ),
            knob_handler(&shared.knob, &shared.setpoint, &shared.display, step),
            regulator.run(&mut regulation_delay),
            shared.buttons.long.wait(),
        )
        .await
        {
            Either4::First(Err(fault)) | Either4::Third(Err(fault)) => PowerDown::Fault(fault),
            Either4::First(Ok(never)) | Either4::Third(Ok(never)) => match never {},
            Either4::Second(never) => match never {},
            Either4::Fourth(()) => PowerDown::LongPress,
        }
    }

    /// Runs after every duty has been dropped, so nothing can re-energise
    /// an output behind it.
    async fn power_down(&mut self, reason: PowerDown) {
        let fault = match reason {
            PowerDown::LongPress => None,
            PowerDown::Fault(fault) => Some(fault),
        };
        self.enter_off(fault);

        let tone = match fault {
            None => self.outputs.beep(&mut self.delay, self.config).await,
            Some(_) => self.outputs.tone(&mut self.delay, FAULT_TONE_MS).await,
        };
        if let Err(e) = tone {
            error!("Power down tone failed: {:?}", e);
        }

        self.delay.delay_ms(self.config.cooldown_ms).await;
        self.shared.buttons.clear();
    }

    fn enter_off(&mut self, fault: Option<Fault>) {
        if let Err(e) = self.outputs.safe_state() {
            error!("Safe state incomplete: {:?}", e);
        }
        let shared = self.shared;
        if let Err(e) = shared.display.off() {
            error!("Display off failed: {:?}", e);
        }
        let setpoint = shared.knob.setpoint(self.config.setpoint_step);
        shared.display.set_sv(setpoint);
        shared.display.set_pv(IDLE_PV);
        self.state = PowerState::Off;
        shared
            .status
            .sender()
            .send(FryerStatus::off(setpoint, fault));
    }
}
