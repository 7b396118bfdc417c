#![cfg_attr(not(test), no_std)]

#[cfg(feature = "rp2040")]
pub use defmt as log;

#[cfg(not(feature = "rp2040"))]
pub use log;

pub mod config;
pub mod display;
pub mod inputs;
pub mod knob;
pub mod outputs;
pub mod pid;
pub mod power;
pub mod regulation;
pub mod status;
pub mod temperature_sensor;

#[cfg(test)]
pub(crate) mod testing;

#[cfg(feature = "rp2040")]
pub mod resources_rp2040;
#[cfg(feature = "rp2040")]
pub use resources_rp2040 as resources;

#[cfg(feature = "rp2040")]
pub mod inputs_rp2040;
#[cfg(feature = "std")]
pub mod inputs_std;

#[cfg(feature = "rp2040")]
pub mod temperature_sensor_rp2040;
#[cfg(feature = "std")]
pub mod temperature_sensor_sim;

#[cfg(feature = "rp2040")]
pub mod usb_interface_rp2040;
#[cfg(feature = "rp2040")]
pub use usb_interface_rp2040 as usb_interface;

#[cfg(feature = "std")]
pub mod usb_interface_std;
#[cfg(feature = "std")]
pub use usb_interface_std as usb_interface;

#[cfg(feature = "rp2040")]
pub mod fryer_rp2040;
#[cfg(feature = "rp2040")]
pub use fryer_rp2040 as fryer;

#[cfg(feature = "std")]
pub mod fryer_std;
#[cfg(feature = "std")]
pub use fryer_std as fryer;

pub static VERSION: &str = "v0.2";

use core::cell::Cell;
use core::fmt;

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::watch::Watch;
use embedded_hal::digital::OutputPin;

use crate::display::SharedDisplay;
use crate::inputs::ButtonEvents;
use crate::knob::Knob;
use crate::status::FryerStatus;

/// Number of receivers allowed on the status watch.
pub const STATUS_RECEIVERS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[cfg_attr(feature = "rp2040", derive(defmt::Format))]
pub enum PowerState {
    Off,
    On,
}

/// Anything that ends an ON session other than the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2040", derive(defmt::Format))]
pub enum Fault {
    /// Averaged probe reading fell below the plausibility threshold.
    SensorOpen { raw: u16 },
    /// The ADC itself reported an error.
    ProbeRead,
    OutputPin,
    OutputPwm,
}

impl Fault {
    /// Stable identifier used in status reports.
    pub fn code(&self) -> &'static str {
        match self {
            Fault::SensorOpen { .. } => "sensor_open",
            Fault::ProbeRead => "probe_read",
            Fault::OutputPin => "output_pin",
            Fault::OutputPwm => "output_pwm",
        }
    }
}

impl serde::Serialize for Fault {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::SensorOpen { raw } => write!(f, "probe reading {} below threshold", raw),
            Fault::ProbeRead => write!(f, "probe read error"),
            Fault::OutputPin => write!(f, "digital output error"),
            Fault::OutputPwm => write!(f, "pwm output error"),
        }
    }
}

/// Target temperature in display units, written by the knob handler.
pub struct Setpoint(Mutex<NoopRawMutex, Cell<u16>>);

impl Setpoint {
    pub const fn new(value: u16) -> Self {
        Self(Mutex::new(Cell::new(value)))
    }

    pub fn get(&self) -> u16 {
        self.0.lock(|v| v.get())
    }

    pub fn set(&self, value: u16) {
        self.0.lock(|v| v.set(value));
    }
}

/// State shared between the power state machine, its duties and the
/// input collaborators. Every duty borrows only the fields it needs.
pub struct FryerShared<P: OutputPin> {
    pub setpoint: Setpoint,
    pub display: SharedDisplay<P>,
    pub knob: Knob,
    pub buttons: ButtonEvents,
    pub status: Watch<NoopRawMutex, FryerStatus, STATUS_RECEIVERS>,
}

impl<P: OutputPin> FryerShared<P> {
    pub fn new(display: display::SevenSegmentDisplay<P>, knob: Knob, setpoint_step: u16) -> Self {
        let setpoint = knob.setpoint(setpoint_step);
        Self {
            setpoint: Setpoint::new(setpoint),
            display: SharedDisplay::new(display),
            knob,
            buttons: ButtonEvents::new(),
            status: Watch::new(),
        }
    }
}
