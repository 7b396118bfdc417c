use heapless::String;
use serde::Serialize;

use crate::{Fault, PowerState};

/// Snapshot published after every regulation cycle and every power change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FryerStatus {
    pub power: PowerState,
    pub setpoint: u16,
    pub process_value: Option<f32>,
    pub raw: u16,
    pub demand: f32,
    pub in_range: bool,
    pub heater_on_ms: u32,
    pub fault: Option<Fault>,
}

impl FryerStatus {
    pub fn off(setpoint: u16, fault: Option<Fault>) -> Self {
        Self {
            power: PowerState::Off,
            setpoint,
            process_value: None,
            raw: 0,
            demand: 0.0,
            in_range: false,
            heater_on_ms: 0,
            fault,
        }
    }
}

pub fn to_json(status: &FryerStatus) -> Result<String<256>, serde_json_core::ser::Error> {
    serde_json_core::to_string(status)
}
