use embassy_time::Instant;
use portable_atomic::{AtomicBool, Ordering};

use crate::log::*;
use crate::temperature_sensor::{ProbeAdc, SteinhartHart};
use crate::Fault;

/// Relay state as seen by the simulated oil bath.
pub static HEATER_ON: AtomicBool = AtomicBool::new(false);

/// First-order thermal model of a pot of oil.
#[derive(Debug, Clone, Copy)]
pub struct OilBath {
    pub temperature: f32,
    pub ambient: f32,
    /// Degrees C per second with the element fully on.
    pub max_heating_rate: f32,
    /// Fraction of the excess over ambient lost per second.
    pub heat_loss_coefficient: f32,
}

impl OilBath {
    pub const ROOM_TEMPERATURE: f32 = 22.0;

    pub fn new() -> Self {
        Self {
            temperature: Self::ROOM_TEMPERATURE,
            ambient: Self::ROOM_TEMPERATURE,
            max_heating_rate: 0.6,
            heat_loss_coefficient: 0.002,
        }
    }

    pub fn advance(&mut self, heater_on: bool, seconds: f32) {
        let heat_input = if heater_on { self.max_heating_rate } else { 0.0 };
        // Newton's law of cooling
        let heat_loss = self.heat_loss_coefficient * (self.temperature - self.ambient);
        self.temperature += (heat_input - heat_loss) * seconds;
        if self.temperature < self.ambient {
            self.temperature = self.ambient;
        }
    }
}

impl Default for OilBath {
    fn default() -> Self {
        Self::new()
    }
}

/// Probe reading the simulated bath through the real calibration curve, so
/// the regulation path sees the same raw counts as on hardware.
pub struct SimProbe {
    bath: OilBath,
    calibration: SteinhartHart,
    /// Simulated seconds per real second.
    time_scale: f32,
    last_update: Instant,
    reads: u32,
}

impl SimProbe {
    pub fn new(bath: OilBath, calibration: SteinhartHart, time_scale: f32) -> Self {
        info!(
            "Oil bath: start={}C, rate={}C/s, loss={}, x{}",
            bath.temperature, bath.max_heating_rate, bath.heat_loss_coefficient, time_scale
        );
        Self {
            bath,
            calibration,
            time_scale,
            last_update: Instant::now(),
            reads: 0,
        }
    }
}

impl ProbeAdc for SimProbe {
    async fn read_raw(&mut self) -> Result<u16, Fault> {
        let now = Instant::now();
        let elapsed = (now - self.last_update).as_micros() as f32 / 1_000_000.0;
        self.last_update = now;
        self.bath
            .advance(HEATER_ON.load(Ordering::Relaxed), elapsed * self.time_scale);

        // A few counts of deterministic noise across the oversample window.
        self.reads = self.reads.wrapping_add(1);
        let noise = (self.reads % 5) as i32 - 2;
        let raw = i32::from(self.calibration.celsius_to_raw(self.bath.temperature)) + noise;
        Ok(raw.clamp(0, i32::from(u16::MAX)) as u16)
    }
}
