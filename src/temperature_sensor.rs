//! Thermistor probe: raw ADC sampling and resistance-to-temperature calibration.
//!
//! The probe is an NTC thermistor fed from a constant current source, so the
//! ADC reads a voltage proportional to its resistance. Hotter oil means
//! lower resistance, which means a lower raw count.

use crate::config::OVERSAMPLE_COUNT;
use crate::Fault;

/// A 16-bit scaled analog input.
#[allow(async_fn_in_trait)]
pub trait ProbeAdc {
    async fn read_raw(&mut self) -> Result<u16, Fault>;
}

/// Converts an averaged raw reading to degrees Celsius.
pub trait Calibration {
    fn raw_to_celsius(&self, raw: u16) -> f32;
}

/// Average of [`OVERSAMPLE_COUNT`] consecutive reads.
pub async fn oversample<A: ProbeAdc>(adc: &mut A) -> Result<u16, Fault> {
    let mut sum: u32 = 0;
    for _ in 0..OVERSAMPLE_COUNT {
        sum += u32::from(adc.read_raw().await?);
    }
    Ok((sum / OVERSAMPLE_COUNT as u32) as u16)
}

const KELVIN_OFFSET: f32 = 273.15;

/// Steinhart-Hart model of a thermistor read through a current source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteinhartHart {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    /// Excitation current in amps.
    pub current: f32,
    /// ADC reference voltage.
    pub vref: f32,
    /// Raw count at `vref`.
    pub full_scale: f32,
}

impl SteinhartHart {
    /// Coefficients fitted for the fryer probe with a 36 µA source and a
    /// 2.5 V reference.
    pub const FRYER_PROBE: Self = Self {
        a: 1.451_371_1e-3,
        b: 0.697_756_5e-4,
        c: 6.210_453e-7,
        current: 0.000_036,
        vref: 2.5,
        full_scale: 65535.0,
    };

    pub fn resistance(&self, raw: u16) -> f32 {
        self.vref * (f32::from(raw) / self.full_scale) / self.current
    }

    /// Inverse of [`Calibration::raw_to_celsius`]. Saturates at the ends of
    /// the ADC range.
    pub fn celsius_to_raw(&self, celsius: f32) -> u16 {
        // Solve c*x^3 + b*x + (a - 1/T) = 0 for x = ln(R) (Cardano, one real root).
        let p = self.b / self.c;
        let q = (self.a - 1.0 / (celsius + KELVIN_OFFSET)) / self.c;
        let root = libm::sqrtf(q * q / 4.0 + p * p * p / 27.0);
        let ln_r = libm::cbrtf(-q / 2.0 + root) + libm::cbrtf(-q / 2.0 - root);
        let resistance = libm::expf(ln_r);
        let raw = resistance * self.current / self.vref * self.full_scale;
        libm::roundf(raw).clamp(0.0, self.full_scale) as u16
    }
}

impl Default for SteinhartHart {
    fn default() -> Self {
        Self::FRYER_PROBE
    }
}

impl Calibration for SteinhartHart {
    fn raw_to_celsius(&self, raw: u16) -> f32 {
        let ln_r = libm::logf(self.resistance(raw));
        1.0 / (self.a + self.b * ln_r + self.c * ln_r * ln_r * ln_r) - KELVIN_OFFSET
    }
}
