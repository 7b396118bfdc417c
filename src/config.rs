//! Fryer configuration.
//!
//! Defaults reproduce the tuning of the production unit. A JSON document may
//! override any subset of the fields:
//!
//! ```ignore
//! let config = FryerConfig::from_json(r#"{"loop_ms":4000,"pid":{"p":0.2}}"#)?;
//! ```
//!
//! Temperatures (`min_display_temp`, the PID window and the knob range
//! times `setpoint_step`) are in the display unit. Switching `unit` to
//! Celsius means overriding them as well; `validate` rejects a setpoint
//! range that does not fit the unit.

use core::fmt;

use serde::Deserialize;

use crate::knob::RangeMode;

/// Tuning of the temperature controller.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PidConfig {
    pub p: f32,
    pub i: f32,
    pub d: f32,
    /// Bound of the integral accumulator, in demand units.
    pub i_max: f32,
    /// PID takes over at `setpoint - range_min`; below that the heater is full on.
    pub range_min: f32,
    /// Above `setpoint + range_max` the heater is off.
    pub range_max: f32,
}

impl PidConfig {
    pub const DEFAULT: Self = Self {
        p: 0.12,
        i: 0.01,
        d: 0.4,
        i_max: 0.3,
        range_min: 20.0,
        range_max: 10.0,
    };
}

impl Default for PidConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, serde::Serialize)]
#[cfg_attr(feature = "rp2040", derive(defmt::Format))]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn from_celsius(self, celsius: f32) -> f32 {
        match self {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => celsius * (9.0 / 5.0) + 32.0,
        }
    }

    /// Highest setpoint the knob may reach, about 205 C.
    pub fn max_setpoint(self) -> i32 {
        match self {
            TemperatureUnit::Celsius => 205,
            TemperatureUnit::Fahrenheit => 400,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct FryerConfig {
    pub pid: PidConfig,
    /// Length of one regulation cycle.
    pub loop_ms: u32,
    /// On-times shorter than this are dropped, and within this of `loop_ms` are stretched to a full cycle.
    pub duty_snap_ms: u32,
    /// Averaged raw readings below this are treated as a probe fault.
    pub fault_threshold_raw: u16,
    /// Process values below this show "lo".
    pub min_display_temp: f32,
    pub unit: TemperatureUnit,
    pub display_refresh_ms: u32,
    /// Relay and beeper drive level while asserted.
    pub drive_percent: u8,
    pub beep_ms: u32,
    pub alert_gap_ms: u32,
    pub alert_beeps: u8,
    /// Time the fault glyph stays up before the session ends.
    pub fault_settle_ms: u32,
    /// Button detection is re-armed this long after powering down.
    pub cooldown_ms: u32,
    /// Degrees per knob detent.
    pub setpoint_step: u16,
    pub knob_min: i32,
    pub knob_max: i32,
    pub knob_mode: RangeMode,
}

/// Samples averaged per regulation cycle.
pub const OVERSAMPLE_COUNT: usize = 8;

impl FryerConfig {
    pub const DEFAULT: Self = Self {
        pid: PidConfig::DEFAULT,
        loop_ms: 5000,
        duty_snap_ms: 500,
        fault_threshold_raw: 500,
        min_display_temp: 140.0,
        unit: TemperatureUnit::Fahrenheit,
        display_refresh_ms: 1,
        drive_percent: 50,
        beep_ms: 75,
        alert_gap_ms: 50,
        alert_beeps: 3,
        fault_settle_ms: 2000,
        cooldown_ms: 2000,
        setpoint_step: 5,
        knob_min: 140 / 5,
        knob_max: 375 / 5,
        knob_mode: RangeMode::Bounded,
    };

    /// Parse a (possibly partial) JSON document and validate the result.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let (config, _) =
            serde_json_core::from_str::<FryerConfig>(json).map_err(|_| ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.loop_ms == 0 || self.duty_snap_ms.saturating_mul(2) > self.loop_ms {
            return Err(ConfigError::LoopTooShort);
        }
        let pid = &self.pid;
        let values = [
            pid.p,
            pid.i,
            pid.d,
            pid.i_max,
            pid.range_min,
            pid.range_max,
            self.min_display_temp,
        ];
        if !values.iter().all(|v| v.is_finite()) {
            return Err(ConfigError::NonFinite);
        }
        if !(self.pid.i_max >= 0.0) || !(self.pid.range_min >= 0.0) || !(self.pid.range_max >= 0.0) {
            return Err(ConfigError::NegativeBound);
        }
        if self.knob_min > self.knob_max || self.knob_min < 0 {
            return Err(ConfigError::KnobRange);
        }
        if self.knob_max.saturating_mul(i32::from(self.setpoint_step)) > i32::from(u16::MAX) {
            return Err(ConfigError::KnobRange);
        }
        let max_setpoint = self.knob_max * i32::from(self.setpoint_step);
        if max_setpoint > self.unit.max_setpoint() || self.min_display_temp > max_setpoint as f32 {
            return Err(ConfigError::UnitRange);
        }
        if self.drive_percent > 100 {
            return Err(ConfigError::DriveLevel);
        }
        if self.display_refresh_ms == 0 {
            return Err(ConfigError::RefreshRate);
        }
        Ok(())
    }
}

impl Default for FryerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "rp2040", derive(defmt::Format))]
pub enum ConfigError {
    Parse,
    LoopTooShort,
    NonFinite,
    NegativeBound,
    KnobRange,
    UnitRange,
    DriveLevel,
    RefreshRate,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse => write!(f, "invalid configuration document"),
            ConfigError::LoopTooShort => write!(f, "loop_ms must exceed twice duty_snap_ms"),
            ConfigError::NonFinite => write!(f, "PID settings and min_display_temp must be finite"),
            ConfigError::NegativeBound => write!(f, "i_max and PID range bounds must be non-negative"),
            ConfigError::KnobRange => write!(f, "knob range is empty or out of bounds"),
            ConfigError::UnitRange => {
                write!(f, "setpoint range or min_display_temp does not fit the display unit")
            }
            ConfigError::DriveLevel => write!(f, "drive_percent must be at most 100"),
            ConfigError::RefreshRate => write!(f, "display_refresh_ms must be non-zero"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(FryerConfig::DEFAULT.validate(), Ok(()));
        assert_eq!(FryerConfig::default().knob_min * 5, 140);
    }

    #[test]
    fn partial_json_overrides_only_named_fields() {
        let config = FryerConfig::from_json(r#"{"loop_ms":4000,"pid":{"p":0.2}}"#).unwrap();
        assert_eq!(config.loop_ms, 4000);
        assert_eq!(config.pid.p, 0.2);
        assert_eq!(config.pid.i, PidConfig::DEFAULT.i);
        assert_eq!(config.unit, TemperatureUnit::Fahrenheit);
        assert_eq!(config.duty_snap_ms, 500);
    }

    #[test]
    fn overflowing_gain_is_rejected() {
        let err = FryerConfig::from_json(r#"{"pid":{"p":1e39}}"#).unwrap_err();
        assert_eq!(err, ConfigError::NonFinite);

        let mut config = FryerConfig::DEFAULT;
        config.pid.range_max = f32::NAN;
        assert_eq!(config.validate(), Err(ConfigError::NonFinite));
    }

    #[test]
    fn celsius_needs_celsius_ranges() {
        let err = FryerConfig::from_json(r#"{"unit":"Celsius"}"#).unwrap_err();
        assert_eq!(err, ConfigError::UnitRange);

        let config = FryerConfig::from_json(
            r#"{"unit":"Celsius","min_display_temp":60.0,"knob_min":12,"knob_max":38}"#,
        )
        .unwrap();
        assert_eq!(config.unit, TemperatureUnit::Celsius);
        assert_eq!(config.knob_max * i32::from(config.setpoint_step), 190);
    }

    #[test]
    fn rejects_loop_shorter_than_snap_window() {
        let err = FryerConfig::from_json(r#"{"loop_ms":800}"#).unwrap_err();
        assert_eq!(err, ConfigError::LoopTooShort);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(FryerConfig::from_json("{loop_ms"), Err(ConfigError::Parse));
    }

    #[test]
    fn rejects_inverted_knob_range() {
        let mut config = FryerConfig::DEFAULT;
        config.knob_min = 80;
        assert_eq!(config.validate(), Err(ConfigError::KnobRange));
    }

    #[test]
    fn fahrenheit_conversion() {
        assert_eq!(TemperatureUnit::Fahrenheit.from_celsius(100.0), 212.0);
        assert_eq!(TemperatureUnit::Celsius.from_celsius(42.0), 42.0);
    }
}
