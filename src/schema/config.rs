//! Configuration types for the converter and the device runtime.

use serde::{Deserialize, Serialize};

use crate::animation::CompressionType;
use crate::geometry::{Flip, Rotation};

/// Physical display and the orientation applied to source images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// LED columns.
    pub width: u16,
    /// LED rows.
    pub height: u16,
    /// Rotation in degrees (0, 90, 180, 270). Anything else is no rotation.
    #[serde(default)]
    pub rotation: Rotation,
    /// Mirror mode ("none", "vertical", "horizontal", "both").
    #[serde(default)]
    pub flip: Flip,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 16,
            height: 10,
            rotation: Rotation::None,
            flip: Flip::None,
        }
    }
}

impl DisplayConfig {
    /// Number of LEDs on the strip.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Bounded retry for flaky artifact writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Pause between attempts in milliseconds.
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 250,
        }
    }
}

/// Desktop converter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    pub display: DisplayConfig,
    /// Compression of stored change lists.
    #[serde(default)]
    pub compression: CompressionType,
    /// Also emit the structured JSON document next to the binary artifact.
    #[serde(default = "default_true")]
    pub write_document: bool,
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_true() -> bool {
    true
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            display: DisplayConfig::default(),
            compression: CompressionType::None,
            write_document: true,
            retry: RetryPolicy::default(),
        }
    }
}

/// Playback engine timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Delay between frames at speed 1.0.
    pub base_tick_ms: u64,
    /// Lower bound of the post-animation dwell.
    pub dwell_min_ms: u64,
    /// Upper bound of the post-animation dwell.
    pub dwell_max_ms: u64,
    /// Parameter polling interval while holding.
    pub dwell_poll_ms: u64,
    /// Delay before retrying a channel that failed to load.
    pub idle_retry_ms: u64,
    /// Seed for the dwell generator. Random when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            base_tick_ms: 20,
            dwell_min_ms: 2000,
            dwell_max_ms: 5000,
            dwell_poll_ms: 50,
            idle_retry_ms: 500,
            seed: None,
        }
    }
}

/// Control input sampling and the serial link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Minimum relative change accepted as a real knob movement.
    pub hysteresis_threshold: f32,
    /// Smallest value, in raw ADC counts, the relative change is measured
    /// against. Keeps a knob resting near zero from chattering.
    #[serde(default = "default_hysteresis_floor")]
    pub hysteresis_floor: f32,
    /// Raw readings averaged per knob sample.
    pub samples_per_reading: usize,
    /// Delay between sampling rounds.
    pub sample_interval_ms: u64,
    /// Raw brightness value that maps to full brightness.
    pub brightness_steps: u32,
    /// Raw speed value that maps to a multiplier of 1.0.
    pub speed_steps: u32,
    /// Width of one padded serial field, excluding the newline.
    pub field_width: usize,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            hysteresis_threshold: 0.2,
            hysteresis_floor: default_hysteresis_floor(),
            samples_per_reading: 50,
            sample_interval_ms: 10,
            brightness_steps: 20,
            speed_steps: 10,
            field_width: 19,
        }
    }
}

fn default_hysteresis_floor() -> f32 {
    1024.0
}

/// Initial parameter values at boot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitialParameters {
    pub brightness: f32,
    pub speed: f32,
    pub channel: u32,
}

impl Default for InitialParameters {
    fn default() -> Self {
        Self {
            brightness: 0.25,
            speed: 1.0,
            channel: 0,
        }
    }
}

/// Everything the device runtime needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub display: DisplayConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub initial: InitialParameters,
}

impl DisplayConfig {
    /// Validate display dimensions.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        Ok(())
    }
}

impl ConverterConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.display.validate()?;
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidRetry);
        }
        Ok(())
    }
}

impl DeviceConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.display.validate()?;
        let playback = &self.playback;
        if playback.base_tick_ms == 0 {
            return Err(ConfigError::InvalidTick);
        }
        if playback.dwell_min_ms > playback.dwell_max_ms {
            return Err(ConfigError::InvalidDwell {
                min: playback.dwell_min_ms,
                max: playback.dwell_max_ms,
            });
        }
        let control = &self.control;
        if !(control.hysteresis_threshold > 0.0 && control.hysteresis_threshold < 1.0) {
            return Err(ConfigError::InvalidThreshold(control.hysteresis_threshold));
        }
        if !(control.hysteresis_floor >= 0.0 && control.hysteresis_floor.is_finite()) {
            return Err(ConfigError::InvalidHysteresisFloor(control.hysteresis_floor));
        }
        if control.samples_per_reading == 0 {
            return Err(ConfigError::InvalidSampleCount);
        }
        if control.brightness_steps == 0 || control.speed_steps == 0 {
            return Err(ConfigError::InvalidSteps);
        }
        if control.field_width < 4 {
            return Err(ConfigError::InvalidFieldWidth(control.field_width));
        }
        if !(0.0..=1.0).contains(&self.initial.brightness) || self.initial.speed <= 0.0 {
            return Err(ConfigError::InvalidInitialParameters);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Display dimensions (width, height) must be non-zero")]
    InvalidDimensions,
    #[error("Retry policy needs at least one attempt")]
    InvalidRetry,
    #[error("Base tick must be non-zero")]
    InvalidTick,
    #[error("Dwell range is empty ({min} ms > {max} ms)")]
    InvalidDwell { min: u64, max: u64 },
    #[error("Hysteresis threshold {0} must lie in (0, 1)")]
    InvalidThreshold(f32),
    #[error("Hysteresis floor {0} must be finite and non-negative")]
    InvalidHysteresisFloor(f32),
    #[error("Knob samples per reading must be non-zero")]
    InvalidSampleCount,
    #[error("Brightness and speed steps must be non-zero")]
    InvalidSteps,
    #[error("Serial field width {0} is too small")]
    InvalidFieldWidth(usize),
    #[error("Initial brightness must lie in [0, 1] and speed must be positive")]
    InvalidInitialParameters,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(ConverterConfig::default().validate().is_ok());
        assert!(DeviceConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_rotation_falls_back() {
        let json = r#"{ "width": 8, "height": 4, "rotation": 45, "flip": "sideways" }"#;
        let display: DisplayConfig = serde_json::from_str(json).unwrap();
        assert_eq!(display.rotation, Rotation::None);
        assert_eq!(display.flip, Flip::None);
        assert_eq!(display.pixel_count(), 32);
    }

    #[test]
    fn test_device_config_partial_json() {
        let json = r#"{ "display": { "width": 12, "height": 8, "rotation": 90 } }"#;
        let config: DeviceConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.display.rotation, Rotation::Rotate90);
        assert_eq!(config.playback, PlaybackConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_dwell() {
        let mut config = DeviceConfig::default();
        config.playback.dwell_min_ms = 10;
        config.playback.dwell_max_ms = 5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDwell { min: 10, max: 5 })
        ));
    }

    #[test]
    fn test_rejects_zero_retry() {
        let mut config = ConverterConfig::default();
        config.retry.max_attempts = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRetry)));
    }
}
