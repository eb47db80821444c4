//! Parameter state shared between the control layer and the playback engine.
//!
//! There is exactly one [`ParameterWriter`] (it is not `Clone`), owned by
//! whichever task processes control input. Any number of
//! [`ParameterReader`]s observe the values. Each key is a single atomic, so
//! a reader never sees a torn value.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::schema::{ControlConfig, InitialParameters};

/// Slowest speed multiplier a control message can select.
pub const MIN_SPEED: f32 = 0.1;

/// Named controls carried by control messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    Brightness,
    Speed,
    Channel,
}

impl ControlKind {
    pub const ALL: [ControlKind; 3] = [
        ControlKind::Brightness,
        ControlKind::Speed,
        ControlKind::Channel,
    ];

    /// Wire label.
    pub fn label(self) -> &'static str {
        match self {
            ControlKind::Brightness => "Brightness",
            ControlKind::Speed => "Speed",
            ControlKind::Channel => "Channel",
        }
    }

    /// Parse a wire label. Matching ignores case.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.label().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for ControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug)]
struct Shared {
    /// f32 bits.
    brightness: AtomicU32,
    /// f32 bits.
    speed: AtomicU32,
    channel: AtomicU32,
}

/// A consistent-enough copy of the parameters, taken at a frame boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSnapshot {
    pub brightness: f32,
    pub speed: f32,
    pub channel: u32,
}

/// Create the parameter state with its single writer and a first reader.
pub fn parameters(initial: InitialParameters) -> (ParameterWriter, ParameterReader) {
    let shared = Arc::new(Shared {
        brightness: AtomicU32::new(initial.brightness.clamp(0.0, 1.0).to_bits()),
        speed: AtomicU32::new(initial.speed.max(MIN_SPEED).to_bits()),
        channel: AtomicU32::new(initial.channel),
    });
    (
        ParameterWriter {
            shared: Arc::clone(&shared),
        },
        ParameterReader { shared },
    )
}

/// Sole writer of the parameter state.
#[derive(Debug)]
pub struct ParameterWriter {
    shared: Arc<Shared>,
}

impl ParameterWriter {
    /// Set brightness, clamped to [0, 1].
    pub fn set_brightness(&self, brightness: f32) {
        let brightness = if brightness.is_nan() {
            0.0
        } else {
            brightness.clamp(0.0, 1.0)
        };
        self.shared
            .brightness
            .store(brightness.to_bits(), Ordering::Release);
    }

    /// Set the speed multiplier, floored at [`MIN_SPEED`].
    pub fn set_speed(&self, speed: f32) {
        let speed = if speed.is_nan() {
            1.0
        } else {
            speed.max(MIN_SPEED)
        };
        self.shared.speed.store(speed.to_bits(), Ordering::Release);
    }

    pub fn set_channel(&self, channel: u32) {
        self.shared.channel.store(channel, Ordering::Release);
    }

    /// Apply a raw control value.
    ///
    /// Brightness is `raw / brightness_steps`, speed is `raw / speed_steps`
    /// and the channel wraps modulo `channel_count` (left as is when no
    /// animation is known yet).
    pub fn apply(&self, kind: ControlKind, raw: i64, config: &ControlConfig, channel_count: usize) {
        match kind {
            ControlKind::Brightness => {
                self.set_brightness(raw as f32 / config.brightness_steps.max(1) as f32)
            }
            ControlKind::Speed => self.set_speed(raw as f32 / config.speed_steps.max(1) as f32),
            ControlKind::Channel => {
                let channel = if channel_count == 0 {
                    raw.clamp(0, u32::MAX as i64)
                } else {
                    raw.rem_euclid(channel_count as i64)
                };
                self.set_channel(channel as u32)
            }
        }
    }

    /// A new reader of the same state.
    pub fn reader(&self) -> ParameterReader {
        ParameterReader {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Read-only view of the parameter state.
#[derive(Debug, Clone)]
pub struct ParameterReader {
    shared: Arc<Shared>,
}

impl ParameterReader {
    #[inline]
    pub fn brightness(&self) -> f32 {
        f32::from_bits(self.shared.brightness.load(Ordering::Acquire))
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        f32::from_bits(self.shared.speed.load(Ordering::Acquire))
    }

    #[inline]
    pub fn channel(&self) -> u32 {
        self.shared.channel.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> ParameterSnapshot {
        ParameterSnapshot {
            brightness: self.brightness(),
            speed: self.speed(),
            channel: self.channel(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_values() {
        let (_writer, reader) = parameters(InitialParameters::default());
        let snapshot = reader.snapshot();
        assert_eq!(snapshot.brightness, 0.25);
        assert_eq!(snapshot.speed, 1.0);
        assert_eq!(snapshot.channel, 0);
    }

    #[test]
    fn test_writer_visible_to_all_readers() {
        let (writer, reader) = parameters(InitialParameters::default());
        let other = reader.clone();
        writer.set_channel(3);
        writer.set_brightness(2.0);
        assert_eq!(reader.channel(), 3);
        assert_eq!(other.brightness(), 1.0);
        assert_eq!(writer.reader().channel(), 3);
    }

    #[test]
    fn test_apply_raw_values() {
        let config = ControlConfig::default();
        let (writer, reader) = parameters(InitialParameters::default());

        writer.apply(ControlKind::Brightness, 10, &config, 4);
        assert_eq!(reader.brightness(), 0.5);
        writer.apply(ControlKind::Brightness, 42, &config, 4);
        assert_eq!(reader.brightness(), 1.0);

        writer.apply(ControlKind::Speed, 25, &config, 4);
        assert_eq!(reader.speed(), 2.5);
        writer.apply(ControlKind::Speed, 0, &config, 4);
        assert_eq!(reader.speed(), MIN_SPEED);

        writer.apply(ControlKind::Channel, 6, &config, 4);
        assert_eq!(reader.channel(), 2);
        writer.apply(ControlKind::Channel, -1, &config, 4);
        assert_eq!(reader.channel(), 3);
        writer.apply(ControlKind::Channel, 6, &config, 0);
        assert_eq!(reader.channel(), 6);
    }

    #[test]
    fn test_labels() {
        assert_eq!(ControlKind::from_label("Brightness"), Some(ControlKind::Brightness));
        assert_eq!(ControlKind::from_label("channel"), Some(ControlKind::Channel));
        assert_eq!(ControlKind::from_label("Volume"), None);
        for kind in ControlKind::ALL {
            assert_eq!(ControlKind::from_label(kind.label()), Some(kind));
        }
    }
}
