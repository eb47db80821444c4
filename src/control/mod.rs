//! Control input: knobs, sensors and the serial link between boards.
//!
//! Everything here ends in a [`ParameterWriter`], the single writer of the
//! parameter state the playback engine reads at frame boundaries. Nothing
//! in this module touches pixel memory.

mod filter;
mod hysteresis;
mod params;
mod sampler;
mod serial;

pub use filter::{InertialSensor, iqr_mean, median, quartiles, sample_inertial};
pub use hysteresis::HysteresisGate;
pub use params::{
    ControlKind, MIN_SPEED, ParameterReader, ParameterSnapshot, ParameterWriter, parameters,
};
pub use sampler::{
    AnalogSource, ControlSampler, ControlSink, Knob, ParameterSink, SerialLinkTask, SerialSender,
};
pub use serial::{
    ControlMessage, DEFAULT_FIELD_WIDTH, PAD, SerialReceiver, encode_message, payload_width,
    send_message,
};
