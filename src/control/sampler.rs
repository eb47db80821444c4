//! Knob sampling and the tasks that feed control input into the parameters.

use std::io::{self, Read, Write};
use std::time::Duration;

use log::{debug, warn};

use super::filter::iqr_mean;
use super::hysteresis::HysteresisGate;
use super::params::{ControlKind, ParameterWriter};
use super::serial::{ControlMessage, SerialReceiver, send_message};
use crate::error::Result;
use crate::playback::Task;
use crate::schema::ControlConfig;

/// A raw analog input, full scale `0..=u16::MAX`.
pub trait AnalogSource {
    fn read(&mut self) -> u16;
}

impl<F: FnMut() -> u16> AnalogSource for F {
    fn read(&mut self) -> u16 {
        self()
    }
}

/// One potentiometer bound to a control.
///
/// Each reading averages `samples_per_reading` raw values with outliers
/// removed, then passes the hysteresis gate before it is scaled to
/// `0..=max_raw`.
pub struct Knob<A: AnalogSource> {
    source: A,
    kind: ControlKind,
    max_raw: i64,
    samples: usize,
    gate: HysteresisGate,
    readings: Vec<f32>,
}

impl<A: AnalogSource> Knob<A> {
    pub fn new(source: A, kind: ControlKind, max_raw: i64, config: &ControlConfig) -> Self {
        Self {
            source,
            kind,
            max_raw,
            samples: config.samples_per_reading.max(1),
            gate: HysteresisGate::with_floor(config.hysteresis_threshold, config.hysteresis_floor),
            readings: Vec::with_capacity(config.samples_per_reading),
        }
    }

    pub fn kind(&self) -> ControlKind {
        self.kind
    }

    /// Sample the knob. Returns the scaled value when the reading moved past
    /// the hysteresis band.
    pub fn sample(&mut self) -> Option<i64> {
        self.readings.clear();
        for _ in 0..self.samples {
            self.readings.push(self.source.read() as f32);
        }
        let mean = self.gate.offer(iqr_mean(&self.readings)?)?;
        Some((mean / u16::MAX as f32 * self.max_raw as f32).round() as i64)
    }
}

/// Where accepted control values go.
pub trait ControlSink {
    fn send(&mut self, kind: ControlKind, raw: i64) -> Result<()>;
}

/// Applies control values directly to the parameter state.
pub struct ParameterSink {
    writer: ParameterWriter,
    config: ControlConfig,
    channel_count: usize,
}

impl ParameterSink {
    pub fn new(writer: ParameterWriter, config: ControlConfig, channel_count: usize) -> Self {
        Self {
            writer,
            config,
            channel_count,
        }
    }

    pub fn writer(&self) -> &ParameterWriter {
        &self.writer
    }
}

impl ControlSink for ParameterSink {
    fn send(&mut self, kind: ControlKind, raw: i64) -> Result<()> {
        self.writer.apply(kind, raw, &self.config, self.channel_count);
        Ok(())
    }
}

/// Forwards control values to the rendering board over a serial port.
pub struct SerialSender<W: Write> {
    port: W,
    field_width: usize,
}

impl<W: Write> SerialSender<W> {
    pub fn new(port: W, field_width: usize) -> Self {
        Self { port, field_width }
    }

    pub fn into_inner(self) -> W {
        self.port
    }
}

impl<W: Write> ControlSink for SerialSender<W> {
    fn send(&mut self, kind: ControlKind, raw: i64) -> Result<()> {
        send_message(
            &mut self.port,
            ControlMessage::new(kind, raw),
            self.field_width,
        )?;
        Ok(())
    }
}

/// Periodically samples every knob and forwards accepted values.
pub struct ControlSampler<A: AnalogSource, S: ControlSink> {
    knobs: Vec<Knob<A>>,
    sink: S,
    interval: Duration,
}

impl<A: AnalogSource, S: ControlSink> ControlSampler<A, S> {
    pub fn new(knobs: Vec<Knob<A>>, sink: S, config: &ControlConfig) -> Self {
        Self {
            knobs,
            sink,
            interval: Duration::from_millis(config.sample_interval_ms),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Sample all knobs once.
    pub fn sample_all(&mut self) {
        for knob in &mut self.knobs {
            let Some(raw) = knob.sample() else {
                continue;
            };
            debug!("{} knob -> {}", knob.kind(), raw);
            if let Err(e) = self.sink.send(knob.kind(), raw) {
                warn!("Failed to forward {}: {}", knob.kind(), e);
            }
        }
    }
}

impl<A: AnalogSource, S: ControlSink> Task for ControlSampler<A, S> {
    fn name(&self) -> &str {
        "control-sampler"
    }

    fn step(&mut self, _now: Duration) -> Duration {
        self.sample_all();
        self.interval
    }
}

/// Receives control messages from a serial port and applies them.
///
/// The port is expected to be non-blocking: a read returning `WouldBlock`
/// or zero bytes just means nothing arrived yet.
pub struct SerialLinkTask<R: Read, S: ControlSink = ParameterSink> {
    port: R,
    receiver: SerialReceiver,
    sink: S,
    interval: Duration,
    read_buffer: [u8; 64],
}

impl<R: Read, S: ControlSink> SerialLinkTask<R, S> {
    pub fn new(port: R, sink: S, config: &ControlConfig) -> Self {
        Self {
            port,
            receiver: SerialReceiver::new(config.field_width),
            sink,
            interval: Duration::from_millis(config.sample_interval_ms),
            read_buffer: [0; 64],
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Drain the port and apply every complete message. Returns how many
    /// the sink accepted.
    pub fn pump(&mut self) -> io::Result<usize> {
        loop {
            match self.port.read(&mut self.read_buffer) {
                Ok(0) => break,
                Ok(n) => self.receiver.push(&self.read_buffer[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        let mut applied = 0;
        while let Some(message) = self.receiver.poll() {
            match message {
                Ok(message) => {
                    debug!("Received {} = {}", message.kind, message.value);
                    match self.sink.send(message.kind, message.value) {
                        Ok(()) => applied += 1,
                        Err(e) => warn!("Failed to apply {}: {}", message.kind, e),
                    }
                }
                Err(e) => warn!("Dropping control message: {}", e),
            }
        }
        Ok(applied)
    }
}

impl<R: Read, S: ControlSink> Task for SerialLinkTask<R, S> {
    fn name(&self) -> &str {
        "serial-link"
    }

    fn step(&mut self, _now: Duration) -> Duration {
        if let Err(e) = self.pump() {
            warn!("Serial read failed: {}", e);
        }
        self.interval
    }
}
