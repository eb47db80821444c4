//! Playback engine: streams change lists onto the live framebuffer.

use std::time::Duration;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smart_leds::RGB8;

use super::driver::{LedDriver, render};
use super::library::{AnimationSource, FrameStream};
use super::scheduler::Task;
use crate::control::{ParameterReader, ParameterSnapshot};
use crate::delta::{ChangeList, apply_changes};
use crate::error::{Error, Result};
use crate::geometry::Pixel;
use crate::schema::{DisplayConfig, PlaybackConfig};

/// `millis * factor`, rounded to the microsecond.
fn scaled_millis(millis: u64, factor: f32) -> Duration {
    Duration::from_micros((millis as f64 * 1000.0 * factor.max(0.0) as f64).round() as u64)
}

/// Engine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No animation bound. The next step selects one.
    Idle,
    /// Applying change lists, one per tick.
    RenderingFrame,
    /// Animation finished, showing its last frame for the dwell.
    Holding,
    /// Animation aborted by a parameter change; display is black.
    Interrupted,
}

/// Plays the animation bound to the current channel.
///
/// The engine is the only owner of the framebuffer. It reads parameters
/// only at frame boundaries, so a change never tears a frame.
pub struct PlaybackEngine<D: LedDriver, L: AnimationSource> {
    driver: D,
    library: L,
    params: ParameterReader,
    config: PlaybackConfig,
    width: u16,
    height: u16,
    state: EngineState,
    framebuffer: Vec<Pixel>,
    /// Scratch buffers reused every frame.
    output: Vec<RGB8>,
    changes: ChangeList,
    stream: Option<Box<dyn FrameStream>>,
    /// Parameters in effect when the current animation was bound.
    bound: Option<ParameterSnapshot>,
    frame_index: u32,
    hold_until: Duration,
    /// True once black has been committed and nothing drawn since.
    blank: bool,
    rng: StdRng,
}

impl<D: LedDriver, L: AnimationSource> PlaybackEngine<D, L> {
    pub fn new(
        driver: D,
        library: L,
        params: ParameterReader,
        display: &DisplayConfig,
        config: PlaybackConfig,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let pixels = display.pixel_count();
        Self {
            driver,
            library,
            params,
            config,
            width: display.width,
            height: display.height,
            state: EngineState::Idle,
            framebuffer: vec![Pixel::BLACK; pixels],
            output: Vec::with_capacity(pixels),
            changes: ChangeList::new(),
            stream: None,
            bound: None,
            frame_index: 0,
            hold_until: Duration::ZERO,
            blank: false,
            rng,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn library(&self) -> &L {
        &self.library
    }

    /// Live framebuffer, unscaled.
    pub fn framebuffer(&self) -> &[Pixel] {
        &self.framebuffer
    }

    /// Change lists applied from the current animation.
    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    /// Channel of the bound animation.
    pub fn current_channel(&self) -> Option<u32> {
        self.bound.map(|b| b.channel)
    }

    /// Advance the state machine once. Returns the delay until the next
    /// step.
    pub fn step(&mut self, now: Duration) -> Duration {
        match self.state {
            EngineState::Idle => self.select(now),
            EngineState::RenderingFrame => self.render_next(now),
            EngineState::Holding => self.hold(now),
            EngineState::Interrupted => {
                self.state = EngineState::Idle;
                self.select(now)
            }
        }
    }

    /// Clear the framebuffer and commit black.
    pub fn clear(&mut self) {
        self.framebuffer.fill(Pixel::BLACK);
        if !self.blank {
            self.output.clear();
            self.output.resize(self.framebuffer.len(), RGB8::default());
            self.driver.write(&self.output);
            self.blank = true;
        }
    }

    fn open_channel(&self, channel: u32) -> Result<Box<dyn FrameStream>> {
        let stream = self.library.open(channel)?;
        let found = stream.dimensions();
        if found != (self.width, self.height) {
            return Err(Error::CodecMismatch {
                expected: (self.width, self.height),
                found,
            });
        }
        Ok(stream)
    }

    fn select(&mut self, now: Duration) -> Duration {
        let snapshot = self.params.snapshot();
        match self.open_channel(snapshot.channel) {
            Ok(stream) => {
                info!(
                    "Playing channel {} ({})",
                    snapshot.channel,
                    self.library.channel_name(snapshot.channel).unwrap_or("?")
                );
                self.framebuffer.fill(Pixel::BLACK);
                self.stream = Some(stream);
                self.bound = Some(snapshot);
                self.frame_index = 0;
                self.state = EngineState::RenderingFrame;
                self.render_next(now)
            }
            Err(e) => {
                warn!("Channel {} unavailable: {}", snapshot.channel, e);
                self.stream = None;
                self.bound = None;
                self.clear();
                Duration::from_millis(self.config.idle_retry_ms)
            }
        }
    }

    fn interrupted_by(&self, snapshot: &ParameterSnapshot) -> bool {
        self.bound.is_some_and(|bound| {
            bound.channel != snapshot.channel || bound.brightness != snapshot.brightness
        })
    }

    fn render_next(&mut self, now: Duration) -> Duration {
        let snapshot = self.params.snapshot();
        if self.interrupted_by(&snapshot) {
            debug!("Interrupted at frame {}", self.frame_index);
            self.stream = None;
            self.blank = false;
            self.clear();
            self.state = EngineState::Interrupted;
            return Duration::ZERO;
        }

        let Some(stream) = self.stream.as_mut() else {
            self.state = EngineState::Idle;
            return Duration::ZERO;
        };

        match stream.next_frame_into(&mut self.changes) {
            Ok(true) => {
                apply_changes(&mut self.framebuffer, &self.changes);
                render(&self.framebuffer, snapshot.brightness, &mut self.output);
                self.driver.write(&self.output);
                self.blank = false;
                self.frame_index += 1;
                scaled_millis(self.config.base_tick_ms, snapshot.speed)
            }
            Ok(false) => {
                self.stream = None;
                let (lo, hi) = (
                    self.config.dwell_min_ms.min(self.config.dwell_max_ms),
                    self.config.dwell_min_ms.max(self.config.dwell_max_ms),
                );
                let dwell = scaled_millis(self.rng.gen_range(lo..=hi), snapshot.speed);
                debug!("Animation done after {} frames, holding {:?}", self.frame_index, dwell);
                self.hold_until = now + dwell;
                self.bound = Some(snapshot);
                self.state = EngineState::Holding;
                self.poll_delay(now)
            }
            Err(e) => {
                warn!("Animation stream failed at frame {}: {}", self.frame_index, e);
                self.stream = None;
                self.bound = None;
                self.blank = false;
                self.clear();
                self.state = EngineState::Idle;
                Duration::from_millis(self.config.idle_retry_ms)
            }
        }
    }

    fn hold(&mut self, now: Duration) -> Duration {
        let snapshot = self.params.snapshot();
        if self.bound != Some(snapshot) {
            debug!("Parameters changed while holding");
            self.state = EngineState::Idle;
            return Duration::ZERO;
        }
        if now >= self.hold_until {
            self.state = EngineState::Idle;
            return Duration::ZERO;
        }
        self.poll_delay(now)
    }

    fn poll_delay(&self, now: Duration) -> Duration {
        self.hold_until
            .saturating_sub(now)
            .min(Duration::from_millis(self.config.dwell_poll_ms))
    }
}

impl<D: LedDriver, L: AnimationSource> Task for PlaybackEngine<D, L> {
    fn name(&self) -> &str {
        "playback"
    }

    fn step(&mut self, now: Duration) -> Duration {
        PlaybackEngine::step(self, now)
    }
}
