//! LED driver abstraction layer.
//!
//! The playback engine is generic over [`LedDriver`]; one `write` call is
//! one committed frame on the strip.

use std::collections::VecDeque;
use std::fmt::Debug;

use log::warn;
use smart_leds::{RGB8, SmartLedsWrite};

use crate::geometry::Pixel;

/// Abstract LED driver.
pub trait LedDriver {
    /// Write colors to the strip, in physical index order.
    fn write(&mut self, colors: &[RGB8]);
}

/// Scale one pixel by `brightness`, truncating each channel.
#[inline]
pub fn scale(pixel: Pixel, brightness: f32) -> RGB8 {
    RGB8::new(
        (pixel.r as f32 * brightness) as u8,
        (pixel.g as f32 * brightness) as u8,
        (pixel.b as f32 * brightness) as u8,
    )
}

/// Scale a whole framebuffer into `out`.
pub fn render(framebuffer: &[Pixel], brightness: f32, out: &mut Vec<RGB8>) {
    out.clear();
    out.extend(framebuffer.iter().map(|&p| scale(p, brightness)));
}

/// Driver that keeps committed frames in memory.
///
/// Used by tests and by the simulated device in the CLI.
#[derive(Debug, Clone, Default)]
pub struct MemoryDriver {
    commits: VecDeque<Vec<RGB8>>,
    /// Frames kept. `None` keeps all of them.
    history: Option<usize>,
    total: usize,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only the last `history` frames.
    pub fn with_history(history: usize) -> Self {
        Self {
            history: Some(history),
            ..Self::default()
        }
    }

    /// Retained frames, oldest first.
    pub fn commits(&self) -> impl Iterator<Item = &[RGB8]> {
        self.commits.iter().map(Vec::as_slice)
    }

    pub fn last(&self) -> Option<&[RGB8]> {
        self.commits.back().map(Vec::as_slice)
    }

    /// Frames written since creation, including dropped ones.
    pub fn commit_count(&self) -> usize {
        self.total
    }

    pub fn clear(&mut self) {
        self.commits.clear();
    }
}

impl LedDriver for MemoryDriver {
    fn write(&mut self, colors: &[RGB8]) {
        self.total += 1;
        if self.history == Some(0) {
            return;
        }
        if self.history.is_some_and(|h| self.commits.len() >= h) {
            self.commits.pop_front();
        }
        self.commits.push_back(colors.to_vec());
    }
}

/// Adapter for any `smart-leds` strip.
pub struct StripDriver<W> {
    strip: W,
}

impl<W> StripDriver<W> {
    pub fn new(strip: W) -> Self {
        Self { strip }
    }

    pub fn into_inner(self) -> W {
        self.strip
    }
}

impl<W> LedDriver for StripDriver<W>
where
    W: SmartLedsWrite,
    W::Error: Debug,
    RGB8: Into<W::Color>,
{
    fn write(&mut self, colors: &[RGB8]) {
        if let Err(e) = self.strip.write(colors.iter().copied()) {
            warn!("LED strip write failed: {:?}", e);
        }
    }
}
