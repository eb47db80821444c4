//! Sparse per-frame change lists over geometry-mapped frames.

use crate::error::{Error, Result};
use crate::geometry::{MappedFrame, Pixel};

/// One LED update: physical index plus its new color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChangeEntry {
    pub index: u32,
    pub pixel: Pixel,
}

impl ChangeEntry {
    #[inline]
    pub const fn new(index: u32, r: u8, g: u8, b: u8) -> Self {
        Self {
            index,
            pixel: Pixel::new(r, g, b),
        }
    }
}

/// Updates that turn the previous rendered frame into the next one, in
/// ascending index order.
pub type ChangeList = Vec<ChangeEntry>;

/// A delta-encoded animation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Animation {
    /// Human-readable name, usually the source folder name.
    pub label: String,
    pub width: u16,
    pub height: u16,
    pub frames: Vec<ChangeList>,
}

impl Animation {
    pub fn new(label: impl Into<String>, width: u16, height: u16) -> Self {
        Self {
            label: label.into(),
            width,
            height,
            frames: Vec::new(),
        }
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Reconstruct every frame by replaying the change lists onto black.
    pub fn replay(&self) -> Vec<Vec<Pixel>> {
        let mut buffer = vec![Pixel::BLACK; self.pixel_count()];
        self.frames
            .iter()
            .map(|changes| {
                apply_changes(&mut buffer, changes);
                buffer.clone()
            })
            .collect()
    }

    /// Storage statistics relative to storing every pixel of every frame.
    pub fn stats(&self) -> DeltaStats {
        DeltaStats {
            frame_count: self.frame_count(),
            entries: self.frames.iter().map(Vec::len).sum(),
            raw_pixels: self.frame_count() * self.pixel_count(),
        }
    }
}

/// Entry counts of an encoded animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaStats {
    pub frame_count: usize,
    /// Change entries over all frames.
    pub entries: usize,
    /// Pixels a full-frame encoding would store.
    pub raw_pixels: usize,
}

impl DeltaStats {
    /// Fraction of pixel writes saved by delta encoding, in percent.
    pub fn reduction_percent(&self) -> f32 {
        if self.raw_pixels == 0 {
            return 0.0;
        }
        (1.0 - self.entries as f32 / self.raw_pixels as f32) * 100.0
    }
}

impl std::fmt::Display for DeltaStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} frames, {} entries for {} pixels ({:.1}% reduction)",
            self.frame_count,
            self.entries,
            self.raw_pixels,
            self.reduction_percent()
        )
    }
}

/// Apply a change list to a framebuffer. Out-of-range indices are ignored.
pub fn apply_changes(buffer: &mut [Pixel], changes: &[ChangeEntry]) {
    for entry in changes {
        if let Some(slot) = buffer.get_mut(entry.index as usize) {
            *slot = entry.pixel;
        }
    }
}

/// Incremental delta encoder.
///
/// Holds only the previous frame, so folders can be encoded while images
/// are still being decoded.
#[derive(Debug, Clone)]
pub struct DeltaEncoder {
    width: usize,
    height: usize,
    previous: Option<Vec<Pixel>>,
}

impl DeltaEncoder {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            previous: None,
        }
    }

    /// True until the first frame has been pushed.
    #[inline]
    pub fn is_first(&self) -> bool {
        self.previous.is_none()
    }

    /// Encode the next frame.
    ///
    /// The first frame yields every lit pixel. Later frames yield every
    /// pixel that differs from the previous frame; a frame identical to its
    /// predecessor yields a single entry restating pixel 0 so playback still
    /// spends one tick on it.
    pub fn push(&mut self, frame: &MappedFrame) -> Result<ChangeList> {
        if (frame.width(), frame.height()) != (self.width, self.height) {
            return Err(Error::CodecMismatch {
                expected: (self.width as u16, self.height as u16),
                found: (frame.width() as u16, frame.height() as u16),
            });
        }

        let pixels = frame.pixels();
        let changes = match &self.previous {
            None => pixels
                .iter()
                .enumerate()
                .filter(|(_, p)| !p.is_black())
                .map(|(i, &pixel)| ChangeEntry {
                    index: i as u32,
                    pixel,
                })
                .collect(),
            Some(previous) => {
                let changes: ChangeList = pixels
                    .iter()
                    .zip(previous)
                    .enumerate()
                    .filter(|(_, (new, old))| new != old)
                    .map(|(i, (&pixel, _))| ChangeEntry {
                        index: i as u32,
                        pixel,
                    })
                    .collect();

                match (changes.is_empty(), pixels.first()) {
                    (true, Some(&pixel)) => vec![ChangeEntry { index: 0, pixel }],
                    _ => changes,
                }
            }
        };

        match &mut self.previous {
            Some(previous) => previous.copy_from_slice(pixels),
            None => self.previous = Some(pixels.to_vec()),
        }

        Ok(changes)
    }
}

/// Encode an ordered frame sequence. An empty sequence is an empty animation.
pub fn encode(
    label: impl Into<String>,
    width: u16,
    height: u16,
    frames: &[MappedFrame],
) -> Result<Animation> {
    let mut animation = Animation::new(label, width, height);
    let mut encoder = DeltaEncoder::new(width as usize, height as usize);
    for frame in frames {
        animation.frames.push(encoder.push(frame)?);
    }
    Ok(animation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn frame(width: usize, height: usize, pixels: &[(u8, u8, u8)]) -> MappedFrame {
        let pixels = pixels.iter().map(|&(r, g, b)| Pixel::new(r, g, b)).collect();
        MappedFrame::from_pixels(width, height, pixels).unwrap()
    }

    #[test]
    fn test_two_frame_scenario() {
        let f0 = frame(2, 2, &[(1, 2, 3), (4, 5, 6), (7, 8, 9), (10, 11, 12)]);
        let f1 = frame(2, 2, &[(1, 2, 3), (4, 5, 6), (7, 8, 9), (10, 20, 30)]);
        let animation = encode("scenario", 2, 2, &[f0, f1]).unwrap();

        assert_eq!(
            animation.frames,
            vec![
                vec![
                    ChangeEntry::new(0, 1, 2, 3),
                    ChangeEntry::new(1, 4, 5, 6),
                    ChangeEntry::new(2, 7, 8, 9),
                    ChangeEntry::new(3, 10, 11, 12),
                ],
                vec![ChangeEntry::new(3, 10, 20, 30)],
            ]
        );
    }

    #[test]
    fn test_first_frame_skips_black() {
        let f0 = frame(2, 2, &[(0, 0, 0), (0, 0, 7), (0, 0, 0), (9, 0, 0)]);
        let animation = encode("sparse", 2, 2, &[f0]).unwrap();
        assert_eq!(
            animation.frames[0],
            vec![ChangeEntry::new(1, 0, 0, 7), ChangeEntry::new(3, 9, 0, 0)]
        );
    }

    #[test]
    fn test_identical_frames_never_collapse() {
        let f = frame(2, 1, &[(5, 5, 5), (0, 1, 0)]);
        let animation = encode("still", 2, 1, &[f.clone(), f.clone(), f]).unwrap();
        assert_eq!(animation.frames[1], vec![ChangeEntry::new(0, 5, 5, 5)]);
        assert_eq!(animation.frames[2], vec![ChangeEntry::new(0, 5, 5, 5)]);
    }

    #[test]
    fn test_compares_against_previous_frame() {
        let f0 = frame(3, 1, &[(1, 0, 0), (0, 0, 0), (0, 0, 0)]);
        let f1 = frame(3, 1, &[(0, 0, 0), (2, 0, 0), (0, 0, 0)]);
        let f2 = frame(3, 1, &[(0, 0, 0), (2, 0, 0), (3, 0, 0)]);
        let animation = encode("walk", 3, 1, &[f0, f1, f2]).unwrap();
        assert_eq!(
            animation.frames[1],
            vec![ChangeEntry::new(0, 0, 0, 0), ChangeEntry::new(1, 2, 0, 0)]
        );
        assert_eq!(animation.frames[2], vec![ChangeEntry::new(2, 3, 0, 0)]);
    }

    #[test]
    fn test_empty_sequence() {
        let animation = encode("none", 4, 4, &[]).unwrap();
        assert_eq!(animation.frame_count(), 0);
        assert!(animation.replay().is_empty());
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut encoder = DeltaEncoder::new(2, 2);
        let err = encoder.push(&frame(1, 1, &[(1, 1, 1)])).unwrap_err();
        assert!(matches!(
            err,
            Error::CodecMismatch {
                expected: (2, 2),
                found: (1, 1)
            }
        ));
    }

    #[test]
    fn test_stats() {
        let f0 = frame(2, 1, &[(1, 1, 1), (0, 0, 0)]);
        let f1 = frame(2, 1, &[(1, 1, 1), (2, 2, 2)]);
        let stats = encode("s", 2, 1, &[f0, f1]).unwrap().stats();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.raw_pixels, 4);
        assert!((stats.reduction_percent() - 50.0).abs() < 1e-4);
    }

    fn frames_strategy() -> impl Strategy<Value = (usize, usize, Vec<Vec<(u8, u8, u8)>>)> {
        (1usize..5, 1usize..5).prop_flat_map(|(w, h)| {
            // Small channel range so consecutive frames often repeat pixels.
            let pixel = (0u8..3, 0u8..3, 0u8..3);
            let frame = prop::collection::vec(pixel, w * h);
            (Just(w), Just(h), prop::collection::vec(frame, 0..6))
        })
    }

    proptest! {
        #[test]
        fn prop_replay_reproduces_frames((w, h, raw) in frames_strategy()) {
            let frames: Vec<MappedFrame> = raw.iter().map(|f| frame(w, h, f)).collect();
            let animation = encode("prop", w as u16, h as u16, &frames).unwrap();
            let replayed = animation.replay();
            prop_assert_eq!(replayed.len(), frames.len());
            for (got, want) in replayed.iter().zip(&frames) {
                prop_assert_eq!(got.as_slice(), want.pixels());
            }
        }

        #[test]
        fn prop_later_frames_never_empty((w, h, raw) in frames_strategy()) {
            let frames: Vec<MappedFrame> = raw.iter().map(|f| frame(w, h, f)).collect();
            let animation = encode("prop", w as u16, h as u16, &frames).unwrap();
            for changes in animation.frames.iter().skip(1) {
                prop_assert!(!changes.is_empty());
                prop_assert!(changes.windows(2).all(|p| p[0].index < p[1].index));
            }
        }
    }
}
