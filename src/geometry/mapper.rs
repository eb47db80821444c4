//! Frame buffers and the mapping from image coordinates to strip order.

use std::borrow::Cow;

use image::{Rgb, RgbImage, imageops::FilterType};

use super::transform::{Flip, Rotation};
use crate::schema::DisplayConfig;

/// One LED color, 8 bits per channel, no alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Pixel {
    pub const BLACK: Pixel = Pixel { r: 0, g: 0, b: 0 };

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// True when every channel is zero. Any non-zero channel makes a pixel lit.
    #[inline]
    pub fn is_black(self) -> bool {
        self.r == 0 && self.g == 0 && self.b == 0
    }
}

impl From<Rgb<u8>> for Pixel {
    fn from(rgb: Rgb<u8>) -> Self {
        let [r, g, b] = rgb.0;
        Pixel { r, g, b }
    }
}

impl From<Pixel> for Rgb<u8> {
    fn from(p: Pixel) -> Self {
        Rgb([p.r, p.g, p.b])
    }
}

/// A width x height frame in natural row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    pixels: Vec<Pixel>,
}

impl Frame {
    /// Create an all-black frame.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Pixel::BLACK; width * height],
        }
    }

    /// Wrap row-major pixels. Returns `None` if the length does not match.
    pub fn from_pixels(width: usize, height: usize, pixels: Vec<Pixel>) -> Option<Self> {
        (pixels.len() == width * height).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn from_image(image: &RgbImage) -> Self {
        Self {
            width: image.width() as usize,
            height: image.height() as usize,
            pixels: image.pixels().map(|&p| Pixel::from(p)).collect(),
        }
    }

    pub fn to_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            self.get(y as usize, x as usize).into()
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Pixel {
        self.pixels[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, pixel: Pixel) {
        self.pixels[row * self.width + col] = pixel;
    }

    /// Resize to `width` x `height`. Downscaling averages over the covered
    /// area, upscaling interpolates linearly.
    pub fn resized(&self, width: usize, height: usize) -> Frame {
        if self.pixels.is_empty() || width == 0 || height == 0 {
            return Frame::new(width, height);
        }
        let resized = image::imageops::resize(
            &self.to_image(),
            width as u32,
            height as u32,
            FilterType::Triangle,
        );
        Frame::from_image(&resized)
    }

    pub fn rotated(&self, rotation: Rotation) -> Frame {
        let (w, h) = rotation.rotated_dimensions(self.width, self.height);
        let mut out = Frame::new(w, h);
        for row in 0..self.height {
            for col in 0..self.width {
                let (r, c) = rotation.apply(row, col, self.width, self.height);
                out.set(r, c, self.get(row, col));
            }
        }
        out
    }

    pub fn flipped(&self, flip: Flip) -> Frame {
        let mut out = Frame::new(self.width, self.height);
        for row in 0..self.height {
            for col in 0..self.width {
                let (r, c) = flip.apply(row, col, self.width, self.height);
                out.set(r, c, self.get(row, col));
            }
        }
        out
    }
}

/// A frame flattened into physical LED order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedFrame {
    width: usize,
    height: usize,
    pixels: Vec<Pixel>,
}

impl MappedFrame {
    /// Wrap pixels already in strip order.
    pub fn from_pixels(width: usize, height: usize, pixels: Vec<Pixel>) -> Option<Self> {
        (pixels.len() == width * height).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    #[inline]
    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<Pixel> {
        self.pixels
    }
}

/// Display geometry: target size, orientation and serpentine wiring.
///
/// Source frames are resized to [`Geometry::source_dimensions`], rotated,
/// flipped, and finally every odd row is reversed to follow a strip that
/// snakes back and forth across the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    width: usize,
    height: usize,
    rotation: Rotation,
    flip: Flip,
}

impl Geometry {
    pub fn new(width: usize, height: usize, rotation: Rotation, flip: Flip) -> Self {
        Self {
            width,
            height,
            rotation,
            flip,
        }
    }

    pub fn from_display(display: &DisplayConfig) -> Self {
        Self::new(
            display.width as usize,
            display.height as usize,
            display.rotation,
            display.flip,
        )
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Size a source frame is resized to so that it fills the display after
    /// rotation.
    #[inline]
    pub fn source_dimensions(&self) -> (usize, usize) {
        self.rotation.rotated_dimensions(self.width, self.height)
    }

    /// Physical LED index of source pixel `(row, col)`.
    pub fn physical_index(&self, row: usize, col: usize) -> usize {
        let (sw, sh) = self.source_dimensions();
        let (r, c) = self.rotation.apply(row, col, sw, sh);
        let (r, c) = self.flip.apply(r, c, self.width, self.height);
        let c = if r % 2 == 1 { self.width - 1 - c } else { c };
        r * self.width + c
    }

    /// Source pixel `(row, col)` that drives physical LED `index`.
    pub fn source_position(&self, index: usize) -> (usize, usize) {
        let (sw, sh) = self.source_dimensions();
        let r = index / self.width;
        let c = index % self.width;
        let c = if r % 2 == 1 { self.width - 1 - c } else { c };
        let (r, c) = self.flip.apply(r, c, self.width, self.height);
        self.rotation.invert(r, c, sw, sh)
    }

    /// Map a frame of any size into strip order.
    pub fn map(&self, frame: &Frame) -> MappedFrame {
        let (sw, sh) = self.source_dimensions();
        let sized = if (frame.width(), frame.height()) == (sw, sh) {
            Cow::Borrowed(frame)
        } else {
            Cow::Owned(frame.resized(sw, sh))
        };

        let oriented = sized.rotated(self.rotation).flipped(self.flip);

        let mut pixels = oriented.pixels;
        for (row, chunk) in pixels.chunks_mut(self.width.max(1)).enumerate() {
            if row % 2 == 1 {
                chunk.reverse();
            }
        }

        MappedFrame {
            width: self.width,
            height: self.height,
            pixels,
        }
    }
}

/// Map `frame` onto a `target_width` x `target_height` strip.
pub fn map(
    frame: &Frame,
    target_width: usize,
    target_height: usize,
    rotation: Rotation,
    flip: Flip,
) -> MappedFrame {
    Geometry::new(target_width, target_height, rotation, flip).map(frame)
}
