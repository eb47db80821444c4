//! Rotation and flip variants applied to source frames before wiring.
//!
//! Unknown values never fail: they fall back to the no-op variant so a bad
//! command or config entry cannot halt the device.

use serde::{Deserialize, Serialize};

/// Counter-clockwise rotation of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum Rotation {
    #[default]
    None,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl Rotation {
    /// All variants, in ascending angle.
    pub const ALL: [Rotation; 4] = [
        Rotation::None,
        Rotation::Rotate90,
        Rotation::Rotate180,
        Rotation::Rotate270,
    ];

    /// Map an angle in degrees. Anything but 0/90/180/270 is no rotation.
    pub fn from_degrees(degrees: i64) -> Self {
        match degrees {
            90 => Rotation::Rotate90,
            180 => Rotation::Rotate180,
            270 => Rotation::Rotate270,
            _ => Rotation::None,
        }
    }

    pub fn degrees(self) -> i64 {
        match self {
            Rotation::None => 0,
            Rotation::Rotate90 => 90,
            Rotation::Rotate180 => 180,
            Rotation::Rotate270 => 270,
        }
    }

    /// True when the rotation swaps width and height.
    #[inline]
    pub fn is_transposing(self) -> bool {
        matches!(self, Rotation::Rotate90 | Rotation::Rotate270)
    }

    /// Dimensions `(width, height)` after rotating a `width` x `height` frame.
    #[inline]
    pub fn rotated_dimensions(self, width: usize, height: usize) -> (usize, usize) {
        if self.is_transposing() {
            (height, width)
        } else {
            (width, height)
        }
    }

    /// Where the source pixel `(row, col)` of a `width` x `height` frame lands.
    #[inline]
    pub fn apply(self, row: usize, col: usize, width: usize, height: usize) -> (usize, usize) {
        match self {
            Rotation::None => (row, col),
            Rotation::Rotate90 => (width - 1 - col, row),
            Rotation::Rotate180 => (height - 1 - row, width - 1 - col),
            Rotation::Rotate270 => (col, height - 1 - row),
        }
    }

    /// Inverse of [`Rotation::apply`]: the source pixel that lands on
    /// `(row, col)` of the rotated frame. `width` and `height` are the
    /// dimensions of the source frame.
    #[inline]
    pub fn invert(self, row: usize, col: usize, width: usize, height: usize) -> (usize, usize) {
        match self {
            Rotation::None => (row, col),
            Rotation::Rotate90 => (col, width - 1 - row),
            Rotation::Rotate180 => (height - 1 - row, width - 1 - col),
            Rotation::Rotate270 => (height - 1 - col, row),
        }
    }
}

impl From<i64> for Rotation {
    fn from(degrees: i64) -> Self {
        Rotation::from_degrees(degrees)
    }
}

impl From<Rotation> for i64 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

/// Mirror applied after rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Flip {
    #[default]
    None,
    /// Left to right: columns are mirrored.
    Vertical,
    /// Upside down: rows are mirrored, about the horizontal axis.
    Horizontal,
    /// Both axes, equivalent to a 180 degree rotation.
    Both,
}

impl Flip {
    pub const ALL: [Flip; 4] = [Flip::None, Flip::Vertical, Flip::Horizontal, Flip::Both];

    /// Parse a flip mode by name. Unknown names are no flip.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "vertical" => Flip::Vertical,
            "horizontal" => Flip::Horizontal,
            "both" => Flip::Both,
            _ => Flip::None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Flip::None => "none",
            Flip::Vertical => "vertical",
            Flip::Horizontal => "horizontal",
            Flip::Both => "both",
        }
    }

    /// Where `(row, col)` lands. A flip is its own inverse.
    #[inline]
    pub fn apply(self, row: usize, col: usize, width: usize, height: usize) -> (usize, usize) {
        match self {
            Flip::None => (row, col),
            Flip::Vertical => (row, width - 1 - col),
            Flip::Horizontal => (height - 1 - row, col),
            Flip::Both => (height - 1 - row, width - 1 - col),
        }
    }
}

impl From<String> for Flip {
    fn from(name: String) -> Self {
        Flip::from_name(&name)
    }
}

impl From<Flip> for String {
    fn from(flip: Flip) -> Self {
        flip.name().to_string()
    }
}
