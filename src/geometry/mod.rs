//! Geometry mapping from image frames to the physical LED wiring order.
//!
//! Frames are resized to the display, rotated, flipped and then laid out
//! along a serpentine strip: even rows run left to right, odd rows run
//! right to left.
//!
//! ```rust
//! use tvhead::geometry::{Flip, Frame, Geometry, Pixel, Rotation};
//!
//! let mut frame = Frame::new(2, 2);
//! frame.set(1, 0, Pixel::new(255, 0, 0));
//!
//! let geometry = Geometry::new(2, 2, Rotation::None, Flip::None);
//! let mapped = geometry.map(&frame);
//!
//! // Row 1 runs backwards, so (1, 0) is the last LED.
//! assert_eq!(mapped.pixels()[3], Pixel::new(255, 0, 0));
//! ```

mod mapper;
mod transform;

pub use mapper::{Frame, Geometry, MappedFrame, Pixel, map};
pub use transform::{Flip, Rotation};
