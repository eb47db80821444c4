//! TV head - delta-encoded animations for a serpentine LED matrix.
//!
//! This crate compiles folders of images into compact per-frame change
//! lists and plays them back on a strip of addressable LEDs, under the
//! control of knobs and a serial link.
//!
//! # Architecture
//!
//! Desktop side:
//!
//! - `geometry`: Resize, rotate, flip and serpentine wiring order
//! - `delta`: Per-frame change lists
//! - `animation`: Streamable binary store and JSON document
//! - `pipeline`: Parallel batch conversion of image folders
//!
//! Device side:
//!
//! - `control`: Parameter state, knob filtering, serial protocol
//! - `playback`: Playback engine, LED drivers, cooperative scheduler
//!
//! Shared: `schema` (configuration) and `error`.
//!
//! # Example
//!
//! ```rust,no_run
//! use tvhead::{
//!     control::parameters,
//!     pipeline::Converter,
//!     playback::{DirectoryLibrary, MemoryDriver, PlaybackEngine, ManualClock, Scheduler},
//!     schema::{ConverterConfig, DeviceConfig},
//! };
//! use std::path::Path;
//!
//! // Convert every folder of images
//! let converter = Converter::new(ConverterConfig::default())?;
//! let report = converter.convert_all(Path::new("images"), Path::new("device"))?;
//! println!("{}", report);
//!
//! // Play the result
//! let config = DeviceConfig::default();
//! let (_writer, reader) = parameters(config.initial);
//! let library = DirectoryLibrary::scan("device")?;
//! let mut engine = PlaybackEngine::new(
//!     MemoryDriver::new(),
//!     library,
//!     reader,
//!     &config.display,
//!     config.playback.clone(),
//! );
//!
//! let mut scheduler = Scheduler::new(ManualClock::new());
//! scheduler.add(&mut engine);
//! scheduler.run(100);
//! # Ok::<(), tvhead::Error>(())
//! ```

pub mod animation;
pub mod control;
pub mod delta;
pub mod error;
pub mod geometry;
pub mod pipeline;
pub mod playback;
pub mod schema;

// Re-export commonly used types
pub use animation::{AnimationReader, AnimationWriter, CompressionType};
pub use delta::{Animation, ChangeEntry, ChangeList, encode};
pub use error::{Error, Result};
pub use geometry::{Flip, Frame, Geometry, Pixel, Rotation};
pub use playback::{EngineState, PlaybackEngine};
pub use schema::{ConverterConfig, DeviceConfig};
