//! Device-side playback.
//!
//! The [`PlaybackEngine`] streams change lists from an [`AnimationSource`]
//! onto its framebuffer and commits one frame per tick to an [`LedDriver`].
//! It runs next to the control tasks on a cooperative [`Scheduler`].

mod driver;
mod engine;
mod library;
mod scheduler;

pub use driver::{LedDriver, MemoryDriver, StripDriver, render, scale};
pub use engine::{EngineState, PlaybackEngine};
pub use library::{AnimationSource, DirectoryLibrary, FrameStream, MemoryLibrary};
pub use scheduler::{Clock, ManualClock, Scheduler, SystemClock, Task};
