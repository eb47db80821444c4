//! Delta encoding of geometry-mapped frame sequences.
//!
//! Each frame becomes a change list relative to the previous frame, so
//! replaying the lists in order onto an all-black framebuffer reproduces
//! the original sequence exactly.

mod encoder;

pub use encoder::{
    Animation, ChangeEntry, ChangeList, DeltaEncoder, DeltaStats, apply_changes, encode,
};
