//! Storage of delta-encoded animations.
//!
//! The binary `.tvha` form is what the device streams from disk; the JSON
//! document is an inspectable companion written by the converter.
//!
//! # File Format
//!
//! ```text
//! Header (22+ bytes):
//!   Magic: "TVHA" (4 bytes)
//!   Version: u16
//!   Flags: u16 (compression in bits 0-3, wide indices in bit 4)
//!   Width: u16
//!   Height: u16
//!   Frame count: u32
//!   Reserved: 4 bytes
//!   Label length: u16
//!   Label: UTF-8 bytes
//!
//! Records (frame_count times):
//!   Payload length: u32
//!   Payload: entries, optionally LZ4 compressed
//!     Index: u16 (u32 with wide indices)
//!     Red, green, blue: u8 each
//! ```
//!
//! All integers are little-endian. Records are read strictly in order, so a
//! player only ever holds the current change list.

mod document;
mod format;
mod reader;
mod writer;

pub use document::{
    AnimationDocument, DOCUMENT_EXTENSION, DOCUMENT_FORMAT, DOCUMENT_TYPE, DocumentEntry,
    DocumentMetadata, load_document, save_document,
};
pub use format::{
    ANIMATION_EXTENSION, ANIMATION_MAGIC, ANIMATION_VERSION, AnimationFlags, AnimationHeader,
    CompressionType, MAX_LABEL_LEN,
};
pub use reader::{AnimationReader, FrameIterator, load_animation, read_animation};
pub use writer::{AnimationStats, AnimationWriter, save_animation, write_animation};
