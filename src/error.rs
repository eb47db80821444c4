//! Error taxonomy shared by the desktop pipeline and the device runtime.

use std::io;
use std::path::PathBuf;

use crate::schema::ConfigError;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while converting, storing or playing animations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A single image could not be decoded. The pipeline skips it.
    #[error("Failed to load image {}: {reason}", path.display())]
    LoadFailure { path: PathBuf, reason: String },

    /// A source folder yielded zero usable frames.
    #[error("No frames could be loaded from {}", folder.display())]
    EmptySequence { folder: PathBuf },

    /// Stored dimensions disagree with the display (or with earlier frames).
    #[error("Animation is {}x{}, expected {}x{}", found.0, found.1, expected.0, expected.1)]
    CodecMismatch {
        expected: (u16, u16),
        found: (u16, u16),
    },

    /// A malformed or partially received control message.
    #[error("Corrupt control message: {0}")]
    TransportCorruption(String),

    /// No animation is available for the requested channel.
    #[error("No animation available for channel {0}")]
    ChannelUnavailable(u32),

    /// A structured animation document violated its own metadata.
    #[error("Malformed animation document: {0}")]
    Document(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
