//! Desktop conversion pipeline.
//!
//! Walks an images root, encodes every subfolder into an animation and
//! writes the artifacts the device library expects. Folders are independent
//! and converted in parallel.

mod batch;
mod retry;
mod source;

pub use batch::{BatchReport, ConvertedAnimation, Converter, FolderOutcome, list_folders};
pub use source::{encode_folder, is_image, list_images, load_frame};
