//! Schema module - Configuration types for the converter and the device.

mod config;

pub use config::*;
