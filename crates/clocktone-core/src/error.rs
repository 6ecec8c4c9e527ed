//! Error types for clocktone

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("Unknown note name: {0}")]
    UnknownNote(String),
    #[error("Unknown tracking mode: {0} (expected \"hour\" or \"minute\")")]
    UnknownTrackingMode(String),
    #[error("Unknown scale pattern: {0}")]
    UnknownScalePattern(String),
    #[error("Unknown effects preset: {0}")]
    UnknownPreset(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
