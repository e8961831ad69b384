//! # Error standards
//!
//! This module provides a standardised error enum and result type for this crate.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::path::PathBuf;

// -----------------------------------------------------------------------------------------------
// TYPES
// -----------------------------------------------------------------------------------------------

/// Standard result type used in the cost volume crate.
pub type Result<T> = std::result::Result<T, Error>;

// -----------------------------------------------------------------------------------------------
// ENUMERATIONS
// -----------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Cannot find neural network file: {0}")]
    MissingCheckpoint(PathBuf),

    #[error("Cannot find history file: {0}")]
    MissingHistory(PathBuf),

    #[error("Profile name {0:?} must not contain '-'")]
    InvalidProfileName(String),

    #[error("Unknown dataset: {0}")]
    UnknownDataset(String),

    #[error("Only one of {0:?} may be selected")]
    ConflictingModes(Vec<&'static str>),

    #[error("Invalid parameter: {0}")]
    InvalidParams(String),

    #[error("Detected NaN loss in batch {batch}")]
    NanLoss { batch: usize },

    #[error("Shape mismatch in {what}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        found: Vec<usize>
    },

    #[error("Restoring predictions requires pass info for each of the {0} images")]
    MissingPassInfo(usize),

    #[error("Cost volume model failed: {0}")]
    Model(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to (de)serialise loss history: {0}")]
    History(#[from] serde_json::Error),

    #[error("Failed to parse parameters: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError)
}
