//! # Cost Volume Evaluation
//!
//! This crate evaluates learned stereo cost-volume networks: it merges left and right pass cost
//! volumes, regresses sub-pixel disparity, estimates match confidence and scores predictions
//! against ground truth.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod block_matching;
pub mod candidate;
pub mod checkpoint;
pub mod config;
pub mod cost_volume;
mod disparity;
mod error;
pub mod evaluator;
pub mod merge;
pub mod metrics;
pub mod profile;
pub mod regression;
pub mod stereo;

// -----------------------------------------------------------------------------------------------
// EXPORTS
// -----------------------------------------------------------------------------------------------

pub use crate::error::{Error, Result};

pub mod prelude {
    pub use crate::config::EvalParams;
    pub use crate::cost_volume::CostVolume;
    pub use crate::disparity::DisparityMap;
    pub use crate::error::{Error, Result};
    pub use crate::evaluator::{Evaluator, RunSummary, Stopwatch};
    pub use crate::metrics::Dataset;
    pub use crate::profile::{CostVolumeModel, EvalOutput, Profile};
    pub use crate::stereo::{PassInfo, Sample, StereoBatch};
}
