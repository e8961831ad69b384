//! # Evaluation parameters
//!
//! Parameters for an evaluation run, usually read from a TOML file:
//!
//! ```toml
//! max_disparity = 192
//! dataset = "KITTI_2015"
//! merge_cost = true
//! regression = "squeeze"
//!
//! [squeeze]
//! mode = "window"
//! radius = 2
//!
//! [candidate]
//! deletion = true
//! ```

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::path::Path;

use serde::Deserialize;

use crate::candidate::CandidateParams;
use crate::error::*;
use crate::metrics::Dataset;
use crate::profile::Restore;
use crate::regression::{Regression, Squeeze};

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EvalParams {
    pub max_disparity: usize,
    pub dataset: String,

    /// Checkpoint version to load, latest when unset.
    pub version: Option<u32>,

    /// Merge the left pass with a flipped right pass and compute confidence error.
    pub merge_cost: bool,
    pub regression: Regression,
    pub squeeze: Squeeze,

    /// Candidate diagnostics, only run when `merge_cost` is set.
    pub candidate: Option<CandidateParams>,

    /// Predictions are resized back to the original image size.
    pub use_resize: bool,

    /// Inputs were cropped and ground truth cropped alike; nothing to restore.
    pub use_crop: bool,

    /// Inputs were padded; predictions are cropped back to the original size.
    pub use_padding_crop: bool,

    /// Keep the per-hypothesis confidence error volume in evaluation outputs.
    pub use_confidence_error_cost: bool
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl Default for EvalParams {
    fn default() -> Self {
        Self {
            max_disparity: 192,
            dataset: Dataset::FlyingThings3D.name().to_string(),
            version: None,
            merge_cost: true,
            regression: Regression::default(),
            squeeze: Squeeze::default(),
            candidate: None,
            use_resize: false,
            use_crop: false,
            use_padding_crop: false,
            use_confidence_error_cost: false
        }
    }
}

impl EvalParams {
    /// Parse and validate parameters from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let params: Self = toml::from_str(text)?;
        params.validate()?;
        Ok(params)
    }

    /// Read, parse and validate a TOML parameter file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Reject parameter combinations that cannot be evaluated.
    pub fn validate(&self) -> Result<()> {
        self.dataset()?;
        self.restore()?;

        if self.max_disparity == 0 {
            return Err(Error::InvalidParams("max_disparity must be positive".to_string()));
        }

        if let Some(candidate) = &self.candidate {
            candidate.validate()?;
        }

        Ok(())
    }

    pub fn dataset(&self) -> Result<Dataset> {
        self.dataset.parse()
    }

    /// How predictions are brought back to native resolution.
    pub fn restore(&self) -> Result<Restore> {
        let selected: Vec<&'static str> = [
            ("use_resize", self.use_resize),
            ("use_crop", self.use_crop),
            ("use_padding_crop", self.use_padding_crop)
        ]
        .iter()
        .filter(|(_, on)| *on)
        .map(|(name, _)| *name)
        .collect();

        if selected.len() > 1 {
            return Err(Error::ConflictingModes(selected));
        }

        Ok(if self.use_resize {
            Restore::Resize
        }
        else if self.use_padding_crop {
            Restore::PaddingCrop
        }
        else {
            Restore::None
        })
    }
}
