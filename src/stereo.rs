//! # Stereo inputs
//!
//! Stereo batches as consumed by cost volume models, and the samples a dataset yields.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use ndarray::{concatenate, s, Array3, Array4, ArrayView4, Axis};
use serde::{Deserialize, Serialize};

use crate::error::*;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// A batch of stereo pairs, left and right images concatenated along the channel axis.
///
/// Layout is `(batch, 6, height, width)`: channels `0..3` hold the left image and `3..6` the
/// right image.
#[derive(Debug, Clone)]
pub struct StereoBatch {
    data: Array4<f32>
}

/// Native dimensions of an image before the dataset cropped, resized or padded it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassInfo {
    pub original_width: usize,
    pub original_height: usize
}

/// One batch yielded by a dataset.
#[derive(Debug, Clone)]
pub struct Sample {
    pub pair: StereoBatch,

    /// Ground truth disparity, `(batch, height, width)`. Zero marks unknown pixels.
    pub ground_truth: Array3<f32>,

    /// Either empty or one entry per image in the batch.
    pub pass_info: Vec<PassInfo>
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl StereoBatch {
    /// Build a batch from left and right images of shape `(batch, 3, height, width)`.
    pub fn from_pair(left: Array4<f32>, right: Array4<f32>) -> Result<Self> {
        if left.shape() != right.shape() {
            return Err(Error::ShapeMismatch {
                what: "stereo pair",
                expected: left.shape().to_vec(),
                found: right.shape().to_vec()
            });
        }
        if left.shape()[1] != 3 {
            return Err(Error::ShapeMismatch {
                what: "stereo image channels",
                expected: vec![3],
                found: vec![left.shape()[1]]
            });
        }

        let data = concatenate(Axis(1), &[left.view(), right.view()])
            .map_err(|e| Error::InvalidParams(e.to_string()))?;

        Ok(Self { data })
    }

    /// Wrap an already concatenated `(batch, 6, height, width)` array.
    pub fn from_concatenated(data: Array4<f32>) -> Result<Self> {
        if data.shape()[1] != 6 {
            return Err(Error::ShapeMismatch {
                what: "stereo batch channels",
                expected: vec![6],
                found: vec![data.shape()[1]]
            });
        }

        Ok(Self { data })
    }

    pub fn data(&self) -> ArrayView4<f32> {
        self.data.view()
    }

    pub fn left(&self) -> ArrayView4<f32> {
        self.data.slice(s![.., 0..3, .., ..])
    }

    pub fn right(&self) -> ArrayView4<f32> {
        self.data.slice(s![.., 3..6, .., ..])
    }

    pub fn batch_size(&self) -> usize {
        self.data.shape()[0]
    }

    pub fn height(&self) -> usize {
        self.data.shape()[2]
    }

    pub fn width(&self) -> usize {
        self.data.shape()[3]
    }

    /// The input of the right pass: both images mirrored horizontally and swapped, so that the
    /// right image becomes the reference view.
    pub fn flipped(&self) -> Self {
        let mut data = Array4::zeros(self.data.raw_dim());
        data.slice_mut(s![.., 0..3, .., ..])
            .assign(&self.data.slice(s![.., 3..6, .., ..;-1]));
        data.slice_mut(s![.., 3..6, .., ..])
            .assign(&self.data.slice(s![.., 0..3, .., ..;-1]));

        Self { data }
    }
}

impl Sample {
    pub fn new(pair: StereoBatch, ground_truth: Array3<f32>) -> Self {
        Self {
            pair,
            ground_truth,
            pass_info: Vec::new()
        }
    }

    pub fn with_pass_info(mut self, pass_info: Vec<PassInfo>) -> Self {
        self.pass_info = pass_info;
        self
    }
}
