//! # Block matching cost volume
//!
//! A learning-free cost volume model. The score of each disparity hypothesis is a similarity
//! `peak_score / (1 + mad)`, where `mad` is the mean absolute difference between a window around
//! the left pixel and the same window shifted by the disparity in the right image. Scores are
//! positive and a perfect match scores `peak_score`, so the magnitude based confidence and
//! candidate errors read them the same way as network logits. Useful as a baseline and for
//! exercising the evaluation pipeline without trained weights.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use ndarray::{ArrayView3, Axis};
use serde::Deserialize;

use crate::cost_volume::CostVolume;
use crate::error::*;
use crate::profile::CostVolumeModel;
use crate::stereo::StereoBatch;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

pub struct BlockMatching {
    params: Params,
    corr_window_x_range: std::ops::RangeInclusive<isize>,
    corr_window_y_range: std::ops::RangeInclusive<isize>
}

#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    pub max_disparity: usize,
    pub correlation_window_size: (usize, usize),

    /// Score of a perfect match. Larger values sharpen the softmax over disparities.
    #[serde(default = "default_peak_score")]
    pub peak_score: f32
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl BlockMatching {
    /// Create a new instance of the model with the given parameters.
    pub fn new(params: Params) -> Self {
        let semi_width: isize = (params.correlation_window_size.0 as isize - 1) / 2;
        let corr_window_x_range = -semi_width..=semi_width;

        let semi_height: isize = (params.correlation_window_size.1 as isize - 1) / 2;
        let corr_window_y_range = -semi_height..=semi_height;

        Self {
            params,
            corr_window_x_range,
            corr_window_y_range
        }
    }

    /// Calculate the matching score for the given position and disparity.
    ///
    /// Window positions outside the image are clamped to the border.
    fn get_criterion(
        &self,
        left: &ArrayView3<f32>,
        right: &ArrayView3<f32>,
        x: usize,
        y: usize,
        d: usize
    ) -> f32 {
        let (channels, height, width) = left.dim();
        let clamp = |v: isize, len: usize| v.max(0).min(len as isize - 1) as usize;

        let mut acc = 0.0f32;
        let mut count = 0usize;

        for j in self.corr_window_y_range.clone() {
            let yj = clamp(y as isize + j, height);
            for i in self.corr_window_x_range.clone() {
                let xi = clamp(x as isize + i, width);
                let xd = clamp(x as isize + i - d as isize, width);
                for c in 0..channels {
                    acc += (left[[c, yj, xi]] - right[[c, yj, xd]]).abs();
                }
                count += channels;
            }
        }

        let mad = acc / count.max(1) as f32;
        self.params.peak_score / (1.0 + mad)
    }
}

impl CostVolumeModel for BlockMatching {
    fn name(&self) -> &str {
        "BlockMatching"
    }

    fn max_disparity(&self) -> usize {
        self.params.max_disparity
    }

    fn forward(&mut self, pair: &StereoBatch) -> Result<Vec<CostVolume>> {
        let mut cost = CostVolume::zeros(
            pair.batch_size(),
            self.params.max_disparity,
            pair.height(),
            pair.width()
        );

        let left = pair.left();
        let right = pair.right();

        {
            let mut data = cost.data_mut();
            for b in 0..pair.batch_size() {
                let left_b = left.index_axis(Axis(0), b);
                let right_b = right.index_axis(Axis(0), b);

                for d in 0..self.params.max_disparity {
                    for y in 0..pair.height() {
                        for x in 0..pair.width() {
                            data[[b, d, y, x]] = self.get_criterion(&left_b, &right_b, x, y, d);
                        }
                    }
                }
            }
        }

        Ok(vec![cost])
    }
}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

fn default_peak_score() -> f32 {
    100.0
}
