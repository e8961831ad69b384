//! # Cost volumes
//!
//! A cost volume holds one unnormalised matching score per pixel and disparity hypothesis, laid
//! out as `(batch, disparity, height, width)`. Higher scores are better matches.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use ndarray::{s, Array3, Array4, ArrayView1, ArrayView4, ArrayViewMut4, Axis, Zip};

use crate::error::*;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CostVolume {
    data: Array4<f32>
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl CostVolume {
    pub fn new(data: Array4<f32>) -> Result<Self> {
        if data.shape()[1] == 0 {
            return Err(Error::ShapeMismatch {
                what: "cost volume disparity axis",
                expected: vec![1],
                found: vec![0]
            });
        }

        Ok(Self { data })
    }

    pub fn zeros(batch: usize, max_disparity: usize, height: usize, width: usize) -> Self {
        Self {
            data: Array4::zeros((batch, max_disparity, height, width))
        }
    }

    pub fn data(&self) -> ArrayView4<f32> {
        self.data.view()
    }

    pub fn data_mut(&mut self) -> ArrayViewMut4<f32> {
        self.data.view_mut()
    }

    pub fn into_inner(self) -> Array4<f32> {
        self.data
    }

    pub fn batch_size(&self) -> usize {
        self.data.shape()[0]
    }

    /// Number of disparity hypotheses, `D`.
    pub fn max_disparity(&self) -> usize {
        self.data.shape()[1]
    }

    pub fn height(&self) -> usize {
        self.data.shape()[2]
    }

    pub fn width(&self) -> usize {
        self.data.shape()[3]
    }

    pub fn shape(&self) -> [usize; 4] {
        [self.batch_size(), self.max_disparity(), self.height(), self.width()]
    }

    /// Mirror the volume across the image width.
    ///
    /// Column `c` of the result holds column `W - 1 - c` of the input for every disparity, which
    /// brings a right pass computed on mirrored images back into the left frame of reference.
    pub fn flip_width(&self) -> Self {
        Self {
            data: self.data.slice(s![.., .., .., ..;-1]).to_owned()
        }
    }

    /// Index of the best disparity for each pixel, `(batch, height, width)`.
    ///
    /// Ties resolve to the lowest disparity.
    pub fn argmax(&self) -> Array3<usize> {
        let mut out = Array3::zeros(self.pixel_dim());

        Zip::from(&mut out)
            .and(self.data.lanes(Axis(1)))
            .for_each(|idx, lane| *idx = lane_argmax(lane));

        out
    }

    /// Gather the score at the given disparity index for each pixel.
    pub fn select(&self, index: &Array3<usize>) -> Array3<f32> {
        let mut out = Array3::zeros(self.pixel_dim());

        Zip::from(&mut out)
            .and(index)
            .and(self.data.lanes(Axis(1)))
            .for_each(|val, &d, lane| *val = lane[d]);

        out
    }

    /// Normalise each pixel's scores into a probability distribution over disparity.
    pub fn softmax(&self) -> Self {
        let mut data = self.data.clone();

        for mut lane in data.lanes_mut(Axis(1)) {
            let max = lane.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
            lane.mapv_inplace(|v| (v - max).exp());
            let sum = lane.sum();
            if sum > 0.0 {
                lane.mapv_inplace(|v| v / sum);
            }
        }

        Self { data }
    }

    /// Check that the volume covers the given batch geometry and disparity range.
    pub fn check_shape(
        &self,
        what: &'static str,
        batch: usize,
        max_disparity: usize,
        height: usize,
        width: usize
    ) -> Result<()> {
        let expected = [batch, max_disparity, height, width];
        if self.shape() != expected {
            return Err(Error::ShapeMismatch {
                what,
                expected: expected.to_vec(),
                found: self.shape().to_vec()
            });
        }

        Ok(())
    }

    fn pixel_dim(&self) -> (usize, usize, usize) {
        (self.batch_size(), self.height(), self.width())
    }
}

/// Index of the first maximum in a disparity lane.
pub(crate) fn lane_argmax(lane: ArrayView1<f32>) -> usize {
    lane.iter()
        .enumerate()
        .fold(0, |max_idx, (idx, &val)| {
            if val > lane[max_idx] {
                idx
            }
            else {
                max_idx
            }
        })
}
