//! # Candidate error diagnostics
//!
//! Flags pixels whose second best disparity peak is nearly as strong as the best one, and
//! optionally acts on them.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use ndarray::{Array3, Array4, Axis, Zip};
use serde::{Deserialize, Serialize};

use crate::cost_volume::{lane_argmax, CostVolume};
use crate::error::*;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct CandidateParams {
    /// Replace the chosen peak by the second candidate where both errors exceed the adjustment
    /// thresholds.
    pub adjustment: bool,

    /// Zero the prediction where either error exceeds the deletion thresholds.
    pub deletion: bool,

    pub adjust_candidate_threshold: f32,
    pub adjust_confidence_threshold: f32,
    pub delete_candidate_threshold: f32,
    pub delete_confidence_threshold: f32
}

/// Second best peak outside the squeeze window of the best one.
#[derive(Debug, Clone)]
pub struct Candidates {
    pub first: Array3<usize>,
    pub second: Array3<usize>,

    /// `|c2| / (|c1| + |c2|)` of the two peak scores.
    pub error: Array3<f32>
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl Default for CandidateParams {
    fn default() -> Self {
        Self {
            adjustment: false,
            deletion: false,
            adjust_candidate_threshold: 0.8,
            adjust_confidence_threshold: 0.3,
            delete_candidate_threshold: 0.4,
            delete_confidence_threshold: 0.3
        }
    }
}

impl CandidateParams {
    pub fn validate(&self) -> Result<()> {
        let thresholds = [
            ("adjust_candidate_threshold", self.adjust_candidate_threshold),
            ("adjust_confidence_threshold", self.adjust_confidence_threshold),
            ("delete_candidate_threshold", self.delete_candidate_threshold),
            ("delete_confidence_threshold", self.delete_confidence_threshold)
        ];

        for (name, value) in thresholds.iter() {
            if !(0.0..=1.0).contains(value) {
                return Err(Error::InvalidParams(format!(
                    "{} must lie in [0, 1], got {}", name, value
                )));
            }
        }

        Ok(())
    }

    /// Pixels where the second candidate should replace the first.
    pub fn adjustment_mask(&self, candidate_error: &Array3<f32>, confidence_error: &Array3<f32>) -> Array3<bool> {
        let mut mask = Array3::from_elem(candidate_error.raw_dim(), false);

        Zip::from(&mut mask)
            .and(candidate_error)
            .and(confidence_error)
            .for_each(|m, &cand, &conf| {
                *m = cand > self.adjust_candidate_threshold && conf > self.adjust_confidence_threshold;
            });

        mask
    }

    /// Zero the disparity in pixels that are ambiguous by either measure.
    pub fn delete_ambiguous(
        &self,
        disparity: &mut Array3<f32>,
        candidate_error: &Array3<f32>,
        confidence_error: &Array3<f32>
    ) -> usize {
        let mut deleted = 0;

        Zip::from(disparity)
            .and(candidate_error)
            .and(confidence_error)
            .for_each(|d, &cand, &conf| {
                if cand > self.delete_candidate_threshold || conf > self.delete_confidence_threshold {
                    *d = 0.0;
                    deleted += 1;
                }
            });

        deleted
    }
}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Find the best and second best peaks of `cost`, the second searched outside `squeeze_mask`.
///
/// A pixel whose window covers every hypothesis has no second candidate; it reports the first
/// candidate twice and zero candidate error.
pub fn find_candidates(cost: &CostVolume, squeeze_mask: &Array4<bool>) -> Candidates {
    let dim = (cost.batch_size(), cost.height(), cost.width());
    let mut first = Array3::zeros(dim);
    let mut second = Array3::zeros(dim);
    let mut error = Array3::zeros(dim);

    Zip::from(&mut first)
        .and(&mut second)
        .and(&mut error)
        .and(cost.data().lanes(Axis(1)))
        .and(squeeze_mask.lanes(Axis(1)))
        .for_each(|c1, c2, err, lane, mask_lane| {
            *c1 = lane_argmax(lane);

            let runner_up = lane.iter()
                .zip(mask_lane.iter())
                .enumerate()
                .filter(|(_, (_, masked))| !**masked)
                .fold(None, |best: Option<(usize, f32)>, (d, (&v, _))| match best {
                    Some((_, bv)) if bv >= v => best,
                    _ => Some((d, v))
                });

            match runner_up {
                Some((d, v)) => {
                    *c2 = d;
                    let best = lane[*c1].abs();
                    let denom = best + v.abs();
                    *err = if denom > 0.0 { v.abs() / denom } else { 0.0 };
                }
                None => {
                    *c2 = *c1;
                    *err = 0.0;
                }
            }
        });

    Candidates { first, second, error }
}

/// Replace `center` by the second candidate wherever `mask` is set.
pub fn adjust_centers(center: &Array3<usize>, second: &Array3<usize>, mask: &Array3<bool>) -> Array3<usize> {
    let mut out = center.clone();

    Zip::from(&mut out)
        .and(second)
        .and(mask)
        .for_each(|c, &c2, &m| {
            if m {
                *c = c2;
            }
        });

    out
}
