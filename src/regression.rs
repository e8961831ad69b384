//! # Disparity regression
//!
//! Converts cost volumes into continuous disparity. The main method is squeeze regression: the
//! softmax distribution is restricted to a window around its arg-max bin and the expected
//! disparity over that window is taken, which keeps multi-modal distributions from averaging two
//! peaks into a value that matches neither.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use ndarray::{Array3, Array4, ArrayView1, ArrayViewMut1, Axis, Zip};
use serde::{Deserialize, Serialize};

use crate::cost_volume::CostVolume;

// -----------------------------------------------------------------------------------------------
// ENUMERATIONS
// -----------------------------------------------------------------------------------------------

/// How the final disparity is produced from a cost volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regression {
    /// Integer arg-max bin, no sub-pixel refinement.
    ArgMax,
    /// Softmax expectation restricted to the squeeze window.
    Squeeze,
    /// Softmax expectation over the full disparity range.
    Expectation
}

/// Shape of the window kept around the arg-max bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Squeeze {
    /// Keep `[argmax - radius, argmax + radius]`, truncated at the ends of the range.
    Window { radius: usize },
    /// Keep the bins around the arg-max over which probability decreases monotonically.
    Gradient
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl Default for Regression {
    fn default() -> Self {
        Regression::Squeeze
    }
}

impl Default for Squeeze {
    fn default() -> Self {
        Squeeze::Window { radius: 2 }
    }
}

impl Squeeze {
    /// Inclusive bin range kept around `center` in a lane of probabilities.
    fn bounds(&self, lane: ArrayView1<f32>, center: usize) -> (usize, usize) {
        let last = lane.len() - 1;
        let center = center.min(last);

        match *self {
            Squeeze::Window { radius } => (
                center.saturating_sub(radius),
                (center + radius).min(last)
            ),
            Squeeze::Gradient => {
                let mut lo = center;
                while lo > 0 && lane[lo - 1] <= lane[lo] {
                    lo -= 1;
                }

                let mut hi = center;
                while hi < last && lane[hi + 1] <= lane[hi] {
                    hi += 1;
                }

                (lo, hi)
            }
        }
    }
}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Integer arg-max disparity as floating point.
pub fn argmax_disparity(cost: &CostVolume) -> Array3<f32> {
    cost.argmax().mapv(|d| d as f32)
}

/// Mask of the bins kept by the squeeze window around each pixel's `center` bin.
///
/// `prob` is expected to already be a softmax distribution; the gradient mode walks it.
pub fn squeeze_mask(prob: &CostVolume, center: &Array3<usize>, squeeze: Squeeze) -> Array4<bool> {
    let mut mask = Array4::from_elem(prob.data().raw_dim(), false);

    Zip::from(mask.lanes_mut(Axis(1)))
        .and(prob.data().lanes(Axis(1)))
        .and(center)
        .for_each(|mut mask_lane: ArrayViewMut1<bool>, lane, &c| {
            let (lo, hi) = squeeze.bounds(lane, c);
            for d in lo..=hi {
                mask_lane[d] = true;
            }
        });

    mask
}

/// Expected disparity over the masked bins, renormalised so that the result is a convex
/// combination of the kept disparity indices.
///
/// Pixels whose kept mass is zero fall back to the lowest kept bin.
pub fn squeeze_regress(prob: &CostVolume, mask: &Array4<bool>) -> Array3<f32> {
    let data = prob.data();
    let mut out = Array3::zeros((prob.batch_size(), prob.height(), prob.width()));

    Zip::from(&mut out)
        .and(data.lanes(Axis(1)))
        .and(mask.lanes(Axis(1)))
        .for_each(|disp, lane, mask_lane| {
            let mut mass = 0.0f32;
            let mut weighted = 0.0f32;
            let mut first = None;

            for (d, (&p, &keep)) in lane.iter().zip(mask_lane.iter()).enumerate() {
                if !keep {
                    continue;
                }
                first.get_or_insert(d);
                mass += p;
                weighted += p * d as f32;
            }

            *disp = if mass > 0.0 {
                weighted / mass
            }
            else {
                first.unwrap_or(0) as f32
            };
        });

    out
}

/// Softmax expectation over the full disparity range.
pub fn expectation(prob: &CostVolume) -> Array3<f32> {
    let mut out = Array3::zeros((prob.batch_size(), prob.height(), prob.width()));

    Zip::from(&mut out)
        .and(prob.data().lanes(Axis(1)))
        .for_each(|disp, lane| {
            let mass = lane.sum();
            let weighted: f32 = lane.iter()
                .enumerate()
                .map(|(d, &p)| p * d as f32)
                .sum();
            *disp = if mass > 0.0 { weighted / mass } else { 0.0 };
        });

    out
}

/// Squeeze regression of a raw cost volume around the given centre bins.
///
/// Returns the squeeze mask alongside the disparity so that callers can look for competing
/// peaks outside the window.
pub fn squeeze_disparity(
    cost: &CostVolume,
    center: &Array3<usize>,
    squeeze: Squeeze
) -> (Array4<bool>, Array3<f32>) {
    let prob = cost.softmax();
    let mask = squeeze_mask(&prob, center, squeeze);
    let disp = squeeze_regress(&prob, &mask);

    (mask, disp)
}
