//! # Cost merging and confidence estimation
//!
//! A right pass computed on mirrored, swapped images gives a second, independently matched cost
//! volume. Where the two agree the match is trustworthy; where they diverge (occlusions,
//! textureless areas) the confidence error is high.
//!
//! Columns closer to the left edge than `max_disparity` have no valid correspondence in the right
//! pass. They keep the left cost unmerged and always report zero confidence error.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use ndarray::{s, Array3, Zip};

use crate::cost_volume::CostVolume;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Everything derived from a left pass and its flipped right pass.
#[derive(Debug, Clone)]
pub struct MergedCost {
    /// Left cost with columns from `max_disparity` onwards averaged with the flipped right cost.
    pub merged: CostVolume,

    /// Per pixel confidence error at the left arg-max, `(batch, height, width)`.
    pub confidence_error: Array3<f32>,

    /// Confidence error of every disparity hypothesis, only kept when requested.
    pub confidence_error_cost: Option<CostVolume>,

    /// Mean confidence error over the comparable columns, `None` if there are none.
    pub mean_confidence_error: Option<f32>
}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Merge a left cost volume with a right pass that has already been flipped into the left frame.
pub fn merge_costs(left: &CostVolume, flipped_right: &CostVolume, max_disparity: usize) -> CostVolume {
    let mut merged = left.clone();
    let start = max_disparity.min(left.width());

    {
        let mut data = merged.data_mut();
        let mut tail = data.slice_mut(s![.., .., .., start..]);
        let right = flipped_right.data();
        tail.zip_mut_with(&right.slice(s![.., .., .., start..]), |l, &r| *l = (*l + r) / 2.0);
    }

    merged
}

/// Normalised divergence `|L - F| / (|L| + |L - F|)` for every hypothesis, in `[0, 1]`.
pub fn confidence_error_volume(left: &CostVolume, flipped_right: &CostVolume) -> CostVolume {
    let mut out = left.clone();

    Zip::from(out.data_mut())
        .and(flipped_right.data())
        .for_each(|l, &r| *l = normalised_divergence(*l, r));

    out
}

/// Confidence error map selected at the arg-max of the unmerged left cost.
///
/// Also returns the full per-hypothesis volume the map was selected from.
pub fn confidence_error(
    left: &CostVolume,
    flipped_right: &CostVolume,
    max_disparity: usize
) -> (Array3<f32>, CostVolume) {
    let volume = confidence_error_volume(left, flipped_right);
    let mut map = volume.select(&left.argmax());
    clear_left_edge(&mut map, max_disparity);

    (map, volume)
}

/// Confidence error map only, evaluated at the left arg-max without building the full volume.
pub fn confidence_error_map(
    left: &CostVolume,
    flipped_right: &CostVolume,
    max_disparity: usize
) -> Array3<f32> {
    let center = left.argmax();
    let left_best = left.select(&center);
    let mut map = flipped_right.select(&center);

    Zip::from(&mut map)
        .and(&left_best)
        .for_each(|f, &l| *f = normalised_divergence(l, *f));
    clear_left_edge(&mut map, max_disparity);

    map
}

/// Mean of the confidence error map over columns at or beyond `max_disparity`.
pub fn mean_confidence_error(map: &Array3<f32>, max_disparity: usize) -> Option<f32> {
    if map.shape()[2] <= max_disparity {
        return None;
    }

    map.slice(s![.., .., max_disparity..]).mean()
}

/// Flip-merge a left pass with its right pass and derive the confidence diagnostics.
///
/// The per-hypothesis confidence error volume is only built when `keep_volume` is set.
pub fn merge_with_confidence(
    left: &CostVolume,
    flipped_right: &CostVolume,
    max_disparity: usize,
    keep_volume: bool
) -> MergedCost {
    let merged = merge_costs(left, flipped_right, max_disparity);
    let (confidence_error, confidence_error_cost) = if keep_volume {
        let (map, volume) = confidence_error(left, flipped_right, max_disparity);
        (map, Some(volume))
    }
    else {
        (confidence_error_map(left, flipped_right, max_disparity), None)
    };
    let mean_confidence_error = mean_confidence_error(&confidence_error, max_disparity);

    MergedCost {
        merged,
        confidence_error,
        confidence_error_cost,
        mean_confidence_error
    }
}

fn normalised_divergence(l: f32, r: f32) -> f32 {
    let diff = (l - r).abs();
    let denom = l.abs() + diff;
    if denom > 0.0 { diff / denom } else { 0.0 }
}

fn clear_left_edge(map: &mut Array3<f32>, max_disparity: usize) {
    let edge = max_disparity.min(map.shape()[2]);
    map.slice_mut(s![.., .., ..edge]).fill(0.0);
}
