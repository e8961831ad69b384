//! # Evaluation profiles
//!
//! A profile wraps a cost volume model together with the strategies used to turn its output into
//! disparity: flip merging, the regression method, candidate diagnostics and restoration to the
//! native image size.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::path::Path;

use log::debug;
use ndarray::{Array3, Axis, Zip};

use crate::candidate::{self, CandidateParams};
use crate::checkpoint::VersionStore;
use crate::config::EvalParams;
use crate::cost_volume::CostVolume;
use crate::disparity::DisparityMap;
use crate::error::*;
use crate::merge::{self, MergedCost};
use crate::metrics::{self, BatchMetrics, Dataset, ErrorCounts};
use crate::regression::{self, Regression, Squeeze};
use crate::stereo::{PassInfo, Sample, StereoBatch};

// -----------------------------------------------------------------------------------------------
// TRAITS
// -----------------------------------------------------------------------------------------------

/// A network (or any other matcher) producing cost volumes from stereo batches.
pub trait CostVolumeModel {
    /// Name used for checkpoint directories and reports.
    fn name(&self) -> &str;

    /// Number of disparity hypotheses in every produced cost volume.
    fn max_disparity(&self) -> usize;

    /// Compute one or more cost volumes, `(batch, max_disparity, height, width)`, for the batch.
    ///
    /// Models with several heads return them coarsest first; evaluation uses the last one.
    fn forward(&mut self, pair: &StereoBatch) -> Result<Vec<CostVolume>>;

    /// Load serialised weights from a checkpoint.
    fn load_weights(&mut self, _weights: &[u8]) -> Result<()> {
        Ok(())
    }
}

// -----------------------------------------------------------------------------------------------
// ENUMERATIONS
// -----------------------------------------------------------------------------------------------

/// How predictions are mapped back to the original image size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restore {
    None,
    /// Bilinear resize to the original size.
    Resize,
    /// Keep the top-left original-size region.
    PaddingCrop
}

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

pub struct Profile {
    model: Box<dyn CostVolumeModel>,
    pub merge: bool,
    pub regression: Regression,
    pub squeeze: Squeeze,
    pub candidate: Option<CandidateParams>,
    pub restore: Restore,

    /// Keep the per-hypothesis confidence error volume in the output.
    pub confidence_error_cost: bool
}

/// Result of evaluating one batch.
#[derive(Debug, Clone)]
pub struct EvalOutput {
    pub metrics: BatchMetrics,

    /// Final prediction of every image, restored to native size if requested.
    pub disparity: Vec<DisparityMap>,

    pub cost_left: CostVolume,
    pub flip_cost: Option<CostVolume>,
    pub cost_merge: Option<CostVolume>,
    pub confidence_error: Option<Array3<f32>>,
    pub confidence_error_cost: Option<CostVolume>,
    pub candidate_error: Option<Array3<f32>>
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl Profile {
    /// Wrap a model with the default strategies: flip merging and window squeeze regression.
    pub fn new(model: Box<dyn CostVolumeModel>) -> Result<Self> {
        if model.name().contains('-') {
            return Err(Error::InvalidProfileName(model.name().to_string()));
        }
        if model.max_disparity() == 0 {
            return Err(Error::InvalidParams("max_disparity must be positive".to_string()));
        }

        Ok(Self {
            model,
            merge: true,
            regression: Regression::default(),
            squeeze: Squeeze::default(),
            candidate: None,
            restore: Restore::None,
            confidence_error_cost: false
        })
    }

    /// Wrap a model with the strategies selected in `params`.
    pub fn from_params(model: Box<dyn CostVolumeModel>, params: &EvalParams) -> Result<Self> {
        params.validate()?;

        if model.max_disparity() != params.max_disparity {
            return Err(Error::InvalidParams(format!(
                "model {} produces {} disparities but {} were configured",
                model.name(), model.max_disparity(), params.max_disparity
            )));
        }

        let mut profile = Self::new(model)?;
        profile.merge = params.merge_cost;
        profile.regression = params.regression;
        profile.squeeze = params.squeeze;
        profile.candidate = params.candidate;
        profile.restore = params.restore()?;
        profile.confidence_error_cost = params.use_confidence_error_cost;

        Ok(profile)
    }

    pub fn name(&self) -> &str {
        self.model.name()
    }

    pub fn max_disparity(&self) -> usize {
        self.model.max_disparity()
    }

    /// Open this profile's checkpoint directory under `root`.
    pub fn version_store<P: AsRef<Path>>(&self, root: P) -> Result<VersionStore> {
        VersionStore::new(root, self.name())
    }

    /// Load model weights from a checkpoint store and return the next version number.
    pub fn load_model(&mut self, store: &VersionStore, version: Option<u32>) -> Result<u32> {
        let (next, weights) = store.load_weights(version)?;
        if let Some(weights) = weights {
            self.model.load_weights(&weights)?;
        }

        Ok(next)
    }

    /// Load the checkpoint version selected in `params` from this profile's directory under
    /// `root`, the latest one when no version is set.
    pub fn load_checkpoint<P: AsRef<Path>>(&mut self, root: P, params: &EvalParams) -> Result<u32> {
        let store = self.version_store(root)?;
        self.load_model(&store, params.version)
    }

    /// Evaluate one batch against its ground truth.
    ///
    /// Candidate adjustment only touches the pixels it selects. Those are re-regressed around
    /// their second candidate: as the bin itself for arg-max regression, otherwise with the
    /// squeeze window, since a full expectation has no centre to move.
    pub fn eval(&mut self, sample: &Sample, dataset: Dataset) -> Result<EvalOutput> {
        let max_disparity = self.max_disparity();
        let batch = sample.pair.batch_size();

        if sample.ground_truth.shape()[0] != batch {
            return Err(Error::ShapeMismatch {
                what: "ground truth batch",
                expected: vec![batch],
                found: vec![sample.ground_truth.shape()[0]]
            });
        }

        // ---- COST ----

        let cost_left = self.cost(&sample.pair)?;

        let merged: Option<(CostVolume, MergedCost)> = if self.merge {
            let cost_right = self.cost(&sample.pair.flipped())?;
            let flip_cost = cost_right.flip_width();
            let merged = merge::merge_with_confidence(
                &cost_left,
                &flip_cost,
                max_disparity,
                self.confidence_error_cost
            );
            debug!("Mean confidence error: {:?}", merged.mean_confidence_error);
            Some((flip_cost, merged))
        }
        else {
            None
        };

        let working = match &merged {
            Some((_, m)) => &m.merged,
            None => &cost_left
        };

        // ---- REGRESSION ----

        let center = working.argmax();
        let (squeeze_mask, mut disp) = match self.regression {
            Regression::ArgMax => (None, center.mapv(|d| d as f32)),
            Regression::Squeeze => {
                let (mask, disp) = regression::squeeze_disparity(working, &center, self.squeeze);
                (Some(mask), disp)
            }
            Regression::Expectation => (None, regression::expectation(&working.softmax()))
        };

        // ---- CANDIDATES ----

        let candidate_error = match (&self.candidate, &merged) {
            (Some(params), Some((_, m))) => {
                let mask = match squeeze_mask {
                    Some(mask) => mask,
                    None => regression::squeeze_mask(&working.softmax(), &center, self.squeeze)
                };
                let candidates = candidate::find_candidates(working, &mask);

                if params.adjustment {
                    let adjust = params.adjustment_mask(&candidates.error, &m.confidence_error);
                    let centers = candidate::adjust_centers(&center, &candidates.second, &adjust);
                    let adjusted = match self.regression {
                        Regression::ArgMax => centers.mapv(|d| d as f32),
                        Regression::Squeeze | Regression::Expectation => {
                            regression::squeeze_disparity(working, &centers, self.squeeze).1
                        }
                    };

                    Zip::from(&mut disp)
                        .and(&adjusted)
                        .and(&adjust)
                        .for_each(|d, &a, &selected| {
                            if selected {
                                *d = a;
                            }
                        });
                    debug!("Adjusted {} predictions", adjust.iter().filter(|&&selected| selected).count());
                }

                if params.deletion {
                    let deleted = params.delete_ambiguous(
                        &mut disp,
                        &candidates.error,
                        &m.confidence_error
                    );
                    debug!("Deleted {} ambiguous predictions", deleted);
                }

                Some(candidates.error)
            }
            _ => None
        };

        // ---- EVALUATION ----

        let disparity = self.restore_maps(&disp, &sample.pass_info)?;

        let predicate = dataset.error_predicate();
        let mut counts = ErrorCounts::default();
        for (b, map) in disparity.iter().enumerate() {
            let gt = sample.ground_truth.index_axis(Axis(0), b);
            if gt.dim() != map.view().dim() {
                return Err(Error::ShapeMismatch {
                    what: "ground truth",
                    expected: vec![map.height(), map.width()],
                    found: gt.shape().to_vec()
                });
            }

            let valid = metrics::valid_mask(gt, max_disparity);
            counts += metrics::score(map.view(), gt, valid.view(), predicate);
        }

        let (flip_cost, merged) = match merged {
            Some((f, m)) => (Some(f), Some(m)),
            None => (None, None)
        };

        let metrics = BatchMetrics {
            epe: counts.epe(),
            error_count: counts.error_count,
            valid_count: counts.valid_count,
            mean_confidence_error: merged.as_ref().and_then(|m| m.mean_confidence_error)
        };

        let (cost_merge, confidence_error, confidence_error_cost) = match merged {
            Some(m) => (Some(m.merged), Some(m.confidence_error), m.confidence_error_cost),
            None => (None, None, None)
        };

        Ok(EvalOutput {
            metrics,
            disparity,
            cost_left,
            flip_cost,
            cost_merge,
            confidence_error,
            confidence_error_cost,
            candidate_error
        })
    }

    /// Run the model and keep its final head, checked against the batch geometry.
    fn cost(&mut self, pair: &StereoBatch) -> Result<CostVolume> {
        let cost = self.model
            .forward(pair)?
            .pop()
            .ok_or_else(|| Error::Model(format!("{} produced no cost volume", self.name())))?;

        cost.check_shape(
            "cost volume",
            pair.batch_size(),
            self.max_disparity(),
            pair.height(),
            pair.width()
        )?;

        Ok(cost)
    }

    /// Split a disparity batch into maps and restore each to its native size.
    fn restore_maps(&self, disp: &Array3<f32>, pass_info: &[PassInfo]) -> Result<Vec<DisparityMap>> {
        let batch = disp.shape()[0];
        if self.restore != Restore::None && pass_info.len() != batch {
            return Err(Error::MissingPassInfo(batch));
        }

        disp.axis_iter(Axis(0))
            .enumerate()
            .map(|(b, d)| {
                let map = DisparityMap::from_array(d.to_owned());
                match self.restore {
                    Restore::None => Ok(map),
                    Restore::Resize => map.resized(
                        pass_info[b].original_width,
                        pass_info[b].original_height
                    ),
                    Restore::PaddingCrop => map.cropped(
                        pass_info[b].original_width,
                        pass_info[b].original_height
                    )
                }
            })
            .collect()
    }
}
