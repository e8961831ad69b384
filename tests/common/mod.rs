//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;

use cv_costvol::prelude::*;
use ndarray::{Array3, Array4};

/// Texture whose values never repeat along a row within 251 pixels, in every channel.
pub fn texture(x: usize, y: usize, c: usize) -> f32 {
    ((x * 7919 + y * 104_729 + c * 1_299_709) % 251) as f32 * 20.0
}

/// Stereo pair where the right image is the left one shifted by `shift` pixels, so the true
/// disparity is `shift` everywhere.
pub fn shifted_sample(width: usize, height: usize, shift: usize) -> Sample {
    let left = Array4::from_shape_fn((1, 3, height, width), |(_, c, y, x)| texture(x, y, c));
    let right = Array4::from_shape_fn((1, 3, height, width), |(_, c, y, x)| texture(x + shift, y, c));
    let gt = Array3::from_elem((1, height, width), shift as f32);

    Sample::new(StereoBatch::from_pair(left, right).unwrap(), gt)
}

/// Blank stereo batch of the given geometry.
pub fn blank_pair(batch: usize, height: usize, width: usize) -> StereoBatch {
    let img = Array4::zeros((batch, 3, height, width));
    StereoBatch::from_pair(img.clone(), img).unwrap()
}

/// Cost volume with `peak` at disparity `d` of every pixel and zero elsewhere.
pub fn peaked_cost(batch: usize, max_disparity: usize, height: usize, width: usize, d: usize, peak: f32) -> CostVolume {
    CostVolume::new(Array4::from_shape_fn(
        (batch, max_disparity, height, width),
        |(_, k, _, _)| if k == d { peak } else { 0.0 }
    ))
    .unwrap()
}

/// Model replaying prepared outputs, one entry per forward call.
pub struct ScriptedModel {
    pub max_disparity: usize,
    pub outputs: VecDeque<Vec<CostVolume>>
}

impl ScriptedModel {
    pub fn new(max_disparity: usize, outputs: Vec<Vec<CostVolume>>) -> Self {
        Self {
            max_disparity,
            outputs: outputs.into()
        }
    }
}

impl CostVolumeModel for ScriptedModel {
    fn name(&self) -> &str {
        "Scripted"
    }

    fn max_disparity(&self) -> usize {
        self.max_disparity
    }

    fn forward(&mut self, _pair: &StereoBatch) -> Result<Vec<CostVolume>> {
        self.outputs
            .pop_front()
            .ok_or_else(|| Error::Model("script exhausted".to_string()))
    }
}
