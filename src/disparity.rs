//! # General disparity objects
//!
//! This module provides the per-image disparity map produced by evaluation, along with the
//! conversions used to restore it to native resolution and to export it.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::path::Path;

use image::{imageops, GrayImage, ImageBuffer, Luma};
use imageproc::map::map_colors;
use ndarray::{s, Array2, ArrayView2};

use crate::error::*;

// -----------------------------------------------------------------------------------------------
// TYPES
// -----------------------------------------------------------------------------------------------

/// Single channel floating point image buffer.
pub type GrayFloatImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// 16 bit disparity image in the KITTI submission format.
pub type KittiDisparityImage = ImageBuffer<Luma<u16>, Vec<u16>>;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// A generic floating point disparity map, indexed `(row, column)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DisparityMap {
    data: Array2<f32>,
    pub max_disp: Option<f32>,
    pub min_disp: Option<f32>
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl DisparityMap {
    pub fn new(width: usize, height: usize) -> Self {
        DisparityMap {
            data: Array2::zeros((height, width)),
            min_disp: None,
            max_disp: None
        }
    }

    /// Wrap an array and record the observed disparity range.
    pub fn from_array(data: Array2<f32>) -> Self {
        let (min_disp, max_disp) = data.iter()
            .filter(|v| v.is_finite())
            .fold((None, None), |(lo, hi): (Option<f32>, Option<f32>), &v| (
                Some(lo.map_or(v, |lo| lo.min(v))),
                Some(hi.map_or(v, |hi| hi.max(v)))
            ));

        DisparityMap {
            data,
            min_disp,
            max_disp
        }
    }

    pub fn put(&mut self, x: usize, y: usize, val: f32) {
        self.data[[y, x]] = val;
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[[y, x]]
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn view(&self) -> ArrayView2<f32> {
        self.data.view()
    }

    pub fn into_inner(self) -> Array2<f32> {
        self.data
    }

    /// Resample the map to the given size with bilinear interpolation.
    ///
    /// Disparity values are not rescaled.
    pub fn resized(&self, width: usize, height: usize) -> Result<Self> {
        if width == self.width() && height == self.height() {
            return Ok(self.clone());
        }

        let resized = imageops::resize(
            &self.to_float_image()?,
            width as u32,
            height as u32,
            imageops::FilterType::Triangle
        );

        let data = Array2::from_shape_vec((height, width), resized.into_raw())
            .map_err(|_| Error::ShapeMismatch {
                what: "resized disparity map",
                expected: vec![height, width],
                found: vec![]
            })?;

        Ok(Self::from_array(data))
    }

    /// Keep the top-left `width` x `height` region, dropping padding added by the dataset.
    pub fn cropped(&self, width: usize, height: usize) -> Result<Self> {
        if width > self.width() || height > self.height() {
            return Err(Error::ShapeMismatch {
                what: "disparity crop",
                expected: vec![height, width],
                found: vec![self.height(), self.width()]
            });
        }

        Ok(Self::from_array(self.data.slice(s![..height, ..width]).to_owned()))
    }

    /// Converts the map into a floating point image buffer.
    pub fn to_float_image(&self) -> Result<GrayFloatImage> {
        GrayFloatImage::from_raw(
            self.width() as u32,
            self.height() as u32,
            self.data.iter().cloned().collect()
        )
        .ok_or(Error::ShapeMismatch {
            what: "disparity image buffer",
            expected: vec![self.height(), self.width()],
            found: vec![self.data.len()]
        })
    }

    /// Converts the image into a Luma8 image, clamping disparity to `0..=255`.
    pub fn to_luma(&self) -> Result<GrayImage> {
        Ok(map_colors(&self.to_float_image()?, |p| Luma([clamp_u8(p[0])])))
    }

    /// Converts the image to a normalised GrayImage.
    ///
    /// Normalises by the maximum observed disparity in the map. If the maximum disparity is not
    /// set then the function is equivalent to `.to_luma()`.
    pub fn to_luma_normalised(&self) -> Result<GrayImage> {
        let mult = match self.max_disp {
            Some(d) if d > 0.0 => 255.0 / d,
            _ => 1.0
        };

        Ok(map_colors(&self.to_float_image()?, |p| Luma([clamp_u8(p[0] * mult)])))
    }

    /// Converts the map to the KITTI 16 bit format, disparity scaled by 256.
    pub fn to_kitti(&self) -> Result<KittiDisparityImage> {
        Ok(map_colors(&self.to_float_image()?, |p| {
            Luma([(p[0] * 256.0).max(0.0).min(u16::MAX as f32) as u16])
        }))
    }

    /// Writes the map as a KITTI 16 bit PNG.
    pub fn save_kitti_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_kitti()?.save(path)?;
        Ok(())
    }
}

fn clamp_u8(val: f32) -> u8 {
    if val < 0.0 {
        0
    }
    else if val > 255.0 {
        255
    }
    else {
        val as u8
    }
}
