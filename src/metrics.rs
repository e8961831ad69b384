//! # Evaluation metrics
//!
//! Ground truth validity, end-point error and the dataset specific error rate rules, plus the
//! accumulator that turns per-batch results into a run summary.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2, ArrayView2, Zip};

use crate::error::*;

// -----------------------------------------------------------------------------------------------
// ENUMERATIONS
// -----------------------------------------------------------------------------------------------

/// Dataset families known to the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    FlyingThings3D,
    Kitti2015,
    Kitti2015Benchmark,
    Kitti2015Augmentation,
    Kitti2012Augmentation,
    AerialImagery
}

/// Rule deciding whether a predicted disparity counts as an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ErrorPredicate {
    /// `|pred - gt| >= threshold`
    Absolute { threshold: f32 },

    /// `|pred - gt| >= absolute AND |pred - gt| / |gt| >= relative`
    AbsoluteAndRelative { absolute: f32, relative: f32 }
}

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Counts for one image or batch.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ErrorCounts {
    /// Sum of absolute errors over valid pixels.
    pub abs_error_sum: f64,
    pub error_count: usize,
    pub valid_count: usize
}

/// Metrics of one evaluated batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchMetrics {
    /// Mean end-point error over valid pixels. NaN when no pixel is valid.
    pub epe: f32,
    pub error_count: usize,
    pub valid_count: usize,
    pub mean_confidence_error: Option<f32>
}

/// Accumulates batch metrics across a run.
#[derive(Debug, Clone, Default)]
pub struct RunMetrics {
    losses: Vec<f32>,
    error_count: usize,
    valid_count: usize,
    confidence_errors: Vec<f32>
}

/// Summary of a complete run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub mean_loss: f32,
    pub std_loss: f32,

    /// Total error pixels over total valid pixels.
    pub error_rate: f32,
    pub mean_confidence_error: Option<f32>,
    pub count: usize
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl Dataset {
    pub fn name(&self) -> &'static str {
        match self {
            Dataset::FlyingThings3D => "flyingthings3D",
            Dataset::Kitti2015 => "KITTI_2015",
            Dataset::Kitti2015Benchmark => "KITTI_2015_benchmark",
            Dataset::Kitti2015Augmentation => "KITTI_2015_Augmentation",
            Dataset::Kitti2012Augmentation => "KITTI_2012_Augmentation",
            Dataset::AerialImagery => "AerialImagery"
        }
    }

    pub fn is_kitti(&self) -> bool {
        matches!(
            self,
            Dataset::Kitti2015
                | Dataset::Kitti2015Benchmark
                | Dataset::Kitti2015Augmentation
                | Dataset::Kitti2012Augmentation
        )
    }

    pub fn error_predicate(&self) -> ErrorPredicate {
        if self.is_kitti() {
            ErrorPredicate::AbsoluteAndRelative {
                absolute: 3.0,
                relative: 0.05
            }
        }
        else {
            ErrorPredicate::Absolute { threshold: 1.0 }
        }
    }
}

impl FromStr for Dataset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "flyingthings3D" => Ok(Dataset::FlyingThings3D),
            "KITTI_2015" => Ok(Dataset::Kitti2015),
            "KITTI_2015_benchmark" => Ok(Dataset::Kitti2015Benchmark),
            "KITTI_2015_Augmentation" => Ok(Dataset::Kitti2015Augmentation),
            "KITTI_2012_Augmentation" => Ok(Dataset::Kitti2012Augmentation),
            "AerialImagery" => Ok(Dataset::AerialImagery),
            _ => Err(Error::UnknownDataset(s.to_string()))
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl ErrorPredicate {
    pub fn is_error(&self, pred: f32, gt: f32) -> bool {
        let diff = (pred - gt).abs();

        match *self {
            ErrorPredicate::Absolute { threshold } => diff >= threshold,
            ErrorPredicate::AbsoluteAndRelative { absolute, relative } => {
                diff >= absolute && diff / gt.abs() >= relative
            }
        }
    }
}

impl ErrorCounts {
    pub fn epe(&self) -> f32 {
        if self.valid_count == 0 {
            f32::NAN
        }
        else {
            (self.abs_error_sum / self.valid_count as f64) as f32
        }
    }

    pub fn error_rate(&self) -> f32 {
        if self.valid_count == 0 {
            0.0
        }
        else {
            self.error_count as f32 / self.valid_count as f32
        }
    }
}

impl std::ops::AddAssign for ErrorCounts {
    fn add_assign(&mut self, other: Self) {
        self.abs_error_sum += other.abs_error_sum;
        self.error_count += other.error_count;
        self.valid_count += other.valid_count;
    }
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, metrics: &BatchMetrics) {
        self.losses.push(metrics.epe);
        self.error_count += metrics.error_count;
        self.valid_count += metrics.valid_count;
        if let Some(ce) = metrics.mean_confidence_error {
            self.confidence_errors.push(ce);
        }
    }

    pub fn len(&self) -> usize {
        self.losses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.losses.is_empty()
    }

    pub fn summary(&self) -> RunSummary {
        let (mean_loss, std_loss) = mean_std(&self.losses);

        let error_rate = if self.valid_count == 0 {
            0.0
        }
        else {
            self.error_count as f32 / self.valid_count as f32
        };

        let mean_confidence_error = if self.confidence_errors.is_empty() {
            None
        }
        else {
            Some(mean_std(&self.confidence_errors).0)
        };

        RunSummary {
            mean_loss,
            std_loss,
            error_rate,
            mean_confidence_error,
            count: self.losses.len()
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "avg loss = {:.3}", self.mean_loss)?;
        writeln!(f, "std loss = {:.3}", self.std_loss)?;
        writeln!(f, "avg error rates = {:.2}%", self.error_rate * 100.0)?;
        if let Some(ce) = self.mean_confidence_error {
            writeln!(f, "avg confidence error = {:.3}", ce)?;
        }
        write!(f, "Number of test case: {}", self.count)
    }
}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Pixels with usable ground truth: known (non-zero) and inside `(0, max_disparity - 1)`.
pub fn valid_mask(ground_truth: ArrayView2<f32>, max_disparity: usize) -> Array2<bool> {
    let upper = max_disparity as f32 - 1.0;
    ground_truth.mapv(|gt| gt > 0.0 && gt < upper)
}

/// Score a prediction against ground truth over the valid pixels.
pub fn score(
    prediction: ArrayView2<f32>,
    ground_truth: ArrayView2<f32>,
    valid: ArrayView2<bool>,
    predicate: ErrorPredicate
) -> ErrorCounts {
    let mut counts = ErrorCounts::default();

    Zip::from(prediction)
        .and(ground_truth)
        .and(valid)
        .for_each(|&pred, &gt, &ok| {
            if !ok {
                return;
            }
            counts.valid_count += 1;
            counts.abs_error_sum += (pred - gt).abs() as f64;
            if predicate.is_error(pred, gt) {
                counts.error_count += 1;
            }
        });

    counts
}

/// Aggregate error rate of a set of counts: summed errors over summed valid pixels.
pub fn aggregate_error_rate<'a, I>(counts: I) -> f32
where
    I: IntoIterator<Item = &'a ErrorCounts>
{
    let mut total = ErrorCounts::default();
    for c in counts {
        total += *c;
    }

    total.error_rate()
}

/// Mean and population standard deviation.
fn mean_std(values: &[f32]) -> (f32, f32) {
    if values.is_empty() {
        return (f32::NAN, f32::NAN);
    }

    let values = Array1::from(values.to_vec());
    let mean = values.mean().unwrap_or(f32::NAN);

    (mean, values.std(0.0))
}
