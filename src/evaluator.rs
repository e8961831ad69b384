//! # Evaluation runs
//!
//! Drives a profile over every batch of a test set, reports progress and aggregates the run.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::time::{Duration, Instant};

use log::{error, info};

use crate::error::*;
use crate::metrics::{Dataset, RunMetrics};
use crate::profile::{EvalOutput, Profile};
use crate::stereo::Sample;

pub use crate::metrics::RunSummary;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Measures the time since it was started.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    start: Instant
}

pub struct Evaluator {
    profile: Profile,
    dataset: Dataset,
    metrics: RunMetrics
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            start: Instant::now()
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Elapsed time as `MM:SS.ss`.
    pub fn elapsed_str(&self) -> String {
        format_timespan(self.elapsed())
    }
}

impl Evaluator {
    pub fn new(profile: Profile, dataset: Dataset) -> Self {
        Self {
            profile,
            dataset,
            metrics: RunMetrics::new()
        }
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn profile_mut(&mut self) -> &mut Profile {
        &mut self.profile
    }

    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    /// Evaluate one batch and record its metrics.
    ///
    /// `index`, `total` and `stopwatch` are only used for reporting; the reported time is the
    /// stopwatch's elapsed time once the batch is evaluated. A NaN loss aborts with
    /// [`Error::NanLoss`] after the batch has been reported.
    pub fn eval_batch(
        &mut self,
        sample: &Sample,
        index: usize,
        total: usize,
        stopwatch: &Stopwatch
    ) -> Result<EvalOutput> {
        let output = self.profile.eval(sample, self.dataset)?;
        let metrics = &output.metrics;

        let error_rate = if metrics.valid_count == 0 {
            f32::NAN
        }
        else {
            metrics.error_count as f32 / metrics.valid_count as f32
        };

        info!(
            "[{}/{} {}] loss = {:.3}, error rate = {:.2}%",
            index + 1,
            total,
            stopwatch.elapsed_str(),
            metrics.epe,
            error_rate * 100.0
        );

        self.metrics.push(metrics);

        if metrics.epe.is_nan() {
            error!("Detected loss NaN in testing");
            return Err(Error::NanLoss { batch: index });
        }

        Ok(output)
    }

    /// Evaluate every batch in order and summarise the run.
    pub fn run<I>(&mut self, samples: I) -> Result<RunSummary>
    where
        I: IntoIterator<Item = Sample>,
        I::IntoIter: ExactSizeIterator
    {
        let samples = samples.into_iter();
        let total = samples.len();

        info!("Using model: {}", self.profile.name());
        info!("Using dataset: {}", self.dataset);
        info!("Max disparity: {}", self.profile.max_disparity());
        info!("Number of testing data: {}", total);

        let run_watch = Stopwatch::start();
        for (index, sample) in samples.enumerate() {
            self.eval_batch(&sample, index, total, &Stopwatch::start())?;
        }

        let summary = self.metrics.summary();
        for line in summary.to_string().lines() {
            info!("{}", line);
        }
        info!("Total time: {}", run_watch.elapsed_str());

        Ok(summary)
    }
}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Format a duration as `MM:SS.ss`, minutes wrapping at the hour.
pub fn format_timespan(span: Duration) -> String {
    let total = span.as_secs();
    let second = (total % 60) as f64 + span.subsec_micros() as f64 / 1e6;
    let minute = (total / 60) % 60;

    format!("{:02}:{:05.2}", minute, second)
}
