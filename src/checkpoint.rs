//! # Versioned checkpoints
//!
//! Each profile owns a directory of numbered versions. A version is a pair of files: the opaque
//! model weights (`<profile>-<version>.nn`) and the loss history (`<profile>-<version>.ht`,
//! JSON).

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::*;

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

const MODEL_EXT: &str = "nn";
const HISTORY_EXT: &str = "ht";

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Directory of saved versions for one profile.
#[derive(Debug, Clone)]
pub struct VersionStore {
    dir: PathBuf,
    profile: String
}

/// Per-epoch loss records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LossHistory {
    pub train: Vec<f32>,
    pub test: Vec<f32>
}

/// How a loss trend is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendMethod {
    /// Slope of the least squares line through `(index, loss)`.
    Slope,
    /// Pearson correlation between loss and index.
    Correlation
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl VersionStore {
    /// Open (creating if needed) the version directory `<root>/<profile>`.
    pub fn new<P: AsRef<Path>>(root: P, profile: &str) -> Result<Self> {
        if profile.contains('-') {
            return Err(Error::InvalidProfileName(profile.to_string()));
        }

        let dir = root.as_ref().join(profile);
        fs::create_dir_all(&dir)?;

        Ok(Self {
            dir,
            profile: profile.to_string()
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_file_name(&self, version: u32) -> PathBuf {
        self.dir.join(format!("{}-{}.{}", self.profile, version, MODEL_EXT))
    }

    pub fn history_file_name(&self, version: u32) -> PathBuf {
        self.dir.join(format!("{}-{}.{}", self.profile, version, HISTORY_EXT))
    }

    /// Highest version with any file in the directory.
    pub fn latest_version(&self) -> Result<Option<u32>> {
        let mut latest = None;

        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            match name.to_str().and_then(version_code) {
                Some(v) => latest = latest.max(Some(v)),
                None => debug!("Ignoring {:?} in {}", name, self.dir.display())
            }
        }

        Ok(latest)
    }

    /// Load the weights of `version`, or of the latest version when `None`.
    ///
    /// Returns the version the next save should use, and the weights if a version was found.
    /// When no version exists at all the run starts from version 1 without weights.
    pub fn load_weights(&self, version: Option<u32>) -> Result<(u32, Option<Vec<u8>>)> {
        let version = match self.resolve(version)? {
            Some(v) => v,
            None => return Ok((1, None))
        };

        let nn_file = self.model_file_name(version);
        if !nn_file.exists() {
            return Err(Error::MissingCheckpoint(nn_file));
        }

        info!("Load version model: {}", nn_file.display());
        let weights = fs::read(&nn_file)?;

        Ok((version + 1, Some(weights)))
    }

    /// Load the loss history of `version`, or of the latest version when `None`.
    pub fn load_history(&self, version: Option<u32>) -> Result<(u32, LossHistory)> {
        let version = match self.resolve(version)? {
            Some(v) => v,
            None => return Ok((1, LossHistory::default()))
        };

        let ht_file = self.history_file_name(version);
        if !ht_file.exists() {
            return Err(Error::MissingHistory(ht_file));
        }

        info!("Load version history: {}", ht_file.display());
        let reader = BufReader::new(File::open(&ht_file)?);
        let history = serde_json::from_reader(reader)?;

        Ok((version + 1, history))
    }

    /// Write both files of a version.
    pub fn save_version(&self, weights: &[u8], history: &LossHistory, version: u32) -> Result<()> {
        fs::write(self.model_file_name(version), weights)?;

        let writer = BufWriter::new(File::create(self.history_file_name(version))?);
        serde_json::to_writer(writer, history)?;

        debug!("Saved {} version {}", self.profile, version);
        Ok(())
    }

    fn resolve(&self, version: Option<u32>) -> Result<Option<u32>> {
        let version = match version {
            Some(v) => Some(v),
            None => {
                info!("Find latest version");
                self.latest_version()?
            }
        };

        match version {
            Some(v) => info!("Using version: {}", v),
            None => info!("Can not find any version")
        }

        Ok(version)
    }
}

impl LossHistory {
    /// Trend of the test loss, `None` when it cannot be measured.
    pub fn test_trend(&self, method: TrendMethod) -> Option<f32> {
        trend(&self.test, method)
    }

    /// Trend of the train loss, `None` when it cannot be measured.
    pub fn train_trend(&self, method: TrendMethod) -> Option<f32> {
        trend(&self.train, method)
    }
}

// -----------------------------------------------------------------------------------------------
// FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Version number of a `<profile>-<version>.<ext>` file name.
fn version_code(file_name: &str) -> Option<u32> {
    let start = file_name.find('-')? + 1;
    let end = start + file_name[start..].find('.')?;
    file_name[start..end].parse().ok()
}

/// Measure whether a loss sequence is descending. Negative values mean it is.
///
/// Needs at least two points; correlation also needs a non-constant sequence.
pub fn trend(losses: &[f32], method: TrendMethod) -> Option<f32> {
    if losses.len() < 2 {
        return None;
    }

    let n = losses.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = losses.iter().map(|&v| v as f64).sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (i, &y) in losses.iter().enumerate() {
        let dx = i as f64 - mean_x;
        let dy = y as f64 - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    match method {
        TrendMethod::Slope => Some((sxy / sxx) as f32),
        TrendMethod::Correlation => {
            if syy == 0.0 {
                None
            }
            else {
                Some((sxy / (sxx * syy).sqrt()) as f32)
            }
        }
    }
}
