//! Campaign configuration file support.
//!
//! The campaign is described by a TOML file naming the scheduling nights,
//! pass/idle parameters, and the input/output paths:
//!
//! ```toml
//! [campaign]
//! dates = ["2026-03-08", "2026-03-09"]
//! passes = 5
//! idle_step_minutes = 20
//! seed = 271828
//!
//! [paths]
//! catalog_dir = "catalogs/2026a"
//! allocation_file = "allocated_time.dat"
//! ephemeris_file = "ephemeris.json"
//! done_file = "donefile.dat"
//! output_file = "schedule.dat"
//! ```

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Campaign configuration from file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignConfig {
    pub campaign: CampaignSettings,
    pub paths: PathSettings,
}

/// Scheduling parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignSettings {
    /// Nights to schedule, in campaign order
    pub dates: Vec<NaiveDate>,
    #[serde(default = "default_passes")]
    pub passes: usize,
    #[serde(default = "default_idle_step_minutes")]
    pub idle_step_minutes: f64,
    #[serde(default)]
    pub seed: u64,
}

/// Input and output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    pub catalog_dir: PathBuf,
    pub allocation_file: PathBuf,
    pub ephemeris_file: PathBuf,
    #[serde(default)]
    pub done_file: Option<PathBuf>,
    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,
}

fn default_passes() -> usize {
    5
}

fn default_idle_step_minutes() -> f64 {
    20.0
}

fn default_output_file() -> PathBuf {
    PathBuf::from("schedule.dat")
}

impl CampaignConfig {
    /// Load and validate a campaign configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        let config: CampaignConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.campaign.dates.is_empty() {
            return Err(ConfigError::Invalid(
                "campaign.dates must name at least one night".to_string(),
            ));
        }
        if self.campaign.passes == 0 {
            return Err(ConfigError::Invalid(
                "campaign.passes must be at least 1".to_string(),
            ));
        }
        if self.campaign.idle_step_minutes <= 0.0 {
            return Err(ConfigError::Invalid(
                "campaign.idle_step_minutes must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Idle-skip step as a duration.
    pub fn idle_step(&self) -> qtty::Seconds {
        qtty::Seconds::new(self.campaign.idle_step_minutes * 60.0)
    }
}
