//! JSON-materialized campaign ephemeris.
//!
//! The ephemeris oracle runs before scheduling and writes one JSON document
//! for the whole campaign; this module deserializes and validates it into
//! per-night query tables. Format, per night:
//!
//! ```json
//! {
//!   "nights": [
//!     {
//!       "date": "2026-03-08",
//!       "evening_twilight": 61108.08,
//!       "morning_twilight": 61108.49,
//!       "moon": {
//!         "samples": [{ "t": 61108.0, "ra_deg": 101.2, "dec_deg": -4.9, "age_days": 3.2 }],
//!         "risings": [61107.71],
//!         "settings": [61108.21]
//!       },
//!       "targets": {
//!         "obj-001": {
//!           "times": [61108.08, 61108.09],
//!           "observable": [true, true],
//!           "par_angle_deg": [12.0, 13.5]
//!         }
//!       }
//!     }
//!   ]
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::ephemeris::{EphemerisSource, MoonSample, MoonTimeline, NightEphemeris, TargetTimeline};
use crate::error::EphemerisError;
use crate::models::{ModifiedJulianDate, SkyPosition};

#[derive(Deserialize)]
struct CampaignInput {
    nights: Vec<NightInput>,
}

#[derive(Deserialize)]
struct NightInput {
    date: NaiveDate,
    evening_twilight: f64,
    morning_twilight: f64,
    moon: MoonInput,
    #[serde(default)]
    targets: HashMap<String, TimelineInput>,
}

#[derive(Deserialize)]
struct MoonInput {
    samples: Vec<MoonSampleInput>,
    #[serde(default)]
    risings: Vec<f64>,
    #[serde(default)]
    settings: Vec<f64>,
}

#[derive(Deserialize)]
struct MoonSampleInput {
    t: f64,
    ra_deg: f64,
    dec_deg: f64,
    age_days: f64,
}

#[derive(Deserialize)]
struct TimelineInput {
    times: Vec<f64>,
    observable: Vec<bool>,
    par_angle_deg: Vec<f64>,
}

/// All campaign nights, indexed by calendar date.
#[derive(Debug)]
pub struct CampaignEphemeris {
    nights: Vec<NightEphemeris>,
    by_date: HashMap<NaiveDate, usize>,
}

impl CampaignEphemeris {
    /// Load and validate a campaign ephemeris from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, EphemerisError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| EphemerisError::Io {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        Self::from_json_str(&content)
    }

    /// Parse and validate a campaign ephemeris from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, EphemerisError> {
        let input: CampaignInput = serde_json::from_str(json)?;

        let mut nights = Vec::with_capacity(input.nights.len());
        let mut by_date = HashMap::with_capacity(input.nights.len());

        for night in input.nights {
            let date = night.date;
            if night.morning_twilight <= night.evening_twilight {
                return Err(EphemerisError::Invalid {
                    date,
                    reason: "morning twilight does not follow evening twilight".to_string(),
                });
            }

            let samples = night
                .moon
                .samples
                .into_iter()
                .map(|s| MoonSample {
                    t: ModifiedJulianDate::new(s.t),
                    position: SkyPosition::new(
                        qtty::Degrees::new(s.ra_deg),
                        qtty::Degrees::new(s.dec_deg),
                    ),
                    age: qtty::Days::new(s.age_days),
                })
                .collect();
            let moon = MoonTimeline::new(
                samples,
                night.moon.risings.into_iter().map(ModifiedJulianDate::new).collect(),
                night.moon.settings.into_iter().map(ModifiedJulianDate::new).collect(),
            )
            .map_err(|reason| EphemerisError::Invalid { date, reason })?;

            let mut targets = HashMap::with_capacity(night.targets.len());
            for (id, timeline) in night.targets {
                let timeline = TargetTimeline::new(
                    timeline.times.into_iter().map(ModifiedJulianDate::new).collect(),
                    timeline.observable,
                    timeline
                        .par_angle_deg
                        .into_iter()
                        .map(qtty::Degrees::new)
                        .collect(),
                )
                .map_err(|reason| EphemerisError::Invalid {
                    date,
                    reason: format!("target {}: {}", id, reason),
                })?;
                targets.insert(id, timeline);
            }

            if by_date.insert(date, nights.len()).is_some() {
                return Err(EphemerisError::DuplicateNight { date });
            }
            nights.push(NightEphemeris {
                date,
                evening_twilight: ModifiedJulianDate::new(night.evening_twilight),
                morning_twilight: ModifiedJulianDate::new(night.morning_twilight),
                moon,
                targets,
            });
        }

        Ok(Self { nights, by_date })
    }

    /// Build from already-materialized nights (used by tests).
    pub fn from_nights(nights: Vec<NightEphemeris>) -> Result<Self, EphemerisError> {
        let mut by_date = HashMap::with_capacity(nights.len());
        for (idx, night) in nights.iter().enumerate() {
            if by_date.insert(night.date, idx).is_some() {
                return Err(EphemerisError::DuplicateNight { date: night.date });
            }
        }
        Ok(Self { nights, by_date })
    }
}

impl EphemerisSource for CampaignEphemeris {
    fn night(&self, date: NaiveDate) -> Result<&NightEphemeris, EphemerisError> {
        self.by_date
            .get(&date)
            .map(|&idx| &self.nights[idx])
            .ok_or(EphemerisError::UnknownNight { date })
    }

    fn nights(&self) -> Vec<NaiveDate> {
        self.nights.iter().map(|n| n.date).collect()
    }
}
