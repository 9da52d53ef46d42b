//! Ephemeris boundary: per-night, pre-materialized sky data.
//!
//! Scheduling never blocks on I/O; everything the engine asks about the sky
//! for one night lives in a [`NightEphemeris`]: twilight bounds, a sampled
//! visibility/parallactic-angle timeline per target, and a sampled moon
//! timeline with rise/set events. All time-indexed queries use
//! nearest-sample semantics (closest absolute time difference, earlier
//! sample on ties), located by binary search over the sorted timestamps.

pub mod materialized;

pub use materialized::CampaignEphemeris;

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::error::EphemerisError;
use crate::models::{ModifiedJulianDate, RequestId, SkyPosition};

/// Index of the sample closest in time to `t`. `times` must be sorted and
/// non-empty.
fn nearest_index(times: &[ModifiedJulianDate], t: ModifiedJulianDate) -> usize {
    let pos = times.partition_point(|s| s.value() < t.value());
    if pos == 0 {
        return 0;
    }
    if pos == times.len() {
        return times.len() - 1;
    }
    let before = t.value() - times[pos - 1].value();
    let after = times[pos].value() - t.value();
    if before <= after {
        pos - 1
    } else {
        pos
    }
}

/// Sampled visibility timeline for a single target over one night.
#[derive(Debug, Clone)]
pub struct TargetTimeline {
    times: Vec<ModifiedJulianDate>,
    observable: Vec<bool>,
    par_angle: Vec<qtty::Degrees>,
}

impl TargetTimeline {
    /// Build a timeline; the three series must be equal-length, non-empty,
    /// and sorted by time.
    pub fn new(
        times: Vec<ModifiedJulianDate>,
        observable: Vec<bool>,
        par_angle: Vec<qtty::Degrees>,
    ) -> Result<Self, String> {
        if times.is_empty() {
            return Err("empty visibility timeline".to_string());
        }
        if times.len() != observable.len() || times.len() != par_angle.len() {
            return Err(format!(
                "timeline series lengths differ: {} times, {} flags, {} angles",
                times.len(),
                observable.len(),
                par_angle.len()
            ));
        }
        if times.windows(2).any(|w| w[1].value() < w[0].value()) {
            return Err("timeline timestamps are not sorted".to_string());
        }
        Ok(Self {
            times,
            observable,
            par_angle,
        })
    }

    /// Visibility flag at the sample nearest to `t`.
    pub fn observable_at(&self, t: ModifiedJulianDate) -> bool {
        self.observable[nearest_index(&self.times, t)]
    }

    /// Parallactic angle at the sample nearest to `t`.
    pub fn par_angle_at(&self, t: ModifiedJulianDate) -> qtty::Degrees {
        self.par_angle[nearest_index(&self.times, t)]
    }
}

/// One sampled moon state.
#[derive(Debug, Clone)]
pub struct MoonSample {
    pub t: ModifiedJulianDate,
    pub position: SkyPosition,
    /// Signed age in days relative to new moon
    pub age: qtty::Days,
}

/// Sampled moon positions plus rise/set event lists for one night's
/// surroundings.
#[derive(Debug, Clone)]
pub struct MoonTimeline {
    samples: Vec<MoonSample>,
    sample_times: Vec<ModifiedJulianDate>,
    risings: Vec<ModifiedJulianDate>,
    settings: Vec<ModifiedJulianDate>,
}

impl MoonTimeline {
    /// Build a moon timeline; samples and event lists must be sorted.
    pub fn new(
        samples: Vec<MoonSample>,
        risings: Vec<ModifiedJulianDate>,
        settings: Vec<ModifiedJulianDate>,
    ) -> Result<Self, String> {
        if samples.is_empty() {
            return Err("empty moon sample series".to_string());
        }
        let sample_times: Vec<_> = samples.iter().map(|s| s.t).collect();
        for (name, series) in [("samples", &sample_times), ("risings", &risings), ("settings", &settings)] {
            if series.windows(2).any(|w| w[1].value() < w[0].value()) {
                return Err(format!("moon {} are not sorted", name));
            }
        }
        Ok(Self {
            samples,
            sample_times,
            risings,
            settings,
        })
    }

    /// Moon sky position at the sample nearest to `t`.
    pub fn position_at(&self, t: ModifiedJulianDate) -> SkyPosition {
        self.samples[nearest_index(&self.sample_times, t)].position
    }

    /// Signed moon age at the sample nearest to `t`.
    pub fn age_at(&self, t: ModifiedJulianDate) -> qtty::Days {
        self.samples[nearest_index(&self.sample_times, t)].age
    }

    /// Whether the moon is up at `t`, derived from the ordering of the most
    /// recent rise/set events before that instant. Darktime holds when the
    /// most recent event was a setting; with no prior event of either kind
    /// the moon reads as down.
    pub fn is_up(&self, t: ModifiedJulianDate) -> bool {
        let last_rise = previous_event(&self.risings, t);
        let last_set = previous_event(&self.settings, t);
        match (last_rise, last_set) {
            (Some(rise), Some(set)) => rise.value() > set.value(),
            (Some(_), None) => true,
            _ => false,
        }
    }
}

fn previous_event(
    events: &[ModifiedJulianDate],
    t: ModifiedJulianDate,
) -> Option<ModifiedJulianDate> {
    let count = events.partition_point(|e| e.value() < t.value());
    if count == 0 {
        None
    } else {
        Some(events[count - 1])
    }
}

/// Everything the engine asks about the sky for one night. Read-only once
/// materialized.
#[derive(Debug)]
pub struct NightEphemeris {
    pub date: NaiveDate,
    pub evening_twilight: ModifiedJulianDate,
    pub morning_twilight: ModifiedJulianDate,
    pub moon: MoonTimeline,
    pub targets: HashMap<String, TargetTimeline>,
}

impl NightEphemeris {
    /// (evening, morning) twilight instants bounding the schedulable night.
    pub fn twilight_bounds(&self) -> (ModifiedJulianDate, ModifiedJulianDate) {
        (self.evening_twilight, self.morning_twilight)
    }

    /// Visibility timeline for a request; missing timelines are fatal (the
    /// materialization step is expected to cover every active request).
    pub fn timeline(&self, request: &RequestId) -> Result<&TargetTimeline, EphemerisError> {
        self.targets
            .get(request.as_str())
            .ok_or_else(|| EphemerisError::MissingTimeline {
                request: request.to_string(),
                date: self.date,
            })
    }
}

/// Seam between the engine and the materialized sky data. The scheduler asks
/// for one night at a time; tests feed synthetic nights through this trait.
pub trait EphemerisSource {
    fn night(&self, date: NaiveDate) -> Result<&NightEphemeris, EphemerisError>;

    /// Nights available, in campaign order.
    fn nights(&self) -> Vec<NaiveDate>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mjd(v: f64) -> ModifiedJulianDate {
        ModifiedJulianDate::new(v)
    }

    fn timeline() -> TargetTimeline {
        TargetTimeline::new(
            vec![mjd(57455.0), mjd(57455.1), mjd(57455.2)],
            vec![true, false, true],
            vec![
                qtty::Degrees::new(10.0),
                qtty::Degrees::new(20.0),
                qtty::Degrees::new(30.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_nearest_picks_closest_sample() {
        let t = timeline();
        assert!(t.observable_at(mjd(57455.04)));
        assert!(!t.observable_at(mjd(57455.06)));
        assert!((t.par_angle_at(mjd(57455.16)).value() - 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_nearest_tie_prefers_earlier_sample() {
        let t = timeline();
        // Exactly between the first two samples
        assert!(t.observable_at(mjd(57455.05)));
    }

    #[test]
    fn test_nearest_clamps_to_ends() {
        let t = timeline();
        assert!(t.observable_at(mjd(57454.0)));
        assert!(t.observable_at(mjd(57456.0)));
    }

    #[test]
    fn test_timeline_rejects_mismatched_lengths() {
        let result = TargetTimeline::new(
            vec![mjd(57455.0)],
            vec![true, false],
            vec![qtty::Degrees::new(0.0)],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_timeline_rejects_unsorted_times() {
        let result = TargetTimeline::new(
            vec![mjd(57455.2), mjd(57455.0)],
            vec![true, false],
            vec![qtty::Degrees::new(0.0), qtty::Degrees::new(0.0)],
        );
        assert!(result.is_err());
    }

    fn moon(risings: Vec<f64>, settings: Vec<f64>) -> MoonTimeline {
        MoonTimeline::new(
            vec![MoonSample {
                t: mjd(57455.0),
                position: SkyPosition::new(qtty::Degrees::new(100.0), qtty::Degrees::new(-5.0)),
                age: qtty::Days::new(3.0),
            }],
            risings.into_iter().map(mjd).collect(),
            settings.into_iter().map(mjd).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_moon_up_when_latest_event_is_rise() {
        let m = moon(vec![57454.9], vec![57454.5]);
        assert!(m.is_up(mjd(57455.0)));
    }

    #[test]
    fn test_moon_down_when_latest_event_is_set() {
        let m = moon(vec![57454.5], vec![57454.9]);
        assert!(!m.is_up(mjd(57455.0)));
    }

    #[test]
    fn test_moon_flips_across_event() {
        let m = moon(vec![57455.2], vec![57454.9]);
        assert!(!m.is_up(mjd(57455.1)));
        assert!(m.is_up(mjd(57455.3)));
    }

    #[test]
    fn test_moon_down_with_no_prior_event() {
        let m = moon(vec![], vec![]);
        assert!(!m.is_up(mjd(57455.0)));
    }
}
