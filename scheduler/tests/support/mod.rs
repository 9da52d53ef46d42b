//! Shared fixtures for integration tests.

use std::collections::HashMap;

use chrono::NaiveDate;
use qtty::Hours;

use nqs_rust::ephemeris::{MoonSample, MoonTimeline, NightEphemeris, TargetTimeline};
use nqs_rust::models::{
    LunarCondition, ModifiedJulianDate, ObsClass, ObservationRequest, ProgramId, RequestId,
    SkyPosition,
};

pub fn mjd(v: f64) -> ModifiedJulianDate {
    ModifiedJulianDate::new(v)
}

pub fn deg(v: f64) -> qtty::Degrees {
    qtty::Degrees::new(v)
}

/// A synthetic night: `hours` long from `start`, 5-minute sampling, every
/// listed target visible at every sample, moon down all night and far from
/// everything.
pub fn night(date: NaiveDate, start: f64, hours: f64, target_ids: &[&str]) -> NightEphemeris {
    let step_days = 300.0 / 86400.0;
    let samples: Vec<_> = (0..)
        .map(|i| start + i as f64 * step_days)
        .take_while(|t| *t <= start + hours / 24.0 + step_days)
        .map(mjd)
        .collect();

    let mut targets = HashMap::new();
    for id in target_ids {
        targets.insert(
            id.to_string(),
            TargetTimeline::new(
                samples.clone(),
                vec![true; samples.len()],
                vec![deg(0.0); samples.len()],
            )
            .unwrap(),
        );
    }

    NightEphemeris {
        date,
        evening_twilight: mjd(start),
        morning_twilight: mjd(start + hours / 24.0),
        moon: MoonTimeline::new(
            vec![MoonSample {
                t: mjd(start),
                position: SkyPosition::new(deg(260.0), deg(-20.0)),
                age: qtty::Days::new(2.0),
            }],
            vec![],
            vec![mjd(start - 0.1)],
        )
        .unwrap(),
        targets,
    }
}

pub fn request(
    id: &str,
    program: &str,
    visits: u32,
    exposure_s: f64,
    priority: f64,
    lunar: LunarCondition,
) -> ObservationRequest {
    ObservationRequest {
        id: RequestId::new(id),
        program: ProgramId::new(program),
        position: SkyPosition::new(deg(80.0), deg(20.0)),
        visits_requested: visits,
        exposure: qtty::Seconds::new(exposure_s),
        exposures_per_visit: 1,
        class: ObsClass::Imaging,
        lunar,
        priority,
        position_angle: None,
    }
}

pub fn allocations(pairs: &[(&str, f64)]) -> HashMap<ProgramId, Hours> {
    pairs
        .iter()
        .map(|(p, h)| (ProgramId::new(*p), Hours::new(*h)))
        .collect()
}

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
}
