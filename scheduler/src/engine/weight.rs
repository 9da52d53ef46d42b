//! Per-candidate weight computation.
//!
//! Pure function of (request, completion state, night ephemeris, previous
//! pointing) to a scalar weight plus the projected outcome of scheduling the
//! request at the candidate start time. The total weight combines:
//!
//! - fit: fraction of the remaining visits that fit before morning twilight
//!   and stay observable at their projected end,
//! - lunar admissibility (0/1) from moon state over the projected window,
//! - fairness: `1 − usageRatio` of the owning program, floored at 0.001,
//! - slew bonus ×1000 for a repeat pointing within 10 arcsec,
//! - priority `1 / priority³`,
//! - division by the damping weight carried from the previous campaign pass.

use crate::engine::visibility::is_observable;
use crate::ephemeris::{NightEphemeris, TargetTimeline};
use crate::error::EngineError;
use crate::models::{
    CompletionState, LunarCondition, ModifiedJulianDate, ObservationRequest, SkyPosition,
};

/// Pointing distance under which the slew bonus applies, in degrees (10").
const SLEW_RADIUS_DEG: f64 = 10.0 / 3600.0;

/// Weight multiplier for a zero-slew repeat pointing.
const SLEW_BONUS: f64 = 1000.0;

/// Fairness weight floor for fully- or over-subscribed programs.
const FAIRNESS_FLOOR: f64 = 0.001;

/// Separation below which a target is too close to the moon regardless of
/// the requested lunar condition, in degrees.
const MOON_EXCLUSION_DEG: f64 = 10.0;

/// Minimum separation for grey/dark admissibility, in degrees.
const MOON_WIDE_DEG: f64 = 90.0;

/// Maximum absolute moon age for grey time, in days.
const GREY_MAX_AGE_DAYS: f64 = 9.0;

/// Maximum absolute moon age for dark time, in days.
const DARK_MAX_AGE_DAYS: f64 = 4.5;

/// A weighed candidate with its projected outcome.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Index of the request in the active request table
    pub index: usize,
    /// Total selection weight
    pub weight: f64,
    /// Fraction of the remaining visits that fit
    pub fit_weight: f64,
    /// Projected end of the slot (equals the start when nothing fits)
    pub end: ModifiedJulianDate,
    /// Whole visits completed by the projected end
    pub visits: u32,
    /// Target position, recorded as the next previous-pointing
    pub position: SkyPosition,
}

struct Fit {
    weight: f64,
    end: ModifiedJulianDate,
    visits: u32,
}

/// Weigh one incomplete request at `start`. The caller excludes complete
/// requests entirely.
pub fn evaluate(
    index: usize,
    request: &ObservationRequest,
    state: &CompletionState,
    night: &NightEphemeris,
    start: ModifiedJulianDate,
    previous: Option<SkyPosition>,
) -> Result<Candidate, EngineError> {
    let timeline = night.timeline(&request.id)?;

    let fit = fit_visits(request, state, night, timeline, start);
    let lunar = lunar_flag(request, night, start, fit.end);
    let slew = slew_multiplier(&request.position, previous);
    let fairness = fairness_weight(state);
    let priority = priority_weight(request.priority);

    // An unfittable candidate carries zero weight outright; dividing zero by
    // a zero damping weight would otherwise manufacture a NaN.
    let weight = if fit.weight == 0.0 {
        0.0
    } else {
        fit.weight * lunar * fairness * slew * priority / state.damping_weight
    };

    Ok(Candidate {
        index,
        weight,
        fit_weight: fit.weight,
        end: fit.end,
        visits: fit.visits,
        position: request.position,
    })
}

/// How many whole visits fit between `start` and morning twilight while the
/// target stays observable at the projected end.
///
/// The class overhead is charged once per slot. When not all remaining
/// visits fit, the candidate count steps down one visit at a time until the
/// projected end is observable, down to zero.
fn fit_visits(
    request: &ObservationRequest,
    state: &CompletionState,
    night: &NightEphemeris,
    timeline: &TargetTimeline,
    start: ModifiedJulianDate,
) -> Fit {
    let position_angle = request.rotator_position_angle();

    if !is_observable(timeline, start, position_angle) {
        return Fit {
            weight: 0.0,
            end: start,
            visits: 0,
        };
    }

    let time_remaining = night.morning_twilight.seconds_since(start);
    let exposure_per_visit = request.exposure_per_visit();
    let overhead = request.class.overhead();
    let remaining = request.visits_requested.saturating_sub(state.visits_done) as i64;

    let mut possible =
        ((time_remaining.value() - overhead.value()) / exposure_per_visit.value()).floor() as i64;

    if possible > remaining {
        let end = start.plus_seconds(exposure_per_visit * remaining as f64 + overhead);
        if is_observable(timeline, end, position_angle) {
            return Fit {
                weight: 1.0,
                end,
                visits: remaining as u32,
            };
        }
        possible = remaining;
    }

    let mut visits = possible;
    while visits >= 1 {
        let end = start.plus_seconds(exposure_per_visit * visits as f64 + overhead);
        if is_observable(timeline, end, position_angle) {
            return Fit {
                weight: visits as f64 / remaining as f64,
                end,
                visits: visits as u32,
            };
        }
        visits -= 1;
    }

    Fit {
        weight: 0.0,
        end: start,
        visits: 0,
    }
}

/// Lunar admissibility over the projected window: 1 when the requested
/// condition is met, 0 otherwise. A separation under 10° is inadmissible
/// regardless of the request.
fn lunar_flag(
    request: &ObservationRequest,
    night: &NightEphemeris,
    start: ModifiedJulianDate,
    end: ModifiedJulianDate,
) -> f64 {
    let moon_up = night.moon.is_up(start) || night.moon.is_up(end);
    let age = night.moon.age_at(start);

    let sep_start = request.position.separation(&night.moon.position_at(start));
    let sep_end = request.position.separation(&night.moon.position_at(end));
    let separation = (sep_start.value() + sep_end.value()) / 2.0;

    let mut flag = if request.lunar == LunarCondition::Bright || !moon_up {
        1.0
    } else {
        match request.lunar {
            LunarCondition::Grey
                if age.abs().value() < GREY_MAX_AGE_DAYS && separation > MOON_WIDE_DEG =>
            {
                1.0
            }
            LunarCondition::Dark
                if age.abs().value() < DARK_MAX_AGE_DAYS && separation > MOON_WIDE_DEG =>
            {
                1.0
            }
            _ => 0.0,
        }
    };

    if separation < MOON_EXCLUSION_DEG {
        flag = 0.0;
    }
    flag
}

fn slew_multiplier(position: &SkyPosition, previous: Option<SkyPosition>) -> f64 {
    match previous {
        Some(prev) if position.separation(&prev).value() < SLEW_RADIUS_DEG => SLEW_BONUS,
        _ => 1.0,
    }
}

/// `1 − usageRatio` of the owning program, floored to a small positive
/// constant so over-subscribed programs are discouraged, never excluded.
fn fairness_weight(state: &CompletionState) -> f64 {
    let weight = 1.0 - state.hours_used.value() / state.hours_allocated.value();
    if weight <= 0.0 {
        FAIRNESS_FLOOR
    } else {
        weight
    }
}

/// Cubic priority weight; lower priority codes dominate sharply.
fn priority_weight(priority: f64) -> f64 {
    1.0 / priority.powi(3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ObsClass, ProgramId, RequestId};
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn mjd(v: f64) -> ModifiedJulianDate {
        ModifiedJulianDate::new(v)
    }

    fn deg(v: f64) -> qtty::Degrees {
        qtty::Degrees::new(v)
    }

    /// A 4-hour night starting at MJD 61108.0, moon down throughout and far
    /// from the test targets, target visible at every sample.
    fn night(target_ids: &[&str]) -> NightEphemeris {
        let samples = (0..=48)
            .map(|i| 61108.0 + i as f64 * (4.0 / 24.0) / 48.0)
            .collect::<Vec<_>>();
        let mut targets = HashMap::new();
        for id in target_ids {
            targets.insert(
                id.to_string(),
                crate::ephemeris::TargetTimeline::new(
                    samples.iter().copied().map(mjd).collect(),
                    vec![true; samples.len()],
                    vec![deg(0.0); samples.len()],
                )
                .unwrap(),
            );
        }
        NightEphemeris {
            date: NaiveDate::from_ymd_opt(2026, 3, 8).unwrap(),
            evening_twilight: mjd(61108.0),
            morning_twilight: mjd(61108.0 + 4.0 / 24.0),
            moon: crate::ephemeris::MoonTimeline::new(
                vec![crate::ephemeris::MoonSample {
                    t: mjd(61108.0),
                    position: SkyPosition::new(deg(260.0), deg(-20.0)),
                    age: qtty::Days::new(2.0),
                }],
                vec![],
                vec![mjd(61107.9)],
            )
            .unwrap(),
            targets,
        }
    }

    fn request(id: &str, visits: u32, exposure_s: f64) -> ObservationRequest {
        ObservationRequest {
            id: RequestId::new(id),
            program: ProgramId::new("P1"),
            position: SkyPosition::new(deg(80.0), deg(20.0)),
            visits_requested: visits,
            exposure: qtty::Seconds::new(exposure_s),
            exposures_per_visit: 1,
            class: ObsClass::Imaging,
            lunar: LunarCondition::Dark,
            priority: 1.0,
            position_angle: None,
        }
    }

    fn state() -> CompletionState {
        CompletionState {
            visits_done: 0,
            hours_used: qtty::Hours::new(0.0),
            hours_allocated: qtty::Hours::new(4.0),
            complete: false,
            damping_weight: 1.0,
            usage_ratio: 0.0,
        }
    }

    #[test]
    fn test_all_visits_fit() {
        let night = night(&["a"]);
        // 2 visits x 1800 s + 120 s overhead = 3720 s, well inside 4 h
        let request = request("a", 2, 1800.0);
        let c = evaluate(0, &request, &state(), &night, mjd(61108.0), None).unwrap();

        assert_eq!(c.fit_weight, 1.0);
        assert_eq!(c.visits, 2);
        assert!((c.end.value() - (61108.0 + 3720.0 / 86400.0)).abs() < 1e-9);
        assert!(c.weight > 0.0);
    }

    #[test]
    fn test_partial_fit_fraction() {
        let night = night(&["a"]);
        // Each visit 3600 s; (4 h - 120 s) fits 3 whole visits of the 8 asked
        let request = request("a", 8, 3600.0);
        let c = evaluate(0, &request, &state(), &night, mjd(61108.0), None).unwrap();

        assert_eq!(c.visits, 3);
        assert!((c.fit_weight - 3.0 / 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_unobservable_start_is_zero_weight() {
        let mut night = night(&[]);
        let samples: Vec<_> = (0..=48)
            .map(|i| mjd(61108.0 + i as f64 * (4.0 / 24.0) / 48.0))
            .collect();
        night.targets.insert(
            "a".to_string(),
            crate::ephemeris::TargetTimeline::new(
                samples.clone(),
                vec![false; samples.len()],
                vec![deg(0.0); samples.len()],
            )
            .unwrap(),
        );
        let request = request("a", 2, 1800.0);
        let c = evaluate(0, &request, &state(), &night, mjd(61108.0), None).unwrap();

        assert_eq!(c.weight, 0.0);
        assert_eq!(c.visits, 0);
        assert_eq!(c.end.value(), 61108.0);
    }

    #[test]
    fn test_fit_steps_down_when_end_unobservable() {
        // Visible for the first 100 minutes only; visits must step down until
        // the projected end lands in the visible window.
        let samples: Vec<_> = (0..=48)
            .map(|i| mjd(61108.0 + i as f64 * (4.0 / 24.0) / 48.0))
            .collect();
        let observable: Vec<bool> = (0..=48).map(|i| i <= 20).collect();
        let mut night = night(&[]);
        night.targets.insert(
            "a".to_string(),
            crate::ephemeris::TargetTimeline::new(
                samples.clone(),
                observable,
                vec![deg(0.0); samples.len()],
            )
            .unwrap(),
        );
        // 4 visits x 1800 s + 120 s = 7320 s ends past the visible window;
        // 3 visits end at 5520 s < 2 h into the night.
        let request = request("a", 4, 1800.0);
        let c = evaluate(0, &request, &state(), &night, mjd(61108.0), None).unwrap();

        assert_eq!(c.visits, 3);
        assert!((c.fit_weight - 3.0 / 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_remaining_visits_use_completion_state() {
        let night = night(&["a"]);
        let request = request("a", 4, 3600.0);
        let mut st = state();
        st.visits_done = 3;
        let c = evaluate(0, &request, &st, &night, mjd(61108.0), None).unwrap();

        // One visit remains and fits entirely
        assert_eq!(c.visits, 1);
        assert_eq!(c.fit_weight, 1.0);
    }

    #[test]
    fn test_dark_request_admissible_with_moon_down() {
        let night = night(&["a"]);
        let request = request("a", 1, 1800.0);
        let c = evaluate(0, &request, &state(), &night, mjd(61108.0), None).unwrap();
        assert!(c.weight > 0.0);
    }

    #[test]
    fn test_dark_request_rejected_under_bright_moon() {
        let mut night = night(&["a"]);
        // Moon up all night, 11 days old, ~60° away: dark time is out
        night.moon = crate::ephemeris::MoonTimeline::new(
            vec![crate::ephemeris::MoonSample {
                t: mjd(61108.0),
                position: SkyPosition::new(deg(80.0), deg(-40.0)),
                age: qtty::Days::new(11.0),
            }],
            vec![mjd(61107.9)],
            vec![],
        )
        .unwrap();
        let request = request("a", 1, 1800.0);
        let c = evaluate(0, &request, &state(), &night, mjd(61108.0), None).unwrap();
        assert_eq!(c.weight, 0.0);
        // The projected outcome is still reported
        assert_eq!(c.visits, 1);
    }

    #[test]
    fn test_bright_request_admissible_under_any_moon() {
        let mut night = night(&["a"]);
        night.moon = crate::ephemeris::MoonTimeline::new(
            vec![crate::ephemeris::MoonSample {
                t: mjd(61108.0),
                position: SkyPosition::new(deg(80.0), deg(-40.0)),
                age: qtty::Days::new(11.0),
            }],
            vec![mjd(61107.9)],
            vec![],
        )
        .unwrap();
        let mut request = request("a", 1, 1800.0);
        request.lunar = LunarCondition::Bright;
        let c = evaluate(0, &request, &state(), &night, mjd(61108.0), None).unwrap();
        assert!(c.weight > 0.0);
    }

    #[test]
    fn test_too_close_to_moon_overrides_bright() {
        let mut night = night(&["a"]);
        // Moon 5° from the target and up
        night.moon = crate::ephemeris::MoonTimeline::new(
            vec![crate::ephemeris::MoonSample {
                t: mjd(61108.0),
                position: SkyPosition::new(deg(80.0), deg(25.0)),
                age: qtty::Days::new(11.0),
            }],
            vec![mjd(61107.9)],
            vec![],
        )
        .unwrap();
        let mut request = request("a", 1, 1800.0);
        request.lunar = LunarCondition::Bright;
        let c = evaluate(0, &request, &state(), &night, mjd(61108.0), None).unwrap();
        assert_eq!(c.weight, 0.0);
    }

    #[test]
    fn test_slew_bonus_for_repeat_pointing() {
        let night = night(&["a"]);
        let request = request("a", 1, 1800.0);

        let far = evaluate(
            0,
            &request,
            &state(),
            &night,
            mjd(61108.0),
            Some(SkyPosition::new(deg(10.0), deg(-10.0))),
        )
        .unwrap();
        let near = evaluate(
            0,
            &request,
            &state(),
            &night,
            mjd(61108.0),
            Some(request.position),
        )
        .unwrap();

        assert!((near.weight / far.weight - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn test_fairness_floor_keeps_oversubscribed_positive() {
        let night = night(&["a"]);
        let request = request("a", 1, 1800.0);
        let mut st = state();
        st.hours_used = qtty::Hours::new(6.0); // over the 4 h allocation

        let c = evaluate(0, &request, &st, &night, mjd(61108.0), None).unwrap();
        assert!(c.weight > 0.0);

        let baseline = evaluate(0, &request, &state(), &night, mjd(61108.0), None).unwrap();
        assert!((c.weight / baseline.weight - 0.001).abs() < 1e-9);
    }

    #[test]
    fn test_damping_divides_weight() {
        let night = night(&["a"]);
        let request = request("a", 1, 1800.0);
        let mut st = state();
        st.damping_weight = 4.0;

        let damped = evaluate(0, &request, &st, &night, mjd(61108.0), None).unwrap();
        let baseline = evaluate(0, &request, &state(), &night, mjd(61108.0), None).unwrap();
        assert!((baseline.weight / damped.weight - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_damping_boosts_without_nan() {
        let night = night(&["a"]);
        let request = request("a", 1, 1800.0);
        let mut st = state();
        st.damping_weight = 0.0;

        let c = evaluate(0, &request, &st, &night, mjd(61108.0), None).unwrap();
        assert!(c.weight.is_infinite() && c.weight > 0.0);
    }

    proptest! {
        #[test]
        fn prop_priority_weight_monotone(a in 1.0f64..20.0, b in 1.0f64..20.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            // Lower priority code never yields a lower priority weight
            prop_assert!(priority_weight(lo) >= priority_weight(hi));
        }

        #[test]
        fn prop_fairness_weight_strictly_positive(used in 0.0f64..100.0, allocated in 0.01f64..50.0) {
            let st = CompletionState {
                visits_done: 0,
                hours_used: qtty::Hours::new(used),
                hours_allocated: qtty::Hours::new(allocated),
                complete: false,
                damping_weight: 1.0,
                usage_ratio: 0.0,
            };
            prop_assert!(fairness_weight(&st) > 0.0);
        }
    }
}
