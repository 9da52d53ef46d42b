//! Greedy within-night selection loop.
//!
//! Starting at evening twilight, the scheduler repeatedly weighs every
//! incomplete request at the current simulated time, commits the
//! highest-weight candidate (uniform random among exact ties), and advances
//! the clock by the committed slot. When nothing is admissible it idles
//! forward by a fixed step. The night ends at morning twilight or when every
//! request is complete.

use qtty::Hour;
use rand::Rng;
use tracing::debug;

use crate::engine::weight::{self, Candidate};
use crate::ephemeris::NightEphemeris;
use crate::error::EngineError;
use crate::models::{
    CompletionTable, ModifiedJulianDate, ObservationRequest, ScheduleEntry, SkyPosition,
};

/// Simulated-time step taken when no candidate is admissible.
pub const DEFAULT_IDLE_STEP: qtty::Seconds = qtty::Seconds::new(20.0 * 60.0);

/// Drives one night of the campaign.
#[derive(Debug, Clone)]
pub struct NightScheduler {
    idle_step: qtty::Seconds,
}

impl Default for NightScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_STEP)
    }
}

impl NightScheduler {
    pub fn new(idle_step: qtty::Seconds) -> Self {
        Self { idle_step }
    }

    /// Schedule one night, mutating the completion table and returning the
    /// night's committed slots in order.
    pub fn run<R: Rng>(
        &self,
        requests: &[ObservationRequest],
        table: &mut CompletionTable,
        night: &NightEphemeris,
        rng: &mut R,
    ) -> Result<Vec<ScheduleEntry>, EngineError> {
        let (evening, morning) = night.twilight_bounds();
        let mut current = evening;
        let mut previous: Option<SkyPosition> = None;
        let mut entries = Vec::new();

        while current < morning && !table.all_complete() {
            let candidates = self.scan(requests, table, night, current, previous)?;
            match select(&candidates, rng) {
                Some(winner) => {
                    let candidate = &candidates[winner];
                    self.advance(requests, table, current, candidate, &mut entries);
                    previous = Some(candidate.position);
                    current = candidate.end;
                }
                None => {
                    // Idle-skip: nothing admissible at this instant
                    current = current.plus_seconds(self.idle_step);
                }
            }
        }

        debug!(
            date = %night.date,
            slots = entries.len(),
            "night scheduled"
        );
        Ok(entries)
    }

    /// Weigh every incomplete request at `current`.
    fn scan(
        &self,
        requests: &[ObservationRequest],
        table: &CompletionTable,
        night: &NightEphemeris,
        current: ModifiedJulianDate,
        previous: Option<SkyPosition>,
    ) -> Result<Vec<Candidate>, EngineError> {
        let mut candidates = Vec::new();
        for (index, request) in requests.iter().enumerate() {
            let state = table.state(index);
            if state.complete {
                continue;
            }
            candidates.push(weight::evaluate(
                index, request, state, night, current, previous,
            )?);
        }
        Ok(candidates)
    }

    /// Commit the winning candidate: append the schedule entry, charge the
    /// elapsed time to the owning program, and record the completed visits.
    fn advance(
        &self,
        requests: &[ObservationRequest],
        table: &mut CompletionTable,
        start: ModifiedJulianDate,
        candidate: &Candidate,
        entries: &mut Vec<ScheduleEntry>,
    ) {
        let request = &requests[candidate.index];
        let duration = candidate.end.seconds_since(start);

        entries.push(ScheduleEntry {
            start,
            duration,
            request: request.id.clone(),
            visits: candidate.visits,
        });

        table.charge(&request.program, duration.to::<Hour>());
        table.record_visits(candidate.index, candidate.visits);

        debug!(
            request = %request.id,
            visits = candidate.visits,
            duration_s = duration.value(),
            "slot committed"
        );
    }
}

/// Pick the maximal-weight candidate, uniformly at random among exact ties.
/// Returns `None` (idle-skip) when there are no candidates or the maximum
/// weight is zero.
fn select<R: Rng>(candidates: &[Candidate], rng: &mut R) -> Option<usize> {
    let max = candidates
        .iter()
        .map(|c| c.weight)
        .fold(f64::NEG_INFINITY, f64::max);
    if candidates.is_empty() || max == 0.0 {
        return None;
    }

    let tied: Vec<usize> = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| c.weight == max)
        .map(|(i, _)| i)
        .collect();
    Some(tied[rng.gen_range(0..tied.len())])
}
