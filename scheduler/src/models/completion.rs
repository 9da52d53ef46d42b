//! Per-request completion bookkeeping.
//!
//! One [`CompletionState`] per observation request, owned collectively by a
//! [`CompletionTable`]. The table is the only shared mutable state in the
//! system: the night scheduler charges hours and visits into it, the campaign
//! balancer snapshots and restores it between passes. Hours are charged to
//! every request of the owning program (time accounting is per program, not
//! per target); visits are request-local.

use std::collections::{BTreeMap, HashMap};

use qtty::Hours;

use crate::error::EngineError;
use crate::models::request::{ObservationRequest, ProgramId, RequestId};

/// Allocation fallback for programs missing from the allocation log.
/// Keeps the usage ratio finite; one charge pushes such a program past its
/// allocation and the fairness floor takes over.
const UNALLOCATED_HOURS: f64 = 0.01;

/// Mutable completion record for one observation request.
#[derive(Debug, Clone)]
pub struct CompletionState {
    /// Visits completed so far; never exceeds the requested count
    pub visits_done: u32,
    /// Hours charged to the owning program (shared across its requests)
    pub hours_used: Hours,
    /// Total hours granted to the owning program for the campaign
    pub hours_allocated: Hours,
    /// True iff `visits_done` reached the requested count
    pub complete: bool,
    /// Multiplicative damping factor carried from the previous pass
    pub damping_weight: f64,
    /// `hours_used / hours_allocated`, recomputed on every charge; 0 when unset
    pub usage_ratio: f64,
}

/// Snapshot of the resettable portion of a [`CompletionState`].
#[derive(Debug, Clone)]
struct Baseline {
    visits_done: u32,
    hours_used: Hours,
    complete: bool,
}

/// Completion state for every request in the campaign, with id and program
/// lookup indices.
#[derive(Debug)]
pub struct CompletionTable {
    states: Vec<CompletionState>,
    requested: Vec<u32>,
    baseline: Vec<Baseline>,
    by_id: HashMap<RequestId, usize>,
    by_program: BTreeMap<ProgramId, Vec<usize>>,
}

impl CompletionTable {
    /// Build a fresh table for `requests`, allocating hours per program.
    ///
    /// A request id appearing twice is a fatal configuration error: the
    /// greedy loop keys its bookkeeping by id and cannot disambiguate.
    pub fn new(
        requests: &[ObservationRequest],
        allocated: &HashMap<ProgramId, Hours>,
    ) -> Result<Self, EngineError> {
        let mut by_id = HashMap::with_capacity(requests.len());
        let mut by_program: BTreeMap<ProgramId, Vec<usize>> = BTreeMap::new();
        let mut states = Vec::with_capacity(requests.len());
        let mut requested = Vec::with_capacity(requests.len());

        for (idx, request) in requests.iter().enumerate() {
            if by_id.insert(request.id.clone(), idx).is_some() {
                return Err(EngineError::DuplicateRequest {
                    id: request.id.to_string(),
                });
            }
            by_program
                .entry(request.program.clone())
                .or_default()
                .push(idx);

            let hours_allocated = allocated
                .get(&request.program)
                .copied()
                .unwrap_or(Hours::new(UNALLOCATED_HOURS));
            states.push(CompletionState {
                visits_done: 0,
                hours_used: Hours::new(0.0),
                hours_allocated,
                complete: false,
                damping_weight: 1.0,
                usage_ratio: 0.0,
            });
            requested.push(request.visits_requested);
        }

        let baseline = states
            .iter()
            .map(|s| Baseline {
                visits_done: s.visits_done,
                hours_used: s.hours_used,
                complete: s.complete,
            })
            .collect();

        Ok(Self {
            states,
            requested,
            baseline,
            by_id,
            by_program,
        })
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn state(&self, idx: usize) -> &CompletionState {
        &self.states[idx]
    }

    /// Table index for a request id.
    pub fn index_of(&self, id: &RequestId) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    /// Indices of every request owned by `program`.
    pub fn program_indices(&self, program: &ProgramId) -> &[usize] {
        self.by_program
            .get(program)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Programs present in the table, in sorted order.
    pub fn programs(&self) -> impl Iterator<Item = &ProgramId> {
        self.by_program.keys()
    }

    /// Ledger seeding: set a request's cumulative visits and completion flag.
    pub fn seed_visits(&mut self, idx: usize, visits_done: u32, complete: bool) {
        let state = &mut self.states[idx];
        state.visits_done = visits_done;
        state.complete = complete;
    }

    /// Ledger seeding: credit already-consumed hours to every request of
    /// `program`. Leaves the usage ratio unset; it is recomputed on the first
    /// in-pass charge.
    pub fn credit_program_hours(&mut self, program: &ProgramId, hours: Hours) {
        for &idx in self
            .by_program
            .get(program)
            .map(Vec::as_slice)
            .unwrap_or(&[])
        {
            self.states[idx].hours_used += hours;
        }
    }

    /// Charge elapsed time to every request of `program` and recompute their
    /// usage ratios.
    pub fn charge(&mut self, program: &ProgramId, hours: Hours) {
        for &idx in self
            .by_program
            .get(program)
            .map(Vec::as_slice)
            .unwrap_or(&[])
        {
            let state = &mut self.states[idx];
            state.hours_used += hours;
            state.usage_ratio = state.hours_used.value() / state.hours_allocated.value();
        }
    }

    /// Record `visits` completed visits for one request, marking it complete
    /// when the requested count is reached.
    pub fn record_visits(&mut self, idx: usize, visits: u32) {
        let state = &mut self.states[idx];
        state.visits_done += visits;
        debug_assert!(state.visits_done <= self.requested[idx]);
        if state.visits_done >= self.requested[idx] {
            state.complete = true;
        }
    }

    /// Capture the campaign baseline every pass resets to. Called once after
    /// ledger seeding, before the first pass.
    pub fn capture_baseline(&mut self) {
        self.baseline = self
            .states
            .iter()
            .map(|s| Baseline {
                visits_done: s.visits_done,
                hours_used: s.hours_used,
                complete: s.complete,
            })
            .collect();
    }

    /// Restore visits, hours, and completion flags to the campaign baseline.
    /// Damping weights survive; usage ratios are unset again.
    pub fn reset_to_baseline(&mut self) {
        for (state, base) in self.states.iter_mut().zip(&self.baseline) {
            state.visits_done = base.visits_done;
            state.hours_used = base.hours_used;
            state.complete = base.complete;
            state.usage_ratio = 0.0;
        }
    }

    pub fn all_complete(&self) -> bool {
        self.states.iter().all(|s| s.complete)
    }

    /// Per-program completion outcome: a program is fully served iff every
    /// one of its requests is complete.
    pub fn fully_served(&self) -> BTreeMap<ProgramId, bool> {
        self.by_program
            .iter()
            .map(|(program, indices)| {
                let served = indices.iter().all(|&idx| self.states[idx].complete);
                (program.clone(), served)
            })
            .collect()
    }

    /// Carry this pass's outcome into the next pass's damping weights:
    /// ending usage ratio, cut to a tenth for fully-served programs.
    pub fn apply_damping(&mut self, served: &BTreeMap<ProgramId, bool>) {
        for (program, indices) in &self.by_program {
            let relief = if served.get(program).copied().unwrap_or(false) {
                1.0 - 0.9
            } else {
                1.0
            };
            for &idx in indices {
                let state = &mut self.states[idx];
                state.damping_weight = state.usage_ratio * relief;
            }
        }
    }
}
