//! Multi-pass campaign balancing.
//!
//! Runs the night scheduler over every campaign night, then folds each
//! program's outcome back into per-request damping weights and repeats.
//! Completion state resets to the campaign baseline between passes; only the
//! damping weights carry over. Fully-served programs see their next-pass
//! weight divided by ten times their ending usage ratio, freeing selection
//! pressure for under-served programs.

use chrono::NaiveDate;
use rand::Rng;
use tracing::info;

use crate::engine::night::NightScheduler;
use crate::ephemeris::EphemerisSource;
use crate::error::EngineError;
use crate::models::{CompletionTable, ObservationRequest, ScheduleEntry};

/// Number of rebalancing passes over the campaign.
pub const DEFAULT_PASSES: usize = 5;

/// Runs the whole campaign and rebalances between passes.
#[derive(Debug, Clone)]
pub struct CampaignBalancer {
    passes: usize,
    night: NightScheduler,
}

impl Default for CampaignBalancer {
    fn default() -> Self {
        Self::new(DEFAULT_PASSES, NightScheduler::default())
    }
}

impl CampaignBalancer {
    pub fn new(passes: usize, night: NightScheduler) -> Self {
        Self { passes, night }
    }

    /// Schedule the campaign over `dates`, in order. The table's current
    /// state (typically ledger-seeded) becomes the baseline every pass
    /// resets to. Returns the schedule of the final pass.
    pub fn run<S: EphemerisSource, R: Rng>(
        &self,
        requests: &[ObservationRequest],
        table: &mut CompletionTable,
        source: &S,
        dates: &[NaiveDate],
        rng: &mut R,
    ) -> Result<Vec<ScheduleEntry>, EngineError> {
        table.capture_baseline();

        let mut schedule = Vec::new();
        for pass in 1..=self.passes {
            table.reset_to_baseline();
            schedule.clear();

            for &date in dates {
                let night = source.night(date)?;
                let entries = self.night.run(requests, table, night, rng)?;
                schedule.extend(entries);
            }

            let served = table.fully_served();
            let served_count = served.values().filter(|&&s| s).count();
            info!(
                pass,
                slots = schedule.len(),
                programs_served = served_count,
                programs_total = served.len(),
                "campaign pass complete"
            );

            table.apply_damping(&served);
            if served.values().all(|&s| s) {
                break;
            }
        }

        Ok(schedule)
    }
}
