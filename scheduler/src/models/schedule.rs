//! Output schedule records.

use serde::{Deserialize, Serialize};

use crate::models::request::RequestId;
use crate::models::time::ModifiedJulianDate;

/// One committed observation slot. Append-only output of the night scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Slot start time
    pub start: ModifiedJulianDate,
    /// Slot duration in seconds; always positive
    pub duration: qtty::Seconds,
    /// The scheduled request
    pub request: RequestId,
    /// Visits completed within this slot
    pub visits: u32,
}

impl ScheduleEntry {
    pub fn end(&self) -> ModifiedJulianDate {
        self.start.plus_seconds(self.duration)
    }
}
