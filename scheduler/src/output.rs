//! Schedule rendering and end-of-run summary.

use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::models::{CompletionTable, ScheduleEntry};

const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Render one schedule entry as `start end request visits`.
pub fn render_entry(entry: &ScheduleEntry) -> String {
    format!(
        "{} {} {} {}",
        entry.start.to_datetime().format(TIMESTAMP_FORMAT),
        entry.end().to_datetime().format(TIMESTAMP_FORMAT),
        entry.request,
        entry.visits
    )
}

/// Write the whole campaign schedule, one entry per line.
pub fn write_schedule<W: Write>(writer: &mut W, schedule: &[ScheduleEntry]) -> std::io::Result<()> {
    for entry in schedule {
        writeln!(writer, "{}", render_entry(entry))?;
    }
    Ok(())
}

/// Write the schedule to a file.
pub fn write_schedule_file<P: AsRef<Path>>(
    path: P,
    schedule: &[ScheduleEntry],
) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    write_schedule(&mut file, schedule)
}

/// Emit a per-program completion summary through tracing.
pub fn log_summary(table: &CompletionTable) {
    for program in table.programs() {
        let indices = table.program_indices(program);
        let complete = indices
            .iter()
            .filter(|&&idx| table.state(idx).complete)
            .count();
        let first = table.state(indices[0]);
        info!(
            program = %program,
            requests_complete = complete,
            requests_total = indices.len(),
            hours_used = first.hours_used.value(),
            hours_allocated = first.hours_allocated.value(),
            "program summary"
        );
    }
}
