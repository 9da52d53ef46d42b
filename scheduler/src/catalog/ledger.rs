//! Done-ledger parsing.
//!
//! A resumable ledger of completed work from a previous run, seeding the
//! campaign baseline instead of an all-zero state. One entry per line:
//!
//! ```text
//! # request  program  visits  hours  complete
//! deep-1     carter   2       3.1    0
//! ```
//!
//! Visits and the completion flag apply to the named request; the hours are
//! cumulative program time and are credited to every request the program
//! owns. Malformed lines, unknown request ids, and repeated request ids are
//! all fatal.

use std::collections::HashSet;
use std::path::Path;

use qtty::Hours;
use tracing::debug;

use crate::error::LedgerError;
use crate::models::{CompletionTable, ProgramId, RequestId};

pub fn seed_from_ledger<P: AsRef<Path>>(
    path: P,
    table: &mut CompletionTable,
) -> Result<(), LedgerError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| LedgerError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut seen: HashSet<RequestId> = HashSet::new();
    for (line_no, line) in content.lines().enumerate().map(|(i, l)| (i + 1, l)) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        let [id, program, visits, hours, complete] = fields.as_slice() else {
            return Err(LedgerError::Malformed {
                line_no,
                reason: format!("expected 5 fields, found {}", fields.len()),
            });
        };

        let visits: u32 = visits.parse().map_err(|_| LedgerError::Malformed {
            line_no,
            reason: format!("invalid visit count '{}'", visits),
        })?;
        let hours: f64 = hours
            .parse()
            .ok()
            .filter(|v: &f64| *v >= 0.0)
            .ok_or_else(|| LedgerError::Malformed {
                line_no,
                reason: format!("invalid hours '{}'", hours),
            })?;
        let complete: u32 = complete.parse().map_err(|_| LedgerError::Malformed {
            line_no,
            reason: format!("invalid completion flag '{}'", complete),
        })?;

        let id = RequestId::new(*id);
        let Some(index) = table.index_of(&id) else {
            return Err(LedgerError::UnknownRequest {
                line_no,
                id: id.to_string(),
            });
        };
        if !seen.insert(id.clone()) {
            return Err(LedgerError::DuplicateEntry {
                line_no,
                id: id.to_string(),
            });
        }

        table.seed_visits(index, visits, complete != 0);
        table.credit_program_hours(&ProgramId::new(*program), Hours::new(hours));
        debug!(request = %id, visits, hours, "ledger entry applied");
    }
    Ok(())
}
