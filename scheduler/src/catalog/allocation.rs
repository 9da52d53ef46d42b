//! Allocated-time log parsing.
//!
//! Plain text mapping programs to their granted campaign hours, one
//! `<program> <hours>` pair per line. Repeated lines for the same program
//! accumulate.

use std::collections::HashMap;
use std::path::Path;

use qtty::Hours;

use crate::error::CatalogError;
use crate::models::ProgramId;

pub fn load_allocations<P: AsRef<Path>>(
    path: P,
) -> Result<HashMap<ProgramId, Hours>, CatalogError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| CatalogError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut allocations: HashMap<ProgramId, Hours> = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let (program, hours) = match (parts.next(), parts.next(), parts.next()) {
            (Some(program), Some(hours), None) => (program, hours),
            _ => {
                return Err(CatalogError::InvalidField {
                    request: path.display().to_string(),
                    field: "allocation line",
                    value: line.to_string(),
                })
            }
        };
        let hours: f64 = hours.parse().ok().filter(|v| *v >= 0.0).ok_or_else(|| {
            CatalogError::InvalidField {
                request: program.to_string(),
                field: "allocated hours",
                value: hours.to_string(),
            }
        })?;

        let entry = allocations
            .entry(ProgramId::new(program))
            .or_insert(Hours::new(0.0));
        *entry += Hours::new(hours);
    }
    Ok(allocations)
}
