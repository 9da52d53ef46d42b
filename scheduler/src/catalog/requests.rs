//! Request-file parsing.
//!
//! One observation request per `.fld` file under the catalog directory:
//!
//! ```text
//! PI lastname
//! progID 2026A-042
//! objid      ra          dec         exptime nexp repeats priority obstype moon   mask
//! ---------------------------------------------------------------------------------
//! field-007  10:32:14.1  -05:12:30   10.0    4    3       2        mask    dark   field-007-m1
//! ```
//!
//! RA is sexagesimal hours, Dec sexagesimal degrees, exposure time minutes.
//! Mask-class requests resolve their rotator position angle from the sibling
//! `<mask>.msk` file (`pa <degrees>` line). Everything is validated here so
//! the engine only ever sees well-typed requests.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::CatalogError;
use crate::models::{ObsClass, ObservationRequest, ProgramId, RequestId, SkyPosition};

/// Load every `.fld` file under `dir` (recursively), in path order.
pub fn load_catalog<P: AsRef<Path>>(dir: P) -> Result<Vec<ObservationRequest>, CatalogError> {
    let dir = dir.as_ref();
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "fld"))
        .collect();
    files.sort();

    let mut requests = Vec::with_capacity(files.len());
    let mut seen: HashSet<RequestId> = HashSet::new();
    for path in files {
        let request = parse_request_file(&path, dir)?;
        if !seen.insert(request.id.clone()) {
            return Err(CatalogError::DuplicateRequest {
                id: request.id.to_string(),
            });
        }
        debug!(request = %request.id, program = %request.program, "loaded request");
        requests.push(request);
    }
    Ok(requests)
}

/// Parse a single request file. `catalog_root` anchors mask-file lookups.
pub fn parse_request_file(
    path: &Path,
    catalog_root: &Path,
) -> Result<ObservationRequest, CatalogError> {
    let content = std::fs::read_to_string(path).map_err(|e| CatalogError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut lines = content.lines().filter(|l| !l.trim().is_empty());

    let program = header_value(lines.next(), "PI", path)?;
    let _proposal = header_value(lines.next(), "progID", path)?;

    let keywords: Vec<&str> = lines
        .next()
        .ok_or(CatalogError::Truncated {
            path: path.to_path_buf(),
            what: "column header line",
        })?
        .split_whitespace()
        .collect();
    lines.next().ok_or(CatalogError::Truncated {
        path: path.to_path_buf(),
        what: "header separator line",
    })?;
    let values: Vec<&str> = lines
        .next()
        .ok_or(CatalogError::Truncated {
            path: path.to_path_buf(),
            what: "value line",
        })?
        .split_whitespace()
        .collect();

    let fields: HashMap<&str, &str> = keywords.iter().copied().zip(values).collect();
    let id = *fields.get("objid").ok_or(CatalogError::Truncated {
        path: path.to_path_buf(),
        what: "objid column",
    })?;

    let field = |name: &'static str| -> Result<&str, CatalogError> {
        fields.get(name).copied().ok_or(CatalogError::InvalidField {
            request: id.to_string(),
            field: name,
            value: "<missing>".to_string(),
        })
    };
    let invalid = |name: &'static str, value: &str| CatalogError::InvalidField {
        request: id.to_string(),
        field: name,
        value: value.to_string(),
    };

    let ra_hours = sexagesimal(field("ra")?).ok_or_else(|| invalid("ra", fields["ra"]))?;
    let dec_deg = sexagesimal(field("dec")?).ok_or_else(|| invalid("dec", fields["dec"]))?;

    let exptime_min: f64 = field("exptime")?
        .parse()
        .ok()
        .filter(|v| *v > 0.0)
        .ok_or_else(|| invalid("exptime", fields["exptime"]))?;
    let nexp: u32 = field("nexp")?
        .parse()
        .ok()
        .filter(|v| *v >= 1)
        .ok_or_else(|| invalid("nexp", fields["nexp"]))?;
    let repeats: u32 = field("repeats")?
        .parse()
        .ok()
        .filter(|v| *v >= 1)
        .ok_or_else(|| invalid("repeats", fields["repeats"]))?;
    let priority: f64 = field("priority")?
        .parse()
        .ok()
        .filter(|v| *v >= 1.0)
        .ok_or_else(|| invalid("priority", fields["priority"]))?;

    let class: ObsClass =
        field("obstype")?
            .parse()
            .map_err(|_| CatalogError::UnknownObsClass {
                request: id.to_string(),
                value: fields["obstype"].to_string(),
            })?;
    let lunar = field("moon")?
        .parse()
        .map_err(|_| CatalogError::UnknownLunarCondition {
            request: id.to_string(),
            value: fields["moon"].to_string(),
        })?;

    let position_angle = if class == ObsClass::Mask {
        let mask = field("mask")?;
        let mask_path = catalog_root.join(format!("{}.msk", mask));
        Some(read_mask_position_angle(&mask_path).ok_or(
            CatalogError::MissingPositionAngle {
                request: id.to_string(),
                path: mask_path,
            },
        )?)
    } else {
        None
    };

    Ok(ObservationRequest {
        id: RequestId::new(id),
        program: ProgramId::new(program),
        position: SkyPosition::new(
            qtty::Degrees::new(ra_hours * 15.0),
            qtty::Degrees::new(dec_deg),
        ),
        visits_requested: repeats,
        exposure: qtty::Seconds::new(exptime_min * 60.0),
        exposures_per_visit: nexp,
        class,
        lunar,
        priority,
        position_angle,
    })
}

fn header_value<'a>(
    line: Option<&'a str>,
    key: &'static str,
    path: &Path,
) -> Result<&'a str, CatalogError> {
    line.and_then(|l| {
        let mut parts = l.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some(k), Some(v)) if k == key => Some(v),
            _ => None,
        }
    })
    .ok_or(CatalogError::Truncated {
        path: path.to_path_buf(),
        what: key,
    })
}

/// Parse a sign-aware `D:M:S` (or `H:M:S`) string into decimal units.
fn sexagesimal(s: &str) -> Option<f64> {
    let (sign, rest) = match s.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, s),
    };
    let mut parts = rest.split(':');
    let d: f64 = parts.next()?.parse().ok()?;
    let m: f64 = parts.next()?.parse().ok()?;
    let sec: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(sign * (d + m / 60.0 + sec / 3600.0))
}

/// Scan a mask definition file for its `pa` line.
fn read_mask_position_angle(path: &Path) -> Option<qtty::Degrees> {
    let content = std::fs::read_to_string(path).ok()?;
    for line in content.lines() {
        let mut parts = line.split_whitespace();
        if parts.next() == Some("pa") {
            return parts.next()?.parse().ok().map(qtty::Degrees::new);
        }
    }
    None
}
