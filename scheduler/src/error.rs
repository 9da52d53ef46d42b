//! Error types for catalog loading, ephemeris access, and scheduling.
//!
//! Fatal configuration errors (unknown observation class, ambiguous request
//! identity, bad ledger entries) abort the run immediately; they carry the
//! offending request id or input line so the operator can fix the catalog.

use std::path::PathBuf;

use chrono::NaiveDate;

/// Errors raised while loading request files and the allocation log.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("request file {path} is truncated: missing {what}")]
    Truncated { path: PathBuf, what: &'static str },

    #[error("invalid value '{value}' for field '{field}' in request {request}")]
    InvalidField {
        request: String,
        field: &'static str,
        value: String,
    },

    #[error("unknown observation class '{value}' in request {request}")]
    UnknownObsClass { request: String, value: String },

    #[error("unknown lunar condition '{value}' in request {request}")]
    UnknownLunarCondition { request: String, value: String },

    #[error("request {id} appears more than once in the catalog")]
    DuplicateRequest { id: String },

    #[error("mask request {request} has no resolvable position angle in {path}")]
    MissingPositionAngle { request: String, path: PathBuf },
}

/// Errors raised while seeding the campaign baseline from a done ledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed ledger entry at line {line_no}: {reason}")]
    Malformed { line_no: usize, reason: String },

    #[error("ledger entry at line {line_no} references unknown request {id}")]
    UnknownRequest { line_no: usize, id: String },

    #[error("request {id} is listed more than once in the ledger (line {line_no})")]
    DuplicateEntry { line_no: usize, id: String },
}

/// Errors raised while loading or querying the materialized ephemeris.
#[derive(Debug, thiserror::Error)]
pub enum EphemerisError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse ephemeris JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("night {date} appears more than once in the ephemeris")]
    DuplicateNight { date: NaiveDate },

    #[error("no ephemeris available for night {date}")]
    UnknownNight { date: NaiveDate },

    #[error("no visibility timeline for request {request} on night {date}")]
    MissingTimeline { request: String, date: NaiveDate },

    #[error("invalid ephemeris for night {date}: {reason}")]
    Invalid { date: NaiveDate, reason: String },
}

/// Errors raised by the scheduling engine itself.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("request {id} appears more than once in the active request table")]
    DuplicateRequest { id: String },

    #[error(transparent)]
    Ephemeris(#[from] EphemerisError),
}

/// Errors raised while loading the campaign configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
