//! Observation request records.
//!
//! An [`ObservationRequest`] is the immutable per-campaign description of a
//! single target: where it is, how long each visit takes, how many visits the
//! program asked for, and under which lunar conditions it may be observed.
//! Requests are validated on load; the engine never sees an unrecognized
//! observation class or lunar condition.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Request identifier (the catalog's object id).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

/// Program identifier (the entity observation time is charged to).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProgramId(pub String);

impl RequestId {
    pub fn new(value: impl Into<String>) -> Self {
        RequestId(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ProgramId {
    pub fn new(value: impl Into<String>) -> Self {
        ProgramId(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sky position in equatorial coordinates (ICRS).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyPosition {
    /// Right Ascension in degrees
    pub ra: qtty::Degrees,
    /// Declination in degrees
    pub dec: qtty::Degrees,
}

impl SkyPosition {
    pub fn new(ra: qtty::Degrees, dec: qtty::Degrees) -> Self {
        Self { ra, dec }
    }

    /// Angular separation to another position, in degrees.
    ///
    /// Spherical law of cosines, with a planar fallback below ~1 arcsec where
    /// the arccosine loses precision.
    pub fn separation(&self, other: &SkyPosition) -> qtty::Degrees {
        let ra1 = self.ra.to::<qtty::Radian>().value();
        let dec1 = self.dec.to::<qtty::Radian>().value();
        let ra2 = other.ra.to::<qtty::Radian>().value();
        let dec2 = other.dec.to::<qtty::Radian>().value();

        let y = dec1.cos() * dec2.cos();
        let z = dec1.sin() * dec2.sin();
        let x = (ra1 - ra2).cos();

        let rad = (z + y * x).acos();
        let sep = if rad < 0.000004848 {
            ((dec1.cos() * (ra1 - ra2)).powi(2) + (dec1 - dec2).powi(2)).sqrt()
        } else {
            rad
        };

        qtty::Radians::new(sep).to::<qtty::Degree>()
    }
}

/// Observation class, fixing the per-slot instrument overhead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObsClass {
    Imaging,
    Longslit,
    Mask,
}

impl ObsClass {
    /// Fixed instrument overhead charged once per scheduled slot.
    pub fn overhead(&self) -> qtty::Seconds {
        match self {
            ObsClass::Imaging => qtty::Seconds::new(120.0),
            ObsClass::Longslit => qtty::Seconds::new(1800.0),
            ObsClass::Mask => qtty::Seconds::new(1800.0),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObsClass::Imaging => "imaging",
            ObsClass::Longslit => "longslit",
            ObsClass::Mask => "mask",
        }
    }
}

impl FromStr for ObsClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "imaging" => Ok(ObsClass::Imaging),
            "longslit" => Ok(ObsClass::Longslit),
            "mask" => Ok(ObsClass::Mask),
            other => Err(format!("unknown observation class '{}'", other)),
        }
    }
}

/// Requested lunar condition (tolerance for moon brightness/position).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LunarCondition {
    Bright,
    Grey,
    Dark,
}

impl LunarCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            LunarCondition::Bright => "bright",
            LunarCondition::Grey => "grey",
            LunarCondition::Dark => "dark",
        }
    }
}

impl FromStr for LunarCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bright" => Ok(LunarCondition::Bright),
            "grey" => Ok(LunarCondition::Grey),
            "dark" => Ok(LunarCondition::Dark),
            other => Err(format!("unknown lunar condition '{}'", other)),
        }
    }
}

/// A single target's observation specification. Immutable for the campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationRequest {
    pub id: RequestId,
    pub program: ProgramId,
    pub position: SkyPosition,
    /// Number of complete visits requested
    pub visits_requested: u32,
    /// Exposure time per single exposure, in seconds
    pub exposure: qtty::Seconds,
    /// Exposures per visit
    pub exposures_per_visit: u32,
    pub class: ObsClass,
    pub lunar: LunarCondition,
    /// Priority code; lower values are more important
    pub priority: f64,
    /// Rotator position angle; required for mask-class requests
    pub position_angle: Option<qtty::Degrees>,
}

impl ObservationRequest {
    /// Open-shutter time of one complete visit.
    pub fn exposure_per_visit(&self) -> qtty::Seconds {
        self.exposure * self.exposures_per_visit as f64
    }

    /// Rotator position angle to use for the in-bounds test.
    ///
    /// Mask requests observe at their stored angle; everything else at 0.
    pub fn rotator_position_angle(&self) -> qtty::Degrees {
        match self.class {
            ObsClass::Mask => self.position_angle.unwrap_or(qtty::Degrees::new(0.0)),
            _ => qtty::Degrees::new(0.0),
        }
    }
}
