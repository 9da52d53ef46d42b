use serde::{Deserialize, Serialize};

/// Modified Julian Date representation.
/// MJD 0 = 1858-11-17 00:00:00 UTC
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ModifiedJulianDate(qtty::Days);

impl ModifiedJulianDate {
    /// Create a new MJD value.
    pub fn new<V: Into<qtty::Days>>(v: V) -> Self {
        Self(v.into())
    }

    /// Raw MJD value as f64.
    pub fn value(&self) -> f64 {
        self.0.value()
    }

    /// This instant shifted forward by a duration in seconds.
    pub fn plus_seconds(&self, s: qtty::Seconds) -> Self {
        Self::new(self.value() + s.to::<qtty::Day>().value())
    }

    /// Elapsed seconds since an earlier instant (negative if `earlier` is later).
    pub fn seconds_since(&self, earlier: ModifiedJulianDate) -> qtty::Seconds {
        qtty::Days::new(self.value() - earlier.value()).to::<qtty::Second>()
    }

    /// Elapsed hours since an earlier instant.
    pub fn hours_since(&self, earlier: ModifiedJulianDate) -> qtty::Hours {
        qtty::Days::new(self.value() - earlier.value()).to::<qtty::Hour>()
    }

    /// Convert to Unix timestamp (seconds since 1970-01-01 00:00:00 UTC).
    pub fn to_unix_timestamp(&self) -> f64 {
        (self.value() - 40587.0) * 86400.0
    }

    /// Create from Unix timestamp (seconds since 1970-01-01 00:00:00 UTC).
    pub fn from_unix_timestamp(timestamp: f64) -> Self {
        Self::new(timestamp / 86400.0 + 40587.0)
    }

    /// Convert to chrono DateTime<Utc>.
    pub fn to_datetime(&self) -> chrono::DateTime<chrono::Utc> {
        let secs = self.to_unix_timestamp();
        let secs_i64 = secs.floor() as i64;
        let nanos = ((secs - secs.floor()) * 1e9) as u32;
        chrono::DateTime::from_timestamp(secs_i64, nanos).unwrap_or(chrono::DateTime::UNIX_EPOCH)
    }

    /// Create from chrono DateTime<Utc>.
    pub fn from_datetime(dt: chrono::DateTime<chrono::Utc>) -> Self {
        Self::from_unix_timestamp(dt.timestamp() as f64 + dt.timestamp_subsec_nanos() as f64 / 1e9)
    }
}

impl From<f64> for ModifiedJulianDate {
    fn from(v: f64) -> Self {
        ModifiedJulianDate::new(v)
    }
}

#[cfg(test)]
mod tests {
    use super::ModifiedJulianDate;

    #[test]
    fn test_mjd_new() {
        let mjd = ModifiedJulianDate::new(50000.0);
        assert_eq!(mjd.value(), 50000.0);
    }

    #[test]
    fn test_mjd_ordering() {
        let mjd1 = ModifiedJulianDate::new(50000.0);
        let mjd2 = ModifiedJulianDate::new(51000.0);

        assert!(mjd1 < mjd2);
        assert!(mjd2 > mjd1);
    }

    #[test]
    fn test_plus_seconds() {
        let start = ModifiedJulianDate::new(57455.0);
        let end = start.plus_seconds(qtty::Seconds::new(43200.0));
        assert!((end.value() - 57455.5).abs() < 1e-9);
    }

    #[test]
    fn test_seconds_since() {
        let start = ModifiedJulianDate::new(57455.0);
        let end = ModifiedJulianDate::new(57455.25);
        assert!((end.seconds_since(start).value() - 21600.0).abs() < 1e-6);
        assert!((start.seconds_since(end).value() + 21600.0).abs() < 1e-6);
    }

    #[test]
    fn test_hours_since() {
        let start = ModifiedJulianDate::new(57455.0);
        let end = ModifiedJulianDate::new(57455.5);
        assert!((end.hours_since(start).value() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_mjd_to_unix_timestamp() {
        // MJD 40587.0 corresponds to Unix epoch (1970-01-01)
        let mjd = ModifiedJulianDate::new(40587.0);
        assert!((mjd.to_unix_timestamp()).abs() < 1.0);
    }

    #[test]
    fn test_mjd_roundtrip_unix() {
        let original = ModifiedJulianDate::new(59000.5);
        let timestamp = original.to_unix_timestamp();
        let roundtrip = ModifiedJulianDate::from_unix_timestamp(timestamp);
        assert!((original.value() - roundtrip.value()).abs() < 1e-9);
    }

    #[test]
    fn test_mjd_to_datetime() {
        // 2016-03-08 00:00:00 UTC is MJD 57455
        let mjd = ModifiedJulianDate::new(57455.0);
        let dt = mjd.to_datetime();
        assert_eq!(dt.format("%Y/%m/%d %H:%M:%S").to_string(), "2016/03/08 00:00:00");
    }
}
