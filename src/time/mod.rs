//! Epoch handling for WCS headers
//!
//! Headers carry time in several forms: fractional years (EPOCH, EQUINOX),
//! modified Julian dates (MJD-OBS) and calendar dates (DATE-OBS, DATE). This
//! module turns all of them into years and converts between Besselian and
//! Julian epochs, which the FK4/FK5 conversion needs.

use chrono::{NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::constants::{JULIAN_YEAR, MJD_B1900, MJD_OFFSET, TROPICAL_YEAR};

/// Error type for time operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TimeError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),

    #[error("Time out of range: {0}")]
    OutOfRange(String),
}

/// Result type for time operations
pub type Result<T> = std::result::Result<T, TimeError>;

/// Modified Julian date of J2000.0
const MJD_J2000: f64 = 51_544.5;

/// Which year an epoch or equinox is counted in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochScale {
    /// Tropical years from B1900.0, used with FK4
    Besselian,
    /// Julian years from J2000.0, used with FK5
    Julian,
}

lazy_static! {
    static ref EQUINOX_RE: Regex =
        Regex::new(r"^([JjBb])?\s*([0-9]+(?:\.[0-9]*)?)$").expect("static regex");
    static ref LEGACY_DATE_RE: Regex =
        Regex::new(r"^([0-9]{1,2})/([0-9]{1,2})/([0-9]{2,4})$").expect("static regex");
}

/// Besselian epoch of a modified Julian date
///
/// # Examples
///
/// ```rust
/// use wcscore::time::mjd_to_epoch;
///
/// assert!((mjd_to_epoch(15019.81352) - 1900.0).abs() < 1e-12);
/// ```
pub fn mjd_to_epoch(mjd: f64) -> f64 {
    1900.0 + (mjd - MJD_B1900) / TROPICAL_YEAR
}

/// Modified Julian date of a Besselian epoch
pub fn besselian_epoch_to_mjd(epoch: f64) -> f64 {
    MJD_B1900 + (epoch - 1900.0) * TROPICAL_YEAR
}

/// Julian epoch of a modified Julian date
pub fn mjd_to_julian_epoch(mjd: f64) -> f64 {
    2000.0 + (mjd - MJD_J2000) / JULIAN_YEAR
}

/// Modified Julian date of a Julian epoch
pub fn julian_epoch_to_mjd(epoch: f64) -> f64 {
    MJD_J2000 + (epoch - 2000.0) * JULIAN_YEAR
}

pub fn besselian_to_julian_epoch(epoch: f64) -> f64 {
    mjd_to_julian_epoch(besselian_epoch_to_mjd(epoch))
}

pub fn julian_to_besselian_epoch(epoch: f64) -> f64 {
    mjd_to_epoch(julian_epoch_to_mjd(epoch))
}

/// Julian date of a Julian epoch
pub fn julian_epoch_to_jd(epoch: f64) -> f64 {
    julian_epoch_to_mjd(epoch) + MJD_OFFSET
}

/// Parses an equinox such as `2000`, `1950.0`, `J2000` or `B1950.0`
///
/// Returns the year and, when a `J`/`B` prefix is present, the scale it
/// names.
pub fn parse_equinox(text: &str) -> Result<(f64, Option<EpochScale>)> {
    let trimmed = text.trim();
    let caps = EQUINOX_RE
        .captures(trimmed)
        .ok_or_else(|| TimeError::InvalidFormat(trimmed.to_string()))?;

    let year: f64 = caps[2]
        .parse()
        .map_err(|_| TimeError::InvalidFormat(trimmed.to_string()))?;

    let scale = caps.get(1).map(|m| match m.as_str() {
        "B" | "b" => EpochScale::Besselian,
        _ => EpochScale::Julian,
    });

    Ok((year, scale))
}

/// Modified Julian date of a calendar date and time, taken as UTC
pub fn datetime_to_mjd(datetime: NaiveDateTime) -> Result<f64> {
    let origin = NaiveDate::from_ymd_opt(1858, 11, 17)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| TimeError::OutOfRange("MJD origin".to_string()))?;
    let elapsed = (datetime - origin).num_milliseconds() as f64;
    Ok(elapsed / 86_400_000.0)
}

/// Parses the legacy `dd/mm/yy` form, where two-digit years are 19yy
fn parse_legacy_date(text: &str) -> Option<Result<NaiveDateTime>> {
    let caps = LEGACY_DATE_RE.captures(text)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let mut year: i32 = caps[3].parse().ok()?;
    if year < 100 {
        year += 1900;
    }

    Some(
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| TimeError::OutOfRange(text.to_string())),
    )
}

/// Converts a FITS date (`YYYY-MM-DD`, `YYYY-MM-DDThh:mm:ss[.sss]` or the
/// legacy `dd/mm/yy`) to a modified Julian date
pub fn date_to_mjd(text: &str) -> Result<f64> {
    let trimmed = text.trim();

    if let Some(legacy) = parse_legacy_date(trimmed) {
        return datetime_to_mjd(legacy?);
    }

    let datetime = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default())
        })
        .map_err(|_| TimeError::InvalidFormat(trimmed.to_string()))?;

    datetime_to_mjd(datetime)
}

/// Besselian epoch of a FITS date, as [`date_to_mjd`] then [`mjd_to_epoch`]
///
/// # Examples
///
/// ```rust
/// use wcscore::time::{date_to_epoch, mjd_to_epoch};
///
/// let epoch = date_to_epoch("2001-07-02T12:00:00").unwrap();
/// assert!((epoch - mjd_to_epoch(52092.5)).abs() < 1e-12);
/// ```
pub fn date_to_epoch(text: &str) -> Result<f64> {
    Ok(mjd_to_epoch(date_to_mjd(text)?))
}
