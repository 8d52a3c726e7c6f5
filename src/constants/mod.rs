//! Constants module for coordinate transforms

use std::f64::consts::PI;

// Time constants
/// J2000.0 epoch as Julian date
pub const J2000: f64 = 2_451_545.0;
/// B1950 epoch as Julian date
pub const B1950: f64 = 2_433_282.423_5;
/// Days in a Julian year
pub const JULIAN_YEAR: f64 = 365.25;
/// Days in a tropical (Besselian) year
pub const TROPICAL_YEAR: f64 = 365.242_198_781;
/// Modified Julian date of the B1900.0 epoch
pub const MJD_B1900: f64 = 15_019.813_52;
/// Offset between Julian date and modified Julian date
pub const MJD_OFFSET: f64 = 2_400_000.5;

// Angles
/// Arcseconds to radians conversion factor
pub const ASEC2RAD: f64 = 4.848_136_811_095_36e-6;
/// Arcseconds in a radian
pub const RAD2ASEC: f64 = 206_264.806_247_096_4;
/// Degrees to radians conversion factor
pub const DEG2RAD: f64 = PI / 180.0;
/// Radians to degrees conversion factor
pub const RAD2DEG: f64 = 180.0 / PI;

/// Arcseconds per century expressed as radians per year; used to turn
/// FK4/FK5 proper-motion vectors into per-year offsets.
pub const PM_FACTOR: f64 = 100.0 * RAD2ASEC;

/// Standard equinox of the FK4 system
pub const FK4_EQUINOX: f64 = 1950.0;
/// Standard equinox of the FK5 system
pub const FK5_EQUINOX: f64 = 2000.0;
