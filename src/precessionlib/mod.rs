//! Precession of equatorial coordinates between equinoxes
//!
//! Two models are provided, matching the two equatorial reference systems:
//! - FK4 (Besselian equinoxes): Newcomb's precession in the form given by
//!   Kinoshita (1975), angles in tropical centuries from B1850.
//! - FK5 (Julian equinoxes): the IAU 1976 precession of Lieske et al. (1977).
//!
//! Both are expressed as the Euler rotation `R3(-z) · R2(θ) · R3(-ζ)` applied to
//! direction cosines.

use nalgebra::Matrix3;

use crate::constants::{ASEC2RAD, DEG2RAD};
use crate::coordinates::cartesian::Cartesian3;

/// Rotation of the reference frame about the x axis by `angle` radians
pub fn rot_x(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(1.0, 0.0, 0.0, 0.0, c, s, 0.0, -s, c)
}

/// Rotation of the reference frame about the y axis by `angle` radians
pub fn rot_y(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(c, 0.0, -s, 0.0, 1.0, 0.0, s, 0.0, c)
}

/// Rotation of the reference frame about the z axis by `angle` radians
pub fn rot_z(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(c, s, 0.0, -s, c, 0.0, 0.0, 0.0, 1.0)
}

fn euler_precession(zeta: f64, z: f64, theta: f64) -> Matrix3<f64> {
    rot_z(-z) * rot_y(theta) * rot_z(-zeta)
}

/// FK4 precession matrix from Besselian equinox `ep0` to `ep1`
pub fn fk4_precession_matrix(ep0: f64, ep1: f64) -> Matrix3<f64> {
    // Tropical centuries from B1850 to the start, and over the interval
    let bigt = (ep0 - 1850.0) / 100.0;
    let t = (ep1 - ep0) / 100.0;

    let tas2r = t * ASEC2RAD;
    let w = 2303.5548 + (1.39720 + 0.000059 * bigt) * bigt;
    let zeta = (w + (0.30242 - 0.000269 * bigt + 0.017996 * t) * t) * tas2r;
    let z = (w + (1.09478 + 0.000387 * bigt + 0.018324 * t) * t) * tas2r;
    let theta = (2005.1125 + (-0.85294 - 0.000365 * bigt) * bigt
        + (-0.42647 - 0.000365 * bigt - 0.041802 * t) * t)
        * tas2r;

    euler_precession(zeta, z, theta)
}

/// FK5 (IAU 1976) precession matrix from Julian equinox `ep0` to `ep1`
pub fn fk5_precession_matrix(ep0: f64, ep1: f64) -> Matrix3<f64> {
    // Julian centuries from J2000 to the start, and over the interval
    let t0 = (ep0 - 2000.0) / 100.0;
    let t = (ep1 - ep0) / 100.0;

    let tas2r = t * ASEC2RAD;
    let w = 2306.2181 + (1.39656 - 0.000139 * t0) * t0;
    let zeta = (w + ((0.30188 - 0.000344 * t0) + 0.017998 * t) * t) * tas2r;
    let z = (w + ((1.09468 + 0.000066 * t0) + 0.018203 * t) * t) * tas2r;
    let theta = ((2004.3109 + (-0.85330 - 0.000217 * t0) * t0)
        + ((-0.42665 - 0.000217 * t0) - 0.041833 * t) * t)
        * tas2r;

    euler_precession(zeta, z, theta)
}

/// Mean obliquity of the ecliptic (IAU 1980) at a Julian epoch, in radians
pub fn mean_obliquity(epoch: f64) -> f64 {
    let t = (epoch - 2000.0) / 100.0;
    ASEC2RAD * (84381.448 + (-46.8150 + (-0.00059 + 0.001813 * t) * t) * t)
}

/// Matrix taking FK5 equatorial direction cosines of equinox `epoch` to
/// ecliptic coordinates of the same equinox
pub fn equatorial_to_ecliptic_matrix(epoch: f64) -> Matrix3<f64> {
    rot_x(mean_obliquity(epoch))
}

fn rotate_lonlat(matrix: &Matrix3<f64>, lon: f64, lat: f64) -> (f64, f64) {
    let v = Cartesian3::from_lonlat_deg(lon, lat).to_vector3();
    Cartesian3::from_vector3(matrix * v).to_lonlat_deg()
}

/// Precesses FK4 (lon, lat) in degrees from Besselian equinox `ep0` to `ep1`
pub fn precess_fk4(lon: f64, lat: f64, ep0: f64, ep1: f64) -> (f64, f64) {
    if ep0 == ep1 {
        return (lon, lat);
    }
    rotate_lonlat(&fk4_precession_matrix(ep0, ep1), lon, lat)
}

/// Precesses FK5 (lon, lat) in degrees from Julian equinox `ep0` to `ep1`
pub fn precess_fk5(lon: f64, lat: f64, ep0: f64, ep1: f64) -> (f64, f64) {
    if ep0 == ep1 {
        return (lon, lat);
    }
    rotate_lonlat(&fk5_precession_matrix(ep0, ep1), lon, lat)
}

/// Obliquity in degrees, handy for reporting
pub fn mean_obliquity_deg(epoch: f64) -> f64 {
    mean_obliquity(epoch) / DEG2RAD
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinates::distance;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_at_same_equinox() {
        let m = fk5_precession_matrix(2000.0, 2000.0);
        assert_relative_eq!(m, Matrix3::identity(), epsilon = 1e-15);
        let m = fk4_precession_matrix(1950.0, 1950.0);
        assert_relative_eq!(m, Matrix3::identity(), epsilon = 1e-15);
    }

    #[test]
    fn test_precession_matrix_is_orthonormal() {
        let m = fk5_precession_matrix(2000.0, 2050.0);
        assert_relative_eq!(m * m.transpose(), Matrix3::identity(), epsilon = 1e-14);
        assert_relative_eq!(m.determinant(), 1.0, epsilon = 1e-14);
    }

    #[test]
    fn test_fk5_roundtrip() {
        let (lon, lat) = precess_fk5(83.633, 22.0145, 2000.0, 1975.0);
        let (lon_rt, lat_rt) = precess_fk5(lon, lat, 1975.0, 2000.0);
        assert_relative_eq!(lon_rt, 83.633, epsilon = 1e-10);
        assert_relative_eq!(lat_rt, 22.0145, epsilon = 1e-10);
    }

    #[test]
    fn test_fk4_roundtrip() {
        let (lon, lat) = precess_fk4(10.0, -45.0, 1950.0, 1900.0);
        let (lon_rt, lat_rt) = precess_fk4(lon, lat, 1900.0, 1950.0);
        assert_relative_eq!(lon_rt, 10.0, epsilon = 1e-10);
        assert_relative_eq!(lat_rt, -45.0, epsilon = 1e-10);
    }

    #[test]
    fn test_general_precession_rate() {
        // The equinox point moves about 50.3 arcsec per year along the ecliptic,
        // so a star at the equinox shifts by roughly that amount in 100 years.
        let (lon, lat) = precess_fk5(0.0, 0.0, 2000.0, 2100.0);
        let shift_arcsec = distance(0.0, 0.0, lon, lat) * 3600.0;
        assert!((shift_arcsec - 5029.0).abs() < 20.0, "shift = {}", shift_arcsec);
        // Declination at RA=0 increases (theta > 0)
        assert!(lat > 0.0);
    }

    #[test]
    fn test_obliquity_j2000() {
        assert_relative_eq!(mean_obliquity_deg(2000.0), 23.439_291_1, epsilon = 1e-6);
    }

    #[test]
    fn test_ecliptic_pole() {
        // The north ecliptic pole sits at RA 18h, Dec 90 - obliquity
        let m = equatorial_to_ecliptic_matrix(2000.0);
        let (_, lat) = rotate_lonlat(&m, 270.0, 90.0 - mean_obliquity_deg(2000.0));
        assert_relative_eq!(lat, 90.0, epsilon = 1e-6);
    }
}
