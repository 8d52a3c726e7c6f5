//! Closed-form projections in the classic AIPS convention
//!
//! All functions here work between intermediate coordinates (l, m), the
//! offsets in degrees on the projection plane after the linear scale and
//! rotation, and native sky coordinates in degrees. The reference point
//! (`ref_lon`, `ref_lat`) is CRVAL.

use crate::constants::{DEG2RAD, RAD2DEG};
use crate::coordinates::normalize_longitude;

use super::{ProjectionCode, ProjectionError};

const DEPS: f64 = 1.0e-5;
const HALF_PI: f64 = std::f64::consts::FRAC_PI_2;
const PI: f64 = std::f64::consts::PI;

/// Axis increments and rotation (degrees) that the AIT and MER projections
/// fold into their scale factors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisGeometry {
    pub cdelt1: f64,
    pub cdelt2: f64,
    pub rotation: f64,
}

impl AxisGeometry {
    /// Increments along the rotated axes: (along x, along y)
    fn rotated_increments(&self) -> (f64, f64) {
        let (sinr, cosr) = (self.rotation * DEG2RAD).sin_cos();
        let along_x = self.cdelt1 * cosr - self.cdelt2 * sinr;
        let along_y = self.cdelt2 * cosr + self.cdelt1 * sinr;
        (along_x, along_y)
    }
}

/// Scale factors of the Aitoff projection at reference latitude `dec0`
/// (radians)
fn aitoff_factors(geom: &AxisGeometry, dec0: f64) -> (f64, f64, f64) {
    let (along_x, along_y) = geom.rotated_increments();

    let mut dt = if along_y == 0.0 { 1.0 } else { along_y };
    dt *= DEG2RAD;
    let mut dx = (dec0 + dt).sin() / ((1.0 + (dec0 + dt).cos()) / 2.0).sqrt()
        - dec0.sin() / ((1.0 + dec0.cos()) / 2.0).sqrt();
    if dx == 0.0 {
        dx = 1.0;
    }
    let geo2 = dt / dx;

    let mut dt = if along_x == 0.0 { 1.0 } else { along_x };
    dt *= DEG2RAD;
    let mut dx = 2.0 * dec0.cos() * (dt / 2.0).sin();
    if dx == 0.0 {
        dx = 1.0;
    }
    let geo1 = dt * ((1.0 + dec0.cos() * (dt / 2.0).cos()) / 2.0).sqrt() / dx;
    let geo3 = geo2 * dec0.sin() / ((1.0 + dec0.cos()) / 2.0).sqrt();

    (geo1, geo2, geo3)
}

/// Scale factors of the Mercator projection at reference latitude
/// `ref_lat` (degrees)
fn mercator_factors(geom: &AxisGeometry, ref_lat: f64) -> (f64, f64, f64) {
    let (_, along_y) = geom.rotated_increments();
    let dt = if along_y == 0.0 { 1.0 } else { along_y };

    let dy = (ref_lat / 2.0 + 45.0) * DEG2RAD;
    let dx = dy + dt / 2.0 * DEG2RAD;
    let dy = dy.tan().ln();
    let dx = dx.tan().ln();
    let geo2 = dt * DEG2RAD / (dx - dy);
    let geo3 = geo2 * dy;
    let mut geo1 = (ref_lat * DEG2RAD).cos();
    if geo1 <= 0.0 {
        geo1 = 1.0;
    }
    (geo1, geo2, geo3)
}

/// Intermediate (l, m) in degrees to native sky (lon, lat) in degrees
pub fn intermediate_to_sky(
    code: ProjectionCode,
    l_deg: f64,
    m_deg: f64,
    ref_lon: f64,
    ref_lat: f64,
    geom: &AxisGeometry,
) -> Result<(f64, f64), ProjectionError> {
    if code == ProjectionCode::Linear {
        return Ok((ref_lon + l_deg, ref_lat + m_deg));
    }

    let ra0 = ref_lon * DEG2RAD;
    let dec0 = ref_lat * DEG2RAD;
    let l = l_deg * DEG2RAD;
    let m = m_deg * DEG2RAD;
    let sins = l * l + m * m;
    let (sin0, cos0) = dec0.sin_cos();

    let (rat, dect) = match code {
        ProjectionCode::Car => (ra0 + l, dec0 + m),
        ProjectionCode::Tan => {
            let x = cos0 * ra0.cos() - l * ra0.sin() - m * ra0.cos() * sin0;
            let y = cos0 * ra0.sin() + l * ra0.cos() - m * ra0.sin() * sin0;
            let z = sin0 + m * cos0;
            (y.atan2(x), (z / (x * x + y * y).sqrt()).atan())
        }
        ProjectionCode::Sin => {
            if sins > 1.0 {
                return Err(ProjectionError::AngleTooLarge);
            }
            let coss = (1.0 - sins).sqrt();
            let dt = sin0 * coss + cos0 * m;
            if !(-1.0..=1.0).contains(&dt) {
                return Err(ProjectionError::AngleTooLarge);
            }
            let rat = cos0 * coss - sin0 * m;
            if rat == 0.0 && l == 0.0 {
                return Err(ProjectionError::AngleTooLarge);
            }
            (l.atan2(rat) + ra0, dt.asin())
        }
        ProjectionCode::Stg => {
            let dz = (4.0 - sins) / (4.0 + sins);
            if dz.abs() > 1.0 {
                return Err(ProjectionError::AngleTooLarge);
            }
            let sin_dec = dz * sin0 + m * cos0 * (1.0 + dz) / 2.0;
            if sin_dec.abs() > 1.0 {
                return Err(ProjectionError::AngleTooLarge);
            }
            let dect = sin_dec.asin();
            let cos_dec = dect.cos();
            if cos_dec.abs() < DEPS {
                return Err(ProjectionError::AngleTooLarge);
            }
            let sin_dra = l * (1.0 + dz) / (2.0 * cos_dec);
            if sin_dra.abs() > 1.0 {
                return Err(ProjectionError::AngleTooLarge);
            }
            let mut dra = sin_dra.asin();
            let mg = 1.0 + dect.sin() * sin0 + dect.cos() * cos0 * dra.cos();
            if mg.abs() < DEPS {
                return Err(ProjectionError::AngleTooLarge);
            }
            let mg = 2.0 * (dect.sin() * cos0 - dect.cos() * sin0 * dra.cos()) / mg;
            // asin picks the near branch; m decides which side we are on
            if (mg - m).abs() > DEPS {
                dra = PI - dra;
            }
            (ra0 + dra, dect)
        }
        ProjectionCode::Arc => {
            if sins >= PI * PI {
                return Err(ProjectionError::AngleTooLarge);
            }
            let rho = sins.sqrt();
            let coss = rho.cos();
            let sinc = if rho != 0.0 { rho.sin() / rho } else { 1.0 };
            let dt = m * cos0 * sinc + sin0 * coss;
            if !(-1.0..=1.0).contains(&dt) {
                return Err(ProjectionError::AngleTooLarge);
            }
            let da = coss - dt * sin0;
            let dl = l * sinc * cos0;
            if da == 0.0 && dl == 0.0 {
                return Err(ProjectionError::AngleTooLarge);
            }
            (ra0 + dl.atan2(da), dt.asin())
        }
        ProjectionCode::Ait => {
            let (geo1, geo2, geo3) = aitoff_factors(geom, dec0);
            if l == 0.0 && m == 0.0 {
                (ra0, dec0)
            } else {
                let dz = 4.0 - l * l / (4.0 * geo1 * geo1) - ((m + geo3) / geo2).powi(2);
                if !(2.0..=4.0).contains(&dz) {
                    return Err(ProjectionError::AngleTooLarge);
                }
                let dz = 0.5 * dz.sqrt();
                let dd = (m + geo3) * dz / geo2;
                if dd.abs() > 1.0 {
                    return Err(ProjectionError::AngleTooLarge);
                }
                let dd = dd.asin();
                if dd.cos().abs() < DEPS {
                    return Err(ProjectionError::AngleTooLarge);
                }
                let da = l * dz / (2.0 * geo1 * dd.cos());
                if da.abs() > 1.0 {
                    return Err(ProjectionError::AngleTooLarge);
                }
                (ra0 + 2.0 * da.asin(), dd)
            }
        }
        ProjectionCode::Ncp => {
            let num = cos0 - m * sin0;
            if num == 0.0 {
                return Err(ProjectionError::AngleTooLarge);
            }
            let rat = ra0 + l.atan2(num);
            let dt = (rat - ra0).cos();
            if dt == 0.0 {
                return Err(ProjectionError::AngleTooLarge);
            }
            let cos_dec = num / dt;
            if !(-1.0..=1.0).contains(&cos_dec) {
                return Err(ProjectionError::AngleTooLarge);
            }
            let dect = cos_dec.acos();
            (rat, if dec0 < 0.0 { -dect } else { dect })
        }
        ProjectionCode::Gls => {
            let dect = dec0 + m;
            if dect.abs() > HALF_PI {
                return Err(ProjectionError::AngleTooLarge);
            }
            let coss = dect.cos();
            if l.abs() > PI * coss {
                return Err(ProjectionError::AngleTooLarge);
            }
            let rat = if coss > DEPS { ra0 + l / coss } else { ra0 };
            (rat, dect)
        }
        ProjectionCode::Mer => {
            let (geo1, geo2, geo3) = mercator_factors(geom, ref_lat);
            let rat = l / geo1 + ra0;
            if (rat - ra0).abs() > 2.0 * PI {
                return Err(ProjectionError::AngleTooLarge);
            }
            let dt = if geo2 != 0.0 { (m + geo3) / geo2 } else { 0.0 };
            (rat, 2.0 * dt.exp().atan() - HALF_PI)
        }
        ProjectionCode::Linear
        | ProjectionCode::Plate
        | ProjectionCode::Dss
        | ProjectionCode::Sirtf => return Err(ProjectionError::BadValue),
    };

    if !rat.is_finite() || !dect.is_finite() {
        return Err(ProjectionError::BadValue);
    }
    Ok((normalize_longitude(rat * RAD2DEG), dect * RAD2DEG))
}

/// Native sky (lon, lat) in degrees to intermediate (l, m) in degrees
pub fn sky_to_intermediate(
    code: ProjectionCode,
    lon: f64,
    lat: f64,
    ref_lon: f64,
    ref_lat: f64,
    geom: &AxisGeometry,
) -> Result<(f64, f64), ProjectionError> {
    if code == ProjectionCode::Linear {
        return Ok((lon - ref_lon, lat - ref_lat));
    }

    // Bring lon within 180 degrees of the reference
    let mut dlon = lon - ref_lon;
    if dlon > 180.0 {
        dlon -= 360.0;
    } else if dlon < -180.0 {
        dlon += 360.0;
    }

    if code == ProjectionCode::Car {
        return Ok((dlon, lat - ref_lat));
    }

    let dec0 = ref_lat * DEG2RAD;
    let dec = lat * DEG2RAD;
    let dra = dlon * DEG2RAD;
    let (sins, coss) = dec.sin_cos();
    let (sin0, cos0) = dec0.sin_cos();
    let (sin_dra, cos_dra) = dra.sin_cos();

    let sint = sins * sin0 + coss * cos0 * cos_dra;
    let along_meridian = sins * cos0 - coss * sin0 * cos_dra;

    let (l, m) = match code {
        ProjectionCode::Tan => {
            if sint <= 0.0 {
                return Err(ProjectionError::AngleTooLarge);
            }
            (coss * sin_dra / sint, along_meridian / sint)
        }
        ProjectionCode::Sin => {
            if sint < 0.0 {
                return Err(ProjectionError::AngleTooLarge);
            }
            (coss * sin_dra, along_meridian)
        }
        ProjectionCode::Stg => {
            if dec.abs() > HALF_PI {
                return Err(ProjectionError::AngleTooLarge);
            }
            let dd = 1.0 + sint;
            if dd.abs() < DEPS {
                return Err(ProjectionError::AngleTooLarge);
            }
            let dd = 2.0 / dd;
            (dd * coss * sin_dra, dd * along_meridian)
        }
        ProjectionCode::Arc => {
            let rho = sint.clamp(-1.0, 1.0).acos();
            let scale = if rho != 0.0 { rho / rho.sin() } else { 1.0 };
            (scale * coss * sin_dra, scale * along_meridian)
        }
        ProjectionCode::Ait => {
            let da = dra / 2.0;
            if da.abs() > HALF_PI {
                return Err(ProjectionError::AngleTooLarge);
            }
            let (geo1, geo2, geo3) = aitoff_factors(geom, dec0);
            let dt = ((1.0 + coss * da.cos()) / 2.0).sqrt();
            if dt.abs() < DEPS {
                return Err(ProjectionError::BadValue);
            }
            (2.0 * geo1 * coss * da.sin() / dt, geo2 * sins / dt - geo3)
        }
        ProjectionCode::Ncp => {
            if dec0 == 0.0 {
                return Err(ProjectionError::AngleTooLarge);
            }
            (coss * sin_dra, (cos0 - coss * cos_dra) / sin0)
        }
        ProjectionCode::Gls => {
            if dec.abs() > HALF_PI || dec0.abs() > HALF_PI {
                return Err(ProjectionError::AngleTooLarge);
            }
            (dra * coss, dec - dec0)
        }
        ProjectionCode::Mer => {
            let (geo1, geo2, geo3) = mercator_factors(geom, ref_lat);
            let dt = (dec / 2.0 + PI / 4.0).tan();
            if dt < DEPS {
                return Err(ProjectionError::BadValue);
            }
            (geo1 * dra, geo2 * dt.ln() - geo3)
        }
        ProjectionCode::Linear
        | ProjectionCode::Car
        | ProjectionCode::Plate
        | ProjectionCode::Dss
        | ProjectionCode::Sirtf => return Err(ProjectionError::BadValue),
    };

    if !l.is_finite() || !m.is_finite() {
        return Err(ProjectionError::BadValue);
    }
    Ok((l * RAD2DEG, m * RAD2DEG))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    const GEOM: AxisGeometry = AxisGeometry {
        cdelt1: -0.01,
        cdelt2: 0.01,
        rotation: 0.0,
    };

    #[rstest]
    #[case(ProjectionCode::Car)]
    #[case(ProjectionCode::Tan)]
    #[case(ProjectionCode::Sin)]
    #[case(ProjectionCode::Arc)]
    #[case(ProjectionCode::Stg)]
    #[case(ProjectionCode::Ncp)]
    #[case(ProjectionCode::Gls)]
    #[case(ProjectionCode::Mer)]
    #[case(ProjectionCode::Ait)]
    fn test_roundtrip_near_reference(#[case] code: ProjectionCode) {
        let (ref_lon, ref_lat) = (150.0, 35.0);
        for &(l, m) in &[(0.0, 0.0), (0.5, -0.3), (-1.2, 0.8), (2.0, 2.0), (-0.01, -3.0)] {
            let (lon, lat) = intermediate_to_sky(code, l, m, ref_lon, ref_lat, &GEOM).unwrap();
            let (l_rt, m_rt) = sky_to_intermediate(code, lon, lat, ref_lon, ref_lat, &GEOM).unwrap();
            assert_relative_eq!(l, l_rt, epsilon = 1e-9);
            assert_relative_eq!(m, m_rt, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_reference_point_maps_to_origin() {
        let (lon, lat) =
            intermediate_to_sky(ProjectionCode::Tan, 0.0, 0.0, 180.0, 30.0, &GEOM).unwrap();
        assert_relative_eq!(lon, 180.0, epsilon = 1e-12);
        assert_relative_eq!(lat, 30.0, epsilon = 1e-12);
    }

    #[test]
    fn test_tan_known_offset() {
        // One degree along the tangent plane at the equator is atan(1°)
        let (lon, lat) =
            intermediate_to_sky(ProjectionCode::Tan, 1.0, 0.0, 0.0, 0.0, &GEOM).unwrap();
        assert_relative_eq!(lon, (1.0f64 * DEG2RAD).atan() * RAD2DEG, epsilon = 1e-12);
        assert_relative_eq!(lat, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_tan_rejects_far_hemisphere() {
        assert_eq!(
            sky_to_intermediate(ProjectionCode::Tan, 180.0, 0.0, 0.0, 0.0, &GEOM),
            Err(ProjectionError::AngleTooLarge)
        );
    }

    #[test]
    fn test_sin_rejects_outside_unit_circle() {
        assert_eq!(
            intermediate_to_sky(ProjectionCode::Sin, 60.0, 60.0, 0.0, 0.0, &GEOM),
            Err(ProjectionError::AngleTooLarge)
        );
    }

    #[test]
    fn test_ncp_rejects_equator() {
        assert_eq!(
            sky_to_intermediate(ProjectionCode::Ncp, 10.0, 10.0, 0.0, 0.0, &GEOM),
            Err(ProjectionError::AngleTooLarge)
        );
    }

    #[test]
    fn test_ra_wraps_across_zero() {
        let (lon, _) =
            intermediate_to_sky(ProjectionCode::Tan, 0.5, 0.0, 359.8, 10.0, &GEOM).unwrap();
        assert!(lon < 1.0 && lon >= 0.0, "lon = {}", lon);
        let (l, _) = sky_to_intermediate(ProjectionCode::Tan, lon, 10.0, 359.8, 10.0, &GEOM).unwrap();
        assert!(l > 0.0);
    }

    #[test]
    fn test_linear_is_plain_offset() {
        let (x, y) =
            intermediate_to_sky(ProjectionCode::Linear, 3.0, -4.0, 10.0, 20.0, &GEOM).unwrap();
        assert_eq!((x, y), (13.0, 16.0));
        let (l, m) = sky_to_intermediate(ProjectionCode::Linear, x, y, 10.0, 20.0, &GEOM).unwrap();
        assert_eq!((l, m), (3.0, -4.0));
    }

    #[test]
    fn test_non_closed_form_codes_rejected() {
        assert_eq!(
            intermediate_to_sky(ProjectionCode::Plate, 0.0, 0.0, 0.0, 0.0, &GEOM),
            Err(ProjectionError::BadValue)
        );
    }
}
