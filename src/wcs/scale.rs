//! Linear pixel → intermediate transform (the CD matrix)

use nalgebra::{Matrix2, Vector2};

use crate::constants::{DEG2RAD, RAD2DEG};
use crate::projection::classic::AxisGeometry;
use crate::{Result, WcsError};

/// CD matrix with its cached inverse
///
/// The AIPS increments and rotation are derived on demand:
///
/// ```text
/// CD = | cdelt1·cos ρ   -cdelt2·sin ρ |
///      | cdelt1·sin ρ    cdelt2·cos ρ |
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleMatrix {
    cd: Matrix2<f64>,
    inverse: Matrix2<f64>,
}

impl ScaleMatrix {
    pub fn from_cd(cd1_1: f64, cd1_2: f64, cd2_1: f64, cd2_2: f64) -> Result<Self> {
        Self::from_matrix(Matrix2::new(cd1_1, cd1_2, cd2_1, cd2_2))
    }

    /// Builds the CD matrix from axis increments (degrees/pixel) and a
    /// rotation in degrees
    pub fn from_cdelt(cdelt1: f64, cdelt2: f64, rotation: f64) -> Result<Self> {
        let (sinr, cosr) = (rotation * DEG2RAD).sin_cos();
        Self::from_matrix(Matrix2::new(
            cdelt1 * cosr,
            -cdelt2 * sinr,
            cdelt1 * sinr,
            cdelt2 * cosr,
        ))
    }

    pub fn from_matrix(cd: Matrix2<f64>) -> Result<Self> {
        // Singular relative to the matrix scale, not in absolute terms
        let det = cd.determinant();
        if !det.is_finite() || det.abs() <= f64::EPSILON * cd.norm_squared() {
            return Err(WcsError::SingularMatrix(det));
        }
        let inverse = cd.try_inverse().ok_or(WcsError::SingularMatrix(det))?;
        Ok(ScaleMatrix { cd, inverse })
    }

    pub fn cd(&self) -> &Matrix2<f64> {
        &self.cd
    }

    pub fn inverse(&self) -> &Matrix2<f64> {
        &self.inverse
    }

    pub fn determinant(&self) -> f64 {
        self.cd.determinant()
    }

    /// Axis increments (cdelt1, cdelt2) in degrees/pixel; a negative
    /// determinant puts the flip on axis 1
    pub fn cdelt(&self) -> (f64, f64) {
        let c = &self.cd;
        let mut cdelt1 = c[(0, 0)].hypot(c[(1, 0)]);
        let cdelt2 = c[(0, 1)].hypot(c[(1, 1)]);
        if self.determinant() < 0.0 {
            cdelt1 = -cdelt1;
        }
        (cdelt1, cdelt2)
    }

    /// Rotation of axis 2 in degrees
    pub fn rotation(&self) -> f64 {
        let rot = (-self.cd[(0, 1)]).atan2(self.cd[(1, 1)]) * RAD2DEG;
        if rot.abs() < 1e-12 {
            0.0
        } else {
            rot
        }
    }

    pub fn geometry(&self) -> AxisGeometry {
        let (cdelt1, cdelt2) = self.cdelt();
        AxisGeometry {
            cdelt1,
            cdelt2,
            rotation: self.rotation(),
        }
    }

    /// Mean pixel size in arcseconds
    pub fn pixel_scale_arcsec(&self) -> f64 {
        self.determinant().abs().sqrt() * 3600.0
    }

    /// Pixel offset to intermediate (l, m) in degrees
    pub fn apply(&self, dx: f64, dy: f64) -> (f64, f64) {
        let v = self.cd * Vector2::new(dx, dy);
        (v.x, v.y)
    }

    /// Intermediate (l, m) in degrees to pixel offset
    pub fn apply_inverse(&self, l: f64, m: f64) -> (f64, f64) {
        let v = self.inverse * Vector2::new(l, m);
        (v.x, v.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_diagonal_cd() {
        let scale = ScaleMatrix::from_cd(-0.0002777, 0.0, 0.0, 0.0002777).unwrap();
        let (cdelt1, cdelt2) = scale.cdelt();
        assert_relative_eq!(cdelt1, -0.0002777);
        assert_relative_eq!(cdelt2, 0.0002777);
        assert_eq!(scale.rotation(), 0.0);
        assert_relative_eq!(scale.pixel_scale_arcsec(), 0.0002777 * 3600.0, max_relative = 1e-12);
    }

    #[rstest]
    #[case(-1e-4, 1e-4, 0.0)]
    #[case(-1e-4, 1e-4, 30.0)]
    #[case(-2e-4, 1e-4, -75.0)]
    #[case(1e-4, 1e-4, 120.0)]
    #[case(-3e-4, 3e-4, 180.0)]
    fn test_cdelt_rotation_roundtrip(#[case] cdelt1: f64, #[case] cdelt2: f64, #[case] rot: f64) {
        let scale = ScaleMatrix::from_cdelt(cdelt1, cdelt2, rot).unwrap();
        let rebuilt =
            ScaleMatrix::from_cdelt(scale.cdelt().0, scale.cdelt().1, scale.rotation()).unwrap();
        assert_relative_eq!(*rebuilt.cd(), *scale.cd(), epsilon = 1e-15);
        assert_relative_eq!(scale.cdelt().1, cdelt2.abs(), max_relative = 1e-12);
    }

    #[test]
    fn test_apply_inverse() {
        let scale = ScaleMatrix::from_cdelt(-1e-4, 1.2e-4, 17.0).unwrap();
        let (l, m) = scale.apply(12.5, -40.0);
        let (dx, dy) = scale.apply_inverse(l, m);
        assert_relative_eq!(dx, 12.5, epsilon = 1e-9);
        assert_relative_eq!(dy, -40.0, epsilon = 1e-9);
    }

    #[test]
    fn test_singular() {
        assert!(matches!(
            ScaleMatrix::from_cd(1e-4, 1e-4, 1e-4, 1e-4),
            Err(WcsError::SingularMatrix(_))
        ));
        assert!(ScaleMatrix::from_cdelt(0.0, 1e-4, 0.0).is_err());
        assert!(ScaleMatrix::from_cd(1e-9, 1e-9, 1e-9, 1e-9 * (1.0 + 1e-17)).is_err());
    }

    #[rstest]
    #[case(2.78e-8)]
    #[case(1e-10)]
    #[case(1e-3)]
    fn test_fine_scale_is_invertible(#[case] cdelt: f64) {
        let scale = ScaleMatrix::from_cdelt(-cdelt, cdelt, 25.0).unwrap();
        assert_relative_eq!(scale.cdelt().1, cdelt, max_relative = 1e-12);
        let (l, m) = scale.apply(100.0, -37.5);
        let (dx, dy) = scale.apply_inverse(l, m);
        assert_relative_eq!(dx, 100.0, epsilon = 1e-9);
        assert_relative_eq!(dy, -37.5, epsilon = 1e-9);
    }
}
