//! FK4 (B1950) to FK5 (J2000) conversion for positions without proper motion
//!
//! The forward direction removes the E-terms of aberration, applies the
//! Standish 6×6 transformation and then the fictitious proper motion that a
//! star with zero FK4 proper motion acquires in FK5, evaluated at the epoch
//! of observation. The reverse direction inverts the forward one by
//! iteration so that FK4 → FK5 → FK4 returns to the starting point.

use lazy_static::lazy_static;
use log::warn;
use nalgebra::{Matrix3, Matrix6, Vector3, Vector6};

use crate::constants::PM_FACTOR;
use crate::coordinates::cartesian::Cartesian3;
use crate::time::besselian_to_julian_epoch;

/// Radians; E-terms of aberration in position
const E_TERMS: [f64; 3] = [-1.62557e-6, -0.31919e-6, -0.13843e-6];
/// Radians per tropical century; rate of change of the E-terms
const E_TERMS_DOT: [f64; 3] = [1.245e-3, -1.580e-3, -0.659e-3];

const MAX_INVERSE_ITERATIONS: usize = 20;
const INVERSE_TOLERANCE: f64 = 1e-14;

lazy_static! {
    static ref FK4_TO_FK5: Matrix6<f64> = Matrix6::from_row_slice(&[
        0.999_925_678_2, -0.011_182_061_1, -0.004_857_947_7,
        0.000_002_423_950_18, -0.000_000_027_106_63, -0.000_000_011_776_56,
        0.011_182_061_0, 0.999_937_478_4, -0.000_027_176_5,
        0.000_000_027_106_63, 0.000_002_423_978_78, -0.000_000_000_065_87,
        0.004_857_947_9, -0.000_027_147_4, 0.999_988_199_7,
        0.000_000_011_776_56, -0.000_000_000_065_82, 0.000_002_424_101_73,
        -0.000_551, -0.238_565, 0.435_739,
        0.999_947_04, -0.011_182_51, -0.004_857_67,
        0.238_514, -0.002_667, -0.008_541,
        0.011_182_51, 0.999_958_83, -0.000_027_18,
        -0.435_623, 0.012_254, 0.002_117,
        0.004_857_67, -0.000_027_14, 1.000_009_56,
    ]);

    /// Position block of the forward matrix, used to seed the inverse
    static ref FK4_TO_FK5_POSITION: Matrix3<f64> = FK4_TO_FK5.fixed_view::<3, 3>(0, 0).into_owned();
}

/// FK4 B1950 direction to FK5 J2000, for a star observed at Besselian epoch
/// `epoch` and assumed to have zero proper motion in FK4
pub fn fk4_to_fk5(v: &Cartesian3, epoch: f64) -> Cartesian3 {
    let r0 = v.normalize().unwrap_or(*v).to_vector3();

    // E-terms at the epoch of observation
    let w = (epoch - 1950.0) / PM_FACTOR;
    let a1 = Vector3::from(E_TERMS) + Vector3::from(E_TERMS_DOT) * w;

    let v1 = r0 - a1 + r0 * r0.dot(&a1);
    let v2: Vector6<f64> = *FK4_TO_FK5 * Vector6::new(v1.x, v1.y, v1.z, 0.0, 0.0, 0.0);

    // Fictitious proper motion from J2000 to the epoch of observation
    let w = (besselian_to_julian_epoch(epoch) - 2000.0) / PM_FACTOR;
    let position = Vector3::new(v2[0], v2[1], v2[2]) + Vector3::new(v2[3], v2[4], v2[5]) * w;

    let result = Cartesian3::from_vector3(position);
    result.normalize().unwrap_or(result)
}

/// FK5 J2000 direction to FK4 B1950, the inverse of [`fk4_to_fk5`] at the
/// same epoch
pub fn fk5_to_fk4(v: &Cartesian3, epoch: f64) -> Cartesian3 {
    let target = v.normalize().unwrap_or(*v).to_vector3();
    let back = FK4_TO_FK5_POSITION.transpose();

    let mut guess = normalized(back * target);
    for _ in 0..MAX_INVERSE_ITERATIONS {
        let forward = fk4_to_fk5(&Cartesian3::from_vector3(guess), epoch).to_vector3();
        let residual = target - forward;
        if residual.norm() < INVERSE_TOLERANCE {
            return Cartesian3::from_vector3(guess);
        }
        guess = normalized(guess + back * residual);
    }

    warn!("FK5 to FK4 inversion stopped after {} iterations", MAX_INVERSE_ITERATIONS);
    Cartesian3::from_vector3(guess)
}

fn normalized(v: Vector3<f64>) -> Vector3<f64> {
    let norm = v.norm();
    if norm > 0.0 {
        v / norm
    } else {
        v
    }
}
