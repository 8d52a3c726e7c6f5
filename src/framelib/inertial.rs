//! Fixed rotations between equatorial and galactic frames, plus the
//! equinox-dependent ecliptic rotation.

use lazy_static::lazy_static;
use nalgebra::Matrix3;

use crate::coordinates::cartesian::Cartesian3;
use crate::precessionlib::equatorial_to_ecliptic_matrix;

lazy_static! {
    /// FK4 B1950 to galactic: north galactic pole at (192.25°, +27.4°) and
    /// galactic centre position angle 123° (Blaauw 1958)
    static ref FK4_TO_GAL: Matrix3<f64> = Matrix3::new(
        -0.066_988_739_415_150_72, -0.872_755_765_851_992_7, -0.483_538_914_632_184_24,
        0.492_728_466_075_323_6, -0.450_346_958_019_961_33, 0.744_584_633_283_031,
        -0.867_600_811_151_434_8, -0.188_374_601_722_920_45, 0.460_199_784_783_851_65,
    );

    /// FK5 J2000 to galactic, from the truncated pole (192.85948°, +27.12825°)
    /// and position angle 122.93192°
    static ref FK5_TO_GAL: Matrix3<f64> = Matrix3::new(
        -0.054_875_560_416_215_368, -0.873_437_090_234_885, -0.483_835_015_548_713_2,
        0.494_109_427_875_583_65, -0.444_829_629_960_011_2, 0.746_982_244_497_218_8,
        -0.867_666_149_019_004_7, -0.198_076_373_431_201_52, 0.455_983_776_175_066_9,
    );
}

fn rotate(matrix: &Matrix3<f64>, v: &Cartesian3) -> Cartesian3 {
    Cartesian3::from_vector3(matrix * v.to_vector3())
}

/// FK4 B1950 direction to galactic
pub fn fk4_to_galactic(v: &Cartesian3) -> Cartesian3 {
    rotate(&FK4_TO_GAL, v)
}

/// Galactic direction to FK4 B1950
pub fn galactic_to_fk4(v: &Cartesian3) -> Cartesian3 {
    rotate(&FK4_TO_GAL.transpose(), v)
}

/// FK5 J2000 direction to galactic
pub fn fk5_to_galactic(v: &Cartesian3) -> Cartesian3 {
    rotate(&FK5_TO_GAL, v)
}

/// Galactic direction to FK5 J2000
pub fn galactic_to_fk5(v: &Cartesian3) -> Cartesian3 {
    rotate(&FK5_TO_GAL.transpose(), v)
}

/// FK5 direction (mean equator and equinox of `equinox`) to ecliptic of the
/// same equinox
pub fn fk5_to_ecliptic(v: &Cartesian3, equinox: f64) -> Cartesian3 {
    rotate(&equatorial_to_ecliptic_matrix(equinox), v)
}

/// Ecliptic direction of `equinox` to FK5 of the same equinox
pub fn ecliptic_to_fk5(v: &Cartesian3, equinox: f64) -> Cartesian3 {
    rotate(&equatorial_to_ecliptic_matrix(equinox).transpose(), v)
}
