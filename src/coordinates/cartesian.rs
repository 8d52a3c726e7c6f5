//! # Direction Cosines
//!
//! Unit vectors on the celestial sphere. Every frame rotation in this crate
//! (precession, FK4/FK5, galactic, ecliptic) is carried out on a
//! `Cartesian3` rather than on spherical angles, which keeps the poles free
//! of special cases.
//!
//! Axis convention (for any longitude/latitude frame):
//! - **X**: toward longitude 0°, latitude 0°
//! - **Y**: toward longitude 90°, latitude 0°
//! - **Z**: toward latitude +90°

use nalgebra::Vector3;

use crate::constants::{DEG2RAD, RAD2DEG};

/// Three-dimensional Cartesian direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cartesian3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Cartesian3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Cartesian3 { x, y, z }
    }

    /// Unit vector for a longitude/latitude pair given in degrees
    ///
    /// # Examples
    ///
    /// ```rust
    /// use wcscore::coordinates::cartesian::Cartesian3;
    ///
    /// let pole = Cartesian3::from_lonlat_deg(0.0, 90.0);
    /// assert!(pole.x.abs() < 1e-15);
    /// assert!((pole.z - 1.0).abs() < 1e-15);
    /// ```
    pub fn from_lonlat_deg(lon: f64, lat: f64) -> Self {
        let (sin_lon, cos_lon) = (lon * DEG2RAD).sin_cos();
        let (sin_lat, cos_lat) = (lat * DEG2RAD).sin_cos();
        Cartesian3 {
            x: cos_lat * cos_lon,
            y: cos_lat * sin_lon,
            z: sin_lat,
        }
    }

    /// Longitude and latitude in degrees, longitude normalized to [0, 360)
    ///
    /// The vector does not need to be normalized. A zero vector maps to (0, 0)
    /// and the longitude at either pole is reported as 0.
    pub fn to_lonlat_deg(&self) -> (f64, f64) {
        let r_xy = (self.x * self.x + self.y * self.y).sqrt();
        if r_xy == 0.0 && self.z == 0.0 {
            return (0.0, 0.0);
        }
        let lon = if r_xy == 0.0 {
            0.0
        } else {
            self.y.atan2(self.x) * RAD2DEG
        };
        let lat = self.z.atan2(r_xy) * RAD2DEG;
        (super::normalize_longitude(lon), lat)
    }

    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Returns a unit vector in the same direction, or `None` for a zero vector
    pub fn normalize(&self) -> Option<Cartesian3> {
        let mag = self.magnitude();
        if mag == 0.0 {
            None
        } else {
            Some(*self / mag)
        }
    }

    pub fn dot(&self, other: &Cartesian3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Angle to another direction in radians
    ///
    /// Uses half the squared chord length, `w = |a - b|² / 4`, and
    /// `2·atan2(√w, √(1 − w))`, which stays accurate for nearly coincident and
    /// nearly antipodal directions where `acos` of the dot product does not.
    pub fn angular_distance(&self, other: &Cartesian3) -> f64 {
        let a = self.normalize().unwrap_or(*self);
        let b = other.normalize().unwrap_or(*other);
        let chord = a - b;
        let w = (chord.dot(&chord) / 4.0).clamp(0.0, 1.0);
        2.0 * w.sqrt().atan2((1.0 - w).sqrt())
    }

    pub fn to_vector3(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    pub fn from_vector3(vec: Vector3<f64>) -> Self {
        Cartesian3::new(vec.x, vec.y, vec.z)
    }
}

impl std::ops::Add for Cartesian3 {
    type Output = Cartesian3;

    fn add(self, other: Cartesian3) -> Cartesian3 {
        Cartesian3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl std::ops::Sub for Cartesian3 {
    type Output = Cartesian3;

    fn sub(self, other: Cartesian3) -> Cartesian3 {
        Cartesian3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl std::ops::Mul<f64> for Cartesian3 {
    type Output = Cartesian3;

    fn mul(self, scalar: f64) -> Cartesian3 {
        Cartesian3::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl std::ops::Div<f64> for Cartesian3 {
    type Output = Cartesian3;

    fn div(self, scalar: f64) -> Cartesian3 {
        Cartesian3::new(self.x / scalar, self.y / scalar, self.z / scalar)
    }
}
