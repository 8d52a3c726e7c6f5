pub mod cartesian;
pub mod sexagesimal;

use cartesian::Cartesian3;

pub use sexagesimal::{dec_to_string, deg_to_string, parse_dec, parse_ra, ra_to_string};

/// Wraps a longitude in degrees into [0, 360)
pub fn normalize_longitude(lon: f64) -> f64 {
    let wrapped = lon.rem_euclid(360.0);
    // rem_euclid can return 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Angular distance in degrees between two (lon, lat) positions in degrees
///
/// Symmetric in its arguments and exactly zero for identical points.
///
/// # Examples
///
/// ```rust
/// use wcscore::coordinates::distance;
///
/// assert!((distance(0.0, 0.0, 90.0, 0.0) - 90.0).abs() < 1e-9);
/// ```
pub fn distance(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let a = Cartesian3::from_lonlat_deg(lon1, lat1);
    let b = Cartesian3::from_lonlat_deg(lon2, lat2);
    a.angular_distance(&b).to_degrees()
}
