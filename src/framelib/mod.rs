//! Celestial reference frames and conversion between them
//!
//! A [`SkyFrame`] is a coordinate system plus, for the equatorial and
//! ecliptic systems, the equinox its axes refer to. [`convert`] moves a
//! position between any two frames by first bringing it to the standard
//! frame of its system (FK4 B1950, FK5 J2000 or galactic), crossing between
//! systems there, and precessing to the output equinox last.
//!
//! Directions are handled as unit vectors throughout. Near the poles the
//! output longitude is numerically meaningless, as it is for any
//! longitude/latitude pair.

pub mod fk4;
pub mod inertial;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{FK4_EQUINOX, FK5_EQUINOX};
use crate::coordinates::cartesian::Cartesian3;
use crate::coordinates::normalize_longitude;
use crate::precessionlib::{fk4_precession_matrix, fk5_precession_matrix};
use crate::WcsError;

/// Celestial coordinate system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordSys {
    /// Mean equator and equinox, Besselian (B1950 standard)
    Fk4,
    /// Mean equator and equinox, Julian (J2000 standard)
    Fk5,
    /// Treated as FK5 J2000
    Icrs,
    Galactic,
    Ecliptic,
    /// Plain linear coordinates; never converted
    Linear,
}

impl CoordSys {
    /// Equinox a system uses when none is given
    pub fn default_equinox(&self) -> f64 {
        match self {
            CoordSys::Fk4 => FK4_EQUINOX,
            _ => FK5_EQUINOX,
        }
    }

    /// True for the equatorial systems, whose output is written in
    /// sexagesimal hours and degrees
    pub fn is_equatorial(&self) -> bool {
        matches!(self, CoordSys::Fk4 | CoordSys::Fk5 | CoordSys::Icrs)
    }
}

impl FromStr for CoordSys {
    type Err = WcsError;

    /// Accepts the names used in headers and on command lines: `FK4`,
    /// `B1950`, `FK5`, `J2000`, `ICRS`, `GAL...`, `ECL...`, `LINEAR`, `XY`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_uppercase();
        let sys = match name.as_str() {
            "FK4" | "FK4-NO-E" | "B1950" | "B1950.0" => CoordSys::Fk4,
            "FK5" | "J2000" | "J2000.0" => CoordSys::Fk5,
            "ICRS" => CoordSys::Icrs,
            "LINEAR" | "XY" | "PIXEL" => CoordSys::Linear,
            n if n.starts_with("GAL") => CoordSys::Galactic,
            n if n.starts_with("ECL") => CoordSys::Ecliptic,
            _ => return Err(WcsError::UnknownCoordSys(s.trim().to_string())),
        };
        Ok(sys)
    }
}

impl fmt::Display for CoordSys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CoordSys::Fk4 => "FK4",
            CoordSys::Fk5 => "FK5",
            CoordSys::Icrs => "ICRS",
            CoordSys::Galactic => "GALACTIC",
            CoordSys::Ecliptic => "ECLIPTIC",
            CoordSys::Linear => "LINEAR",
        };
        write!(f, "{}", name)
    }
}

/// A coordinate system together with its equinox
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyFrame {
    pub system: CoordSys,
    /// Equinox in years; ignored for galactic, ICRS and linear
    pub equinox: f64,
}

impl SkyFrame {
    pub fn new(system: CoordSys, equinox: f64) -> Self {
        SkyFrame { system, equinox }
    }

    pub fn fk4() -> Self {
        SkyFrame::new(CoordSys::Fk4, FK4_EQUINOX)
    }

    pub fn fk5() -> Self {
        SkyFrame::new(CoordSys::Fk5, FK5_EQUINOX)
    }

    pub fn galactic() -> Self {
        SkyFrame::new(CoordSys::Galactic, FK5_EQUINOX)
    }

    pub fn ecliptic(equinox: f64) -> Self {
        SkyFrame::new(CoordSys::Ecliptic, equinox)
    }

    /// Frame of a system at its default equinox
    pub fn from_system(system: CoordSys) -> Self {
        SkyFrame::new(system, system.default_equinox())
    }

    /// Label appended to formatted coordinates
    ///
    /// # Examples
    ///
    /// ```rust
    /// use wcscore::framelib::{CoordSys, SkyFrame};
    ///
    /// assert_eq!(SkyFrame::fk5().label(), "J2000");
    /// assert_eq!(SkyFrame::fk4().label(), "B1950");
    /// assert_eq!(SkyFrame::new(CoordSys::Fk5, 2010.5).label(), "J2010.5");
    /// assert_eq!(SkyFrame::galactic().label(), "galactic");
    /// ```
    pub fn label(&self) -> String {
        match self.system {
            CoordSys::Fk5 => format!("J{}", format_equinox(self.equinox)),
            CoordSys::Fk4 => format!("B{}", format_equinox(self.equinox)),
            CoordSys::Icrs => "ICRS".to_string(),
            CoordSys::Galactic => "galactic".to_string(),
            CoordSys::Ecliptic => "ecliptic".to_string(),
            CoordSys::Linear => "linear".to_string(),
        }
    }

    fn same_as(&self, other: &SkyFrame) -> bool {
        if self.system != other.system {
            return false;
        }
        match self.system {
            CoordSys::Fk4 | CoordSys::Fk5 | CoordSys::Ecliptic => self.equinox == other.equinox,
            _ => true,
        }
    }
}

impl FromStr for SkyFrame {
    type Err = WcsError;

    /// Like [`CoordSys::from_str`], but `Bnnnn`/`Jnnnn` also set the equinox
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let upper = trimmed.to_ascii_uppercase();
        if let Some(rest) = upper.strip_prefix('B').or_else(|| upper.strip_prefix('J')) {
            if let Ok(equinox) = rest.parse::<f64>() {
                let system = if upper.starts_with('B') {
                    CoordSys::Fk4
                } else {
                    CoordSys::Fk5
                };
                return Ok(SkyFrame::new(system, equinox));
            }
        }
        trimmed.parse::<CoordSys>().map(SkyFrame::from_system)
    }
}

fn format_equinox(equinox: f64) -> String {
    if equinox.fract() == 0.0 {
        format!("{:.0}", equinox)
    } else {
        let text = format!("{:.3}", equinox);
        text.trim_end_matches('0').to_string()
    }
}

/// Position expressed in the standard frame of one of the three hubs
enum Hub {
    Fk4B1950(Cartesian3),
    Fk5J2000(Cartesian3),
    Galactic(Cartesian3),
}

fn rotate(m: &nalgebra::Matrix3<f64>, v: &Cartesian3) -> Cartesian3 {
    Cartesian3::from_vector3(m * v.to_vector3())
}

fn to_hub(v: Cartesian3, from: &SkyFrame) -> Hub {
    match from.system {
        CoordSys::Fk4 => Hub::Fk4B1950(rotate(&fk4_precession_matrix(from.equinox, FK4_EQUINOX), &v)),
        CoordSys::Fk5 => Hub::Fk5J2000(rotate(&fk5_precession_matrix(from.equinox, FK5_EQUINOX), &v)),
        CoordSys::Icrs | CoordSys::Linear => Hub::Fk5J2000(v),
        CoordSys::Galactic => Hub::Galactic(v),
        CoordSys::Ecliptic => {
            let equatorial = inertial::ecliptic_to_fk5(&v, from.equinox);
            Hub::Fk5J2000(rotate(&fk5_precession_matrix(from.equinox, FK5_EQUINOX), &equatorial))
        }
    }
}

fn hub_to_fk4(hub: Hub, epoch: f64) -> Cartesian3 {
    match hub {
        Hub::Fk4B1950(v) => v,
        Hub::Fk5J2000(v) => fk4::fk5_to_fk4(&v, epoch),
        Hub::Galactic(v) => inertial::galactic_to_fk4(&v),
    }
}

fn hub_to_fk5(hub: Hub, epoch: f64) -> Cartesian3 {
    match hub {
        Hub::Fk4B1950(v) => fk4::fk4_to_fk5(&v, epoch),
        Hub::Fk5J2000(v) => v,
        Hub::Galactic(v) => inertial::galactic_to_fk5(&v),
    }
}

fn from_hub(hub: Hub, to: &SkyFrame, epoch: f64) -> Cartesian3 {
    match to.system {
        CoordSys::Fk4 => {
            let v = hub_to_fk4(hub, epoch);
            rotate(&fk4_precession_matrix(FK4_EQUINOX, to.equinox), &v)
        }
        CoordSys::Fk5 => {
            let v = hub_to_fk5(hub, epoch);
            rotate(&fk5_precession_matrix(FK5_EQUINOX, to.equinox), &v)
        }
        CoordSys::Icrs | CoordSys::Linear => hub_to_fk5(hub, epoch),
        CoordSys::Galactic => match hub {
            Hub::Fk4B1950(v) => inertial::fk4_to_galactic(&v),
            Hub::Fk5J2000(v) => inertial::fk5_to_galactic(&v),
            Hub::Galactic(v) => v,
        },
        CoordSys::Ecliptic => {
            let v = hub_to_fk5(hub, epoch);
            let v = rotate(&fk5_precession_matrix(FK5_EQUINOX, to.equinox), &v);
            inertial::fk5_to_ecliptic(&v, to.equinox)
        }
    }
}

/// Converts (lon, lat) in degrees from one frame to another
///
/// `epoch` is the Besselian epoch of observation; it only matters when
/// crossing between FK4 and FK5. Conversions within FK4 or within FK5 are a
/// single precession, and anything involving a linear frame is returned
/// unchanged.
///
/// # Examples
///
/// ```rust
/// use wcscore::framelib::{convert, SkyFrame};
///
/// let (l, b) = convert(266.405, -28.936, &SkyFrame::fk5(), &SkyFrame::galactic(), 2000.0);
/// assert!(l > 359.9 || l < 0.1);
/// assert!(b.abs() < 0.1);
/// ```
pub fn convert(lon: f64, lat: f64, from: &SkyFrame, to: &SkyFrame, epoch: f64) -> (f64, f64) {
    if from.system == CoordSys::Linear || to.system == CoordSys::Linear {
        return (lon, lat);
    }
    if from.same_as(to) {
        return (normalize_longitude(lon), lat);
    }

    let v = Cartesian3::from_lonlat_deg(lon, lat);
    let out = match (from.system, to.system) {
        (CoordSys::Fk4, CoordSys::Fk4) => {
            rotate(&fk4_precession_matrix(from.equinox, to.equinox), &v)
        }
        (CoordSys::Fk5, CoordSys::Fk5) => {
            rotate(&fk5_precession_matrix(from.equinox, to.equinox), &v)
        }
        _ => from_hub(to_hub(v, from), to, epoch),
    };
    out.to_lonlat_deg()
}
