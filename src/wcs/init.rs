//! Building a [`WcsContext`] from header keywords

use log::{debug, warn};

use crate::constants::DEG2RAD;
use crate::framelib::{CoordSys, SkyFrame};
use crate::header::HeaderView;
use crate::projection::plate::{self, MAX_PLATE_COEFFS};
use crate::projection::{
    AxisType, DssPlate, PlatePolynomial, Projection, ProjectionCode, SirtfDistortion,
};
use crate::time::{date_to_epoch, mjd_to_epoch, parse_equinox, EpochScale};
use crate::{Result, WcsError};

use super::{OutputOptions, ScaleMatrix, WcsContext};

/// Arcsec/pixel keywords of an approximate WCS, in lookup order
const SCALE_KEYS: [&str; 4] = ["SECPIX", "PIXSCALE", "SECPIX1", "PIXSCAL1"];
const SCALE_KEYS_Y: [&str; 2] = ["SECPIX2", "PIXSCAL2"];

/// Equinox of the header and what it says about the equatorial system
#[derive(Debug, Clone, Copy)]
struct EquinoxInfo {
    equinox: f64,
    radesys: Option<CoordSys>,
    scale: Option<EpochScale>,
}

impl EquinoxInfo {
    fn equatorial_frame(&self) -> SkyFrame {
        let system = match (self.radesys, self.scale) {
            (Some(system), _) => system,
            (None, Some(EpochScale::Besselian)) => CoordSys::Fk4,
            (None, Some(EpochScale::Julian)) => CoordSys::Fk5,
            (None, None) if self.equinox < 1980.0 => CoordSys::Fk4,
            (None, None) => CoordSys::Fk5,
        };
        match system {
            CoordSys::Icrs => SkyFrame::from_system(CoordSys::Icrs),
            other => SkyFrame::new(other, self.equinox),
        }
    }

    /// Native frame named by the coordinate part of CTYPE1
    fn native_frame(&self, axis_name: &str) -> SkyFrame {
        if axis_name.starts_with("RA") {
            self.equatorial_frame()
        } else if axis_name.starts_with('G') {
            SkyFrame::galactic()
        } else if axis_name.starts_with('E') {
            SkyFrame::ecliptic(self.equinox)
        } else {
            SkyFrame::from_system(CoordSys::Linear)
        }
    }
}

/// Value that may be absent but must parse when present
fn optional_f64(header: &dyn HeaderView, key: &str) -> Result<Option<f64>> {
    match header.get_str(key) {
        None => Ok(None),
        Some(_) => header.require_f64(key).map(Some),
    }
}

fn parse_radesys(text: &str) -> Option<CoordSys> {
    match text.trim().to_ascii_uppercase().as_str() {
        "FK4" | "FK4-NO-E" => Some(CoordSys::Fk4),
        "FK5" => Some(CoordSys::Fk5),
        "ICRS" => Some(CoordSys::Icrs),
        other => {
            warn!("unrecognised RADESYS '{}', inferring system from equinox", other);
            None
        }
    }
}

fn resolve_equinox(header: &dyn HeaderView) -> Result<EquinoxInfo> {
    let radesys = header
        .get_str("RADESYS")
        .or_else(|| header.get_str("RADECSYS"))
        .and_then(|s| parse_radesys(&s));

    let explicit = match header.get_str("EQUINOX").or_else(|| header.get_str("EPOCH")) {
        Some(raw) => Some(parse_equinox(&raw)?),
        None => None,
    };

    let (equinox, scale) = match (explicit, radesys) {
        (Some(found), _) => found,
        (None, Some(CoordSys::Fk4)) => (1950.0, None),
        (None, _) => (2000.0, None),
    };

    Ok(EquinoxInfo {
        equinox,
        radesys,
        scale,
    })
}

/// Epoch of observation: MJD-OBS, DATE-OBS, DATE, then EPOCH when EQUINOX
/// holds the equinox, else the equinox itself
fn resolve_epoch(header: &dyn HeaderView, equinox: f64) -> Result<f64> {
    if let Some(mjd) = optional_f64(header, "MJD-OBS")? {
        return Ok(mjd_to_epoch(mjd));
    }
    for key in ["DATE-OBS", "DATE"] {
        if let Some(date) = header.get_str(key) {
            return Ok(date_to_epoch(&date)?);
        }
    }
    if header.contains("EQUINOX") {
        if let Some(raw) = header.get_str("EPOCH") {
            return Ok(parse_equinox(&raw)?.0);
        }
    }
    Ok(equinox)
}

/// Image size from NAXIS1/2, or IMAGEW/IMAGEH
fn image_size(header: &dyn HeaderView) -> Result<[usize; 2]> {
    let mut naxis = [0usize; 2];
    for (i, (key, alt)) in [("NAXIS1", "IMAGEW"), ("NAXIS2", "IMAGEH")].iter().enumerate() {
        let used = if header.contains(key) { key } else { alt };
        let raw = header
            .get_str(used)
            .ok_or_else(|| WcsError::MissingRequiredKeyword(key.to_string()))?;
        naxis[i] = header
            .get_i64(used)
            .filter(|n| *n > 0)
            .ok_or_else(|| WcsError::InvalidKeyword {
                keyword: used.to_string(),
                value: raw,
            })? as usize;
    }
    Ok(naxis)
}

fn center_pixel(naxis: &[usize; 2]) -> [f64; 2] {
    [naxis[0] as f64 / 2.0 + 0.5, naxis[1] as f64 / 2.0 + 0.5]
}

fn rotation(header: &dyn HeaderView) -> Result<f64> {
    Ok(optional_f64(header, "CROTA2")?
        .or(optional_f64(header, "CROTA1")?)
        .unwrap_or(0.0))
}

/// Arcsec/pixel along (x, y) from the approximate-WCS keywords
fn approximate_pixel_scale(header: &dyn HeaderView) -> Option<(f64, f64)> {
    let x = SCALE_KEYS.iter().find_map(|k| header.get_f64(k))?;
    let y = SCALE_KEYS_Y
        .iter()
        .find_map(|k| header.get_f64(k))
        .unwrap_or(x);
    Some((x, y))
}

/// CD matrix, CDELT/CROTA, or the arcsec/pixel keywords, in that order
fn read_scale(header: &dyn HeaderView) -> Result<Option<ScaleMatrix>> {
    const CD_KEYS: [&str; 4] = ["CD1_1", "CD1_2", "CD2_1", "CD2_2"];
    if CD_KEYS.iter().any(|k| header.contains(k)) {
        let mut cd = [0.0; 4];
        for (value, key) in cd.iter_mut().zip(CD_KEYS.iter()) {
            *value = optional_f64(header, key)?.unwrap_or(0.0);
        }
        return ScaleMatrix::from_cd(cd[0], cd[1], cd[2], cd[3]).map(Some);
    }

    if let Some(cdelt1) = optional_f64(header, "CDELT1")? {
        let cdelt2 = header.require_f64("CDELT2")?;
        return ScaleMatrix::from_cdelt(cdelt1, cdelt2, rotation(header)?).map(Some);
    }

    if let Some((sx, sy)) = approximate_pixel_scale(header) {
        return ScaleMatrix::from_cdelt(-sx / 3600.0, sy / 3600.0, rotation(header)?).map(Some);
    }
    Ok(None)
}

/// CO1_n/CO2_n coefficients; the count is set by the last non-zero term
fn read_plate(header: &dyn HeaderView) -> Result<Option<PlatePolynomial>> {
    if !header.contains("CO1_1") {
        return Ok(None);
    }
    let read_axis = |axis: usize| -> Result<Vec<f64>> {
        let mut coeffs = Vec::with_capacity(MAX_PLATE_COEFFS);
        for n in 1..=MAX_PLATE_COEFFS {
            coeffs.push(optional_f64(header, &format!("CO{}_{}", axis, n))?.unwrap_or(0.0));
        }
        while coeffs.last() == Some(&0.0) {
            coeffs.pop();
        }
        Ok(coeffs)
    };
    let x = read_axis(1)?;
    let y = read_axis(2)?;
    Ok(Some(PlatePolynomial::new(&x, &y)))
}

/// Nominal CD matrix of a polynomial model, from the sky positions of the
/// reference pixel and its neighbours along x and y
fn differenced_scale<F>(sky_at: F, crpix: [f64; 2]) -> Result<ScaleMatrix>
where
    F: Fn(f64, f64) -> (f64, f64),
{
    let (lon0, lat0) = sky_at(crpix[0], crpix[1]);
    let (lon1, lat1) = sky_at(crpix[0] + 1.0, crpix[1]);
    let (lon2, lat2) = sky_at(crpix[0], crpix[1] + 1.0);

    let cos_lat = (lat0 * DEG2RAD).cos();
    let dlon = |lon: f64| ((lon - lon0 + 180.0).rem_euclid(360.0) - 180.0) * cos_lat;
    ScaleMatrix::from_cd(dlon(lon1), dlon(lon2), lat1 - lat0, lat2 - lat0)
}

impl WcsContext {
    /// Builds the WCS described by a header
    ///
    /// Three descriptions are recognised, tried in this order: a DSS plate
    /// solution (`PLTRAH` and friends), a CTYPE1/CTYPE2 pair with its
    /// reference point and scale, and an approximate WCS from `RA`/`DEC`
    /// plus an arcsec/pixel keyword.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use wcscore::{HeaderMap, WcsContext};
    ///
    /// let header = HeaderMap::new()
    ///     .with("NAXIS1", 512)
    ///     .with("NAXIS2", 512)
    ///     .with("CTYPE1", "RA---TAN")
    ///     .with("CTYPE2", "DEC--TAN")
    ///     .with("CRPIX1", 256)
    ///     .with("CRPIX2", 256)
    ///     .with("CRVAL1", 180.0)
    ///     .with("CRVAL2", 30.0)
    ///     .with("CD1_1", -0.0002777)
    ///     .with("CD2_2", 0.0002777);
    /// let wcs = WcsContext::from_header(&header).unwrap();
    /// let pos = wcs.pixel_to_sky(256.0, 256.0);
    /// assert!((pos.lon - 180.0).abs() < 1e-9 && (pos.lat - 30.0).abs() < 1e-9);
    /// ```
    pub fn from_header(header: &dyn HeaderView) -> Result<WcsContext> {
        let wcs = if DssPlate::is_present(header) {
            Self::from_dss_header(header)?
        } else if header.contains("CTYPE1") {
            Self::from_ctype_header(header)?
        } else if let Some(wcs) = Self::from_approximate_header(header)? {
            wcs
        } else {
            return Err(WcsError::NoWcsPresent);
        };

        debug!(
            "WCS {}x{} {} projection, {} frame, epoch {:.3}, {:.4} arcsec/pixel, rotation {:.3}",
            wcs.naxis[0],
            wcs.naxis[1],
            wcs.projection.code(),
            wcs.native.label(),
            wcs.epoch,
            wcs.pixel_scale(),
            wcs.rotation(),
        );
        Ok(wcs)
    }

    fn from_ctype_header(header: &dyn HeaderView) -> Result<WcsContext> {
        let ctype1 = header
            .get_str("CTYPE1")
            .ok_or_else(|| WcsError::MissingRequiredKeyword("CTYPE1".to_string()))?;
        let ctype2 = header
            .get_str("CTYPE2")
            .ok_or_else(|| WcsError::MissingRequiredKeyword("CTYPE2".to_string()))?;
        let axis1 = AxisType::parse(&ctype1)?;
        let axis2 = AxisType::parse(&ctype2)?;

        if axis1.is_latitude() || axis1.projection != axis2.projection {
            return Err(WcsError::UnsupportedProjection(format!("{} / {}", ctype1, ctype2)));
        }

        let naxis = image_size(header)?;
        let crpix = [header.require_f64("CRPIX1")?, header.require_f64("CRPIX2")?];
        let crval = [header.require_f64("CRVAL1")?, header.require_f64("CRVAL2")?];
        let info = resolve_equinox(header)?;

        let (projection, scale) = match read_plate(header)? {
            Some(poly) => {
                let scale = differenced_scale(
                    |x, y| {
                        let (xi, eta) = poly.offset_to_standard(x - crpix[0], y - crpix[1]);
                        plate::standard_to_sky(xi, eta, crval[0], crval[1])
                    },
                    crpix,
                )?;
                (Projection::Plate(poly), scale)
            }
            None => {
                match axis1.projection {
                    ProjectionCode::Plate => {
                        return Err(WcsError::MissingRequiredKeyword("CO1_1".to_string()))
                    }
                    ProjectionCode::Dss => {
                        return Err(WcsError::MissingRequiredKeyword("PLTRAH".to_string()))
                    }
                    _ => {}
                }
                let scale = read_scale(header)?
                    .ok_or_else(|| WcsError::MissingRequiredKeyword("CDELT1".to_string()))?;
                let projection = if axis1.distorted || axis2.distorted {
                    Projection::Sirtf(SirtfDistortion::from_header(header, axis1.projection)?)
                } else {
                    Projection::Classic(axis1.projection)
                };
                (projection, scale)
            }
        };

        Ok(WcsContext {
            naxis,
            crpix,
            crval,
            axis_names: [axis1.name.clone(), axis2.name],
            scale,
            projection,
            native: info.native_frame(&axis1.name),
            epoch: resolve_epoch(header, info.equinox)?,
            options: OutputOptions::default(),
        })
    }

    fn from_dss_header(header: &dyn HeaderView) -> Result<WcsContext> {
        let dss = DssPlate::from_header(header)?;
        let naxis = image_size(header)?;
        let crpix = center_pixel(&naxis);
        let (lon, lat) = dss.pixel_to_sky(crpix[0], crpix[1]);
        let scale = differenced_scale(|x, y| dss.pixel_to_sky(x, y), crpix)?;
        let info = resolve_equinox(header)?;

        Ok(WcsContext {
            naxis,
            crpix,
            crval: [lon, lat],
            axis_names: ["RA".to_string(), "DEC".to_string()],
            scale,
            projection: Projection::Dss(dss),
            native: info.equatorial_frame(),
            epoch: resolve_epoch(header, info.equinox)?,
            options: OutputOptions::default(),
        })
    }

    /// TAN projection centred on RA/DEC with the given arcsec/pixel
    fn from_approximate_header(header: &dyn HeaderView) -> Result<Option<WcsContext>> {
        let (ra, dec) = match (header.get_ra_deg("RA"), header.get_dec_deg("DEC")) {
            (Some(ra), Some(dec)) => (ra, dec),
            _ => return Ok(None),
        };
        let (sx, sy) = match approximate_pixel_scale(header) {
            Some(scale) => scale,
            None => return Ok(None),
        };

        let naxis = image_size(header)?;
        let scale = ScaleMatrix::from_cdelt(-sx / 3600.0, sy / 3600.0, rotation(header)?)?;
        let info = resolve_equinox(header)?;

        Ok(Some(WcsContext {
            naxis,
            crpix: center_pixel(&naxis),
            crval: [ra, dec],
            axis_names: ["RA".to_string(), "DEC".to_string()],
            scale,
            projection: Projection::Classic(ProjectionCode::Tan),
            native: info.equatorial_frame(),
            epoch: resolve_epoch(header, info.equinox)?,
            options: OutputOptions::default(),
        }))
    }
}
