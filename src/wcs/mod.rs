//! World coordinate system of one image
//!
//! A [`WcsContext`] is built once from a header (see [`WcsContext::from_header`])
//! and then converts between pixel and sky positions. Pixel coordinates are
//! FITS-style: the centre of the first pixel is (1, 1), and a point is on the
//! image when it lies within `[0.5, naxis + 0.5]` on both axes.
//!
//! Transforms never fail as a whole: each returned position carries a
//! [`PointStatus`] telling whether the projection could reach it.

mod init;
pub mod output;
pub mod scale;

use log::debug;

use crate::coordinates::{distance, normalize_longitude};
use crate::framelib::{convert, CoordSys, SkyFrame};
use crate::header::HeaderMap;
use crate::projection::{classic, plate, Projection, ProjectionCode, ProjectionError};

pub use output::{CoordFormat, OutputOptions, OFF_MAP};
pub use scale::ScaleMatrix;

/// Slack on the image bounds when deciding whether a pixel is off the image
const EDGE_TOLERANCE: f64 = 1e-9;

/// Points sampled along each image edge by [`WcsContext::range`]
const BORDER_SAMPLES: usize = 64;

/// Outcome of transforming a single point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointStatus {
    #[default]
    Ok,
    /// Outside the domain of the projection
    AngleTooLarge,
    BadValue,
    /// Polynomial inversion ran out of iterations
    NotConverged { iterations: usize },
    SingularJacobian,
}

impl PointStatus {
    pub fn is_ok(&self) -> bool {
        *self == PointStatus::Ok
    }
}

impl From<ProjectionError> for PointStatus {
    fn from(err: ProjectionError) -> Self {
        match err {
            ProjectionError::AngleTooLarge => PointStatus::AngleTooLarge,
            ProjectionError::BadValue => PointStatus::BadValue,
            ProjectionError::NotConverged { iterations } => PointStatus::NotConverged { iterations },
            ProjectionError::SingularJacobian => PointStatus::SingularJacobian,
        }
    }
}

/// Sky position in degrees; NaN when the projection failed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyPosition {
    pub lon: f64,
    pub lat: f64,
    pub status: PointStatus,
}

impl SkyPosition {
    fn failed(err: ProjectionError) -> Self {
        SkyPosition {
            lon: f64::NAN,
            lat: f64::NAN,
            status: err.into(),
        }
    }

    /// True when the projection could not produce this position
    pub fn offscale(&self) -> bool {
        !self.status.is_ok()
    }
}

/// Pixel position; NaN when the projection failed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelPosition {
    pub x: f64,
    pub y: f64,
    pub status: PointStatus,
    /// Projection failed, or the pixel lies off the image
    pub offscale: bool,
}

/// Longitude/latitude limits of an image, in degrees
///
/// `lon_min` is negative when the image straddles longitude 0, so that
/// `lon_min <= lon_max` always holds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyRange {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WcsContext {
    naxis: [usize; 2],
    crpix: [f64; 2],
    crval: [f64; 2],
    axis_names: [String; 2],
    scale: ScaleMatrix,
    projection: Projection,
    native: SkyFrame,
    epoch: f64,
    options: OutputOptions,
}

impl WcsContext {
    /// Image size in pixels (width, height)
    pub fn image_size(&self) -> (usize, usize) {
        (self.naxis[0], self.naxis[1])
    }

    pub fn reference_pixel(&self) -> (f64, f64) {
        (self.crpix[0], self.crpix[1])
    }

    /// Reference position in the native frame
    pub fn reference_sky(&self) -> (f64, f64) {
        (self.crval[0], self.crval[1])
    }

    /// Coordinate names of the two axes (`RA`/`DEC`, `GLON`/`GLAT`, ...)
    pub fn axis_names(&self) -> (&str, &str) {
        (&self.axis_names[0], &self.axis_names[1])
    }

    pub fn scale(&self) -> &ScaleMatrix {
        &self.scale
    }

    /// Axis increments in degrees/pixel
    pub fn cdelt(&self) -> (f64, f64) {
        self.scale.cdelt()
    }

    /// Rotation in degrees
    pub fn rotation(&self) -> f64 {
        self.scale.rotation()
    }

    /// Mean pixel size in arcseconds
    pub fn pixel_scale(&self) -> f64 {
        self.scale.pixel_scale_arcsec()
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn native_frame(&self) -> &SkyFrame {
        &self.native
    }

    /// Besselian epoch of observation, in years
    pub fn epoch(&self) -> f64 {
        self.epoch
    }

    pub fn options(&self) -> &OutputOptions {
        &self.options
    }

    /// Frame in which positions are reported and accepted
    pub fn output_frame(&self) -> SkyFrame {
        self.options.frame.unwrap_or(self.native)
    }

    pub fn set_output_frame(&mut self, frame: SkyFrame) {
        self.options.frame = Some(frame);
    }

    pub fn set_options(&mut self, options: OutputOptions) {
        self.options = options;
    }

    pub fn is_linear(&self) -> bool {
        self.native.system == CoordSys::Linear
    }

    /// Projection-plane offsets (degrees) of a pixel from the reference point
    ///
    /// For PLATE and DSS models these are the standard coordinates (xi, eta);
    /// for SIP the distortion correction is applied first.
    pub fn pixel_to_intermediate(&self, x: f64, y: f64) -> (f64, f64) {
        let dx = x - self.crpix[0];
        let dy = y - self.crpix[1];
        match &self.projection {
            Projection::Classic(_) => self.scale.apply(dx, dy),
            Projection::Sirtf(sip) => {
                let (u, v) = sip.pixel_to_focal(dx, dy);
                self.scale.apply(u, v)
            }
            Projection::Plate(poly) => poly.offset_to_standard(dx, dy),
            Projection::Dss(dss) => {
                let (xi, eta) = dss.pixel_to_standard(x, y);
                (xi / 3600.0, eta / 3600.0)
            }
        }
    }

    /// Pixel to sky in the native frame
    fn pixel_to_native(&self, x: f64, y: f64) -> Result<(f64, f64), ProjectionError> {
        let [lon0, lat0] = self.crval;
        match &self.projection {
            Projection::Classic(code) => {
                let (l, m) = self.pixel_to_intermediate(x, y);
                classic::intermediate_to_sky(*code, l, m, lon0, lat0, &self.scale.geometry())
            }
            Projection::Sirtf(sip) => {
                let (l, m) = self.pixel_to_intermediate(x, y);
                classic::intermediate_to_sky(sip.base(), l, m, lon0, lat0, &self.scale.geometry())
            }
            Projection::Plate(_) => {
                let (xi, eta) = self.pixel_to_intermediate(x, y);
                Ok(plate::standard_to_sky(xi, eta, lon0, lat0))
            }
            Projection::Dss(dss) => Ok(dss.pixel_to_sky(x, y)),
        }
    }

    /// Native-frame sky position to pixel
    fn native_to_pixel(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjectionError> {
        let [lon0, lat0] = self.crval;
        let [crpix1, crpix2] = self.crpix;
        match &self.projection {
            Projection::Classic(code) => {
                let (l, m) =
                    classic::sky_to_intermediate(*code, lon, lat, lon0, lat0, &self.scale.geometry())?;
                let (dx, dy) = self.scale.apply_inverse(l, m);
                Ok((crpix1 + dx, crpix2 + dy))
            }
            Projection::Sirtf(sip) => {
                let (l, m) = classic::sky_to_intermediate(
                    sip.base(),
                    lon,
                    lat,
                    lon0,
                    lat0,
                    &self.scale.geometry(),
                )?;
                let (u, v) = self.scale.apply_inverse(l, m);
                let (dx, dy) = sip.focal_to_pixel(u, v)?;
                Ok((crpix1 + dx, crpix2 + dy))
            }
            Projection::Plate(poly) => {
                let (xi, eta) = plate::sky_to_standard(lon, lat, lon0, lat0)?;
                let sol = poly.standard_to_offset(xi, eta).map_err(|err| {
                    debug!("plate inversion failed at ({}, {}): {}", lon, lat, err);
                    ProjectionError::from(err)
                })?;
                Ok((crpix1 + sol.x, crpix2 + sol.y))
            }
            Projection::Dss(dss) => {
                let (xi, eta) = dss.sky_to_standard(lon, lat)?;
                let sol = dss.standard_to_plate_mm(xi, eta).map_err(|err| {
                    debug!("DSS inversion failed at ({}, {}): {}", lon, lat, err);
                    ProjectionError::from(err)
                })?;
                Ok(dss.plate_mm_to_pixel(sol.x, sol.y))
            }
        }
    }

    /// True when (x, y) lies outside `[0.5, naxis + 0.5]` on either axis
    pub fn is_offscale(&self, x: f64, y: f64) -> bool {
        let outside = |p: f64, n: usize| {
            p < 0.5 - EDGE_TOLERANCE || p > n as f64 + 0.5 + EDGE_TOLERANCE || p.is_nan()
        };
        outside(x, self.naxis[0]) || outside(y, self.naxis[1])
    }

    /// Sky position of a pixel, in the output frame
    ///
    /// The position is not checked against the image bounds; only projection
    /// failures mark it off scale.
    pub fn pixel_to_sky(&self, x: f64, y: f64) -> SkyPosition {
        match self.pixel_to_native(x, y) {
            Ok((lon, lat)) => {
                let (lon, lat) = convert(lon, lat, &self.native, &self.output_frame(), self.epoch);
                SkyPosition {
                    lon,
                    lat,
                    status: PointStatus::Ok,
                }
            }
            Err(err) => SkyPosition::failed(err),
        }
    }

    /// Pixel of a sky position given in the output frame
    pub fn sky_to_pixel(&self, lon: f64, lat: f64) -> PixelPosition {
        self.sky_to_pixel_from(lon, lat, &self.output_frame())
    }

    /// Pixel of a sky position given in `frame`
    pub fn sky_to_pixel_from(&self, lon: f64, lat: f64, frame: &SkyFrame) -> PixelPosition {
        let (lon, lat) = convert(lon, lat, frame, &self.native, self.epoch);
        match self.native_to_pixel(lon, lat) {
            Ok((x, y)) => PixelPosition {
                x,
                y,
                status: PointStatus::Ok,
                offscale: self.is_offscale(x, y),
            },
            Err(err) => PixelPosition {
                x: f64::NAN,
                y: f64::NAN,
                status: err.into(),
                offscale: true,
            },
        }
    }

    /// Sky position of a pixel formatted per the output options, or
    /// [`OFF_MAP`]
    pub fn pixel_to_sky_string(&self, x: f64, y: f64) -> String {
        let pos = self.pixel_to_sky(x, y);
        if pos.offscale() {
            return OFF_MAP.to_string();
        }
        self.options
            .format_position(pos.lon, pos.lat, &self.output_frame())
    }

    /// Sky position of the image centre
    pub fn center(&self) -> SkyPosition {
        let (xc, yc) = self.center_pixel();
        self.pixel_to_sky(xc, yc)
    }

    fn center_pixel(&self) -> (f64, f64) {
        (
            (self.naxis[0] as f64 + 1.0) / 2.0,
            (self.naxis[1] as f64 + 1.0) / 2.0,
        )
    }

    /// Angular (width, height) in degrees across the image mid-lines
    pub fn size(&self) -> Option<(f64, f64)> {
        let (xc, yc) = self.center_pixel();
        let (nx, ny) = (self.naxis[0] as f64, self.naxis[1] as f64);
        let span = |a: SkyPosition, b: SkyPosition| {
            if a.offscale() || b.offscale() {
                None
            } else {
                Some(distance(a.lon, a.lat, b.lon, b.lat))
            }
        };
        let width = span(self.pixel_to_sky(0.5, yc), self.pixel_to_sky(nx + 0.5, yc))?;
        let height = span(self.pixel_to_sky(xc, 0.5), self.pixel_to_sky(xc, ny + 0.5))?;
        Some((width, height))
    }

    /// Limits of the image border in the output frame
    ///
    /// Returns `None` if no border point can be projected.
    pub fn range(&self) -> Option<SkyRange> {
        let (nx, ny) = (self.naxis[0] as f64, self.naxis[1] as f64);
        let center = self.center();
        let lon_ref = if center.offscale() { self.crval[0] } else { center.lon };

        let mut border = Vec::with_capacity(4 * (BORDER_SAMPLES + 1));
        for i in 0..=BORDER_SAMPLES {
            let t = i as f64 / BORDER_SAMPLES as f64;
            let x = 0.5 + t * nx;
            let y = 0.5 + t * ny;
            border.push((x, 0.5));
            border.push((x, ny + 0.5));
            border.push((0.5, y));
            border.push((nx + 0.5, y));
        }

        let mut range: Option<SkyRange> = None;
        for (x, y) in border {
            let pos = self.pixel_to_sky(x, y);
            if pos.offscale() {
                continue;
            }
            let lon = if self.is_linear() {
                pos.lon
            } else {
                lon_ref + (pos.lon - lon_ref + 180.0).rem_euclid(360.0) - 180.0
            };
            range = Some(match range {
                None => SkyRange {
                    lon_min: lon,
                    lon_max: lon,
                    lat_min: pos.lat,
                    lat_max: pos.lat,
                },
                Some(r) => SkyRange {
                    lon_min: r.lon_min.min(lon),
                    lon_max: r.lon_max.max(lon),
                    lat_min: r.lat_min.min(pos.lat),
                    lat_max: r.lat_max.max(pos.lat),
                },
            });
        }

        let mut range = range?;
        if !self.is_linear() {
            // A pole on the image covers every longitude
            for pole in [90.0, -90.0] {
                if !self.sky_to_pixel(0.0, pole).offscale {
                    range.lon_min = 0.0;
                    range.lon_max = 360.0;
                    range.lat_min = range.lat_min.min(pole);
                    range.lat_max = range.lat_max.max(pole);
                }
            }
            if range.lon_max - range.lon_min < 360.0 {
                let shift = range.lon_min - normalize_longitude(range.lon_min);
                range.lon_min -= shift;
                range.lon_max -= shift;
                if range.lon_max >= 360.0 {
                    range.lon_min -= 360.0;
                    range.lon_max -= 360.0;
                }
            }
        }
        Some(range)
    }

    /// Writes this WCS back as header keywords
    pub fn to_header(&self) -> HeaderMap {
        let mut header = HeaderMap::new();
        header
            .set("NAXIS", 2)
            .set("NAXIS1", self.naxis[0])
            .set("NAXIS2", self.naxis[1]);

        let (code, distorted) = match &self.projection {
            Projection::Sirtf(sip) => (sip.base(), true),
            other => (other.code(), false),
        };
        for (i, name) in self.axis_names.iter().enumerate() {
            header.set(&format!("CTYPE{}", i + 1), ctype(name, code, distorted));
        }

        header
            .set("CRPIX1", self.crpix[0])
            .set("CRPIX2", self.crpix[1])
            .set("CRVAL1", self.crval[0])
            .set("CRVAL2", self.crval[1]);

        let cd = self.scale.cd();
        header
            .set("CD1_1", cd[(0, 0)])
            .set("CD1_2", cd[(0, 1)])
            .set("CD2_1", cd[(1, 0)])
            .set("CD2_2", cd[(1, 1)]);

        if !self.is_linear() {
            header.set("EQUINOX", self.native.equinox);
            match self.native.system {
                CoordSys::Fk4 => {
                    header.set("RADESYS", "FK4");
                }
                CoordSys::Fk5 => {
                    header.set("RADESYS", "FK5");
                }
                CoordSys::Icrs => {
                    header.set("RADESYS", "ICRS");
                }
                _ => {}
            }
            if (self.epoch - self.native.equinox).abs() > 1e-9 {
                header.set("EPOCH", self.epoch);
            }
        }

        match &self.projection {
            Projection::Plate(poly) => {
                for (i, c) in poly.x_coeffs().iter().enumerate() {
                    header.set(&format!("CO1_{}", i + 1), c);
                }
                for (i, c) in poly.y_coeffs().iter().enumerate() {
                    header.set(&format!("CO2_{}", i + 1), c);
                }
            }
            Projection::Dss(dss) => dss.write_header(&mut header),
            Projection::Sirtf(sip) => sip.write_header(&mut header),
            Projection::Classic(_) => {}
        }
        header
    }
}

/// CTYPE value for an axis: name padded with '-' to four characters, then
/// the projection suffix
fn ctype(name: &str, code: ProjectionCode, distorted: bool) -> String {
    if code == ProjectionCode::Linear {
        return name.to_string();
    }
    let mut text = format!("{:-<4}{}", name, code.suffix());
    if distorted {
        text.push_str("-SIP");
    }
    text
}
