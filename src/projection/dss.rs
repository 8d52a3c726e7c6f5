//! Digitized Sky Survey plate solution
//!
//! DSS images carry the astrometric solution of the whole photographic
//! plate: pixels are first placed in plate millimetres about the plate
//! centre, then two 13-term polynomials give standard coordinates in
//! arcseconds, which are deprojected about the plate centre.

use log::warn;

use crate::header::{HeaderMap, HeaderView};
use crate::{Result, WcsError};

use super::plate;
use super::solver::{self, BivariateModel, ModelEval, NewtonSolution, SolverError};
use super::ProjectionError;

/// Number of AMDX/AMDY coefficients read from a header
pub const DSS_COEFFS: usize = 20;

/// Scan pixel size of the DSS plates in microns, used when the header omits it
pub const DEFAULT_PIXEL_SIZE: f64 = 25.284_45;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DssPlate {
    /// Plate centre right ascension, degrees
    pub plate_ra: f64,
    /// Plate centre declination, degrees
    pub plate_dec: f64,
    /// Arcseconds per millimetre
    pub plate_scale: f64,
    /// Microns
    pub x_pixel_size: f64,
    /// Microns
    pub y_pixel_size: f64,
    /// Lower-left corner of the image in plate pixels (CNPIX1/2)
    pub cnpix: [f64; 2],
    /// Plate centre offsets in microns (PPO3, PPO6)
    pub ppo3: f64,
    pub ppo6: f64,
    pub amdx: [f64; DSS_COEFFS],
    pub amdy: [f64; DSS_COEFFS],
}

/// Standard coordinates (arcsec) and partials at plate position (x, y) mm
fn plate_model(a: &[f64; DSS_COEFFS], b: &[f64; DSS_COEFFS], x: f64, y: f64) -> ModelEval {
    let x2 = x * x;
    let y2 = y * y;
    let xy = x * y;
    let r2 = x2 + y2;

    let f = a[0] * x
        + a[1] * y
        + a[2]
        + a[3] * x2
        + a[4] * xy
        + a[5] * y2
        + a[6] * r2
        + a[7] * x2 * x
        + a[8] * x2 * y
        + a[9] * x * y2
        + a[10] * y2 * y
        + a[11] * x * r2
        + a[12] * x * r2 * r2;
    let fx = a[0]
        + 2.0 * a[3] * x
        + a[4] * y
        + 2.0 * a[6] * x
        + 3.0 * a[7] * x2
        + 2.0 * a[8] * xy
        + a[9] * y2
        + a[11] * (r2 + 2.0 * x2)
        + a[12] * (r2 * r2 + 4.0 * x2 * r2);
    let fy = a[1]
        + a[4] * x
        + 2.0 * a[5] * y
        + 2.0 * a[6] * y
        + a[8] * x2
        + 2.0 * a[9] * xy
        + 3.0 * a[10] * y2
        + 2.0 * a[11] * xy
        + 4.0 * a[12] * xy * r2;

    let g = b[0] * y
        + b[1] * x
        + b[2]
        + b[3] * y2
        + b[4] * xy
        + b[5] * x2
        + b[6] * r2
        + b[7] * y2 * y
        + b[8] * y2 * x
        + b[9] * y * x2
        + b[10] * x2 * x
        + b[11] * y * r2
        + b[12] * y * r2 * r2;
    let gx = b[1]
        + b[4] * y
        + 2.0 * b[5] * x
        + 2.0 * b[6] * x
        + b[8] * y2
        + 2.0 * b[9] * xy
        + 3.0 * b[10] * x2
        + 2.0 * b[11] * xy
        + 4.0 * b[12] * xy * r2;
    let gy = b[0]
        + 2.0 * b[3] * y
        + b[4] * x
        + 2.0 * b[6] * y
        + 3.0 * b[7] * y2
        + 2.0 * b[8] * xy
        + b[9] * x2
        + b[11] * (r2 + 2.0 * y2)
        + b[12] * (r2 * r2 + 4.0 * y2 * r2);

    ModelEval {
        f,
        fx,
        fy,
        g,
        gx,
        gy,
    }
}

struct DssTarget<'a> {
    plate: &'a DssPlate,
    xi: f64,
    eta: f64,
}

impl BivariateModel for DssTarget<'_> {
    fn evaluate(&self, x: f64, y: f64) -> ModelEval {
        let mut e = plate_model(&self.plate.amdx, &self.plate.amdy, x, y);
        e.f -= self.xi;
        e.g -= self.eta;
        e
    }
}

fn read_coeffs(header: &dyn HeaderView, prefix: &str) -> [f64; DSS_COEFFS] {
    let mut coeffs = [0.0; DSS_COEFFS];
    for (i, c) in coeffs.iter_mut().enumerate() {
        *c = header.get_f64(&format!("{}{}", prefix, i + 1)).unwrap_or(0.0);
    }
    coeffs
}

fn pixel_size(header: &dyn HeaderView, key: &str) -> f64 {
    match header.get_f64(key) {
        Some(size) if size > 0.0 => size,
        _ => {
            warn!("{} missing from DSS header, assuming {} microns", key, DEFAULT_PIXEL_SIZE);
            DEFAULT_PIXEL_SIZE
        }
    }
}

impl DssPlate {
    /// True when the header carries a DSS plate solution
    pub fn is_present(header: &dyn HeaderView) -> bool {
        header.contains("PLTRAH")
    }

    /// Reads the plate solution keywords
    pub fn from_header(header: &dyn HeaderView) -> Result<DssPlate> {
        let plate_ra = 15.0
            * (header.require_f64("PLTRAH")?
                + header.get_f64("PLTRAM").unwrap_or(0.0) / 60.0
                + header.get_f64("PLTRAS").unwrap_or(0.0) / 3600.0);

        let dec_magnitude = header.require_f64("PLTDECD")?
            + header.get_f64("PLTDECM").unwrap_or(0.0) / 60.0
            + header.get_f64("PLTDECS").unwrap_or(0.0) / 3600.0;
        let negative = header
            .get_str("PLTDECSN")
            .map(|s| s.trim().starts_with('-'))
            .unwrap_or(false);
        let plate_dec = if negative { -dec_magnitude } else { dec_magnitude };

        let plate = DssPlate {
            plate_ra,
            plate_dec,
            plate_scale: header.require_f64("PLTSCALE")?,
            x_pixel_size: pixel_size(header, "XPIXELSZ"),
            y_pixel_size: pixel_size(header, "YPIXELSZ"),
            cnpix: [
                header.get_f64("CNPIX1").unwrap_or(0.0),
                header.get_f64("CNPIX2").unwrap_or(0.0),
            ],
            ppo3: header.require_f64("PPO3")?,
            ppo6: header.require_f64("PPO6")?,
            amdx: read_coeffs(header, "AMDX"),
            amdy: read_coeffs(header, "AMDY"),
        };

        if plate.amdx[0] == 0.0 && plate.amdx[1] == 0.0 {
            return Err(WcsError::InvalidKeyword {
                keyword: "AMDX1".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(plate)
    }

    /// Image pixel to plate position in millimetres from the plate centre
    pub fn pixel_to_plate_mm(&self, xpix: f64, ypix: f64) -> (f64, f64) {
        let x = xpix + self.cnpix[0] - 1.0 + 0.5;
        let y = ypix + self.cnpix[1] - 1.0 + 0.5;
        let xmm = (self.ppo3 - x * self.x_pixel_size) / 1000.0;
        let ymm = (y * self.y_pixel_size - self.ppo6) / 1000.0;
        (xmm, ymm)
    }

    /// Plate position in millimetres to image pixel
    pub fn plate_mm_to_pixel(&self, xmm: f64, ymm: f64) -> (f64, f64) {
        let x = (self.ppo3 - xmm * 1000.0) / self.x_pixel_size;
        let y = (self.ppo6 + ymm * 1000.0) / self.y_pixel_size;
        (x - self.cnpix[0] + 1.0 - 0.5, y - self.cnpix[1] + 1.0 - 0.5)
    }

    /// Standard coordinates (xi, eta) in arcseconds at an image pixel
    pub fn pixel_to_standard(&self, xpix: f64, ypix: f64) -> (f64, f64) {
        let (xmm, ymm) = self.pixel_to_plate_mm(xpix, ypix);
        let e = plate_model(&self.amdx, &self.amdy, xmm, ymm);
        (e.f, e.g)
    }

    /// Image pixel to sky (ra, dec) in degrees
    pub fn pixel_to_sky(&self, xpix: f64, ypix: f64) -> (f64, f64) {
        let (xi, eta) = self.pixel_to_standard(xpix, ypix);
        plate::standard_to_sky(xi / 3600.0, eta / 3600.0, self.plate_ra, self.plate_dec)
    }

    /// Sky (ra, dec) in degrees to standard coordinates in arcseconds
    pub fn sky_to_standard(
        &self,
        ra: f64,
        dec: f64,
    ) -> std::result::Result<(f64, f64), ProjectionError> {
        let (xi, eta) = plate::sky_to_standard(ra, dec, self.plate_ra, self.plate_dec)?;
        Ok((xi * 3600.0, eta * 3600.0))
    }

    /// Plate position in millimetres whose standard coordinates are (xi, eta)
    /// arcseconds
    pub fn standard_to_plate_mm(&self, xi: f64, eta: f64) -> std::result::Result<NewtonSolution, SolverError> {
        let target = DssTarget {
            plate: self,
            xi,
            eta,
        };
        let guess = (xi / self.plate_scale, eta / self.plate_scale);
        solver::solve(&target, guess)
    }

    /// Writes the plate solution keywords into `header`
    pub fn write_header(&self, header: &mut HeaderMap) {
        let hours = self.plate_ra / 15.0;
        let rah = hours.trunc();
        let ram = ((hours - rah) * 60.0).trunc();
        let ras = ((hours - rah) * 60.0 - ram) * 60.0;
        header.set("PLTRAH", rah).set("PLTRAM", ram).set("PLTRAS", ras);

        let dec = self.plate_dec.abs();
        let decd = dec.trunc();
        let decm = ((dec - decd) * 60.0).trunc();
        let decs = ((dec - decd) * 60.0 - decm) * 60.0;
        header
            .set("PLTDECSN", if self.plate_dec < 0.0 { "-" } else { "+" })
            .set("PLTDECD", decd)
            .set("PLTDECM", decm)
            .set("PLTDECS", decs);

        header
            .set("PLTSCALE", self.plate_scale)
            .set("XPIXELSZ", self.x_pixel_size)
            .set("YPIXELSZ", self.y_pixel_size)
            .set("CNPIX1", self.cnpix[0])
            .set("CNPIX2", self.cnpix[1])
            .set("PPO3", self.ppo3)
            .set("PPO6", self.ppo6);

        for (i, (a, b)) in self.amdx.iter().zip(self.amdy.iter()).enumerate() {
            if *a != 0.0 {
                header.set(&format!("AMDX{}", i + 1), a);
            }
            if *b != 0.0 {
                header.set(&format!("AMDY{}", i + 1), b);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::coordinates::distance;
    use approx::assert_relative_eq;

    /// Header of a 300×300 cut-out centred on the plate centre of a
    /// synthetic plate with mild distortion
    pub(crate) fn synthetic_dss_header() -> HeaderMap {
        let centre_plate_x = 7020.0;
        HeaderMap::new()
            .with("NAXIS", 2)
            .with("NAXIS1", 300)
            .with("NAXIS2", 300)
            .with("PLTRAH", 5)
            .with("PLTRAM", 32)
            .with("PLTRAS", 49.0)
            .with("PLTDECSN", "-")
            .with("PLTDECD", 5)
            .with("PLTDECM", 23)
            .with("PLTDECS", 0.0)
            .with("PLTSCALE", 67.2)
            .with("XPIXELSZ", 25.284_45)
            .with("YPIXELSZ", 25.284_45)
            .with("CNPIX1", centre_plate_x - 150.0)
            .with("CNPIX2", centre_plate_x - 150.0)
            .with("PPO3", centre_plate_x * 25.284_45)
            .with("PPO6", centre_plate_x * 25.284_45)
            .with("AMDX1", 67.2)
            .with("AMDX2", 0.02)
            .with("AMDX3", -1.5)
            .with("AMDX4", 1e-4)
            .with("AMDX7", 2e-5)
            .with("AMDX8", 1e-6)
            .with("AMDY1", 67.2)
            .with("AMDY2", -0.03)
            .with("AMDY3", 2.0)
            .with("AMDY6", -1e-4)
            .with("AMDY7", 2e-5)
            .with("AMDY8", -1e-6)
    }

    fn plate() -> DssPlate {
        DssPlate::from_header(&synthetic_dss_header()).unwrap()
    }

    #[test]
    fn test_header_parsing() {
        let p = plate();
        assert_relative_eq!(p.plate_ra, 15.0 * (5.0 + 32.0 / 60.0 + 49.0 / 3600.0), epsilon = 1e-12);
        assert_relative_eq!(p.plate_dec, -(5.0 + 23.0 / 60.0), epsilon = 1e-12);
        assert_eq!(p.amdx[0], 67.2);
        assert_eq!(p.amdx[19], 0.0);
    }

    #[test]
    fn test_pixel_plate_mm_roundtrip() {
        let p = plate();
        let (xmm, ymm) = p.pixel_to_plate_mm(10.0, 250.0);
        let (x, y) = p.plate_mm_to_pixel(xmm, ymm);
        assert_relative_eq!(x, 10.0, epsilon = 1e-9);
        assert_relative_eq!(y, 250.0, epsilon = 1e-9);
    }

    #[test]
    fn test_centre_is_near_plate_centre() {
        let p = plate();
        let (ra, dec) = p.pixel_to_sky(150.5, 150.5);
        // Only the constant terms (-1.5", +2.0") offset the plate centre
        let sep = distance(ra, dec, p.plate_ra, p.plate_dec) * 3600.0;
        assert!(sep < 3.0, "sep = {}", sep);
    }

    #[test]
    fn test_partials_match_finite_differences() {
        let mut p = plate();
        for i in 0..13 {
            p.amdx[i] += 1e-3 * (i as f64 + 1.0);
            p.amdy[i] -= 2e-3 * (i as f64 + 1.0);
        }
        let (x, y, h) = (3.0, -4.0, 1e-6);
        let e = plate_model(&p.amdx, &p.amdy, x, y);
        let ex = plate_model(&p.amdx, &p.amdy, x + h, y);
        let ey = plate_model(&p.amdx, &p.amdy, x, y + h);
        assert_relative_eq!(e.fx, (ex.f - e.f) / h, epsilon = 1e-3);
        assert_relative_eq!(e.fy, (ey.f - e.f) / h, epsilon = 1e-3);
        assert_relative_eq!(e.gx, (ex.g - e.g) / h, epsilon = 1e-3);
        assert_relative_eq!(e.gy, (ey.g - e.g) / h, epsilon = 1e-3);
    }

    #[test]
    fn test_sky_roundtrip() {
        let p = plate();
        for &(x, y) in &[(1.0, 1.0), (150.5, 150.5), (299.0, 20.0), (75.25, 280.75)] {
            let (ra, dec) = p.pixel_to_sky(x, y);
            let (xi, eta) = p.sky_to_standard(ra, dec).unwrap();
            let sol = p.standard_to_plate_mm(xi, eta).unwrap();
            let (x_rt, y_rt) = p.plate_mm_to_pixel(sol.x, sol.y);
            assert_relative_eq!(x_rt, x, epsilon = 1e-4);
            assert_relative_eq!(y_rt, y, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_missing_pixel_size_defaults() {
        let mut header = synthetic_dss_header();
        header.remove("XPIXELSZ");
        let p = DssPlate::from_header(&header).unwrap();
        assert_eq!(p.x_pixel_size, DEFAULT_PIXEL_SIZE);
    }

    #[test]
    fn test_missing_scale_is_error() {
        let mut header = synthetic_dss_header();
        header.remove("PLTSCALE");
        assert!(matches!(
            DssPlate::from_header(&header),
            Err(WcsError::MissingRequiredKeyword(k)) if k == "PLTSCALE"
        ));
    }

    #[test]
    fn test_write_header_roundtrip() {
        let p = plate();
        let mut header = HeaderMap::new();
        p.write_header(&mut header);
        let back = DssPlate::from_header(&header).unwrap();
        assert_relative_eq!(back.plate_ra, p.plate_ra, epsilon = 1e-9);
        assert_relative_eq!(back.plate_dec, p.plate_dec, epsilon = 1e-9);
        assert_eq!(back.amdy, p.amdy);
    }
}
