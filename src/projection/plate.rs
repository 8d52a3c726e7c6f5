//! Plate polynomial: pixel offsets to standard coordinates on a tangent plane
//!
//! Each axis is a polynomial in the pixel offsets (x, y) from the reference
//! pixel, giving standard coordinates (xi, eta) in degrees:
//!
//! ```text
//! c0 + c1 x + c2 y + c3 x² + c4 y² + c5 xy
//!    + c6 x³ + c7 y³                                   (more than 6 terms)
//!    + c8 x²y + c9 xy² + c10 r² + c11 x r² + c12 y r²  (more than 8 terms)
//! ```
//!
//! Standard coordinates are gnomonic offsets from CRVAL. The inverse solves
//! the polynomial pair by Newton iteration.

use log::debug;

use crate::constants::{DEG2RAD, RAD2DEG};
use crate::coordinates::normalize_longitude;

use super::solver::{self, BivariateModel, ModelEval, NewtonSolution, SolverError};
use super::ProjectionError;

/// Largest number of coefficients stored per axis
pub const MAX_PLATE_COEFFS: usize = 20;

/// Terms used by the evaluated model
const MODEL_TERMS: usize = 13;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlatePolynomial {
    x_coeff: [f64; MAX_PLATE_COEFFS],
    y_coeff: [f64; MAX_PLATE_COEFFS],
    ncoeff_x: usize,
    ncoeff_y: usize,
}

/// Value of one axis polynomial and its partials
fn evaluate_axis(c: &[f64; MAX_PLATE_COEFFS], ncoeff: usize, x: f64, y: f64) -> (f64, f64, f64) {
    let x2 = x * x;
    let y2 = y * y;
    let xy = x * y;

    let mut value = c[0] + c[1] * x + c[2] * y + c[3] * x2 + c[4] * y2 + c[5] * xy;
    let mut dx = c[1] + 2.0 * c[3] * x + c[5] * y;
    let mut dy = c[2] + 2.0 * c[4] * y + c[5] * x;

    if ncoeff > 6 {
        value += c[6] * x2 * x + c[7] * y2 * y;
        dx += 3.0 * c[6] * x2;
        dy += 3.0 * c[7] * y2;
    }

    if ncoeff > 8 {
        let r2 = x2 + y2;
        value += c[8] * x2 * y
            + c[9] * x * y2
            + c[10] * r2
            + c[11] * x * r2
            + c[12] * y * r2;
        dx += 2.0 * c[8] * xy
            + c[9] * y2
            + 2.0 * c[10] * x
            + c[11] * (r2 + 2.0 * x2)
            + 2.0 * c[12] * xy;
        dy += c[8] * x2
            + 2.0 * c[9] * xy
            + 2.0 * c[10] * y
            + 2.0 * c[11] * xy
            + c[12] * (r2 + 2.0 * y2);
    }

    (value, dx, dy)
}

/// Newton residual of the plate model against a target (xi, eta)
struct PlateTarget<'a> {
    plate: &'a PlatePolynomial,
    xi: f64,
    eta: f64,
}

impl BivariateModel for PlateTarget<'_> {
    fn evaluate(&self, x: f64, y: f64) -> ModelEval {
        let (f, fx, fy) = evaluate_axis(&self.plate.x_coeff, self.plate.ncoeff_x, x, y);
        let (g, gx, gy) = evaluate_axis(&self.plate.y_coeff, self.plate.ncoeff_y, x, y);
        ModelEval {
            f: f - self.xi,
            fx,
            fy,
            g: g - self.eta,
            gx,
            gy,
        }
    }
}

impl PlatePolynomial {
    /// Builds a plate model; coefficients past the twentieth are ignored
    pub fn new(x_coeff: &[f64], y_coeff: &[f64]) -> Self {
        let mut x = [0.0; MAX_PLATE_COEFFS];
        let mut y = [0.0; MAX_PLATE_COEFFS];
        let ncoeff_x = x_coeff.len().min(MAX_PLATE_COEFFS);
        let ncoeff_y = y_coeff.len().min(MAX_PLATE_COEFFS);
        x[..ncoeff_x].copy_from_slice(&x_coeff[..ncoeff_x]);
        y[..ncoeff_y].copy_from_slice(&y_coeff[..ncoeff_y]);

        if ncoeff_x.max(ncoeff_y) > MODEL_TERMS {
            debug!(
                "plate model uses {} terms; coefficients beyond are stored but not evaluated",
                MODEL_TERMS
            );
        }

        PlatePolynomial {
            x_coeff: x,
            y_coeff: y,
            ncoeff_x,
            ncoeff_y,
        }
    }

    pub fn x_coeffs(&self) -> &[f64] {
        &self.x_coeff[..self.ncoeff_x]
    }

    pub fn y_coeffs(&self) -> &[f64] {
        &self.y_coeff[..self.ncoeff_y]
    }

    /// Standard coordinates (xi, eta) in degrees at a pixel offset
    pub fn offset_to_standard(&self, x: f64, y: f64) -> (f64, f64) {
        let (xi, _, _) = evaluate_axis(&self.x_coeff, self.ncoeff_x, x, y);
        let (eta, _, _) = evaluate_axis(&self.y_coeff, self.ncoeff_y, x, y);
        (xi, eta)
    }

    /// First guess for the inverse from the constant and linear terms
    fn initial_guess(&self, xi: f64, eta: f64) -> (f64, f64) {
        let (a0, a1, a2) = (self.x_coeff[0], self.x_coeff[1], self.x_coeff[2]);
        let (b0, b1, b2) = (self.y_coeff[0], self.y_coeff[1], self.y_coeff[2]);

        if a1 != 0.0 && b2 != 0.0 {
            return ((xi - a0) / a1, (eta - b0) / b2);
        }

        // Axes swapped or rotated by 90 degrees: solve the full linear part
        let det = a1 * b2 - a2 * b1;
        if det != 0.0 {
            let (u, v) = (xi - a0, eta - b0);
            ((u * b2 - v * a2) / det, (v * a1 - u * b1) / det)
        } else {
            (0.0, 0.0)
        }
    }

    /// Pixel offset whose standard coordinates are (xi, eta) degrees
    pub fn standard_to_offset(&self, xi: f64, eta: f64) -> Result<NewtonSolution, SolverError> {
        let target = PlateTarget {
            plate: self,
            xi,
            eta,
        };
        solver::solve(&target, self.initial_guess(xi, eta))
    }
}

/// Gnomonic standard coordinates (degrees) about `(ref_lon, ref_lat)` to sky
pub fn standard_to_sky(xi: f64, eta: f64, ref_lon: f64, ref_lat: f64) -> (f64, f64) {
    let xir = xi * DEG2RAD;
    let etar = eta * DEG2RAD;
    let ra0 = ref_lon * DEG2RAD;
    let dec0 = ref_lat * DEG2RAD;

    let ctan = dec0.tan();
    let ccos = dec0.cos();
    let raoff = (xir / ccos).atan2(1.0 - etar * ctan);
    let dec = ((etar + ctan) * raoff.cos() / (1.0 - etar * ctan)).atan();

    (normalize_longitude((ra0 + raoff) * RAD2DEG), dec * RAD2DEG)
}

/// Sky to gnomonic standard coordinates (degrees) about `(ref_lon, ref_lat)`
pub fn sky_to_standard(
    lon: f64,
    lat: f64,
    ref_lon: f64,
    ref_lat: f64,
) -> Result<(f64, f64), ProjectionError> {
    let dra = (lon - ref_lon) * DEG2RAD;
    let (sin_dec, cos_dec) = (lat * DEG2RAD).sin_cos();
    let (sin_dec0, cos_dec0) = (ref_lat * DEG2RAD).sin_cos();

    let div = sin_dec * sin_dec0 + cos_dec * cos_dec0 * dra.cos();
    if div <= 0.0 {
        return Err(ProjectionError::AngleTooLarge);
    }
    let xi = cos_dec * dra.sin() / div;
    let eta = (sin_dec * cos_dec0 - cos_dec * sin_dec0 * dra.cos()) / div;
    Ok((xi * RAD2DEG, eta * RAD2DEG))
}
