//! SIRTF distortion polynomials (SIP convention)
//!
//! Pixel offsets (u, v) from the reference pixel are corrected to focal-plane
//! offsets before the CD matrix and a closed-form projection are applied:
//!
//! ```text
//! u' = u + A(u, v)        v' = v + B(u, v)
//! u  = u' + AP(u', v')    v  = v' + BP(u', v')
//! ```
//!
//! Headers without AP/BP are inverted numerically from A/B.

use log::{debug, warn};

use crate::header::{HeaderMap, HeaderView};
use crate::{Result, WcsError};

use super::solver::{self, BivariateModel, ModelEval};
use super::{ProjectionCode, ProjectionError};

/// Highest polynomial order stored
pub const MAX_SIP_ORDER: usize = 4;
const SIP_SIZE: usize = MAX_SIP_ORDER + 1;

/// One distortion polynomial; `coeff[p][q]` multiplies `u^p v^q`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SipPolynomial {
    order: usize,
    coeff: [[f64; SIP_SIZE]; SIP_SIZE],
}

impl SipPolynomial {
    pub fn new(order: usize) -> Result<Self> {
        if order > MAX_SIP_ORDER {
            return Err(WcsError::InvalidKeyword {
                keyword: "SIP order".to_string(),
                value: order.to_string(),
            });
        }
        Ok(SipPolynomial {
            order,
            coeff: [[0.0; SIP_SIZE]; SIP_SIZE],
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Sets the `u^p v^q` coefficient; terms above the order are ignored
    pub fn set(&mut self, p: usize, q: usize, value: f64) -> &mut Self {
        if p + q <= self.order {
            self.coeff[p][q] = value;
        }
        self
    }

    pub fn get(&self, p: usize, q: usize) -> f64 {
        if p + q <= self.order {
            self.coeff[p][q]
        } else {
            0.0
        }
    }

    /// Inner polynomial in v for the `u^p` row
    fn row(&self, p: usize, v: f64) -> f64 {
        (0..=self.order - p)
            .rev()
            .fold(0.0, |acc, q| acc * v + self.coeff[p][q])
    }

    fn row_dv(&self, p: usize, v: f64) -> f64 {
        (1..=self.order - p)
            .rev()
            .fold(0.0, |acc, q| acc * v + q as f64 * self.coeff[p][q])
    }

    /// Horner evaluation at (u, v)
    pub fn evaluate(&self, u: f64, v: f64) -> f64 {
        (0..=self.order)
            .rev()
            .fold(0.0, |acc, p| acc * u + self.row(p, v))
    }

    /// Partial derivatives (d/du, d/dv) at (u, v)
    pub fn partials(&self, u: f64, v: f64) -> (f64, f64) {
        let du = (1..=self.order)
            .rev()
            .fold(0.0, |acc, p| acc * u + p as f64 * self.row(p, v));
        let dv = (0..=self.order)
            .rev()
            .fold(0.0, |acc, p| acc * u + self.row_dv(p, v));
        (du, dv)
    }

    /// Reads `{prefix}_ORDER` and the `{prefix}_p_q` coefficients; `None` when
    /// the order keyword is absent
    pub fn from_header(header: &dyn HeaderView, prefix: &str) -> Result<Option<SipPolynomial>> {
        let order_key = format!("{}_ORDER", prefix);
        let order = match header.get_str(&order_key) {
            None => return Ok(None),
            Some(raw) => header
                .get_i64(&order_key)
                .filter(|o| (0..=MAX_SIP_ORDER as i64).contains(o))
                .ok_or(WcsError::InvalidKeyword {
                    keyword: order_key,
                    value: raw,
                })? as usize,
        };

        let mut poly = SipPolynomial::new(order)?;
        for p in 0..=order {
            for q in 0..=order - p {
                if let Some(value) = header.get_f64(&format!("{}_{}_{}", prefix, p, q)) {
                    poly.set(p, q, value);
                }
            }
        }
        Ok(Some(poly))
    }

    pub fn write_header(&self, header: &mut HeaderMap, prefix: &str) {
        header.set(&format!("{}_ORDER", prefix), self.order);
        for p in 0..=self.order {
            for q in 0..=self.order - p {
                if self.coeff[p][q] != 0.0 {
                    header.set(&format!("{}_{}_{}", prefix, p, q), self.coeff[p][q]);
                }
            }
        }
    }
}

/// SIP correction layered over a closed-form projection
#[derive(Debug, Clone, PartialEq)]
pub struct SirtfDistortion {
    base: ProjectionCode,
    a: SipPolynomial,
    b: SipPolynomial,
    ap: Option<SipPolynomial>,
    bp: Option<SipPolynomial>,
}

struct FocalTarget<'a> {
    sip: &'a SirtfDistortion,
    u: f64,
    v: f64,
}

impl BivariateModel for FocalTarget<'_> {
    fn evaluate(&self, u: f64, v: f64) -> ModelEval {
        let (au, av) = self.sip.a.partials(u, v);
        let (bu, bv) = self.sip.b.partials(u, v);
        ModelEval {
            f: u + self.sip.a.evaluate(u, v) - self.u,
            fx: 1.0 + au,
            fy: av,
            g: v + self.sip.b.evaluate(u, v) - self.v,
            gx: bu,
            gy: 1.0 + bv,
        }
    }
}

impl SirtfDistortion {
    pub fn new(
        base: ProjectionCode,
        a: SipPolynomial,
        b: SipPolynomial,
        inverse: Option<(SipPolynomial, SipPolynomial)>,
    ) -> Self {
        let (ap, bp) = match inverse {
            Some((ap, bp)) => (Some(ap), Some(bp)),
            None => (None, None),
        };
        SirtfDistortion { base, a, b, ap, bp }
    }

    /// Reads A/B (required) and AP/BP (optional, used only as a pair)
    pub fn from_header(header: &dyn HeaderView, base: ProjectionCode) -> Result<Self> {
        let a = SipPolynomial::from_header(header, "A")?
            .ok_or_else(|| WcsError::MissingRequiredKeyword("A_ORDER".to_string()))?;
        let b = SipPolynomial::from_header(header, "B")?
            .ok_or_else(|| WcsError::MissingRequiredKeyword("B_ORDER".to_string()))?;
        let ap = SipPolynomial::from_header(header, "AP")?;
        let bp = SipPolynomial::from_header(header, "BP")?;

        let inverse = match (ap, bp) {
            (Some(ap), Some(bp)) => Some((ap, bp)),
            (None, None) => None,
            _ => {
                warn!("only one of AP_ORDER/BP_ORDER present; inverting A/B numerically");
                None
            }
        };
        Ok(SirtfDistortion::new(base, a, b, inverse))
    }

    /// Closed-form projection applied after the correction
    pub fn base(&self) -> ProjectionCode {
        self.base
    }

    pub fn a(&self) -> &SipPolynomial {
        &self.a
    }

    pub fn b(&self) -> &SipPolynomial {
        &self.b
    }

    pub fn has_inverse(&self) -> bool {
        self.ap.is_some() && self.bp.is_some()
    }

    /// Pixel offset from CRPIX to corrected focal-plane offset
    pub fn pixel_to_focal(&self, u: f64, v: f64) -> (f64, f64) {
        (u + self.a.evaluate(u, v), v + self.b.evaluate(u, v))
    }

    /// Focal-plane offset back to pixel offset
    pub fn focal_to_pixel(&self, u: f64, v: f64) -> std::result::Result<(f64, f64), ProjectionError> {
        if let (Some(ap), Some(bp)) = (&self.ap, &self.bp) {
            return Ok((u + ap.evaluate(u, v), v + bp.evaluate(u, v)));
        }
        let target = FocalTarget { sip: self, u, v };
        let sol = solver::solve(&target, (u, v)).map_err(|err| {
            debug!("SIP inversion failed at ({}, {}): {}", u, v, err);
            ProjectionError::from(err)
        })?;
        Ok((sol.x, sol.y))
    }

    pub fn write_header(&self, header: &mut HeaderMap) {
        self.a.write_header(header, "A");
        self.b.write_header(header, "B");
        if let (Some(ap), Some(bp)) = (&self.ap, &self.bp) {
            ap.write_header(header, "AP");
            bp.write_header(header, "BP");
        }
    }
}
