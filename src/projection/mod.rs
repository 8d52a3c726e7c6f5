//! Projection models between the pixel grid and the native sky
//!
//! Four families are supported, carried as one tagged [`Projection`]:
//! - closed-form ("classic AIPS") projections, applied after the CD matrix
//! - the PLATE polynomial (`CO1_n`/`CO2_n`) on a tangent plane
//! - the DSS plate solution
//! - SIRTF (SIP) distortion polynomials in front of a closed-form projection

pub mod classic;
pub mod dss;
pub mod plate;
pub mod sirtf;
pub mod solver;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Result, WcsError};

pub use dss::DssPlate;
pub use plate::PlatePolynomial;
pub use sirtf::{SipPolynomial, SirtfDistortion};
pub use solver::{BivariateModel, ModelEval, NewtonSolution, SolverError};

/// Per-point failure of a projection; never fatal for the image
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("Angle too large for projection")]
    AngleTooLarge,

    #[error("Bad value for projection")]
    BadValue,

    #[error("Inverse projection did not converge after {iterations} iterations")]
    NotConverged { iterations: usize },

    #[error("Singular Jacobian while inverting projection")]
    SingularJacobian,
}

impl From<SolverError> for ProjectionError {
    fn from(err: SolverError) -> Self {
        match err {
            SolverError::NotConverged { iterations, .. } => {
                ProjectionError::NotConverged { iterations }
            }
            SolverError::SingularJacobian { .. } => ProjectionError::SingularJacobian,
        }
    }
}

/// Projection identifier, as named by the CTYPE suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProjectionCode {
    Linear,
    Car,
    Tan,
    Sin,
    Arc,
    Stg,
    Ncp,
    Gls,
    Mer,
    Ait,
    /// Plate polynomial (`CO1_n`/`CO2_n`)
    Plate,
    /// DSS plate solution
    Dss,
    /// SIRTF distortion over a closed-form projection
    Sirtf,
}

impl ProjectionCode {
    /// Parses the four-character CTYPE suffix (`-TAN`, `-SIN`, ...)
    pub fn from_suffix(suffix: &str) -> Option<ProjectionCode> {
        let code = match suffix.trim_end() {
            "" | "-LIN" | "----" => ProjectionCode::Linear,
            "-CAR" => ProjectionCode::Car,
            "-TAN" => ProjectionCode::Tan,
            "-SIN" => ProjectionCode::Sin,
            "-ARC" => ProjectionCode::Arc,
            "-STG" => ProjectionCode::Stg,
            "-NCP" => ProjectionCode::Ncp,
            "-GLS" => ProjectionCode::Gls,
            "-MER" => ProjectionCode::Mer,
            "-AIT" => ProjectionCode::Ait,
            "-PLT" => ProjectionCode::Plate,
            "-DSS" => ProjectionCode::Dss,
            _ => return None,
        };
        Some(code)
    }

    /// CTYPE suffix written for this projection
    pub fn suffix(&self) -> &'static str {
        match self {
            ProjectionCode::Linear => "",
            ProjectionCode::Car => "-CAR",
            ProjectionCode::Tan => "-TAN",
            ProjectionCode::Sin => "-SIN",
            ProjectionCode::Arc => "-ARC",
            ProjectionCode::Stg => "-STG",
            ProjectionCode::Ncp => "-NCP",
            ProjectionCode::Gls => "-GLS",
            ProjectionCode::Mer => "-MER",
            ProjectionCode::Ait => "-AIT",
            ProjectionCode::Plate => "-PLT",
            ProjectionCode::Dss => "-DSS",
            ProjectionCode::Sirtf => "-SIP",
        }
    }

    /// True for projections with closed-form inverses applied after the CD
    /// matrix
    pub fn is_closed_form(&self) -> bool {
        !matches!(
            self,
            ProjectionCode::Plate | ProjectionCode::Dss | ProjectionCode::Sirtf
        )
    }
}

impl fmt::Display for ProjectionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionCode::Linear => write!(f, "LINEAR"),
            other => write!(f, "{}", other.suffix().trim_start_matches('-')),
        }
    }
}

/// One parsed CTYPE value, e.g. `RA---TAN-SIP`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisType {
    /// Coordinate name before the projection suffix (`RA`, `DEC`, `GLON`...)
    pub name: String,
    pub projection: ProjectionCode,
    /// `-SIP` distortion suffix present
    pub distorted: bool,
}

impl AxisType {
    /// Parses a CTYPE value; unknown projection suffixes are rejected
    ///
    /// # Examples
    ///
    /// ```rust
    /// use wcscore::projection::{AxisType, ProjectionCode};
    ///
    /// let axis = AxisType::parse("RA---TAN-SIP").unwrap();
    /// assert_eq!(axis.name, "RA");
    /// assert_eq!(axis.projection, ProjectionCode::Tan);
    /// assert!(axis.distorted);
    /// ```
    pub fn parse(ctype: &str) -> Result<AxisType> {
        let upper = ctype.trim().to_ascii_uppercase();
        let unsupported = || WcsError::UnsupportedProjection(ctype.trim().to_string());

        let (body, distorted) = match upper.strip_suffix("-SIP") {
            Some(body) if body.len() >= 8 => (body.to_string(), true),
            _ => (upper.clone(), false),
        };

        let name = body.split('-').next().unwrap_or("").trim().to_string();
        let projection = if body.len() <= 4 || !body.contains('-') {
            ProjectionCode::Linear
        } else {
            let suffix = body.get(4..).ok_or_else(unsupported)?;
            ProjectionCode::from_suffix(suffix).ok_or_else(unsupported)?
        };

        if distorted && !projection.is_closed_form() {
            return Err(unsupported());
        }

        Ok(AxisType {
            name,
            projection,
            distorted,
        })
    }

    /// True when this axis carries latitude (`DEC`, `GLAT`, `ELAT`, ...)
    pub fn is_latitude(&self) -> bool {
        self.name == "DEC" || self.name.ends_with("LAT")
    }
}

/// Projection model of a WCS, with the parameters only that model needs
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Closed-form projection applied after the CD matrix
    Classic(ProjectionCode),
    Plate(PlatePolynomial),
    Dss(DssPlate),
    Sirtf(SirtfDistortion),
}

impl Projection {
    pub fn code(&self) -> ProjectionCode {
        match self {
            Projection::Classic(code) => *code,
            Projection::Plate(_) => ProjectionCode::Plate,
            Projection::Dss(_) => ProjectionCode::Dss,
            Projection::Sirtf(_) => ProjectionCode::Sirtf,
        }
    }

    /// Closed-form projection applied on the tangent plane, if any
    pub fn base_code(&self) -> Option<ProjectionCode> {
        match self {
            Projection::Classic(code) => Some(*code),
            Projection::Sirtf(sip) => Some(sip.base()),
            Projection::Plate(_) | Projection::Dss(_) => None,
        }
    }
}
