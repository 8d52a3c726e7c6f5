//! wcscore: world coordinate system transforms for astronomical images
//!
//! This crate converts between image pixel coordinates and celestial
//! coordinates for the projections found in survey and plate headers:
//! closed-form AIPS projections (TAN, SIN, ARC, ...), plate polynomials,
//! the DSS plate solution and SIRTF (SIP) distortion. Positions can be
//! reported in FK4, FK5, ICRS, galactic or ecliptic coordinates.
//!
//! ```rust
//! use wcscore::{HeaderMap, SkyFrame, WcsContext};
//!
//! let header = HeaderMap::new()
//!     .with("NAXIS1", 100)
//!     .with("NAXIS2", 100)
//!     .with("CTYPE1", "RA---TAN")
//!     .with("CTYPE2", "DEC--TAN")
//!     .with("CRPIX1", 50.5)
//!     .with("CRPIX2", 50.5)
//!     .with("CRVAL1", 266.405)
//!     .with("CRVAL2", -28.936)
//!     .with("CDELT1", -0.001)
//!     .with("CDELT2", 0.001);
//!
//! let mut wcs = WcsContext::from_header(&header).unwrap();
//! let pix = wcs.sky_to_pixel(266.405, -28.936);
//! assert!(!pix.offscale);
//!
//! wcs.set_output_frame(SkyFrame::galactic());
//! let centre = wcs.pixel_to_sky(50.5, 50.5);
//! assert!(centre.lat.abs() < 0.1);
//! ```

use thiserror::Error;

pub mod constants;
pub mod coordinates;
pub mod framelib;
pub mod header;
pub mod precessionlib;
pub mod projection;
pub mod time;
pub mod wcs;

// Re-export commonly used types
pub use coordinates::distance;
pub use framelib::{convert, CoordSys, SkyFrame};
pub use header::{HeaderMap, HeaderView};
pub use projection::{Projection, ProjectionCode, ProjectionError};
pub use time::TimeError;
pub use wcs::{OutputOptions, PixelPosition, PointStatus, SkyPosition, SkyRange, WcsContext};

/// Errors raised while building a WCS; fatal for that image
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WcsError {
    #[error("No WCS keywords present in header")]
    NoWcsPresent,

    #[error("Missing required keyword: {0}")]
    MissingRequiredKeyword(String),

    #[error("Unsupported projection: {0}")]
    UnsupportedProjection(String),

    #[error("Invalid value for {keyword}: '{value}'")]
    InvalidKeyword { keyword: String, value: String },

    #[error("Singular scale matrix (determinant {0:e})")]
    SingularMatrix(f64),

    #[error("Unknown coordinate system: {0}")]
    UnknownCoordSys(String),

    #[error("Time error: {0}")]
    Time(#[from] TimeError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for wcscore operations
pub type Result<T> = std::result::Result<T, WcsError>;
