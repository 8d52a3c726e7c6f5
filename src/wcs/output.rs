//! Output options and coordinate text formatting

use serde::{Deserialize, Serialize};

use crate::coordinates::{dec_to_string, deg_to_string, ra_to_string};
use crate::framelib::SkyFrame;
use crate::{Result, WcsError};

/// Text written for positions the projection cannot reach
pub const OFF_MAP: &str = "Off map";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordFormat {
    /// Sexagesimal for equatorial frames, degrees otherwise
    #[default]
    Auto,
    Sexagesimal,
    Degrees,
}

/// How transformed positions are reported
///
/// ```rust
/// use wcscore::wcs::OutputOptions;
///
/// let opts = OutputOptions::from_json(r#"{"frame": {"system": "galactic", "equinox": 2000.0}}"#).unwrap();
/// assert_eq!(opts.degree_precision, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    /// Output frame; `None` reports positions in the native frame
    pub frame: Option<SkyFrame>,
    pub format: CoordFormat,
    /// Decimal places of RA seconds; declination uses one less. Values
    /// above nine are printed with nine.
    pub ra_precision: usize,
    pub degree_precision: usize,
    pub append_label: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        OutputOptions {
            frame: None,
            format: CoordFormat::Auto,
            ra_precision: 3,
            degree_precision: 5,
            append_label: true,
        }
    }
}

impl OutputOptions {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| WcsError::Config(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| WcsError::Config(e.to_string()))
    }

    /// Formats a position given in `frame`
    pub fn format_position(&self, lon: f64, lat: f64, frame: &SkyFrame) -> String {
        let sexagesimal = match self.format {
            CoordFormat::Auto => frame.system.is_equatorial(),
            CoordFormat::Sexagesimal => true,
            CoordFormat::Degrees => false,
        };

        let mut text = if sexagesimal {
            format!(
                "{} {}",
                ra_to_string(lon, self.ra_precision),
                dec_to_string(lat, self.ra_precision.saturating_sub(1))
            )
        } else {
            format!(
                "{} {}",
                deg_to_string(lon, self.degree_precision),
                deg_to_string(lat, self.degree_precision)
            )
        };

        if self.append_label {
            text.push(' ');
            text.push_str(&frame.label());
        }
        text
    }
}
