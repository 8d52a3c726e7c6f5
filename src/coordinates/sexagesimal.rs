//! Sexagesimal formatting and parsing of sky coordinates
//!
//! Right ascension is written in hours (`HH:MM:SS.sss`), declination in
//! signed degrees (`+DD:MM:SS.ss`). Rounding is done on the smallest printed
//! unit so a value never prints as `60.000` seconds. Seconds are printed
//! with at most [`MAX_SECONDS_PRECISION`] decimal places.

/// Largest number of decimal places of seconds that is printed; finer
/// requests are clamped
pub const MAX_SECONDS_PRECISION: usize = 9;

/// Largest number of decimal places printed for decimal degrees
pub const MAX_DEGREE_PRECISION: usize = 15;

/// Splits a non-negative value into (whole units, minutes, seconds) rounded to
/// `ndec` decimal places of seconds. `ndec` must already be clamped.
fn split_units(value: f64, ndec: usize) -> (u64, u64, f64) {
    let per_second = 10u64.pow(ndec as u32);
    let total = (value.abs() * 3600.0 * per_second as f64).round() as u64;
    let seconds = (total % (60 * per_second)) as f64 / per_second as f64;
    let minutes = (total / (60 * per_second)) % 60;
    let whole = total / (3600 * per_second);
    (whole, minutes, seconds)
}

fn format_seconds(seconds: f64, ndec: usize) -> String {
    let width = if ndec > 0 { ndec + 3 } else { 2 };
    format!("{:0width$.prec$}", seconds, width = width, prec = ndec)
}

/// Formats a right ascension in degrees as `HH:MM:SS.sss` with `ndec`
/// decimal places of seconds of time
///
/// # Examples
///
/// ```rust
/// use wcscore::coordinates::sexagesimal::ra_to_string;
///
/// assert_eq!(ra_to_string(180.0, 3), "12:00:00.000");
/// assert_eq!(ra_to_string(359.9999999, 2), "00:00:00.00");
/// ```
pub fn ra_to_string(ra_deg: f64, ndec: usize) -> String {
    let ndec = ndec.min(MAX_SECONDS_PRECISION);
    let hours = ra_deg.rem_euclid(360.0) / 15.0;
    let (h, m, s) = split_units(hours, ndec);
    format!("{:02}:{:02}:{}", h % 24, m, format_seconds(s, ndec))
}

/// Formats a declination in degrees as `±DD:MM:SS.ss` with `ndec` decimal
/// places of arcseconds
pub fn dec_to_string(dec_deg: f64, ndec: usize) -> String {
    let ndec = ndec.min(MAX_SECONDS_PRECISION);
    let (d, m, s) = split_units(dec_deg, ndec);
    let rounded_zero = d == 0 && m == 0 && s == 0.0;
    let sign = if dec_deg < 0.0 && !rounded_zero { '-' } else { '+' };
    format!("{}{:02}:{:02}:{}", sign, d, m, format_seconds(s, ndec))
}

/// Formats an angle in decimal degrees, with at most
/// [`MAX_DEGREE_PRECISION`] decimal places
pub fn deg_to_string(deg: f64, ndec: usize) -> String {
    format!("{:.prec$}", deg, prec = ndec.min(MAX_DEGREE_PRECISION))
}

/// Parses `[-]A[:B[:C]]` or whitespace-separated fields into a magnitude with
/// an explicit sign. Returns `None` on any malformed field.
fn parse_fields(text: &str) -> Option<(f64, usize)> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let negative = trimmed.starts_with('-');
    let body = trimmed.trim_start_matches(|c: char| c == '-' || c == '+');

    let fields: Vec<&str> = body
        .split(|c: char| c == ':' || c.is_whitespace())
        .filter(|f| !f.is_empty())
        .collect();
    if fields.is_empty() || fields.len() > 3 {
        return None;
    }

    let mut value = 0.0;
    let mut scale = 1.0;
    for field in &fields {
        let part: f64 = field.parse().ok()?;
        if part < 0.0 {
            return None;
        }
        value += part / scale;
        scale *= 60.0;
    }

    Some((if negative { -value } else { value }, fields.len()))
}

/// Parses a right ascension into degrees
///
/// Sexagesimal input (`12:30:00`, `12 30 00`) is read as hours; a single
/// decimal number is read as degrees.
pub fn parse_ra(text: &str) -> Option<f64> {
    let (value, nfields) = parse_fields(text)?;
    if nfields > 1 {
        Some(value * 15.0)
    } else {
        Some(value)
    }
}

/// Parses a declination (sexagesimal or decimal) into degrees
pub fn parse_dec(text: &str) -> Option<f64> {
    parse_fields(text).map(|(value, _)| value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 3, "00:00:00.000")]
    #[case(187.5, 3, "12:30:00.000")]
    #[case(266.405, 3, "17:45:37.200")]
    #[case(-15.0, 1, "23:00:00.0")]
    #[case(14.999999999, 0, "01:00:00")]
    fn test_ra_to_string(#[case] ra: f64, #[case] ndec: usize, #[case] expected: &str) {
        assert_eq!(ra_to_string(ra, ndec), expected);
    }

    #[rstest]
    #[case(30.0, 2, "+30:00:00.00")]
    #[case(-28.936, 2, "-28:56:09.60")]
    #[case(-0.5, 1, "-00:30:00.0")]
    #[case(-0.000000001, 2, "+00:00:00.00")]
    #[case(89.99999999, 2, "+90:00:00.00")]
    fn test_dec_to_string(#[case] dec: f64, #[case] ndec: usize, #[case] expected: &str) {
        assert_eq!(dec_to_string(dec, ndec), expected);
    }

    #[rstest]
    #[case(9)]
    #[case(15)]
    #[case(16)]
    #[case(20)]
    #[case(usize::MAX)]
    fn test_precision_is_clamped(#[case] ndec: usize) {
        assert_eq!(ra_to_string(180.0, ndec), "12:00:00.000000000");
        assert_eq!(dec_to_string(30.0, ndec), "+30:00:00.000000000");
    }

    #[test]
    fn test_deg_to_string() {
        assert_eq!(deg_to_string(359.123456, 5), "359.12346");
        assert_eq!(deg_to_string(-0.5, 2), "-0.50");
        assert_eq!(deg_to_string(0.25, 40), "0.250000000000000");
    }

    #[test]
    fn test_parse_ra() {
        assert_relative_eq!(parse_ra("12:30:00").unwrap(), 187.5, epsilon = 1e-12);
        assert_relative_eq!(parse_ra("12 30 36").unwrap(), 187.65, epsilon = 1e-12);
        assert_relative_eq!(parse_ra("187.5").unwrap(), 187.5, epsilon = 1e-12);
        assert!(parse_ra("").is_none());
        assert!(parse_ra("12:xx:00").is_none());
    }

    #[test]
    fn test_parse_dec() {
        assert_relative_eq!(parse_dec("-00:30:00").unwrap(), -0.5, epsilon = 1e-12);
        assert_relative_eq!(parse_dec("+45:15:36").unwrap(), 45.26, epsilon = 1e-12);
        assert_relative_eq!(parse_dec("-28.936").unwrap(), -28.936, epsilon = 1e-12);
        assert!(parse_dec("1:2:3:4").is_none());
    }

    #[test]
    fn test_format_parse_roundtrip() {
        let ra = 83.633083;
        let dec = 22.014500;
        let ra_text = ra_to_string(ra, 3);
        let dec_text = dec_to_string(dec, 2);
        assert_relative_eq!(parse_ra(&ra_text).unwrap(), ra, epsilon = 1e-5);
        assert_relative_eq!(parse_dec(&dec_text).unwrap(), dec, epsilon = 1e-5);
    }
}
