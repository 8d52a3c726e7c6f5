//! Read access to an already-parsed image header
//!
//! WCS construction only needs typed lookups by keyword, so any header
//! parser can feed it by implementing [`HeaderView`]. [`HeaderMap`] is a
//! simple owned implementation used by tests and by [`crate::WcsContext::to_header`].

use std::collections::{BTreeMap, HashMap};

use crate::coordinates::{parse_dec, parse_ra};
use crate::{Result, WcsError};

/// Parses a header number, accepting Fortran `D` exponents (`1.5D-03`)
pub fn parse_header_float(text: &str) -> Option<f64> {
    let cleaned = clean_value(text);
    if cleaned.is_empty() {
        return None;
    }
    cleaned
        .parse::<f64>()
        .ok()
        .or_else(|| cleaned.replace(|c: char| c == 'D' || c == 'd', "E").parse::<f64>().ok())
}

/// Strips surrounding quotes and blanks from a raw header value
fn clean_value(text: &str) -> String {
    let trimmed = text.trim();
    let unquoted = trimmed
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(trimmed);
    unquoted.trim().to_string()
}

/// Typed keyword lookups over a header
pub trait HeaderView {
    /// Raw string value of a keyword, with quotes and trailing blanks removed
    fn get_str(&self, key: &str) -> Option<String>;

    fn get_f64(&self, key: &str) -> Option<f64> {
        self.get_str(key).and_then(|v| parse_header_float(&v))
    }

    /// Integer value; integral floats such as `512.0` are accepted
    fn get_i64(&self, key: &str) -> Option<i64> {
        let value = self.get_str(key)?;
        value.trim().parse::<i64>().ok().or_else(|| {
            parse_header_float(&value)
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        })
    }

    fn contains(&self, key: &str) -> bool {
        self.get_str(key).is_some()
    }

    /// Numeric value that must be present and parseable
    fn require_f64(&self, key: &str) -> Result<f64> {
        let raw = self
            .get_str(key)
            .ok_or_else(|| WcsError::MissingRequiredKeyword(key.to_string()))?;
        parse_header_float(&raw).ok_or_else(|| WcsError::InvalidKeyword {
            keyword: key.to_string(),
            value: raw,
        })
    }

    /// Right ascension in degrees: sexagesimal values are hours, plain
    /// numbers are degrees
    fn get_ra_deg(&self, key: &str) -> Option<f64> {
        self.get_str(key).and_then(|v| parse_ra(&v))
    }

    /// Declination in degrees, sexagesimal or decimal
    fn get_dec_deg(&self, key: &str) -> Option<f64> {
        self.get_str(key).and_then(|v| parse_dec(&v))
    }
}

/// Owned keyword → value map
///
/// Keywords are stored upper-case, so lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderMap {
    cards: BTreeMap<String, String>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a keyword, replacing any previous value
    pub fn set(&mut self, key: &str, value: impl ToString) -> &mut Self {
        self.cards
            .insert(key.trim().to_ascii_uppercase(), clean_value(&value.to_string()));
        self
    }

    /// Builder-style [`HeaderMap::set`]
    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.cards.remove(&key.trim().to_ascii_uppercase())
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Keywords and values in keyword order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cards.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Copies every card of `other` into this map
    pub fn merge(&mut self, other: &HeaderMap) {
        for (key, value) in other.iter() {
            self.cards.insert(key.to_string(), value.to_string());
        }
    }
}

impl HeaderView for HeaderMap {
    fn get_str(&self, key: &str) -> Option<String> {
        self.cards.get(&key.trim().to_ascii_uppercase()).cloned()
    }
}

impl<K: AsRef<str>, V: ToString> FromIterator<(K, V)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = HeaderMap::new();
        for (key, value) in iter {
            map.set(key.as_ref(), value);
        }
        map
    }
}

impl HeaderView for HashMap<String, String> {
    fn get_str(&self, key: &str) -> Option<String> {
        self.get(key)
            .or_else(|| self.get(&key.to_ascii_uppercase()))
            .map(|v| clean_value(v))
    }
}
