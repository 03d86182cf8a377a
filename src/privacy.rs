//! Input redaction applied before any text leaves the process

use lazy_static::lazy_static;
use regex::{Captures, Regex};

/// Replacement for a redacted PAN token.
pub const MASKED_PAN: &str = "1111111111";

lazy_static! {
    static ref PAN_PATTERN: Regex = Regex::new(r"^[A-Za-z]{5}[0-9]{4}[A-Za-z]$").unwrap();
    static ref TOKEN: Regex = Regex::new(r"\S+").unwrap();
}

/// Replace every whitespace-delimited token shaped like a PAN with
/// [`MASKED_PAN`]. Separators are kept; the result is trimmed.
pub fn redact_pan(input: &str) -> String {
    TOKEN
        .replace_all(input, |caps: &Captures| {
            let word = &caps[0];
            if PAN_PATTERN.is_match(word) {
                MASKED_PAN.to_string()
            } else {
                word.to_string()
            }
        })
        .trim()
        .to_string()
}
