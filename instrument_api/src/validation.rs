//! Client-side pre-validation of create and update payloads.
//!
//! The rules mirror what the server enforces, so a payload that passes here is
//! only rejected by the server for reasons the client can't see (e.g. a
//! duplicate ISIN). All violations are collected and reported together as one
//! [`StoreError::Validation`].

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    errors::StoreError,
    models::instrument::{InstrumentPatch, NewInstrument},
};

static SYMBOL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9.\-]{1,15}$").expect("valid regex"));
static ISIN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{2}[A-Z0-9]{9}[0-9]$").expect("valid regex"));
static CURRENCY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{3}$").expect("valid regex"));

/// Uppercase alphanumerics plus `.` and `-`, 1 to 15 characters.
pub fn is_valid_symbol(s: &str) -> bool {
    SYMBOL_RE.is_match(s)
}

/// ISO 6166 shape: two letters, nine alphanumerics, one check digit.
pub fn is_valid_isin(s: &str) -> bool {
    ISIN_RE.is_match(s)
}

/// ISO 4217 shape: three uppercase letters.
pub fn is_valid_currency(s: &str) -> bool {
    CURRENCY_RE.is_match(s)
}

/// One failed rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: &'static str,
}

#[derive(Default)]
struct Violations(Vec<FieldViolation>);

impl Violations {
    fn push(&mut self, field: &'static str, message: &'static str) {
        self.0.push(FieldViolation { field, message });
    }

    fn required_text(&mut self, field: &'static str, value: &str) {
        if value.trim().is_empty() {
            self.push(field, "is required");
        }
    }

    fn symbol(&mut self, field: &'static str, value: Option<&str>) {
        if let Some(v) = value {
            if !is_valid_symbol(v) {
                self.push(field, "must be 1-15 uppercase letters, digits, '.' or '-'");
            }
        }
    }

    fn isin(&mut self, value: Option<&str>) {
        if let Some(v) = value {
            if !is_valid_isin(v) {
                self.push("isin", "must be 2 letters, 9 alphanumerics and a check digit");
            }
        }
    }

    fn currency(&mut self, field: &'static str, value: Option<&str>) {
        if let Some(v) = value {
            if !is_valid_currency(v) {
                self.push(field, "must be a 3-letter ISO 4217 code");
            }
        }
    }

    fn into_result(self) -> Result<(), StoreError> {
        if self.0.is_empty() {
            return Ok(());
        }
        let msg = self
            .0
            .iter()
            .map(|v| format!("{}: {}", v.field, v.message))
            .collect::<Vec<_>>()
            .join("; ");
        Err(StoreError::validation(msg))
    }
}

/// Validate a create payload.
pub fn validate_new(dto: &NewInstrument) -> Result<(), StoreError> {
    let mut v = Violations::default();

    v.required_text("short_name", &dto.short_name);
    if !dto.short_name.trim().is_empty() {
        v.symbol("short_name", Some(&dto.short_name));
    }
    v.required_text("full_name", &dto.full_name);
    v.isin(dto.isin.as_deref());

    v.currency("original_currency", Some(&dto.original_currency));
    v.currency("interest_currency", Some(&dto.interest_currency));
    v.currency("statistical_currency", dto.statistical_currency.as_deref());

    v.symbol("telekurs_symbol", dto.telekurs_symbol.as_deref());
    v.symbol("reuters_symbol", dto.reuters_symbol.as_deref());
    v.symbol("yahoo_symbol", dto.yahoo_symbol.as_deref());

    v.into_result()
}

/// Validate an update payload. Only fields that are set are checked; a set
/// required field must still be non-empty.
pub fn validate_patch(patch: &InstrumentPatch) -> Result<(), StoreError> {
    let mut v = Violations::default();

    if let Some(s) = &patch.short_name {
        v.required_text("short_name", s);
        if !s.trim().is_empty() {
            v.symbol("short_name", Some(s));
        }
    }
    if let Some(s) = &patch.full_name {
        v.required_text("full_name", s);
    }
    v.isin(patch.isin.as_deref());

    v.currency("original_currency", patch.original_currency.as_deref());
    v.currency("interest_currency", patch.interest_currency.as_deref());
    v.currency("statistical_currency", patch.statistical_currency.as_deref());

    v.symbol("telekurs_symbol", patch.telekurs_symbol.as_deref());
    v.symbol("reuters_symbol", patch.reuters_symbol.as_deref());
    v.symbol("yahoo_symbol", patch.yahoo_symbol.as_deref());

    v.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::InstrumentType;

    fn msft() -> NewInstrument {
        NewInstrument::new("MSFT", "Microsoft Corporation", InstrumentType::Equity, "USD", "USD")
    }

    #[test]
    fn symbol_rules() {
        assert!(is_valid_symbol("AAPL"));
        assert!(is_valid_symbol("BRK.B"));
        assert!(is_valid_symbol("NESN-SW"));
        assert!(!is_valid_symbol("aapl"));
        assert!(!is_valid_symbol(""));
        assert!(!is_valid_symbol("ABCDEFGHIJKLMNOP")); // 16 chars
        assert!(!is_valid_symbol("AA PL"));
    }

    #[test]
    fn isin_rules() {
        assert!(is_valid_isin("US0378331005"));
        assert!(is_valid_isin("CH0038863350"));
        assert!(!is_valid_isin("US037833100X")); // check digit must be numeric
        assert!(!is_valid_isin("0S0378331005"));
        assert!(!is_valid_isin("US03783310"));
    }

    #[test]
    fn currency_rules() {
        assert!(is_valid_currency("CHF"));
        assert!(!is_valid_currency("chf"));
        assert!(!is_valid_currency("EURO"));
    }

    #[test]
    fn minimal_payload_passes() {
        assert!(validate_new(&msft()).is_ok());
    }

    #[test]
    fn all_violations_are_reported_together() {
        let mut dto = msft();
        dto.short_name = "msft".into();
        dto.full_name = "  ".into();
        dto.isin = Some("bad".into());
        dto.interest_currency = "usd".into();

        let err = validate_new(&dto).unwrap_err();
        let StoreError::Validation { message: Some(msg) } = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert!(msg.contains("short_name"));
        assert!(msg.contains("full_name: is required"));
        assert!(msg.contains("isin"));
        assert!(msg.contains("interest_currency"));
        assert!(!msg.contains("original_currency"));
    }

    #[test]
    fn patch_checks_only_set_fields() {
        assert!(validate_patch(&InstrumentPatch::default()).is_ok());
        let ok = InstrumentPatch {
            last_price: Some(175.5),
            ..Default::default()
        };
        assert!(validate_patch(&ok).is_ok());

        let blank_name = InstrumentPatch {
            full_name: Some(String::new()),
            ..Default::default()
        };
        assert!(validate_patch(&blank_name).is_err());
    }
}
