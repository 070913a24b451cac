//! # Validation Module
//!
//! Input validation for bookings, bills, payments, parties and settings.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Client forms (dashboard / mobile)                             │
//! │  ├── maxLength, input masks                                             │
//! │  └── Immediate user feedback                                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: freight-db operations                                         │
//! │  └── THIS MODULE: runs before the transaction opens                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── CHECK constraints on amounts and enums                             │
//! │  ├── UNIQUE lr_number / bill_number / idempotency_key                   │
//! │  └── Foreign keys                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Optional fields (`Option<&str>`) pass when absent or blank. Format checks
//! apply to whatever is left after trimming.
//!
//! ## Usage
//! ```rust
//! use freight_core::validation::{validate_phone, normalize_vehicle_number};
//!
//! assert!(validate_phone(Some("98765 43210"), "Driver phone").is_ok());
//! assert_eq!(normalize_vehicle_number(" mh 12 ab 1234 ").unwrap(), "MH12AB1234");
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::MAX_AMOUNT_PAISE;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Requires a non-blank value and returns it trimmed.
pub fn validate_required(value: &str, field: &str) -> ValidationResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(value.to_string())
}

/// Trims an optional value, mapping blank to `None`.
pub fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Rejects values longer than `max` characters.
pub fn validate_max_len(value: &str, field: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

// =============================================================================
// Amount Validators
// =============================================================================

/// Validates a user-entered amount.
///
/// ## Rules
/// - Must be greater than zero
/// - Must not exceed ₹5,00,00,000
///
/// ## Example
/// ```rust
/// use freight_core::money::Money;
/// use freight_core::validation::validate_amount;
///
/// assert!(validate_amount(Money::from_rupees(25_000), "Freight amount").is_ok());
/// assert!(validate_amount(Money::zero(), "Freight amount").is_err());
/// ```
pub fn validate_amount(amount: Money, field: &str) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    validate_ceiling(amount, field)
}

/// Validates an amount that may be zero (advance, TDS).
pub fn validate_non_negative(amount: Money, field: &str) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    validate_ceiling(amount, field)
}

fn validate_ceiling(amount: Money, field: &str) -> ValidationResult<()> {
    if amount.paise() > MAX_AMOUNT_PAISE {
        return Err(ValidationError::TooLarge {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Format Validators
// =============================================================================

/// Optional 10-digit phone number. Spaces and hyphens are ignored.
pub fn validate_phone(phone: Option<&str>, field: &str) -> ValidationResult<()> {
    let Some(phone) = non_blank(phone) else {
        return Ok(());
    };
    let digits: String = phone.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
    if digits.len() != 10 || !all_digits(&digits) {
        return Err(invalid(field, "must be a 10-digit number"));
    }
    Ok(())
}

/// Optional e-way bill number: exactly 12 digits.
pub fn validate_eway_bill(number: Option<&str>) -> ValidationResult<()> {
    let Some(number) = non_blank(number) else {
        return Ok(());
    };
    if number.len() != 12 || !all_digits(number) {
        return Err(invalid("E-way bill number", "must be exactly 12 digits"));
    }
    Ok(())
}

/// Optional pincode: exactly 6 digits.
pub fn validate_pincode(pincode: Option<&str>) -> ValidationResult<()> {
    let Some(pincode) = non_blank(pincode) else {
        return Ok(());
    };
    if pincode.len() != 6 || !all_digits(pincode) {
        return Err(invalid("Pincode", "must be exactly 6 digits"));
    }
    Ok(())
}

/// Optional GSTIN, e.g. `22AAAAA0000A1Z5`. Case-insensitive.
///
/// ## Layout
/// ```text
/// 22   AAAAA 0000 A   1        Z  5
/// ──   ───── ──── ─   ─        ─  ─
/// state  PAN (10)     entity   Z  check
/// ```
pub fn validate_gstin(gstin: Option<&str>) -> ValidationResult<()> {
    let Some(gstin) = non_blank(gstin) else {
        return Ok(());
    };
    let g = gstin.to_ascii_uppercase();
    let b = g.as_bytes();
    let ok = b.len() == 15
        && b[0..2].iter().all(u8::is_ascii_digit)
        && is_pan(&b[2..12])
        && (matches!(b[12], b'1'..=b'9') || b[12].is_ascii_uppercase())
        && b[13] == b'Z'
        && b[14].is_ascii_alphanumeric();
    if !ok {
        return Err(invalid("GSTIN", "must be 15 characters in format 22AAAAA0000A1Z5"));
    }
    Ok(())
}

/// Optional PAN, e.g. `AAAAA0000A`. Case-insensitive.
pub fn validate_pan(pan: Option<&str>) -> ValidationResult<()> {
    let Some(pan) = non_blank(pan) else {
        return Ok(());
    };
    if !is_pan(pan.to_ascii_uppercase().as_bytes()) {
        return Err(invalid("PAN", "must be 10 characters in format AAAAA0000A"));
    }
    Ok(())
}

/// Optional email address (`something@domain.tld`, no whitespace).
pub fn validate_email(email: Option<&str>) -> ValidationResult<()> {
    let Some(email) = non_blank(email) else {
        return Ok(());
    };
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !email.chars().any(char::is_whitespace)
                && !domain.contains('@')
                && domain
                    .rsplit_once('.')
                    .map_or(false, |(host, tld)| !host.is_empty() && !tld.is_empty())
        }
        None => false,
    };
    if !valid {
        return Err(invalid("Email", "is not a valid email address"));
    }
    Ok(())
}

/// Normalises and validates an Indian vehicle registration number.
///
/// Whitespace is removed and letters upper-cased, then the result must look
/// like `MH12AB1234`: two letters, two digits, one to three letters, one to
/// four digits.
///
/// ## Example
/// ```rust
/// use freight_core::validation::normalize_vehicle_number;
///
/// assert_eq!(normalize_vehicle_number("mh04 x 77").unwrap(), "MH04X77");
/// assert!(normalize_vehicle_number("1234").is_err());
/// ```
pub fn normalize_vehicle_number(number: &str) -> ValidationResult<String> {
    let clean: String = number
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();
    if clean.is_empty() {
        return Err(ValidationError::Required {
            field: "Vehicle number".to_string(),
        });
    }

    let b = clean.as_bytes();
    let mut pos = 0;
    let ok = take_run(b, &mut pos, u8::is_ascii_uppercase, 2, 2)
        && take_run(b, &mut pos, u8::is_ascii_digit, 2, 2)
        && take_run(b, &mut pos, u8::is_ascii_uppercase, 1, 3)
        && take_run(b, &mut pos, u8::is_ascii_digit, 1, 4)
        && pos == b.len();
    if !ok {
        return Err(invalid("Vehicle number", "expected a number like MH12AB1234"));
    }
    Ok(clean)
}

/// Validates a numbering prefix (`GR`, `RR`).
///
/// The bill number uses `/` as its separator, so a prefix may not contain one.
pub fn validate_prefix(prefix: &str, field: &str) -> ValidationResult<String> {
    let prefix = validate_required(prefix, field)?;
    validate_max_len(&prefix, field, 6)?;
    if prefix.contains('/') {
        return Err(invalid(field, "cannot contain '/'"));
    }
    Ok(prefix)
}

/// Validates a financial-year series (`2025-26`).
pub fn validate_series(series: &str) -> ValidationResult<String> {
    let series = validate_required(series, "Invoice series")?;
    validate_max_len(&series, "Invoice series", 10)?;
    if series.contains('/') {
        return Err(invalid("Invoice series", "cannot contain '/'"));
    }
    Ok(series)
}

// =============================================================================
// Helpers
// =============================================================================

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn all_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

fn is_pan(b: &[u8]) -> bool {
    b.len() == 10
        && b[0..5].iter().all(u8::is_ascii_uppercase)
        && b[5..9].iter().all(u8::is_ascii_digit)
        && b[9].is_ascii_uppercase()
}

/// Consumes a run of `min..=max` bytes matching `pred` starting at `pos`.
fn take_run(b: &[u8], pos: &mut usize, pred: fn(&u8) -> bool, min: usize, max: usize) -> bool {
    let start = *pos;
    while *pos < b.len() && *pos - start < max && pred(&b[*pos]) {
        *pos += 1;
    }
    *pos - start >= min
}

fn invalid(field: &str, reason: &str) -> ValidationError {
    ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_required() {
        assert_eq!(validate_required("  Pune ", "From city").unwrap(), "Pune");
        let err = validate_required("   ", "From city").unwrap_err();
        assert_eq!(err.to_string(), "From city is required");
    }

    #[test]
    fn test_normalize_optional() {
        assert_eq!(normalize_optional(Some("  note ")), Some("note".to_string()));
        assert_eq!(normalize_optional(Some("   ")), None);
        assert_eq!(normalize_optional(None), None);
    }

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount(Money::from_paise(1), "Amount").is_ok());
        assert!(validate_amount(Money::from_paise(MAX_AMOUNT_PAISE), "Amount").is_ok());

        assert!(matches!(
            validate_amount(Money::zero(), "Amount"),
            Err(ValidationError::MustBePositive { .. })
        ));
        assert!(matches!(
            validate_amount(Money::from_paise(MAX_AMOUNT_PAISE + 1), "Amount"),
            Err(ValidationError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_validate_non_negative() {
        assert!(validate_non_negative(Money::zero(), "Advance").is_ok());
        assert!(matches!(
            validate_non_negative(Money::from_paise(-1), "Advance"),
            Err(ValidationError::Negative { .. })
        ));
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone(None, "Phone").is_ok());
        assert!(validate_phone(Some(""), "Phone").is_ok());
        assert!(validate_phone(Some("9876543210"), "Phone").is_ok());
        assert!(validate_phone(Some("98765-43210"), "Phone").is_ok());
        assert!(validate_phone(Some("98765"), "Phone").is_err());
        assert!(validate_phone(Some("98765abcde"), "Phone").is_err());
    }

    #[test]
    fn test_validate_eway_bill() {
        assert!(validate_eway_bill(Some("123456789012")).is_ok());
        assert!(validate_eway_bill(Some("12345678901")).is_err());
        assert!(validate_eway_bill(Some("12345678901A")).is_err());
        assert!(validate_eway_bill(None).is_ok());
    }

    #[test]
    fn test_validate_gstin_and_pan() {
        assert!(validate_gstin(Some("27AAPFU0939F1ZV")).is_ok());
        assert!(validate_gstin(Some("27aapfu0939f1zv")).is_ok());
        assert!(validate_gstin(Some("27AAPFU0939F0ZV")).is_err());
        assert!(validate_gstin(Some("27AAPFU0939F1XV")).is_err());
        assert!(validate_gstin(Some("27AAPFU0939F1Z")).is_err());

        assert!(validate_pan(Some("AAPFU0939F")).is_ok());
        assert!(validate_pan(Some("AAPF00939F")).is_err());
        assert!(validate_pan(None).is_ok());
    }

    #[test]
    fn test_validate_pincode_and_email() {
        assert!(validate_pincode(Some("400001")).is_ok());
        assert!(validate_pincode(Some("40001")).is_err());
        assert!(validate_email(Some("accounts@example.in")).is_ok());
        assert!(validate_email(Some("accounts@example")).is_err());
        assert!(validate_email(Some("a b@example.in")).is_err());
    }

    #[test]
    fn test_vehicle_number() {
        assert_eq!(normalize_vehicle_number("MH12AB1234").unwrap(), "MH12AB1234");
        assert_eq!(normalize_vehicle_number("mh 12 ab 1234").unwrap(), "MH12AB1234");
        assert_eq!(normalize_vehicle_number("GJ01ABC1").unwrap(), "GJ01ABC1");

        assert!(normalize_vehicle_number("").is_err());
        assert!(normalize_vehicle_number("MH12").is_err());
        assert!(normalize_vehicle_number("MH12ABCD1234").is_err());
        assert!(normalize_vehicle_number("MH12AB12345").is_err());
        assert!(normalize_vehicle_number("12MHAB1234").is_err());
    }

    #[test]
    fn test_prefix_and_series() {
        assert_eq!(validate_prefix(" GR ", "LR prefix").unwrap(), "GR");
        assert!(validate_prefix("", "LR prefix").is_err());
        assert!(validate_prefix("G/R", "LR prefix").is_err());
        assert!(validate_prefix("TOOLONG", "LR prefix").is_err());
        assert_eq!(validate_series("2026-27").unwrap(), "2026-27");
        assert!(validate_series("2026/27").is_err());
    }
}
