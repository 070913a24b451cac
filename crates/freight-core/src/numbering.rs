//! # Document Numbering
//!
//! Formats for the two human-facing identifiers the business prints:
//!
//! ```text
//! LR / GR number   {lr_prefix}{counter:04}                    GR0001
//! Bill number      {invoice_prefix}/{invoice_series}/{counter:04}   RR/2025-26/0001
//! ```
//!
//! Both formats are persisted on paper and in old records and must not
//! change. Counters wider than four digits print in full (`GR10000`).
//!
//! Drawing the counter is the database layer's job; see
//! `freight_db::repository::settings::increment_and_get`.

use crate::error::{CoreError, CoreResult};
use crate::types::setting_keys;

pub const DEFAULT_LR_PREFIX: &str = "GR";
pub const DEFAULT_INVOICE_PREFIX: &str = "RR";
pub const DEFAULT_INVOICE_SERIES: &str = "2025-26";

/// Which counter a number is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceKind {
    Lr,
    Bill,
}

impl SequenceKind {
    pub fn counter_key(&self) -> &'static str {
        match self {
            SequenceKind::Lr => setting_keys::LR_COUNTER,
            SequenceKind::Bill => setting_keys::INVOICE_COUNTER,
        }
    }

    pub fn prefix_key(&self) -> &'static str {
        match self {
            SequenceKind::Lr => setting_keys::LR_PREFIX,
            SequenceKind::Bill => setting_keys::INVOICE_PREFIX,
        }
    }

    pub fn default_prefix(&self) -> &'static str {
        match self {
            SequenceKind::Lr => DEFAULT_LR_PREFIX,
            SequenceKind::Bill => DEFAULT_INVOICE_PREFIX,
        }
    }
}

/// Formats an LR number.
///
/// ## Example
/// ```rust
/// use freight_core::numbering::format_lr_number;
///
/// assert_eq!(format_lr_number("GR", 1), "GR0001");
/// assert_eq!(format_lr_number("GR", 12345), "GR12345");
/// ```
pub fn format_lr_number(prefix: &str, counter: i64) -> String {
    format!("{}{:04}", prefix, counter)
}

/// Formats a bill number.
///
/// ## Example
/// ```rust
/// use freight_core::numbering::format_bill_number;
///
/// assert_eq!(format_bill_number("RR", "2025-26", 1), "RR/2025-26/0001");
/// ```
pub fn format_bill_number(prefix: &str, series: &str, counter: i64) -> String {
    format!("{}/{}/{:04}", prefix, series, counter)
}

/// Returns `value` trimmed, or `default` when it is missing or blank.
pub fn or_default<'a>(value: Option<&'a str>, default: &'a str) -> &'a str {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => default,
    }
}

/// Parses a stored counter value. Counters start at 1.
pub fn parse_counter(key: &str, value: &str) -> CoreResult<i64> {
    match value.trim().parse::<i64>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(CoreError::InvalidCounter {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
