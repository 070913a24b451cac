//! # GST Computation
//!
//! Splits the tax on a freight subtotal into CGST + SGST (intrastate) or
//! IGST (interstate).
//!
//! ```text
//! subtotal ₹1000.00 @ 18%
//!
//!   intrastate ─► CGST  9% = ₹90.00   SGST 9% = ₹90.00   IGST ₹0     total ₹1180.00
//!   interstate ─► CGST ₹0             SGST ₹0            IGST 18% = ₹180.00  total ₹1180.00
//! ```
//!
//! Each component is rounded to the paisa on its own, before the total is
//! summed. Historical invoices were produced this way and must reproduce
//! exactly.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::GstRate;
use crate::{DEFAULT_COMPANY_STATE, MAX_GST_RATE_BPS};

/// Result of [`compute_tax`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxBreakdown {
    pub subtotal: Money,
    pub cgst: Money,
    pub sgst: Money,
    pub igst: Money,
    pub total: Money,
}

impl TaxBreakdown {
    /// Sum of the three tax components.
    pub fn tax(&self) -> Money {
        self.cgst + self.sgst + self.igst
    }
}

/// Validates that a GST rate is within `0..=28%`.
pub fn validate_gst_rate(rate: GstRate) -> CoreResult<()> {
    if rate.bps() < 0 || rate.bps() > MAX_GST_RATE_BPS {
        return Err(CoreError::InvalidGstRate { bps: rate.bps() });
    }
    Ok(())
}

/// Computes the GST split for a subtotal.
///
/// ## Rules
/// - interstate: `igst = round(subtotal × rate)`, CGST = SGST = 0
/// - intrastate: `cgst = sgst = round(subtotal × rate / 2)`, IGST = 0
/// - `round` is two-decimal rounding of the `f64` product, see
///   [`Money::apply_rate`]
/// - `total = subtotal + cgst + sgst + igst`
///
/// Pure: same inputs always give the same outputs.
///
/// ## Example
/// ```rust
/// use freight_core::money::Money;
/// use freight_core::tax::compute_tax;
/// use freight_core::types::GstRate;
///
/// let split = compute_tax(Money::from_rupees(1000), GstRate::from_percent(18), true).unwrap();
/// assert_eq!(split.igst, Money::from_rupees(180));
/// assert_eq!(split.total, Money::from_rupees(1180));
/// ```
pub fn compute_tax(subtotal: Money, rate: GstRate, is_interstate: bool) -> CoreResult<TaxBreakdown> {
    validate_gst_rate(rate)?;

    let (cgst, sgst, igst) = if is_interstate {
        (Money::zero(), Money::zero(), subtotal.apply_rate(rate))
    } else {
        let half = subtotal.apply_half_rate(rate);
        (half, half, Money::zero())
    };

    Ok(TaxBreakdown {
        subtotal,
        cgst,
        sgst,
        igst,
        total: subtotal + cgst + sgst + igst,
    })
}

/// Decides whether a supply is interstate.
///
/// Compares the billed party's state with the company's registered state,
/// ignoring case and surrounding whitespace. A blank company state falls
/// back to [`DEFAULT_COMPANY_STATE`]; a party with no state on record is
/// treated as interstate.
pub fn is_interstate(party_state: Option<&str>, company_state: &str) -> bool {
    let company = match company_state.trim() {
        "" => DEFAULT_COMPANY_STATE,
        s => s,
    };
    let party = party_state.map(str::trim).unwrap_or("");
    !party.eq_ignore_ascii_case(company)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intrastate_split() {
        let split = compute_tax(Money::from_rupees(1000), GstRate::from_percent(18), false).unwrap();
        assert_eq!(split.cgst, Money::from_paise(9000));
        assert_eq!(split.sgst, Money::from_paise(9000));
        assert_eq!(split.igst, Money::zero());
        assert_eq!(split.total, Money::from_paise(118_000));
    }

    #[test]
    fn test_interstate_split() {
        let split = compute_tax(Money::from_rupees(1000), GstRate::from_percent(18), true).unwrap();
        assert_eq!(split.cgst, Money::zero());
        assert_eq!(split.sgst, Money::zero());
        assert_eq!(split.igst, Money::from_paise(18_000));
        assert_eq!(split.total, Money::from_paise(118_000));
    }

    #[test]
    fn test_halves_rounded_separately() {
        // ₹12,345.67 @ 5%: half = 30864.175 → 30864, full = 61728.35 → 61728
        let subtotal = Money::from_paise(1_234_567);
        let intra = compute_tax(subtotal, GstRate::from_percent(5), false).unwrap();
        assert_eq!(intra.cgst.paise(), 30_864);
        assert_eq!(intra.sgst.paise(), 30_864);
        assert_eq!(intra.total.paise(), 1_234_567 + 2 * 30_864);

        let inter = compute_tax(subtotal, GstRate::from_percent(5), true).unwrap();
        assert_eq!(inter.igst.paise(), 61_728);

        // 10 paise @ 5%: each half 0.25 → 0, IGST 0.5 → 1
        let tiny = Money::from_paise(10);
        let intra = compute_tax(tiny, GstRate::from_percent(5), false).unwrap();
        assert_eq!(intra.total.paise(), 10);
        let inter = compute_tax(tiny, GstRate::from_percent(5), true).unwrap();
        assert_eq!(inter.total.paise(), 11);
    }

    #[test]
    fn test_matches_issued_invoices_at_default_rate() {
        // (subtotal ₹, CGST paise, IGST paise) as printed on issued bills.
        for (rupees, cgst, igst) in [(43, 107, 215), (81, 202, 405), (91, 227, 455), (167, 417, 835), (177, 442, 885)] {
            let intra = compute_tax(Money::from_rupees(rupees), GstRate::from_percent(5), false).unwrap();
            assert_eq!(intra.cgst.paise(), cgst, "cgst for ₹{rupees}");
            assert_eq!(intra.sgst.paise(), cgst, "sgst for ₹{rupees}");
            assert_eq!(intra.total.paise(), rupees * 100 + 2 * cgst);

            let inter = compute_tax(Money::from_rupees(rupees), GstRate::from_percent(5), true).unwrap();
            assert_eq!(inter.igst.paise(), igst, "igst for ₹{rupees}");
        }
    }

    #[test]
    fn test_fractional_rate() {
        // ₹43 @ 12.5% intrastate: 43 × 0.0625 = 2.6875 → ₹2.69 each
        let split = compute_tax(Money::from_rupees(43), GstRate::from_bps(1250), false).unwrap();
        assert_eq!(split.cgst.paise(), 269);
        assert_eq!(split.total.paise(), 4300 + 538);
    }

    #[test]
    fn test_total_is_sum_of_parts() {
        for paise in [1, 99, 10_001, 123_456, 9_999_999] {
            for pct in [0, 5, 12, 18, 28] {
                for interstate in [false, true] {
                    let split = compute_tax(Money::from_paise(paise), GstRate::from_percent(pct), interstate).unwrap();
                    assert_eq!(split.total, split.subtotal + split.tax());
                    assert_eq!(split.cgst, split.sgst);
                }
            }
        }
    }

    #[test]
    fn test_pure() {
        let a = compute_tax(Money::from_paise(77_777), GstRate::from_bps(1250), false).unwrap();
        let b = compute_tax(Money::from_paise(77_777), GstRate::from_bps(1250), false).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rate_bounds() {
        assert!(compute_tax(Money::from_rupees(1), GstRate::zero(), false).is_ok());
        assert!(compute_tax(Money::from_rupees(1), GstRate::from_percent(28), false).is_ok());
        assert!(matches!(
            compute_tax(Money::from_rupees(1), GstRate::from_bps(2801), false),
            Err(CoreError::InvalidGstRate { bps: 2801 })
        ));
        assert!(compute_tax(Money::from_rupees(1), GstRate::from_bps(-1), true).is_err());
    }

    #[test]
    fn test_interstate_detection() {
        assert!(!is_interstate(Some("Maharashtra"), "Maharashtra"));
        assert!(!is_interstate(Some(" maharashtra "), "Maharashtra"));
        assert!(is_interstate(Some("Gujarat"), "Maharashtra"));
        assert!(is_interstate(None, "Maharashtra"));
        // Blank company state falls back to the default.
        assert!(!is_interstate(Some("Maharashtra"), ""));
        assert!(is_interstate(Some("Karnataka"), "  "));
    }
}
