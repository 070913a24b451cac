//! # Money Module
//!
//! Provides the `Money` type for handling rupee amounts safely.
//!
//! ## Why Integer Paise?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A bill's paid amount accumulates one payment at a time, so float      │
//! │  drift would eventually flip a bill between PAID and PARTIALLY_PAID.   │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Paise (1 rupee = 100 paise)                      │
//! │    ₹1,180.00 is stored as 118000. Rounding to two decimals means       │
//! │    rounding to a whole paisa, and it happens exactly once per step.    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use freight_core::money::Money;
//!
//! let freight = Money::from_paise(125_050); // ₹1,250.50
//! let total = freight + Money::from_rupees(100);
//! assert_eq!(total.paise(), 135_050);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

use crate::types::GstRate;

// =============================================================================
// Money Type
// =============================================================================

/// A rupee amount in paise (the smallest currency unit).
///
/// ## Design Decisions
/// - **i64 (signed)**: outstanding balances and ledger balances can go negative
/// - **Single field tuple struct**: zero-cost abstraction over i64
///
/// ## Where Money is Used
/// ```text
/// Bill.subtotal ──► compute_tax ──► cgst / sgst / igst ──► Bill.total
///                                                              │
/// Payment.amount ──► Bill.paid ──► outstanding = total - paid ─┘
///        │
///        └── minus Payment.tds ──► LedgerEntry.credit
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise.
    ///
    /// ## Example
    /// ```rust
    /// use freight_core::money::Money;
    ///
    /// let amount = Money::from_paise(1099); // ₹10.99
    /// assert_eq!(amount.paise(), 1099);
    /// ```
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from whole rupees.
    #[inline]
    pub const fn from_rupees(rupees: i64) -> Self {
        Money(rupees * 100)
    }

    /// Creates a Money value from rupees and paise.
    ///
    /// ## Example
    /// ```rust
    /// use freight_core::money::Money;
    ///
    /// assert_eq!(Money::from_rupees_paise(10, 99).paise(), 1099);
    /// assert_eq!(Money::from_rupees_paise(-5, 50).paise(), -550);
    /// ```
    ///
    /// ## Note
    /// For negative amounts only the rupee part carries the sign.
    #[inline]
    pub const fn from_rupees_paise(rupees: i64, paise: i64) -> Self {
        if rupees < 0 {
            Money(rupees * 100 - paise)
        } else {
            Money(rupees * 100 + paise)
        }
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion.
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Applies a GST rate and rounds to the nearest paisa.
    ///
    /// ## Rounding
    /// Issued invoices were computed in binary floating point as
    /// `rupees × (percent / 100)` and then fixed to two decimals. Reproducing
    /// them means doing the same: the product is taken as an `f64` and the
    /// exact value of that `f64` is rounded, half away from zero. A nominal
    /// half-paisa tie can therefore land on either side (₹43 × 2.5% is
    /// `1.0749999…` and gives ₹1.07).
    ///
    /// ## Example
    /// ```rust
    /// use freight_core::money::Money;
    /// use freight_core::types::GstRate;
    ///
    /// let subtotal = Money::from_rupees(1000);
    /// assert_eq!(subtotal.apply_rate(GstRate::from_percent(18)).paise(), 18_000);
    /// ```
    pub fn apply_rate(&self, rate: GstRate) -> Money {
        let rate = rate.percent() / 100.0;
        Money(round_to_paise(self.as_rupees_f64() * rate))
    }

    /// Applies half of a GST rate (the CGST or SGST share), rounded to the
    /// nearest paisa the same way as [`Money::apply_rate`].
    ///
    /// ## Example
    /// ```rust
    /// use freight_core::money::Money;
    /// use freight_core::types::GstRate;
    ///
    /// // ₹999.99 at 5% / 2 = ₹24.99975 → ₹25.00
    /// let subtotal = Money::from_paise(99_999);
    /// assert_eq!(subtotal.apply_half_rate(GstRate::from_percent(5)).paise(), 2500);
    /// ```
    pub fn apply_half_rate(&self, rate: GstRate) -> Money {
        let rate = rate.percent() / 100.0;
        Money(round_to_paise(self.as_rupees_f64() * (rate / 2.0)))
    }

    /// The amount in rupees as the nearest `f64`.
    #[inline]
    fn as_rupees_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Checked addition; `None` on overflow.
    #[inline]
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }
}

/// Rounds a rupee value to whole paise, half away from zero.
///
/// Works on the exact binary value of `rupees` (`mantissa × 2^exp`), so a
/// value just below a half-paisa boundary rounds down even when its
/// shortest decimal form looks like a tie.
fn round_to_paise(rupees: f64) -> i64 {
    if !rupees.is_finite() || rupees == 0.0 {
        return 0;
    }
    let bits = rupees.abs().to_bits();
    let exp_bits = ((bits >> 52) & 0x7ff) as i32;
    let fraction = (bits & ((1u64 << 52) - 1)) as i128;
    let (mantissa, exp) = if exp_bits == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1i128 << 52), exp_bits - 1075)
    };

    let scaled = mantissa * 100;
    let magnitude = if exp >= 0 {
        scaled << exp.min(64)
    } else if -exp > 120 {
        0
    } else {
        let shift = -exp as u32;
        let whole = scaled >> shift;
        let rest = scaled & ((1i128 << shift) - 1);
        if rest * 2 >= 1i128 << shift {
            whole + 1
        } else {
            whole
        }
    };
    let magnitude = magnitude.min(i64::MAX as i128) as i64;
    if rupees < 0.0 {
        -magnitude
    } else {
        magnitude
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows money as `₹1180.00`.
///
/// ## Note
/// Used in log lines and error messages. Lakh/crore grouping is a display
/// concern of the clients.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.rupees().abs(), self.paise_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
