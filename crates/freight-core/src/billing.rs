//! # Billing Lifecycle
//!
//! Bill status machine and payment application.
//!
//! ## Bill States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   manual:    DRAFT ──► GENERATED ──► SENT                               │
//! │                │           │           │                                │
//! │                └───────────┴───────────┴──► CANCELLED  (paid == 0)      │
//! │                                                                         │
//! │   payments:  any of DRAFT / GENERATED / SENT / PARTIALLY_PAID           │
//! │                 │                                                       │
//! │                 ├── paid + amount >= total ──► PAID                     │
//! │                 └── otherwise ──────────────► PARTIALLY_PAID            │
//! │                                                                         │
//! │   PAID and CANCELLED accept nothing further.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Gross vs Net
//! `Bill.paid` grows by the gross payment amount. The ledger is credited with
//! the cash that actually arrived, `amount - tds`. The two figures diverge
//! whenever TDS is withheld.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::validation::{validate_amount, validate_non_negative};
use crate::PAYMENT_TOLERANCE_PAISE;

// =============================================================================
// Bill Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillStatus {
    Draft,
    Generated,
    Sent,
    PartiallyPaid,
    Paid,
    Cancelled,
}

impl BillStatus {
    pub const ALL: [BillStatus; 6] = [
        BillStatus::Draft,
        BillStatus::Generated,
        BillStatus::Sent,
        BillStatus::PartiallyPaid,
        BillStatus::Paid,
        BillStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Draft => "DRAFT",
            BillStatus::Generated => "GENERATED",
            BillStatus::Sent => "SENT",
            BillStatus::PartiallyPaid => "PARTIALLY_PAID",
            BillStatus::Paid => "PAID",
            BillStatus::Cancelled => "CANCELLED",
        }
    }

    /// Manual next step, if any. Payment states are never chosen by hand.
    pub fn next_manual(&self) -> Option<BillStatus> {
        match self {
            BillStatus::Draft => Some(BillStatus::Generated),
            BillStatus::Generated => Some(BillStatus::Sent),
            _ => None,
        }
    }

    /// Validates a manual status change (`DRAFT → GENERATED → SENT`).
    pub fn transition(self, to: BillStatus) -> CoreResult<BillStatus> {
        if self.next_manual() == Some(to) {
            Ok(to)
        } else {
            Err(CoreError::InvalidBillTransition { from: self, to })
        }
    }

    #[inline]
    pub fn is_cancellable(&self) -> bool {
        matches!(self, BillStatus::Draft | BillStatus::Generated | BillStatus::Sent)
    }

    #[inline]
    pub fn accepts_payments(&self) -> bool {
        !matches!(self, BillStatus::Paid | BillStatus::Cancelled)
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for BillStatus {
    fn default() -> Self {
        BillStatus::Draft
    }
}

// =============================================================================
// Cancellation
// =============================================================================

/// Checks that a bill may be cancelled.
///
/// Any recorded payment blocks cancellation, whatever the status says.
pub fn check_cancellable(bill_number: &str, status: BillStatus, paid: Money) -> CoreResult<()> {
    if !paid.is_zero() {
        return Err(CoreError::BillHasPayments);
    }
    if !status.is_cancellable() {
        return Err(CoreError::BillNotCancellable {
            bill_number: bill_number.to_string(),
            status,
        });
    }
    Ok(())
}

// =============================================================================
// Payment Application
// =============================================================================

/// Validated gross amount and TDS of one incoming payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentAmounts {
    pub amount: Money,
    pub tds: Money,
}

impl PaymentAmounts {
    /// Validates `amount > 0`, `tds >= 0`, `tds < amount`.
    ///
    /// ## Example
    /// ```rust
    /// use freight_core::billing::PaymentAmounts;
    /// use freight_core::money::Money;
    ///
    /// assert!(PaymentAmounts::new(Money::from_rupees(1000), Money::from_rupees(20)).is_ok());
    /// assert!(PaymentAmounts::new(Money::from_rupees(1000), Money::from_rupees(1000)).is_err());
    /// ```
    pub fn new(amount: Money, tds: Money) -> Result<Self, ValidationError> {
        validate_amount(amount, "Payment amount")?;
        validate_non_negative(tds, "TDS amount")?;
        if tds >= amount {
            return Err(ValidationError::Conflict(
                "TDS cannot exceed payment amount".to_string(),
            ));
        }
        Ok(PaymentAmounts { amount, tds })
    }

    /// Cash received, which is what the ledger is credited with.
    #[inline]
    pub fn net(&self) -> Money {
        self.amount - self.tds
    }
}

/// Outcome of applying a payment to a bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentApplication {
    pub new_paid: Money,
    pub new_status: BillStatus,
    pub fully_paid: bool,
}

/// Applies a gross payment to a bill's running total.
///
/// ## Rules
/// - PAID and CANCELLED bills reject payments
/// - `paid + amount` may exceed `total` by at most one paisa
/// - the new status is PAID once `paid + amount >= total`, else
///   PARTIALLY_PAID, whatever the previous status (a DRAFT bill can go
///   straight to PAID)
///
/// ## Example
/// ```rust
/// use freight_core::billing::{apply_payment, BillStatus};
/// use freight_core::money::Money;
///
/// let applied = apply_payment(
///     "RR/2025-26/0001",
///     BillStatus::Sent,
///     Money::from_rupees(1180),
///     Money::zero(),
///     Money::from_rupees(500),
/// ).unwrap();
/// assert_eq!(applied.new_status, BillStatus::PartiallyPaid);
/// assert_eq!(applied.new_paid, Money::from_rupees(500));
/// ```
pub fn apply_payment(
    bill_number: &str,
    status: BillStatus,
    total: Money,
    paid: Money,
    amount: Money,
) -> CoreResult<PaymentApplication> {
    if !status.accepts_payments() {
        return Err(CoreError::BillNotPayable {
            bill_number: bill_number.to_string(),
            status,
        });
    }

    let new_paid = paid.checked_add(amount).ok_or(CoreError::AmountOverflow)?;
    if new_paid.paise() > total.paise() + PAYMENT_TOLERANCE_PAISE {
        return Err(CoreError::PaymentExceedsOutstanding {
            outstanding: total - paid,
        });
    }

    let fully_paid = new_paid >= total;
    let new_status = if fully_paid {
        BillStatus::Paid
    } else {
        BillStatus::PartiallyPaid
    };

    Ok(PaymentApplication {
        new_paid,
        new_status,
        fully_paid,
    })
}

/// Consignment log note for a partial payment.
pub fn partial_payment_note(amount: Money) -> String {
    format!("Partial payment {}", amount)
}

// =============================================================================
// Unit Tests
// =============================================================================
