//! # Error Types
//!
//! Domain errors for Freight Ledger.
//!
//! ## Error Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Error Categories                                   │
//! │                                                                         │
//! │  ValidationError          CoreError                                     │
//! │  ───────────────          ─────────                                     │
//! │  Malformed input:         Precondition failed:                          │
//! │  • field required         • illegal status transition                   │
//! │  • must be positive       • vehicle not AVAILABLE                       │
//! │  • bad GSTIN / phone      • bill PAID / CANCELLED                       │
//! │  • amount too large       • payment exceeds outstanding                 │
//! │                           • cancelling a bill with payments             │
//! │                                                                         │
//! │  Both are rejected BEFORE any write. Nothing is numbered, nothing is   │
//! │  posted to the ledger.                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::billing::BillStatus;
use crate::consignment::ConsignmentStatus;
use crate::money::Money;
use crate::types::VehicleStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Consignment status change not in the transition table.
    ///
    /// ## When This Occurs
    /// - Skipping a step (BOOKED → DELIVERED)
    /// - Moving backwards (DELIVERED → IN_TRANSIT)
    /// - Leaving a terminal state (PAID, CANCELLED)
    #[error("Cannot move consignment from {from} to {to}")]
    InvalidConsignmentTransition {
        from: ConsignmentStatus,
        to: ConsignmentStatus,
    },

    /// Manual bill status change not allowed.
    #[error("Cannot move bill from {from} to {to}")]
    InvalidBillTransition { from: BillStatus, to: BillStatus },

    /// Vehicle cannot be assigned to a new booking.
    #[error("Vehicle {vehicle_number} is {status} and cannot be assigned")]
    VehicleUnavailable {
        vehicle_number: String,
        status: VehicleStatus,
    },

    /// Bill no longer accepts payments.
    #[error("Cannot add payment to bill {bill_number}: bill is {status}")]
    BillNotPayable {
        bill_number: String,
        status: BillStatus,
    },

    /// Bill cannot be cancelled in its current state.
    #[error("Cannot cancel bill {bill_number}: bill is {status}")]
    BillNotCancellable {
        bill_number: String,
        status: BillStatus,
    },

    /// Cancelling would orphan recorded payments.
    #[error("Cannot cancel a bill with payments recorded")]
    BillHasPayments,

    /// Payment larger than what is still owed.
    #[error("Payment exceeds outstanding amount of {outstanding}")]
    PaymentExceedsOutstanding { outstanding: Money },

    /// Payment to a vehicle owner would exceed the agreed vehicle freight.
    #[error("Payment exceeds vehicle freight: {remaining} remaining")]
    VehicleFreightExceeded { remaining: Money },

    /// GST rate outside the permitted slabs.
    #[error("Invalid GST rate: {bps} bps (allowed 0 to 2800)")]
    InvalidGstRate { bps: i64 },

    /// Settings value that should be a counter is not a number.
    #[error("Setting {key} is not a valid counter: '{value}'")]
    InvalidCounter { key: String, value: String },

    /// Amount arithmetic overflowed.
    #[error("Amount overflow")]
    AmountOverflow,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when user input doesn't meet requirements and are raised
/// before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be greater than zero.
    #[error("{field} must be greater than zero")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} cannot be negative")]
    Negative { field: String },

    /// Amount exceeds the sanity ceiling.
    #[error("{field} value seems too large, please verify")]
    TooLarge { field: String },

    /// Invalid format (GSTIN, phone, vehicle number, ...).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Two fields conflict with each other.
    #[error("{0}")]
    Conflict(String),
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
