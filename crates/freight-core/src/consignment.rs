//! # Consignment Lifecycle
//!
//! The status machine a booking moves through.
//!
//! ## Transition Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  BOOKED ──► IN_TRANSIT ──► DELIVERED ──► BILLED ──► PARTIALLY_PAID      │
//! │    │            │              │            │              │            │
//! │    │            │              │            └──────┬───────┘            │
//! │    │            │              │                   ▼                    │
//! │    └────────────┴──────────────┴──► CANCELLED     PAID                  │
//! │                                                                         │
//! │  Terminal: CANCELLED, PAID                                              │
//! │                                                                         │
//! │  Side effects of entering a state:                                      │
//! │  • DELIVERED → delivery notification, vehicle back to AVAILABLE         │
//! │                                                                         │
//! │  Automatic (cascaded) moves:                                            │
//! │  • bill created   : DELIVERED → BILLED only                             │
//! │  • bill fully paid: anything not PAID/CANCELLED → PAID                  │
//! │  • bill part paid : BILLED → PARTIALLY_PAID only                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `status` column is authoritative. The log written beside each move is
//! never read back to rebuild state.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Consignment Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsignmentStatus {
    Booked,
    InTransit,
    Delivered,
    Billed,
    PartiallyPaid,
    Paid,
    Cancelled,
}

impl ConsignmentStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [ConsignmentStatus; 7] = [
        ConsignmentStatus::Booked,
        ConsignmentStatus::InTransit,
        ConsignmentStatus::Delivered,
        ConsignmentStatus::Billed,
        ConsignmentStatus::PartiallyPaid,
        ConsignmentStatus::Paid,
        ConsignmentStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConsignmentStatus::Booked => "BOOKED",
            ConsignmentStatus::InTransit => "IN_TRANSIT",
            ConsignmentStatus::Delivered => "DELIVERED",
            ConsignmentStatus::Billed => "BILLED",
            ConsignmentStatus::PartiallyPaid => "PARTIALLY_PAID",
            ConsignmentStatus::Paid => "PAID",
            ConsignmentStatus::Cancelled => "CANCELLED",
        }
    }

    /// Statuses a user may move a consignment to from this one.
    pub fn next_statuses(&self) -> &'static [ConsignmentStatus] {
        use ConsignmentStatus::*;
        match self {
            Booked => &[InTransit, Cancelled],
            InTransit => &[Delivered, Cancelled],
            Delivered => &[Billed, Cancelled],
            Billed => &[PartiallyPaid, Paid],
            PartiallyPaid => &[Paid],
            Paid | Cancelled => &[],
        }
    }

    #[inline]
    pub fn can_transition_to(&self, to: ConsignmentStatus) -> bool {
        self.next_statuses().contains(&to)
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.next_statuses().is_empty()
    }

    /// Validates a manual status change.
    ///
    /// ## Example
    /// ```rust
    /// use freight_core::consignment::ConsignmentStatus;
    ///
    /// let next = ConsignmentStatus::Booked.transition(ConsignmentStatus::InTransit).unwrap();
    /// assert_eq!(next, ConsignmentStatus::InTransit);
    /// assert!(ConsignmentStatus::Booked.transition(ConsignmentStatus::Delivered).is_err());
    /// ```
    pub fn transition(self, to: ConsignmentStatus) -> CoreResult<ConsignmentStatus> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(CoreError::InvalidConsignmentTransition { from: self, to })
        }
    }

    /// Status after a bill is raised against this consignment, if it moves.
    ///
    /// Only a DELIVERED consignment becomes BILLED; a bill raised in any
    /// other state leaves the consignment where it is.
    pub fn on_bill_generated(self) -> Option<ConsignmentStatus> {
        match self {
            ConsignmentStatus::Delivered => Some(ConsignmentStatus::Billed),
            _ => None,
        }
    }

    /// Status after a payment lands on the linked bill, if it moves.
    ///
    /// A full payment closes anything still open. A partial payment only
    /// moves a consignment that is exactly BILLED; every other state is
    /// left untouched.
    pub fn on_bill_payment(self, fully_paid: bool) -> Option<ConsignmentStatus> {
        use ConsignmentStatus::*;
        match (self, fully_paid) {
            (Paid | Cancelled, true) => None,
            (_, true) => Some(Paid),
            (Billed, false) => Some(PartiallyPaid),
            (_, false) => None,
        }
    }

    /// Side effects of entering this status.
    pub fn entry_effects(&self) -> TransitionEffects {
        match self {
            ConsignmentStatus::Delivered => TransitionEffects {
                release_vehicle: true,
                notify_delivery: true,
            },
            _ => TransitionEffects::default(),
        }
    }
}

impl fmt::Display for ConsignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for ConsignmentStatus {
    fn default() -> Self {
        ConsignmentStatus::Booked
    }
}

/// What the persistence layer must do alongside a status change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransitionEffects {
    /// Put the assigned vehicle back to AVAILABLE.
    pub release_vehicle: bool,
    /// Emit a "Consignment Delivered" notification.
    pub notify_delivery: bool,
}

/// Log note written when a consignment is created.
pub const BOOKED_NOTE: &str = "Consignment booked";

/// Log note written when a payment closes the linked bill.
pub const FULLY_PAID_NOTE: &str = "Bill fully paid";

// =============================================================================
// Unit Tests
// =============================================================================
