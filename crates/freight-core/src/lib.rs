//! # freight-core: Pure Business Logic for Freight Ledger
//!
//! Numbering formats, GST computation, and the consignment and bill status
//! machines, as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Freight Ledger Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Booking / Billing / Payment handlers (callers)         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ freight-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌───────────┐ ┌─────────┐ ┌───────┐  │   │
//! │  │   │  money  │ │   tax   │ │ numbering │ │ consign │ │billing│  │   │
//! │  │   │  Money  │ │ CGST/   │ │ GR0001    │ │ BOOKED→ │ │ DRAFT→│  │   │
//! │  │   │  paise  │ │ SGST/   │ │ RR/25-26/ │ │  ...    │ │  PAID │  │   │
//! │  │   │         │ │ IGST    │ │   0001    │ │         │ │       │  │   │
//! │  │   └─────────┘ └─────────┘ └───────────┘ └─────────┘ └───────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                freight-db (transactions, SQLite)                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Stored records (Consignment, Bill, Payment, LedgerEntry, ...)
//! - [`money`] - Money type in integer paise
//! - [`tax`] - GST split (CGST/SGST vs IGST)
//! - [`numbering`] - GR and bill number formats
//! - [`consignment`] - Consignment status machine
//! - [`billing`] - Bill status machine and payment application
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use freight_core::money::Money;
//! use freight_core::tax::compute_tax;
//! use freight_core::types::GstRate;
//!
//! let split = compute_tax(Money::from_rupees(1000), GstRate::from_percent(18), false).unwrap();
//! assert_eq!(split.cgst.paise(), 9000);
//! assert_eq!(split.sgst.paise(), 9000);
//! assert_eq!(split.total.paise(), 118_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod billing;
pub mod consignment;
pub mod error;
pub mod money;
pub mod numbering;
pub mod tax;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Upper bound for any single amount entered by a user (₹5,00,00,000).
///
/// ## Business Reason
/// Catches a misplaced zero or two before it reaches a bill or the ledger.
pub const MAX_AMOUNT_PAISE: i64 = 50_000_000 * 100;

/// Highest GST slab in basis points (28%).
pub const MAX_GST_RATE_BPS: i64 = 2800;

/// State assumed for the company when the `state` setting is blank.
pub const DEFAULT_COMPANY_STATE: &str = "Maharashtra";

/// Overpayment tolerance: one paisa.
pub const PAYMENT_TOLERANCE_PAISE: i64 = 1;
