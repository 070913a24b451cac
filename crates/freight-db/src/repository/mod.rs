//! # Repository Module
//!
//! Database repository implementations for Freight Ledger.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One Operation, One Transaction                       │
//! │                                                                         │
//! │  db.bills().create(input)                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate input (freight-core)        ← nothing written yet             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │  ├── first statement writes           ← write lock taken here           │
//! │  ├── read current state                                                 │
//! │  ├── apply freight-core rule          ← Err = ROLLBACK, nothing kept    │
//! │  ├── insert / update rows                                               │
//! │  └── notification (best effort)                                         │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Functions taking `&mut SqliteConnection` run on whatever connection
//! they are given, so they compose inside another repository's transaction.
//!
//! ## Available Repositories
//!
//! - [`SettingsRepository`](settings::SettingsRepository) - Settings and sequence counters
//! - [`PartyRepository`](party::PartyRepository) - Parties
//! - [`VehicleRepository`](vehicle::VehicleRepository) - Vehicles
//! - [`ConsignmentRepository`](consignment::ConsignmentRepository) - Booking and status changes
//! - [`BillRepository`](bill::BillRepository) - Bills
//! - [`PaymentRepository`](payment::PaymentRepository) - Payments, vehicle payments, ledger
//! - [`NotificationRepository`](notification::NotificationRepository) - In-app notifications

pub mod bill;
pub mod consignment;
pub mod notification;
pub mod party;
pub mod payment;
pub mod settings;
pub mod vehicle;

use uuid::Uuid;

/// Maximum page size for list queries.
pub const MAX_PAGE_SIZE: u32 = 50;

/// Generates a new record id.
pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// `(limit, offset)` for a 1-based page, with the limit capped.
pub(crate) fn page_bounds(page: u32, limit: u32) -> (i64, i64) {
    let limit = limit.clamp(1, MAX_PAGE_SIZE) as i64;
    let page = page.max(1) as i64;
    (limit, (page - 1) * limit)
}
