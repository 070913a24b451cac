//! # freight-db: Persistence Layer for Freight Ledger
//!
//! SQLite storage for bookings, bills, payments and the ledger, with sqlx
//! for async access. Every multi-row business operation runs in a single
//! transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Freight Ledger Data Flow                           │
//! │                                                                         │
//! │  Dashboard action / mobile API (record payment)                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   freight-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────────┐  ┌────────────┐  │   │
//! │  │   │   Database    │    │   Repositories     │  │ Migrations │  │   │
//! │  │   │   (pool.rs)   │    │                    │  │ (embedded) │  │   │
//! │  │   │               │    │ Settings + counters│  │            │  │   │
//! │  │   │ SqlitePool    │◄───│ Consignment        │  │ 001_schema │  │   │
//! │  │   │ busy_timeout  │    │ Bill / Payment     │  │ 002_seed   │  │   │
//! │  │   └───────────────┘    └────────────────────┘  └────────────┘  │   │
//! │  │                              │                                  │   │
//! │  │                  freight-core rules (tax, status tables)       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (FREIGHT_DATABASE_PATH)                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`config`] - Environment configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use freight_db::{Database, FreightConfig};
//!
//! let db = Database::new(FreightConfig::load()?.db_config()).await?;
//!
//! let lr_number = db.settings().next_lr_number().await?;
//! let receipt = db.payments().record_payment(input).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, FreightConfig};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::bill::{BillFilter, BillRepository, NewBill};
pub use repository::consignment::{ConsignmentRepository, ConsignmentUpdate, NewConsignment};
pub use repository::notification::NotificationRepository;
pub use repository::party::{NewParty, PartyRepository, PartyUpdate};
pub use repository::payment::{
    PaymentReceipt, PaymentRepository, RecordPayment, RecordVehiclePayment,
};
pub use repository::settings::SettingsRepository;
pub use repository::vehicle::{NewVehicle, VehicleRepository};
