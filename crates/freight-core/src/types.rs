//! # Domain Types
//!
//! Stored records and value types used throughout Freight Ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  Consignment    │   │      Bill       │   │    Payment      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  consignment_id │◄──│  bill_id (FK)   │       │
//! │  │  lr_number      │   │  bill_number    │   │  amount / tds   │       │
//! │  │  status         │   │  status         │   └────────┬────────┘       │
//! │  └───────┬─────────┘   │  paid_paise     │            │                │
//! │          │             └─────────────────┘            ▼                │
//! │          ▼                                   ┌─────────────────┐       │
//! │  ┌─────────────────┐   ┌─────────────────┐   │  LedgerEntry    │       │
//! │  │ ConsignmentLog  │   │ VehiclePayment  │──►│  RECEIVABLE /   │       │
//! │  │ (append-only)   │   │ ADVANCE/BALANCE │   │  PAYABLE        │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists: `lr_number`, `bill_number`, `vehicle_number`

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

pub use crate::billing::BillStatus;
pub use crate::consignment::ConsignmentStatus;

// =============================================================================
// GST Rate
// =============================================================================

/// GST rate in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01%. Slabs are whole percentages today (5, 12, 18, 28)
/// but the settings form accepts decimals, and bps keeps them exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GstRate(i64);

impl GstRate {
    /// Creates a rate from basis points.
    #[inline]
    pub const fn from_bps(bps: i64) -> Self {
        GstRate(bps)
    }

    /// Creates a rate from a whole percentage (`18` = 18%).
    #[inline]
    pub const fn from_percent(percent: i64) -> Self {
        GstRate(percent * 100)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> i64 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percent(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero-rated supply.
    #[inline]
    pub const fn zero() -> Self {
        GstRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Parses a percentage as typed into the settings form (`"5"`, `"12.5"`,
    /// `"18.00"`). At most two decimals; anything else is `None`.
    ///
    /// ## Example
    /// ```rust
    /// use freight_core::types::GstRate;
    ///
    /// assert_eq!(GstRate::parse_percent("12.5"), Some(GstRate::from_bps(1250)));
    /// assert_eq!(GstRate::parse_percent("abc"), None);
    /// ```
    pub fn parse_percent(input: &str) -> Option<GstRate> {
        let input = input.trim();
        let (whole, frac) = match input.split_once('.') {
            Some((w, f)) => (w, f),
            None => (input, ""),
        };
        if whole.is_empty() || frac.len() > 2 {
            return None;
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let whole: i64 = whole.parse().ok()?;
        let frac_bps: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().ok()? * 10,
            _ => frac.parse().ok()?,
        };
        whole.checked_mul(100)?.checked_add(frac_bps).map(GstRate)
    }
}

impl Default for GstRate {
    fn default() -> Self {
        GstRate::zero()
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Well-known keys of the settings store.
pub mod setting_keys {
    pub const LR_PREFIX: &str = "lr_prefix";
    pub const LR_COUNTER: &str = "lr_counter";
    pub const INVOICE_PREFIX: &str = "invoice_prefix";
    pub const INVOICE_SERIES: &str = "invoice_series";
    pub const INVOICE_COUNTER: &str = "invoice_counter";
    pub const GST_RATE: &str = "gst_rate";
    pub const COMPANY_STATE: &str = "state";

    /// Company profile keys an admin may edit.
    pub const COMPANY_PROFILE: &[&str] = &[
        "company_name",
        "gst_number",
        "pan",
        "address",
        "city",
        "state",
        "pincode",
        "phone",
        "email",
    ];
}

/// One row of the key/value settings store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SettingEntry {
    pub key: String,
    pub value: String,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Party
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartyKind {
    /// Consignor or consignee company.
    Company,
    /// Party invoices are raised against.
    BillingParty,
    /// Booking agent.
    Agent,
    /// Owner of a hired vehicle; receives vehicle payments.
    VehicleOwner,
}

/// A counterparty: consignor, consignee, billed party, agent or vehicle owner.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Party {
    pub id: String,
    pub name: String,
    pub kind: PartyKind,
    pub gstin: Option<String>,
    /// Registered state; drives interstate (IGST) detection.
    pub state: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Vehicle
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleStatus {
    Available,
    OnTrip,
    InRepair,
    Inactive,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Available => "AVAILABLE",
            VehicleStatus::OnTrip => "ON_TRIP",
            VehicleStatus::InRepair => "IN_REPAIR",
            VehicleStatus::Inactive => "INACTIVE",
        }
    }
}

impl std::fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Vehicle {
    pub id: String,
    /// Registration number, normalised (e.g. `MH12AB1234`).
    pub vehicle_number: String,
    pub vehicle_type: String,
    pub owner_id: String,
    pub status: VehicleStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Consignment
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FreightType {
    /// Full truck load.
    Ftl,
    /// Less than truck load.
    Ltl,
    WeightBasis,
    Other,
}

/// Who pays the freight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    /// Paid at booking.
    Paid,
    /// Consignee pays on delivery.
    ToPay,
    /// To be billed.
    Tbb,
}

/// One freight booking.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Consignment {
    pub id: String,
    /// GR/LR number issued by the sequence generator.
    pub lr_number: String,
    #[ts(as = "String")]
    pub booking_date: NaiveDate,
    pub consignor_id: String,
    pub consignee_id: String,
    pub agent_id: Option<String>,
    pub from_city: String,
    pub from_state: String,
    pub to_city: String,
    pub to_state: String,
    /// Cargo description.
    pub description: String,
    pub freight_type: FreightType,
    pub freight_paise: i64,
    pub payment_type: PaymentType,
    pub eway_bill_number: Option<String>,
    pub vehicle_id: Option<String>,
    pub driver_name: Option<String>,
    pub driver_phone: Option<String>,
    /// Freight owed to the vehicle owner.
    pub vehicle_freight_paise: Option<i64>,
    pub advance_paid_paise: i64,
    pub balance_paid_paise: i64,
    pub status: ConsignmentStatus,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Consignment {
    #[inline]
    pub fn freight(&self) -> Money {
        Money::from_paise(self.freight_paise)
    }

    #[inline]
    pub fn vehicle_freight(&self) -> Option<Money> {
        self.vehicle_freight_paise.map(Money::from_paise)
    }

    /// Advance plus balance paid to the vehicle owner so far.
    #[inline]
    pub fn paid_to_vehicle(&self) -> Money {
        Money::from_paise(self.advance_paid_paise + self.balance_paid_paise)
    }
}

/// Append-only record of one status change.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ConsignmentLog {
    pub id: String,
    pub consignment_id: String,
    pub status: ConsignmentStatus,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Bill
// =============================================================================

/// One freight invoice.
///
/// `total_paise == subtotal_paise + cgst_paise + sgst_paise + igst_paise`,
/// fixed at creation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Bill {
    pub id: String,
    pub bill_number: String,
    #[ts(as = "String")]
    pub bill_date: NaiveDate,
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
    pub party_id: String,
    pub consignment_id: Option<String>,
    pub description: Option<String>,
    pub subtotal_paise: i64,
    pub cgst_paise: i64,
    pub sgst_paise: i64,
    pub igst_paise: i64,
    pub total_paise: i64,
    pub gst_rate_bps: i64,
    pub is_interstate: bool,
    /// Gross amount paid so far (TDS included).
    pub paid_paise: i64,
    pub status: BillStatus,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Bill {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_paise(self.total_paise)
    }

    #[inline]
    pub fn paid(&self) -> Money {
        Money::from_paise(self.paid_paise)
    }

    /// Amount still owed on this bill.
    #[inline]
    pub fn outstanding(&self) -> Money {
        self.total() - self.paid()
    }

    #[inline]
    pub fn gst_rate(&self) -> GstRate {
        GstRate::from_bps(self.gst_rate_bps)
    }
}

// =============================================================================
// Payment
// =============================================================================

/// Money received against a bill. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Payment {
    pub id: String,
    #[ts(as = "String")]
    pub payment_date: NaiveDate,
    pub party_id: String,
    pub bill_id: String,
    /// Gross amount settled against the bill.
    pub amount_paise: i64,
    /// Tax deducted at source by the payer.
    pub tds_paise: i64,
    /// "Bank Transfer", "NEFT", "Cheque", "Cash", "UPI", ...
    pub mode: String,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub idempotency_key: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Payment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_paise(self.amount_paise)
    }

    /// Cash actually received (amount minus TDS).
    #[inline]
    pub fn net_received(&self) -> Money {
        Money::from_paise(self.amount_paise - self.tds_paise)
    }
}

// =============================================================================
// Vehicle Payment
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehiclePaymentType {
    Advance,
    Balance,
    /// Detention, loading charges and the like. Not capped by vehicle freight.
    Extra,
}

impl VehiclePaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehiclePaymentType::Advance => "ADVANCE",
            VehiclePaymentType::Balance => "BALANCE",
            VehiclePaymentType::Extra => "EXTRA",
        }
    }

    /// Whether the payment counts against the agreed vehicle freight.
    pub fn is_capped(&self) -> bool {
        !matches!(self, VehiclePaymentType::Extra)
    }
}

impl std::fmt::Display for VehiclePaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Money paid out to a vehicle owner.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct VehiclePayment {
    pub id: String,
    #[ts(as = "String")]
    pub payment_date: NaiveDate,
    pub party_id: String,
    pub consignment_id: Option<String>,
    pub amount_paise: i64,
    pub payment_type: VehiclePaymentType,
    pub mode: String,
    pub reference: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Ledger
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerType {
    /// Money owed to us (freight bills).
    Receivable,
    /// Money we owe (vehicle owners).
    Payable,
}

/// One money movement. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LedgerEntry {
    pub id: String,
    #[ts(as = "String")]
    pub entry_date: NaiveDate,
    pub party_id: String,
    pub entry_type: LedgerType,
    pub debit_paise: i64,
    pub credit_paise: i64,
    pub description: String,
    pub payment_id: Option<String>,
    pub vehicle_payment_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Ledger totals for one party and ledger type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LedgerBalance {
    pub entry_type: LedgerType,
    pub total_debit: Money,
    pub total_credit: Money,
}

impl LedgerBalance {
    /// Debit minus credit.
    pub fn net(&self) -> Money {
        self.total_debit - self.total_credit
    }
}

// =============================================================================
// Dashboard
// =============================================================================

/// Consignment counts and booked freight for the current and last month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ConsignmentActivity {
    /// Everything except CANCELLED.
    pub total: i64,
    /// BOOKED or IN_TRANSIT.
    pub active: i64,
    /// DELIVERED or later, last changed on or after the first of the month.
    pub delivered_this_month: i64,
    /// Freight of non-cancelled bookings dated this month.
    pub freight_this_month: Money,
    pub freight_last_month: Money,
}

/// Bills still waiting for money: GENERATED, SENT or PARTIALLY_PAID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OutstandingBills {
    pub count: i64,
    /// Σ(total − paid) over those bills.
    pub amount: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DashboardSummary {
    pub consignments: ConsignmentActivity,
    pub bills: OutstandingBills,
}

// =============================================================================
// Notification
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    Delivery,
    Bill,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    /// "consignment" or "bill".
    pub entity_type: String,
    pub entity_id: String,
    pub is_read: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
