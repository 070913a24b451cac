//! # Bill Repository
//!
//! Freight bills: creation with GST, manual status changes, cancellation.
//!
//! ## Create Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create(input)                                                          │
//! │                                                                         │
//! │  validate input                                                         │
//! │  BEGIN                                                                  │
//! │  ├── next_bill_number()             ← first write, takes the lock       │
//! │  ├── party → interstate?            (unless supplied)                   │
//! │  ├── gst_rate setting               (unless supplied)                   │
//! │  ├── compute_tax()                                                      │
//! │  ├── INSERT bill (DRAFT)                                                │
//! │  └── linked consignment:                                                │
//! │      ├── DELIVERED → BILLED + log "Bill {n} generated"                  │
//! │      └── notification "Bill Generated"   (best effort)                  │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Payment statuses (PARTIALLY_PAID, PAID) are never set here; see
//! [`PaymentRepository`](super::payment::PaymentRepository).

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use super::notification::{self, NewNotification};
use super::{consignment, new_id, page_bounds, party, settings};
use crate::error::{DbError, DbResult};
use freight_core::billing::check_cancellable;
use freight_core::tax::{self, compute_tax};
use freight_core::validation;
use freight_core::{Bill, BillStatus, GstRate, Money, NotificationKind, OutstandingBills};

const SELECT_BILL: &str = r#"
    SELECT id, bill_number, bill_date, due_date, party_id, consignment_id, description,
           subtotal_paise, cgst_paise, sgst_paise, igst_paise, total_paise, gst_rate_bps,
           is_interstate, paid_paise, status, notes, created_at, updated_at
    FROM bills
"#;

/// Input for creating a bill.
#[derive(Debug, Clone)]
pub struct NewBill {
    /// Party the bill is raised against.
    pub party_id: String,
    pub consignment_id: Option<String>,
    pub bill_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    /// Freight amount before tax.
    pub subtotal: Money,
    /// Defaults to the `gst_rate` setting.
    pub gst_rate: Option<GstRate>,
    /// Defaults to comparing the party's state with the company state.
    pub is_interstate: Option<bool>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

/// Filter for [`BillRepository::list`].
#[derive(Debug, Clone)]
pub struct BillFilter {
    pub status: Option<BillStatus>,
    pub party_id: Option<String>,
    /// 1-based.
    pub page: u32,
    /// Capped at 50.
    pub limit: u32,
}

impl Default for BillFilter {
    fn default() -> Self {
        BillFilter {
            status: None,
            party_id: None,
            page: 1,
            limit: 20,
        }
    }
}

/// Repository for bills.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

impl BillRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    /// Creates a bill in DRAFT.
    ///
    /// ## Errors
    /// - `Domain(Validation)` for a missing party or non-positive amount
    /// - `Domain(InvalidGstRate)` for a rate outside 0..=28%
    /// - `NotFound` if the party or linked consignment does not exist
    pub async fn create(&self, input: NewBill) -> DbResult<Bill> {
        let party_id = validation::validate_required(&input.party_id, "Party")?;
        validation::validate_amount(input.subtotal, "Freight amount")?;
        if let Some(rate) = input.gst_rate {
            tax::validate_gst_rate(rate)?;
        }
        let consignment_id = validation::normalize_optional(input.consignment_id.as_deref());

        let mut tx = self.pool.begin().await?;

        let bill_number = settings::next_bill_number(&mut tx).await?;

        let party = party::fetch_required(&mut tx, &party_id).await?;
        let is_interstate = match input.is_interstate {
            Some(flag) => flag,
            None => {
                let company_state = settings::company_state(&mut tx).await?;
                tax::is_interstate(party.state.as_deref(), &company_state)
            }
        };
        let gst_rate = match input.gst_rate {
            Some(rate) => rate,
            None => settings::default_gst_rate(&mut tx).await?,
        };
        let breakdown = compute_tax(input.subtotal, gst_rate, is_interstate)?;

        let linked = match &consignment_id {
            Some(id) => Some(consignment::fetch_required(&mut tx, id).await?),
            None => None,
        };

        let now = Utc::now();
        let bill = Bill {
            id: new_id(),
            bill_number,
            bill_date: input.bill_date,
            due_date: input.due_date,
            party_id,
            consignment_id,
            description: validation::normalize_optional(input.description.as_deref()),
            subtotal_paise: breakdown.subtotal.paise(),
            cgst_paise: breakdown.cgst.paise(),
            sgst_paise: breakdown.sgst.paise(),
            igst_paise: breakdown.igst.paise(),
            total_paise: breakdown.total.paise(),
            gst_rate_bps: gst_rate.bps(),
            is_interstate,
            paid_paise: 0,
            status: BillStatus::Draft,
            notes: validation::normalize_optional(input.notes.as_deref()),
            created_at: now,
            updated_at: now,
        };

        debug!(id = %bill.id, bill_number = %bill.bill_number, total = %breakdown.total, "Inserting bill");

        sqlx::query(
            r#"
            INSERT INTO bills (
                id, bill_number, bill_date, due_date, party_id, consignment_id, description,
                subtotal_paise, cgst_paise, sgst_paise, igst_paise, total_paise, gst_rate_bps,
                is_interstate, paid_paise, status, notes, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19
            )
            "#,
        )
        .bind(&bill.id)
        .bind(&bill.bill_number)
        .bind(bill.bill_date)
        .bind(bill.due_date)
        .bind(&bill.party_id)
        .bind(&bill.consignment_id)
        .bind(&bill.description)
        .bind(bill.subtotal_paise)
        .bind(bill.cgst_paise)
        .bind(bill.sgst_paise)
        .bind(bill.igst_paise)
        .bind(bill.total_paise)
        .bind(bill.gst_rate_bps)
        .bind(bill.is_interstate)
        .bind(bill.paid_paise)
        .bind(bill.status)
        .bind(&bill.notes)
        .bind(bill.created_at)
        .bind(bill.updated_at)
        .execute(&mut *tx)
        .await?;

        if let Some(linked) = linked {
            match linked.status.on_bill_generated() {
                Some(next) => {
                    let note = format!("Bill {} generated", bill.bill_number);
                    consignment::apply_status(&mut tx, &linked.id, next, Some(&note)).await?;
                }
                None => warn!(
                    lr_number = %linked.lr_number,
                    status = %linked.status,
                    "Consignment not DELIVERED, status left unchanged"
                ),
            }

            notification::notify(
                &mut tx,
                NewNotification {
                    kind: NotificationKind::Bill,
                    title: "Bill Generated",
                    message: format!("Bill {} created for {}", bill.bill_number, linked.lr_number),
                    entity_type: "bill",
                    entity_id: &bill.id,
                },
            )
            .await;
        }

        tx.commit().await?;

        info!(
            id = %bill.id,
            bill_number = %bill.bill_number,
            total = %bill.total(),
            is_interstate,
            "Bill created"
        );
        Ok(bill)
    }

    /// Moves a bill along DRAFT → GENERATED → SENT.
    pub async fn update_status(&self, id: &str, to: BillStatus) -> DbResult<Bill> {
        let mut tx = self.pool.begin().await?;

        touch(&mut tx, id).await?;
        let current = fetch_required(&mut tx, id).await?;
        current.status.transition(to)?;
        set_status(&mut tx, id, to).await?;
        let updated = fetch_required(&mut tx, id).await?;

        tx.commit().await?;

        info!(%id, bill_number = %updated.bill_number, from = %current.status, %to, "Bill status updated");
        Ok(updated)
    }

    /// Cancels a bill that has no payments.
    ///
    /// ## Errors
    /// - `Domain(BillHasPayments)` if any amount has been paid
    /// - `Domain(BillNotCancellable)` if the bill is PAID or already CANCELLED
    pub async fn cancel(&self, id: &str) -> DbResult<Bill> {
        let mut tx = self.pool.begin().await?;

        touch(&mut tx, id).await?;
        let current = fetch_required(&mut tx, id).await?;
        check_cancellable(&current.bill_number, current.status, current.paid())?;
        set_status(&mut tx, id, BillStatus::Cancelled).await?;
        let updated = fetch_required(&mut tx, id).await?;

        tx.commit().await?;

        info!(%id, bill_number = %updated.bill_number, "Bill cancelled");
        Ok(updated)
    }

    /// Gets a bill by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Bill>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    /// Gets a bill by bill number.
    pub async fn get_by_number(&self, bill_number: &str) -> DbResult<Option<Bill>> {
        let sql = format!("{SELECT_BILL} WHERE bill_number = ?1");
        let bill = sqlx::query_as::<_, Bill>(&sql)
            .bind(bill_number.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(bill)
    }

    /// Bills matching the filter, newest first.
    pub async fn list(&self, filter: &BillFilter) -> DbResult<Vec<Bill>> {
        let (limit, offset) = page_bounds(filter.page, filter.limit);
        let sql = format!(
            "{SELECT_BILL} WHERE (?1 IS NULL OR status = ?1) AND (?2 IS NULL OR party_id = ?2) \
             ORDER BY bill_date DESC, created_at DESC LIMIT ?3 OFFSET ?4"
        );
        let bills = sqlx::query_as::<_, Bill>(&sql)
            .bind(filter.status)
            .bind(filter.party_id.as_deref())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(bills)
    }

    /// Bills linked to a consignment.
    pub async fn for_consignment(&self, consignment_id: &str) -> DbResult<Vec<Bill>> {
        let sql = format!("{SELECT_BILL} WHERE consignment_id = ?1 ORDER BY created_at");
        let bills = sqlx::query_as::<_, Bill>(&sql)
            .bind(consignment_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(bills)
    }

    /// Count and unpaid balance of bills still waiting for money.
    ///
    /// DRAFT bills have not gone to the party yet and are left out.
    pub async fn outstanding(&self) -> DbResult<OutstandingBills> {
        let (count, amount) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT COUNT(*), COALESCE(SUM(total_paise - paid_paise), 0)
            FROM bills
            WHERE status IN ('GENERATED', 'SENT', 'PARTIALLY_PAID')
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(OutstandingBills {
            count,
            amount: Money::from_paise(amount),
        })
    }
}

// =============================================================================
// Connection-level helpers
// =============================================================================

pub(crate) async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Bill>> {
    let sql = format!("{SELECT_BILL} WHERE id = ?1");
    let bill = sqlx::query_as::<_, Bill>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(bill)
}

pub(crate) async fn fetch_required(conn: &mut SqliteConnection, id: &str) -> DbResult<Bill> {
    fetch(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("Bill", id))
}

/// Takes the write lock on a bill row before it is read.
///
/// Two payments against one bill serialise here, so the second sees the
/// first one's `paid_paise`.
pub(crate) async fn touch(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    let result = sqlx::query("UPDATE bills SET updated_at = updated_at WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Bill", id));
    }
    Ok(())
}

async fn set_status(conn: &mut SqliteConnection, id: &str, status: BillStatus) -> DbResult<()> {
    debug!(%id, %status, "Setting bill status");
    sqlx::query("UPDATE bills SET status = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
