//! # Payment Repository
//!
//! Money in (payments against bills) and money out (vehicle payments), and
//! the ledger both post to.
//!
//! ## Payment Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  record_payment(input)                                                  │
//! │                                                                         │
//! │  validate amount / TDS                                                  │
//! │  BEGIN                                                                  │
//! │  ├── touch bill row                 ← first write, takes the lock       │
//! │  ├── idempotency key seen?          → ROLLBACK, return original         │
//! │  ├── apply_payment()                ← PAID / CANCELLED / overpayment    │
//! │  ├── UPDATE bill paid + status                                          │
//! │  ├── INSERT payment                                                     │
//! │  ├── INSERT ledger RECEIVABLE  (credit = amount - tds)                  │
//! │  └── linked consignment → PARTIALLY_PAID / PAID + log                   │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every caller goes through the same checks: there is no second payment
//! path with looser validation.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::{bill, consignment, new_id, party};
use crate::error::DbResult;
use freight_core::billing::{apply_payment, partial_payment_note, PaymentAmounts};
use freight_core::consignment::FULLY_PAID_NOTE;
use freight_core::validation;
use freight_core::{
    Bill, CoreError, LedgerBalance, LedgerEntry, LedgerType, Money, Payment, ValidationError,
    VehiclePayment, VehiclePaymentType,
};

/// Input for recording a payment against a bill.
#[derive(Debug, Clone)]
pub struct RecordPayment {
    pub bill_id: String,
    pub payment_date: NaiveDate,
    /// Gross amount settled, TDS included.
    pub amount: Money,
    pub tds: Money,
    /// "NEFT", "Cheque", "Cash", ...
    pub mode: String,
    pub reference: Option<String>,
    pub notes: Option<String>,
    /// Client-generated key; a retry with the same key records nothing new.
    pub idempotency_key: Option<String>,
}

/// Result of [`PaymentRepository::record_payment`].
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub payment: Payment,
    /// The bill after the payment.
    pub bill: Bill,
    /// True when the idempotency key matched an earlier payment.
    pub replayed: bool,
}

/// Input for paying a vehicle owner.
#[derive(Debug, Clone)]
pub struct RecordVehiclePayment {
    /// The vehicle owner.
    pub party_id: String,
    pub consignment_id: Option<String>,
    pub payment_date: NaiveDate,
    pub amount: Money,
    pub payment_type: VehiclePaymentType,
    pub mode: String,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

/// Repository for payments and the ledger.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Records a payment against a bill.
    ///
    /// ## Errors
    /// - `Domain(Validation)` for amount <= 0, negative TDS or TDS >= amount
    /// - `Domain(BillNotPayable)` if the bill is PAID or CANCELLED
    /// - `Domain(PaymentExceedsOutstanding)` if the payment overshoots the
    ///   total by more than one paisa
    /// - `NotFound` if the bill does not exist
    /// - `Conflict` if the bill row stayed locked past the busy timeout
    pub async fn record_payment(&self, input: RecordPayment) -> DbResult<PaymentReceipt> {
        let amounts = PaymentAmounts::new(input.amount, input.tds)?;
        let bill_id = validation::validate_required(&input.bill_id, "Bill")?;
        let mode = validation::validate_required(&input.mode, "Payment mode")?;
        validation::validate_max_len(&mode, "Payment mode", 50)?;
        let idempotency_key = validation::normalize_optional(input.idempotency_key.as_deref());

        let mut tx = self.pool.begin().await?;

        bill::touch(&mut tx, &bill_id).await?;

        if let Some(key) = &idempotency_key {
            if let Some(existing) = fetch_by_idempotency_key(&mut tx, key).await? {
                if existing.bill_id != bill_id {
                    return Err(ValidationError::Conflict(
                        "Idempotency key was already used for another bill".to_string(),
                    )
                    .into());
                }
                let current = bill::fetch_required(&mut tx, &bill_id).await?;
                tx.rollback().await?;
                info!(payment_id = %existing.id, %key, "Payment replayed from idempotency key");
                return Ok(PaymentReceipt {
                    payment: existing,
                    bill: current,
                    replayed: true,
                });
            }
        }

        let current = bill::fetch_required(&mut tx, &bill_id).await?;
        let applied = apply_payment(
            &current.bill_number,
            current.status,
            current.total(),
            current.paid(),
            amounts.amount,
        )?;

        let now = Utc::now();
        sqlx::query("UPDATE bills SET paid_paise = ?2, status = ?3, updated_at = ?4 WHERE id = ?1")
            .bind(&bill_id)
            .bind(applied.new_paid.paise())
            .bind(applied.new_status)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        let payment = Payment {
            id: new_id(),
            payment_date: input.payment_date,
            party_id: current.party_id.clone(),
            bill_id: bill_id.clone(),
            amount_paise: amounts.amount.paise(),
            tds_paise: amounts.tds.paise(),
            mode,
            reference: validation::normalize_optional(input.reference.as_deref()),
            notes: validation::normalize_optional(input.notes.as_deref()),
            idempotency_key,
            created_at: now,
        };
        insert_payment(&mut tx, &payment).await?;

        insert_ledger_entry(
            &mut tx,
            &LedgerEntry {
                id: new_id(),
                entry_date: payment.payment_date,
                party_id: payment.party_id.clone(),
                entry_type: LedgerType::Receivable,
                debit_paise: 0,
                credit_paise: amounts.net().paise(),
                description: format!("Payment received for bill {}", current.bill_number),
                payment_id: Some(payment.id.clone()),
                vehicle_payment_id: None,
                created_at: now,
            },
        )
        .await?;

        if let Some(consignment_id) = &current.consignment_id {
            let linked = consignment::fetch_required(&mut tx, consignment_id).await?;
            match linked.status.on_bill_payment(applied.fully_paid) {
                Some(next) => {
                    let note = if applied.fully_paid {
                        FULLY_PAID_NOTE.to_string()
                    } else {
                        partial_payment_note(amounts.amount)
                    };
                    consignment::apply_status(&mut tx, consignment_id, next, Some(&note)).await?;
                }
                None => debug!(
                    lr_number = %linked.lr_number,
                    status = %linked.status,
                    "Consignment status unchanged by payment"
                ),
            }
        }

        tx.commit().await?;

        info!(
            payment_id = %payment.id,
            bill_number = %current.bill_number,
            amount = %amounts.amount,
            tds = %amounts.tds,
            status = %applied.new_status,
            "Payment recorded"
        );

        let bill = Bill {
            paid_paise: applied.new_paid.paise(),
            status: applied.new_status,
            updated_at: now,
            ..current
        };
        Ok(PaymentReceipt {
            payment,
            bill,
            replayed: false,
        })
    }

    /// Records a payment to a vehicle owner.
    ///
    /// ADVANCE and BALANCE payments may not take the total paid to the
    /// vehicle past the agreed vehicle freight. EXTRA payments are not
    /// capped; they add to the balance paid.
    pub async fn record_vehicle_payment(&self, input: RecordVehiclePayment) -> DbResult<VehiclePayment> {
        let party_id = validation::validate_required(&input.party_id, "Vehicle owner")?;
        validation::validate_amount(input.amount, "Payment amount")?;
        let mode = validation::validate_required(&input.mode, "Payment mode")?;
        let consignment_id = validation::normalize_optional(input.consignment_id.as_deref());

        let mut tx = self.pool.begin().await?;

        // Open with a write on both paths so the transaction holds the
        // write lock before it reads anything.
        let linked = match &consignment_id {
            Some(id) => {
                consignment::touch(&mut tx, id).await?;
                Some(consignment::fetch_required(&mut tx, id).await?)
            }
            None => {
                party::touch(&mut tx, &party_id).await?;
                None
            }
        };
        party::fetch_required(&mut tx, &party_id).await?;

        if let Some(linked) = &linked {
            if let (true, Some(agreed)) = (input.payment_type.is_capped(), linked.vehicle_freight()) {
                let paid = linked.paid_to_vehicle();
                if paid + input.amount > agreed {
                    return Err(CoreError::VehicleFreightExceeded {
                        remaining: agreed - paid,
                    }
                    .into());
                }
            }
        }

        let now = Utc::now();
        let payment = VehiclePayment {
            id: new_id(),
            payment_date: input.payment_date,
            party_id,
            consignment_id,
            amount_paise: input.amount.paise(),
            payment_type: input.payment_type,
            mode,
            reference: validation::normalize_optional(input.reference.as_deref()),
            notes: validation::normalize_optional(input.notes.as_deref()),
            created_at: now,
        };

        debug!(id = %payment.id, party_id = %payment.party_id, "Inserting vehicle payment");

        sqlx::query(
            r#"
            INSERT INTO vehicle_payments (
                id, payment_date, party_id, consignment_id, amount_paise,
                payment_type, mode, reference, notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&payment.id)
        .bind(payment.payment_date)
        .bind(&payment.party_id)
        .bind(&payment.consignment_id)
        .bind(payment.amount_paise)
        .bind(payment.payment_type)
        .bind(&payment.mode)
        .bind(&payment.reference)
        .bind(&payment.notes)
        .bind(payment.created_at)
        .execute(&mut *tx)
        .await?;

        let description = match &linked {
            Some(c) => format!(
                "Vehicle payment ({}) to owner for {}",
                payment.payment_type, c.lr_number
            ),
            None => format!("Vehicle payment ({}) to owner", payment.payment_type),
        };
        insert_ledger_entry(
            &mut tx,
            &LedgerEntry {
                id: new_id(),
                entry_date: payment.payment_date,
                party_id: payment.party_id.clone(),
                entry_type: LedgerType::Payable,
                debit_paise: payment.amount_paise,
                credit_paise: 0,
                description,
                payment_id: None,
                vehicle_payment_id: Some(payment.id.clone()),
                created_at: now,
            },
        )
        .await?;

        if let Some(id) = &payment.consignment_id {
            let column = match payment.payment_type {
                VehiclePaymentType::Advance => "advance_paid_paise",
                VehiclePaymentType::Balance | VehiclePaymentType::Extra => "balance_paid_paise",
            };
            let sql = format!(
                "UPDATE consignments SET {column} = {column} + ?2, updated_at = ?3 WHERE id = ?1"
            );
            sqlx::query(&sql)
                .bind(id)
                .bind(payment.amount_paise)
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        info!(
            id = %payment.id,
            amount = %input.amount,
            payment_type = %payment.payment_type,
            "Vehicle payment recorded"
        );
        Ok(payment)
    }

    /// Payments recorded against a bill, oldest first.
    pub async fn payments_for_bill(&self, bill_id: &str) -> DbResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, payment_date, party_id, bill_id, amount_paise, tds_paise, mode,
                   reference, notes, idempotency_key, created_at
            FROM payments
            WHERE bill_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(bill_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(payments)
    }

    /// Vehicle payments made against a consignment.
    pub async fn vehicle_payments_for_consignment(
        &self,
        consignment_id: &str,
    ) -> DbResult<Vec<VehiclePayment>> {
        let payments = sqlx::query_as::<_, VehiclePayment>(
            r#"
            SELECT id, payment_date, party_id, consignment_id, amount_paise, payment_type,
                   mode, reference, notes, created_at
            FROM vehicle_payments
            WHERE consignment_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(consignment_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(payments)
    }

    /// A party's ledger entries, optionally one ledger type only.
    pub async fn ledger_entries(
        &self,
        party_id: &str,
        entry_type: Option<LedgerType>,
    ) -> DbResult<Vec<LedgerEntry>> {
        let entries = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT id, entry_date, party_id, entry_type, debit_paise, credit_paise,
                   description, payment_id, vehicle_payment_id, created_at
            FROM ledger_entries
            WHERE party_id = ?1 AND (?2 IS NULL OR entry_type = ?2)
            ORDER BY entry_date, created_at, rowid
            "#,
        )
        .bind(party_id)
        .bind(entry_type)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    /// Debit and credit totals for a party, one row per ledger type used.
    pub async fn ledger_balance(&self, party_id: &str) -> DbResult<Vec<LedgerBalance>> {
        let rows = sqlx::query_as::<_, (LedgerType, i64, i64)>(
            r#"
            SELECT entry_type,
                   COALESCE(SUM(debit_paise), 0),
                   COALESCE(SUM(credit_paise), 0)
            FROM ledger_entries
            WHERE party_id = ?1
            GROUP BY entry_type
            ORDER BY entry_type
            "#,
        )
        .bind(party_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(entry_type, debit, credit)| LedgerBalance {
                entry_type,
                total_debit: Money::from_paise(debit),
                total_credit: Money::from_paise(credit),
            })
            .collect())
    }
}

// =============================================================================
// Connection-level helpers
// =============================================================================

async fn fetch_by_idempotency_key(
    conn: &mut SqliteConnection,
    key: &str,
) -> DbResult<Option<Payment>> {
    let payment = sqlx::query_as::<_, Payment>(
        r#"
        SELECT id, payment_date, party_id, bill_id, amount_paise, tds_paise, mode,
               reference, notes, idempotency_key, created_at
        FROM payments
        WHERE idempotency_key = ?1
        "#,
    )
    .bind(key)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(payment)
}

async fn insert_payment(conn: &mut SqliteConnection, payment: &Payment) -> DbResult<()> {
    debug!(id = %payment.id, bill_id = %payment.bill_id, amount = %payment.amount(), "Inserting payment");
    sqlx::query(
        r#"
        INSERT INTO payments (
            id, payment_date, party_id, bill_id, amount_paise, tds_paise, mode,
            reference, notes, idempotency_key, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&payment.id)
    .bind(payment.payment_date)
    .bind(&payment.party_id)
    .bind(&payment.bill_id)
    .bind(payment.amount_paise)
    .bind(payment.tds_paise)
    .bind(&payment.mode)
    .bind(&payment.reference)
    .bind(&payment.notes)
    .bind(&payment.idempotency_key)
    .bind(payment.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_ledger_entry(conn: &mut SqliteConnection, entry: &LedgerEntry) -> DbResult<()> {
    debug!(id = %entry.id, party_id = %entry.party_id, entry_type = ?entry.entry_type, "Posting ledger entry");
    sqlx::query(
        r#"
        INSERT INTO ledger_entries (
            id, entry_date, party_id, entry_type, debit_paise, credit_paise,
            description, payment_id, vehicle_payment_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&entry.id)
    .bind(entry.entry_date)
    .bind(&entry.party_id)
    .bind(entry.entry_type)
    .bind(entry.debit_paise)
    .bind(entry.credit_paise)
    .bind(&entry.description)
    .bind(&entry.payment_id)
    .bind(&entry.vehicle_payment_id)
    .bind(entry.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::bill::NewBill;
    use crate::repository::test_support::{booking, date, party, setup, vehicle};
    use crate::Database;
    use freight_core::{BillStatus, ConsignmentStatus, GstRate, PartyKind};

    /// A SENT bill of ₹1180 (₹1000 + 18% intrastate) for a billing party.
    async fn sent_bill(db: &Database) -> Bill {
        let billed = party(db, "Bharat Steel", PartyKind::BillingParty, Some("Maharashtra")).await;
        let bill = db
            .bills()
            .create(NewBill {
                party_id: billed.id,
                consignment_id: None,
                bill_date: date(2025, 6, 10),
                due_date: None,
                subtotal: Money::from_rupees(1000),
                gst_rate: Some(GstRate::from_percent(18)),
                is_interstate: Some(false),
                description: None,
                notes: None,
            })
            .await
            .unwrap();
        db.bills().update_status(&bill.id, BillStatus::Generated).await.unwrap();
        db.bills().update_status(&bill.id, BillStatus::Sent).await.unwrap()
    }

    fn pay(bill_id: &str, rupees: i64) -> RecordPayment {
        RecordPayment {
            bill_id: bill_id.to_string(),
            payment_date: date(2025, 6, 20),
            amount: Money::from_rupees(rupees),
            tds: Money::zero(),
            mode: "NEFT".to_string(),
            reference: Some("UTR123".to_string()),
            notes: None,
            idempotency_key: None,
        }
    }

    #[tokio::test]
    async fn test_partial_then_full_payment() {
        let db = setup().await;
        let bill = sent_bill(&db).await;
        let repo = db.payments();

        let receipt = repo.record_payment(pay(&bill.id, 500)).await.unwrap();
        assert_eq!(receipt.bill.status, BillStatus::PartiallyPaid);
        assert_eq!(receipt.bill.outstanding(), Money::from_rupees(680));
        assert_eq!(receipt.payment.party_id, bill.party_id);
        assert!(!receipt.replayed);

        let receipt = repo.record_payment(pay(&bill.id, 680)).await.unwrap();
        assert_eq!(receipt.bill.status, BillStatus::Paid);

        let stored = db.bills().get_by_id(&bill.id).await.unwrap().unwrap();
        assert_eq!(stored.paid(), Money::from_rupees(1180));
        assert_eq!(stored.status, BillStatus::Paid);
        assert_eq!(repo.payments_for_bill(&bill.id).await.unwrap().len(), 2);

        let err = repo.record_payment(pay(&bill.id, 1)).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::BillNotPayable { .. })));
    }

    #[tokio::test]
    async fn test_ledger_credit_is_net_of_tds() {
        let db = setup().await;
        let bill = sent_bill(&db).await;

        let mut input = pay(&bill.id, 1180);
        input.tds = Money::from_rupees(20);
        db.payments().record_payment(input).await.unwrap();

        let entries = db
            .payments()
            .ledger_entries(&bill.party_id, Some(LedgerType::Receivable))
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].credit_paise, 116_000);
        assert_eq!(entries[0].debit_paise, 0);
        assert_eq!(entries[0].description, "Payment received for bill RR/2025-26/0001");

        let balance = db.payments().ledger_balance(&bill.party_id).await.unwrap();
        assert_eq!(balance.len(), 1);
        assert_eq!(balance[0].net(), Money::from_rupees(-1160));
    }

    #[tokio::test]
    async fn test_overpayment_rejected() {
        let db = setup().await;
        let bill = sent_bill(&db).await;

        let err = db.payments().record_payment(pay(&bill.id, 1181)).await.unwrap_err();
        assert_eq!(err.to_string(), "Payment exceeds outstanding amount of ₹1180.00");

        // One paisa over is tolerated.
        let mut input = pay(&bill.id, 0);
        input.amount = Money::from_paise(118_001);
        let receipt = db.payments().record_payment(input).await.unwrap();
        assert_eq!(receipt.bill.status, BillStatus::Paid);
    }

    #[tokio::test]
    async fn test_invalid_amounts_write_nothing() {
        let db = setup().await;
        let bill = sent_bill(&db).await;

        assert!(db.payments().record_payment(pay(&bill.id, 0)).await.is_err());
        let mut input = pay(&bill.id, 100);
        input.tds = Money::from_rupees(100);
        assert!(db.payments().record_payment(input).await.is_err());
        let mut input = pay(&bill.id, 100);
        input.mode = " ".to_string();
        assert!(db.payments().record_payment(input).await.is_err());

        let err = db.payments().record_payment(pay("missing", 100)).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        assert!(db.payments().payments_for_bill(&bill.id).await.unwrap().is_empty());
        assert!(db.payments().ledger_entries(&bill.party_id, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_bill_rejects_payment() {
        let db = setup().await;
        let bill = sent_bill(&db).await;
        db.bills().cancel(&bill.id).await.unwrap();

        let err = db.payments().record_payment(pay(&bill.id, 100)).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot add payment to bill RR/2025-26/0001: bill is CANCELLED"
        );
    }

    #[tokio::test]
    async fn test_cancel_with_payments_rejected() {
        let db = setup().await;
        let bill = sent_bill(&db).await;
        db.payments().record_payment(pay(&bill.id, 100)).await.unwrap();

        let err = db.bills().cancel(&bill.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot cancel a bill with payments recorded");
    }

    #[tokio::test]
    async fn test_idempotent_replay() {
        let db = setup().await;
        let bill = sent_bill(&db).await;

        let mut input = pay(&bill.id, 500);
        input.idempotency_key = Some("pay-7f3a".to_string());

        let first = db.payments().record_payment(input.clone()).await.unwrap();
        let second = db.payments().record_payment(input).await.unwrap();

        assert!(second.replayed);
        assert_eq!(second.payment.id, first.payment.id);
        assert_eq!(second.bill.paid(), Money::from_rupees(500));
        assert_eq!(db.payments().payments_for_bill(&bill.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_payment_cascades_to_consignment() {
        let db = setup().await;
        let from = party(&db, "Kalyani Forge", PartyKind::Company, Some("Maharashtra")).await;
        let to = party(&db, "Adani Ports Depot", PartyKind::Company, Some("Gujarat")).await;
        let booked = db.consignments().book(booking(&from.id, &to.id)).await.unwrap();
        for status in [ConsignmentStatus::InTransit, ConsignmentStatus::Delivered] {
            db.consignments().update_status(&booked.id, status, None).await.unwrap();
        }
        let bill = db
            .bills()
            .create(NewBill {
                party_id: from.id.clone(),
                consignment_id: Some(booked.id.clone()),
                bill_date: date(2025, 6, 10),
                due_date: None,
                subtotal: Money::from_rupees(1000),
                gst_rate: Some(GstRate::from_percent(18)),
                is_interstate: Some(false),
                description: None,
                notes: None,
            })
            .await
            .unwrap();

        db.payments().record_payment(pay(&bill.id, 500)).await.unwrap();
        let c = db.consignments().get_by_id(&booked.id).await.unwrap().unwrap();
        assert_eq!(c.status, ConsignmentStatus::PartiallyPaid);
        let logs = db.consignments().logs(&booked.id).await.unwrap();
        assert_eq!(logs.last().unwrap().note.as_deref(), Some("Partial payment ₹500.00"));

        // A second partial payment leaves PARTIALLY_PAID alone: no new log.
        db.payments().record_payment(pay(&bill.id, 100)).await.unwrap();
        assert_eq!(db.consignments().logs(&booked.id).await.unwrap().len(), logs.len());

        db.payments().record_payment(pay(&bill.id, 580)).await.unwrap();
        let c = db.consignments().get_by_id(&booked.id).await.unwrap().unwrap();
        assert_eq!(c.status, ConsignmentStatus::Paid);
        let logs = db.consignments().logs(&booked.id).await.unwrap();
        assert_eq!(logs.last().unwrap().note.as_deref(), Some("Bill fully paid"));
    }

    #[tokio::test]
    async fn test_vehicle_payments() {
        let db = setup().await;
        let from = party(&db, "Kalyani Forge", PartyKind::Company, None).await;
        let to = party(&db, "Adani Ports Depot", PartyKind::Company, None).await;
        let owner = party(&db, "Sukhdev Transport", PartyKind::VehicleOwner, None).await;
        let truck = vehicle(&db, "MH12AB1234", &owner.id).await;

        let mut input = booking(&from.id, &to.id);
        input.vehicle_id = Some(truck.id.clone());
        input.vehicle_freight = Some(Money::from_rupees(800));
        input.advance_paid = Money::from_rupees(200);
        let booked = db.consignments().book(input).await.unwrap();

        let payout = |payment_type, rupees| RecordVehiclePayment {
            party_id: owner.id.clone(),
            consignment_id: Some(booked.id.clone()),
            payment_date: date(2025, 6, 5),
            amount: Money::from_rupees(rupees),
            payment_type,
            mode: "Cash".to_string(),
            reference: None,
            notes: None,
        };

        let repo = db.payments();
        let err = repo
            .record_vehicle_payment(payout(VehiclePaymentType::Balance, 601))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Payment exceeds vehicle freight: ₹600.00 remaining");

        repo.record_vehicle_payment(payout(VehiclePaymentType::Balance, 600))
            .await
            .unwrap();
        // Detention charges on top of the agreed freight.
        repo.record_vehicle_payment(payout(VehiclePaymentType::Extra, 150))
            .await
            .unwrap();

        let c = db.consignments().get_by_id(&booked.id).await.unwrap().unwrap();
        assert_eq!(c.advance_paid_paise, 20_000);
        assert_eq!(c.balance_paid_paise, 75_000);

        let entries = repo.ledger_entries(&owner.id, Some(LedgerType::Payable)).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].debit_paise, 60_000);
        assert_eq!(entries[0].description, "Vehicle payment (BALANCE) to owner for GR0001");

        let balance = repo.ledger_balance(&owner.id).await.unwrap();
        assert_eq!(balance[0].entry_type, LedgerType::Payable);
        assert_eq!(balance[0].net(), Money::from_rupees(750));
        assert_eq!(repo.vehicle_payments_for_consignment(&booked.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unlinked_vehicle_payment() {
        let db = setup().await;
        let owner = party(&db, "Sukhdev Transport", PartyKind::VehicleOwner, None).await;

        let payment = db
            .payments()
            .record_vehicle_payment(RecordVehiclePayment {
                party_id: owner.id.clone(),
                consignment_id: None,
                payment_date: date(2025, 6, 5),
                amount: Money::from_rupees(300),
                payment_type: VehiclePaymentType::Advance,
                mode: "UPI".to_string(),
                reference: None,
                notes: None,
            })
            .await
            .unwrap();
        assert!(payment.consignment_id.is_none());

        let entries = db.payments().ledger_entries(&owner.id, None).await.unwrap();
        assert_eq!(entries[0].description, "Vehicle payment (ADVANCE) to owner");

        let err = db
            .payments()
            .record_vehicle_payment(RecordVehiclePayment {
                party_id: "missing".to_string(),
                consignment_id: None,
                payment_date: date(2025, 6, 5),
                amount: Money::from_rupees(300),
                payment_type: VehiclePaymentType::Extra,
                mode: "UPI".to_string(),
                reference: None,
                notes: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
