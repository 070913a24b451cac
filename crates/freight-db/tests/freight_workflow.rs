//! End-to-end booking → delivery → billing → payment flows, and the
//! numbering and payment guarantees under concurrent writers.

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::NaiveDate;
use freight_core::{
    BillStatus, ConsignmentStatus, CoreError, FreightType, GstRate, LedgerType, Money, Party,
    PartyKind, PaymentType, VehiclePaymentType, VehicleStatus,
};
use freight_db::{
    Database, DbConfig, DbError, NewBill, NewConsignment, NewParty, NewVehicle, RecordPayment,
    RecordVehiclePayment,
};
use uuid::Uuid;

// =============================================================================
// Fixtures
// =============================================================================

/// A file-backed database removed on drop, for tests that need several
/// real connections.
struct TempDb {
    path: PathBuf,
    db: Database,
}

impl TempDb {
    async fn new(max_connections: u32) -> Self {
        let path = std::env::temp_dir().join(format!("freight-test-{}.db", Uuid::new_v4()));
        let db = Database::new(DbConfig::new(path.clone()).max_connections(max_connections))
            .await
            .unwrap();
        TempDb { path, db }
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn party(db: &Database, name: &str, kind: PartyKind, state: &str) -> Party {
    db.parties()
        .insert(NewParty {
            name: name.to_string(),
            kind,
            gstin: None,
            state: Some(state.to_string()),
            phone: None,
        })
        .await
        .unwrap()
}

fn booking(consignor: &Party, consignee: &Party, vehicle_id: Option<String>) -> NewConsignment {
    NewConsignment {
        booking_date: date(2025, 8, 1),
        consignor_id: consignor.id.clone(),
        consignee_id: consignee.id.clone(),
        agent_id: None,
        from_city: "Pune".to_string(),
        from_state: "Maharashtra".to_string(),
        to_city: "Hyderabad".to_string(),
        to_state: "Telangana".to_string(),
        description: "Pharma cartons, 120 boxes".to_string(),
        freight_type: FreightType::Ltl,
        freight: Money::from_rupees(1000),
        payment_type: PaymentType::Tbb,
        eway_bill_number: Some("331009876543".to_string()),
        vehicle_id,
        driver_name: Some("Anil Pawar".to_string()),
        driver_phone: Some("98220 11223".to_string()),
        vehicle_freight: None,
        advance_paid: Money::zero(),
        notes: None,
    }
}

fn bill(party: &Party, consignment_id: Option<&str>, rupees: i64) -> NewBill {
    NewBill {
        party_id: party.id.clone(),
        consignment_id: consignment_id.map(str::to_string),
        bill_date: date(2025, 8, 9),
        due_date: Some(date(2025, 9, 8)),
        subtotal: Money::from_rupees(rupees),
        gst_rate: Some(GstRate::from_percent(18)),
        is_interstate: Some(false),
        description: None,
        notes: None,
    }
}

fn payment(bill_id: &str, amount: Money, tds: Money) -> RecordPayment {
    RecordPayment {
        bill_id: bill_id.to_string(),
        payment_date: date(2025, 8, 25),
        amount,
        tds,
        mode: "Bank Transfer".to_string(),
        reference: None,
        notes: None,
        idempotency_key: None,
    }
}

// =============================================================================
// End-to-end
// =============================================================================

#[tokio::test]
async fn booking_to_full_payment() {
    let db = memory_db().await;
    let consignor = party(&db, "Lupin Ltd", PartyKind::Company, "Maharashtra").await;
    let consignee = party(&db, "Apollo Pharmacy DC", PartyKind::Company, "Telangana").await;
    let owner = party(&db, "Pawar Carriers", PartyKind::VehicleOwner, "Maharashtra").await;
    let truck = db
        .vehicles()
        .insert(NewVehicle {
            vehicle_number: "MH14 GH 2201".to_string(),
            vehicle_type: "19ft closed body".to_string(),
            owner_id: owner.id.clone(),
        })
        .await
        .unwrap();

    // Book: BOOKED, truck goes ON_TRIP.
    let booked = db
        .consignments()
        .book(booking(&consignor, &consignee, Some(truck.id.clone())))
        .await
        .unwrap();
    assert_eq!(booked.status, ConsignmentStatus::Booked);
    assert_eq!(booked.lr_number, "GR0001");
    let truck_status = |db: Database, id: String| async move {
        db.vehicles().get_by_id(&id).await.unwrap().unwrap().status
    };
    assert_eq!(truck_status(db.clone(), truck.id.clone()).await, VehicleStatus::OnTrip);

    // Deliver: truck released, notification raised.
    for status in [ConsignmentStatus::InTransit, ConsignmentStatus::Delivered] {
        db.consignments().update_status(&booked.id, status, None).await.unwrap();
    }
    assert_eq!(truck_status(db.clone(), truck.id.clone()).await, VehicleStatus::Available);
    let notes = db.notifications().recent(None).await.unwrap();
    assert_eq!(notes[0].message, "GR GR0001 has been delivered");

    // Bill: DRAFT, consignment BILLED.
    let created = db
        .bills()
        .create(bill(&consignor, Some(&booked.id), 1000))
        .await
        .unwrap();
    assert_eq!(created.status, BillStatus::Draft);
    assert_eq!(created.total(), Money::from_rupees(1180));
    let c = db.consignments().get_by_id(&booked.id).await.unwrap().unwrap();
    assert_eq!(c.status, ConsignmentStatus::Billed);

    // Full payment with TDS: bill PAID, consignment PAID, one net ledger credit.
    let receipt = db
        .payments()
        .record_payment(payment(&created.id, Money::from_rupees(1180), Money::from_rupees(18)))
        .await
        .unwrap();
    assert_eq!(receipt.bill.status, BillStatus::Paid);
    assert_eq!(receipt.bill.outstanding(), Money::zero());

    let c = db.consignments().get_by_id(&booked.id).await.unwrap().unwrap();
    assert_eq!(c.status, ConsignmentStatus::Paid);

    let ledger = db
        .payments()
        .ledger_entries(&consignor.id, Some(LedgerType::Receivable))
        .await
        .unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].credit_paise, 116_200);
    assert_eq!(ledger[0].payment_id.as_deref(), Some(receipt.payment.id.as_str()));

    let statuses: Vec<ConsignmentStatus> = db
        .consignments()
        .logs(&booked.id)
        .await
        .unwrap()
        .into_iter()
        .map(|log| log.status)
        .collect();
    assert_eq!(
        statuses,
        vec![
            ConsignmentStatus::Booked,
            ConsignmentStatus::InTransit,
            ConsignmentStatus::Delivered,
            ConsignmentStatus::Billed,
            ConsignmentStatus::Paid,
        ]
    );
}

#[tokio::test]
async fn partial_payment_only_moves_billed_consignments() {
    let db = memory_db().await;
    let consignor = party(&db, "Lupin Ltd", PartyKind::Company, "Maharashtra").await;
    let consignee = party(&db, "Apollo Pharmacy DC", PartyKind::Company, "Telangana").await;

    // Billed while still in transit: the bill does not move the consignment.
    let booked = db
        .consignments()
        .book(booking(&consignor, &consignee, None))
        .await
        .unwrap();
    db.consignments()
        .update_status(&booked.id, ConsignmentStatus::InTransit, None)
        .await
        .unwrap();
    let created = db
        .bills()
        .create(bill(&consignor, Some(&booked.id), 1000))
        .await
        .unwrap();

    db.payments()
        .record_payment(payment(&created.id, Money::from_rupees(400), Money::zero()))
        .await
        .unwrap();
    let c = db.consignments().get_by_id(&booked.id).await.unwrap().unwrap();
    assert_eq!(c.status, ConsignmentStatus::InTransit);

    // The payment that closes the bill closes the consignment regardless.
    db.payments()
        .record_payment(payment(&created.id, Money::from_rupees(780), Money::zero()))
        .await
        .unwrap();
    let c = db.consignments().get_by_id(&booked.id).await.unwrap().unwrap();
    assert_eq!(c.status, ConsignmentStatus::Paid);
}

#[tokio::test]
async fn rejected_operations_leave_no_trace() {
    let db = memory_db().await;
    let consignor = party(&db, "Lupin Ltd", PartyKind::Company, "Maharashtra").await;
    let created = db.bills().create(bill(&consignor, None, 1000)).await.unwrap();

    let err = db
        .payments()
        .record_payment(payment(&created.id, Money::from_rupees(1200), Money::zero()))
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_domain(),
        Some(CoreError::PaymentExceedsOutstanding { outstanding }) if *outstanding == Money::from_rupees(1180)
    ));
    assert!(!err.is_retryable());

    db.payments()
        .record_payment(payment(&created.id, Money::from_rupees(100), Money::zero()))
        .await
        .unwrap();
    let err = db.bills().cancel(&created.id).await.unwrap_err();
    assert!(matches!(err.as_domain(), Some(CoreError::BillHasPayments)));

    let stored = db.bills().get_by_id(&created.id).await.unwrap().unwrap();
    assert_eq!(stored.status, BillStatus::PartiallyPaid);
    assert_eq!(stored.paid(), Money::from_rupees(100));
    assert_eq!(db.payments().payments_for_bill(&created.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn history_tables_are_append_only() {
    let db = memory_db().await;
    let consignor = party(&db, "Lupin Ltd", PartyKind::Company, "Maharashtra").await;
    let consignee = party(&db, "Apollo Pharmacy DC", PartyKind::Company, "Telangana").await;
    db.consignments()
        .book(booking(&consignor, &consignee, None))
        .await
        .unwrap();
    let created = db.bills().create(bill(&consignor, None, 1000)).await.unwrap();
    db.payments()
        .record_payment(payment(&created.id, Money::from_rupees(100), Money::zero()))
        .await
        .unwrap();

    for sql in [
        "UPDATE payments SET amount_paise = 1",
        "DELETE FROM payments",
        "UPDATE ledger_entries SET credit_paise = 1",
        "DELETE FROM ledger_entries",
        "UPDATE consignment_logs SET note = NULL",
        "DELETE FROM consignment_logs",
    ] {
        let err = DbError::from(sqlx::query(sql).execute(db.pool()).await.unwrap_err());
        assert!(err.to_string().contains("append-only"), "{sql}: {err}");
    }
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_bill_numbers_are_unique_and_gapless() {
    let temp = TempDb::new(8).await;
    const CALLERS: usize = 24;

    let mut handles = Vec::new();
    for _ in 0..CALLERS {
        let db = temp.db.clone();
        handles.push(tokio::spawn(async move {
            db.settings().next_bill_number().await
        }));
    }

    let mut numbers = HashSet::new();
    for handle in handles {
        let number = handle.await.unwrap().unwrap();
        assert!(numbers.insert(number.clone()), "duplicate {number}");
    }

    let expected: HashSet<String> = (1..=CALLERS)
        .map(|n| format!("RR/2025-26/{:04}", n))
        .collect();
    assert_eq!(numbers, expected);
    assert_eq!(
        temp.db.settings().get("invoice_counter").await.unwrap().as_deref(),
        Some("25")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_payments_never_overpay() {
    let temp = TempDb::new(8).await;
    let consignor = party(&temp.db, "Lupin Ltd", PartyKind::Company, "Maharashtra").await;
    let created = temp
        .db
        .bills()
        .create(bill(&consignor, None, 1000))
        .await
        .unwrap();

    // Ten racing payments of ₹200 against ₹1180: only five fit.
    let mut handles = Vec::new();
    for _ in 0..10 {
        let db = temp.db.clone();
        let bill_id = created.id.clone();
        handles.push(tokio::spawn(async move {
            db.payments()
                .record_payment(payment(&bill_id, Money::from_rupees(200), Money::zero()))
                .await
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(err) => assert!(
                matches!(err.as_domain(), Some(CoreError::PaymentExceedsOutstanding { .. })),
                "unexpected error: {err}"
            ),
        }
    }
    assert_eq!(accepted, 5);

    let stored = temp.db.bills().get_by_id(&created.id).await.unwrap().unwrap();
    assert_eq!(stored.paid(), Money::from_rupees(1000));
    assert_eq!(stored.status, BillStatus::PartiallyPaid);
    assert_eq!(
        temp.db.payments().payments_for_bill(&created.id).await.unwrap().len(),
        5
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_bookings_get_distinct_lr_numbers() {
    let temp = TempDb::new(8).await;
    let consignor = party(&temp.db, "Lupin Ltd", PartyKind::Company, "Maharashtra").await;
    let consignee = party(&temp.db, "Apollo Pharmacy DC", PartyKind::Company, "Telangana").await;

    let mut handles = Vec::new();
    for _ in 0..12 {
        let db = temp.db.clone();
        let input = booking(&consignor, &consignee, None);
        handles.push(tokio::spawn(async move { db.consignments().book(input).await }));
    }

    let mut numbers = HashSet::new();
    for handle in handles {
        let booked = handle.await.unwrap().unwrap();
        numbers.insert(booked.lr_number);
    }
    assert_eq!(numbers.len(), 12);
    assert!(numbers.contains("GR0001") && numbers.contains("GR0012"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unlinked_vehicle_payments_wait_their_turn_behind_bookings() {
    let temp = TempDb::new(16).await;
    let consignor = party(&temp.db, "Bajaj Auto", PartyKind::Company, "Maharashtra").await;
    let consignee = party(&temp.db, "Hero Depot", PartyKind::Company, "Haryana").await;
    let owner = party(&temp.db, "Yadav Roadlines", PartyKind::VehicleOwner, "Maharashtra").await;

    let mut handles = Vec::new();
    for i in 0..40 {
        let db = temp.db.clone();
        let input = booking(&consignor, &consignee, None);
        handles.push(tokio::spawn(async move {
            db.consignments().book(input).await.map(|_| ())
        }));

        let db = temp.db.clone();
        let payout = RecordVehiclePayment {
            party_id: owner.id.clone(),
            consignment_id: None,
            payment_date: date(2025, 6, 12),
            amount: Money::from_rupees(250),
            payment_type: VehiclePaymentType::Extra,
            mode: "Cash".to_string(),
            reference: Some(format!("TOLL-{i}")),
            notes: None,
        };
        handles.push(tokio::spawn(async move {
            db.payments().record_vehicle_payment(payout).await.map(|_| ())
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let balance = temp.db.payments().ledger_balance(&owner.id).await.unwrap();
    assert_eq!(balance.len(), 1);
    assert_eq!(balance[0].entry_type, LedgerType::Payable);
    assert_eq!(balance[0].total_debit, Money::from_rupees(250 * 40));
    assert_eq!(
        temp.db.settings().get("lr_counter").await.unwrap().as_deref(),
        Some("41")
    );
}
