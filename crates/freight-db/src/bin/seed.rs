//! # Seed Data Generator
//!
//! Populates a development database with a small, realistic freight book:
//! parties, vehicles, bookings at different stages, bills and payments.
//!
//! ## Usage
//! ```bash
//! # Uses FREIGHT_DATABASE_PATH (default ./freight.db)
//! cargo run -p freight-db --bin seed
//!
//! # Specify database path
//! cargo run -p freight-db --bin seed -- --db ./data/freight_dev.db
//!
//! # More logging
//! FREIGHT_LOG=debug,sqlx=warn cargo run -p freight-db --bin seed
//! ```
//!
//! ## Generated Data
//! - Two consignors, two consignees, one billing party, two vehicle owners
//! - One vehicle per owner
//! - Routes out of Pune and Mumbai; each booking is walked to a different
//!   stage (booked, in transit, delivered, billed, part paid, paid)

use chrono::{Duration, NaiveDate, Utc};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use freight_core::{
    BillStatus, ConsignmentStatus, FreightType, GstRate, Money, PartyKind, PaymentType,
    VehiclePaymentType,
};
use freight_db::{
    Database, FreightConfig, NewBill, NewConsignment, NewParty, NewVehicle, RecordPayment,
    RecordVehiclePayment,
};

/// `(from_city, to_city, to_state, cargo, freight in rupees)`
const ROUTES: &[(&str, &str, &str, &str, i64)] = &[
    ("Pune", "Ahmedabad", "Gujarat", "Auto parts, 40 cartons", 42_000),
    ("Pune", "Nashik", "Maharashtra", "Forged crankshafts", 18_500),
    ("Mumbai", "Indore", "Madhya Pradesh", "Textile bales", 35_000),
    ("Mumbai", "Nagpur", "Maharashtra", "FMCG, mixed load", 27_750),
    ("Pune", "Bengaluru", "Karnataka", "Steel coils", 61_000),
    ("Mumbai", "Surat", "Gujarat", "Chemical drums", 22_400),
];

/// How far each seeded booking is taken.
#[derive(Debug, Clone, Copy)]
enum Stage {
    Booked,
    InTransit,
    Delivered,
    Billed,
    PartPaid,
    Paid,
}

const STAGES: [Stage; 6] = [
    Stage::Booked,
    Stage::InTransit,
    Stage::Delivered,
    Stage::Billed,
    Stage::PartPaid,
    Stage::Paid,
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = FreightConfig::load()?;

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Freight Ledger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: $FREIGHT_DATABASE_PATH or ./freight.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .init();

    println!("Freight Ledger Seed Data Generator");
    println!("==================================");
    println!("Database: {}", config.database_path.display());
    println!();

    let db = Database::new(config.db_config()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if !db.consignments().list(None, 1, 1).await?.is_empty() {
        println!("⚠ Database already has consignments");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    seed(&db).await?;

    db.close().await;
    Ok(())
}

async fn seed(db: &Database) -> Result<(), Box<dyn std::error::Error>> {
    let party = |name: &str, kind: PartyKind, state: &str, gstin: Option<&str>| NewParty {
        name: name.to_string(),
        kind,
        gstin: gstin.map(str::to_string),
        state: Some(state.to_string()),
        phone: None,
    };

    let consignors = [
        db.parties()
            .insert(party("Kalyani Forge Ltd", PartyKind::Company, "Maharashtra", Some("27AABCK1234L1ZP")))
            .await?,
        db.parties()
            .insert(party("Bombay Dyeing Mills", PartyKind::Company, "Maharashtra", None))
            .await?,
    ];
    let consignees = [
        db.parties()
            .insert(party("Adani Logistics Park", PartyKind::Company, "Gujarat", None))
            .await?,
        db.parties()
            .insert(party("Reliance Retail DC", PartyKind::Company, "Madhya Pradesh", None))
            .await?,
    ];
    let billing_party = db
        .parties()
        .insert(party("Tata Motors Purchase Dept", PartyKind::BillingParty, "Maharashtra", Some("27AAACT2727Q1ZW")))
        .await?;
    let owners = [
        db.parties()
            .insert(party("Sukhdev Singh Transport", PartyKind::VehicleOwner, "Punjab", None))
            .await?,
        db.parties()
            .insert(party("Yadav Roadlines", PartyKind::VehicleOwner, "Maharashtra", None))
            .await?,
    ];
    println!("✓ Created 7 parties");

    let mut vehicles = Vec::new();
    for (owner, number) in owners.iter().zip(["MH12AB1234", "PB10CK4455"]) {
        let vehicle = db
            .vehicles()
            .insert(NewVehicle {
                vehicle_number: number.to_string(),
                vehicle_type: "32ft multi-axle".to_string(),
                owner_id: owner.id.clone(),
            })
            .await?;
        vehicles.push(vehicle);
    }
    println!("✓ Registered {} vehicles", vehicles.len());

    let today = Utc::now().date_naive();
    let mut bills = 0;
    let mut payments = 0;

    for (index, (&(from_city, to_city, to_state, cargo, rupees), stage)) in
        ROUTES.iter().zip(STAGES).enumerate()
    {
        let booking_date = today - Duration::days(30 - index as i64 * 4);
        // One truck per owner, so only the first bookings get one.
        let assigned = vehicles.get(index);
        let vehicle_freight = Money::from_rupees(rupees * 80 / 100);

        let booked = db
            .consignments()
            .book(NewConsignment {
                booking_date,
                consignor_id: consignors[index % 2].id.clone(),
                consignee_id: consignees[index % 2].id.clone(),
                agent_id: None,
                from_city: from_city.to_string(),
                from_state: "Maharashtra".to_string(),
                to_city: to_city.to_string(),
                to_state: to_state.to_string(),
                description: cargo.to_string(),
                freight_type: FreightType::Ftl,
                freight: Money::from_rupees(rupees),
                payment_type: PaymentType::Tbb,
                eway_bill_number: None,
                vehicle_id: assigned.map(|v| v.id.clone()),
                driver_name: assigned.map(|_| "Gurpreet Singh".to_string()),
                driver_phone: assigned.map(|_| "9876543210".to_string()),
                vehicle_freight: assigned.map(|_| vehicle_freight),
                advance_paid: Money::zero(),
                notes: None,
            })
            .await?;

        if let Some(vehicle) = assigned {
            db.payments()
                .record_vehicle_payment(RecordVehiclePayment {
                    party_id: vehicle.owner_id.clone(),
                    consignment_id: Some(booked.id.clone()),
                    payment_date: booking_date,
                    amount: Money::from_rupees(5_000),
                    payment_type: VehiclePaymentType::Advance,
                    mode: "Cash".to_string(),
                    reference: None,
                    notes: Some("Diesel advance".to_string()),
                })
                .await?;
        }

        let walk: &[ConsignmentStatus] = match stage {
            Stage::Booked => &[],
            Stage::InTransit => &[ConsignmentStatus::InTransit],
            _ => &[ConsignmentStatus::InTransit, ConsignmentStatus::Delivered],
        };
        for status in walk {
            db.consignments().update_status(&booked.id, *status, None).await?;
        }

        if matches!(stage, Stage::Billed | Stage::PartPaid | Stage::Paid) {
            let bill = db
                .bills()
                .create(NewBill {
                    party_id: billing_party.id.clone(),
                    consignment_id: Some(booked.id.clone()),
                    bill_date: booking_date + Duration::days(5),
                    due_date: Some(booking_date + Duration::days(35)),
                    subtotal: Money::from_rupees(rupees),
                    gst_rate: Some(GstRate::from_percent(12)),
                    is_interstate: None,
                    description: Some(format!("Freight {} to {}", from_city, to_city)),
                    notes: None,
                })
                .await?;
            db.bills().update_status(&bill.id, BillStatus::Generated).await?;
            db.bills().update_status(&bill.id, BillStatus::Sent).await?;
            bills += 1;

            let amount = match stage {
                Stage::PartPaid => Some(Money::from_paise(bill.total_paise / 2)),
                Stage::Paid => Some(bill.total()),
                _ => None,
            };
            if let Some(amount) = amount {
                let receipt = db
                    .payments()
                    .record_payment(RecordPayment {
                        bill_id: bill.id.clone(),
                        payment_date: date_after(bill.bill_date, 10),
                        amount,
                        tds: Money::from_paise(amount.paise() / 100),
                        mode: "NEFT".to_string(),
                        reference: Some(format!("UTR{:08}", index + 1)),
                        notes: None,
                        idempotency_key: Some(format!("seed-{}", booked.lr_number)),
                    })
                    .await?;
                payments += 1;
                println!("  {}", serde_json::to_string(&receipt.bill)?);
            }
        }

        println!("  {} {} → {} ({:?})", booked.lr_number, from_city, to_city, stage);
    }

    println!("✓ Booked {} consignments", ROUTES.len());
    println!("✓ Raised {} bills, recorded {} payments", bills, payments);
    println!(
        "✓ Unread notifications: {}",
        db.notifications().unread_count().await?
    );
    println!("✓ Dashboard: {}", serde_json::to_string(&db.dashboard(today).await?)?);
    Ok(())
}

fn date_after(date: NaiveDate, days: i64) -> NaiveDate {
    date + Duration::days(days)
}
