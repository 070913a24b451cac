//! # Consignment Repository
//!
//! Booking and status changes for consignments.
//!
//! ## Booking Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  book(input)                                                            │
//! │                                                                         │
//! │  validate input                     ← rejected here: nothing numbered   │
//! │  BEGIN                                                                  │
//! │  ├── next_lr_number()               ← first write, takes the lock       │
//! │  ├── vehicle AVAILABLE?             ← no: ROLLBACK, number not consumed │
//! │  ├── INSERT consignment (BOOKED)                                        │
//! │  ├── INSERT log "Consignment booked"                                    │
//! │  └── vehicle → ON_TRIP                                                  │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Status changes made by billing and payment recording go through
//! [`apply_status`], which also writes the log row.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::notification::{self, NewNotification};
use super::{new_id, page_bounds, settings, vehicle};
use crate::error::{DbError, DbResult};
use freight_core::consignment::BOOKED_NOTE;
use freight_core::validation;
use freight_core::{
    Consignment, ConsignmentActivity, ConsignmentLog, ConsignmentStatus, CoreError, FreightType,
    Money, NotificationKind, PaymentType, ValidationError, VehicleStatus,
};

const SELECT_CONSIGNMENT: &str = r#"
    SELECT id, lr_number, booking_date, consignor_id, consignee_id, agent_id,
           from_city, from_state, to_city, to_state, description, freight_type,
           freight_paise, payment_type, eway_bill_number, vehicle_id, driver_name,
           driver_phone, vehicle_freight_paise, advance_paid_paise, balance_paid_paise,
           status, notes, created_at, updated_at
    FROM consignments
"#;

/// Input for booking a consignment.
#[derive(Debug, Clone)]
pub struct NewConsignment {
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
    pub freight: Money,
    pub payment_type: PaymentType,
    pub eway_bill_number: Option<String>,
    pub vehicle_id: Option<String>,
    pub driver_name: Option<String>,
    pub driver_phone: Option<String>,
    /// Freight agreed with the vehicle owner.
    pub vehicle_freight: Option<Money>,
    /// Advance handed to the driver at booking.
    pub advance_paid: Money,
    pub notes: Option<String>,
}

impl NewConsignment {
    /// Validates and normalises the input.
    fn validated(self) -> Result<Self, ValidationError> {
        let consignor_id = validation::validate_required(&self.consignor_id, "Consignor")?;
        let consignee_id = validation::validate_required(&self.consignee_id, "Consignee")?;
        let from_city = validation::validate_required(&self.from_city, "From city")?;
        let to_city = validation::validate_required(&self.to_city, "To city")?;
        let description = validation::validate_required(&self.description, "Description")?;
        validation::validate_amount(self.freight, "Freight amount")?;
        validation::validate_non_negative(self.advance_paid, "Advance")?;
        if let Some(vehicle_freight) = self.vehicle_freight {
            validation::validate_non_negative(vehicle_freight, "Vehicle freight")?;
            if self.advance_paid > vehicle_freight {
                return Err(ValidationError::Conflict(
                    "Advance cannot exceed vehicle freight".to_string(),
                ));
            }
        }
        let eway_bill_number = validation::normalize_optional(self.eway_bill_number.as_deref());
        validation::validate_eway_bill(eway_bill_number.as_deref())?;
        let driver_phone = validation::normalize_optional(self.driver_phone.as_deref());
        validation::validate_phone(driver_phone.as_deref(), "Driver phone")?;

        Ok(NewConsignment {
            consignor_id,
            consignee_id,
            agent_id: validation::normalize_optional(self.agent_id.as_deref()),
            from_city,
            from_state: self.from_state.trim().to_string(),
            to_city,
            to_state: self.to_state.trim().to_string(),
            description,
            eway_bill_number,
            vehicle_id: validation::normalize_optional(self.vehicle_id.as_deref()),
            driver_name: validation::normalize_optional(self.driver_name.as_deref()),
            driver_phone,
            notes: validation::normalize_optional(self.notes.as_deref()),
            ..self
        })
    }
}

/// Edits to a booked consignment. `None` leaves a field as it is; for the
/// optional text fields, `Some("")` clears it.
///
/// The vehicle assignment and the amounts paid to the vehicle are not
/// editable here: they move with bookings and vehicle payments.
#[derive(Debug, Clone, Default)]
pub struct ConsignmentUpdate {
    pub booking_date: Option<NaiveDate>,
    pub consignor_id: Option<String>,
    pub consignee_id: Option<String>,
    pub agent_id: Option<String>,
    pub from_city: Option<String>,
    pub from_state: Option<String>,
    pub to_city: Option<String>,
    pub to_state: Option<String>,
    pub description: Option<String>,
    pub freight_type: Option<FreightType>,
    pub freight: Option<Money>,
    pub payment_type: Option<PaymentType>,
    pub eway_bill_number: Option<String>,
    pub driver_name: Option<String>,
    pub driver_phone: Option<String>,
    pub vehicle_freight: Option<Money>,
    pub notes: Option<String>,
}

impl ConsignmentUpdate {
    /// Validates each changed field and writes it into `current`.
    fn apply_to(self, current: &mut Consignment) -> Result<(), ValidationError> {
        if let Some(date) = self.booking_date {
            current.booking_date = date;
        }
        if let Some(id) = self.consignor_id {
            current.consignor_id = validation::validate_required(&id, "Consignor")?;
        }
        if let Some(id) = self.consignee_id {
            current.consignee_id = validation::validate_required(&id, "Consignee")?;
        }
        if let Some(id) = self.agent_id {
            current.agent_id = validation::normalize_optional(Some(&id));
        }
        if let Some(city) = self.from_city {
            current.from_city = validation::validate_required(&city, "From city")?;
        }
        if let Some(state) = self.from_state {
            current.from_state = state.trim().to_string();
        }
        if let Some(city) = self.to_city {
            current.to_city = validation::validate_required(&city, "To city")?;
        }
        if let Some(state) = self.to_state {
            current.to_state = state.trim().to_string();
        }
        if let Some(description) = self.description {
            current.description = validation::validate_required(&description, "Description")?;
        }
        if let Some(freight_type) = self.freight_type {
            current.freight_type = freight_type;
        }
        if let Some(freight) = self.freight {
            validation::validate_amount(freight, "Freight amount")?;
            current.freight_paise = freight.paise();
        }
        if let Some(payment_type) = self.payment_type {
            current.payment_type = payment_type;
        }
        if let Some(number) = self.eway_bill_number {
            let number = validation::normalize_optional(Some(&number));
            validation::validate_eway_bill(number.as_deref())?;
            current.eway_bill_number = number;
        }
        if let Some(name) = self.driver_name {
            current.driver_name = validation::normalize_optional(Some(&name));
        }
        if let Some(phone) = self.driver_phone {
            let phone = validation::normalize_optional(Some(&phone));
            validation::validate_phone(phone.as_deref(), "Driver phone")?;
            current.driver_phone = phone;
        }
        if let Some(vehicle_freight) = self.vehicle_freight {
            validation::validate_non_negative(vehicle_freight, "Vehicle freight")?;
            current.vehicle_freight_paise = Some(vehicle_freight.paise());
        }
        if let Some(notes) = self.notes {
            current.notes = validation::normalize_optional(Some(&notes));
        }

        if let Some(agreed) = current.vehicle_freight() {
            if Money::from_paise(current.advance_paid_paise) > agreed {
                return Err(ValidationError::Conflict(
                    "Advance cannot exceed vehicle freight".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Repository for consignments.
#[derive(Debug, Clone)]
pub struct ConsignmentRepository {
    pool: SqlitePool,
}

impl ConsignmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ConsignmentRepository { pool }
    }

    /// Books a consignment.
    ///
    /// ## Errors
    /// - `Domain(Validation)` for malformed input
    /// - `Domain(VehicleUnavailable)` if the assigned vehicle is not AVAILABLE
    /// - `NotFound` if the assigned vehicle does not exist
    /// - `Conflict` if the write lock could not be taken (retry)
    pub async fn book(&self, input: NewConsignment) -> DbResult<Consignment> {
        let input = input.validated()?;

        let mut tx = self.pool.begin().await?;

        let lr_number = settings::next_lr_number(&mut tx).await?;

        if let Some(vehicle_id) = &input.vehicle_id {
            let vehicle = vehicle::fetch(&mut tx, vehicle_id)
                .await?
                .ok_or_else(|| DbError::not_found("Vehicle", vehicle_id.as_str()))?;
            if vehicle.status != VehicleStatus::Available {
                return Err(CoreError::VehicleUnavailable {
                    vehicle_number: vehicle.vehicle_number,
                    status: vehicle.status,
                }
                .into());
            }
        }

        let now = Utc::now();
        let consignment = Consignment {
            id: new_id(),
            lr_number,
            booking_date: input.booking_date,
            consignor_id: input.consignor_id,
            consignee_id: input.consignee_id,
            agent_id: input.agent_id,
            from_city: input.from_city,
            from_state: input.from_state,
            to_city: input.to_city,
            to_state: input.to_state,
            description: input.description,
            freight_type: input.freight_type,
            freight_paise: input.freight.paise(),
            payment_type: input.payment_type,
            eway_bill_number: input.eway_bill_number,
            vehicle_id: input.vehicle_id,
            driver_name: input.driver_name,
            driver_phone: input.driver_phone,
            vehicle_freight_paise: input.vehicle_freight.map(|m| m.paise()),
            advance_paid_paise: input.advance_paid.paise(),
            balance_paid_paise: 0,
            status: ConsignmentStatus::Booked,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %consignment.id, lr_number = %consignment.lr_number, "Inserting consignment");

        sqlx::query(
            r#"
            INSERT INTO consignments (
                id, lr_number, booking_date, consignor_id, consignee_id, agent_id,
                from_city, from_state, to_city, to_state, description, freight_type,
                freight_paise, payment_type, eway_bill_number, vehicle_id, driver_name,
                driver_phone, vehicle_freight_paise, advance_paid_paise, balance_paid_paise,
                status, notes, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25
            )
            "#,
        )
        .bind(&consignment.id)
        .bind(&consignment.lr_number)
        .bind(consignment.booking_date)
        .bind(&consignment.consignor_id)
        .bind(&consignment.consignee_id)
        .bind(&consignment.agent_id)
        .bind(&consignment.from_city)
        .bind(&consignment.from_state)
        .bind(&consignment.to_city)
        .bind(&consignment.to_state)
        .bind(&consignment.description)
        .bind(consignment.freight_type)
        .bind(consignment.freight_paise)
        .bind(consignment.payment_type)
        .bind(&consignment.eway_bill_number)
        .bind(&consignment.vehicle_id)
        .bind(&consignment.driver_name)
        .bind(&consignment.driver_phone)
        .bind(consignment.vehicle_freight_paise)
        .bind(consignment.advance_paid_paise)
        .bind(consignment.balance_paid_paise)
        .bind(consignment.status)
        .bind(&consignment.notes)
        .bind(consignment.created_at)
        .bind(consignment.updated_at)
        .execute(&mut *tx)
        .await?;

        append_log(&mut tx, &consignment.id, ConsignmentStatus::Booked, Some(BOOKED_NOTE)).await?;

        if let Some(vehicle_id) = &consignment.vehicle_id {
            vehicle::set_status(&mut tx, vehicle_id, VehicleStatus::OnTrip).await?;
        }

        tx.commit().await?;

        info!(
            id = %consignment.id,
            lr_number = %consignment.lr_number,
            freight = %consignment.freight(),
            "Consignment booked"
        );
        Ok(consignment)
    }

    /// Moves a consignment to a new status by hand.
    ///
    /// Only transitions in the lifecycle table are accepted. Entering
    /// DELIVERED frees the assigned vehicle and raises a delivery
    /// notification.
    pub async fn update_status(
        &self,
        id: &str,
        to: ConsignmentStatus,
        note: Option<&str>,
    ) -> DbResult<Consignment> {
        let mut tx = self.pool.begin().await?;

        touch(&mut tx, id).await?;
        let current = fetch_required(&mut tx, id).await?;
        current.status.transition(to)?;

        let note = validation::normalize_optional(note);
        apply_status(&mut tx, id, to, note.as_deref()).await?;

        let effects = to.entry_effects();
        if effects.release_vehicle {
            if let Some(vehicle_id) = &current.vehicle_id {
                vehicle::set_status(&mut tx, vehicle_id, VehicleStatus::Available).await?;
            }
        }
        if effects.notify_delivery {
            notification::notify(
                &mut tx,
                NewNotification {
                    kind: NotificationKind::Delivery,
                    title: "Consignment Delivered",
                    message: format!("GR {} has been delivered", current.lr_number),
                    entity_type: "consignment",
                    entity_id: id,
                },
            )
            .await;
        }

        let updated = fetch_required(&mut tx, id).await?;
        tx.commit().await?;

        info!(%id, lr_number = %updated.lr_number, from = %current.status, to = %to, "Consignment status updated");
        Ok(updated)
    }

    /// Edits a consignment's booking details.
    ///
    /// Status is untouched and no log row is written. The advance already
    /// paid must still fit inside the (possibly new) vehicle freight.
    pub async fn update(&self, id: &str, changes: ConsignmentUpdate) -> DbResult<Consignment> {
        let mut tx = self.pool.begin().await?;

        touch(&mut tx, id).await?;
        let mut consignment = fetch_required(&mut tx, id).await?;
        changes.apply_to(&mut consignment)?;
        consignment.updated_at = Utc::now();

        debug!(%id, lr_number = %consignment.lr_number, "Updating consignment");

        sqlx::query(
            r#"
            UPDATE consignments SET
                booking_date = ?2, consignor_id = ?3, consignee_id = ?4, agent_id = ?5,
                from_city = ?6, from_state = ?7, to_city = ?8, to_state = ?9,
                description = ?10, freight_type = ?11, freight_paise = ?12,
                payment_type = ?13, eway_bill_number = ?14, driver_name = ?15,
                driver_phone = ?16, vehicle_freight_paise = ?17, notes = ?18,
                updated_at = ?19
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(consignment.booking_date)
        .bind(&consignment.consignor_id)
        .bind(&consignment.consignee_id)
        .bind(&consignment.agent_id)
        .bind(&consignment.from_city)
        .bind(&consignment.from_state)
        .bind(&consignment.to_city)
        .bind(&consignment.to_state)
        .bind(&consignment.description)
        .bind(consignment.freight_type)
        .bind(consignment.freight_paise)
        .bind(consignment.payment_type)
        .bind(&consignment.eway_bill_number)
        .bind(&consignment.driver_name)
        .bind(&consignment.driver_phone)
        .bind(consignment.vehicle_freight_paise)
        .bind(&consignment.notes)
        .bind(consignment.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(%id, lr_number = %consignment.lr_number, "Consignment updated");
        Ok(consignment)
    }

    /// Counts and booked freight for the month containing `today` and the
    /// month before it.
    pub async fn activity(&self, today: NaiveDate) -> DbResult<ConsignmentActivity> {
        let month_start = today - Duration::days(i64::from(today.day0()));
        let last_month_end = month_start - Duration::days(1);
        let last_month_start = last_month_end - Duration::days(i64::from(last_month_end.day0()));

        let (total, active, delivered, this_month, last_month) =
            sqlx::query_as::<_, (i64, i64, i64, i64, i64)>(
                r#"
                SELECT
                    COALESCE(SUM(CASE WHEN status <> 'CANCELLED' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status IN ('BOOKED', 'IN_TRANSIT') THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status IN ('DELIVERED', 'BILLED', 'PARTIALLY_PAID', 'PAID')
                                       AND updated_at >= ?1 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status <> 'CANCELLED' AND booking_date >= ?2
                                      THEN freight_paise ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status <> 'CANCELLED' AND booking_date >= ?3
                                       AND booking_date < ?2 THEN freight_paise ELSE 0 END), 0)
                FROM consignments
                "#,
            )
            .bind(month_start.and_time(NaiveTime::MIN).and_utc())
            .bind(month_start)
            .bind(last_month_start)
            .fetch_one(&self.pool)
            .await?;

        Ok(ConsignmentActivity {
            total,
            active,
            delivered_this_month: delivered,
            freight_this_month: Money::from_paise(this_month),
            freight_last_month: Money::from_paise(last_month),
        })
    }

    /// Gets a consignment by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Consignment>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    /// Gets a consignment by LR number.
    pub async fn get_by_lr_number(&self, lr_number: &str) -> DbResult<Option<Consignment>> {
        let sql = format!("{SELECT_CONSIGNMENT} WHERE lr_number = ?1");
        let consignment = sqlx::query_as::<_, Consignment>(&sql)
            .bind(lr_number.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(consignment)
    }

    /// Status history, oldest first.
    pub async fn logs(&self, consignment_id: &str) -> DbResult<Vec<ConsignmentLog>> {
        let logs = sqlx::query_as::<_, ConsignmentLog>(
            r#"
            SELECT id, consignment_id, status, note, created_at
            FROM consignment_logs
            WHERE consignment_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(consignment_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }

    /// Consignments, newest booking first.
    pub async fn list(
        &self,
        status: Option<ConsignmentStatus>,
        page: u32,
        limit: u32,
    ) -> DbResult<Vec<Consignment>> {
        let (limit, offset) = page_bounds(page, limit);
        let sql = format!(
            "{SELECT_CONSIGNMENT} WHERE (?1 IS NULL OR status = ?1) \
             ORDER BY booking_date DESC, created_at DESC LIMIT ?2 OFFSET ?3"
        );
        let consignments = sqlx::query_as::<_, Consignment>(&sql)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(consignments)
    }
}

// =============================================================================
// Connection-level helpers
// =============================================================================

pub(crate) async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Consignment>> {
    let sql = format!("{SELECT_CONSIGNMENT} WHERE id = ?1");
    let consignment = sqlx::query_as::<_, Consignment>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(consignment)
}

pub(crate) async fn fetch_required(conn: &mut SqliteConnection, id: &str) -> DbResult<Consignment> {
    fetch(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("Consignment", id))
}

/// Bumps `updated_at` so the transaction holds the write lock before it
/// reads the row.
pub(crate) async fn touch(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    let result = sqlx::query("UPDATE consignments SET updated_at = ?2 WHERE id = ?1")
        .bind(id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Consignment", id));
    }
    Ok(())
}

/// Sets the status and appends the matching log row.
pub(crate) async fn apply_status(
    conn: &mut SqliteConnection,
    id: &str,
    status: ConsignmentStatus,
    note: Option<&str>,
) -> DbResult<()> {
    debug!(%id, %status, "Setting consignment status");
    sqlx::query("UPDATE consignments SET status = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;
    append_log(conn, id, status, note).await
}

async fn append_log(
    conn: &mut SqliteConnection,
    consignment_id: &str,
    status: ConsignmentStatus,
    note: Option<&str>,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO consignment_logs (id, consignment_id, status, note, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(new_id())
    .bind(consignment_id)
    .bind(status)
    .bind(note)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
