//! # Vehicle Repository
//!
//! Vehicles and their availability. Booking a consignment puts a vehicle
//! ON_TRIP; delivery puts it back to AVAILABLE. Both happen inside the
//! consignment transaction through [`set_status`].

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::new_id;
use crate::error::{DbError, DbResult};
use freight_core::validation;
use freight_core::{Vehicle, VehicleStatus};

/// Input for registering a vehicle.
#[derive(Debug, Clone)]
pub struct NewVehicle {
    /// Registration number; spaces and case are normalised.
    pub vehicle_number: String,
    pub vehicle_type: String,
    pub owner_id: String,
}

/// Repository for vehicles.
#[derive(Debug, Clone)]
pub struct VehicleRepository {
    pool: SqlitePool,
}

impl VehicleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        VehicleRepository { pool }
    }

    /// Registers a vehicle as AVAILABLE.
    ///
    /// ## Errors
    /// - `UniqueViolation` if the normalised number is already registered
    pub async fn insert(&self, input: NewVehicle) -> DbResult<Vehicle> {
        let vehicle_number = validation::normalize_vehicle_number(&input.vehicle_number)?;
        let vehicle_type = validation::validate_required(&input.vehicle_type, "Vehicle type")?;
        let owner_id = validation::validate_required(&input.owner_id, "Vehicle owner")?;

        let now = Utc::now();
        let vehicle = Vehicle {
            id: new_id(),
            vehicle_number,
            vehicle_type,
            owner_id,
            status: VehicleStatus::Available,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %vehicle.id, number = %vehicle.vehicle_number, "Inserting vehicle");

        sqlx::query(
            r#"
            INSERT INTO vehicles (id, vehicle_number, vehicle_type, owner_id, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&vehicle.id)
        .bind(&vehicle.vehicle_number)
        .bind(&vehicle.vehicle_type)
        .bind(&vehicle.owner_id)
        .bind(vehicle.status)
        .bind(vehicle.created_at)
        .bind(vehicle.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => {
                DbError::duplicate(field, vehicle.vehicle_number.clone())
            }
            other => other,
        })?;

        Ok(vehicle)
    }

    /// Gets a vehicle by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Vehicle>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    /// Gets a vehicle by registration number (normalised before lookup).
    pub async fn get_by_number(&self, number: &str) -> DbResult<Option<Vehicle>> {
        let number = validation::normalize_vehicle_number(number)?;
        let vehicle = sqlx::query_as::<_, Vehicle>(
            r#"
            SELECT id, vehicle_number, vehicle_type, owner_id, status, created_at, updated_at
            FROM vehicles
            WHERE vehicle_number = ?1
            "#,
        )
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;
        Ok(vehicle)
    }

    /// Vehicles that can take a new booking.
    pub async fn list_available(&self) -> DbResult<Vec<Vehicle>> {
        let vehicles = sqlx::query_as::<_, Vehicle>(
            r#"
            SELECT id, vehicle_number, vehicle_type, owner_id, status, created_at, updated_at
            FROM vehicles
            WHERE status = 'AVAILABLE'
            ORDER BY vehicle_number
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(vehicles)
    }

    /// Sets a vehicle's status directly (workshop, retirement).
    pub async fn set_status(&self, id: &str, status: VehicleStatus) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        set_status(&mut conn, id, status).await?;
        info!(%id, %status, "Vehicle status set");
        Ok(())
    }
}

pub(crate) async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Vehicle>> {
    let vehicle = sqlx::query_as::<_, Vehicle>(
        r#"
        SELECT id, vehicle_number, vehicle_type, owner_id, status, created_at, updated_at
        FROM vehicles
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(vehicle)
}

pub(crate) async fn set_status(
    conn: &mut SqliteConnection,
    id: &str,
    status: VehicleStatus,
) -> DbResult<()> {
    debug!(%id, %status, "Updating vehicle status");
    let result = sqlx::query("UPDATE vehicles SET status = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Vehicle", id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{party, setup};
    use freight_core::PartyKind;

    #[tokio::test]
    async fn test_insert_normalises_number() {
        let db = setup().await;
        let owner = party(&db, "Ramesh Yadav", PartyKind::VehicleOwner, None).await;

        let vehicle = db
            .vehicles()
            .insert(NewVehicle {
                vehicle_number: "mh12 ab 1234".to_string(),
                vehicle_type: "20ft container".to_string(),
                owner_id: owner.id.clone(),
            })
            .await
            .unwrap();
        assert_eq!(vehicle.vehicle_number, "MH12AB1234");
        assert_eq!(vehicle.status, VehicleStatus::Available);

        let found = db.vehicles().get_by_number("MH 12 AB 1234").await.unwrap().unwrap();
        assert_eq!(found.id, vehicle.id);
    }

    #[tokio::test]
    async fn test_duplicate_number_rejected() {
        let db = setup().await;
        let owner = party(&db, "Ramesh Yadav", PartyKind::VehicleOwner, None).await;
        let input = NewVehicle {
            vehicle_number: "GJ01XY9".to_string(),
            vehicle_type: "Tempo".to_string(),
            owner_id: owner.id.clone(),
        };

        db.vehicles().insert(input.clone()).await.unwrap();
        let err = db.vehicles().insert(input).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref value, .. } if value == "GJ01XY9"));
    }

    #[tokio::test]
    async fn test_set_status() {
        let db = setup().await;
        let owner = party(&db, "Ramesh Yadav", PartyKind::VehicleOwner, None).await;
        let vehicle = crate::repository::test_support::vehicle(&db, "MH04X77", &owner.id).await;

        db.vehicles().set_status(&vehicle.id, VehicleStatus::InRepair).await.unwrap();
        assert!(db.vehicles().list_available().await.unwrap().is_empty());

        let err = db.vehicles().set_status("missing", VehicleStatus::Available).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
