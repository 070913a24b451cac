//! # Party Repository
//!
//! Consignors, consignees, billed parties, agents and vehicle owners.
//! A party's `state` decides whether its bills carry IGST.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::new_id;
use crate::error::{DbError, DbResult};
use freight_core::validation;
use freight_core::{Party, PartyKind};

/// Input for creating a party.
#[derive(Debug, Clone)]
pub struct NewParty {
    pub name: String,
    pub kind: PartyKind,
    pub gstin: Option<String>,
    pub state: Option<String>,
    pub phone: Option<String>,
}

/// Changes to a party's details. `None` leaves a field as it is; for the
/// optional fields, `Some("")` clears it.
#[derive(Debug, Clone, Default)]
pub struct PartyUpdate {
    pub name: Option<String>,
    pub gstin: Option<String>,
    pub state: Option<String>,
    pub phone: Option<String>,
}

/// Repository for parties.
#[derive(Debug, Clone)]
pub struct PartyRepository {
    pool: SqlitePool,
}

impl PartyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PartyRepository { pool }
    }

    /// Creates a party.
    pub async fn insert(&self, input: NewParty) -> DbResult<Party> {
        let name = validation::validate_required(&input.name, "Party name")?;
        validation::validate_max_len(&name, "Party name", 200)?;
        let gstin = validation::normalize_optional(input.gstin.as_deref()).map(|g| g.to_uppercase());
        validation::validate_gstin(gstin.as_deref())?;
        let phone = validation::normalize_optional(input.phone.as_deref());
        validation::validate_phone(phone.as_deref(), "Phone")?;

        let party = Party {
            id: new_id(),
            name,
            kind: input.kind,
            gstin,
            state: validation::normalize_optional(input.state.as_deref()),
            phone,
            is_active: true,
            created_at: Utc::now(),
        };

        debug!(id = %party.id, name = %party.name, kind = ?party.kind, "Inserting party");

        sqlx::query(
            r#"
            INSERT INTO parties (id, name, kind, gstin, state, phone, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&party.id)
        .bind(&party.name)
        .bind(party.kind)
        .bind(&party.gstin)
        .bind(&party.state)
        .bind(&party.phone)
        .bind(party.is_active)
        .bind(party.created_at)
        .execute(&self.pool)
        .await?;

        Ok(party)
    }

    /// Edits a party's details.
    ///
    /// The same format checks as [`PartyRepository::insert`] apply to the
    /// fields being changed.
    pub async fn update(&self, id: &str, changes: PartyUpdate) -> DbResult<Party> {
        let name = match changes.name.as_deref() {
            Some(name) => {
                let name = validation::validate_required(name, "Party name")?;
                validation::validate_max_len(&name, "Party name", 200)?;
                Some(name)
            }
            None => None,
        };
        let gstin = changes
            .gstin
            .as_deref()
            .map(|g| validation::normalize_optional(Some(g)).map(|g| g.to_uppercase()));
        if let Some(gstin) = &gstin {
            validation::validate_gstin(gstin.as_deref())?;
        }
        let phone = changes.phone.as_deref().map(|p| validation::normalize_optional(Some(p)));
        if let Some(phone) = &phone {
            validation::validate_phone(phone.as_deref(), "Phone")?;
        }
        let state = changes.state.as_deref().map(|s| validation::normalize_optional(Some(s)));

        debug!(%id, "Updating party");

        let mut tx = self.pool.begin().await?;
        touch(&mut tx, id).await?;
        let mut party = fetch_required(&mut tx, id).await?;
        if let Some(name) = name {
            party.name = name;
        }
        if let Some(gstin) = gstin {
            party.gstin = gstin;
        }
        if let Some(state) = state {
            party.state = state;
        }
        if let Some(phone) = phone {
            party.phone = phone;
        }

        sqlx::query("UPDATE parties SET name = ?2, gstin = ?3, state = ?4, phone = ?5 WHERE id = ?1")
            .bind(id)
            .bind(&party.name)
            .bind(&party.gstin)
            .bind(&party.state)
            .bind(&party.phone)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(%id, name = %party.name, "Party updated");
        Ok(party)
    }

    /// Activates or deactivates a party. Inactive parties drop out of
    /// [`PartyRepository::list_by_kind`] but keep their history.
    pub async fn set_active(&self, id: &str, is_active: bool) -> DbResult<()> {
        debug!(%id, is_active, "Setting party active flag");
        let result = sqlx::query("UPDATE parties SET is_active = ?2 WHERE id = ?1")
            .bind(id)
            .bind(is_active)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Party", id));
        }
        Ok(())
    }

    /// Gets a party by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Party>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    /// Active parties of one kind, by name.
    pub async fn list_by_kind(&self, kind: PartyKind) -> DbResult<Vec<Party>> {
        let parties = sqlx::query_as::<_, Party>(
            r#"
            SELECT id, name, kind, gstin, state, phone, is_active, created_at
            FROM parties
            WHERE kind = ?1 AND is_active = 1
            ORDER BY name
            "#,
        )
        .bind(kind)
        .fetch_all(&self.pool)
        .await?;
        Ok(parties)
    }
}

pub(crate) async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Party>> {
    let party = sqlx::query_as::<_, Party>(
        r#"
        SELECT id, name, kind, gstin, state, phone, is_active, created_at
        FROM parties
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(party)
}

/// No-op write on a party row, so a transaction that starts here holds the
/// write lock from its first statement.
pub(crate) async fn touch(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    let result = sqlx::query("UPDATE parties SET is_active = is_active WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Party", id));
    }
    Ok(())
}

pub(crate) async fn fetch_required(conn: &mut SqliteConnection, id: &str) -> DbResult<Party> {
    fetch(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("Party", id))
}
