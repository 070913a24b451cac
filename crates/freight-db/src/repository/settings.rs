//! # Settings Repository
//!
//! Key/value settings, and the sequence counters that live among them.
//!
//! ## Sequence Counters
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  increment_and_get(conn, "lr_counter")                                  │
//! │                                                                         │
//! │  INSERT .. ON CONFLICT(key) DO UPDATE SET value = value + 1             │
//! │            RETURNING value                                              │
//! │                                                                         │
//! │  stored value = next number to issue                                    │
//! │  returned     = stored value after the increment                        │
//! │  issued       = returned - 1                                            │
//! │                                                                         │
//! │  One statement: the read and the write cannot be split by another      │
//! │  connection. Run inside the caller's transaction, the number is only   │
//! │  consumed if that transaction commits.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Counters never reset on their own. Changing `invoice_series` keeps
//! `invoice_counter` where it is; an operator resets it with
//! [`SettingsRepository::set_counter`].

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use freight_core::numbering::{self, SequenceKind, DEFAULT_INVOICE_SERIES};
use freight_core::types::setting_keys;
use freight_core::validation;
use freight_core::{CoreError, GstRate, SettingEntry, ValidationError, DEFAULT_COMPANY_STATE};

/// GST rate used when the `gst_rate` setting is blank.
pub const DEFAULT_GST_RATE: GstRate = GstRate::from_percent(5);

/// Repository for the settings store.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Gets a setting value.
    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let mut conn = self.pool.acquire().await?;
        get_value(&mut conn, key).await
    }

    /// Gets a setting value, or `default` when it is absent.
    pub async fn get_or(&self, key: &str, default: &str) -> DbResult<String> {
        Ok(self.get(key).await?.unwrap_or_else(|| default.to_string()))
    }

    /// All settings, ordered by key.
    pub async fn all(&self) -> DbResult<Vec<SettingEntry>> {
        let entries = sqlx::query_as::<_, SettingEntry>(
            "SELECT key, value, updated_at FROM settings ORDER BY key",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    /// Inserts or replaces one setting.
    pub async fn upsert(&self, key: &str, value: &str) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        upsert_value(&mut conn, key, value).await
    }

    /// Saves the numbering prefixes and series.
    ///
    /// Counters are left alone. Prefixes may not contain `/`, which
    /// separates the parts of a bill number.
    pub async fn save_numbering(
        &self,
        lr_prefix: &str,
        invoice_prefix: &str,
        invoice_series: &str,
    ) -> DbResult<()> {
        let lr_prefix = validation::validate_prefix(lr_prefix, "LR prefix")?;
        let invoice_prefix = validation::validate_prefix(invoice_prefix, "Invoice prefix")?;
        let invoice_series = validation::validate_series(invoice_series)?;

        let mut tx = self.pool.begin().await?;
        upsert_value(&mut tx, setting_keys::LR_PREFIX, &lr_prefix).await?;
        upsert_value(&mut tx, setting_keys::INVOICE_PREFIX, &invoice_prefix).await?;
        upsert_value(&mut tx, setting_keys::INVOICE_SERIES, &invoice_series).await?;
        tx.commit().await?;

        info!(%lr_prefix, %invoice_prefix, %invoice_series, "Numbering settings saved");
        Ok(())
    }

    /// Sets the next number a counter will issue.
    ///
    /// The only way a counter moves backwards. Reusing a number already on a
    /// booking or bill fails later with a unique violation.
    pub async fn set_counter(&self, kind: SequenceKind, next: i64) -> DbResult<()> {
        if next < 1 {
            return Err(ValidationError::MustBePositive {
                field: "Counter".to_string(),
            }
            .into());
        }
        let mut conn = self.pool.acquire().await?;
        upsert_value(&mut conn, kind.counter_key(), &next.to_string()).await?;
        info!(key = kind.counter_key(), next, "Counter reset");
        Ok(())
    }

    /// Saves company profile fields.
    ///
    /// Keys outside the company profile are ignored. GSTIN, PAN, pincode,
    /// phone and email are format-checked when non-empty.
    pub async fn save_company_profile(&self, values: &HashMap<String, String>) -> DbResult<()> {
        let field = |key: &str| values.get(key).map(String::as_str);
        validation::validate_gstin(field("gst_number"))?;
        validation::validate_pan(field("pan"))?;
        validation::validate_pincode(field("pincode"))?;
        validation::validate_phone(field("phone"), "Phone")?;
        validation::validate_email(field("email"))?;

        let mut tx = self.pool.begin().await?;
        for key in setting_keys::COMPANY_PROFILE {
            if let Some(value) = values.get(*key) {
                upsert_value(&mut tx, key, value.trim()).await?;
            }
        }
        tx.commit().await?;

        let ignored = values
            .keys()
            .filter(|k| !setting_keys::COMPANY_PROFILE.contains(&k.as_str()))
            .count();
        debug!(ignored, "Company profile saved");
        Ok(())
    }

    /// Draws the next LR number in its own transaction.
    pub async fn next_lr_number(&self) -> DbResult<String> {
        let mut tx = self.pool.begin().await?;
        let number = next_lr_number(&mut tx).await?;
        tx.commit().await?;
        Ok(number)
    }

    /// Draws the next bill number in its own transaction.
    pub async fn next_bill_number(&self) -> DbResult<String> {
        let mut tx = self.pool.begin().await?;
        let number = next_bill_number(&mut tx).await?;
        tx.commit().await?;
        Ok(number)
    }
}

// =============================================================================
// Connection-level helpers (usable inside a caller's transaction)
// =============================================================================

pub(crate) async fn get_value(conn: &mut SqliteConnection, key: &str) -> DbResult<Option<String>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?1")
        .bind(key)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(value)
}

pub(crate) async fn upsert_value(conn: &mut SqliteConnection, key: &str, value: &str) -> DbResult<()> {
    debug!(%key, "Upserting setting");
    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
    )
    .bind(key)
    .bind(value)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Atomically advances a counter and returns the number it issued.
///
/// A missing counter row starts at 1.
pub async fn increment_and_get(conn: &mut SqliteConnection, key: &str) -> DbResult<i64> {
    let stored: String = sqlx::query_scalar(
        r#"
        INSERT INTO settings (key, value, updated_at)
        VALUES (?1, '2', ?2)
        ON CONFLICT(key) DO UPDATE SET
            value = CAST(CAST(value AS INTEGER) + 1 AS TEXT),
            updated_at = excluded.updated_at
        RETURNING value
        "#,
    )
    .bind(key)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    let issued = numbering::parse_counter(key, &stored)? - 1;
    if issued < 1 {
        // The stored value was not a number; CAST turned it into 0.
        return Err(DbError::Domain(CoreError::InvalidCounter {
            key: key.to_string(),
            value: stored,
        }));
    }

    debug!(%key, issued, "Counter advanced");
    Ok(issued)
}

/// Draws the next LR number (`{lr_prefix}{counter:04}`).
///
/// The counter is advanced before the prefix is read, so the transaction
/// holds the write lock from its first statement.
pub async fn next_lr_number(conn: &mut SqliteConnection) -> DbResult<String> {
    let counter = increment_and_get(conn, SequenceKind::Lr.counter_key()).await?;
    let prefix = get_value(conn, SequenceKind::Lr.prefix_key()).await?;
    let prefix = numbering::or_default(prefix.as_deref(), SequenceKind::Lr.default_prefix());
    Ok(numbering::format_lr_number(prefix, counter))
}

/// Draws the next bill number (`{invoice_prefix}/{invoice_series}/{counter:04}`).
pub async fn next_bill_number(conn: &mut SqliteConnection) -> DbResult<String> {
    let counter = increment_and_get(conn, SequenceKind::Bill.counter_key()).await?;
    let prefix = get_value(conn, SequenceKind::Bill.prefix_key()).await?;
    let series = get_value(conn, setting_keys::INVOICE_SERIES).await?;
    let prefix = numbering::or_default(prefix.as_deref(), SequenceKind::Bill.default_prefix());
    let series = numbering::or_default(series.as_deref(), DEFAULT_INVOICE_SERIES);
    Ok(numbering::format_bill_number(prefix, series, counter))
}

/// The company's registered state, falling back to the default when blank.
pub(crate) async fn company_state(conn: &mut SqliteConnection) -> DbResult<String> {
    let state = get_value(conn, setting_keys::COMPANY_STATE).await?;
    Ok(numbering::or_default(state.as_deref(), DEFAULT_COMPANY_STATE).to_string())
}

/// The default GST rate from settings.
pub(crate) async fn default_gst_rate(conn: &mut SqliteConnection) -> DbResult<GstRate> {
    match get_value(conn, setting_keys::GST_RATE).await? {
        Some(value) if !value.trim().is_empty() => {
            GstRate::parse_percent(&value).ok_or_else(|| {
                DbError::from(ValidationError::InvalidFormat {
                    field: "GST rate setting".to_string(),
                    reason: format!("'{}' is not a percentage", value),
                })
            })
        }
        _ => Ok(DEFAULT_GST_RATE),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
