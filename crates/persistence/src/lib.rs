#![deny(warnings)]

//! Save documents and SQLite save slots.
//!
//! A save is the whole [`SimulationState`] as versioned JSON. Loading parses
//! and validates the complete document before handing anything back, so a
//! bad save never replaces a running game.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::{validate_state, SimulationState, ValidationError};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

/// Current save document version.
pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("save document is malformed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported save version {0}")]
    UnsupportedVersion(u32),
    #[error("save document failed validation: {0}")]
    Invalid(#[from] ValidationError),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("no save in slot {0}")]
    MissingSlot(String),
    #[error("slot {0} has corrupt metadata")]
    CorruptSlot(String),
}

#[derive(Serialize)]
struct SaveDocumentRef<'a> {
    version: u32,
    state: &'a SimulationState,
}

#[derive(Deserialize)]
struct SaveDocument {
    version: u32,
    state: SimulationState,
}

/// Full save document for `state`. Transient flags are not written.
pub fn serialize(state: &SimulationState) -> Result<String, PersistenceError> {
    Ok(serde_json::to_string(&SaveDocumentRef {
        version: SAVE_VERSION,
        state,
    })?)
}

/// Parse and validate a save document. The returned state is paused with no
/// pending decision.
pub fn load_from_str(data: &str) -> Result<SimulationState, PersistenceError> {
    let doc: SaveDocument = serde_json::from_str(data)?;
    if doc.version != SAVE_VERSION {
        return Err(PersistenceError::UnsupportedVersion(doc.version));
    }
    let mut state = doc.state;
    validate_state(&state)?;
    state.reset_transient();
    Ok(state)
}

/// Returns the default SQLite URL used for local saves.
pub fn default_sqlite_url() -> &'static str {
    "sqlite://./saves/main.db"
}

/// Open the save database, creating it if needed, and run migrations.
pub async fn init_db(url: &str) -> Result<SqlitePool, PersistenceError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!(url, "save database ready");
    Ok(pool)
}

/// Summary row for a save slot.
#[derive(Clone, Debug, PartialEq)]
pub struct SlotMeta {
    pub slot: String,
    pub game_date: String,
    pub money: Decimal,
    /// Unix seconds.
    pub saved_at: i64,
}

fn unix_now() -> i64 {
    Utc::now().timestamp()
}

/// Write `state` into `slot`, replacing whatever was there.
pub async fn save_to_slot(
    pool: &SqlitePool,
    slot: &str,
    state: &SimulationState,
) -> Result<(), PersistenceError> {
    let payload = serialize(state)?;
    sqlx::query(
        "INSERT INTO save_slots (slot, game_date, money, saved_at, payload)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(slot) DO UPDATE SET
             game_date = excluded.game_date,
             money = excluded.money,
             saved_at = excluded.saved_at,
             payload = excluded.payload",
    )
    .bind(slot)
    .bind(state.clock.date.to_string())
    .bind(state.money.to_string())
    .bind(unix_now())
    .bind(payload)
    .execute(pool)
    .await?;
    info!(slot, date = %state.clock.date, "game saved");
    Ok(())
}

/// Raw save document stored in `slot`. Feed it to [`load_from_str`].
pub async fn load_from_slot(pool: &SqlitePool, slot: &str) -> Result<String, PersistenceError> {
    sqlx::query_scalar::<_, String>("SELECT payload FROM save_slots WHERE slot = ?1")
        .bind(slot)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| PersistenceError::MissingSlot(slot.to_string()))
}

/// Remove a slot. Returns whether it existed.
pub async fn delete_slot(pool: &SqlitePool, slot: &str) -> Result<bool, PersistenceError> {
    let done = sqlx::query("DELETE FROM save_slots WHERE slot = ?1")
        .bind(slot)
        .execute(pool)
        .await?;
    Ok(done.rows_affected() > 0)
}

/// All slots, most recently saved first.
pub async fn list_slots(pool: &SqlitePool) -> Result<Vec<SlotMeta>, PersistenceError> {
    let rows = sqlx::query(
        "SELECT slot, game_date, money, saved_at FROM save_slots ORDER BY saved_at DESC, slot",
    )
    .fetch_all(pool)
    .await?;
    rows.iter()
        .map(|row| -> Result<SlotMeta, PersistenceError> {
            let slot: String = row.try_get("slot")?;
            let money: String = row.try_get("money")?;
            let money = Decimal::from_str(&money).map_err(|_| PersistenceError::CorruptSlot(slot.clone()))?;
            Ok(SlotMeta {
                game_date: row.try_get("game_date")?,
                saved_at: row.try_get("saved_at")?,
                money,
                slot,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::{Catalog, SimConfig};

    fn state() -> SimulationState {
        SimulationState::new(&SimConfig::default(), &Catalog::builtin().unwrap())
    }

    #[test]
    fn url_is_sqlite() {
        assert!(default_sqlite_url().starts_with("sqlite://"));
    }

    #[test]
    fn document_round_trip_pauses() {
        let mut s = state();
        s.clock.paused = false;
        s.clock.auto_throttled = true;
        let back = load_from_str(&serialize(&s).unwrap()).unwrap();
        assert_eq!(back.money, s.money);
        assert_eq!(back.factories, s.factories);
        assert!(back.clock.paused);
        assert!(!back.clock.auto_throttled);
    }

    #[test]
    fn bad_documents_are_rejected() {
        assert!(matches!(load_from_str("{"), Err(PersistenceError::Json(_))));
        let doc = serialize(&state()).unwrap().replacen("\"version\":1", "\"version\":9", 1);
        assert!(matches!(load_from_str(&doc), Err(PersistenceError::UnsupportedVersion(9))));

        let mut s = state();
        s.factories[0].inventory = 99_999;
        let doc = serialize(&s).unwrap();
        assert!(matches!(load_from_str(&doc), Err(PersistenceError::Invalid(_))));
    }

    #[tokio::test]
    async fn slots_save_list_load_delete() {
        let pool = init_db("sqlite::memory:").await.unwrap();
        let mut s = state();
        save_to_slot(&pool, "alpha", &s).await.unwrap();
        s.money = Decimal::new(42, 0);
        save_to_slot(&pool, "alpha", &s).await.unwrap();
        save_to_slot(&pool, "beta", &s).await.unwrap();

        let slots = list_slots(&pool).await.unwrap();
        assert_eq!(slots.len(), 2);
        let now = Utc::now().timestamp();
        assert!(slots.iter().all(|m| (now - m.saved_at).abs() < 60));
        assert!(slots.iter().all(|m| m.money == Decimal::new(42, 0)));

        let loaded = load_from_str(&load_from_slot(&pool, "alpha").await.unwrap()).unwrap();
        assert_eq!(loaded.money, Decimal::new(42, 0));

        assert!(delete_slot(&pool, "alpha").await.unwrap());
        assert!(!delete_slot(&pool, "alpha").await.unwrap());
        assert!(matches!(
            load_from_slot(&pool, "alpha").await,
            Err(PersistenceError::MissingSlot(_))
        ));
    }
}
