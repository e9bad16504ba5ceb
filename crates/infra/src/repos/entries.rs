use crate::{db::Db, models::EntryRow, pairing::Pairing};
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Result as SqlxResult};
use uuid::Uuid;

const COLUMNS: &str =
    "id, event_id, category_id, user_id, pairing_id, created_at, updated_at";

/// Stand-in for a NULL category in the entries unique index, so the open
/// category still deduplicates per user.
const OPEN_CATEGORY: Uuid = Uuid::nil();

#[derive(Clone)]
pub struct EntryRepo {
    pool: Db,
}

impl EntryRepo {
    pub fn new(pool: Db) -> Self {
        Self { pool }
    }

    pub async fn list_for_event(&self, event_id: Uuid) -> SqlxResult<Vec<EntryRow>> {
        sqlx::query_as::<_, EntryRow>(&format!(
            "SELECT {COLUMNS} FROM tournament_entries WHERE event_id = $1 ORDER BY created_at ASC"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn list_for_pairing(&self, pairing_id: Uuid) -> SqlxResult<Vec<EntryRow>> {
        sqlx::query_as::<_, EntryRow>(&format!(
            "SELECT {COLUMNS} FROM tournament_entries WHERE pairing_id = $1 ORDER BY created_at ASC"
        ))
        .bind(pairing_id)
        .fetch_all(&self.pool)
        .await
    }
}

/// Materialize one entry per occupied seat of a confirmed pairing. Keyed on
/// (event, category, user); replays re-point an existing entry at the winning
/// pairing instead of duplicating it.
pub async fn upsert_for_pairing(
    conn: &mut PgConnection,
    pairing: &Pairing,
    now: DateTime<Utc>,
) -> SqlxResult<()> {
    let category_key = pairing.category_id.unwrap_or(OPEN_CATEGORY);
    for slot in pairing.slots() {
        let Some(user_id) = slot.occupant.profile_id() else { continue };
        sqlx::query(
            r#"
            INSERT INTO tournament_entries (id, event_id, category_id, category_key, user_id, pairing_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            ON CONFLICT (event_id, category_key, user_id)
            DO UPDATE SET pairing_id = EXCLUDED.pairing_id, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(pairing.event_id)
        .bind(pairing.category_id)
        .bind(category_key)
        .bind(user_id)
        .bind(pairing.id)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Remove a pairing's entries when it leaves the confirmed state.
pub async fn delete_for_pairing(conn: &mut PgConnection, pairing_id: Uuid) -> SqlxResult<u64> {
    let res = sqlx::query("DELETE FROM tournament_entries WHERE pairing_id = $1")
        .bind(pairing_id)
        .execute(&mut *conn)
        .await?;
    Ok(res.rows_affected())
}
