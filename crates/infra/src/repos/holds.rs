use crate::{db::Db, deadlines, models::HoldRow};
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Result as SqlxResult};
use uuid::Uuid;

const COLUMNS: &str = "id, pairing_id, event_id, expires_at, active, created_at";

#[derive(Clone)]
pub struct HoldRepo {
    pool: Db,
}

impl HoldRepo {
    pub fn new(pool: Db) -> Self {
        Self { pool }
    }

    pub async fn active_for_pairing(&self, pairing_id: Uuid) -> SqlxResult<Option<HoldRow>> {
        sqlx::query_as::<_, HoldRow>(&format!(
            r#"
            SELECT {COLUMNS} FROM pairing_holds
            WHERE pairing_id = $1 AND active
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(pairing_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Live capacity reservations for an event, expired ones excluded.
    pub async fn count_active(&self, event_id: Uuid, now: DateTime<Utc>) -> SqlxResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM pairing_holds WHERE event_id = $1 AND active AND expires_at > $2",
        )
        .bind(event_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await
    }
}

/// Reserve capacity for a pairing mid-checkout. Any previous hold for the
/// pairing is superseded so at most one is active.
pub async fn place(
    conn: &mut PgConnection,
    pairing_id: Uuid,
    event_id: Uuid,
    now: DateTime<Utc>,
) -> SqlxResult<HoldRow> {
    sqlx::query("UPDATE pairing_holds SET active = FALSE WHERE pairing_id = $1 AND active")
        .bind(pairing_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query_as::<_, HoldRow>(&format!(
        r#"
        INSERT INTO pairing_holds (id, pairing_id, event_id, expires_at, active, created_at)
        VALUES ($1, $2, $3, $4, TRUE, $5)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(pairing_id)
    .bind(event_id)
    .bind(deadlines::hold_expiry(now))
    .bind(now)
    .fetch_one(&mut *conn)
    .await
}

pub async fn release(conn: &mut PgConnection, pairing_id: Uuid) -> SqlxResult<u64> {
    let res = sqlx::query("UPDATE pairing_holds SET active = FALSE WHERE pairing_id = $1 AND active")
        .bind(pairing_id)
        .execute(&mut *conn)
        .await?;
    Ok(res.rows_affected())
}
