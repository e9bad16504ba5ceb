use crate::{db::Db, models::RegistrationRow, registration::RegistrationStatus};
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Result as SqlxResult};
use uuid::Uuid;

const COLUMNS: &str = r#"
    r.id, r.pairing_id, r.event_id, r.category_id, r.status,
    p.payment_mode, r.created_at, r.updated_at
"#;
const FROM: &str = "padel_registrations r JOIN padel_pairings p ON p.id = r.pairing_id";

#[derive(Clone)]
pub struct RegistrationRepo {
    pool: Db,
}

impl RegistrationRepo {
    pub fn new(pool: Db) -> Self {
        Self { pool }
    }

    pub async fn get_by_pairing(&self, pairing_id: Uuid) -> SqlxResult<Option<RegistrationRow>> {
        sqlx::query_as::<_, RegistrationRow>(&format!(
            "SELECT {COLUMNS} FROM {FROM} WHERE r.pairing_id = $1"
        ))
        .bind(pairing_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list_for_event(
        &self,
        event_id: Uuid,
        status: Option<RegistrationStatus>,
    ) -> SqlxResult<Vec<RegistrationRow>> {
        sqlx::query_as::<_, RegistrationRow>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM {FROM}
            WHERE r.event_id = $1
              AND ($2::text IS NULL OR r.status = $2)
            ORDER BY r.created_at ASC
            "#
        ))
        .bind(event_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
    }
}

pub async fn get_by_pairing_tx(
    conn: &mut PgConnection,
    pairing_id: Uuid,
) -> SqlxResult<Option<RegistrationRow>> {
    sqlx::query_as::<_, RegistrationRow>(&format!(
        "SELECT {COLUMNS} FROM {FROM} WHERE r.pairing_id = $1 FOR UPDATE OF r"
    ))
    .bind(pairing_id)
    .fetch_optional(&mut *conn)
    .await
}

/// Write the derived status. One registration per pairing, so an upsert keyed
/// on pairing_id both creates the projection and moves it.
pub async fn upsert(
    conn: &mut PgConnection,
    pairing_id: Uuid,
    event_id: Uuid,
    category_id: Option<Uuid>,
    status: RegistrationStatus,
    now: DateTime<Utc>,
) -> SqlxResult<()> {
    sqlx::query(
        r#"
        INSERT INTO padel_registrations (id, pairing_id, event_id, category_id, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $6)
        ON CONFLICT (pairing_id)
        DO UPDATE SET status = EXCLUDED.status, updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(pairing_id)
    .bind(event_id)
    .bind(category_id)
    .bind(status.as_str())
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Pairing ids whose SPLIT window has lapsed while payment is still pending.
/// Candidates only: the sweep re-checks each one under a row lock.
pub async fn expirable_pairing_ids(
    conn: &mut PgConnection,
    now: DateTime<Utc>,
    limit: i64,
) -> SqlxResult<Vec<Uuid>> {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT p.id
        FROM padel_pairings p
        JOIN padel_registrations r ON r.pairing_id = p.id
        WHERE p.payment_mode = 'SPLIT'
          AND p.status = 'INCOMPLETE'
          AND r.status IN ('PENDING_PARTNER', 'PENDING_PAYMENT', 'MATCHMAKING')
          AND COALESCE(p.grace_until, p.deadline_at) < $1
        ORDER BY p.deadline_at ASC
        LIMIT $2
        "#,
    )
    .bind(now)
    .bind(limit)
    .fetch_all(&mut *conn)
    .await
}
