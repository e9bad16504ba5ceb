use crate::{
    db::Db,
    models::{CategoryConfigRow, EventRow},
};
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Result as SqlxResult};
use uuid::Uuid;

const EVENT_COLUMNS: &str = r#"
    id, organization_id, title, status, starts_at,
    registration_starts_at, registration_ends_at, created_at, updated_at
"#;

const CONFIG_COLUMNS: &str = r#"
    id, event_id, category_id, format, split_deadline_hours, score_rules,
    generated_at, created_at, updated_at
"#;

#[derive(Clone)]
pub struct EventRepo {
    pool: Db,
}

impl EventRepo {
    pub fn new(pool: Db) -> Self {
        Self { pool }
    }

    pub async fn get_config(
        &self,
        event_id: Uuid,
        category_id: Option<Uuid>,
    ) -> SqlxResult<Option<CategoryConfigRow>> {
        sqlx::query_as::<_, CategoryConfigRow>(&format!(
            r#"
            SELECT {CONFIG_COLUMNS} FROM padel_tournament_configs
            WHERE event_id = $1
              AND ($2::uuid IS NULL AND category_id IS NULL OR category_id = $2)
            "#
        ))
        .bind(event_id)
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Configs whose registration window has closed without a generated
    /// structure; the deadline sweep triggers generation for these. A window
    /// with no end timestamp closes when the event starts, and cancelled
    /// events are never drawn.
    pub async fn list_generation_due(&self, now: DateTime<Utc>) -> SqlxResult<Vec<CategoryConfigRow>> {
        sqlx::query_as::<_, CategoryConfigRow>(
            r#"
            SELECT c.id, c.event_id, c.category_id, c.format, c.split_deadline_hours,
                   c.score_rules, c.generated_at, c.created_at, c.updated_at
            FROM padel_tournament_configs c
            JOIN events e ON e.id = c.event_id
            WHERE c.generated_at IS NULL
              AND e.status <> 'CANCELLED'
              AND COALESCE(e.registration_ends_at, e.starts_at) < $1
            ORDER BY COALESCE(e.registration_ends_at, e.starts_at) ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
    }
}

pub async fn get_tx(conn: &mut PgConnection, id: Uuid) -> SqlxResult<Option<EventRow>> {
    sqlx::query_as::<_, EventRow>(&format!(
        "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn get_config_tx(
    conn: &mut PgConnection,
    event_id: Uuid,
    category_id: Option<Uuid>,
) -> SqlxResult<Option<CategoryConfigRow>> {
    sqlx::query_as::<_, CategoryConfigRow>(&format!(
        r#"
        SELECT {CONFIG_COLUMNS} FROM padel_tournament_configs
        WHERE event_id = $1
          AND ($2::uuid IS NULL AND category_id IS NULL OR category_id = $2)
        FOR UPDATE
        "#
    ))
    .bind(event_id)
    .bind(category_id)
    .fetch_optional(&mut *conn)
    .await
}

/// Claim structure generation for a config by stamping `generated_at`, but
/// only if nobody has. Returns whether this transaction won the claim; losers
/// must abort without writing any structure.
pub async fn claim_generation(
    conn: &mut PgConnection,
    config_id: Uuid,
    now: DateTime<Utc>,
) -> SqlxResult<bool> {
    let res = sqlx::query(
        r#"
        UPDATE padel_tournament_configs
        SET generated_at = $2, updated_at = $2
        WHERE id = $1 AND generated_at IS NULL
        "#,
    )
    .bind(config_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(res.rows_affected() == 1)
}

/// Forced regeneration re-stamps unconditionally.
pub async fn restamp_generation(
    conn: &mut PgConnection,
    config_id: Uuid,
    now: DateTime<Utc>,
) -> SqlxResult<()> {
    sqlx::query(
        "UPDATE padel_tournament_configs SET generated_at = $2, updated_at = $2 WHERE id = $1",
    )
    .bind(config_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
