use crate::{
    db::Db,
    models::{GenerationAuditRow, StageRow, StructureMatchRow},
};
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Result as SqlxResult};
use uuid::Uuid;

const STAGE_COLUMNS: &str = "id, event_id, category_id, name, stage_type, position";
const MATCH_COLUMNS: &str = "id, stage_id, group_label, round, pairing_a, pairing_b, status";

#[derive(Clone)]
pub struct StructureRepo {
    pool: Db,
}

impl StructureRepo {
    pub fn new(pool: Db) -> Self {
        Self { pool }
    }

    pub async fn list_stages(
        &self,
        event_id: Uuid,
        category_id: Option<Uuid>,
    ) -> SqlxResult<Vec<StageRow>> {
        sqlx::query_as::<_, StageRow>(&format!(
            r#"
            SELECT {STAGE_COLUMNS} FROM tournament_stages
            WHERE event_id = $1
              AND ($2::uuid IS NULL AND category_id IS NULL OR category_id = $2)
            ORDER BY position ASC
            "#
        ))
        .bind(event_id)
        .bind(category_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn list_matches(&self, stage_id: Uuid) -> SqlxResult<Vec<StructureMatchRow>> {
        sqlx::query_as::<_, StructureMatchRow>(&format!(
            r#"
            SELECT {MATCH_COLUMNS} FROM tournament_matches
            WHERE stage_id = $1
            ORDER BY round ASC, group_label NULLS FIRST, id ASC
            "#
        ))
        .bind(stage_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn last_audit(
        &self,
        event_id: Uuid,
        category_id: Option<Uuid>,
    ) -> SqlxResult<Option<GenerationAuditRow>> {
        sqlx::query_as::<_, GenerationAuditRow>(
            r#"
            SELECT id, event_id, category_id, format, seed, participants, forced, created_at
            FROM structure_generation_audit
            WHERE event_id = $1
              AND ($2::uuid IS NULL AND category_id IS NULL OR category_id = $2)
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(event_id)
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await
    }
}

pub async fn insert_stage(conn: &mut PgConnection, stage: &StageRow) -> SqlxResult<()> {
    sqlx::query(
        r#"
        INSERT INTO tournament_stages (id, event_id, category_id, name, stage_type, position)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(stage.id)
    .bind(stage.event_id)
    .bind(stage.category_id)
    .bind(&stage.name)
    .bind(&stage.stage_type)
    .bind(stage.position)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn insert_match(conn: &mut PgConnection, m: &StructureMatchRow) -> SqlxResult<()> {
    sqlx::query(
        r#"
        INSERT INTO tournament_matches (id, stage_id, group_label, round, pairing_a, pairing_b, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(m.id)
    .bind(m.stage_id)
    .bind(&m.group_label)
    .bind(m.round)
    .bind(m.pairing_a)
    .bind(m.pairing_b)
    .bind(&m.status)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Wipe an existing structure ahead of a forced regeneration.
pub async fn delete_structure(
    conn: &mut PgConnection,
    event_id: Uuid,
    category_id: Option<Uuid>,
) -> SqlxResult<u64> {
    sqlx::query(
        r#"
        DELETE FROM tournament_matches
        WHERE stage_id IN (
            SELECT id FROM tournament_stages
            WHERE event_id = $1
              AND ($2::uuid IS NULL AND category_id IS NULL OR category_id = $2)
        )
        "#,
    )
    .bind(event_id)
    .bind(category_id)
    .execute(&mut *conn)
    .await?;
    let res = sqlx::query(
        r#"
        DELETE FROM tournament_stages
        WHERE event_id = $1
          AND ($2::uuid IS NULL AND category_id IS NULL OR category_id = $2)
        "#,
    )
    .bind(event_id)
    .bind(category_id)
    .execute(&mut *conn)
    .await?;
    tracing::debug!(%event_id, ?category_id, stages = res.rows_affected(), "structure wiped");
    Ok(res.rows_affected())
}

pub async fn insert_audit(
    conn: &mut PgConnection,
    event_id: Uuid,
    category_id: Option<Uuid>,
    format: &str,
    seed: i64,
    participants: &serde_json::Value,
    forced: bool,
    now: DateTime<Utc>,
) -> SqlxResult<()> {
    sqlx::query(
        r#"
        INSERT INTO structure_generation_audit
            (id, event_id, category_id, format, seed, participants, forced, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(event_id)
    .bind(category_id)
    .bind(format)
    .bind(seed)
    .bind(participants)
    .bind(forced)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
